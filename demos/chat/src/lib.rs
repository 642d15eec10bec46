//! # Chat Example
//!
//! A chat log kept in a simple-state [`Store`].
//!
//! This example showcases:
//! - A typed state with a [`Reducer`] implementation
//! - An action whose transform shapes call arguments into payload fields
//! - Snapshots forwarded to a sink
//!
//! ## Example
//!
//! ```
//! use chat::{ADD_MESSAGE, ChatState, build_store};
//! use simple_state_runtime::StoreConfig;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), simple_state_runtime::StoreError> {
//! let store = build_store(ChatState::new("hello"), StoreConfig::default())?;
//! store.dispatch(ADD_MESSAGE, &[json!("world")])?;
//!
//! assert_eq!(store.state(|s| s.content.clone()), "hello\nworld");
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::json;
use simple_state_core::{Action, BoxError, Clock, Reducer, SystemClock};
use simple_state_runtime::{Store, StoreConfig, StoreError};

/// Name of the action appending a message
pub const ADD_MESSAGE: &str = "addMessage";

/// Chat state
///
/// The whole conversation as newline-separated text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatState {
    /// Conversation so far
    pub content: String,
}

impl ChatState {
    /// Create a state holding `content`
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Payload of [`ADD_MESSAGE`]
#[derive(Debug, Deserialize)]
struct NewMessage {
    content: String,
}

/// Chat reducer
///
/// Appends the message of every [`ADD_MESSAGE`] on a new line and leaves the
/// state unchanged for any other action.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatReducer;

impl Reducer<ChatState> for ChatReducer {
    fn reduce(&self, state: &ChatState, action: &Action) -> Result<ChatState, BoxError> {
        if !action.is(ADD_MESSAGE) {
            return Ok(state.clone());
        }

        let NewMessage { content } = action
            .decode()
            .map_err(|e| format!("{ADD_MESSAGE} needs a string `content`: {e}"))?;
        Ok(ChatState {
            content: format!("{}\n{content}", state.content),
        })
    }
}

/// Build a chat store: registers [`ADD_MESSAGE`] and installs [`ChatReducer`]
///
/// # Errors
///
/// Returns [`StoreError`] if the action cannot be registered.
pub fn build_store(initial: ChatState, config: StoreConfig) -> Result<Store<ChatState>, StoreError> {
    build_store_with_clock(initial, config, SystemClock)
}

/// Build a chat store whose snapshots are stamped by `clock`
///
/// # Errors
///
/// Returns [`StoreError`] if the action cannot be registered.
pub fn build_store_with_clock<C>(
    initial: ChatState,
    config: StoreConfig,
    clock: C,
) -> Result<Store<ChatState>, StoreError>
where
    C: Clock + 'static,
{
    let store = Store::with_clock(initial, config, clock);
    store.register_action_with(ADD_MESSAGE, |_, args| json!({ "content": args.first() }))?;
    store.set_reducer(ChatReducer);
    Ok(store)
}

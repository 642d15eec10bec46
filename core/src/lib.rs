//! # Simple State Core
//!
//! Core types for the simple-state container.
//!
//! This crate holds everything a caller needs to describe *how* state changes,
//! independent of the container that drives those changes:
//!
//! - **Action**: Tagged payload handed to the reducer (transform fields + `type`)
//! - **Reducer**: Function `(previous state, action) → new state`
//! - **Naming**: Rules for action names and their `on<Name>` subscription members
//! - **Environment**: Injected dependencies (currently the [`environment::Clock`])
//!
//! The container itself lives in `simple-state-runtime`.
//!
//! ## Example
//!
//! ```
//! use simple_state_core::{action::Action, reducer::Reducer};
//! use simple_state_core::reducer::BoxError;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Chat {
//!     content: String,
//! }
//!
//! struct ChatReducer;
//!
//! impl Reducer<Chat> for ChatReducer {
//!     fn reduce(&self, state: &Chat, action: &Action) -> Result<Chat, BoxError> {
//!         match action.action_type() {
//!             "addMessage" => Ok(Chat {
//!                 content: format!("{}\n{}", state.content, action.get_str("content").unwrap_or_default()),
//!             }),
//!             _ => Ok(state.clone()),
//!         }
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde_json::{Value, json};

/// Tagged action payloads
pub mod action;

/// The reducer abstraction
pub mod reducer;

/// Action name validation and subscription member naming
pub mod naming;

/// Environment module - Dependency injection traits
///
/// External dependencies of the container are abstracted behind traits so
/// tests can substitute deterministic implementations.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// The container stamps every snapshot it forwards to the sink with the
    /// time reported by its clock.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use action::{Action, Fields};
pub use environment::{Clock, SystemClock};
pub use naming::{NameError, WILDCARD, subscription_name, validate_action_name};
pub use reducer::{BoxError, FnReducer, Reducer};

//! # Simple State Runtime
//!
//! The state container: a [`Store`] couples named actions to a single reducer
//! and notifies subscribers after every state transition.
//!
//! ## Core Components
//!
//! - **Store**: Owns the state, the registered actions, the reducer and the sink
//! - **Snapshot**: Read-only view forwarded to the sink after each committed dispatch
//! - **Dead Letter Queue**: Listener and sink failures recorded after commit
//! - **Config**: Store name, DLQ bound and sink failure policy
//!
//! ## Dispatch Protocol
//!
//! 1. The action's transform shapes the call arguments into payload fields
//! 2. The fields are tagged with the action name and handed to the reducer
//! 3. The reducer's result replaces the state
//! 4. The action's listeners run, then the wildcard listeners
//! 5. A [`Snapshot`] is forwarded to the sink
//!
//! A failing reducer stops the sequence at step 2 with nothing committed.
//! Failures in steps 4 and 5 never roll the state back.
//!
//! ## Example
//!
//! ```
//! use simple_state_runtime::Store;
//! use serde_json::json;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! # fn main() -> Result<(), simple_state_runtime::StoreError> {
//! let store = Store::new(0_i64);
//! store
//!     .register_action("increment")?
//!     .register_action_with("add", |_, args| json!({ "by": args.first() }))?;
//!
//! store.set_reducer_fn(|count: &i64, action| match action.action_type() {
//!     "increment" => Ok(count + 1),
//!     "add" => Ok(count + action.get("by").and_then(|v| v.as_i64()).unwrap_or(0)),
//!     _ => Ok(*count),
//! });
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&seen);
//! store.subscribe_all(move |count| log.borrow_mut().push(*count));
//!
//! store.dispatch("increment", &[])?.dispatch("add", &[json!(10)])?;
//!
//! assert_eq!(store.current_state(), 11);
//! assert_eq!(*seen.borrow(), vec![1, 11]);
//! # Ok(())
//! # }
//! ```

/// Error types for the Store runtime
pub mod error;

/// Store configuration
pub mod config;

/// Dead letter queue for notification failures
pub mod dead_letter;

/// Metric names and descriptions
pub mod metrics;

/// Snapshots forwarded to the sink
pub mod snapshot;

/// The Store
pub mod store;

pub use config::{SinkPolicy, StoreConfig};
pub use dead_letter::{DeadLetter, DeadLetterQueue, FailureTarget};
pub use error::{ConfigError, StoreError};
pub use snapshot::{Snapshot, Subscriptions};
pub use store::{ActionHandle, Member, Store};

pub use simple_state_core::{Action, BoxError, Fields, Reducer};

#[cfg(test)]
mod tests;

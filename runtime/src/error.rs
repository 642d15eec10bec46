//! Error types for the Store runtime

use simple_state_core::{BoxError, NameError};
use thiserror::Error;

/// Errors that can occur during Store operations
///
/// Registration and dispatch errors are returned synchronously to the caller.
/// Listener and sink errors happen after the new state has been committed, so
/// they never roll it back; they are logged and recorded in the store's
/// [`DeadLetterQueue`](crate::DeadLetterQueue) instead.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Registration was attempted with an unusable action name
    #[error("Invalid action name {name:?}: {reason}")]
    InvalidActionName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: NameError,
    },

    /// Dispatch or subscription for a name that was never registered
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The reducer failed; nothing was committed
    #[error("Reducer failed while handling {action}: {source}")]
    Reducer {
        /// Action being dispatched
        action: String,
        /// Error raised by the reducer
        #[source]
        source: BoxError,
    },

    /// A listener failed after the state was committed
    #[error("Listener failed while handling {action}: {source}")]
    Listener {
        /// Action being dispatched
        action: String,
        /// Error raised by the listener
        #[source]
        source: BoxError,
    },

    /// The sink failed after the state was committed
    ///
    /// Only returned from `dispatch` under [`SinkPolicy::Propagate`](crate::SinkPolicy::Propagate).
    #[error("Sink failed while forwarding {action}: {source}")]
    Sink {
        /// Action being dispatched
        action: String,
        /// Error raised by the sink
        #[source]
        source: BoxError,
    },

    /// A snapshot's subscription registrar outlived its store
    #[error("Store has been dropped")]
    Detached,

    /// Store configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StoreError {
    /// Whether the error was raised after the state transition committed
    #[must_use]
    pub const fn is_post_commit(&self) -> bool {
        matches!(self, Self::Listener { .. } | Self::Sink { .. })
    }
}

/// Errors raised while loading a [`StoreConfig`](crate::StoreConfig)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to a value that could not be parsed
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Variable name
        key: String,
        /// Raw value
        value: String,
        /// Parse failure description
        reason: String,
    },
}

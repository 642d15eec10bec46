//! # Simple State Testing
//!
//! Testing utilities and helpers for simple-state stores and reducers.
//!
//! This crate provides:
//! - Deterministic implementations of Environment traits ([`FixedClock`])
//! - Recorders that capture listener and sink calls ([`Recorder`], [`CallLog`])
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - proptest strategies for action names
//!
//! ## Example
//!
//! ```ignore
//! use simple_state_testing::{Recorder, test_clock};
//! use simple_state_runtime::{Store, StoreConfig};
//!
//! let sink = Recorder::new();
//! let store = Store::with_clock(ChatState::default(), StoreConfig::default(), test_clock());
//! store.connect(sink.fallible());
//!
//! store.dispatch("addMessage", &[json!("world")])?;
//! assert_eq!(sink.len(), 1);
//! ```

use chrono::{DateTime, Utc};
use simple_state_core::environment::Clock;

/// Listener and sink recorders
pub mod recorder;


/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making snapshot timestamps reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use simple_state_testing::mocks::FixedClock;
    /// use simple_state_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }
}

/// Test helpers and utilities
pub mod helpers {
    /// Install a `tracing` subscriber for the current test binary
    ///
    /// Honours `RUST_LOG`; silent by default. Safe to call from every test.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off")),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest
pub mod properties {
    use proptest::prelude::*;

    /// Valid action names (identifier-like, never the wildcard)
    pub fn action_name() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z0-9_]{0,12}"
    }

    /// Between `min` and `max` distinct valid action names
    pub fn action_names(min: usize, max: usize) -> impl Strategy<Value = Vec<String>> {
        proptest::collection::btree_set(action_name(), min..=max)
            .prop_map(|names| names.into_iter().collect())
    }

    /// Names registration must reject
    pub fn invalid_action_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("*".to_string()),
            "[a-z]{1,5} [a-z]{1,5}",
            "[a-z]{1,5}\t",
        ]
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use recorder::{CallLog, Recorder};
pub use reducer_test::ReducerTest;

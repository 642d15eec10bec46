//! Store configuration.
//!
//! Loaded from environment variables with sensible defaults, or assembled with
//! the builder methods.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;

/// Environment variable naming the store (labels logs and metrics)
pub const ENV_NAME: &str = "SIMPLE_STATE_NAME";
/// Environment variable bounding the dead letter queue
pub const ENV_DLQ_MAX_SIZE: &str = "SIMPLE_STATE_DLQ_MAX_SIZE";
/// Environment variable selecting the [`SinkPolicy`] (`log` or `propagate`)
pub const ENV_SINK_POLICY: &str = "SIMPLE_STATE_SINK_POLICY";

/// What `dispatch` does when the sink fails
///
/// In both cases the new state stays committed, the failure is logged and it
/// is recorded in the dead letter queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkPolicy {
    /// `dispatch` still returns `Ok`
    #[default]
    LogAndContinue,
    /// `dispatch` returns [`StoreError::Sink`](crate::StoreError::Sink)
    Propagate,
}

impl std::str::FromStr for SinkPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" | "log_and_continue" => Ok(Self::LogAndContinue),
            "propagate" => Ok(Self::Propagate),
            other => Err(format!("expected `log` or `propagate`, got `{other}`")),
        }
    }
}

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use simple_state_runtime::{SinkPolicy, StoreConfig};
///
/// let config = StoreConfig::default()
///     .with_name("chat")
///     .with_dlq_max_size(10)
///     .with_sink_policy(SinkPolicy::Propagate);
///
/// assert_eq!(config.name, "chat");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Label used in tracing spans and metric labels
    pub name: String,
    /// Maximum number of entries kept in the dead letter queue
    pub dlq_max_size: usize,
    /// Behaviour on sink failure
    pub sink_policy: SinkPolicy,
}

impl StoreConfig {
    /// Set the store name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the DLQ maximum size
    #[must_use]
    pub const fn with_dlq_max_size(mut self, max_size: usize) -> Self {
        self.dlq_max_size = max_size;
        self
    }

    /// Set the sink failure policy
    #[must_use]
    pub const fn with_sink_policy(mut self, policy: SinkPolicy) -> Self {
        self.sink_policy = policy;
        self
    }

    /// Load configuration from the process environment
    ///
    /// Unset variables fall back to [`StoreConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable is set but cannot
    /// be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable is set but cannot
    /// be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let name = lookup(ENV_NAME)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(defaults.name);

        let dlq_max_size = match lookup(ENV_DLQ_MAX_SIZE) {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: ENV_DLQ_MAX_SIZE.to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => defaults.dlq_max_size,
        };

        let sink_policy = match lookup(ENV_SINK_POLICY) {
            Some(raw) => raw.parse::<SinkPolicy>().map_err(|reason| ConfigError::InvalidValue {
                key: ENV_SINK_POLICY.to_string(),
                value: raw.clone(),
                reason,
            })?,
            None => defaults.sink_policy,
        };

        Ok(Self {
            name,
            dlq_max_size,
            sink_policy,
        })
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "store".to_string(),
            dlq_max_size: 100,
            sink_policy: SinkPolicy::LogAndContinue,
        }
    }
}

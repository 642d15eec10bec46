//! Metrics emitted by the Store.
//!
//! The store records through the [`metrics`] facade; without an installed
//! recorder every call is a no-op. Applications that export metrics call
//! [`register_metrics`] once after installing their recorder so the
//! descriptions show up alongside the values.

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Dispatches that reached the reducer stage
pub const DISPATCH_TOTAL: &str = "store.dispatch.total";
/// Dispatches rejected because the action was never registered
pub const DISPATCH_REJECTED: &str = "store.dispatch.rejected";
/// Reducer failures
pub const REDUCER_FAILURES: &str = "store.reducer.failures";
/// Reducer execution time
pub const REDUCER_DURATION: &str = "store.reducer.duration_seconds";
/// Listener failures (named and wildcard)
pub const LISTENER_FAILURES: &str = "store.listener.failures";
/// Sink failures
pub const SINK_FAILURES: &str = "store.sink.failures";
/// Current dead letter queue size
pub const DLQ_SIZE: &str = "store.dlq.size";
/// Dead letters discarded because the queue was full
pub const DLQ_DROPPED: &str = "store.dlq.dropped";

/// Register descriptions for every metric the store emits
pub fn register_metrics() {
    describe_counter!(DISPATCH_TOTAL, "Actions dispatched to the reducer");
    describe_counter!(DISPATCH_REJECTED, "Dispatches of unregistered actions");
    describe_counter!(REDUCER_FAILURES, "Reducer invocations that returned an error");
    describe_histogram!(
        REDUCER_DURATION,
        Unit::Seconds,
        "Time spent computing the next state"
    );
    describe_counter!(LISTENER_FAILURES, "Listeners that returned an error");
    describe_counter!(SINK_FAILURES, "Sink invocations that returned an error");
    describe_gauge!(DLQ_SIZE, "Entries in the dead letter queue");
    describe_counter!(DLQ_DROPPED, "Dead letters discarded at capacity");

    tracing::debug!("Registered store metric descriptions");
}

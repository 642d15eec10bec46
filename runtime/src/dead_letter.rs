//! Dead letter queue for post-commit notification failures.
//!
//! Listener and sink failures cannot roll back a committed state transition,
//! so the store records them here for later inspection.

use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Which callback failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureTarget {
    /// Listener subscribed to the dispatched action, by subscription position
    Listener {
        /// Position in the action's listener list
        index: usize,
    },
    /// Wildcard listener, by subscription position
    Wildcard {
        /// Position in the wildcard list
        index: usize,
    },
    /// The connected sink
    Sink,
}

impl std::fmt::Display for FailureTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listener { index } => write!(f, "listener[{index}]"),
            Self::Wildcard { index } => write!(f, "wildcard[{index}]"),
            Self::Sink => write!(f, "sink"),
        }
    }
}

/// Dead letter queue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    /// Action whose notification pass failed
    pub action: String,
    /// Callback that failed
    pub target: FailureTarget,
    /// The error message reported by the callback
    pub error_message: String,
    /// State version the callback was notified about
    pub version: u64,
    /// When the failure was recorded
    pub recorded_at: DateTime<Utc>,
}

/// Dead Letter Queue for failed notifications
///
/// # Features
///
/// - Bounded queue with configurable max size
/// - FIFO ordering (oldest entries dropped when full)
/// - Cheap clones sharing the same storage
///
/// # Example
///
/// ```
/// use simple_state_runtime::{DeadLetter, DeadLetterQueue, FailureTarget};
/// use chrono::Utc;
///
/// let dlq = DeadLetterQueue::new(2);
/// dlq.push(DeadLetter {
///     action: "addMessage".into(),
///     target: FailureTarget::Sink,
///     error_message: "disk full".into(),
///     version: 1,
///     recorded_at: Utc::now(),
/// });
///
/// assert_eq!(dlq.len(), 1);
/// assert_eq!(dlq.drain().len(), 1);
/// assert!(dlq.is_empty());
/// ```
#[derive(Debug)]
pub struct DeadLetterQueue {
    queue: Rc<RefCell<VecDeque<DeadLetter>>>,
    max_size: usize,
}

impl DeadLetterQueue {
    /// Create a new dead letter queue with the given max size
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            queue: Rc::new(RefCell::new(VecDeque::new())),
            max_size,
        }
    }

    /// Record a failure
    ///
    /// If the queue is full, the oldest entry is dropped. A queue with a max
    /// size of zero records nothing.
    pub fn push(&self, entry: DeadLetter) {
        if self.max_size == 0 {
            metrics::counter!(crate::metrics::DLQ_DROPPED).increment(1);
            return;
        }

        let mut queue = self.queue.borrow_mut();

        // Drop oldest if at capacity
        if queue.len() >= self.max_size {
            queue.pop_front();
            metrics::counter!(crate::metrics::DLQ_DROPPED).increment(1);
            tracing::warn!(
                max_size = self.max_size,
                "DLQ at capacity, dropping oldest entry"
            );
        }

        queue.push_back(entry);

        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!(crate::metrics::DLQ_SIZE).set(queue.len() as f64);
    }

    /// Get the current queue size
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Check if the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain all entries from the queue, oldest first
    pub fn drain(&self) -> Vec<DeadLetter> {
        let entries: Vec<_> = self.queue.borrow_mut().drain(..).collect();

        metrics::gauge!(crate::metrics::DLQ_SIZE).set(0.0);
        tracing::debug!(count = entries.len(), "Drained dead letter queue");

        entries
    }

    /// Peek at the oldest entry without removing it
    #[must_use]
    pub fn peek(&self) -> Option<DeadLetter> {
        self.queue.borrow().front().cloned()
    }

    /// Get the maximum queue size
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Clone for DeadLetterQueue {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
            max_size: self.max_size,
        }
    }
}

impl Default for DeadLetterQueue {
    fn default() -> Self {
        Self::new(100)
    }
}

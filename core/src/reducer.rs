//! The reducer abstraction.
//!
//! A container has exactly one active reducer. It receives the previous state
//! and the tagged [`Action`] and must return the *complete* next state; the
//! container performs no partial merges.
//!
//! Reducers are expected to be pure with respect to their inputs. A reducer
//! that fails leaves the container's state untouched.

use crate::action::Action;

/// Error type returned by caller-supplied callbacks (reducers, listeners, sinks)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The Reducer trait - the single state transition function of a container
///
/// # Example
///
/// ```
/// use simple_state_core::{Action, BoxError, Reducer};
///
/// struct Counter;
///
/// impl Reducer<i64> for Counter {
///     fn reduce(&self, state: &i64, action: &Action) -> Result<i64, BoxError> {
///         match action.action_type() {
///             "increment" => Ok(state + 1),
///             "fail" => Err("refusing".into()),
///             _ => Ok(*state),
///         }
///     }
/// }
///
/// assert_eq!(Counter.reduce(&1, &Action::bare("increment")).ok(), Some(2));
/// assert!(Counter.reduce(&1, &Action::bare("fail")).is_err());
/// ```
pub trait Reducer<S> {
    /// Compute the next state from the previous one
    ///
    /// # Errors
    ///
    /// Any error aborts the dispatch: nothing is committed and no subscriber
    /// is notified.
    fn reduce(&self, state: &S, action: &Action) -> Result<S, BoxError>;
}

/// Adapter turning a closure into a [`Reducer`]
pub struct FnReducer<F>(F);

impl<F> FnReducer<F> {
    /// Wrap a closure
    #[must_use]
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

impl<S, F> Reducer<S> for FnReducer<F>
where
    F: Fn(&S, &Action) -> Result<S, BoxError>,
{
    fn reduce(&self, state: &S, action: &Action) -> Result<S, BoxError> {
        (self.0)(state, action)
    }
}

impl<F> std::fmt::Debug for FnReducer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnReducer(<closure>)")
    }
}

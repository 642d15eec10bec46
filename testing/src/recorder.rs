//! Recorders for listener and sink calls.
//!
//! Store callbacks must be `'static`, so recorders share their storage
//! through `Rc<RefCell<_>>`: the closure handed to the store and the
//! recorder kept by the test see the same calls.

use simple_state_core::BoxError;
use std::cell::RefCell;
use std::rc::Rc;

/// Records every value a listener or sink is called with
///
/// # Example
///
/// ```
/// use simple_state_testing::Recorder;
///
/// let recorder = Recorder::<i64>::new();
/// let listener = recorder.listener();
/// listener(&1);
/// listener(&2);
/// assert_eq!(recorder.calls(), vec![1, 2]);
/// ```
#[derive(Debug)]
pub struct Recorder<T> {
    calls: Rc<RefCell<Vec<T>>>,
}

impl<T: Clone + 'static> Recorder<T> {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A listener that records each call
    pub fn listener(&self) -> impl Fn(&T) + use<T> {
        let calls = Rc::clone(&self.calls);
        move |value: &T| calls.borrow_mut().push(value.clone())
    }

    /// A fallible callback that records each call and succeeds
    pub fn fallible(&self) -> impl Fn(&T) -> Result<(), BoxError> + use<T> {
        let calls = Rc::clone(&self.calls);
        move |value: &T| {
            calls.borrow_mut().push(value.clone());
            Ok(())
        }
    }

    /// A fallible callback that records each call and then fails with `message`
    pub fn failing(&self, message: &'static str) -> impl Fn(&T) -> Result<(), BoxError> + use<T> {
        let calls = Rc::clone(&self.calls);
        move |value: &T| {
            calls.borrow_mut().push(value.clone());
            Err(message.into())
        }
    }

    /// Record a value directly
    pub fn record(&self, value: T) {
        self.calls.borrow_mut().push(value);
    }

    /// Every recorded call, oldest first
    #[must_use]
    pub fn calls(&self) -> Vec<T> {
        self.calls.borrow().clone()
    }

    /// The most recent call
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.calls.borrow().last().cloned()
    }

    /// Number of recorded calls
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }

    /// Forget all recorded calls
    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl<T: Clone + 'static> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            calls: Rc::clone(&self.calls),
        }
    }
}

/// Ordered log of labelled callback invocations
///
/// Used to assert the relative order of callbacks of different kinds
/// (named listeners, wildcard listeners, the sink) over the same store.
///
/// ```
/// use simple_state_testing::CallLog;
///
/// let log = CallLog::<u8>::new();
/// let first = log.marker("first");
/// let second = log.marker("second");
/// second(&0);
/// first(&0);
/// assert_eq!(log.entries(), vec!["second", "first"]);
/// ```
#[derive(Debug)]
pub struct CallLog<X> {
    entries: Rc<RefCell<Vec<String>>>,
    _arg: std::marker::PhantomData<fn(&X)>,
}

impl<X: 'static> CallLog<X> {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(Vec::new())),
            _arg: std::marker::PhantomData,
        }
    }

    /// A listener that appends `label` when called
    pub fn marker(&self, label: &str) -> impl Fn(&X) + use<X> {
        let entries = Rc::clone(&self.entries);
        let label = label.to_string();
        move |_: &X| entries.borrow_mut().push(label.clone())
    }

    /// A fallible callback that appends `label` when called and succeeds
    pub fn fallible_marker(&self, label: &str) -> impl Fn(&X) -> Result<(), BoxError> + use<X> {
        let entries = Rc::clone(&self.entries);
        let label = label.to_string();
        move |_: &X| {
            entries.borrow_mut().push(label.clone());
            Ok(())
        }
    }

    /// Append an entry directly
    pub fn push(&self, label: &str) {
        self.entries.borrow_mut().push(label.to_string());
    }

    /// Every label, in call order
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }
}

impl<X: 'static> Default for CallLog<X> {
    fn default() -> Self {
        Self::new()
    }
}

impl<X> Clone for CallLog<X> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
            _arg: std::marker::PhantomData,
        }
    }
}

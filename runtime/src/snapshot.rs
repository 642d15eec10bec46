//! Read-only views handed to the sink.
//!
//! A [`Snapshot`] is built field by field: it copies the state and some
//! metadata, and carries a [`Subscriptions`] registrar. Nothing reachable from
//! a snapshot can register actions, install a reducer or rebind the sink.

use crate::error::StoreError;
use crate::store::{Inner, Listener};
use chrono::{DateTime, Utc};
use serde::Serialize;
use simple_state_core::BoxError;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// State forwarded to the sink after every committed dispatch
///
/// Serializes as `{ "state", "version", "action", "actions", "taken_at" }`.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<S> {
    state: S,
    version: u64,
    action: String,
    actions: Vec<String>,
    taken_at: DateTime<Utc>,
    #[serde(skip)]
    subscriptions: Subscriptions<S>,
}

impl<S> Snapshot<S> {
    pub(crate) const fn new(
        state: S,
        version: u64,
        action: String,
        actions: Vec<String>,
        taken_at: DateTime<Utc>,
        subscriptions: Subscriptions<S>,
    ) -> Self {
        Self {
            state,
            version,
            action,
            actions,
            taken_at,
            subscriptions,
        }
    }

    /// The state at the time the sink was called
    #[must_use]
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// Take ownership of the state
    #[must_use]
    pub fn into_state(self) -> S {
        self.state
    }

    /// Number of committed dispatches that produced this state
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// The action whose dispatch triggered this sink call
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Registered action names, sorted
    #[must_use]
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// When the snapshot was taken
    #[must_use]
    pub const fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Subscription registrar of the originating store
    #[must_use]
    pub const fn subscriptions(&self) -> &Subscriptions<S> {
        &self.subscriptions
    }
}

/// Subscription-only access to a store
///
/// Holds a weak reference: once every `Store` handle is dropped the
/// registrar reports [`StoreError::Detached`].
pub struct Subscriptions<S> {
    inner: Weak<RefCell<Inner<S>>>,
}

impl<S: 'static> Subscriptions<S> {
    pub(crate) const fn new(inner: Weak<RefCell<Inner<S>>>) -> Self {
        Self { inner }
    }

    fn upgrade(&self) -> Result<Rc<RefCell<Inner<S>>>, StoreError> {
        self.inner.upgrade().ok_or(StoreError::Detached)
    }

    /// Whether the originating store is still alive
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Subscribe to a registered action
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownAction`] if `name` is not registered,
    /// [`StoreError::Detached`] if the store is gone.
    pub fn on<F>(&self, name: &str, listener: F) -> Result<(), StoreError>
    where
        F: Fn(&S) + 'static,
    {
        self.try_on(name, move |state: &S| {
            listener(state);
            Ok(())
        })
    }

    /// Subscribe a fallible listener to a registered action
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownAction`] if `name` is not registered,
    /// [`StoreError::Detached`] if the store is gone.
    pub fn try_on<F>(&self, name: &str, listener: F) -> Result<(), StoreError>
    where
        F: Fn(&S) -> Result<(), BoxError> + 'static,
    {
        let listener: Listener<S> = Rc::new(listener);
        self.upgrade()?.borrow_mut().subscribe(name, listener)
    }

    /// Subscribe to every action
    ///
    /// # Errors
    ///
    /// [`StoreError::Detached`] if the store is gone.
    pub fn subscribe_all<F>(&self, listener: F) -> Result<(), StoreError>
    where
        F: Fn(&S) + 'static,
    {
        let listener: Listener<S> = Rc::new(move |state: &S| {
            listener(state);
            Ok(())
        });
        self.upgrade()?.borrow_mut().subscribe_all(listener);
        Ok(())
    }
}

impl<S> Clone for Subscriptions<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for Subscriptions<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriptions")
            .field("attached", &(self.inner.strong_count() > 0))
            .finish()
    }
}

//! The Store - the state container.

use crate::config::{SinkPolicy, StoreConfig};
use crate::dead_letter::{DeadLetter, DeadLetterQueue, FailureTarget};
use crate::error::StoreError;
use crate::metrics::{
    DISPATCH_REJECTED, DISPATCH_TOTAL, LISTENER_FAILURES, REDUCER_DURATION, REDUCER_FAILURES,
    SINK_FAILURES,
};
use crate::snapshot::{Snapshot, Subscriptions};
use serde_json::Value;
use simple_state_core::{Action, BoxError, Clock, FnReducer, Reducer, SystemClock, naming};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

pub(crate) type Listener<S> = Rc<dyn Fn(&S) -> Result<(), BoxError>>;
type Sink<S> = Rc<dyn Fn(&Snapshot<S>) -> Result<(), BoxError>>;
type Transform<S> = Rc<dyn Fn(&S, &[Value]) -> Value>;

/// Listener lists are copied before a notification pass
type ListenerBatch<S> = SmallVec<[Listener<S>; 4]>;

enum Dispatcher<S> {
    /// Installed at construction: dispatches leave the state alone and notify nobody
    Placeholder,
    Installed(Rc<dyn Reducer<S>>),
}

struct ActionEntry<S> {
    transform: Option<Transform<S>>,
    listeners: Vec<Listener<S>>,
}

pub(crate) struct Inner<S> {
    state: S,
    version: u64,
    sink: Sink<S>,
    actions: HashMap<String, ActionEntry<S>>,
    wildcard: Vec<Listener<S>>,
    /// `on<Name>` member -> action name
    subscription_members: HashMap<String, String>,
    dispatcher: Dispatcher<S>,
    dead_letters: DeadLetterQueue,
    clock: Rc<dyn Clock>,
    config: StoreConfig,
}

impl<S> Inner<S> {
    pub(crate) fn subscribe(&mut self, name: &str, listener: Listener<S>) -> Result<(), StoreError> {
        let entry = self
            .actions
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownAction(name.to_string()))?;
        entry.listeners.push(listener);
        tracing::trace!(action = name, listeners = entry.listeners.len(), "Listener subscribed");
        Ok(())
    }

    pub(crate) fn subscribe_all(&mut self, listener: Listener<S>) {
        self.wildcard.push(listener);
        tracing::trace!(listeners = self.wildcard.len(), "Wildcard listener subscribed");
    }

    fn registered_actions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

/// State as last observed by a notification pass
struct Observed<S> {
    version: u64,
    state: S,
}

/// The Store - a single-threaded state container
///
/// The Store owns:
/// 1. The current state
/// 2. The registered actions, each with an optional transform and its listeners
/// 3. The wildcard listeners, notified for every action
/// 4. The reducer (a placeholder until [`Store::set_reducer`] is called)
/// 5. The sink, fed a [`Snapshot`] after every committed dispatch
///
/// `Store` is a cheap handle: clones share the same container. No internal
/// borrow is held while transforms, reducers, listeners or the sink run, so
/// they may call back into the store.
///
/// # Example
///
/// ```
/// use simple_state_runtime::Store;
/// use serde_json::json;
///
/// # fn main() -> Result<(), simple_state_runtime::StoreError> {
/// let store = Store::new(String::from("hello"));
/// store.register_action_with("addMessage", |_, args| json!({ "content": args.first() }))?;
/// store.set_reducer_fn(|state: &String, action| match action.action_type() {
///     "addMessage" => Ok(format!("{state}\n{}", action.get_str("content").unwrap_or_default())),
///     _ => Ok(state.clone()),
/// });
///
/// store.dispatch("addMessage", &[json!("world")])?;
/// assert_eq!(store.current_state(), "hello\nworld");
/// # Ok(())
/// # }
/// ```
pub struct Store<S> {
    inner: Rc<RefCell<Inner<S>>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Store")
            .field("name", &inner.config.name)
            .field("version", &inner.version)
            .field("actions", &inner.registered_actions())
            .field("wildcard_listeners", &inner.wildcard.len())
            .field("has_reducer", &matches!(inner.dispatcher, Dispatcher::Installed(_)))
            .finish_non_exhaustive()
    }
}

impl<S: Clone + 'static> Store<S> {
    /// Create a store with the default configuration
    ///
    /// The sink is a no-op, no action is registered and the reducer is a
    /// placeholder that leaves the state unchanged.
    #[must_use]
    pub fn new(initial_state: S) -> Self {
        Self::with_config(initial_state, StoreConfig::default())
    }

    /// Create a store with custom configuration
    #[must_use]
    pub fn with_config(initial_state: S, config: StoreConfig) -> Self {
        Self::with_clock(initial_state, config, SystemClock)
    }

    /// Create a store with custom configuration and clock
    ///
    /// The clock stamps every [`Snapshot`] and dead letter.
    #[must_use]
    pub fn with_clock<C>(initial_state: S, config: StoreConfig, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        tracing::debug!(store = %config.name, "Creating store");

        let noop: Sink<S> = Rc::new(|_: &Snapshot<S>| Ok(()));
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: initial_state,
                version: 0,
                sink: noop,
                actions: HashMap::new(),
                wildcard: Vec::new(),
                subscription_members: HashMap::new(),
                dispatcher: Dispatcher::Placeholder,
                dead_letters: DeadLetterQueue::new(config.dlq_max_size),
                clock: Rc::new(clock),
                config,
            })),
        }
    }

    /// Replace the sink
    ///
    /// The sink receives a [`Snapshot`] after every committed dispatch, once
    /// all listeners have run. What happens when it fails depends on the
    /// configured [`SinkPolicy`].
    pub fn connect<F>(&self, sink: F) -> &Self
    where
        F: Fn(&Snapshot<S>) -> Result<(), BoxError> + 'static,
    {
        self.inner.borrow_mut().sink = Rc::new(sink);
        tracing::debug!("Sink connected");
        self
    }

    /// Install the reducer
    ///
    /// Meant to happen once per store. Replacing an installed reducer is
    /// allowed but logged.
    pub fn set_reducer<R>(&self, reducer: R) -> &Self
    where
        R: Reducer<S> + 'static,
    {
        let previous = std::mem::replace(
            &mut self.inner.borrow_mut().dispatcher,
            Dispatcher::Installed(Rc::new(reducer)),
        );
        if matches!(previous, Dispatcher::Installed(_)) {
            tracing::warn!("Replacing an installed reducer");
        } else {
            tracing::debug!("Reducer installed");
        }
        self
    }

    /// Install a closure as the reducer
    ///
    /// See [`Store::set_reducer`].
    pub fn set_reducer_fn<F>(&self, reducer: F) -> &Self
    where
        F: Fn(&S, &Action) -> Result<S, BoxError> + 'static,
    {
        self.set_reducer(FnReducer::new(reducer))
    }

    /// Register an action without a transform
    ///
    /// Its payload carries no fields besides the `type` tag.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidActionName`] for an empty name, the
    /// wildcard `*`, or a name containing whitespace or control characters.
    pub fn register_action(&self, name: &str) -> Result<&Self, StoreError> {
        self.register(name, None)
    }

    /// Register an action whose arguments are shaped by `transform`
    ///
    /// The transform sees the current state and the dispatch arguments and
    /// returns the payload fields (see [`Action::from_value`]). Registering a
    /// name again replaces its transform and drops its listeners.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidActionName`] for an empty name, the
    /// wildcard `*`, or a name containing whitespace or control characters.
    pub fn register_action_with<F>(&self, name: &str, transform: F) -> Result<&Self, StoreError>
    where
        F: Fn(&S, &[Value]) -> Value + 'static,
    {
        self.register(name, Some(Rc::new(transform)))
    }

    fn register(&self, name: &str, transform: Option<Transform<S>>) -> Result<&Self, StoreError> {
        naming::validate_action_name(name).map_err(|reason| {
            tracing::warn!(action = name, %reason, "Rejected action registration");
            StoreError::InvalidActionName {
                name: name.to_string(),
                reason,
            }
        })?;

        let member = naming::subscription_name(name);
        let replaced = {
            let mut inner = self.inner.borrow_mut();
            if let Some(previous) = inner
                .subscription_members
                .insert(member.clone(), name.to_string())
                .filter(|previous| previous != name)
            {
                tracing::warn!(
                    action = name,
                    subscription = %member,
                    previous = %previous,
                    "Subscription member now resolves to a different action"
                );
            }
            inner
                .actions
                .insert(
                    name.to_string(),
                    ActionEntry {
                        transform,
                        listeners: Vec::new(),
                    },
                )
                .is_some()
        };

        if replaced {
            tracing::warn!(action = name, "Re-registered action, its listeners were reset");
        } else {
            tracing::debug!(action = name, subscription = %member, "Registered action");
        }
        Ok(self)
    }

    /// Invoke a registered action
    ///
    /// Runs the action's transform over `args`, tags the result with `name`
    /// and hands it to the reducer. Once the new state is committed, the
    /// action's listeners run in subscription order, then the wildcard
    /// listeners, then the sink.
    ///
    /// Before a reducer is installed, dispatching a registered action is a
    /// no-op: nothing is committed and nobody is notified.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnknownAction`]: `name` was never registered; nothing runs
    /// - [`StoreError::Reducer`]: the reducer failed; state is unchanged and nobody is notified
    /// - [`StoreError::Sink`]: the sink failed under [`SinkPolicy::Propagate`]; state stays committed
    #[tracing::instrument(skip_all, fields(action = name), name = "store_dispatch")]
    pub fn dispatch(&self, name: &str, args: &[Value]) -> Result<&Self, StoreError> {
        let (store_name, transform, current) = {
            let inner = self.inner.borrow();
            let Some(entry) = inner.actions.get(name) else {
                metrics::counter!(DISPATCH_REJECTED, "store" => inner.config.name.clone())
                    .increment(1);
                tracing::warn!("Rejected dispatch of unregistered action");
                return Err(StoreError::UnknownAction(name.to_string()));
            };
            let transform = entry.transform.clone();
            let current = transform.as_ref().map(|_| inner.state.clone());
            (inner.config.name.clone(), transform, current)
        };

        metrics::counter!(DISPATCH_TOTAL, "store" => store_name.clone()).increment(1);

        let action = match (transform, current) {
            (Some(transform), Some(current)) => Action::from_value(name, transform(&current, args)),
            _ => Action::bare(name),
        };

        // The transform may have dispatched, so the reducer reads the state as it is now
        let (reducer, previous) = {
            let inner = self.inner.borrow();
            let reducer = match &inner.dispatcher {
                Dispatcher::Placeholder => None,
                Dispatcher::Installed(reducer) => Some(Rc::clone(reducer)),
            };
            (reducer, inner.state.clone())
        };

        let Some(reducer) = reducer else {
            tracing::debug!("No reducer installed, state left unchanged");
            return Ok(self);
        };

        let span = tracing::debug_span!("reducer_execution");
        let result = {
            let _enter = span.enter();
            let start = Instant::now();
            let result = reducer.reduce(&previous, &action);
            metrics::histogram!(REDUCER_DURATION, "store" => store_name.clone())
                .record(start.elapsed().as_secs_f64());
            result
        };

        let next = match result {
            Ok(next) => next,
            Err(source) => {
                metrics::counter!(REDUCER_FAILURES, "store" => store_name).increment(1);
                tracing::warn!(error = %source, "Reducer failed, state not committed");
                return Err(StoreError::Reducer {
                    action: name.to_string(),
                    source,
                });
            },
        };

        let (version, named, wildcard) = {
            let mut inner = self.inner.borrow_mut();
            inner.state = next.clone();
            inner.version += 1;
            let named: ListenerBatch<S> = inner
                .actions
                .get(name)
                .map(|entry| entry.listeners.iter().cloned().collect())
                .unwrap_or_default();
            let wildcard: ListenerBatch<S> = inner.wildcard.iter().cloned().collect();
            (inner.version, named, wildcard)
        };

        tracing::debug!(
            version,
            listeners = named.len(),
            wildcard = wildcard.len(),
            "State committed"
        );

        let mut observed = Observed {
            version,
            state: next,
        };
        self.notify(name, &store_name, &mut observed, &named, &wildcard)?;
        Ok(self)
    }

    /// Run listeners, wildcard listeners and the sink, in that order
    ///
    /// Every callback sees the latest committed state, which differs from the
    /// state this dispatch produced only if an earlier callback dispatched again.
    fn notify(
        &self,
        name: &str,
        store_name: &str,
        observed: &mut Observed<S>,
        named: &[Listener<S>],
        wildcard: &[Listener<S>],
    ) -> Result<(), StoreError> {
        for (index, listener) in named.iter().enumerate() {
            self.observe(observed);
            if let Err(source) = listener(&observed.state) {
                let error = StoreError::Listener {
                    action: name.to_string(),
                    source,
                };
                self.record_failure(store_name, name, FailureTarget::Listener { index }, observed.version, &error);
            }
        }

        for (index, listener) in wildcard.iter().enumerate() {
            self.observe(observed);
            if let Err(source) = listener(&observed.state) {
                let error = StoreError::Listener {
                    action: name.to_string(),
                    source,
                };
                self.record_failure(store_name, name, FailureTarget::Wildcard { index }, observed.version, &error);
            }
        }

        self.observe(observed);
        let (snapshot, sink, policy) = {
            let inner = self.inner.borrow();
            let snapshot = Snapshot::new(
                observed.state.clone(),
                observed.version,
                name.to_string(),
                inner.registered_actions(),
                inner.clock.now(),
                Subscriptions::new(Rc::downgrade(&self.inner)),
            );
            (snapshot, Rc::clone(&inner.sink), inner.config.sink_policy)
        };

        tracing::trace!(version = snapshot.version(), "Forwarding snapshot to sink");
        match sink(&snapshot) {
            Ok(()) => Ok(()),
            Err(source) => {
                let error = StoreError::Sink {
                    action: name.to_string(),
                    source,
                };
                self.record_failure(store_name, name, FailureTarget::Sink, snapshot.version(), &error);
                match policy {
                    SinkPolicy::LogAndContinue => Ok(()),
                    SinkPolicy::Propagate => Err(error),
                }
            },
        }
    }

    fn observe(&self, observed: &mut Observed<S>) {
        let inner = self.inner.borrow();
        if inner.version != observed.version {
            observed.version = inner.version;
            observed.state = inner.state.clone();
        }
    }

    fn record_failure(
        &self,
        store_name: &str,
        action: &str,
        target: FailureTarget,
        version: u64,
        error: &StoreError,
    ) {
        let counter = match target {
            FailureTarget::Sink => SINK_FAILURES,
            FailureTarget::Listener { .. } | FailureTarget::Wildcard { .. } => LISTENER_FAILURES,
        };
        metrics::counter!(counter, "store" => store_name.to_string()).increment(1);
        tracing::warn!(%target, version, error = %error, "Notification failed after commit");

        let error_message = std::error::Error::source(error)
            .map_or_else(|| error.to_string(), ToString::to_string);

        let (dead_letters, recorded_at) = {
            let inner = self.inner.borrow();
            (inner.dead_letters.clone(), inner.clock.now())
        };
        dead_letters.push(DeadLetter {
            action: action.to_string(),
            target,
            error_message,
            version,
            recorded_at,
        });
    }

    /// Subscribe to a registered action
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownAction`] if `name` is not registered.
    pub fn on<F>(&self, name: &str, listener: F) -> Result<&Self, StoreError>
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
    /// A failing listener does not stop the listeners after it; the failure
    /// is logged and recorded in the dead letter queue.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownAction`] if `name` is not registered.
    pub fn try_on<F>(&self, name: &str, listener: F) -> Result<&Self, StoreError>
    where
        F: Fn(&S) -> Result<(), BoxError> + 'static,
    {
        self.inner.borrow_mut().subscribe(name, Rc::new(listener))?;
        Ok(self)
    }

    /// Subscribe to every action
    pub fn subscribe_all<F>(&self, listener: F) -> &Self
    where
        F: Fn(&S) + 'static,
    {
        self.try_subscribe_all(move |state: &S| {
            listener(state);
            Ok(())
        })
    }

    /// Subscribe a fallible listener to every action
    pub fn try_subscribe_all<F>(&self, listener: F) -> &Self
    where
        F: Fn(&S) -> Result<(), BoxError> + 'static,
    {
        self.inner.borrow_mut().subscribe_all(Rc::new(listener));
        self
    }

    /// The invoker/registrar pair of a registered action
    #[must_use]
    pub fn action(&self, name: &str) -> Option<ActionHandle<S>> {
        self.has_action(name).then(|| ActionHandle {
            store: self.clone(),
            name: name.to_string(),
        })
    }

    /// Resolve a member name
    ///
    /// An action name resolves to its invoker, `on<Name>` to the subscription
    /// registrar of `name`. When both readings apply, the invoker wins.
    #[must_use]
    pub fn member(&self, member: &str) -> Option<Member<S>> {
        if let Some(handle) = self.action(member) {
            return Some(Member::Invoker(handle));
        }
        let action = self.inner.borrow().subscription_members.get(member).cloned()?;
        self.action(&action).map(Member::Registrar)
    }

    /// Read the current state via a closure
    ///
    /// The closure must not call back into the store.
    pub fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        f(&self.inner.borrow().state)
    }

    /// A copy of the current state
    #[must_use]
    pub fn current_state(&self) -> S {
        self.inner.borrow().state.clone()
    }

    /// Number of committed dispatches so far
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Registered action names, sorted
    #[must_use]
    pub fn registered_actions(&self) -> Vec<String> {
        self.inner.borrow().registered_actions()
    }

    /// Whether `name` is a registered action
    #[must_use]
    pub fn has_action(&self, name: &str) -> bool {
        self.inner.borrow().actions.contains_key(name)
    }

    /// Whether a reducer has been installed
    #[must_use]
    pub fn has_reducer(&self) -> bool {
        matches!(self.inner.borrow().dispatcher, Dispatcher::Installed(_))
    }

    /// Number of listeners subscribed to `name` (`*` for the wildcard list)
    #[must_use]
    pub fn listener_count(&self, name: &str) -> Option<usize> {
        let inner = self.inner.borrow();
        if name == naming::WILDCARD {
            return Some(inner.wildcard.len());
        }
        inner.actions.get(name).map(|entry| entry.listeners.len())
    }

    /// Failures recorded after commit (listeners and sink)
    #[must_use]
    pub fn dead_letters(&self) -> DeadLetterQueue {
        self.inner.borrow().dead_letters.clone()
    }

    /// The store's configuration
    #[must_use]
    pub fn config(&self) -> StoreConfig {
        self.inner.borrow().config.clone()
    }
}

/// A registered action: its invoker and its subscription registrar
pub struct ActionHandle<S> {
    store: Store<S>,
    name: String,
}

impl<S: Clone + 'static> ActionHandle<S> {
    /// The action name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The derived `on<Name>` member
    #[must_use]
    pub fn subscription_name(&self) -> String {
        naming::subscription_name(&self.name)
    }

    /// Dispatch the action
    ///
    /// # Errors
    ///
    /// Same as [`Store::dispatch`].
    pub fn invoke(&self, args: &[Value]) -> Result<&Self, StoreError> {
        self.store.dispatch(&self.name, args)?;
        Ok(self)
    }

    /// Subscribe to the action
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownAction`] if the action is no longer registered.
    pub fn subscribe<F>(&self, listener: F) -> Result<&Self, StoreError>
    where
        F: Fn(&S) + 'static,
    {
        self.store.on(&self.name, listener)?;
        Ok(self)
    }
}

impl<S> Clone for ActionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            name: self.name.clone(),
        }
    }
}

impl<S> std::fmt::Debug for ActionHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionHandle").field("name", &self.name).finish()
    }
}

/// What a member name resolves to
#[derive(Debug, Clone)]
pub enum Member<S> {
    /// The action itself (`addMessage`)
    Invoker(ActionHandle<S>),
    /// Its subscription registrar (`onAddMessage`)
    Registrar(ActionHandle<S>),
}

impl<S> Member<S> {
    /// Whether this member invokes the action
    #[must_use]
    pub const fn is_invoker(&self) -> bool {
        matches!(self, Self::Invoker(_))
    }

    /// Whether this member subscribes to the action
    #[must_use]
    pub const fn is_registrar(&self) -> bool {
        matches!(self, Self::Registrar(_))
    }

    /// The underlying action
    #[must_use]
    pub const fn handle(&self) -> &ActionHandle<S> {
        match self {
            Self::Invoker(handle) | Self::Registrar(handle) => handle,
        }
    }
}

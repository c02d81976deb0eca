//! Event dispatcher for the Herald framework.
//!
//! This module provides the [`Dispatcher`], which owns every registry taking
//! part in dispatch:
//!
//! - listeners, grouped by [`Priority`]
//! - consumers, grouped by [`Priority`] and filtered by classification key
//! - the [`RoutingTable`] binding each key to a listener method
//! - the [`ExceptionChain`] resolving handler failures
//!
//! # Dispatch Order
//!
//! When `dispatch(key, event)` is called:
//!
//! 1. The binding for `key` is looked up; without one, nothing happens
//! 2. Listeners run from `Highest` to `Low`, in registration order per tier
//! 3. Consumers registered for exactly `key` run in the same order
//! 4. Whenever a handler leaves the event consumed, dispatch stops
//!
//! Failures never escape `dispatch`. They are routed to the exception chain,
//! and anything the chain cannot absorb goes to the [`DiagnosticSink`].
//!
//! ```rust,ignore
//! use herald_core::{Dispatcher, EventHandler, Priority, RoutingTable};
//!
//! let mut dispatcher: Dispatcher<ResourceKind, dyn ResourceListener, ResourceEvent> =
//!     Dispatcher::new();
//!
//! dispatcher.set_routing_table(
//!     &RoutingTable::new()
//!         .with(ResourceKind::Opened, EventHandler::new(<dyn ResourceListener>::on_opened)),
//! );
//! dispatcher.add_listener(Priority::High, Arc::new(AuditListener));
//!
//! dispatcher.dispatch(&ResourceKind::Opened, &ResourceEvent::new("/tmp/a"));
//! ```
//!
//! # Thread Safety
//!
//! Registration takes `&mut self` and dispatch takes `&self`, so the borrow
//! checker keeps registries from changing during a dispatch call. Use
//! [`SharedDispatcher`](super::shared::SharedDispatcher) to share one
//! dispatcher between threads.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tracing::{Level, debug, span, trace};

use super::diagnostics::{BoxedSink, Diagnostic, DiagnosticSink, Origin, StderrSink};
use super::exception::{ExceptionChain, ExceptionHandler, Resolution};
use super::handler::{Consumer, ConsumerId, invoke_guarded};
use super::routing::RoutingTable;
use crate::error::DispatchResult;
use crate::foundation::event::Event;
use crate::foundation::failure::{Failure, FailureKind};
use crate::foundation::priority::Priority;

// =============================================================================
// Policy
// =============================================================================

/// What happens to a failure no exception handler matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UnmatchedFailurePolicy {
    /// Drop the failure silently.
    #[default]
    Ignore,
    /// Report the failure to the diagnostic sink.
    Report,
}

/// Runtime behavior switches for a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchPolicy {
    /// Handling of failures with no matching exception handler.
    pub unmatched_failures: UnmatchedFailurePolicy,
    /// Convert handler panics into [`FailureKind::PANIC`] failures.
    ///
    /// When disabled, a panicking handler unwinds through `dispatch`.
    pub catch_panics: bool,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            unmatched_failures: UnmatchedFailurePolicy::Ignore,
            catch_panics: true,
        }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

struct ConsumerEntry<K, E> {
    key: K,
    consumer: Consumer<E>,
}

impl<K: Clone, E> Clone for ConsumerEntry<K, E> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            consumer: self.consumer.clone(),
        }
    }
}

/// The central event dispatcher.
///
/// - `K` is the classification key used for routing
/// - `L` is the listener type, usually a trait object such as `dyn MyListener`
/// - `E` is the event type
///
/// Listeners are compared by `Arc` identity. The same listener may be
/// registered several times; every occurrence fires, and
/// [`remove_listener`](Self::remove_listener) removes one occurrence per call.
pub struct Dispatcher<K, L: ?Sized, E> {
    /// Listener buckets indexed by [`Priority::index`].
    listeners: [Vec<Arc<L>>; Priority::COUNT],
    /// Consumer buckets indexed by [`Priority::index`].
    consumers: [Vec<ConsumerEntry<K, E>>; Priority::COUNT],
    /// Reverse index from consumer identity to its bucket.
    consumer_index: HashMap<ConsumerId, Priority>,
    routing: RoutingTable<K, L, E>,
    exceptions: ExceptionChain<L, E>,
    policy: DispatchPolicy,
    sink: BoxedSink,
}

impl<K, L, E> Dispatcher<K, L, E>
where
    K: Eq + Hash + Clone + fmt::Debug,
    L: ?Sized,
    E: Event,
{
    /// Creates an empty dispatcher with the default policy and [`StderrSink`].
    pub fn new() -> Self {
        Self {
            listeners: std::array::from_fn(|_| Vec::new()),
            consumers: std::array::from_fn(|_| Vec::new()),
            consumer_index: HashMap::new(),
            routing: RoutingTable::new(),
            exceptions: ExceptionChain::new(),
            policy: DispatchPolicy::default(),
            sink: Arc::new(StderrSink),
        }
    }

    /// Returns a builder for a configured dispatcher.
    pub fn builder() -> DispatcherBuilder<K, L, E> {
        DispatcherBuilder::new()
    }

    /// Creates an empty routing table of the matching type.
    pub fn create_routing_table() -> RoutingTable<K, L, E> {
        RoutingTable::new()
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    /// Appends `listener` to the `priority` tier.
    pub fn add_listener(&mut self, priority: Priority, listener: Arc<L>) {
        trace!(%priority, "Adding listener");
        self.listeners[priority.index()].push(listener);
    }

    /// Appends `listener` to the [`Priority::Normal`] tier.
    pub fn add_listener_default(&mut self, listener: Arc<L>) {
        self.add_listener(Priority::Normal, listener);
    }

    /// Removes the first occurrence of `listener`, scanning tiers from
    /// `Highest` to `Low`.
    ///
    /// Returns `true` if an occurrence was removed.
    pub fn remove_listener(&mut self, listener: &Arc<L>) -> bool {
        for bucket in &mut self.listeners {
            if let Some(pos) = bucket.iter().position(|l| Arc::ptr_eq(l, listener)) {
                bucket.remove(pos);
                return true;
            }
        }
        false
    }

    /// Returns `true` if `listener` is registered in any tier.
    pub fn has_listener(&self, listener: &Arc<L>) -> bool {
        self.listeners
            .iter()
            .flatten()
            .any(|l| Arc::ptr_eq(l, listener))
    }

    /// Returns every listener in dispatch order.
    ///
    /// The returned vector is a snapshot; changing it does not affect the dispatcher.
    pub fn listeners(&self) -> Vec<Arc<L>> {
        self.listeners.iter().flatten().cloned().collect()
    }

    /// Returns the listeners of one tier in registration order.
    pub fn listeners_at(&self, priority: Priority) -> Vec<Arc<L>> {
        self.listeners[priority.index()].clone()
    }

    /// Returns the number of listener registrations.
    pub fn listener_count(&self) -> usize {
        self.listeners.iter().map(Vec::len).sum()
    }

    // -------------------------------------------------------------------------
    // Consumers
    // -------------------------------------------------------------------------

    /// Registers `consumer` for `key` in the `priority` tier.
    ///
    /// A consumer has exactly one registration. Adding a consumer that is
    /// already registered first drops its previous registration.
    pub fn add_consumer(&mut self, priority: Priority, key: K, consumer: Consumer<E>) {
        if self.remove_consumer(&consumer) {
            debug!(key = ?key, %priority, "Consumer re-registered, previous registration dropped");
        }

        trace!(key = ?key, %priority, "Adding consumer");
        self.consumer_index.insert(consumer.id(), priority);
        self.consumers[priority.index()].push(ConsumerEntry { key, consumer });
    }

    /// Registers `consumer` for `key` in the [`Priority::Normal`] tier.
    pub fn add_consumer_default(&mut self, key: K, consumer: Consumer<E>) {
        self.add_consumer(Priority::Normal, key, consumer);
    }

    /// Removes `consumer`. Returns `false` if it was not registered.
    pub fn remove_consumer(&mut self, consumer: &Consumer<E>) -> bool {
        let id = consumer.id();
        let Some(priority) = self.consumer_index.remove(&id) else {
            return false;
        };

        let bucket = &mut self.consumers[priority.index()];
        if let Some(pos) = bucket.iter().position(|entry| entry.consumer.id() == id) {
            bucket.remove(pos);
        }
        true
    }

    /// Returns `true` if `consumer` is registered.
    pub fn has_consumer(&self, consumer: &Consumer<E>) -> bool {
        self.consumer_index.contains_key(&consumer.id())
    }

    /// Returns every consumer in dispatch order, regardless of key.
    ///
    /// The returned vector is a snapshot; changing it does not affect the dispatcher.
    pub fn consumers(&self) -> Vec<Consumer<E>> {
        self.consumers
            .iter()
            .flatten()
            .map(|entry| entry.consumer.clone())
            .collect()
    }

    /// Returns the consumers registered for `key`, in dispatch order.
    pub fn consumers_for(&self, key: &K) -> Vec<Consumer<E>> {
        self.consumers
            .iter()
            .flatten()
            .filter(|entry| entry.key == *key)
            .map(|entry| entry.consumer.clone())
            .collect()
    }

    /// Returns the number of registered consumers.
    pub fn consumer_count(&self) -> usize {
        self.consumer_index.len()
    }

    // -------------------------------------------------------------------------
    // Routing
    // -------------------------------------------------------------------------

    /// Replaces the routing table with a copy of `table`.
    pub fn set_routing_table(&mut self, table: &RoutingTable<K, L, E>) {
        self.routing.clear();
        self.routing
            .extend(table.iter().map(|(key, handler)| (key.clone(), handler.clone())));
        debug!(routes = self.routing.len(), "Routing table replaced");
    }

    /// Returns the current routing table.
    pub fn routing_table(&self) -> &RoutingTable<K, L, E> {
        &self.routing
    }

    /// Returns the routing table for in-place edits.
    pub fn routing_table_mut(&mut self) -> &mut RoutingTable<K, L, E> {
        &mut self.routing
    }

    // -------------------------------------------------------------------------
    // Exception handling
    // -------------------------------------------------------------------------

    /// Registers `handler` for failures of `kind`.
    ///
    /// Any handler previously registered for exactly `kind` is replaced, and
    /// the new entry moves to the end of the resolution order.
    pub fn add_exception_handler(
        &mut self,
        kind: FailureKind,
        handler: ExceptionHandler<L, E>,
    ) -> DispatchResult<()> {
        self.exceptions.register(kind, handler)?;
        trace!(%kind, "Exception handler registered");
        Ok(())
    }

    /// Removes the handler registered for exactly `kind`.
    pub fn remove_exception_handler(&mut self, kind: &FailureKind) -> bool {
        self.exceptions.remove(kind)
    }

    /// Returns the exception resolution chain.
    pub fn exception_chain(&self) -> &ExceptionChain<L, E> {
        &self.exceptions
    }

    // -------------------------------------------------------------------------
    // Policy and diagnostics
    // -------------------------------------------------------------------------

    /// Returns the active policy.
    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Replaces the active policy.
    pub fn set_policy(&mut self, policy: DispatchPolicy) {
        self.policy = policy;
    }

    /// Replaces the diagnostic sink.
    pub fn set_sink(&mut self, sink: impl DiagnosticSink + 'static) {
        self.sink = Arc::new(sink);
    }

    /// Replaces the diagnostic sink with an already shared one.
    pub fn set_boxed_sink(&mut self, sink: BoxedSink) {
        self.sink = sink;
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    /// Dispatches `event` under `key` to listeners and then consumers.
    ///
    /// Never fails: handler failures are routed through the exception chain.
    pub fn dispatch(&self, key: &K, event: &E) {
        let span = span!(Level::DEBUG, "dispatch", key = ?key);
        let _enter = span.enter();

        let Some(binding) = self.routing.get(key) else {
            debug!("No routing entry for key, skipping dispatch");
            return;
        };

        for (priority, bucket) in Priority::ALL.iter().zip(&self.listeners) {
            for listener in bucket {
                trace!(%priority, "Invoking listener");
                let result =
                    invoke_guarded(self.policy.catch_panics, || binding.handle(listener, event));
                if let Err(failure) = result {
                    self.route_failure(key, Some(listener), event, &failure);
                }

                if event.is_consumed() {
                    debug!(%priority, "Event consumed by listener, stopping dispatch");
                    return;
                }
            }
        }

        for (priority, bucket) in Priority::ALL.iter().zip(&self.consumers) {
            for entry in bucket.iter().filter(|entry| entry.key == *key) {
                trace!(%priority, "Invoking consumer");
                let result =
                    invoke_guarded(self.policy.catch_panics, || entry.consumer.consume(event));
                if let Err(failure) = result {
                    self.route_failure(key, None, event, &failure);
                }

                if event.is_consumed() {
                    debug!(%priority, "Event consumed by consumer, stopping dispatch");
                    return;
                }
            }
        }
    }

    fn route_failure(&self, key: &K, listener: Option<&Arc<L>>, event: &E, failure: &Failure) {
        let origin = if listener.is_some() {
            Origin::Listener
        } else {
            Origin::Consumer
        };
        debug!(%origin, %failure, "Handler failed");

        let listener = listener.map(|l| &**l);
        match self
            .exceptions
            .handle(listener, event, failure, self.policy.catch_panics)
        {
            Resolution::Handled => {}
            Resolution::HandlerFailed(handler_failure) => {
                self.sink.report(&Diagnostic::ExceptionHandlerFailed {
                    key,
                    origin,
                    failure,
                    handler_failure: &handler_failure,
                });
            }
            Resolution::Unmatched => {
                if self.policy.unmatched_failures == UnmatchedFailurePolicy::Report {
                    self.sink.report(&Diagnostic::UnhandledFailure {
                        key,
                        origin,
                        failure,
                    });
                }
            }
        }
    }
}

impl<K, L, E> Default for Dispatcher<K, L, E>
where
    K: Eq + Hash + Clone + fmt::Debug,
    L: ?Sized,
    E: Event,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, L: ?Sized, E> Clone for Dispatcher<K, L, E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
            consumers: self.consumers.clone(),
            consumer_index: self.consumer_index.clone(),
            routing: self.routing.clone(),
            exceptions: self.exceptions.clone(),
            policy: self.policy,
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<K: fmt::Debug, L: ?Sized, E> fmt::Debug for Dispatcher<K, L, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field(
                "listener_count",
                &self.listeners.iter().map(Vec::len).sum::<usize>(),
            )
            .field("consumer_count", &self.consumer_index.len())
            .field("routing", &self.routing)
            .field("exceptions", &self.exceptions)
            .field("policy", &self.policy)
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for a configured [`Dispatcher`].
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::builder()
///     .unmatched_failures(UnmatchedFailurePolicy::Report)
///     .sink(TracingSink)
///     .routing_table(table)
///     .build();
/// ```
pub struct DispatcherBuilder<K, L: ?Sized, E> {
    policy: DispatchPolicy,
    sink: Option<BoxedSink>,
    routing: Option<RoutingTable<K, L, E>>,
}

impl<K, L, E> DispatcherBuilder<K, L, E>
where
    K: Eq + Hash + Clone + fmt::Debug,
    L: ?Sized,
    E: Event,
{
    /// Creates a builder with the default policy.
    pub fn new() -> Self {
        Self {
            policy: DispatchPolicy::default(),
            sink: None,
            routing: None,
        }
    }

    /// Sets the whole policy.
    pub fn policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the unmatched failure policy.
    pub fn unmatched_failures(mut self, unmatched: UnmatchedFailurePolicy) -> Self {
        self.policy.unmatched_failures = unmatched;
        self
    }

    /// Enables or disables panic catching.
    pub fn catch_panics(mut self, enabled: bool) -> Self {
        self.policy.catch_panics = enabled;
        self
    }

    /// Sets the diagnostic sink.
    pub fn sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Sets an already shared diagnostic sink.
    pub fn boxed_sink(mut self, sink: BoxedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the initial routing table.
    pub fn routing_table(mut self, table: RoutingTable<K, L, E>) -> Self {
        self.routing = Some(table);
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Dispatcher<K, L, E> {
        let mut dispatcher = Dispatcher::new();
        dispatcher.policy = self.policy;
        if let Some(sink) = self.sink {
            dispatcher.sink = sink;
        }
        if let Some(routing) = self.routing {
            dispatcher.routing = routing;
        }
        dispatcher
    }
}

impl<K, L, E> Default for DispatcherBuilder<K, L, E>
where
    K: Eq + Hash + Clone + fmt::Debug,
    L: ?Sized,
    E: Event,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::event::EventState;
    use crate::foundation::failure::HandlerResult;
    use crate::framework::handler::EventHandler;
    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct TestEvent {
        state: EventState,
    }

    impl Event for TestEvent {
        fn state(&self) -> &EventState {
            &self.state
        }
    }

    fn event() -> TestEvent {
        TestEvent {
            state: EventState::new(),
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Open,
        Close,
        Reset,
    }

    trait ResourceListener: Send + Sync {
        fn name(&self) -> &str;
        fn on_open(&self, event: &TestEvent) -> HandlerResult;
    }

    enum Behavior {
        Record,
        Consume,
        Fail(Failure),
        Panic,
    }

    struct Probe {
        name: &'static str,
        log: Log,
        behavior: Behavior,
    }

    impl ResourceListener for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn on_open(&self, event: &TestEvent) -> HandlerResult {
            self.log.lock().push(self.name.to_string());
            match &self.behavior {
                Behavior::Record => Ok(()),
                Behavior::Consume => {
                    event.consume();
                    Ok(())
                }
                Behavior::Fail(failure) => Err(failure.clone()),
                Behavior::Panic => panic!("{} panicked", self.name),
            }
        }
    }

    type TestDispatcher = Dispatcher<Kind, dyn ResourceListener, TestEvent>;

    fn probe(log: &Log, name: &'static str, behavior: Behavior) -> Arc<dyn ResourceListener> {
        Arc::new(Probe {
            name,
            log: Arc::clone(log),
            behavior,
        })
    }

    fn recording_consumer(log: &Log, name: &'static str) -> Consumer<TestEvent> {
        let log = Arc::clone(log);
        Consumer::infallible(move |_: &TestEvent| log.lock().push(name.to_string()))
    }

    fn routed_dispatcher() -> TestDispatcher {
        let mut dispatcher = TestDispatcher::new();
        dispatcher.set_routing_table(
            &TestDispatcher::create_routing_table()
                .with(Kind::Open, EventHandler::new(<dyn ResourceListener>::on_open))
                .with(Kind::Close, EventHandler::infallible(|_, _| {})),
        );
        dispatcher
    }

    fn recording_sink(reports: &Log) -> impl Fn(&Diagnostic<'_>) + Send + Sync + 'static {
        let reports = Arc::clone(reports);
        move |d| reports.lock().push(d.to_string())
    }

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_listeners_run_in_priority_order() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.add_listener(Priority::Low, probe(&log, "low", Behavior::Record));
        dispatcher.add_listener(Priority::Highest, probe(&log, "highest", Behavior::Record));
        dispatcher.add_listener_default(probe(&log, "normal", Behavior::Record));
        dispatcher.add_listener(Priority::High, probe(&log, "high", Behavior::Record));

        dispatcher.dispatch(&Kind::Open, &event());

        assert_eq!(*log.lock(), vec!["highest", "high", "normal", "low"]);
    }

    #[test]
    fn test_scenario_a_two_listeners_both_run() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.add_listener(Priority::High, probe(&log, "L1", Behavior::Record));
        dispatcher.add_listener(Priority::Normal, probe(&log, "L2", Behavior::Record));

        let e = event();
        dispatcher.dispatch(&Kind::Open, &e);

        assert_eq!(*log.lock(), vec!["L1", "L2"]);
        assert!(!e.is_consumed());
    }

    #[test]
    fn test_scenario_b_consumption_stops_listeners_and_consumers() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.add_listener(Priority::High, probe(&log, "L1", Behavior::Consume));
        dispatcher.add_listener(Priority::Normal, probe(&log, "L2", Behavior::Record));
        dispatcher.add_consumer(Priority::Highest, Kind::Open, recording_consumer(&log, "C1"));

        let e = event();
        dispatcher.dispatch(&Kind::Open, &e);

        assert_eq!(*log.lock(), vec!["L1"]);
        assert!(e.is_consumed());
    }

    #[test]
    fn test_scenario_c_consumers_by_priority() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.add_consumer(Priority::Low, Kind::Close, recording_consumer(&log, "low"));
        dispatcher.add_consumer(
            Priority::Highest,
            Kind::Close,
            recording_consumer(&log, "highest"),
        );

        dispatcher.dispatch(&Kind::Close, &event());

        assert_eq!(*log.lock(), vec!["highest", "low"]);
    }

    #[test]
    fn test_scenario_d_unrouted_key_is_a_noop() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.add_listener_default(probe(&log, "L1", Behavior::Record));
        dispatcher.add_consumer_default(Kind::Reset, recording_consumer(&log, "C1"));

        dispatcher.dispatch(&Kind::Reset, &event());

        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_scenario_e_supertype_handler_receives_listener_and_event() {
        let log = new_log();
        let seen = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.add_listener_default(probe(
            &log,
            "L1",
            Behavior::Fail(Failure::illegal_state("not open")),
        ));

        let io_seen = Arc::clone(&seen);
        dispatcher
            .add_exception_handler(
                FailureKind::IO,
                ExceptionHandler::infallible(move |_, _, _| io_seen.lock().push("io".into())),
            )
            .unwrap();

        let runtime_seen = Arc::clone(&seen);
        dispatcher
            .add_exception_handler(
                FailureKind::RUNTIME,
                ExceptionHandler::infallible(move |listener, event: &TestEvent, failure| {
                    runtime_seen.lock().push(format!(
                        "runtime:{}:{}:{}",
                        listener.map_or("-", |l: &dyn ResourceListener| l.name()),
                        event as *const TestEvent as usize,
                        failure.kind(),
                    ));
                }),
            )
            .unwrap();

        let e = event();
        dispatcher.dispatch(&Kind::Open, &e);

        let expected = format!(
            "runtime:L1:{}:IllegalStateError",
            &e as *const TestEvent as usize
        );
        assert_eq!(*seen.lock(), vec![expected]);
    }

    #[test]
    fn test_failure_does_not_stop_next_handlers() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.add_listener(
            Priority::High,
            probe(&log, "failing", Behavior::Fail(Failure::runtime("boom"))),
        );
        dispatcher.add_listener(Priority::Low, probe(&log, "after", Behavior::Record));

        let consumer_log = Arc::clone(&log);
        dispatcher.add_consumer_default(
            Kind::Open,
            Consumer::new(move |_: &TestEvent| {
                consumer_log.lock().push("c-failing".into());
                Err(Failure::runtime("consumer boom"))
            }),
        );
        dispatcher.add_consumer(Priority::Low, Kind::Open, recording_consumer(&log, "c-after"));

        dispatcher.dispatch(&Kind::Open, &event());

        assert_eq!(*log.lock(), vec!["failing", "after", "c-failing", "c-after"]);
    }

    #[test]
    fn test_consumer_failure_has_no_listener_attached() {
        let seen = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.add_consumer_default(
            Kind::Close,
            Consumer::new(|_: &TestEvent| Err(Failure::runtime("x"))),
        );

        let seen_clone = Arc::clone(&seen);
        dispatcher
            .add_exception_handler(
                FailureKind::ANY,
                ExceptionHandler::infallible(move |listener, _, _| {
                    seen_clone.lock().push(format!("attached={}", listener.is_some()));
                }),
            )
            .unwrap();

        dispatcher.dispatch(&Kind::Close, &event());

        assert_eq!(*seen.lock(), vec!["attached=false"]);
    }

    #[test]
    fn test_consumption_after_failure_stops_dispatch() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.add_listener(
            Priority::High,
            probe(&log, "failing", Behavior::Fail(Failure::runtime("boom"))),
        );
        dispatcher.add_listener(Priority::Low, probe(&log, "after", Behavior::Record));
        dispatcher
            .add_exception_handler(
                FailureKind::RUNTIME,
                ExceptionHandler::infallible(|_, event: &TestEvent, _| event.consume()),
            )
            .unwrap();

        dispatcher.dispatch(&Kind::Open, &event());

        assert_eq!(*log.lock(), vec!["failing"]);
    }

    #[test]
    fn test_consumers_only_fire_for_their_key() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.add_consumer_default(Kind::Open, recording_consumer(&log, "open"));
        dispatcher.add_consumer_default(Kind::Close, recording_consumer(&log, "close"));

        dispatcher.dispatch(&Kind::Close, &event());

        assert_eq!(*log.lock(), vec!["close"]);
    }

    #[test]
    fn test_consumer_consumption_stops_later_consumers() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        let consume_log = Arc::clone(&log);
        dispatcher.add_consumer(
            Priority::High,
            Kind::Open,
            Consumer::infallible(move |e: &TestEvent| {
                consume_log.lock().push("first".into());
                e.consume();
            }),
        );
        dispatcher.add_consumer(Priority::Low, Kind::Open, recording_consumer(&log, "second"));

        dispatcher.dispatch(&Kind::Open, &event());

        assert_eq!(*log.lock(), vec!["first"]);
    }

    #[test]
    fn test_remove_and_readd_moves_listener_to_end_of_tier() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        let a = probe(&log, "a", Behavior::Record);
        let b = probe(&log, "b", Behavior::Record);
        let c = probe(&log, "c", Behavior::Record);
        dispatcher.add_listener_default(Arc::clone(&a));
        dispatcher.add_listener_default(Arc::clone(&b));
        dispatcher.add_listener_default(Arc::clone(&c));

        assert!(dispatcher.remove_listener(&a));
        dispatcher.add_listener_default(Arc::clone(&a));
        dispatcher.dispatch(&Kind::Open, &event());

        assert_eq!(*log.lock(), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_duplicate_listener_fires_twice_and_removes_once() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        let a = probe(&log, "a", Behavior::Record);
        dispatcher.add_listener(Priority::High, Arc::clone(&a));
        dispatcher.add_listener(Priority::Low, Arc::clone(&a));

        dispatcher.dispatch(&Kind::Open, &event());
        assert_eq!(*log.lock(), vec!["a", "a"]);

        assert!(dispatcher.remove_listener(&a));
        assert!(dispatcher.has_listener(&a));
        assert_eq!(dispatcher.listeners_at(Priority::High).len(), 0);
        assert_eq!(dispatcher.listeners_at(Priority::Low).len(), 1);

        assert!(dispatcher.remove_listener(&a));
        assert!(!dispatcher.has_listener(&a));
        assert!(!dispatcher.remove_listener(&a));
    }

    #[test]
    fn test_listing_is_a_snapshot_in_priority_order() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        let low = probe(&log, "low", Behavior::Record);
        let high = probe(&log, "high", Behavior::Record);
        dispatcher.add_listener(Priority::Low, Arc::clone(&low));
        dispatcher.add_listener(Priority::High, Arc::clone(&high));

        let mut listed = dispatcher.listeners();
        let names: Vec<_> = listed.iter().map(|l| l.name().to_string()).collect();
        assert_eq!(names, vec!["high", "low"]);

        listed.clear();
        assert_eq!(dispatcher.listener_count(), 2);

        let c_low = recording_consumer(&log, "c-low");
        let c_top = recording_consumer(&log, "c-top");
        dispatcher.add_consumer(Priority::Low, Kind::Open, c_low.clone());
        dispatcher.add_consumer(Priority::Highest, Kind::Close, c_top.clone());

        assert_eq!(dispatcher.consumers(), vec![c_top.clone(), c_low.clone()]);
        assert_eq!(dispatcher.consumers_for(&Kind::Open), vec![c_low]);
    }

    #[test]
    fn test_consumer_registration_bookkeeping() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        let consumer = recording_consumer(&log, "c");

        assert!(!dispatcher.remove_consumer(&consumer));
        dispatcher.add_consumer_default(Kind::Open, consumer.clone());
        assert!(dispatcher.has_consumer(&consumer));
        assert_eq!(dispatcher.consumer_count(), 1);

        assert!(dispatcher.remove_consumer(&consumer));
        assert!(!dispatcher.has_consumer(&consumer));
        assert!(dispatcher.consumers().is_empty());
    }

    #[test]
    fn test_reregistering_consumer_replaces_registration() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        let consumer = recording_consumer(&log, "c");
        dispatcher.add_consumer(Priority::High, Kind::Open, consumer.clone());
        dispatcher.add_consumer(Priority::Low, Kind::Close, consumer.clone());

        dispatcher.dispatch(&Kind::Open, &event());
        dispatcher.dispatch(&Kind::Close, &event());

        assert_eq!(*log.lock(), vec!["c"]);
        assert_eq!(dispatcher.consumer_count(), 1);
        assert_eq!(dispatcher.consumers_for(&Kind::Close), vec![consumer]);
    }

    #[test]
    fn test_set_routing_table_clears_previous_entries() {
        let mut dispatcher = routed_dispatcher();
        assert!(dispatcher.routing_table().contains_key(&Kind::Close));

        dispatcher.set_routing_table(
            &TestDispatcher::create_routing_table()
                .with(Kind::Reset, EventHandler::infallible(|_, _| {})),
        );

        assert!(!dispatcher.routing_table().contains_key(&Kind::Close));
        assert!(dispatcher.routing_table().contains_key(&Kind::Reset));
        assert_eq!(dispatcher.routing_table().len(), 1);
    }

    #[test]
    fn test_reregistered_exception_handler_replaces_old() {
        let log = new_log();
        let seen = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.add_listener_default(probe(
            &log,
            "L1",
            Behavior::Fail(Failure::runtime("boom")),
        ));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            dispatcher
                .add_exception_handler(
                    FailureKind::RUNTIME,
                    ExceptionHandler::infallible(move |_, _, _| seen.lock().push(tag.into())),
                )
                .unwrap();
        }

        dispatcher.dispatch(&Kind::Open, &event());

        assert_eq!(*seen.lock(), vec!["second"]);
        assert_eq!(dispatcher.exception_chain().len(), 1);
    }

    #[test]
    fn test_exception_handler_failure_goes_to_sink() {
        let log = new_log();
        let reports = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.set_sink(recording_sink(&reports));
        dispatcher.add_listener(
            Priority::High,
            probe(&log, "L1", Behavior::Fail(Failure::runtime("boom"))),
        );
        dispatcher.add_listener(Priority::Low, probe(&log, "L2", Behavior::Record));
        dispatcher
            .add_exception_handler(
                FailureKind::ANY,
                ExceptionHandler::new(|_, _, _| Err(Failure::illegal_state("handler broke"))),
            )
            .unwrap();

        dispatcher.dispatch(&Kind::Open, &event());

        assert_eq!(*log.lock(), vec!["L1", "L2"]);
        let reports = reports.lock();
        assert_eq!(reports.len(), 1);
        assert!(
            reports[0].starts_with("exception handler failed: IllegalStateError: handler broke")
        );
    }

    #[test]
    fn test_unmatched_failures_ignored_by_default() {
        let log = new_log();
        let reports = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.set_sink(recording_sink(&reports));
        dispatcher.add_listener_default(probe(&log, "L1", Behavior::Fail(Failure::runtime("x"))));

        dispatcher.dispatch(&Kind::Open, &event());
        assert!(reports.lock().is_empty());

        dispatcher.set_policy(DispatchPolicy {
            unmatched_failures: UnmatchedFailurePolicy::Report,
            ..DispatchPolicy::default()
        });
        dispatcher.dispatch(&Kind::Open, &event());

        assert_eq!(
            *reports.lock(),
            vec!["unhandled listener failure for Open: RuntimeError: x"]
        );
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let log = new_log();
        let seen = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.add_listener(Priority::High, probe(&log, "L1", Behavior::Panic));
        dispatcher.add_listener(Priority::Low, probe(&log, "L2", Behavior::Record));

        let seen_clone = Arc::clone(&seen);
        dispatcher
            .add_exception_handler(
                FailureKind::PANIC,
                ExceptionHandler::infallible(move |_, _, failure| {
                    seen_clone.lock().push(failure.message().to_string());
                }),
            )
            .unwrap();

        dispatcher.dispatch(&Kind::Open, &event());

        assert_eq!(*log.lock(), vec!["L1", "L2"]);
        assert_eq!(*seen.lock(), vec!["L1 panicked"]);
    }

    #[test]
    #[should_panic(expected = "L1 panicked")]
    fn test_panics_propagate_when_not_caught() {
        let log = new_log();
        let mut dispatcher = routed_dispatcher();
        dispatcher.set_policy(DispatchPolicy {
            catch_panics: false,
            ..DispatchPolicy::default()
        });
        dispatcher.add_listener_default(probe(&log, "L1", Behavior::Panic));

        dispatcher.dispatch(&Kind::Open, &event());
    }

    #[test]
    fn test_absent_exception_kind_is_rejected() {
        let mut dispatcher = routed_dispatcher();
        let result = dispatcher.add_exception_handler(
            FailureKind::root(""),
            ExceptionHandler::infallible(|_, _, _| {}),
        );

        assert!(matches!(
            result,
            Err(crate::error::DispatchError::InvalidArgument { .. })
        ));
        assert!(dispatcher.exception_chain().is_empty());
    }

    #[test]
    fn test_builder_applies_settings() {
        let dispatcher = TestDispatcher::builder()
            .unmatched_failures(UnmatchedFailurePolicy::Report)
            .catch_panics(false)
            .sink(StderrSink)
            .routing_table(
                TestDispatcher::create_routing_table()
                    .with(Kind::Open, EventHandler::infallible(|_, _| {})),
            )
            .build();

        assert_eq!(
            dispatcher.policy(),
            DispatchPolicy {
                unmatched_failures: UnmatchedFailurePolicy::Report,
                catch_panics: false,
            }
        );
        assert!(dispatcher.routing_table().contains_key(&Kind::Open));
    }
}

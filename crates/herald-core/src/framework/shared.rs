//! Thread-safe dispatcher handle.
//!
//! [`SharedDispatcher`] wraps a [`Dispatcher`] in a copy-on-write snapshot.
//! Every dispatch runs against the snapshot current when it started, so
//! handlers may register or remove listeners during dispatch. Such changes
//! take effect from the next dispatch call.
//!
//! ```rust,ignore
//! let shared = SharedDispatcher::new(dispatcher);
//!
//! let worker = shared.clone();
//! std::thread::spawn(move || worker.dispatch(&ResourceKind::Opened, &event));
//!
//! shared.add_listener(Priority::Low, Arc::new(LateListener));
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use super::diagnostics::DiagnosticSink;
use super::dispatcher::{DispatchPolicy, Dispatcher};
use super::exception::ExceptionHandler;
use super::handler::Consumer;
use super::routing::RoutingTable;
use crate::error::DispatchResult;
use crate::foundation::event::Event;
use crate::foundation::failure::FailureKind;
use crate::foundation::priority::Priority;

/// A cloneable, thread-safe handle to a [`Dispatcher`].
///
/// Clones share the same dispatcher.
pub struct SharedDispatcher<K, L: ?Sized, E> {
    current: Arc<RwLock<Arc<Dispatcher<K, L, E>>>>,
}

impl<K, L, E> SharedDispatcher<K, L, E>
where
    K: Eq + Hash + Clone + fmt::Debug,
    L: ?Sized,
    E: Event,
{
    /// Wraps `dispatcher`.
    pub fn new(dispatcher: Dispatcher<K, L, E>) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(dispatcher))),
        }
    }

    /// Returns the current snapshot.
    ///
    /// Later registrations do not affect a snapshot already taken.
    pub fn snapshot(&self) -> Arc<Dispatcher<K, L, E>> {
        Arc::clone(&self.current.read())
    }

    /// Applies `f` to the dispatcher and publishes the result.
    ///
    /// Dispatches already running keep their snapshot; the dispatcher is
    /// copied only when such a snapshot is alive.
    pub fn update<R>(&self, f: impl FnOnce(&mut Dispatcher<K, L, E>) -> R) -> R {
        let mut current = self.current.write();
        f(Arc::make_mut(&mut current))
    }

    /// Dispatches `event` under `key` on the current snapshot.
    pub fn dispatch(&self, key: &K, event: &E) {
        let snapshot = self.snapshot();
        trace!("Dispatching on snapshot");
        snapshot.dispatch(key, event);
    }

    /// See [`Dispatcher::add_listener`].
    pub fn add_listener(&self, priority: Priority, listener: Arc<L>) {
        self.update(|d| d.add_listener(priority, listener));
    }

    /// See [`Dispatcher::add_listener_default`].
    pub fn add_listener_default(&self, listener: Arc<L>) {
        self.update(|d| d.add_listener_default(listener));
    }

    /// See [`Dispatcher::remove_listener`].
    pub fn remove_listener(&self, listener: &Arc<L>) -> bool {
        self.update(|d| d.remove_listener(listener))
    }

    /// See [`Dispatcher::has_listener`].
    pub fn has_listener(&self, listener: &Arc<L>) -> bool {
        self.current.read().has_listener(listener)
    }

    /// See [`Dispatcher::listeners`].
    pub fn listeners(&self) -> Vec<Arc<L>> {
        self.current.read().listeners()
    }

    /// See [`Dispatcher::add_consumer`].
    pub fn add_consumer(&self, priority: Priority, key: K, consumer: Consumer<E>) {
        self.update(|d| d.add_consumer(priority, key, consumer));
    }

    /// See [`Dispatcher::add_consumer_default`].
    pub fn add_consumer_default(&self, key: K, consumer: Consumer<E>) {
        self.update(|d| d.add_consumer_default(key, consumer));
    }

    /// See [`Dispatcher::remove_consumer`].
    pub fn remove_consumer(&self, consumer: &Consumer<E>) -> bool {
        self.update(|d| d.remove_consumer(consumer))
    }

    /// See [`Dispatcher::has_consumer`].
    pub fn has_consumer(&self, consumer: &Consumer<E>) -> bool {
        self.current.read().has_consumer(consumer)
    }

    /// See [`Dispatcher::consumers`].
    pub fn consumers(&self) -> Vec<Consumer<E>> {
        self.current.read().consumers()
    }

    /// See [`Dispatcher::set_routing_table`].
    pub fn set_routing_table(&self, table: &RoutingTable<K, L, E>) {
        self.update(|d| d.set_routing_table(table));
    }

    /// Returns a copy of the current routing table.
    pub fn routing_table(&self) -> RoutingTable<K, L, E> {
        self.current.read().routing_table().clone()
    }

    /// See [`Dispatcher::add_exception_handler`].
    pub fn add_exception_handler(
        &self,
        kind: FailureKind,
        handler: ExceptionHandler<L, E>,
    ) -> DispatchResult<()> {
        self.update(|d| d.add_exception_handler(kind, handler))
    }

    /// See [`Dispatcher::remove_exception_handler`].
    pub fn remove_exception_handler(&self, kind: &FailureKind) -> bool {
        self.update(|d| d.remove_exception_handler(kind))
    }

    /// See [`Dispatcher::set_policy`].
    pub fn set_policy(&self, policy: DispatchPolicy) {
        self.update(|d| d.set_policy(policy));
    }

    /// See [`Dispatcher::set_sink`].
    pub fn set_sink(&self, sink: impl DiagnosticSink + 'static) {
        self.update(|d| d.set_sink(sink));
    }
}

impl<K, L, E> Default for SharedDispatcher<K, L, E>
where
    K: Eq + Hash + Clone + fmt::Debug,
    L: ?Sized,
    E: Event,
{
    fn default() -> Self {
        Self::new(Dispatcher::new())
    }
}

impl<K, L: ?Sized, E> Clone for SharedDispatcher<K, L, E> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
        }
    }
}

impl<K: fmt::Debug, L: ?Sized, E> fmt::Debug for SharedDispatcher<K, L, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedDispatcher")
            .field(&**self.current.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::event::EventState;
    use crate::framework::handler::EventHandler;
    use parking_lot::Mutex;

    struct Ping {
        state: EventState,
    }

    impl Event for Ping {
        fn state(&self) -> &EventState {
            &self.state
        }
    }

    fn ping() -> Ping {
        Ping {
            state: EventState::new(),
        }
    }

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Recorder {
        fn on_ping(&self, _: &Ping) {
            self.log.lock().push(self.name);
        }
    }

    type Shared = SharedDispatcher<&'static str, Recorder, Ping>;

    fn shared() -> Shared {
        let shared = Shared::default();
        shared.set_routing_table(
            &RoutingTable::new().with("PING", EventHandler::infallible(Recorder::on_ping)),
        );
        shared
    }

    #[test]
    fn test_registration_during_dispatch_applies_next_time() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = shared();

        let late = Arc::new(Recorder {
            name: "late",
            log: Arc::clone(&log),
        });
        let handle = shared.clone();
        let consumer_log = Arc::clone(&log);
        shared.add_consumer_default(
            "PING",
            Consumer::infallible(move |_: &Ping| {
                consumer_log.lock().push("consumer");
                if !handle.has_listener(&late) {
                    handle.add_listener_default(Arc::clone(&late));
                }
            }),
        );

        shared.dispatch(&"PING", &ping());
        assert_eq!(*log.lock(), vec!["consumer"]);

        shared.dispatch(&"PING", &ping());
        assert_eq!(*log.lock(), vec!["consumer", "late", "consumer"]);
    }

    #[test]
    fn test_snapshot_is_isolated_from_updates() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = shared();
        let before = shared.snapshot();

        shared.add_listener(
            Priority::High,
            Arc::new(Recorder {
                name: "a",
                log: Arc::clone(&log),
            }),
        );

        assert_eq!(before.listener_count(), 0);
        assert_eq!(shared.listeners().len(), 1);
    }

    #[test]
    fn test_concurrent_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = shared();
        shared.add_listener_default(Arc::new(Recorder {
            name: "r",
            log: Arc::clone(&log),
        }));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let shared = shared.clone();
                scope.spawn(move || {
                    for _ in 0..25 {
                        shared.dispatch(&"PING", &ping());
                    }
                });
            }
        });

        assert_eq!(log.lock().len(), 100);
    }
}

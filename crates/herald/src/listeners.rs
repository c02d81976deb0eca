//! Registration facade handed out to event sources' clients.
//!
//! A component that emits events usually owns its dispatcher and only lets
//! callers register and remove handlers. [`ListenersManager`] is that
//! restricted view: it forwards registration, removal, lookup and listing to
//! a [`SharedDispatcher`] and exposes nothing else.
//!
//! ```rust,ignore
//! struct Watcher {
//!     dispatcher: SharedDispatcher<ResourceKind, dyn ResourceListener, ResourceEvent>,
//!     manager: ListenersManager<ResourceKind, dyn ResourceListener, ResourceEvent>,
//! }
//!
//! impl ListenersManagerProvider for Watcher {
//!     type Key = ResourceKind;
//!     type Listener = dyn ResourceListener;
//!     type Event = ResourceEvent;
//!
//!     fn listeners_manager(
//!         &self,
//!     ) -> &ListenersManager<ResourceKind, dyn ResourceListener, ResourceEvent> {
//!         &self.manager
//!     }
//! }
//!
//! watcher.listeners_manager().add_listener(Priority::High, Arc::new(Audit));
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use herald_core::{Consumer, Event, Priority, SharedDispatcher};

/// Registration-only view of a dispatcher.
///
/// Clones share the same dispatcher.
pub struct ListenersManager<K, L: ?Sized, E> {
    dispatcher: SharedDispatcher<K, L, E>,
}

impl<K, L, E> ListenersManager<K, L, E>
where
    K: Eq + Hash + Clone + fmt::Debug,
    L: ?Sized,
    E: Event,
{
    /// Creates a facade over `dispatcher`.
    pub fn new(dispatcher: SharedDispatcher<K, L, E>) -> Self {
        Self { dispatcher }
    }

    /// Appends `listener` to the `priority` tier.
    pub fn add_listener(&self, priority: Priority, listener: Arc<L>) {
        self.dispatcher.add_listener(priority, listener);
    }

    /// Appends `listener` to the [`Priority::Normal`] tier.
    pub fn add_listener_default(&self, listener: Arc<L>) {
        self.dispatcher.add_listener_default(listener);
    }

    /// Removes one occurrence of `listener`.
    pub fn remove_listener(&self, listener: &Arc<L>) -> bool {
        self.dispatcher.remove_listener(listener)
    }

    /// Returns `true` if `listener` is registered.
    pub fn has_listener(&self, listener: &Arc<L>) -> bool {
        self.dispatcher.has_listener(listener)
    }

    /// Registers `consumer` for `key` in the `priority` tier.
    pub fn add_consumer(&self, priority: Priority, key: K, consumer: Consumer<E>) {
        self.dispatcher.add_consumer(priority, key, consumer);
    }

    /// Registers `consumer` for `key` in the [`Priority::Normal`] tier.
    pub fn add_consumer_default(&self, key: K, consumer: Consumer<E>) {
        self.dispatcher.add_consumer_default(key, consumer);
    }

    /// Removes `consumer`.
    pub fn remove_consumer(&self, consumer: &Consumer<E>) -> bool {
        self.dispatcher.remove_consumer(consumer)
    }

    /// Returns `true` if `consumer` is registered.
    pub fn has_consumer(&self, consumer: &Consumer<E>) -> bool {
        self.dispatcher.has_consumer(consumer)
    }

    /// Returns every listener in dispatch order.
    pub fn listeners(&self) -> Vec<Arc<L>> {
        self.dispatcher.listeners()
    }

    /// Returns every consumer in dispatch order.
    pub fn consumers(&self) -> Vec<Consumer<E>> {
        self.dispatcher.consumers()
    }
}

impl<K, L: ?Sized, E> Clone for ListenersManager<K, L, E> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<K: fmt::Debug, L: ?Sized, E> fmt::Debug for ListenersManager<K, L, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenersManager")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

/// Implemented by event sources that let callers manage their handlers.
pub trait ListenersManagerProvider {
    /// Classification key of the emitted events.
    type Key;
    /// Listener type accepted by the source.
    type Listener: ?Sized;
    /// Event type emitted by the source.
    type Event;

    /// Returns the registration facade.
    fn listeners_manager(&self) -> &ListenersManager<Self::Key, Self::Listener, Self::Event>;
}

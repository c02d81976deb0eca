//! Routing table mapping classification keys to handler bindings.
//!
//! The table only stores bindings; invocation is done by the
//! [`Dispatcher`](super::dispatcher::Dispatcher).
//!
//! ```rust,ignore
//! use herald_core::{EventHandler, RoutingTable};
//!
//! let table = RoutingTable::new()
//!     .with(ResourceKind::Opened, EventHandler::new(<dyn ResourceListener>::on_opened))
//!     .with(ResourceKind::Closed, EventHandler::new(<dyn ResourceListener>::on_closed));
//! ```
//!
//! The table is not synchronized. Share it behind a lock or use
//! [`SharedDispatcher`](super::shared::SharedDispatcher) when several threads
//! need it.

use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;
use std::hash::Hash;

use super::handler::EventHandler;

/// Maps a classification key `K` to the binding that delivers `E` to `L`.
pub struct RoutingTable<K, L: ?Sized, E> {
    entries: HashMap<K, EventHandler<L, E>>,
}

impl<K: Eq + Hash, L: ?Sized, E> RoutingTable<K, L, E> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Binds `key` to `handler`, returning the binding it replaced.
    pub fn insert(&mut self, key: K, handler: EventHandler<L, E>) -> Option<EventHandler<L, E>> {
        self.entries.insert(key, handler)
    }

    /// Binds `key` to `handler` (builder pattern).
    pub fn with(mut self, key: K, handler: EventHandler<L, E>) -> Self {
        self.entries.insert(key, handler);
        self
    }

    /// Returns the binding for `key`.
    pub fn get(&self, key: &K) -> Option<&EventHandler<L, E>> {
        self.entries.get(key)
    }

    /// Removes and returns the binding for `key`.
    pub fn remove(&mut self, key: &K) -> Option<EventHandler<L, E>> {
        self.entries.remove(key)
    }

    /// Returns `true` if `key` has a binding.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no bindings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every binding.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates over the bound keys in arbitrary order.
    pub fn keys(&self) -> hash_map::Keys<'_, K, EventHandler<L, E>> {
        self.entries.keys()
    }

    /// Iterates over key/binding pairs in arbitrary order.
    pub fn iter(&self) -> hash_map::Iter<'_, K, EventHandler<L, E>> {
        self.entries.iter()
    }
}

impl<K: Eq + Hash, L: ?Sized, E> Default for RoutingTable<K, L, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, L: ?Sized, E> Clone for RoutingTable<K, L, E> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<K: Eq + Hash, L: ?Sized, E> Extend<(K, EventHandler<L, E>)> for RoutingTable<K, L, E> {
    fn extend<I: IntoIterator<Item = (K, EventHandler<L, E>)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl<K: Eq + Hash, L: ?Sized, E> FromIterator<(K, EventHandler<L, E>)> for RoutingTable<K, L, E> {
    fn from_iter<I: IntoIterator<Item = (K, EventHandler<L, E>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a, K, L: ?Sized, E> IntoIterator for &'a RoutingTable<K, L, E> {
    type Item = (&'a K, &'a EventHandler<L, E>);
    type IntoIter = hash_map::Iter<'a, K, EventHandler<L, E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: fmt::Debug, L: ?Sized, E> fmt::Debug for RoutingTable<K, L, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingTable")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

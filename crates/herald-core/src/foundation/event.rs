//! Event base state for the Herald framework.
//!
//! This module provides the pieces every dispatched event carries:
//!
//! - [`EventState`] - Creation timestamp plus a one-way consumption flag
//! - [`Event`] - Trait exposing that state to the dispatcher
//!
//! Concrete events embed an [`EventState`] and implement [`Event`] by
//! returning a reference to it, usually through `#[derive(Event)]`:
//!
//! ```rust,ignore
//! use herald::prelude::*;
//!
//! #[derive(Debug, Event)]
//! struct ResourceEvent {
//!     #[event(state)]
//!     state: EventState,
//!     path: String,
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// Event State
// ============================================================================

/// Creation timestamp and consumption flag shared by all events.
///
/// The timestamp is fixed at construction. The consumed flag only ever goes
/// from `false` to `true`; it uses an atomic so handlers can flip it through a
/// shared reference while the event is borrowed by the dispatcher.
#[derive(Debug)]
pub struct EventState {
    created_at: SystemTime,
    consumed: AtomicBool,
}

impl EventState {
    /// Creates a fresh, unconsumed state stamped with the current time.
    pub fn new() -> Self {
        Self {
            created_at: SystemTime::now(),
            consumed: AtomicBool::new(false),
        }
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Returns the creation timestamp in milliseconds since the UNIX epoch.
    pub fn timestamp_millis(&self) -> u128 {
        self.created_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
    }

    /// Marks the event as consumed. Calling this more than once has no further effect.
    pub fn consume(&self) {
        self.consumed.store(true, Ordering::Release);
    }

    /// Returns whether the event has been consumed.
    pub fn is_consumed(&self) -> bool {
        self.consumed.load(Ordering::Acquire)
    }
}

impl Default for EventState {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventState {
    /// Cloning copies the original timestamp and the current consumed flag.
    fn clone(&self) -> Self {
        Self {
            created_at: self.created_at,
            consumed: AtomicBool::new(self.is_consumed()),
        }
    }
}

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for all events routed by a
/// [`Dispatcher`](crate::framework::dispatcher::Dispatcher).
///
/// Only [`state`](Event::state) must be implemented. Every other method is
/// provided and delegates to the embedded [`EventState`].
///
/// # Derive Macro
///
/// Use `#[derive(Event)]` from `herald-macros` to generate the impl:
///
/// ```rust,ignore
/// #[derive(Event)]
/// pub struct Opened {
///     #[event(state)]
///     meta: EventState,
///     pub path: String,
/// }
/// ```
pub trait Event {
    /// Returns the embedded event state.
    fn state(&self) -> &EventState;

    /// Returns when this event was created.
    fn created_at(&self) -> SystemTime {
        self.state().created_at()
    }

    /// Returns the creation timestamp in milliseconds since the UNIX epoch.
    fn timestamp_millis(&self) -> u128 {
        self.state().timestamp_millis()
    }

    /// Marks this event as consumed so no further handler receives it.
    fn consume(&self) {
        self.state().consume();
    }

    /// Checks whether this event has been consumed.
    fn is_consumed(&self) -> bool {
        self.state().is_consumed()
    }
}

impl Event for EventState {
    fn state(&self) -> &EventState {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping {
        state: EventState,
    }

    impl Event for Ping {
        fn state(&self) -> &EventState {
            &self.state
        }
    }

    #[test]
    fn test_new_event_is_not_consumed() {
        let event = Ping {
            state: EventState::new(),
        };
        assert!(!event.is_consumed());
        assert!(event.created_at() <= SystemTime::now());
    }

    #[test]
    fn test_consume_is_idempotent() {
        let event = Ping {
            state: EventState::new(),
        };
        let stamp = event.created_at();

        event.consume();
        event.consume();

        assert!(event.is_consumed());
        assert_eq!(event.created_at(), stamp);
    }

    #[test]
    fn test_clone_keeps_timestamp_and_flag() {
        let state = EventState::new();
        state.consume();
        let copy = state.clone();

        assert!(copy.is_consumed());
        assert_eq!(copy.created_at(), state.created_at());
        assert_eq!(copy.timestamp_millis(), state.timestamp_millis());
    }
}

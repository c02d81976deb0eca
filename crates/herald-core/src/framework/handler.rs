//! Handler values for the Herald dispatcher.
//!
//! Two kinds of callables take part in dispatch:
//!
//! - [`EventHandler`] - a binding that delivers an event to one method of a
//!   listener. Bindings live in the [`RoutingTable`](super::routing::RoutingTable),
//!   one per classification key.
//! - [`Consumer`] - a standalone callable registered directly against one
//!   classification key.
//!
//! Both are cheap to clone; clones share the same underlying closure.
//!
//! # Example
//!
//! ```rust,ignore
//! use herald_core::{Consumer, EventHandler, HandlerResult};
//!
//! trait ResourceListener: Send + Sync {
//!     fn on_opened(&self, event: &ResourceEvent) -> HandlerResult;
//! }
//!
//! // Method path as a binding
//! let opened = EventHandler::new(<dyn ResourceListener>::on_opened);
//!
//! // Closure as a consumer
//! let audit = Consumer::infallible(|event: &ResourceEvent| println!("{event:?}"));
//! ```

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::foundation::failure::{Failure, HandlerResult};

/// Runs `f`, turning a panic into a [`FailureKind::PANIC`] failure when
/// `catch_panics` is set.
///
/// [`FailureKind::PANIC`]: crate::foundation::failure::FailureKind::PANIC
pub(crate) fn invoke_guarded<F>(catch_panics: bool, f: F) -> HandlerResult
where
    F: FnOnce() -> HandlerResult,
{
    if !catch_panics {
        return f();
    }
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| Err(Failure::from_panic(payload)))
}

// ============================================================================
// Handler Binding
// ============================================================================

type BindingFn<L, E> = dyn Fn(&L, &E) -> HandlerResult + Send + Sync;

/// Delivers an event of type `E` to a listener of type `L`.
pub struct EventHandler<L: ?Sized, E> {
    f: Arc<BindingFn<L, E>>,
}

impl<L: ?Sized, E> EventHandler<L, E> {
    /// Creates a binding from a fallible function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&L, &E) -> HandlerResult + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Creates a binding from a function that cannot fail.
    pub fn infallible<F>(f: F) -> Self
    where
        F: Fn(&L, &E) + Send + Sync + 'static,
    {
        Self::new(move |listener, event| {
            f(listener, event);
            Ok(())
        })
    }

    /// Delivers `event` to `listener`.
    pub fn handle(&self, listener: &L, event: &E) -> HandlerResult {
        (self.f)(listener, event)
    }

    /// Returns `true` if both values share the same closure.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl<L: ?Sized, E> Clone for EventHandler<L, E> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<L: ?Sized, E> fmt::Debug for EventHandler<L, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler").finish_non_exhaustive()
    }
}

// ============================================================================
// Consumer
// ============================================================================

type ConsumerFn<E> = dyn Fn(&E) -> HandlerResult + Send + Sync;

/// Identity of a [`Consumer`], stable for as long as any clone is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId(usize);

/// A callable that receives events registered for one classification key.
///
/// Consumers are compared by identity: a clone is the same consumer, while
/// two consumers built from identical closures are different consumers.
pub struct Consumer<E> {
    f: Arc<ConsumerFn<E>>,
}

impl<E> Consumer<E> {
    /// Creates a consumer from a fallible function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&E) -> HandlerResult + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Creates a consumer from a function that cannot fail.
    pub fn infallible<F>(f: F) -> Self
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        Self::new(move |event| {
            f(event);
            Ok(())
        })
    }

    /// Processes `event`.
    pub fn consume(&self, event: &E) -> HandlerResult {
        (self.f)(event)
    }

    /// Returns the identity of this consumer.
    pub fn id(&self) -> ConsumerId {
        ConsumerId(Arc::as_ptr(&self.f) as *const () as usize)
    }

    /// Returns `true` if both values are the same consumer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl<E> Clone for Consumer<E> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<E> PartialEq for Consumer<E> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<E> Eq for Consumer<E> {}

impl<E> fmt::Debug for Consumer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Consumer").field(&self.id()).finish()
    }
}

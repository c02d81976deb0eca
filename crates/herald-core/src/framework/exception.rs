//! Exception handlers and the resolution chain.
//!
//! When a listener or consumer fails, the dispatcher asks its
//! [`ExceptionChain`] for a recovery action. Entries are scanned in
//! registration order and the first one whose [`FailureKind`] the failure is
//! an instance of runs. Nothing else is tried, even if that handler fails in
//! turn.
//!
//! ```rust,ignore
//! use herald_core::{ExceptionHandler, FailureKind};
//!
//! dispatcher.add_exception_handler(
//!     FailureKind::RUNTIME,
//!     ExceptionHandler::infallible(|listener, event, failure| {
//!         eprintln!("{failure} (listener attached: {})", listener.is_some());
//!     })
//!     .and_then(ExceptionHandler::infallible(|_, event, _| event.consume())),
//! )?;
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::handler::invoke_guarded;
use crate::error::{DispatchError, DispatchResult};
use crate::foundation::failure::{Failure, FailureKind, HandlerResult};

// ============================================================================
// Exception Handler
// ============================================================================

type ExceptionFn<L, E> = dyn Fn(Option<&L>, &E, &Failure) -> HandlerResult + Send + Sync;

/// Recovery action invoked with the failing listener (absent for consumers),
/// the event and the failure.
pub struct ExceptionHandler<L: ?Sized, E> {
    f: Arc<ExceptionFn<L, E>>,
}

impl<L: ?Sized, E> ExceptionHandler<L, E> {
    /// Creates a handler from a fallible function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&L>, &E, &Failure) -> HandlerResult + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Creates a handler from a function that cannot fail.
    pub fn infallible<F>(f: F) -> Self
    where
        F: Fn(Option<&L>, &E, &Failure) + Send + Sync + 'static,
    {
        Self::new(move |listener, event, failure| {
            f(listener, event, failure);
            Ok(())
        })
    }

    /// Runs the handler.
    pub fn handle(&self, listener: Option<&L>, event: &E, failure: &Failure) -> HandlerResult {
        (self.f)(listener, event, failure)
    }

    /// Returns `true` if both values share the same closure.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl<L: ?Sized + 'static, E: 'static> ExceptionHandler<L, E> {
    /// Returns a handler that runs `self` and then `next`.
    ///
    /// If `self` fails, its failure is returned and `next` does not run.
    pub fn and_then(self, next: ExceptionHandler<L, E>) -> Self {
        Self::new(move |listener, event, failure| {
            self.handle(listener, event, failure)?;
            next.handle(listener, event, failure)
        })
    }
}

impl<L: ?Sized, E> Clone for ExceptionHandler<L, E> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<L: ?Sized, E> fmt::Debug for ExceptionHandler<L, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionHandler").finish_non_exhaustive()
    }
}

// ============================================================================
// Resolution Chain
// ============================================================================

/// Outcome of routing one failure through an [`ExceptionChain`].
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The matched handler completed.
    Handled,
    /// The matched handler failed with the contained failure.
    HandlerFailed(Failure),
    /// No entry matched.
    Unmatched,
}

struct ExceptionEntry<L: ?Sized, E> {
    kind: FailureKind,
    handler: ExceptionHandler<L, E>,
}

impl<L: ?Sized, E> Clone for ExceptionEntry<L, E> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            handler: self.handler.clone(),
        }
    }
}

/// Ordered, first-match list of exception handlers keyed by failure kind.
///
/// At most one entry exists per kind. Registering a kind again removes the
/// old entry and appends the new one at the end of the resolution order.
pub struct ExceptionChain<L: ?Sized, E> {
    entries: Vec<ExceptionEntry<L, E>>,
}

impl<L: ?Sized, E> ExceptionChain<L, E> {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers `handler` for `kind`, returning the handler it replaced.
    ///
    /// Fails with [`DispatchError::InvalidArgument`] if `kind` is absent.
    pub fn register(
        &mut self,
        kind: FailureKind,
        handler: ExceptionHandler<L, E>,
    ) -> DispatchResult<Option<ExceptionHandler<L, E>>> {
        if kind.is_absent() {
            return Err(DispatchError::invalid_argument("exception kind"));
        }

        let replaced = self.take(&kind);
        self.entries.push(ExceptionEntry { kind, handler });
        Ok(replaced)
    }

    /// Removes the handler registered for exactly `kind`.
    pub fn remove(&mut self, kind: &FailureKind) -> bool {
        self.take(kind).is_some()
    }

    fn take(&mut self, kind: &FailureKind) -> Option<ExceptionHandler<L, E>> {
        let pos = self.entries.iter().position(|entry| entry.kind == *kind)?;
        Some(self.entries.remove(pos).handler)
    }

    /// Returns the first handler whose kind `failure` is an instance of.
    pub fn resolve(&self, failure: &Failure) -> Option<&ExceptionHandler<L, E>> {
        self.entries
            .iter()
            .find(|entry| failure.is(&entry.kind))
            .map(|entry| &entry.handler)
    }

    /// Routes `failure` to its handler.
    ///
    /// With `catch_panics`, a panicking handler is reported as
    /// [`Resolution::HandlerFailed`] with a [`FailureKind::PANIC`] failure.
    pub fn handle(
        &self,
        listener: Option<&L>,
        event: &E,
        failure: &Failure,
        catch_panics: bool,
    ) -> Resolution {
        let Some(handler) = self.resolve(failure) else {
            trace!(kind = %failure.kind(), "No exception handler matched");
            return Resolution::Unmatched;
        };

        match invoke_guarded(catch_panics, || handler.handle(listener, event, failure)) {
            Ok(()) => Resolution::Handled,
            Err(handler_failure) => Resolution::HandlerFailed(handler_failure),
        }
    }

    /// Returns the registered kinds in resolution order.
    pub fn kinds(&self) -> Vec<FailureKind> {
        self.entries.iter().map(|entry| entry.kind).collect()
    }

    /// Returns the number of registered handlers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every handler.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<L: ?Sized, E> Default for ExceptionChain<L, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized, E> Clone for ExceptionChain<L, E> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<L: ?Sized, E> fmt::Debug for ExceptionChain<L, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionChain")
            .field("kinds", &self.kinds())
            .finish()
    }
}

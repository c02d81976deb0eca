//! Diagnostic reporting for failures that cannot be handled in-band.
//!
//! The dispatcher never propagates dispatch-time failures to its caller.
//! When an exception handler itself fails, or when an unmatched failure is
//! configured to be reported, the dispatcher hands a [`Diagnostic`] to its
//! [`DiagnosticSink`].
//!
//! Two sinks are provided:
//!
//! - [`StderrSink`] - writes one line per diagnostic to standard error (default)
//! - [`TracingSink`] - emits a `tracing` event instead
//!
//! Any `Fn(&Diagnostic<'_>) + Send + Sync` closure is also a sink.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use tracing::{error, warn};

use crate::foundation::failure::Failure;

/// Where a failure was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A listener, through its handler binding.
    Listener,
    /// A consumer.
    Consumer,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listener => f.write_str("listener"),
            Self::Consumer => f.write_str("consumer"),
        }
    }
}

/// A condition reported to a [`DiagnosticSink`].
#[derive(Debug, Clone, Copy)]
pub enum Diagnostic<'a> {
    /// The exception handler resolved for `failure` failed with `handler_failure`.
    ExceptionHandlerFailed {
        /// Classification key of the dispatch call.
        key: &'a dyn fmt::Debug,
        /// Where the original failure came from.
        origin: Origin,
        /// The failure being handled.
        failure: &'a Failure,
        /// The failure raised by the exception handler.
        handler_failure: &'a Failure,
    },
    /// No exception handler matched `failure`.
    UnhandledFailure {
        /// Classification key of the dispatch call.
        key: &'a dyn fmt::Debug,
        /// Where the failure came from.
        origin: Origin,
        /// The unmatched failure.
        failure: &'a Failure,
    },
}

impl Diagnostic<'_> {
    /// Returns the failure raised by the listener or consumer.
    pub fn failure(&self) -> &Failure {
        match self {
            Self::ExceptionHandlerFailed { failure, .. }
            | Self::UnhandledFailure { failure, .. } => failure,
        }
    }

    /// Returns where the original failure came from.
    pub fn origin(&self) -> Origin {
        match self {
            Self::ExceptionHandlerFailed { origin, .. } | Self::UnhandledFailure { origin, .. } => {
                *origin
            }
        }
    }
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExceptionHandlerFailed {
                key,
                origin,
                failure,
                handler_failure,
            } => write!(
                f,
                "exception handler failed: {handler_failure} (while handling {origin} failure \
                 '{failure}' for {key:?})"
            ),
            Self::UnhandledFailure {
                key,
                origin,
                failure,
            } => write!(f, "unhandled {origin} failure for {key:?}: {failure}"),
        }
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Receives diagnostics from a dispatcher.
pub trait DiagnosticSink: Send + Sync {
    /// Reports one diagnostic. Must not panic.
    fn report(&self, diagnostic: &Diagnostic<'_>);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Diagnostic<'_>) + Send + Sync,
{
    fn report(&self, diagnostic: &Diagnostic<'_>) {
        self(diagnostic)
    }
}

/// A shared, type-erased sink.
pub type BoxedSink = Arc<dyn DiagnosticSink>;

/// Writes diagnostics to standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&self, diagnostic: &Diagnostic<'_>) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "herald: {diagnostic}");
    }
}

/// Emits diagnostics as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic<'_>) {
        match diagnostic {
            Diagnostic::ExceptionHandlerFailed {
                key,
                origin,
                failure,
                handler_failure,
            } => error!(
                key = ?key,
                %origin,
                %failure,
                %handler_failure,
                "Exception handler failed"
            ),
            Diagnostic::UnhandledFailure {
                key,
                origin,
                failure,
            } => warn!(key = ?key, %origin, %failure, "Unhandled dispatch failure"),
        }
    }
}

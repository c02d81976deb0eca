//! Dispatch-time failures and their kind hierarchy.
//!
//! Listeners, consumers and exception handlers report problems by returning a
//! [`Failure`]. Every failure carries a [`FailureKind`], and kinds form a tree
//! through an optional parent link. Exception handlers are registered against
//! a kind and match any failure whose kind is that kind or a descendant of it:
//!
//! ```text
//! Failure
//! ├── RuntimeError
//! │   ├── IllegalStateError
//! │   └── IllegalArgumentError
//! ├── IoError
//! └── Panic
//! ```
//!
//! Applications extend the tree with their own constants:
//!
//! ```rust,ignore
//! use herald_core::FailureKind;
//!
//! pub const QUOTA_EXCEEDED: FailureKind =
//!     FailureKind::child("QuotaExceeded", &FailureKind::ILLEGAL_STATE);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

// ============================================================================
// Failure Kind
// ============================================================================

/// A node in the failure kind tree.
///
/// Two kinds are equal when their names and their whole ancestor chains are
/// equal, so a kind declared twice with the same lineage is the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FailureKind {
    name: &'static str,
    parent: Option<&'static FailureKind>,
}

impl FailureKind {
    /// Root of the tree; every kind is an instance of it.
    pub const ANY: FailureKind = FailureKind::root("Failure");
    /// Generic runtime failures.
    pub const RUNTIME: FailureKind = FailureKind::child("RuntimeError", &FailureKind::ANY);
    /// An operation was attempted in the wrong state.
    pub const ILLEGAL_STATE: FailureKind =
        FailureKind::child("IllegalStateError", &FailureKind::RUNTIME);
    /// A handler received a value it could not accept.
    pub const ILLEGAL_ARGUMENT: FailureKind =
        FailureKind::child("IllegalArgumentError", &FailureKind::RUNTIME);
    /// Input/output failures.
    pub const IO: FailureKind = FailureKind::child("IoError", &FailureKind::ANY);
    /// A handler panicked and the panic was caught by the dispatcher.
    pub const PANIC: FailureKind = FailureKind::child("Panic", &FailureKind::ANY);

    /// Declares a kind without a parent.
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Declares a kind below `parent`.
    pub const fn child(name: &'static str, parent: &'static FailureKind) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    /// Returns the kind name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the parent kind, if any.
    pub fn parent(&self) -> Option<&'static FailureKind> {
        self.parent
    }

    /// A kind with an empty name stands for "no kind" and cannot be registered.
    pub fn is_absent(&self) -> bool {
        self.name.is_empty()
    }

    /// Iterates over this kind followed by each of its ancestors.
    pub fn lineage(&self) -> impl Iterator<Item = &FailureKind> {
        std::iter::successors(Some(self), |kind| kind.parent)
    }

    /// Returns `true` if this kind is `other` or descends from it.
    pub fn is_a(&self, other: &FailureKind) -> bool {
        self.lineage().any(|kind| kind == other)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ============================================================================
// Failure
// ============================================================================

/// A failure raised by a listener, consumer or exception handler.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct Failure {
    kind: FailureKind,
    message: String,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Failure {
    /// Creates a failure of the given kind.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a [`FailureKind::RUNTIME`] failure.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(FailureKind::RUNTIME, message)
    }

    /// Creates a [`FailureKind::ILLEGAL_STATE`] failure.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ILLEGAL_STATE, message)
    }

    /// Creates a [`FailureKind::ILLEGAL_ARGUMENT`] failure.
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ILLEGAL_ARGUMENT, message)
    }

    /// Wraps an arbitrary error, keeping it as the failure's source.
    pub fn from_error(
        kind: FailureKind,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: error.to_string(),
            source: Some(Arc::new(error)),
        }
    }

    /// Converts a caught panic payload into a [`FailureKind::PANIC`] failure.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self::new(FailureKind::PANIC, message)
    }

    /// Returns the failure kind.
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if this failure is an instance of `kind`.
    pub fn is(&self, kind: &FailureKind) -> bool {
        self.kind.is_a(kind)
    }
}

impl From<std::io::Error> for Failure {
    fn from(err: std::io::Error) -> Self {
        Self::from_error(FailureKind::IO, err)
    }
}

/// Result type returned by listeners, consumers and exception handlers.
pub type HandlerResult = Result<(), Failure>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    const QUOTA: FailureKind = FailureKind::child("QuotaExceeded", &FailureKind::ILLEGAL_STATE);

    #[test]
    fn test_is_a_follows_ancestors() {
        assert!(QUOTA.is_a(&QUOTA));
        assert!(QUOTA.is_a(&FailureKind::ILLEGAL_STATE));
        assert!(QUOTA.is_a(&FailureKind::RUNTIME));
        assert!(QUOTA.is_a(&FailureKind::ANY));
        assert!(!QUOTA.is_a(&FailureKind::IO));
        assert!(!FailureKind::RUNTIME.is_a(&QUOTA));
    }

    #[test]
    fn test_same_lineage_is_equal() {
        const AGAIN: FailureKind = FailureKind::child("QuotaExceeded", &FailureKind::ILLEGAL_STATE);
        const ELSEWHERE: FailureKind = FailureKind::child("QuotaExceeded", &FailureKind::IO);
        assert_eq!(QUOTA, AGAIN);
        assert_ne!(QUOTA, ELSEWHERE);
    }

    #[test]
    fn test_lineage_order() {
        let names: Vec<_> = QUOTA.lineage().map(FailureKind::name).collect();
        assert_eq!(
            names,
            ["QuotaExceeded", "IllegalStateError", "RuntimeError", "Failure"]
        );
    }

    #[test]
    fn test_failure_display_and_source() {
        let io = std::io::Error::other("disk gone");
        let failure = Failure::from(io);

        assert!(failure.is(&FailureKind::IO));
        assert_eq!(failure.to_string(), "IoError: disk gone");
        assert!(failure.source().is_some());
    }

    #[test]
    fn test_from_panic_payloads() {
        let from_str = Failure::from_panic(Box::new("boom"));
        let from_string = Failure::from_panic(Box::new(String::from("bang")));
        let opaque = Failure::from_panic(Box::new(42_u8));

        assert_eq!(from_str.message(), "boom");
        assert_eq!(from_string.message(), "bang");
        assert_eq!(opaque.message(), "handler panicked");
        assert_eq!(opaque.kind(), FailureKind::PANIC);
    }

    #[test]
    fn test_absent_kind() {
        assert!(FailureKind::root("").is_absent());
        assert!(!FailureKind::RUNTIME.is_absent());
    }
}

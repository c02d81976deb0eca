//! Registration error types for the Herald core.
//!
//! Only registration calls return errors synchronously. Everything that goes
//! wrong while dispatching is a [`Failure`](crate::foundation::failure::Failure) and is
//! contained inside the dispatch call.

use thiserror::Error;

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Errors returned by dispatcher registration operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A required registration argument was absent.
    #[error("invalid argument: {argument} must not be absent")]
    InvalidArgument {
        /// Name of the missing argument.
        argument: &'static str,
    },
}

impl DispatchError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(argument: &'static str) -> Self {
        Self::InvalidArgument { argument }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for registration operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

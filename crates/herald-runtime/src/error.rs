//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while bootstrapping Herald from configuration.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The log file appender could not be created.
    #[error("Failed to open log file: {0}")]
    LogFile(#[from] tracing_appender::rolling::InitError),

    /// A global tracing subscriber was already installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(#[from] tracing_subscriber::util::TryInitError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

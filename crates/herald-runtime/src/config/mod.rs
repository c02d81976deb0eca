//! Configuration module for the Herald runtime.
//!
//! This module provides figment-based configuration loading and validation
//! for logging and dispatcher settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    DiagnosticsTarget, DispatchConfig, HeraldConfig, LogFormat, LogLevel, LogOutput, LogRotation,
    LoggingConfig, SpanEventConfig, UnmatchedFailures,
};
pub use validation::validate_config;

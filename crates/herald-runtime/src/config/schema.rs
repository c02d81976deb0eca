//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;

use herald_core::{
    BoxedSink, DispatchPolicy, Dispatcher, DispatcherBuilder, Event, StderrSink, TracingSink,
    UnmatchedFailurePolicy,
};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HeraldConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dispatcher settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level as a filter directive string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `Full` without it.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Rotation period for file output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Minutely,
    Hourly,
    Daily,
}

impl LogRotation {
    /// Converts to a `tracing-appender` rotation.
    pub fn to_rotation(self) -> tracing_appender::rolling::Rotation {
        use tracing_appender::rolling::Rotation;
        match self {
            Self::Never => Rotation::NEVER,
            Self::Minutely => Rotation::MINUTELY,
            Self::Hourly => Rotation::HOURLY,
            Self::Daily => Rotation::DAILY,
        }
    }
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Global log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file path, required when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Rotation period for file output.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Maximum number of rotated files to keep. Unlimited when absent.
    #[serde(default)]
    pub max_files: Option<usize>,

    /// Include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Span lifecycle events.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Per-module level overrides, e.g. `herald_core = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            rotation: LogRotation::Never,
            max_files: None,
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            filters: HashMap::new(),
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Handling of failures that no exception handler matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedFailures {
    #[default]
    Ignore,
    Report,
}

/// Destination for dispatcher diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticsTarget {
    #[default]
    Stderr,
    Tracing,
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchConfig {
    /// What happens to unmatched failures.
    #[serde(default)]
    pub unmatched_failures: UnmatchedFailures,

    /// Convert handler panics into failures.
    #[serde(default = "default_catch_panics")]
    pub catch_panics: bool,

    /// Where diagnostics are written.
    #[serde(default)]
    pub diagnostics: DiagnosticsTarget,
}

fn default_catch_panics() -> bool {
    true
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            unmatched_failures: UnmatchedFailures::Ignore,
            catch_panics: default_catch_panics(),
            diagnostics: DiagnosticsTarget::Stderr,
        }
    }
}

impl DispatchConfig {
    /// Converts to a core dispatch policy.
    pub fn to_policy(&self) -> DispatchPolicy {
        DispatchPolicy {
            unmatched_failures: match self.unmatched_failures {
                UnmatchedFailures::Ignore => UnmatchedFailurePolicy::Ignore,
                UnmatchedFailures::Report => UnmatchedFailurePolicy::Report,
            },
            catch_panics: self.catch_panics,
        }
    }

    /// Creates the configured diagnostic sink.
    pub fn sink(&self) -> BoxedSink {
        match self.diagnostics {
            DiagnosticsTarget::Stderr => Arc::new(StderrSink),
            DiagnosticsTarget::Tracing => Arc::new(TracingSink),
        }
    }

    /// Returns a dispatcher builder preloaded with this configuration.
    pub fn builder<K, L, E>(&self) -> DispatcherBuilder<K, L, E>
    where
        K: Eq + Hash + Clone + fmt::Debug,
        L: ?Sized,
        E: Event,
    {
        Dispatcher::builder()
            .policy(self.to_policy())
            .boxed_sink(self.sink())
    }
}

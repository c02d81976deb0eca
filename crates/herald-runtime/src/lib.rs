//! Herald Runtime - Configuration and logging bootstrap for Herald.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `HeraldConfig`)
//! - Configuration validation (`validate_config`)
//! - Logging initialization (`LoggingBuilder`, `logging::init_from_config`)
//! - Dispatcher setup from configuration (`DispatchConfig::builder`)
//!
//! ```ignore
//! use herald_runtime::config::load_config;
//! use herald_runtime::logging;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     logging::init_from_config(&config.logging)?;
//!
//!     let dispatcher = config
//!         .dispatch
//!         .builder::<ResourceKind, dyn ResourceListener, ResourceEvent>()
//!         .routing_table(table)
//!         .build();
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, DispatchConfig, HeraldConfig, LoggingConfig,
    validate_config,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}

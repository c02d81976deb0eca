//! Configuration validation utilities.

use tracing_subscriber::filter::Directive;

use super::error::{ConfigError, ConfigResult};
use super::schema::{HeraldConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &HeraldConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates logging configuration.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File {
        match &logging.file_path {
            None => return Err(ConfigError::missing_field("logging.file_path")),
            Some(path) if path.file_name().is_none() => {
                return Err(ConfigError::validation(format!(
                    "Log file path must name a file: {}",
                    path.display()
                )));
            }
            Some(_) => {}
        }
    }

    if logging.max_files == Some(0) {
        return Err(ConfigError::validation(
            "logging.max_files must be greater than 0",
        ));
    }

    for (module, level) in &logging.filters {
        validate_filter(module, level.as_str())?;
    }

    Ok(())
}

/// Validates a single per-module filter.
fn validate_filter(module: &str, level: &str) -> ConfigResult<()> {
    if module.is_empty() {
        return Err(ConfigError::invalid_filter(module, "module name is empty"));
    }

    if module.contains(|c: char| c.is_whitespace() || c == '=' || c == ',') {
        return Err(ConfigError::invalid_filter(
            module,
            "module name cannot contain whitespace, '=' or ','",
        ));
    }

    format!("{module}={level}")
        .parse::<Directive>()
        .map_err(|e| ConfigError::invalid_filter(module, e.to_string()))?;

    Ok(())
}

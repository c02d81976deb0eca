//! Layered configuration loading.
//!
//! Sources, each overriding the previous one:
//!
//! 1. [`HeraldConfig::default`]
//! 2. values passed to [`ConfigLoader::merge`]
//! 3. the profile file, e.g. `herald.production.toml`
//! 4. the main file (`herald.toml`, `config.toml`, or the YAML equivalents)
//! 5. `HERALD_*` environment variables, with `__` between nested keys
//!    (`HERALD_DISPATCH__CATCH_PANICS=false`)
//!
//! TOML files need the `toml-config` feature (on by default), YAML files
//! need `yaml-config`.
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/herald.toml")
//!     .load_validated()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::HeraldConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "HERALD_";
const PROFILE_VAR: &str = "HERALD_PROFILE";

/// Selects the `herald.{profile}.*` file merged under the main file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Case-insensitive; `dev` and `prod` are accepted as short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `HERALD_PROFILE`, falling back to [`Profile::Development`].
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Toml,
    Yaml,
}

impl FileFormat {
    const ALL: [FileFormat; 2] = [Self::Toml, Self::Yaml];

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    fn is_enabled(self) -> bool {
        match self {
            Self::Toml => cfg!(feature = "toml-config"),
            Self::Yaml => cfg!(feature = "yaml-config"),
        }
    }

    /// File names searched for, in order.
    fn main_files(self) -> &'static [&'static str] {
        match self {
            Self::Toml => &["herald.toml", "config.toml"],
            Self::Yaml => &["herald.yaml", "herald.yml", "config.yaml", "config.yml"],
        }
    }

    fn merge_into(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(Yaml::file(path)),
            #[allow(unreachable_patterns)]
            _ => figment,
        }
    }
}

/// Builds a [`HeraldConfig`] from defaults, files and the environment.
pub struct ConfigLoader {
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Environment loading is on and the profile comes from `HERALD_PROFILE`.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory to search. Without any, the current directory and
    /// the user config directory (`<config>/herald`) are searched.
    pub fn search_path(mut self, path: impl AsRef<Path>) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join("herald")),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching. It must exist.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Layers `config` over the defaults; files and environment still win.
    pub fn merge(mut self, config: HeraldConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Loads the configuration without validating it.
    pub fn load(self) -> ConfigResult<HeraldConfig> {
        let profile = self.profile.clone();
        let config: HeraldConfig = self
            .build_figment()?
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!(
            %profile,
            level = %config.logging.level,
            unmatched_failures = ?config.dispatch.unmatched_failures,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Loads the configuration and runs [`validate_config`] on it.
    pub fn load_validated(self) -> ConfigResult<HeraldConfig> {
        let config = self.load()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn build_figment(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(HeraldConfig::default()))
            .merge(self.overrides.clone());

        figment = match &self.config_file {
            Some(path) => Self::merge_explicit_file(figment, path)?,
            None => self.merge_found_files(figment),
        };

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Merging environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }
        Ok(figment)
    }

    fn merge_explicit_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let format = FileFormat::from_extension(ext)
            .filter(|format| format.is_enabled())
            .ok_or_else(|| ConfigError::UnsupportedFormat(ext.to_string()))?;

        info!(path = %path.display(), "Loading configuration file");
        Ok(format.merge_into(figment, path))
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("herald")))
            .collect()
    }

    /// For each enabled format, merges the first main file found along with
    /// its profile variant in the same directory.
    fn merge_found_files(&self, mut figment: Figment) -> Figment {
        let dirs = self.search_dirs();
        let mut found = false;

        'formats: for format in FileFormat::ALL.into_iter().filter(|f| f.is_enabled()) {
            for dir in &dirs {
                for name in format.main_files() {
                    let Some((stem, ext)) = name.rsplit_once('.') else {
                        continue;
                    };

                    let profile_path = dir.join(format!("{stem}.{}.{ext}", self.profile));
                    if profile_path.exists() {
                        debug!(path = %profile_path.display(), "Loading profile configuration");
                        figment = format.merge_into(figment, &profile_path);
                    }

                    let main_path = dir.join(name);
                    if main_path.exists() {
                        info!(path = %main_path.display(), "Loading configuration file");
                        figment = format.merge_into(figment, &main_path);
                        found = true;
                        continue 'formats;
                    }
                }
            }
        }

        if !found {
            warn!(searched = dirs.len(), "No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads and validates the configuration from the default locations.
pub fn load_config() -> ConfigResult<HeraldConfig> {
    ConfigLoader::new().load_validated()
}

/// Loads and validates `path`, with environment overrides.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<HeraldConfig> {
    ConfigLoader::new().file(path).load_validated()
}

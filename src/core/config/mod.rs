//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. Environment overrides (`AZDO_ORG_SERVICE_URL`)
//! 4. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! An explicit path (`--config`) must exist. Otherwise searched in order:
//! 1. `$REPOFILE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/repofile/config.toml`
//! 3. `~/.repofile/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use repofile::core::config::Config;
//!
//! let result = Config::load(None).unwrap();
//! let config = result.config;
//!
//! println!("Default branch: {}", config.default_branch());
//! println!("Push timeout: {:?}", config.timeouts().push);
//! ```

pub mod schema;

pub use schema::{FileConfig, ProviderConfig, ResourceConfig, DEFAULT_TOKEN_ENV};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::types::BranchRef;
use crate::resource::Timeouts;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "REPOFILE_CONFIG";

/// Environment variable overriding `provider.org_service_url`.
pub const ORG_SERVICE_URL_ENV: &str = "AZDO_ORG_SERVICE_URL";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("access token not found: set the {var} environment variable")]
    MissingToken { var: String },
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Loaded configuration with defaults and overrides applied.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed configuration file (or defaults)
    pub file: FileConfig,
    /// Path to the config file (if loaded)
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `explicit`, or from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if `explicit` is missing, or if a config file exists
    /// but cannot be parsed or fails validation. Missing default config files
    /// are not an error (defaults are used).
    pub fn load(explicit: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        Self::load_with(explicit, |key| std::env::var(key).ok())
    }

    /// Load with a custom environment lookup.
    fn load_with(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (file, path) = match explicit {
            Some(path) => (Self::read_config(path)?, Some(path.to_path_buf())),
            None => Self::search(&env, &mut warnings)?,
        };

        let mut config = Config { file, path };
        config.apply_env_overrides(&env);
        config.file.validate()?;

        Ok(ConfigLoadResult { config, warnings })
    }

    /// Search the default locations.
    fn search(
        env: &impl Fn(&str) -> Option<String>,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
        // 1. Check $REPOFILE_CONFIG
        if let Some(path) = env(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
            warnings.push(ConfigWarning {
                message: format!("{} points to a missing file, ignoring it", CONFIG_ENV),
                path,
            });
        }

        // 2. Check $XDG_CONFIG_HOME/repofile/config.toml
        if let Some(xdg_home) = env("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("repofile/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. Check ~/.repofile/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".repofile/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // No config found, use defaults
        Ok((FileConfig::default(), None))
    }

    /// Read and parse a config file.
    fn read_config(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn apply_env_overrides(&mut self, env: &impl Fn(&str) -> Option<String>) {
        if let Some(url) = env(ORG_SERVICE_URL_ENV).filter(|u| !u.is_empty()) {
            self.file.provider.org_service_url = Some(url);
        }
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Remote service settings.
    pub fn provider(&self) -> &ProviderConfig {
        &self.file.provider
    }

    /// Branch used by declarations and imports that don't name one.
    ///
    /// Defaults to `refs/heads/master`.
    pub fn default_branch(&self) -> BranchRef {
        self.file
            .resource
            .default_branch
            .as_deref()
            .and_then(|b| BranchRef::new(b).ok())
            .unwrap_or_default()
    }

    /// Lifecycle timeouts; unset values keep their defaults.
    pub fn timeouts(&self) -> Timeouts {
        let defaults = Timeouts::default();
        let resource = &self.file.resource;
        Timeouts {
            push: resource
                .create_timeout_secs
                .map_or(defaults.push, Duration::from_secs),
            read: resource
                .read_timeout_secs
                .map_or(defaults.read, Duration::from_secs),
            poll_interval: resource
                .poll_interval_secs
                .map_or(defaults.poll_interval, Duration::from_secs),
        }
    }

    /// Read the access token from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingToken` if the variable is unset or empty.
    pub fn token(&self) -> Result<String, ConfigError> {
        let var = self.provider().token_env();
        std::env::var(var)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::MissingToken {
                var: var.to_string(),
            })
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_file() {
        let config = Config::default();

        assert_eq!(config.default_branch().as_str(), "refs/heads/master");
        assert_eq!(config.timeouts(), Timeouts::default());
        assert_eq!(config.provider().token_env(), "AZDO_PERSONAL_ACCESS_TOKEN");
        assert!(config.loaded_from().is_none());
    }

    #[test]
    fn load_from_env_var() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [resource]
            default_branch = "refs/heads/main"
            read_timeout_secs = 9
            "#,
        )
        .unwrap();

        let result =
            Config::load_with(None, env(&[(CONFIG_ENV, path.to_str().unwrap())])).unwrap();
        let config = result.config;

        assert_eq!(config.loaded_from(), Some(path.as_path()));
        assert_eq!(config.default_branch().as_str(), "refs/heads/main");
        assert_eq!(config.timeouts().read, Duration::from_secs(9));
        assert_eq!(config.timeouts().push, Duration::from_secs(600));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn load_from_xdg() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("repofile");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), "[resource]\npoll_interval_secs = 1\n").unwrap();

        let result = Config::load_with(
            None,
            env(&[("XDG_CONFIG_HOME", temp.path().to_str().unwrap())]),
        )
        .unwrap();

        assert_eq!(
            result.config.timeouts().poll_interval,
            Duration::from_secs(1)
        );
    }

    #[test]
    fn missing_env_file_warns() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");

        let result = Config::load_with(
            None,
            env(&[
                (CONFIG_ENV, missing.to_str().unwrap()),
                ("XDG_CONFIG_HOME", temp.path().to_str().unwrap()),
            ]),
        )
        .unwrap();

        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].path, missing);
    }

    #[test]
    fn explicit_path_must_exist() {
        let temp = TempDir::new().unwrap();
        let result = Config::load_with(Some(&temp.path().join("nope.toml")), env(&[]));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn env_overrides_org_url() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[provider]\norg_service_url = \"https://dev.azure.com/from-file\"\n",
        )
        .unwrap();

        let result = Config::load_with(
            Some(&path),
            env(&[(ORG_SERVICE_URL_ENV, "https://dev.azure.com/from-env")]),
        )
        .unwrap();

        assert_eq!(
            result.config.provider().org_service_url.as_deref(),
            Some("https://dev.azure.com/from-env")
        );
    }

    #[test]
    fn invalid_values_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[resource]\ncreate_timeout_secs = 0\n").unwrap();

        let result = Config::load_with(Some(&path), env(&[]));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[provider\n").unwrap();

        let err = Config::load_with(Some(&path), env(&[])).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn missing_token_names_variable() {
        let config = Config {
            file: FileConfig {
                provider: ProviderConfig {
                    token_env: Some("REPOFILE_TEST_TOKEN_THAT_IS_NEVER_SET".into()),
                    ..Default::default()
                },
                ..Default::default()
            },
            path: None,
        };

        let err = config.token().unwrap_err();
        assert!(err
            .to_string()
            .contains("REPOFILE_TEST_TOKEN_THAT_IS_NEVER_SET"));
    }
}

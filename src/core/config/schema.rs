//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! [provider]
//! kind = "azuredevops"
//! org_service_url = "https://dev.azure.com/myorg"
//! project = "infra"
//! token_env = "AZDO_PERSONAL_ACCESS_TOKEN"
//!
//! [resource]
//! default_branch = "refs/heads/master"
//! create_timeout_secs = 600
//! read_timeout_secs = 5
//! poll_interval_secs = 2
//! ```
//!
//! # Validation
//!
//! Config values are validated after parsing: the provider must be known,
//! timeouts must be positive, and the default branch must be a
//! fully-qualified `refs/heads/` reference.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchRef;

/// Environment variable holding the personal access token by default.
pub const DEFAULT_TOKEN_ENV: &str = "AZDO_PERSONAL_ACCESS_TOKEN";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Remote service settings
    pub provider: ProviderConfig,

    /// Resource defaults
    pub resource: ResourceConfig,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider.validate()?;
        self.resource.validate()
    }
}

/// Remote service settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider kind (e.g., "azuredevops"); detected from the URL when unset
    pub kind: Option<String>,

    /// Organization or collection URL
    pub org_service_url: Option<String>,

    /// Project holding the repositories
    pub project: Option<String>,

    /// Name of the environment variable holding the access token
    pub token_env: Option<String>,
}

impl ProviderConfig {
    /// Name of the token environment variable.
    pub fn token_env(&self) -> &str {
        self.token_env.as_deref().unwrap_or(DEFAULT_TOKEN_ENV)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(kind) = &self.kind {
            let valid = crate::forge::valid_forge_names();
            if !valid.contains(&kind.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid provider '{}', must be one of: {}",
                    kind,
                    valid.join(", ")
                )));
            }
        }

        if let Some(url) = &self.org_service_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "org_service_url '{}' must be an http(s) URL",
                    url
                )));
            }
        }

        if self.token_env.as_deref() == Some("") {
            return Err(ConfigError::InvalidValue(
                "token_env cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Resource defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceConfig {
    /// Branch used by declarations and imports that don't name one
    pub default_branch: Option<String>,

    /// Push loop timeout in seconds
    pub create_timeout_secs: Option<u64>,

    /// Read retry timeout in seconds
    pub read_timeout_secs: Option<u64>,

    /// Smallest pause between push attempts in seconds
    pub poll_interval_secs: Option<u64>,
}

impl ResourceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(branch) = &self.default_branch {
            let branch = BranchRef::new(branch.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid default_branch: {}", e))
            })?;
            if !branch.is_qualified() {
                return Err(ConfigError::InvalidValue(format!(
                    "default_branch '{}' must start with refs/heads/",
                    branch
                )));
            }
        }

        for (name, value) in [
            ("create_timeout_secs", self.create_timeout_secs),
            ("read_timeout_secs", self.read_timeout_secs),
            ("poll_interval_secs", self.poll_interval_secs),
        ] {
            if value == Some(0) {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }
}

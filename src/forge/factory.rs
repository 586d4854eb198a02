//! forge::factory
//!
//! Forge selection and creation.
//!
//! # Design
//!
//! Commands use [`create_forge`] instead of constructing a specific forge,
//! so the resource layer only ever sees `dyn Forge`.
//!
//! # Provider Detection
//!
//! The factory detects the provider from the organization URL:
//! - `https://dev.azure.com/<org>` → Azure DevOps Services
//! - `https://<org>.visualstudio.com` → Azure DevOps Services (legacy host)
//! - any other http(s) URL → Azure DevOps Server (on-premises collection)
//!
//! # Example
//!
//! ```ignore
//! use repofile::core::config::ProviderConfig;
//! use repofile::forge::create_forge;
//!
//! let provider = ProviderConfig {
//!     org_service_url: Some("https://dev.azure.com/myorg".into()),
//!     ..Default::default()
//! };
//! let forge = create_forge(&provider, "pat")?;
//! assert_eq!(forge.name(), "azuredevops");
//! ```

use tracing::debug;

use super::azure::AzureDevOpsForge;
use super::traits::{Forge, ForgeError};
use crate::core::config::ProviderConfig;

/// Supported forge providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgeProvider {
    /// Azure DevOps Services or Server
    AzureDevOps,
}

impl ForgeProvider {
    /// Get all available providers.
    pub fn all() -> &'static [ForgeProvider] {
        &[ForgeProvider::AzureDevOps]
    }

    /// Get the provider name as a string.
    ///
    /// This matches the name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            ForgeProvider::AzureDevOps => "azuredevops",
        }
    }

    /// Parse a provider from a string.
    ///
    /// # Example
    ///
    /// ```
    /// use repofile::forge::ForgeProvider;
    ///
    /// assert_eq!(ForgeProvider::parse("azuredevops"), Some(ForgeProvider::AzureDevOps));
    /// assert_eq!(ForgeProvider::parse("github"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "azuredevops" => Some(ForgeProvider::AzureDevOps),
            _ => None,
        }
    }
}

impl std::fmt::Display for ForgeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the forge provider from an organization URL.
///
/// Returns `None` for anything that is not an http(s) URL with a host.
///
/// # Example
///
/// ```
/// use repofile::forge::{detect_provider, ForgeProvider};
///
/// assert_eq!(
///     detect_provider("https://dev.azure.com/myorg"),
///     Some(ForgeProvider::AzureDevOps)
/// );
/// assert_eq!(detect_provider("git@example.com:repo.git"), None);
/// ```
pub fn detect_provider(org_service_url: &str) -> Option<ForgeProvider> {
    // Hosts other than the hosted service are on-premises servers
    url_host(org_service_url).map(|_| ForgeProvider::AzureDevOps)
}

/// Whether `host` belongs to the hosted Azure DevOps Services.
pub fn is_hosted_service(host: &str) -> bool {
    let host = host.to_lowercase();
    host == "dev.azure.com" || host.ends_with(".visualstudio.com")
}

fn url_host(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let authority = rest.split('/').next()?;
    let host = authority.rsplit('@').next()?.split(':').next()?;
    (!host.is_empty()).then_some(host)
}

/// Create a forge from provider settings and a token.
///
/// # Errors
///
/// - `ForgeError::AuthRequired` if `token` is empty
/// - `ForgeError::NotFound` if no organization URL is configured, the
///   provider is unknown, or it cannot be detected from the URL
pub fn create_forge(provider: &ProviderConfig, token: &str) -> Result<Box<dyn Forge>, ForgeError> {
    let url = provider.org_service_url.as_deref().ok_or_else(|| {
        ForgeError::NotFound(
            "no organization URL configured: set provider.org_service_url \
             or the AZDO_ORG_SERVICE_URL environment variable"
                .to_string(),
        )
    })?;

    let kind = match provider.kind.as_deref() {
        Some(name) => ForgeProvider::parse(name).ok_or_else(|| {
            ForgeError::NotFound(format!(
                "Unknown forge provider '{}'. Available providers: {}",
                name,
                available_providers_string()
            ))
        })?,
        None => detect_provider(url).ok_or_else(|| {
            ForgeError::NotFound(format!(
                "Could not detect forge provider from URL: {}. Supported forges: {}",
                url,
                available_providers_string()
            ))
        })?,
    };

    if token.is_empty() {
        return Err(ForgeError::AuthRequired);
    }

    debug!(
        provider = %kind,
        url,
        hosted = url_host(url).is_some_and(is_hosted_service),
        "creating forge"
    );

    match kind {
        ForgeProvider::AzureDevOps => Ok(Box::new(AzureDevOpsForge::new(
            url,
            provider.project.as_deref(),
            token,
        ))),
    }
}

/// Get a comma-separated string of available providers.
fn available_providers_string() -> String {
    ForgeProvider::all()
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Get list of valid forge names for configuration validation.
pub fn valid_forge_names() -> &'static [&'static str] {
    &["azuredevops"]
}

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use config::{Config, Environment, File};
use reqwest::Url;
use serde::Deserialize;

use crate::error::{HarnessError, Result};

pub const DEFAULT_HOST: &str = "http://localhost:8080";
pub const DEFAULT_REPO: &str = "oci-conformance";
pub const DEFAULT_TAG: &str = "my-tag";

/// Where and how to reach the registry under test.
///
/// Every field can be set through an `OCI_`-prefixed environment variable
/// (`OCI_HOST`, `OCI_REPO`, `OCI_AUTH`, `OCI_TAG`, `OCI_CROSSMOUNT_NAMESPACE`)
/// or an optional `oci-conformance.{toml,yaml,json}` file in the working directory.
#[derive(Debug, Clone, Deserialize)]
pub struct ConformanceConfig {
    /// Base URL of the registry, without a trailing slash
    pub host: String,
    /// Repository the scenarios push to
    pub repo: String,
    /// Basic auth credential, either base64 encoded or as `user:password`
    #[serde(default)]
    pub auth: Option<String>,
    /// Tag used for the manifest round-trip
    pub tag: String,
    /// Namespace reserved for cross-repository mount checks
    #[serde(default)]
    pub crossmount_namespace: Option<String>,
}

impl ConformanceConfig {
    /// Load the configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_environment(Environment::with_prefix("OCI"))
    }

    /// Load the configuration from an explicit environment source
    pub fn from_environment(environment: Environment) -> Result<Self> {
        let config = Config::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("repo", DEFAULT_REPO)?
            .set_default("tag", DEFAULT_TAG)?
            .add_source(File::with_name("oci-conformance").required(false))
            .add_source(environment)
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.normalized()
    }

    fn normalized(mut self) -> Result<Self> {
        self.host = self.host.trim_end_matches('/').to_string();
        Url::parse(&self.host).map_err(|e| HarnessError::InvalidUrl {
            url: self.host.clone(),
            reason: e.to_string(),
        })?;

        self.auth = self.auth.filter(|auth| !auth.is_empty());
        self.crossmount_namespace = self.crossmount_namespace.filter(|ns| !ns.is_empty());
        Ok(self)
    }

    /// Value of the `Authorization` header, if a credential is configured
    pub fn authorization(&self) -> Option<String> {
        self.auth.as_deref().map(|auth| {
            // A base64 token never contains ':'
            if auth.contains(':') {
                format!("Basic {}", STANDARD.encode(auth))
            } else {
                format!("Basic {auth}")
            }
        })
    }
}

impl Default for ConformanceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            repo: DEFAULT_REPO.to_string(),
            auth: None,
            tag: DEFAULT_TAG.to_string(),
            crossmount_namespace: None,
        }
    }
}

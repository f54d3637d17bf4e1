//! Provider configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use transcoder_common::Result;

pub const REGION_ENV: &str = "TRANSCODER_REGION";
pub const PROFILE_ENV: &str = "TRANSCODER_PROFILE";
pub const ENDPOINT_URL_ENV: &str = "TRANSCODER_ENDPOINT_URL";

/// Provider configuration
///
/// Unset values fall through to the standard AWS resolution chain
/// (environment, shared config files, instance metadata).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// AWS region hosting the pipelines and presets
    #[serde(default)]
    pub region: Option<String>,

    /// Named profile from the shared AWS config files
    #[serde(default)]
    pub profile: Option<String>,

    /// Endpoint override, for testing against a local stub
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl ProviderConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Read overrides from the environment
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            region: var(REGION_ENV),
            profile: var(PROFILE_ENV),
            endpoint_url: var(ENDPOINT_URL_ENV),
        }
    }

    /// Overlay the values set in `other` on top of this configuration
    pub fn merge(mut self, other: ProviderConfig) -> Self {
        if other.region.is_some() {
            self.region = other.region;
        }
        if other.profile.is_some() {
            self.profile = other.profile;
        }
        if other.endpoint_url.is_some() {
            self.endpoint_url = other.endpoint_url;
        }
        self
    }
}

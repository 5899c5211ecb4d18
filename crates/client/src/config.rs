//! Client configuration

use crate::error::ClientError;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable carrying the API origin, the counterpart of the
/// dashboard's public base-URL variable
pub const API_BASE_URL_ENV: &str = "KEYSTONE_API_BASE_URL";

/// Prefix for nested environment overrides, e.g. `KEYSTONE_ADMIN__LOGIN_PATH`
const ENV_PREFIX: &str = "KEYSTONE_ADMIN";

/// Admin client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin of the REST backend, e.g. `https://api.keystone.build`
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Entry point the user is sent to when the session ends
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Per-request timeout in seconds (0 disables it)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            login_path: default_login_path(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at the given API origin, everything else default
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: Some(api_base_url.into()),
            ..Self::default()
        }
    }

    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        let config_paths = [
            "keystone-admin.toml",
            "config/keystone-admin.toml",
            "/etc/keystone/keystone-admin.toml",
        ];

        for path in &config_paths {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path).required(false));
            }
        }

        builder = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("api_base_url", std::env::var(API_BASE_URL_ENV).ok())?;

        builder.build()?.try_deserialize()
    }

    /// Load configuration from a specific config file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("api_base_url", std::env::var(API_BASE_URL_ENV).ok())?;

        builder.build()?.try_deserialize()
    }

    /// Validated API origin.
    ///
    /// An unset origin is a configuration error; it is never defaulted.
    pub fn api_base_url(&self) -> Result<Url, ClientError> {
        let raw = self
            .api_base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ClientError::Configuration(format!(
                    "API base URL is not set (export {API_BASE_URL_ENV})"
                ))
            })?;

        let url = Url::parse(raw.trim_end_matches('/'))
            .map_err(|e| ClientError::Configuration(format!("invalid API base URL {raw}: {e}")))?;

        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Configuration(format!(
                "API base URL must be an http(s) origin: {raw}"
            )));
        }

        Ok(url)
    }

    /// Request timeout, if enabled
    pub const fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.request_timeout_secs))
        }
    }
}

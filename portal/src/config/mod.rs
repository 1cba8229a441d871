use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::config::ApiConfig;
use crate::lms::{ClientCredentials, LmsConfig};
use crate::utils::logger::LoggerConfig;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,

    pub lms: LmsConfig,

    pub logger: LoggerConfig,
}

const DEFAULT_ACCOUNT_ID: &str = "1";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Deployment settings read once from the environment.
///
/// Credentials never come from the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of both the authorization server and the resource API.
    pub api_base: Url,
    pub credentials: ClientCredentials,
    /// Account used when listing account courses.
    pub account_id: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let host = required("API_HOST")?;
        let port = required("API_PORT")?
            .parse::<u16>()
            .map_err(|e| ConfigError::Invalid {
                key: "API_PORT",
                reason: e.to_string(),
            })?;

        let scheme = lookup("API_SCHEME").unwrap_or_else(|| "http".to_owned());
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::Invalid {
                key: "API_SCHEME",
                reason: format!("unsupported scheme `{scheme}`"),
            });
        }

        let api_base =
            Url::parse(&format!("{scheme}://{host}:{port}/")).map_err(|e| ConfigError::Invalid {
                key: "API_HOST",
                reason: e.to_string(),
            })?;

        let credentials = ClientCredentials {
            client_id: required("API_CLIENT_ID")?,
            client_secret: required("API_CLIENT_KEY")?,
        };

        let account_id = lookup("ACCOUNT_ID")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ACCOUNT_ID.to_owned());

        Ok(Self {
            api_base,
            credentials,
            account_id,
        })
    }
}

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// TCP socket address to listen for incoming connections.
    ///
    /// Default: `0.0.0.0:8000`
    pub listen_addr: SocketAddr,

    /// Public base URL of this service, used to construct the OAuth2 redirect URI.
    ///
    /// Example: `https://portal.example.edu`
    pub base_url: String,

    pub session: SessionConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: (Ipv4Addr::UNSPECIFIED, 8000).into(),
            base_url: "http://localhost:8000".to_owned(),
            session: SessionConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Callback registered with the authorization server.
    pub fn redirect_uri(&self) -> String {
        format!("{}/grant", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,

    /// Sessions untouched for this long are dropped.
    ///
    /// Default: `30m`
    #[serde(with = "humantime_serde")]
    pub idle_ttl: Duration,

    /// Only send the session cookie over https.
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "portal_session".to_owned(),
            idle_ttl: Duration::from_secs(30 * 60),
            secure_cookie: false,
        }
    }
}

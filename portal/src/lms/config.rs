use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmsConfig {
    /// Total time allowed for a single upstream request.
    ///
    /// Default: `10s`
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Default: `5s`
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Log every upstream request/response pair at `info` level
    /// instead of `debug`.
    pub log_requests: bool,
}

impl Default for LmsConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            log_requests: false,
        }
    }
}

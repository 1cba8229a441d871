use reqwest::StatusCode;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum LmsError {
    #[error("token exchange at {url} failed with status {status}")]
    TokenExchange {
        status: StatusCode,
        body: String,
        url: Url,
    },

    #[error("request to {url} failed with status {status}")]
    Upstream {
        status: StatusCode,
        body: String,
        url: Url,
    },

    #[error("failed to send request to {url}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response body from {url}")]
    Decode {
        url: Url,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid request path `{path}`")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },

    #[error("access token is not a valid header value")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),
}

impl LmsError {
    /// Status code returned by the LMS, if the request got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::TokenExchange { status, .. } | Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body returned along with a non-2xx status.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::TokenExchange { body, .. } | Self::Upstream { body, .. } => Some(body),
            _ => None,
        }
    }

    /// URL of the request which failed.
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::TokenExchange { url, .. }
            | Self::Upstream { url, .. }
            | Self::Transport { url, .. }
            | Self::Decode { url, .. } => Some(url),
            Self::InvalidPath { .. } | Self::InvalidToken(_) => None,
        }
    }
}

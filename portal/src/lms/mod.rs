use std::time::Instant;

use anyhow::Context;
use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

pub use self::config::LmsConfig;
pub use self::error::LmsError;
pub use self::oauth::{AccessToken, ClientCredentials, LmsUser};

mod config;
mod error;
mod oauth;
mod resources;

/// A value paired with the fully resolved URL of the request that produced it.
///
/// Only meant for diagnostics.
#[derive(Debug, Clone)]
pub struct Traced<T> {
    pub value: T,
    pub url: Url,
}

/// Shared client for the LMS authorization server and resource API.
#[derive(Clone)]
pub struct LmsClient {
    http: reqwest::Client,
    api_base: Url,
    log_requests: bool,
}

impl LmsClient {
    pub fn new(api_base: Url, config: &LmsConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .context("failed to build LMS http client")?;

        Ok(Self {
            http,
            api_base,
            log_requests: config.log_requests,
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Resolves `path` against the API base and appends `query` pairs.
    pub fn resolve(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, LmsError> {
        let mut url = self
            .api_base
            .join(path)
            .map_err(|source| LmsError::InvalidPath {
                path: path.to_owned(),
                source,
            })?;

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    pub async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        headers: HeaderMap,
    ) -> Result<Traced<T>, LmsError>
    where
        T: DeserializeOwned,
    {
        let url = self.resolve(path, query)?;
        let request = self.http.get(url.clone()).headers(headers);
        self.dispatch(Method::GET, url, request).await
    }

    pub async fn post_form<T>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<Traced<T>, LmsError>
    where
        T: DeserializeOwned,
    {
        let url = self.resolve(path, &[])?;
        let request = self.http.post(url.clone()).form(form);
        self.dispatch(Method::POST, url, request).await
    }

    async fn dispatch<T>(
        &self,
        method: Method,
        url: Url,
        request: RequestBuilder,
    ) -> Result<Traced<T>, LmsError>
    where
        T: DeserializeOwned,
    {
        let started_at = Instant::now();

        let transport = |source| LmsError::Transport {
            url: url.clone(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        if self.log_requests {
            tracing::info!(%method, %url, status = status.as_u16(), elapsed_ms, body_len = body.len(), "lms request");
        } else {
            tracing::debug!(%method, %url, status = status.as_u16(), elapsed_ms, body_len = body.len(), "lms request");
        }

        if !status.is_success() {
            return Err(LmsError::Upstream { status, body, url });
        }

        match serde_json::from_str(&body) {
            Ok(value) => Ok(Traced { value, url }),
            Err(source) => Err(LmsError::Decode { url, source }),
        }
    }
}

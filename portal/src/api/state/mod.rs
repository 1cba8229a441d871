use std::sync::Arc;

use anyhow::{Context, Result};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tokio::net::TcpListener;

use crate::api::config::ApiConfig;
use crate::api::endpoint::ApiEndpoint;
use crate::api::session::SessionStore;
use crate::api::views::Views;
use crate::config::Settings;
use crate::lms::LmsClient;

pub struct ApiStateBuilder<MandatoryFields = (LmsClient, Settings)> {
    config: ApiConfig,
    mandatory_fields: MandatoryFields,
}

impl ApiStateBuilder {
    pub fn build(self) -> Result<ApiState> {
        let (lms_client, settings) = self.mandatory_fields;
        let config = self.config;

        let sessions = SessionStore::new(config.session.idle_ttl);
        let views = Views::new().context("failed to compile page templates")?;

        Ok(ApiState {
            inner: Arc::new(Inner {
                config,
                settings,
                lms_client,
                sessions,
                views,
            }),
        })
    }
}

impl<T2> ApiStateBuilder<((), T2)> {
    pub fn with_lms_client(self, lms_client: LmsClient) -> ApiStateBuilder<(LmsClient, T2)> {
        let (_, settings) = self.mandatory_fields;

        ApiStateBuilder {
            config: self.config,
            mandatory_fields: (lms_client, settings),
        }
    }
}

impl<T1> ApiStateBuilder<(T1, ())> {
    pub fn with_settings(self, settings: Settings) -> ApiStateBuilder<(T1, Settings)> {
        let (lms_client, _) = self.mandatory_fields;

        ApiStateBuilder {
            config: self.config,
            mandatory_fields: (lms_client, settings),
        }
    }
}

impl<T1, T2> ApiStateBuilder<(T1, T2)> {
    pub fn with_config(self, config: ApiConfig) -> ApiStateBuilder<(T1, T2)> {
        ApiStateBuilder { config, ..self }
    }
}

#[derive(Clone)]
#[repr(transparent)]
pub struct ApiState {
    inner: Arc<Inner>,
}

impl ApiState {
    pub fn builder() -> ApiStateBuilder<((), ())> {
        ApiStateBuilder {
            config: ApiConfig::default(),
            mandatory_fields: ((), ()),
        }
    }

    pub async fn bind_socket(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(self.config().listen_addr).await
    }

    pub async fn bind_endpoint(&self) -> Result<ApiEndpoint> {
        ApiEndpoint::builder().bind(self.clone()).await
    }

    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn lms_client(&self) -> &LmsClient {
        &self.inner.lms_client
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub fn views(&self) -> &Views {
        &self.inner.views
    }

    /// Session id carried by the request cookies, if any.
    pub fn session_id(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.inner.config.session.cookie_name)
            .map(|cookie| cookie.value().to_owned())
    }

    pub fn session_cookie(&self, session_id: String) -> Cookie<'static> {
        let config = &self.inner.config.session;

        // Lax keeps the cookie on the top-level redirect back from the LMS.
        Cookie::build((config.cookie_name.clone(), session_id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(config.secure_cookie)
            .build()
    }
}

struct Inner {
    config: ApiConfig,
    settings: Settings,
    lms_client: LmsClient,
    sessions: SessionStore,
    views: Views,
}

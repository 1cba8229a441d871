use std::time::Duration;

use anyhow::Result;
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;

use crate::api::controllers;
use crate::api::state::*;

pub struct ApiEndpointBuilder {
    healthcheck_route: Option<String>,
}

impl Default for ApiEndpointBuilder {
    fn default() -> Self {
        Self {
            healthcheck_route: Some("/healthz".to_owned()),
        }
    }
}

impl ApiEndpointBuilder {
    pub async fn bind(self, state: ApiState) -> Result<ApiEndpoint> {
        let listener = state.bind_socket().await?;
        Ok(ApiEndpoint::from_parts(listener, self.build(), state))
    }

    pub fn build<S>(self) -> axum::Router<S>
    where
        ApiState: FromRef<S>,
        S: Clone + Send + Sync + 'static,
    {
        let mut router = axum::Router::new();

        if let Some(route) = self.healthcheck_route {
            router = router.route(&route, get(health_check));
        }

        router
            .merge(auth_router())
            .merge(courses_router())
            .route("/test", get(controllers::diagnostics::show))
    }
}

pub struct ApiEndpoint {
    listener: TcpListener,
    router: axum::Router<()>,
}

impl ApiEndpoint {
    pub fn builder() -> ApiEndpointBuilder {
        ApiEndpointBuilder::default()
    }

    pub fn from_parts<S>(listener: TcpListener, router: axum::Router<S>, state: S) -> Self
    where
        S: Clone + Send + Sync + 'static,
    {
        Self {
            listener,
            router: with_middleware(router, state),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn serve(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}

/// Fully configured router without a listener.
pub fn router(state: ApiState) -> axum::Router<()> {
    with_middleware(ApiEndpoint::builder().build(), state)
}

fn with_middleware<S>(router: axum::Router<S>, state: S) -> axum::Router<()>
where
    S: Clone + Send + Sync + 'static,
{
    use tower::ServiceBuilder;
    use tower_http::timeout::TimeoutLayer;

    // Outbound LMS calls have their own, shorter timeouts.
    let service = ServiceBuilder::new()
        .layer(DefaultBodyLimit::max(MAX_REQUEST_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(25),
        ));

    #[cfg(feature = "compression")]
    let service = service.layer(tower_http::compression::CompressionLayer::new().gzip(true));

    router.layer(service).with_state(state)
}

fn auth_router<S>() -> axum::Router<S>
where
    ApiState: FromRef<S>,
    S: Clone + Send + Sync + 'static,
{
    axum::Router::new()
        .route("/", get(controllers::auth::login))
        .route("/grant", get(controllers::auth::callback))
}

fn courses_router<S>() -> axum::Router<S>
where
    ApiState: FromRef<S>,
    S: Clone + Send + Sync + 'static,
{
    axum::Router::new()
        .route("/courses", get(controllers::courses::index))
        .route("/courses/{course_id}", get(controllers::courses::show))
}

fn health_check() -> futures_util::future::Ready<impl IntoResponse> {
    futures_util::future::ready(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis().to_string())
            .unwrap_or_default(),
    )
}

const MAX_REQUEST_SIZE: usize = 2 << 17; // 256kb

use crate::api::state::ApiState;
use crate::config::{AppConfig, Settings};
use crate::lms::LmsClient;

pub mod config;
pub mod controllers;
pub mod endpoint;
pub mod models;
pub mod session;
pub mod state;
pub mod views;

pub async fn http_service(config: AppConfig, settings: Settings) -> anyhow::Result<()> {
    tracing::info!(api_base = %settings.api_base, account_id = %settings.account_id, "using LMS");

    let lms_client = LmsClient::new(settings.api_base.clone(), &config.lms)?;

    let state = ApiState::builder()
        .with_config(config.api)
        .with_settings(settings)
        .with_lms_client(lms_client)
        .build()?;

    let endpoint = state.bind_endpoint().await?;
    tracing::info!(
        listen_addr = %endpoint.local_addr()?,
        redirect_uri = %state.config().redirect_uri(),
        "API server started"
    );

    tokio::task::spawn(async move {
        if let Err(e) = endpoint.serve().await {
            tracing::error!("API server failed: {e:?}");
        }
        tracing::info!("API server stopped");
    });

    Ok(())
}

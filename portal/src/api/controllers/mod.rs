use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};

use crate::api::state::ApiState;
use crate::lms::LmsError;

pub mod auth;
pub mod courses;
pub mod diagnostics;

/// `302 Found` redirect.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_owned())]).into_response()
}

/// Maps a failed request to an error page.
///
/// LMS failures become `502 Bad Gateway` showing what was requested and what came back,
/// anything else is a plain `500`.
pub fn error_response(state: &ApiState, action: &str, e: anyhow::Error) -> Response {
    match e.downcast_ref::<LmsError>() {
        Some(lms) => {
            tracing::error!(
                url = lms.url().map(tracing::field::display),
                status = lms.status().map(|s| s.as_u16()),
                body = lms.body(),
                "{action} failed: {e:#}"
            );

            let status = match lms {
                LmsError::InvalidPath { .. } | LmsError::InvalidToken(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_GATEWAY,
            };
            state.views().upstream_error(status, lms)
        }
        None => {
            tracing::error!("{action} failed: {e:#}");
            state.views().error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("{action} failed"),
                None,
            )
        }
    }
}

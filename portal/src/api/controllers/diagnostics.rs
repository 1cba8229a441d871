use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::api::state::ApiState;
use crate::api::controllers::error_response;
use crate::api::views::DiagnosticsView;

pub async fn show(State(state): State<ApiState>, jar: CookieJar) -> Response {
    let authenticated = state
        .session_id(&jar)
        .and_then(|id| state.sessions().get(&id))
        .is_some_and(|session| session.access_token.is_some());

    let page = state.views().diagnostics(&DiagnosticsView {
        version: env!("PORTAL_VERSION"),
        api_base: state.lms_client().api_base(),
        redirect_uri: &state.config().redirect_uri(),
        authenticated,
    });

    match page {
        Ok(page) => page.into_response(),
        Err(e) => error_response(&state, "Rendering diagnostics", e.into()),
    }
}

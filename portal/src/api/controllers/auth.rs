use anyhow::Context;
use axum::extract::{FromRef, FromRequestParts, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::api::controllers::{error_response, found};
use crate::api::models::auth::OAuthCallbackQuery;
use crate::api::session::SessionData;
use crate::api::state::ApiState;
use crate::lms::{AccessToken, LmsUser};

// ── Auth extractor ─────────────────────────────────────────────────────────────

/// Session which completed the authorization flow.
///
/// Requests without one are sent back to `/` to sign in.
pub struct Authenticated {
    pub token: AccessToken,
    pub user: Option<LmsUser>,
}

impl<S> FromRequestParts<S> for Authenticated
where
    ApiState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let api_state = ApiState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        let session = api_state
            .session_id(&jar)
            .and_then(|id| api_state.sessions().get(&id));

        match session {
            Some(SessionData {
                access_token: Some(token),
                user,
                ..
            }) => Ok(Authenticated { token, user }),
            _ => {
                tracing::debug!("not authenticated, redirecting to login");
                Err(found("/"))
            }
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

pub async fn login(State(state): State<ApiState>, jar: CookieJar) -> Response {
    login_impl(&state, jar)
        .await
        .unwrap_or_else(|e| error_response(&state, "OAuth login", e))
}

pub async fn callback(
    State(state): State<ApiState>,
    jar: CookieJar,
    Query(params): Query<OAuthCallbackQuery>,
) -> Response {
    callback_impl(&state, jar, params)
        .await
        .unwrap_or_else(|e| error_response(&state, "OAuth callback", e))
}

// ── Impl ────────────────────────────────────────────────────────────────────

async fn login_impl(state: &ApiState, jar: CookieJar) -> anyhow::Result<Response> {
    let sessions = state.sessions();

    // Every login attempt starts from a fresh session.
    if let Some(previous) = state.session_id(&jar) {
        sessions.remove(&previous);
    }

    let session_id = sessions.create();
    let csrf_state = Uuid::new_v4().to_string();
    sessions
        .update(&session_id, |session| {
            session.oauth_state = Some(csrf_state.clone());
        })
        .context("session expired right after creation")?;

    let auth_url = state.lms_client().authorization_url(
        &state.settings().credentials,
        &state.config().redirect_uri(),
        &csrf_state,
    )?;

    tracing::info!("OAuth login initiated");

    let jar = jar.add(state.session_cookie(session_id));
    Ok((jar, found(auth_url.as_str())).into_response())
}

async fn callback_impl(
    state: &ApiState,
    jar: CookieJar,
    params: OAuthCallbackQuery,
) -> anyhow::Result<Response> {
    let sessions = state.sessions();

    let Some(session_id) = state.session_id(&jar) else {
        tracing::warn!("OAuth callback rejected: no session");
        return Ok(invalid_state(state));
    };

    // The pending state is single use, whatever the outcome.
    let expected = sessions
        .update(&session_id, |session| session.oauth_state.take())
        .flatten();

    match (expected, params.state.as_deref()) {
        (Some(expected), Some(actual)) if expected == actual => {}
        _ => {
            tracing::warn!("OAuth callback rejected: invalid CSRF state");
            return Ok(invalid_state(state));
        }
    }

    if let Some(error) = params.error {
        tracing::warn!(%error, description = ?params.error_description, "authorization denied");
        let message = format!("Authorization was not granted: {error}");
        return Ok(state.views().error(
            StatusCode::UNAUTHORIZED,
            &message,
            params.error_description.as_deref(),
        ));
    }

    let Some(code) = params.code.filter(|code| !code.is_empty()) else {
        tracing::warn!("OAuth callback rejected: missing code");
        return Ok(state.views().error(
            StatusCode::BAD_REQUEST,
            "Missing authorization code",
            None,
        ));
    };

    let grant = state
        .lms_client()
        .exchange_code(
            &state.settings().credentials,
            &code,
            &state.config().redirect_uri(),
        )
        .await?
        .value;

    sessions
        .update(&session_id, |session| {
            session.access_token = Some(grant.access_token.clone());
            session.user = grant.user.clone();
        })
        .context("session expired during token exchange")?;

    tracing::info!(
        user_id = grant.user.as_ref().map(|user| user.id),
        token_type = grant.token_type.as_deref(),
        expires_in = grant.expires_in,
        "user authenticated"
    );

    Ok(found("/courses"))
}

fn invalid_state(state: &ApiState) -> Response {
    state
        .views()
        .error(StatusCode::BAD_REQUEST, "Invalid state parameter", None)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use url::Url;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, ResponseTemplate};

    use crate::test_utils::TestFixture;

    #[tokio::test]
    async fn login_redirects_to_authorization_server() {
        let fixture = TestFixture::new().await;

        let response = fixture.get("/", None).await;
        response.assert_status(StatusCode::FOUND);

        let location = Url::parse(response.location().unwrap()).unwrap();
        assert_eq!(location.path(), "/login/oauth2/auth");
        assert!(location.as_str().starts_with(&fixture.lms_mock.uri()));

        let params: Vec<(String, String)> = location.query_pairs().into_owned().collect();
        let keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["client_id", "response_type", "redirect_uri", "state"]);
        assert_eq!(params[0].1, "test-client");
        assert_eq!(params[1].1, "code");
        assert_eq!(params[2].1, "http://localhost:8000/grant");
        assert!(!params[3].1.is_empty());

        assert!(response.session_cookie().is_some());
    }

    #[tokio::test]
    async fn every_login_uses_a_fresh_state() {
        let fixture = TestFixture::new().await;
        let (_, first) = fixture.login().await;
        let (_, second) = fixture.login().await;
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn callback_stores_token_and_redirects() {
        let fixture = TestFixture::new().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth2/token"))
            .and(body_string_contains("code=XYZ"))
            .and(body_string_contains("redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fgrant"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "access_token": "T1",
                    "user": { "id": 1, "name": "Jane" },
                })),
            )
            .expect(1)
            .mount(&fixture.lms_mock)
            .await;

        let (cookie, csrf_state) = fixture.login().await;
        let response = fixture
            .get(&format!("/grant?code=XYZ&state={csrf_state}"), Some(&cookie))
            .await;

        response.assert_status(StatusCode::FOUND);
        assert_eq!(response.location(), Some("/courses"));

        let session_id = cookie.split_once('=').unwrap().1;
        let session = fixture.state.sessions().get(session_id).unwrap();
        assert_eq!(session.access_token.unwrap().secret(), "T1");
        assert_eq!(session.user.unwrap().name, "Jane");
        assert!(session.oauth_state.is_none());
    }

    #[tokio::test]
    async fn callback_with_wrong_state_is_rejected() {
        let fixture = TestFixture::new().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&fixture.lms_mock)
            .await;

        let (cookie, _) = fixture.login().await;
        fixture
            .get("/grant?code=XYZ&state=forged", Some(&cookie))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // No session at all.
        fixture
            .get("/grant?code=XYZ&state=forged", None)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn state_cannot_be_replayed() {
        let fixture = TestFixture::new().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "T1"})),
            )
            .expect(1)
            .mount(&fixture.lms_mock)
            .await;

        let (cookie, csrf_state) = fixture.login().await;
        let uri = format!("/grant?code=XYZ&state={csrf_state}");

        fixture
            .get(&uri, Some(&cookie))
            .await
            .assert_status(StatusCode::FOUND);
        fixture
            .get(&uri, Some(&cookie))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn denied_authorization_is_reported() {
        let fixture = TestFixture::new().await;
        let (cookie, csrf_state) = fixture.login().await;

        let response = fixture
            .get(
                &format!("/grant?error=access_denied&error_description=user+said+no&state={csrf_state}"),
                Some(&cookie),
            )
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.body.contains("access_denied"));
        assert!(response.body.contains("user said no"));
    }

    #[tokio::test]
    async fn failed_exchange_surfaces_bad_gateway() {
        let fixture = TestFixture::new().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": "invalid_client"})),
            )
            .mount(&fixture.lms_mock)
            .await;

        let (cookie, csrf_state) = fixture.login().await;
        let response = fixture
            .get(&format!("/grant?code=XYZ&state={csrf_state}"), Some(&cookie))
            .await;

        response.assert_status(StatusCode::BAD_GATEWAY);
        assert!(response.body.contains("/login/oauth2/token"));
        assert!(response.body.contains("invalid_client"));

        let session_id = cookie.split_once('=').unwrap().1;
        assert!(fixture.state.sessions().get(session_id).unwrap().access_token.is_none());
    }
}

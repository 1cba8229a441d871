use axum::Router;
use axum::body::Body;
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use url::Url;
use wiremock::MockServer;

use crate::api::config::ApiConfig;
use crate::api::endpoint;
use crate::api::state::ApiState;
use crate::config::Settings;
use crate::lms::{ClientCredentials, LmsClient, LmsConfig};

/// Application router wired to a mocked LMS.
pub struct TestFixture {
    pub app: Router,
    pub state: ApiState,
    pub lms_mock: MockServer,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_lms_config(LmsConfig::default()).await
    }

    pub async fn with_lms_config(lms_config: LmsConfig) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("portal=debug")
            .with_test_writer()
            .try_init();

        let lms_mock = MockServer::start().await;
        let api_base = Url::parse(&format!("{}/", lms_mock.uri())).unwrap();

        let settings = Settings {
            api_base: api_base.clone(),
            credentials: ClientCredentials {
                client_id: "test-client".to_owned(),
                client_secret: "test-secret".to_owned(),
            },
            account_id: "1".to_owned(),
        };

        let lms_client = LmsClient::new(api_base, &lms_config).unwrap();
        let state = ApiState::builder()
            .with_config(ApiConfig::default())
            .with_settings(settings)
            .with_lms_client(lms_client)
            .build()
            .unwrap();

        Self {
            app: endpoint::router(state.clone()),
            state,
            lms_mock,
        }
    }

    /// Sends `GET uri`, optionally with a `name=value` cookie.
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut request = Request::get(uri);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = self
            .app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// Starts a login, returning the session cookie and the pending CSRF state.
    pub async fn login(&self) -> (String, String) {
        let response = self.get("/", None).await;
        response.assert_status(StatusCode::FOUND);
        (
            response.session_cookie().unwrap(),
            response.csrf_state().unwrap(),
        )
    }

    /// Runs the whole flow against whatever token endpoint mock is mounted.
    pub async fn authenticate(&self) -> String {
        let (cookie, csrf_state) = self.login().await;
        self.get(&format!("/grant?code=XYZ&state={csrf_state}"), Some(&cookie))
            .await
            .assert_status(StatusCode::FOUND);
        cookie
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(self.status, expected, "unexpected status, body: {}", self.body);
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION)?.to_str().ok()
    }

    /// Session cookie as a `name=value` pair.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|pair| pair.starts_with("portal_session="))
            .map(str::to_owned)
    }

    /// `state` parameter of an authorization redirect.
    pub fn csrf_state(&self) -> Option<String> {
        let location = Url::parse(self.location()?).ok()?;
        location
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
    }
}

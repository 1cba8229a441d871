use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::lms::{AccessToken, LmsClient, LmsError, Traced};

impl LmsClient {
    /// Authenticated `GET {api_base}{path}`. The JSON body is returned as is.
    pub async fn fetch_authenticated(
        &self,
        path: &str,
        query: &[(&str, &str)],
        token: &AccessToken,
    ) -> Result<Traced<Value>, LmsError> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.secret()))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);

        self.get_json(path, query, headers).await
    }

    /// Published courses of an account.
    pub async fn account_courses(
        &self,
        account_id: &str,
        token: &AccessToken,
    ) -> Result<Traced<Value>, LmsError> {
        let path = format!("/api/v1/accounts/{account_id}/courses");
        self.fetch_authenticated(&path, &[("published", "true")], token)
            .await
    }

    /// A single course including its syllabus.
    pub async fn course_with_syllabus(
        &self,
        course_id: u64,
        token: &AccessToken,
    ) -> Result<Traced<Value>, LmsError> {
        let path = format!("/api/v1/courses/{course_id}");
        self.fetch_authenticated(&path, &[("include[]", "syllabus_body")], token)
            .await
    }

    /// Courses of the user the token belongs to.
    pub async fn my_courses(&self, token: &AccessToken) -> Result<Traced<Value>, LmsError> {
        self.fetch_authenticated(
            "/api/v1/courses",
            &[("include", "syllabus_body,course_progress")],
            token,
        )
        .await
    }
}

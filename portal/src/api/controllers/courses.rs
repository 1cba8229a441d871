use anyhow::Context;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use crate::api::controllers::auth::Authenticated;
use crate::api::controllers::error_response;
use crate::api::models::courses::Course;
use crate::api::state::ApiState;
use crate::api::views::CoursesView;
use crate::lms::Traced;

pub async fn index(State(state): State<ApiState>, auth: Authenticated) -> Response {
    index_impl(&state, auth)
        .await
        .unwrap_or_else(|e| error_response(&state, "Fetching courses", e))
}

pub async fn show(
    State(state): State<ApiState>,
    auth: Authenticated,
    Path(course_id): Path<u64>,
) -> Response {
    show_impl(&state, auth, course_id)
        .await
        .unwrap_or_else(|e| error_response(&state, "Fetching course", e))
}

// ── Impl ────────────────────────────────────────────────────────────────────

async fn index_impl(state: &ApiState, auth: Authenticated) -> anyhow::Result<Response> {
    let lms = state.lms_client();
    let account_id = &state.settings().account_id;

    let account_courses = lms.account_courses(account_id, &auth.token).await?;
    let account_courses: Traced<Vec<Course>> = decode(account_courses)?;

    let my_courses = lms.my_courses(&auth.token).await?;
    let my_courses: Traced<Vec<Course>> = decode(my_courses)?;

    tracing::debug!(
        account_courses = account_courses.value.len(),
        my_courses = my_courses.value.len(),
        "courses fetched"
    );

    let page = state.views().courses(&CoursesView {
        user: auth.user.as_ref(),
        account_id,
        account_courses: &account_courses,
        my_courses: &my_courses,
    })?;

    Ok(page.into_response())
}

async fn show_impl(
    state: &ApiState,
    auth: Authenticated,
    course_id: u64,
) -> anyhow::Result<Response> {
    let course = state
        .lms_client()
        .course_with_syllabus(course_id, &auth.token)
        .await?;
    let course: Traced<Course> = decode(course)?;

    Ok(state.views().course(&course)?.into_response())
}

fn decode<T>(raw: Traced<serde_json::Value>) -> anyhow::Result<Traced<T>>
where
    T: serde::de::DeserializeOwned,
{
    let Traced { value, url } = raw;
    let value = serde_json::from_value(value)
        .with_context(|| format!("unexpected response shape from {url}"))?;
    Ok(Traced { value, url })
}

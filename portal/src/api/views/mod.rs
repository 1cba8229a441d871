//! HTML pages rendered from the handlebars templates in `portal/templates`.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;
use url::Url;

use crate::api::models::courses::Course;
use crate::lms::{LmsError, LmsUser, Traced};

const PARTIALS: [(&str, &str); 2] = [
    ("layout", include_str!("../../../templates/layout.hbs")),
    ("course_table", include_str!("../../../templates/course_table.hbs")),
];

const PAGES: [(&str, &str); 4] = [
    ("courses", include_str!("../../../templates/courses.hbs")),
    ("course", include_str!("../../../templates/course.hbs")),
    ("diagnostics", include_str!("../../../templates/diagnostics.hbs")),
    ("error", include_str!("../../../templates/error.hbs")),
];

pub struct CoursesView<'a> {
    pub user: Option<&'a LmsUser>,
    pub account_id: &'a str,
    pub account_courses: &'a Traced<Vec<Course>>,
    pub my_courses: &'a Traced<Vec<Course>>,
}

pub struct DiagnosticsView<'a> {
    pub version: &'a str,
    pub api_base: &'a Url,
    pub redirect_uri: &'a str,
    pub authenticated: bool,
}

/// Compiled page templates. Interpolated values are HTML-escaped by the registry.
pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);

        for (name, source) in PARTIALS {
            registry.register_partial(name, source)?;
        }
        for (name, source) in PAGES {
            registry.register_template_string(name, source)?;
        }

        Ok(Self { registry })
    }

    pub fn courses(&self, view: &CoursesView<'_>) -> Result<Html<String>, RenderError> {
        self.render("courses", &CoursesPage {
            title: "Courses",
            user_name: view.user.map(|user| user.name.as_str()),
            account_id: view.account_id,
            account_courses: CourseTable::new(view.account_courses, false),
            my_courses: CourseTable::new(view.my_courses, true),
        })
    }

    pub fn course(&self, course: &Traced<Course>) -> Result<Html<String>, RenderError> {
        let c = &course.value;

        self.render("course", &CoursePage {
            title: c.name.as_deref().unwrap_or("Untitled course"),
            url: course.url.as_str(),
            id: c.id,
            code: c.course_code.as_deref().unwrap_or("-"),
            state: c.workflow_state.as_deref().unwrap_or("-"),
            syllabus: c
                .syllabus_body
                .as_deref()
                .filter(|syllabus| !syllabus.trim().is_empty()),
        })
    }

    pub fn diagnostics(&self, view: &DiagnosticsView<'_>) -> Result<Html<String>, RenderError> {
        self.render("diagnostics", &DiagnosticsPage {
            title: "Diagnostics",
            version: view.version,
            api_base: view.api_base.as_str(),
            redirect_uri: view.redirect_uri,
            authenticated: view.authenticated,
        })
    }

    /// Generic error page. `detail` is shown preformatted.
    ///
    /// Falls back to a plain-text body if the page itself cannot be rendered.
    pub fn error(&self, status: StatusCode, message: &str, detail: Option<&str>) -> Response {
        let page = ErrorPage {
            title: status.canonical_reason().unwrap_or("Error"),
            message,
            detail,
        };

        match self.render("error", &page) {
            Ok(html) => (status, html).into_response(),
            Err(e) => {
                tracing::error!("failed to render error page: {e}");
                (status, message.to_owned()).into_response()
            }
        }
    }

    /// Error page for a failed LMS call, showing the attempted URL and upstream body.
    pub fn upstream_error(&self, status: StatusCode, error: &LmsError) -> Response {
        let mut lines = Vec::new();
        if let Some(url) = error.url() {
            lines.push(format!("Request: {url}"));
        }
        if let Some(upstream) = error.status() {
            lines.push(format!("Status: {upstream}"));
        }
        if let Some(body) = error.body() {
            lines.push(String::new());
            lines.push(body.to_owned());
        }

        self.error(status, &error.to_string(), Some(&lines.join("\n")))
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<Html<String>, RenderError> {
        self.registry.render(name, data).map(Html)
    }
}

#[derive(Serialize)]
struct CoursesPage<'a> {
    title: &'a str,
    user_name: Option<&'a str>,
    account_id: &'a str,
    account_courses: CourseTable<'a>,
    my_courses: CourseTable<'a>,
}

#[derive(Serialize)]
struct CourseTable<'a> {
    url: &'a str,
    with_progress: bool,
    rows: Vec<CourseRow<'a>>,
}

impl<'a> CourseTable<'a> {
    fn new(courses: &'a Traced<Vec<Course>>, with_progress: bool) -> Self {
        let rows = courses
            .value
            .iter()
            .map(|c| CourseRow {
                id: c.id,
                name: c.name.as_deref().unwrap_or("-"),
                code: c.course_code.as_deref().unwrap_or("-"),
                state: c.workflow_state.as_deref().unwrap_or("-"),
                progress: c
                    .course_progress
                    .as_ref()
                    .and_then(|p| p.summary())
                    .unwrap_or_else(|| "-".to_owned()),
            })
            .collect();

        Self {
            url: courses.url.as_str(),
            with_progress,
            rows,
        }
    }
}

#[derive(Serialize)]
struct CourseRow<'a> {
    id: u64,
    name: &'a str,
    code: &'a str,
    state: &'a str,
    progress: String,
}

#[derive(Serialize)]
struct CoursePage<'a> {
    title: &'a str,
    url: &'a str,
    id: u64,
    code: &'a str,
    state: &'a str,
    syllabus: Option<&'a str>,
}

#[derive(Serialize)]
struct DiagnosticsPage<'a> {
    title: &'a str,
    version: &'a str,
    api_base: &'a str,
    redirect_uri: &'a str,
    authenticated: bool,
}

#[derive(Serialize)]
struct ErrorPage<'a> {
    title: &'a str,
    message: &'a str,
    detail: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    fn traced<T>(value: T, url: &str) -> Traced<T> {
        Traced {
            value,
            url: Url::parse(url).unwrap(),
        }
    }

    fn course(id: u64, name: &str) -> Course {
        serde_json::from_value(serde_json::json!({ "id": id, "name": name })).unwrap()
    }

    #[test]
    fn templates_compile() {
        Views::new().unwrap();
    }

    #[test]
    fn courses_page_lists_courses_and_request_urls() {
        let views = Views::new().unwrap();
        let account = traced(
            vec![course(1, "Biology <101>")],
            "http://lms.local/api/v1/accounts/1/courses?published=true",
        );
        let mine = traced(Vec::new(), "http://lms.local/api/v1/courses");
        let user = LmsUser {
            id: 9,
            name: "Jane & <Joe>".to_owned(),
        };

        let Html(html) = views
            .courses(&CoursesView {
                user: Some(&user),
                account_id: "1",
                account_courses: &account,
                my_courses: &mine,
            })
            .unwrap();

        assert!(html.contains("<title>Courses</title>"));
        assert!(html.contains("Signed in as <b>Jane &amp; &lt;Joe&gt;</b>"));
        assert!(html.contains("Biology &lt;101&gt;"));
        assert!(!html.contains("<101>"));
        assert!(html.contains("href=\"/courses/1\""));
        assert!(html.contains("GET http://lms.local/api/v1/accounts/1/courses?published"));
        assert!(html.contains("No courses."));
        // An empty table renders no header row.
        assert_eq!(html.matches("<th>Progress</th>").count(), 0);
    }

    #[test]
    fn anonymous_courses_page_has_no_greeting() {
        let views = Views::new().unwrap();
        let mut with_progress = course(3, "Physics");
        with_progress.course_progress = serde_json::from_value(serde_json::json!({
            "requirement_count": 4,
            "requirement_completed_count": 1,
        }))
        .unwrap();
        let account = traced(Vec::new(), "http://lms.local/api/v1/accounts/1/courses");
        let mine = traced(vec![with_progress], "http://lms.local/api/v1/courses");

        let Html(html) = views
            .courses(&CoursesView {
                user: None,
                account_id: "1",
                account_courses: &account,
                my_courses: &mine,
            })
            .unwrap();

        assert!(!html.contains("Signed in as"));
        assert!(html.contains("<th>Progress</th>"));
        assert!(html.contains("<td>1/4 requirements</td>"));
    }

    #[test]
    fn course_page_escapes_syllabus() {
        let views = Views::new().unwrap();
        let mut c = course(2, "Chemistry");
        c.syllabus_body = Some("<script>alert(1)</script>".to_owned());

        let Html(html) = views
            .course(&traced(c, "http://lms.local/api/v1/courses/2"))
            .unwrap();
        assert!(html.contains("<title>Chemistry</title>"));
        assert!(html.contains("<pre class=\"syllabus\">&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Back to courses"));
    }

    #[test]
    fn blank_syllabus_is_reported_missing() {
        let views = Views::new().unwrap();
        let mut c = course(2, "Chemistry");
        c.syllabus_body = Some("   ".to_owned());

        let Html(html) = views
            .course(&traced(c, "http://lms.local/api/v1/courses/2"))
            .unwrap();
        assert!(html.contains("No syllabus."));
        assert!(!html.contains("class=\"syllabus\""));
    }

    #[tokio::test]
    async fn error_page_escapes_detail() {
        let views = Views::new().unwrap();

        let response = views.error(StatusCode::BAD_GATEWAY, "boom", Some("<b>upstream</b>"));
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("<title>Bad Gateway</title>"));
        assert!(html.contains("<p>boom</p>"));
        assert!(html.contains("<pre>&lt;b&gt;upstream&lt;/b&gt;</pre>"));
        assert!(html.contains("Start over"));
    }
}

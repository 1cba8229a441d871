use serde::Deserialize;

/// Subset of the LMS course entity shown by the views.
#[derive(Debug, Clone, Deserialize)]
pub struct Course {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub workflow_state: Option<String>,
    #[serde(default)]
    pub syllabus_body: Option<String>,
    #[serde(default)]
    pub course_progress: Option<CourseProgress>,
}

/// Only filled in for courses with completion requirements.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseProgress {
    #[serde(default)]
    pub requirement_count: Option<u64>,
    #[serde(default)]
    pub requirement_completed_count: Option<u64>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl CourseProgress {
    pub fn summary(&self) -> Option<String> {
        let total = self.requirement_count?;
        let done = self.requirement_completed_count.unwrap_or_default();
        Some(match &self.completed_at {
            Some(at) => format!("{done}/{total} requirements, completed {at}"),
            None => format!("{done}/{total} requirements"),
        })
    }
}

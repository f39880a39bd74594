use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    #[default]
    Active,
    Completed,
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(default)]
    pub id: String,
    pub student_id: String,
    pub course_id: String,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub enrolled_at: String,
}

impl Record for Enrollment {
    const TABLE: &'static str = "enrollments";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Enrollment {
    /// Idempotency key: one enrollment per student per course.
    pub fn key(student_id: &str, course_id: &str) -> String {
        format!("enrollment:{}:{}", student_id, course_id)
    }
}

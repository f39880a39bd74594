use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(default)]
    pub id: String,
    pub course_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<String>,
    pub max_points: f64,
}

impl Record for Assignment {
    const TABLE: &'static str = "assignments";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub id: String,
    pub assignment_id: String,
    pub student_id: String,
    pub course_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub submitted_at: String,
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub graded_at: Option<String>,
}

impl Record for Submission {
    const TABLE: &'static str = "assignment_submissions";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Submission {
    pub fn key(student_id: &str, assignment_id: &str) -> String {
        format!("submission:{}:{}", student_id, assignment_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignmentForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: Option<String>,
    pub max_points: f64,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionForm {
    pub content: Option<String>,
    pub file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GradeForm {
    pub grade: f64,
    pub feedback: Option<String>,
}

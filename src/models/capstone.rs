use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapstoneProject {
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

impl Record for CapstoneProject {
    const TABLE: &'static str = "capstone_projects";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapstoneSubmission {
    #[serde(default)]
    pub id: String,
    pub project_id: String,
    pub student_id: String,
    #[serde(default)]
    pub repository_url: Option<String>,
    #[serde(default)]
    pub demo_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub submitted_at: String,
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl Record for CapstoneSubmission {
    const TABLE: &'static str = "capstone_submissions";

    fn id(&self) -> &str {
        &self.id
    }
}

impl CapstoneSubmission {
    pub fn key(student_id: &str, project_id: &str) -> String {
        format!("capstone:{}:{}", student_id, project_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct CapstoneForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: Option<String>,
    pub max_points: f64,
}

#[derive(Debug, Deserialize)]
pub struct CapstoneSubmissionForm {
    pub repository_url: Option<String>,
    pub demo_url: Option<String>,
    pub notes: Option<String>,
}

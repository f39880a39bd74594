use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonProgress {
    #[serde(default)]
    pub id: String,
    pub student_id: String,
    pub lesson_id: String,
    pub course_id: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

impl Record for LessonProgress {
    const TABLE: &'static str = "lesson_progress";

    fn id(&self) -> &str {
        &self.id
    }
}

impl LessonProgress {
    pub fn key(student_id: &str, lesson_id: &str) -> String {
        format!("progress:{}:{}", student_id, lesson_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseProgress {
    pub course_id: String,
    pub completed_lessons: usize,
    pub total_lessons: usize,
    pub percent: f64,
}

use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(default)]
    pub id: String,
    pub lesson_id: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default)]
    pub position: i64,
}

fn default_points() -> u32 {
    1
}

impl Record for QuizQuestion {
    const TABLE: &'static str = "quiz_questions";

    fn id(&self) -> &str {
        &self.id
    }
}

/// What a student sees: the question without its answer.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub points: u32,
}

impl From<&QuizQuestion> for PublicQuestion {
    fn from(q: &QuizQuestion) -> Self {
        PublicQuestion {
            id: q.id.clone(),
            question: q.question.clone(),
            options: q.options.clone(),
            points: q.points,
        }
    }
}

/// One graded submission. Resubmitting creates another attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    #[serde(default)]
    pub id: String,
    pub lesson_id: String,
    pub course_id: String,
    pub student_id: String,
    /// JSON object `{question_id: answer}`, stored as text.
    #[serde(default)]
    pub answers: String,
    pub score: u32,
    pub total_points: u32,
    pub percentage: f64,
    pub passed: bool,
    #[serde(default)]
    pub submitted_at: String,
}

impl Record for QuizAttempt {
    const TABLE: &'static str = "quiz_attempts";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
pub struct QuizQuestionForm {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub points: Option<u32>,
    pub position: Option<i64>,
}

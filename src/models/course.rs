use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub teacher_id: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

impl Record for Course {
    const TABLE: &'static str = "courses";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default)]
    pub id: String,
    pub course_id: String,
    pub title: String,
    #[serde(default)]
    pub position: i64,
}

impl Record for Chapter {
    const TABLE: &'static str = "chapters";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonKind {
    #[default]
    Reading,
    Video,
    Quiz,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(default)]
    pub id: String,
    pub chapter_id: String,
    pub course_id: String,
    pub title: String,
    #[serde(default, rename = "lesson_type")]
    pub kind: LessonKind,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub position: i64,
}

impl Record for Lesson {
    const TABLE: &'static str = "lessons";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
pub struct CourseForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChapterForm {
    pub title: String,
    pub position: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LessonForm {
    pub title: String,
    #[serde(default, rename = "lesson_type")]
    pub kind: LessonKind,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub position: Option<i64>,
}

/// A chapter with its lessons, both ordered by position.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterOutline {
    #[serde(flatten)]
    pub chapter: Chapter,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseOutline {
    #[serde(flatten)]
    pub course: Course,
    pub chapters: Vec<ChapterOutline>,
}

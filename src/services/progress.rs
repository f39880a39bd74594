use serde_json::{json, Map, Value};

use crate::adapter::{Adapter, Query};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::grading;
use crate::models::course::Lesson;
use crate::models::now_rfc3339;
use crate::models::profile::Profile;
use crate::models::progress::{CourseProgress, LessonProgress};
use crate::models::Record;

use super::courses::lessons_of;
use super::enrollment::is_enrolled;

/// Mark a lesson complete for the caller. Idempotent per student and
/// lesson; a later call only overwrites the score when one is given.
pub fn complete_lesson(
    adapter: &Adapter,
    caller: &Profile,
    lesson_id: &str,
    score: Option<f64>,
    cancel: &CancelToken,
) -> Result<LessonProgress> {
    let lesson = adapter
        .get::<Lesson>(lesson_id, cancel)?
        .ok_or_else(|| Error::NotFound(format!("lesson {}", lesson_id)))?;
    if !is_enrolled(adapter, &caller.id, &lesson.course_id, cancel)? {
        return Err(Error::Forbidden(format!("not enrolled in course {}", lesson.course_id)));
    }
    record_completion(adapter, &caller.id, &lesson, score, cancel)
}

pub(crate) fn record_completion(
    adapter: &Adapter,
    student_id: &str,
    lesson: &Lesson,
    score: Option<f64>,
    cancel: &CancelToken,
) -> Result<LessonProgress> {
    let mut data = Map::new();
    data.insert("student_id".into(), Value::String(student_id.to_string()));
    data.insert("lesson_id".into(), Value::String(lesson.id.clone()));
    data.insert("course_id".into(), Value::String(lesson.course_id.clone()));
    data.insert("completed".into(), Value::Bool(true));
    data.insert("completed_at".into(), Value::String(now_rfc3339()));
    if let Some(s) = score {
        data.insert("score".into(), json!(s));
    }
    let key = LessonProgress::key(student_id, &lesson.id);
    adapter.upsert_keyed(LessonProgress::TABLE, &key, &data, cancel)?.decode()
}

pub fn course_progress(
    adapter: &Adapter,
    student_id: &str,
    course_id: &str,
    cancel: &CancelToken,
) -> Result<CourseProgress> {
    let lessons = lessons_of(adapter, course_id, cancel)?;
    let done: Vec<LessonProgress> = adapter.fetch_all(
        &Query::from("lesson_progress")
            .eq("student_id", student_id)
            .eq("course_id", course_id)
            .eq("completed", true),
        cancel,
    )?;
    // Progress rows for lessons that were since removed do not count.
    let completed = lessons
        .iter()
        .filter(|l| done.iter().any(|p| p.lesson_id == l.id))
        .count();
    Ok(CourseProgress {
        course_id: course_id.to_string(),
        completed_lessons: completed,
        total_lessons: lessons.len(),
        percent: grading::course_progress(completed, lessons.len()),
    })
}

pub fn lesson_progress(
    adapter: &Adapter,
    student_id: &str,
    course_id: &str,
    cancel: &CancelToken,
) -> Result<Vec<LessonProgress>> {
    adapter.fetch_all(
        &Query::from("lesson_progress")
            .eq("student_id", student_id)
            .eq("course_id", course_id),
        cancel,
    )
}

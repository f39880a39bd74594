use serde_json::{Map, Value};

use crate::adapter::{Adapter, Direction, Query};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::models::course::{
    Chapter, ChapterForm, ChapterOutline, Course, CourseForm, CourseOutline, Lesson, LessonForm,
};
use crate::models::profile::Profile;

use super::{managed_course, require_text, visible_course};

pub fn list_published(adapter: &Adapter, cancel: &CancelToken) -> Result<Vec<Course>> {
    adapter.fetch_all(
        &Query::from("courses").eq("is_published", true).order("title"),
        cancel,
    )
}

/// Courses taught by `teacher_id`, drafts included.
pub fn list_taught(adapter: &Adapter, teacher_id: &str, cancel: &CancelToken) -> Result<Vec<Course>> {
    adapter.fetch_all(
        &Query::from("courses").eq("teacher_id", teacher_id).order("title"),
        cancel,
    )
}

pub fn create(adapter: &Adapter, caller: &Profile, form: &CourseForm, cancel: &CancelToken) -> Result<Course> {
    if !caller.is_teacher_or_above() {
        return Err(Error::Forbidden("only teachers can create courses".into()));
    }
    let course = Course {
        id: String::new(),
        title: require_text("title", &form.title)?,
        description: form.description.trim().to_string(),
        teacher_id: caller.id.clone(),
        category: form.category.clone(),
        thumbnail_url: form.thumbnail_url.clone(),
        is_published: false,
    };
    let created = adapter.insert_record(&course, cancel)?;
    log::info!("[courses] {} created course {}", caller.id, created.id);
    Ok(created)
}

pub fn set_published(
    adapter: &Adapter,
    caller: &Profile,
    course_id: &str,
    published: bool,
    cancel: &CancelToken,
) -> Result<Course> {
    managed_course(adapter, caller, course_id, cancel)?;
    let mut patch = Map::new();
    patch.insert("is_published".into(), Value::Bool(published));
    adapter
        .update(&Query::from("courses").eq("id", course_id), &patch, cancel)?
        .ok_or_else(|| Error::NotFound(format!("course {}", course_id)))?
        .decode()
}

pub fn add_chapter(
    adapter: &Adapter,
    caller: &Profile,
    course_id: &str,
    form: &ChapterForm,
    cancel: &CancelToken,
) -> Result<Chapter> {
    managed_course(adapter, caller, course_id, cancel)?;
    let position = match form.position {
        Some(p) => p,
        None => next_position(adapter, Query::from("chapters").eq("course_id", course_id), cancel)?,
    };
    adapter.insert_record(
        &Chapter {
            id: String::new(),
            course_id: course_id.to_string(),
            title: require_text("title", &form.title)?,
            position,
        },
        cancel,
    )
}

pub fn add_lesson(
    adapter: &Adapter,
    caller: &Profile,
    chapter_id: &str,
    form: &LessonForm,
    cancel: &CancelToken,
) -> Result<Lesson> {
    let chapter = adapter
        .get::<Chapter>(chapter_id, cancel)?
        .ok_or_else(|| Error::NotFound(format!("chapter {}", chapter_id)))?;
    managed_course(adapter, caller, &chapter.course_id, cancel)?;
    let position = match form.position {
        Some(p) => p,
        None => next_position(adapter, Query::from("lessons").eq("chapter_id", chapter_id), cancel)?,
    };
    adapter.insert_record(
        &Lesson {
            id: String::new(),
            chapter_id: chapter.id.clone(),
            course_id: chapter.course_id.clone(),
            title: require_text("title", &form.title)?,
            kind: form.kind,
            content: form.content.clone(),
            video_url: form.video_url.clone(),
            position,
        },
        cancel,
    )
}

/// One past the highest existing position.
fn next_position(adapter: &Adapter, siblings: Query, cancel: &CancelToken) -> Result<i64> {
    let last = adapter
        .select(&siblings.order_by("position", Direction::Desc).maybe_single(), cancel)?
        .into_first();
    Ok(last
        .and_then(|d| d.data.get("position").and_then(|p| p.as_i64()))
        .map(|p| p + 1)
        .unwrap_or(0))
}

pub fn lessons_of(adapter: &Adapter, course_id: &str, cancel: &CancelToken) -> Result<Vec<Lesson>> {
    adapter.fetch_all(&Query::from("lessons").eq("course_id", course_id), cancel)
}

/// Course with its chapters and their lessons, each ordered by position.
pub fn outline(adapter: &Adapter, caller: &Profile, course_id: &str, cancel: &CancelToken) -> Result<CourseOutline> {
    let course = visible_course(adapter, caller, course_id, cancel)?;
    let chapters: Vec<Chapter> = adapter.fetch_all(
        &Query::from("chapters").eq("course_id", course_id).order("position"),
        cancel,
    )?;
    let lessons: Vec<Lesson> = adapter.fetch_all(
        &Query::from("lessons").eq("course_id", course_id).order("position"),
        cancel,
    )?;
    let chapters = chapters
        .into_iter()
        .map(|chapter| {
            let lessons = lessons
                .iter()
                .filter(|l| l.chapter_id == chapter.id)
                .cloned()
                .collect();
            ChapterOutline { chapter, lessons }
        })
        .collect();
    Ok(CourseOutline { course, chapters })
}

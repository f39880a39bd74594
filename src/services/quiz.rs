use std::collections::HashMap;

use serde::Serialize;

use crate::adapter::{Adapter, Direction, Query};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::grading::{self, QuizResult};
use crate::models::course::{Lesson, LessonKind};
use crate::models::now_rfc3339;
use crate::models::profile::Profile;
use crate::models::progress::LessonProgress;
use crate::models::quiz::{PublicQuestion, QuizAttempt, QuizQuestion, QuizQuestionForm};

use super::enrollment::is_enrolled;
use super::progress::record_completion;
use super::{managed_course, require_text, visible_course};

#[derive(Debug, Clone, Serialize)]
pub struct QuizOutcome {
    pub attempt: QuizAttempt,
    #[serde(flatten)]
    pub result: QuizResult,
    /// Set when the attempt passed and the lesson was marked complete.
    pub progress: Option<LessonProgress>,
}

fn quiz_lesson(adapter: &Adapter, lesson_id: &str, cancel: &CancelToken) -> Result<Lesson> {
    let lesson = adapter
        .get::<Lesson>(lesson_id, cancel)?
        .ok_or_else(|| Error::NotFound(format!("lesson {}", lesson_id)))?;
    if lesson.kind != LessonKind::Quiz {
        return Err(Error::Validation(format!("lesson {} is not a quiz", lesson_id)));
    }
    Ok(lesson)
}

fn questions_of(adapter: &Adapter, lesson_id: &str, cancel: &CancelToken) -> Result<Vec<QuizQuestion>> {
    adapter.fetch_all(
        &Query::from("quiz_questions").eq("lesson_id", lesson_id).order("position"),
        cancel,
    )
}

/// Questions as a student sees them, answers stripped. Draft courses stay
/// hidden from callers who cannot manage them.
pub fn questions(
    adapter: &Adapter,
    caller: &Profile,
    lesson_id: &str,
    cancel: &CancelToken,
) -> Result<Vec<PublicQuestion>> {
    let lesson = quiz_lesson(adapter, lesson_id, cancel)?;
    visible_course(adapter, caller, &lesson.course_id, cancel)?;
    Ok(questions_of(adapter, lesson_id, cancel)?
        .iter()
        .map(PublicQuestion::from)
        .collect())
}

pub fn add_question(
    adapter: &Adapter,
    caller: &Profile,
    lesson_id: &str,
    form: &QuizQuestionForm,
    cancel: &CancelToken,
) -> Result<QuizQuestion> {
    let lesson = quiz_lesson(adapter, lesson_id, cancel)?;
    managed_course(adapter, caller, &lesson.course_id, cancel)?;
    let correct = require_text("correct_answer", &form.correct_answer)?;
    let options: Vec<String> = form.options.iter().map(|o| o.trim().to_string()).collect();
    if !options.is_empty() && !options.contains(&correct) {
        return Err(Error::Validation("correct_answer must be one of the options".into()));
    }
    adapter.insert_record(
        &QuizQuestion {
            id: String::new(),
            lesson_id: lesson.id,
            question: require_text("question", &form.question)?,
            options,
            correct_answer: correct,
            points: form.points.unwrap_or(1),
            position: form.position.unwrap_or(0),
        },
        cancel,
    )
}

/// Grade and record an attempt, then mark the lesson complete if it passed.
///
/// The two writes are not atomic: if the second fails the attempt stays
/// recorded without progress, and resubmitting records another attempt.
pub fn submit(
    adapter: &Adapter,
    caller: &Profile,
    lesson_id: &str,
    answers: &HashMap<String, String>,
    cancel: &CancelToken,
) -> Result<QuizOutcome> {
    let lesson = quiz_lesson(adapter, lesson_id, cancel)?;
    if !is_enrolled(adapter, &caller.id, &lesson.course_id, cancel)? {
        return Err(Error::Forbidden(format!("not enrolled in course {}", lesson.course_id)));
    }
    let questions = questions_of(adapter, lesson_id, cancel)?;
    if questions.is_empty() {
        return Err(Error::Validation("quiz has no questions".into()));
    }
    let result = grading::grade_quiz(&questions, answers);

    let attempt = adapter.insert_record(
        &QuizAttempt {
            id: String::new(),
            lesson_id: lesson.id.clone(),
            course_id: lesson.course_id.clone(),
            student_id: caller.id.clone(),
            answers: serde_json::to_string(answers)?,
            score: result.score,
            total_points: result.total_points,
            percentage: result.percentage,
            passed: result.passed,
            submitted_at: now_rfc3339(),
        },
        cancel,
    )?;
    log::info!(
        "[quiz] {} scored {}/{} on {}",
        caller.id,
        result.score,
        result.total_points,
        lesson_id
    );

    let progress = if result.passed {
        Some(record_completion(adapter, &caller.id, &lesson, Some(result.percentage), cancel)?)
    } else {
        None
    };
    Ok(QuizOutcome {
        attempt,
        result,
        progress,
    })
}

/// A student's attempts on one lesson, newest first.
pub fn attempts(adapter: &Adapter, student_id: &str, lesson_id: &str, cancel: &CancelToken) -> Result<Vec<QuizAttempt>> {
    adapter.fetch_all(
        &Query::from("quiz_attempts")
            .eq("student_id", student_id)
            .eq("lesson_id", lesson_id)
            .order_by("submitted_at", Direction::Desc),
        cancel,
    )
}

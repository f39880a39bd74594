use serde_json::{json, Map, Value};

use crate::adapter::{Adapter, Direction, Query};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::models::assignment::{Assignment, AssignmentForm, GradeForm, Submission, SubmissionForm};
use crate::models::now_rfc3339;
use crate::models::profile::Profile;
use crate::models::Record;
use crate::store::to_fields;

use super::enrollment::is_enrolled;
use super::{managed_course, require_points, require_text};

pub fn list(adapter: &Adapter, course_id: &str, cancel: &CancelToken) -> Result<Vec<Assignment>> {
    adapter.fetch_all(
        &Query::from("assignments").eq("course_id", course_id).order("due_date"),
        cancel,
    )
}

pub fn create(
    adapter: &Adapter,
    caller: &Profile,
    course_id: &str,
    form: &AssignmentForm,
    cancel: &CancelToken,
) -> Result<Assignment> {
    managed_course(adapter, caller, course_id, cancel)?;
    adapter.insert_record(
        &Assignment {
            id: String::new(),
            course_id: course_id.to_string(),
            title: require_text("title", &form.title)?,
            description: form.description.trim().to_string(),
            due_date: form.due_date.clone(),
            max_points: require_points("max_points", form.max_points)?,
        },
        cancel,
    )
}

fn load(adapter: &Adapter, assignment_id: &str, cancel: &CancelToken) -> Result<Assignment> {
    adapter
        .get::<Assignment>(assignment_id, cancel)?
        .ok_or_else(|| Error::NotFound(format!("assignment {}", assignment_id)))
}

/// Submit (or resubmit) work. One submission per student per assignment;
/// resubmitting replaces the content and clears any earlier grade.
pub fn submit(
    adapter: &Adapter,
    caller: &Profile,
    assignment_id: &str,
    form: &SubmissionForm,
    cancel: &CancelToken,
) -> Result<Submission> {
    let assignment = load(adapter, assignment_id, cancel)?;
    if !is_enrolled(adapter, &caller.id, &assignment.course_id, cancel)? {
        return Err(Error::Forbidden(format!("not enrolled in course {}", assignment.course_id)));
    }
    let content = form.content.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let file_path = form.file_path.as_deref().map(str::trim).filter(|p| !p.is_empty());
    if content.is_none() && file_path.is_none() {
        return Err(Error::Validation("a submission needs content or a file".into()));
    }
    let submission = Submission {
        id: String::new(),
        assignment_id: assignment.id.clone(),
        student_id: caller.id.clone(),
        course_id: assignment.course_id.clone(),
        content: content.map(str::to_string),
        file_path: file_path.map(str::to_string),
        submitted_at: now_rfc3339(),
        grade: None,
        feedback: None,
        graded_at: None,
    };
    let mut data = to_fields(&submission)?;
    // Explicit nulls so a resubmission clears the previous grade.
    for key in ["grade", "feedback", "graded_at"] {
        data.insert(key.into(), Value::Null);
    }
    let key = Submission::key(&caller.id, &assignment.id);
    let doc = adapter.upsert_keyed(Submission::TABLE, &key, &data, cancel)?;
    log::info!("[assignments] {} submitted {}", caller.id, assignment.id);
    doc.decode()
}

pub fn grade(
    adapter: &Adapter,
    caller: &Profile,
    submission_id: &str,
    form: &GradeForm,
    cancel: &CancelToken,
) -> Result<Submission> {
    let submission = adapter
        .get::<Submission>(submission_id, cancel)?
        .ok_or_else(|| Error::NotFound(format!("submission {}", submission_id)))?;
    let assignment = load(adapter, &submission.assignment_id, cancel)?;
    managed_course(adapter, caller, &assignment.course_id, cancel)?;
    if !form.grade.is_finite() || form.grade < 0.0 || form.grade > assignment.max_points {
        return Err(Error::Validation(format!(
            "grade must be between 0 and {}",
            assignment.max_points
        )));
    }
    let mut patch = Map::new();
    patch.insert("grade".into(), json!(form.grade));
    patch.insert("graded_at".into(), Value::String(now_rfc3339()));
    if let Some(feedback) = &form.feedback {
        patch.insert("feedback".into(), Value::String(feedback.trim().to_string()));
    }
    cancel.check()?;
    adapter
        .store()
        .update_document(adapter.collection_id(Submission::TABLE), &submission.id, &patch)?
        .decode()
}

/// All submissions for an assignment, newest first. Managers only.
pub fn submissions(
    adapter: &Adapter,
    caller: &Profile,
    assignment_id: &str,
    cancel: &CancelToken,
) -> Result<Vec<Submission>> {
    let assignment = load(adapter, assignment_id, cancel)?;
    managed_course(adapter, caller, &assignment.course_id, cancel)?;
    adapter.fetch_all(
        &Query::from("assignment_submissions")
            .eq("assignment_id", assignment_id)
            .order_by("submitted_at", Direction::Desc),
        cancel,
    )
}

pub fn submissions_of_student(
    adapter: &Adapter,
    student_id: &str,
    course_id: &str,
    cancel: &CancelToken,
) -> Result<Vec<Submission>> {
    adapter.fetch_all(
        &Query::from("assignment_submissions")
            .eq("student_id", student_id)
            .eq("course_id", course_id),
        cancel,
    )
}

use serde_json::{json, Map, Value};

use crate::adapter::{Adapter, Direction, Query};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::models::assignment::GradeForm;
use crate::models::capstone::{CapstoneForm, CapstoneProject, CapstoneSubmission, CapstoneSubmissionForm};
use crate::models::now_rfc3339;
use crate::models::profile::Profile;
use crate::models::Record;
use crate::store::to_fields;

use super::enrollment::is_enrolled;
use super::{managed_course, require_points, require_text};

pub fn list(adapter: &Adapter, course_id: &str, cancel: &CancelToken) -> Result<Vec<CapstoneProject>> {
    adapter.fetch_all(
        &Query::from("capstone_projects").eq("course_id", course_id).order("title"),
        cancel,
    )
}

pub fn create(
    adapter: &Adapter,
    caller: &Profile,
    course_id: &str,
    form: &CapstoneForm,
    cancel: &CancelToken,
) -> Result<CapstoneProject> {
    managed_course(adapter, caller, course_id, cancel)?;
    adapter.insert_record(
        &CapstoneProject {
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

fn load(adapter: &Adapter, project_id: &str, cancel: &CancelToken) -> Result<CapstoneProject> {
    adapter
        .get::<CapstoneProject>(project_id, cancel)?
        .ok_or_else(|| Error::NotFound(format!("capstone project {}", project_id)))
}

pub fn submit(
    adapter: &Adapter,
    caller: &Profile,
    project_id: &str,
    form: &CapstoneSubmissionForm,
    cancel: &CancelToken,
) -> Result<CapstoneSubmission> {
    let project = load(adapter, project_id, cancel)?;
    if !is_enrolled(adapter, &caller.id, &project.course_id, cancel)? {
        return Err(Error::Forbidden(format!("not enrolled in course {}", project.course_id)));
    }
    let clean = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let submission = CapstoneSubmission {
        id: String::new(),
        project_id: project.id.clone(),
        student_id: caller.id.clone(),
        repository_url: clean(&form.repository_url),
        demo_url: clean(&form.demo_url),
        notes: clean(&form.notes),
        submitted_at: now_rfc3339(),
        grade: None,
        feedback: None,
    };
    if submission.repository_url.is_none() && submission.demo_url.is_none() {
        return Err(Error::Validation("a capstone submission needs a repository or demo URL".into()));
    }
    let mut data = to_fields(&submission)?;
    data.insert("grade".into(), Value::Null);
    data.insert("feedback".into(), Value::Null);
    let key = CapstoneSubmission::key(&caller.id, &project.id);
    adapter
        .upsert_keyed(CapstoneSubmission::TABLE, &key, &data, cancel)?
        .decode()
}

pub fn grade(
    adapter: &Adapter,
    caller: &Profile,
    submission_id: &str,
    form: &GradeForm,
    cancel: &CancelToken,
) -> Result<CapstoneSubmission> {
    let submission = adapter
        .get::<CapstoneSubmission>(submission_id, cancel)?
        .ok_or_else(|| Error::NotFound(format!("capstone submission {}", submission_id)))?;
    let project = load(adapter, &submission.project_id, cancel)?;
    managed_course(adapter, caller, &project.course_id, cancel)?;
    if !form.grade.is_finite() || form.grade < 0.0 || form.grade > project.max_points {
        return Err(Error::Validation(format!("grade must be between 0 and {}", project.max_points)));
    }
    let mut patch = Map::new();
    patch.insert("grade".into(), json!(form.grade));
    if let Some(feedback) = &form.feedback {
        patch.insert("feedback".into(), Value::String(feedback.trim().to_string()));
    }
    cancel.check()?;
    adapter
        .store()
        .update_document(adapter.collection_id(CapstoneSubmission::TABLE), &submission.id, &patch)?
        .decode()
}

pub fn submissions(
    adapter: &Adapter,
    caller: &Profile,
    project_id: &str,
    cancel: &CancelToken,
) -> Result<Vec<CapstoneSubmission>> {
    let project = load(adapter, project_id, cancel)?;
    managed_course(adapter, caller, &project.course_id, cancel)?;
    adapter.fetch_all(
        &Query::from("capstone_submissions")
            .eq("project_id", project_id)
            .order_by("submitted_at", Direction::Desc),
        cancel,
    )
}

use serde::Serialize;
use serde_json::{Map, Value};

use crate::adapter::{Adapter, Query};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::models::course::Course;
use crate::models::enrollment::{Enrollment, EnrollmentStatus};
use crate::models::now_rfc3339;
use crate::models::profile::Profile;
use crate::models::Record;
use crate::store::to_fields;

use super::{managed_course, visible_course};

#[derive(Debug, Clone, Serialize)]
pub struct EnrolledCourse {
    pub enrollment: Enrollment,
    pub course: Option<Course>,
}

/// Enroll the caller. Enrolling twice returns the existing enrollment; a
/// dropped enrollment is reactivated.
pub fn enroll(adapter: &Adapter, caller: &Profile, course_id: &str, cancel: &CancelToken) -> Result<Enrollment> {
    let course = visible_course(adapter, caller, course_id, cancel)?;
    if !course.is_published {
        return Err(Error::Validation("course is not published".into()));
    }
    let key = Enrollment::key(&caller.id, course_id);
    let id = crate::adapter::mutation::idempotency_id(&key);
    if let Some(existing) = adapter.get::<Enrollment>(&id, cancel)? {
        if existing.status != EnrollmentStatus::Dropped {
            return Ok(existing);
        }
    }
    let enrollment = Enrollment {
        id: String::new(),
        student_id: caller.id.clone(),
        course_id: course_id.to_string(),
        status: EnrollmentStatus::Active,
        enrolled_at: now_rfc3339(),
    };
    let doc = adapter.upsert_keyed(Enrollment::TABLE, &key, &to_fields(&enrollment)?, cancel)?;
    log::info!("[enrollment] {} enrolled in {}", caller.id, course_id);
    doc.decode()
}

pub fn drop_course(adapter: &Adapter, caller: &Profile, course_id: &str, cancel: &CancelToken) -> Result<Enrollment> {
    let mut patch = Map::new();
    patch.insert("status".into(), Value::String("dropped".into()));
    adapter
        .update(
            &Query::from("enrollments")
                .eq("student_id", caller.id.as_str())
                .eq("course_id", course_id),
            &patch,
            cancel,
        )?
        .ok_or_else(|| Error::NotFound(format!("enrollment in {}", course_id)))?
        .decode()
}

/// The caller's non-dropped enrollments with their courses.
pub fn my_courses(adapter: &Adapter, student_id: &str, cancel: &CancelToken) -> Result<Vec<EnrolledCourse>> {
    let enrollments: Vec<Enrollment> = adapter.fetch_all(
        &Query::from("enrollments")
            .eq("student_id", student_id)
            .neq("status", "dropped")
            .order("enrolled_at"),
        cancel,
    )?;
    if enrollments.is_empty() {
        return Ok(Vec::new());
    }
    let courses: Vec<Course> = adapter.fetch_all(
        &Query::from("courses").in_("id", enrollments.iter().map(|e| e.course_id.clone())),
        cancel,
    )?;
    Ok(enrollments
        .into_iter()
        .map(|enrollment| {
            let course = courses.iter().find(|c| c.id == enrollment.course_id).cloned();
            EnrolledCourse { enrollment, course }
        })
        .collect())
}

pub fn is_enrolled(adapter: &Adapter, student_id: &str, course_id: &str, cancel: &CancelToken) -> Result<bool> {
    let found = adapter
        .select(
            &Query::from("enrollments")
                .eq("student_id", student_id)
                .eq("course_id", course_id)
                .neq("status", "dropped")
                .maybe_single(),
            cancel,
        )?
        .into_first();
    Ok(found.is_some())
}

/// Students actively enrolled in a managed course.
pub fn students(adapter: &Adapter, caller: &Profile, course_id: &str, cancel: &CancelToken) -> Result<Vec<Profile>> {
    managed_course(adapter, caller, course_id, cancel)?;
    let enrollments: Vec<Enrollment> = adapter.fetch_all(
        &Query::from("enrollments")
            .eq("course_id", course_id)
            .neq("status", "dropped"),
        cancel,
    )?;
    if enrollments.is_empty() {
        return Ok(Vec::new());
    }
    adapter.fetch_all(
        &Query::from("profiles")
            .in_("id", enrollments.iter().map(|e| e.student_id.clone()))
            .order("full_name"),
        cancel,
    )
}

//! Domain flows behind the HTTP routes. Every function takes the adapter
//! and the request's cancel token; authorization decisions are made here,
//! not in the routes.

use crate::adapter::Adapter;
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::models::course::Course;
use crate::models::profile::Profile;

pub mod activity;
pub mod announcements;
pub mod assignments;
pub mod capstone;
pub mod courses;
pub mod enrollment;
pub mod grades;
pub mod progress;
pub mod quiz;
pub mod schedules;
pub mod session;

/// Trimmed, non-empty text or a validation error naming the field.
pub(crate) fn require_text(field: &str, value: &str) -> Result<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(v.to_string())
}

pub(crate) fn require_points(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::Validation(format!("{} must be a positive number", field)));
    }
    Ok(value)
}

pub(crate) fn load_course(adapter: &Adapter, course_id: &str, cancel: &CancelToken) -> Result<Course> {
    adapter
        .get::<Course>(course_id, cancel)?
        .ok_or_else(|| Error::NotFound(format!("course {}", course_id)))
}

/// The course, if `caller` teaches it or is an admin.
pub(crate) fn managed_course(
    adapter: &Adapter,
    caller: &Profile,
    course_id: &str,
    cancel: &CancelToken,
) -> Result<Course> {
    let course = load_course(adapter, course_id, cancel)?;
    if !caller.can_manage(&course.teacher_id) {
        return Err(Error::Forbidden(format!("you do not manage course {}", course_id)));
    }
    Ok(course)
}

/// Published courses are visible to everyone; drafts only to their managers.
pub(crate) fn visible_course(
    adapter: &Adapter,
    caller: &Profile,
    course_id: &str,
    cancel: &CancelToken,
) -> Result<Course> {
    let course = load_course(adapter, course_id, cancel)?;
    if !course.is_published && !caller.can_manage(&course.teacher_id) {
        return Err(Error::NotFound(format!("course {}", course_id)));
    }
    Ok(course)
}

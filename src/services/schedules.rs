use chrono::DateTime;

use crate::adapter::{Adapter, Query};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::models::profile::Profile;
use crate::models::schedule::{Schedule, ScheduleForm};

use super::{managed_course, require_text};

/// Earliest first.
pub fn list(adapter: &Adapter, course_id: &str, cancel: &CancelToken) -> Result<Vec<Schedule>> {
    adapter.fetch_all(
        &Query::from("schedules").eq("course_id", course_id).order("starts_at"),
        cancel,
    )
}

/// Sessions of a course that have not ended yet.
pub fn upcoming(adapter: &Adapter, course_id: &str, now: &str, cancel: &CancelToken) -> Result<Vec<Schedule>> {
    adapter.fetch_all(
        &Query::from("schedules")
            .eq("course_id", course_id)
            .gte("ends_at", now)
            .order("starts_at"),
        cancel,
    )
}

pub fn create(
    adapter: &Adapter,
    caller: &Profile,
    course_id: &str,
    form: &ScheduleForm,
    cancel: &CancelToken,
) -> Result<Schedule> {
    managed_course(adapter, caller, course_id, cancel)?;
    let starts = DateTime::parse_from_rfc3339(form.starts_at.trim())
        .map_err(|e| Error::Validation(format!("starts_at: {}", e)))?;
    let ends = DateTime::parse_from_rfc3339(form.ends_at.trim())
        .map_err(|e| Error::Validation(format!("ends_at: {}", e)))?;
    if ends <= starts {
        return Err(Error::Validation("ends_at must be after starts_at".into()));
    }
    adapter.insert_record(
        &Schedule {
            id: String::new(),
            course_id: course_id.to_string(),
            title: require_text("title", &form.title)?,
            starts_at: form.starts_at.trim().to_string(),
            ends_at: form.ends_at.trim().to_string(),
            location: form.location.clone(),
        },
        cancel,
    )
}

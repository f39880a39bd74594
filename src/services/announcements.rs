use crate::adapter::{Adapter, Direction, Query};
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::models::announcement::{Announcement, AnnouncementForm};
use crate::models::now_rfc3339;
use crate::models::profile::Profile;

use super::{managed_course, require_text};

/// Newest first.
pub fn list(adapter: &Adapter, course_id: &str, cancel: &CancelToken) -> Result<Vec<Announcement>> {
    adapter.fetch_all(
        &Query::from("announcements")
            .eq("course_id", course_id)
            .order_by("published_at", Direction::Desc),
        cancel,
    )
}

pub fn create(
    adapter: &Adapter,
    caller: &Profile,
    course_id: &str,
    form: &AnnouncementForm,
    cancel: &CancelToken,
) -> Result<Announcement> {
    managed_course(adapter, caller, course_id, cancel)?;
    adapter.insert_record(
        &Announcement {
            id: String::new(),
            course_id: course_id.to_string(),
            author_id: caller.id.clone(),
            title: require_text("title", &form.title)?,
            body: form.body.trim().to_string(),
            published_at: now_rfc3339(),
        },
        cancel,
    )
}

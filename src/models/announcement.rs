use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(default)]
    pub id: String,
    pub course_id: String,
    pub author_id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub published_at: String,
}

impl Record for Announcement {
    const TABLE: &'static str = "announcements";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementForm {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub starts_at: String,
    pub ends_at: String,
    #[serde(default)]
    pub location: Option<String>,
}

impl Record for Schedule {
    const TABLE: &'static str = "schedules";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleForm {
    pub title: String,
    pub starts_at: String,
    pub ends_at: String,
    pub location: Option<String>,
}

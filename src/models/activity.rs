use serde::{Deserialize, Serialize};

use super::Record;

/// Last-seen heartbeat, one document per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserActivity {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub last_seen_at: String,
    #[serde(default)]
    pub path: Option<String>,
}

impl Record for UserActivity {
    const TABLE: &'static str = "user_activity";

    fn id(&self) -> &str {
        &self.id
    }
}

impl UserActivity {
    pub fn key(user_id: &str) -> String {
        format!("activity:{}", user_id)
    }
}

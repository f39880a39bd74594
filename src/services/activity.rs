use serde_json::{Map, Value};

use crate::adapter::{Adapter, Query};
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::models::activity::UserActivity;
use crate::models::now_rfc3339;

/// Record that `user_id` is active. One activity document per user; the
/// profile's `last_active_at` follows it.
pub fn heartbeat(adapter: &Adapter, user_id: &str, path: Option<&str>, cancel: &CancelToken) -> Result<UserActivity> {
    let now = now_rfc3339();
    let mut data = Map::new();
    data.insert("user_id".into(), Value::String(user_id.to_string()));
    data.insert("last_seen_at".into(), Value::String(now.clone()));
    if let Some(p) = path {
        data.insert("path".into(), Value::String(p.to_string()));
    }
    let doc = adapter.upsert_keyed("user_activity", &UserActivity::key(user_id), &data, cancel)?;

    let mut touch = Map::new();
    touch.insert("last_active_at".into(), Value::String(now));
    adapter.update(&Query::from("profiles").eq("id", user_id), &touch, cancel)?;

    doc.decode()
}

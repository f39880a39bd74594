use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod activity;
pub mod announcement;
pub mod assignment;
pub mod capstone;
pub mod course;
pub mod enrollment;
pub mod profile;
pub mod progress;
pub mod quiz;
pub mod schedule;

/// A typed document bound to its logical table.
pub trait Record: Serialize + DeserializeOwned {
    const TABLE: &'static str;

    /// Document id; empty for records not yet stored.
    fn id(&self) -> &str;
}

/// Current time in the format the backend stores datetimes in.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

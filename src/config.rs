use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_ENDPOINT: &str = "https://cloud.appwrite.io/v1";
pub const DEFAULT_DATABASE_ID: &str = "campusdesk";
pub const DEFAULT_BUCKET_ID: &str = "course_files";
const DEFAULT_CONFIG_FILE: &str = "campusdesk.toml";

/// Logical table name (as used by services) → Appwrite collection id.
const DEFAULT_COLLECTIONS: &[(&str, &str)] = &[
    ("profiles", "profiles"),
    ("courses", "courses"),
    ("chapters", "chapters"),
    ("lessons", "lessons"),
    ("enrollments", "enrollments"),
    ("assignments", "assignments"),
    ("assignment_submissions", "submissions"),
    ("schedules", "schedules"),
    ("announcements", "announcements"),
    ("quiz_questions", "quiz_questions"),
    ("quiz_attempts", "quiz_attempts"),
    ("lesson_progress", "lesson_progress"),
    ("capstone_projects", "capstone_projects"),
    ("capstone_submissions", "capstone_submissions"),
    ("user_activity", "user_activity"),
];

// ── Collection map ─────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CollectionMap {
    ids: HashMap<String, String>,
}

impl CollectionMap {
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut ids: HashMap<String, String> = DEFAULT_COLLECTIONS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (k, v) in overrides {
            ids.insert(k.clone(), v.clone());
        }
        CollectionMap { ids }
    }

    /// Resolve a logical table name. Names absent from the map are used
    /// verbatim as the collection id.
    pub fn resolve<'a>(&'a self, table: &'a str) -> &'a str {
        self.ids.get(table).map(|s| s.as_str()).unwrap_or(table)
    }

    /// All mapped (logical, collection id) pairs, sorted by logical name.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut v: Vec<(&str, &str)> = self
            .ids
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        v.sort();
        v
    }
}

impl Default for CollectionMap {
    fn default() -> Self {
        Self::with_overrides(&HashMap::new())
    }
}

// ── campusdesk.toml ────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    appwrite: AppwriteSection,
    server: ServerSection,
    collections: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AppwriteSection {
    endpoint: Option<String>,
    project_id: Option<String>,
    database_id: Option<String>,
    bucket_id: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerSection {
    request_timeout_secs: Option<u64>,
    request_deadline_secs: Option<u64>,
    signed_url_ttl_secs: Option<u64>,
    provision_delay_ms: Option<u64>,
}

// ── Resolved configuration ─────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub bucket_id: String,
    pub api_key: String,
    /// Per-HTTP-call client timeout.
    pub request_timeout: Duration,
    /// Budget for all remote calls made on behalf of one API request.
    pub request_deadline: Duration,
    pub signed_url_ttl: Duration,
    /// Pause between provisioning calls (Appwrite rate limits schema writes).
    pub provision_delay: Duration,
    pub collections: CollectionMap,
}

impl Config {
    /// Load `campusdesk.toml` (or the file named by `CAMPUSDESK_CONFIG`)
    /// and apply environment overrides.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var("CAMPUSDESK_CONFIG").ok();
        let path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
        let text = if Path::new(&path).exists() {
            std::fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("cannot read {}: {}", path, e)))?
        } else if explicit.is_some() {
            return Err(Error::Config(format!("config file {} does not exist", path)));
        } else {
            String::new()
        };
        let cfg = Self::from_sources(&text, |k| std::env::var(k).ok())?;
        log::info!("[config] loaded (endpoint {}, database {})", cfg.endpoint, cfg.database_id);
        Ok(cfg)
    }

    /// Build from TOML text plus an environment lookup. Environment wins
    /// over the file; the plain `APPWRITE_*` names win over the `VITE_*` ones.
    pub fn from_sources<F>(toml_text: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = toml::from_str(toml_text)
            .map_err(|e| Error::Config(format!("invalid campusdesk.toml: {}", e)))?;

        let lookup = |name: &str| -> Option<String> {
            [format!("APPWRITE_{}", name), format!("VITE_APPWRITE_{}", name)]
                .iter()
                .filter_map(|k| env(k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };
        let secs = |name: &str, file_val: Option<u64>, default: u64| -> Result<u64> {
            match env(name) {
                Some(v) => v
                    .trim()
                    .parse()
                    .map_err(|_| Error::Config(format!("{} must be a whole number, got '{}'", name, v))),
                None => Ok(file_val.unwrap_or(default)),
            }
        };

        let cfg = Config {
            endpoint: lookup("ENDPOINT")
                .or(file.appwrite.endpoint)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
            project_id: lookup("PROJECT_ID").or(file.appwrite.project_id).unwrap_or_default(),
            database_id: lookup("DATABASE_ID")
                .or(file.appwrite.database_id)
                .unwrap_or_else(|| DEFAULT_DATABASE_ID.to_string()),
            bucket_id: lookup("BUCKET_ID")
                .or(file.appwrite.bucket_id)
                .unwrap_or_else(|| DEFAULT_BUCKET_ID.to_string()),
            api_key: lookup("API_KEY").or(file.appwrite.api_key).unwrap_or_default(),
            request_timeout: Duration::from_secs(secs(
                "CAMPUSDESK_REQUEST_TIMEOUT_SECS",
                file.server.request_timeout_secs,
                30,
            )?),
            request_deadline: Duration::from_secs(secs(
                "CAMPUSDESK_REQUEST_DEADLINE_SECS",
                file.server.request_deadline_secs,
                60,
            )?),
            signed_url_ttl: Duration::from_secs(secs(
                "CAMPUSDESK_SIGNED_URL_TTL_SECS",
                file.server.signed_url_ttl_secs,
                3600,
            )?),
            provision_delay: Duration::from_millis(secs(
                "CAMPUSDESK_PROVISION_DELAY_MS",
                file.server.provision_delay_ms,
                400,
            )?),
            collections: CollectionMap::with_overrides(&file.collections),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.endpoint)
            .map_err(|e| Error::Config(format!("endpoint '{}' is not a URL: {}", self.endpoint, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::Config(format!("endpoint '{}' must be http(s)", self.endpoint)));
        }
        if self.project_id.is_empty() {
            return Err(Error::Config("APPWRITE_PROJECT_ID is not set".into()));
        }
        if self.api_key.is_empty() {
            return Err(Error::Config("APPWRITE_API_KEY is not set".into()));
        }
        if self.request_deadline.is_zero() {
            return Err(Error::Config("request deadline must be positive".into()));
        }
        Ok(())
    }
}

use serde::Serialize;
use std::sync::OnceLock;
use std::time::Instant;

use crate::routes::AppState;

/// Boot instant, set once at startup via `init_uptime()`.
static BOOT_INSTANT: OnceLock<Instant> = OnceLock::new();

pub fn init_uptime() {
    let _ = BOOT_INSTANT.set(Instant::now());
}

fn uptime_secs() -> u64 {
    BOOT_INSTANT.get().map(|b| b.elapsed().as_secs()).unwrap_or(0)
}

// ── Data Structures ─────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub backend: BackendInfo,
}

#[derive(Debug, Serialize)]
pub struct BackendInfo {
    pub kind: String,
    pub endpoint: String,
    pub database_id: String,
    pub bucket_id: String,
    pub reachable: bool,
    pub error: Option<String>,
    pub collections: usize,
}

pub fn report(state: &AppState) -> HealthReport {
    let store = state.adapter.store();
    let ping = store.ping();
    let reachable = ping.is_ok();
    HealthReport {
        status: if reachable { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: uptime_secs(),
        backend: BackendInfo {
            kind: store.backend_name().to_string(),
            endpoint: state.config.endpoint.clone(),
            database_id: state.config.database_id.clone(),
            bucket_id: state.config.bucket_id.clone(),
            reachable,
            error: ping.err().map(|e| e.to_string()),
            collections: state.config.collections.entries().len(),
        },
    }
}

use log::{error, info, warn};
use std::collections::HashMap;

use crate::config::Config;
use crate::store::DocumentStore;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BootReport {
    pub warnings: u32,
    pub errors: u32,
}

impl BootReport {
    pub fn passed(&self) -> bool {
        self.errors == 0
    }
}

/// Run all boot checks. Call this before Rocket launches; the caller
/// aborts when the report has errors.
pub fn run(cfg: &Config, store: &dyn DocumentStore) -> BootReport {
    info!("campusdesk boot check starting...");

    let mut report = BootReport::default();

    // ── 1. Endpoint scheme ─────────────────────────────
    if cfg.endpoint.starts_with("http://") {
        warn!("  Backend endpoint {} is not HTTPS", cfg.endpoint);
        report.warnings += 1;
    }

    // ── 2. Collection map ──────────────────────────────
    let mut owners: HashMap<&str, Vec<&str>> = HashMap::new();
    for (table, collection) in cfg.collections.entries() {
        owners.entry(collection).or_default().push(table);
    }
    for (collection, tables) in owners {
        if tables.len() > 1 {
            error!("  Collection {} is mapped from several tables: {}", collection, tables.join(", "));
            report.errors += 1;
        }
    }

    // ── 3. Timeouts ────────────────────────────────────
    if cfg.request_timeout > cfg.request_deadline {
        warn!(
            "  Request timeout ({}s) exceeds the request deadline ({}s)",
            cfg.request_timeout.as_secs(),
            cfg.request_deadline.as_secs()
        );
        report.warnings += 1;
    }

    // ── 4. Backend reachable ───────────────────────────
    match store.ping() {
        Ok(()) => info!("  {} database {} reachable", store.backend_name(), cfg.database_id),
        Err(e) if e.is_not_found() => {
            warn!("  Database {} does not exist yet (run `campusdesk provision`)", cfg.database_id);
            report.warnings += 1;
        }
        Err(e @ (crate::error::Error::Unauthorized(_) | crate::error::Error::Forbidden(_))) => {
            error!("  Backend rejected the API key: {}", e);
            report.errors += 1;
        }
        Err(e) => {
            warn!("  Backend not reachable: {}", e);
            report.warnings += 1;
        }
    }

    // ── Summary ─────────────────────────────────────────
    if report.errors > 0 {
        error!(
            "Boot check FAILED: {} error(s), {} warning(s).",
            report.errors, report.warnings
        );
    } else if report.warnings > 0 {
        warn!(
            "Boot check passed with {} warning(s). Some features may not work correctly.",
            report.warnings
        );
    } else {
        info!("Boot check passed. All systems go.");
    }
    report
}

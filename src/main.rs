#[macro_use]
extern crate rocket;

use std::process;
use std::sync::Arc;

use rocket::{Build, Rocket};

mod account;
mod adapter;
mod appwrite;
mod boot;
mod cancel;
mod config;
mod error;
mod files;
mod grading;
mod health;
mod models;
mod provision;
mod routes;
mod security;
mod services;
mod store;

#[cfg(test)]
mod tests;

use account::AppwriteAccounts;
use adapter::Adapter;
use appwrite::AppwriteClient;
use config::Config;
use files::AppwriteFiles;
use provision::Provisioner;
use routes::AppState;
use store::appwrite::AppwriteStore;

const USAGE: &str = "usage: campusdesk [serve | provision]";

/// Mount the API on a state whose handles were built by the caller.
pub fn build_rocket(state: AppState) -> Rocket<Build> {
    rocket::build()
        .manage(state)
        .mount("/api", routes::routes())
        .register("/", routes::catchers())
}

fn main() {
    env_logger::init();

    let cfg = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    };
    let client = match AppwriteClient::new(&cfg) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    };
    let store = Arc::new(AppwriteStore::new(client.clone(), &cfg.database_id));

    let command = std::env::args().nth(1);
    match command.as_deref() {
        None | Some("serve") => {}
        Some("provision") => {
            let report = Provisioner::new(store.as_ref(), &cfg.collections, cfg.provision_delay)
                .run(&cfg.database_id, &provision::schema());
            process::exit(report.exit_code());
        }
        Some(other) => {
            eprintln!("unknown command '{}'\n{}", other, USAGE);
            process::exit(2);
        }
    }

    health::init_uptime();
    if !boot::run(&cfg, store.as_ref()).passed() {
        process::exit(1);
    }

    let state = AppState {
        adapter: Adapter::new(store, cfg.collections.clone()),
        accounts: Arc::new(AppwriteAccounts::new(client.clone())),
        files: Arc::new(AppwriteFiles::new(client, &cfg.bucket_id)),
        config: Arc::new(cfg),
    };

    if let Err(e) = rocket::execute(build_rocket(state).launch()) {
        log::error!("server stopped: {}", e);
        process::exit(1);
    }
}

use std::sync::Arc;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{Request, Route};
use serde::Serialize;

use crate::account::AccountBackend;
use crate::adapter::{Adapter, Envelope};
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::files::FileStore;

pub mod courses;
pub mod coursework;
pub mod files;
pub mod session;

/// Handles shared by every route, built once in `main` and managed by
/// Rocket. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub adapter: Adapter,
    pub accounts: Arc<dyn AccountBackend>,
    pub files: Arc<dyn FileStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Fresh token bounded by the configured per-request deadline.
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken::with_timeout(self.config.request_deadline)
    }
}

pub type ApiResponse<T> = (Status, Json<Envelope<T>>);

/// Fold a service result into the `{ data, error }` envelope and its status.
pub fn respond<T: Serialize>(result: Result<T>) -> ApiResponse<T> {
    match result {
        Ok(v) => (Status::Ok, Json(Envelope::ok(v))),
        Err(e) => {
            let status = Status::from_code(e.code()).unwrap_or(Status::InternalServerError);
            if status.code >= 500 {
                log::error!("[api] {}", e);
            } else {
                log::debug!("[api] {}", e);
            }
            (status, Json(Envelope::err(&e)))
        }
    }
}

/// Run store work on the blocking pool; the HTTP client underneath blocks.
pub async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    rocket::tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Remote {
            code: 500,
            kind: "internal".into(),
            message: format!("worker failed: {}", e),
        })?
}

/// `blocking` + `respond` with a per-request cancel token. The token is
/// tripped when this future is dropped (client gone, handler abandoned), so
/// the blocking work makes no further remote calls.
pub async fn run<T, F>(state: &AppState, work: F) -> ApiResponse<T>
where
    F: FnOnce(&AppState, &CancelToken) -> Result<T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let state = state.clone();
    let cancel = state.cancel_token();
    let _abandon = cancel.cancel_on_drop();
    respond(blocking(move || work(&state, &cancel)).await)
}

// ── Catchers ──

fn caught(status: Status, req: &Request<'_>, fallback: &str) -> Json<Envelope<()>> {
    let stashed: &Option<Error> = req.local_cache(|| None);
    let err = stashed.clone().unwrap_or_else(|| Error::Remote {
        code: status.code,
        kind: status.reason().unwrap_or("error").to_lowercase().replace(' ', "_"),
        message: fallback.to_string(),
    });
    Json(Envelope::err(&err))
}

#[catch(401)]
fn unauthorized(req: &Request<'_>) -> Json<Envelope<()>> {
    caught(Status::Unauthorized, req, "sign in required")
}

#[catch(403)]
fn forbidden(req: &Request<'_>) -> Json<Envelope<()>> {
    caught(Status::Forbidden, req, "not allowed")
}

#[catch(404)]
fn not_found(req: &Request<'_>) -> Json<Envelope<()>> {
    caught(Status::NotFound, req, "no such route")
}

#[catch(422)]
fn unprocessable(req: &Request<'_>) -> Json<Envelope<()>> {
    caught(Status::UnprocessableEntity, req, "malformed request body")
}

#[catch(default)]
fn fallback(status: Status, req: &Request<'_>) -> Json<Envelope<()>> {
    caught(status, req, "request failed")
}

pub fn catchers() -> Vec<rocket::Catcher> {
    catchers![unauthorized, forbidden, not_found, unprocessable, fallback]
}

#[get("/health")]
async fn health(state: &rocket::State<AppState>) -> ApiResponse<crate::health::HealthReport> {
    let state = state.inner().clone();
    respond(blocking(move || Ok(crate::health::report(&state))).await)
}

pub fn routes() -> Vec<Route> {
    let mut all = routes![health];
    all.extend(session::routes());
    all.extend(courses::routes());
    all.extend(coursework::routes());
    all.extend(files::routes());
    all
}

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;

use crate::error::Error;
use crate::models::profile::Profile;
use crate::routes::AppState;
use crate::services::session;

const JWT_HEADER: &str = "X-Appwrite-JWT";

// ── Session token ──

/// Extracts the session JWT. Checks, in order:
///   1. `Authorization: Bearer <jwt>`
///   2. `X-Appwrite-JWT: <jwt>`
pub fn session_token(request: &Request<'_>) -> Option<String> {
    let headers = request.headers();
    if let Some(auth) = headers.get_one("Authorization") {
        if let Some(token) = auth.strip_prefix("Bearer ").map(str::trim) {
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    headers
        .get_one(JWT_HEADER)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

// ── Authenticated user guard (any valid session) ──

/// Guard: any caller with a valid session.
pub struct CurrentUser {
    pub profile: Profile,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_session_profile(request).await {
            Ok(profile) => Outcome::Success(CurrentUser { profile }),
            Err(e) => fail(request, e),
        }
    }
}

// ── Role-specific guards ──

/// Guard: requires role = teacher or admin
pub struct TeacherUser {
    pub profile: Profile,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for TeacherUser {
    type Error = Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_session_profile(request).await {
            Ok(profile) if profile.is_teacher_or_above() => Outcome::Success(TeacherUser { profile }),
            Ok(_) => fail(request, Error::Forbidden("teacher role required".into())),
            Err(e) => fail(request, e),
        }
    }
}

/// Guard: requires role = admin
pub struct AdminUser {
    pub profile: Profile,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_session_profile(request).await {
            Ok(profile) if profile.is_admin() => Outcome::Success(AdminUser { profile }),
            Ok(_) => fail(request, Error::Forbidden("admin role required".into())),
            Err(e) => fail(request, e),
        }
    }
}

/// Stash the error for the JSON catchers and fail with its status.
fn fail<T>(request: &Request<'_>, e: Error) -> Outcome<T, Error> {
    request.local_cache(|| Some(e.clone()));
    let status = Status::from_code(e.code()).unwrap_or(Status::InternalServerError);
    Outcome::Error((status, e))
}

// ── Shared session resolution ──

/// The profile is cached per request so stacked guards resolve once.
async fn resolve_session_profile(request: &Request<'_>) -> Result<Profile, Error> {
    let cached = request
        .local_cache_async(async {
            let state = match request.guard::<&State<AppState>>().await.succeeded() {
                Some(s) => s.inner().clone(),
                None => return Err(Error::Config("application state is not managed".into())),
            };
            let token = session_token(request).ok_or_else(|| Error::Unauthorized("missing session token".into()))?;
            let cancel = state.cancel_token();
            let _abandon = cancel.cancel_on_drop();
            crate::routes::blocking(move || {
                session::resolve(&state.adapter, state.accounts.as_ref(), &token, &cancel)
            })
            .await
        })
        .await;
    cached.clone()
}

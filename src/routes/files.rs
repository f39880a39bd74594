use rocket::data::{Data, ToByteUnit};
use rocket::http::ContentType;
use rocket::{Route, State};
use serde::Serialize;

use crate::error::Error;
use crate::files::{resolve_download_url, StoredFile};
use crate::security::auth::CurrentUser;

use super::{respond, run, ApiResponse, AppState};

const MAX_UPLOAD_MIB: u64 = 25;

/// Raw-body upload; the file name comes from the query string.
#[post("/files?<name>", data = "<body>")]
async fn upload(
    state: &State<AppState>,
    user: CurrentUser,
    name: String,
    content_type: Option<&ContentType>,
    body: Data<'_>,
) -> ApiResponse<StoredFile> {
    let name = name.trim().to_string();
    if name.is_empty() || name.contains('/') {
        return respond(Err(Error::Validation("name must be a plain file name".into())));
    }
    let bytes = match body.open(MAX_UPLOAD_MIB.mebibytes()).into_bytes().await {
        Ok(b) if b.is_complete() => b.into_inner(),
        Ok(_) => {
            return respond(Err(Error::Validation(format!(
                "file is larger than {} MiB",
                MAX_UPLOAD_MIB
            ))))
        }
        Err(e) => return respond(Err(Error::Network(format!("upload read failed: {}", e)))),
    };
    let mime = content_type
        .map(|ct| ct.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    log::debug!("[files] {} uploading {} ({} bytes)", user.profile.id, name, bytes.len());
    run(state, move |s, c| {
        c.check()?;
        s.files.upload(&name, &mime, bytes)
    })
    .await
}

#[derive(Debug, Serialize)]
pub struct DownloadLink {
    pub path: String,
    pub url: String,
}

#[get("/files/url?<path>")]
async fn download_url(state: &State<AppState>, _user: CurrentUser, path: String) -> ApiResponse<DownloadLink> {
    run(state, move |s, c| {
        c.check()?;
        let url = resolve_download_url(s.files.as_ref(), &path, s.config.signed_url_ttl);
        Ok(DownloadLink { path, url })
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![upload, download_url]
}

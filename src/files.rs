use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::multipart;
use serde::Serialize;
use serde_json::json;
use url::Url;

use crate::appwrite::AppwriteClient;
use crate::error::{Error, Result};
use crate::store::unique_id;

/// A file stored in the course bucket. `path` is what gets saved on
/// submissions and later resolved back into a download URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredFile {
    pub path: String,
    pub name: String,
    pub size: u64,
}

pub trait FileStore: Send + Sync {
    fn upload(&self, name: &str, content_type: &str, bytes: Vec<u8>) -> Result<StoredFile>;

    /// Expiring URL that works without a session.
    fn signed_url(&self, path: &str, ttl: Duration) -> Result<String>;

    fn public_url(&self, path: &str) -> Result<String>;
}

/// Best available download URL for a stored path: signed, else public,
/// else the path itself.
pub fn resolve_download_url(files: &dyn FileStore, path: &str, ttl: Duration) -> String {
    match files.signed_url(path, ttl) {
        Ok(url) => return url,
        Err(e) => log::warn!("[files] signed URL for {} failed: {}", path, e),
    }
    match files.public_url(path) {
        Ok(url) => url,
        Err(e) => {
            log::warn!("[files] public URL for {} failed: {}", path, e);
            path.to_string()
        }
    }
}

// ── Appwrite Storage ─────────────────────────────────────────────────

pub struct AppwriteFiles {
    client: Arc<AppwriteClient>,
    bucket_id: String,
}

impl AppwriteFiles {
    pub fn new(client: Arc<AppwriteClient>, bucket_id: &str) -> Self {
        AppwriteFiles {
            client,
            bucket_id: bucket_id.to_string(),
        }
    }

    /// Stored paths are file ids; a leading `bucket/` prefix is tolerated.
    fn file_id<'a>(&self, path: &'a str) -> Result<&'a str> {
        let id = path
            .strip_prefix(&format!("{}/", self.bucket_id))
            .unwrap_or(path)
            .trim_matches('/');
        if id.is_empty() || id.contains('/') {
            return Err(Error::Validation(format!("not a file path in bucket {}: {}", self.bucket_id, path)));
        }
        Ok(id)
    }

    fn view_url(&self, file_id: &str, token: Option<&str>) -> Result<String> {
        let raw = self
            .client
            .url(&format!("/storage/buckets/{}/files/{}/view", self.bucket_id, file_id));
        let mut url = Url::parse(&raw).map_err(|e| Error::Config(format!("bad storage URL {}: {}", raw, e)))?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("project", self.client.project_id());
            if let Some(secret) = token {
                q.append_pair("token", secret);
            }
        }
        Ok(url.to_string())
    }
}

impl FileStore for AppwriteFiles {
    fn upload(&self, name: &str, content_type: &str, bytes: Vec<u8>) -> Result<StoredFile> {
        let file_id = unique_id();
        let size = bytes.len() as u64;
        let part = multipart::Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str(content_type)
            .map_err(|e| Error::Validation(format!("bad content type {}: {}", content_type, e)))?;
        let form = multipart::Form::new().text("fileId", file_id.clone()).part("file", part);
        let body = self
            .client
            .post_multipart(&format!("/storage/buckets/{}/files", self.bucket_id), form)?;
        let id = body
            .get("$id")
            .and_then(|v| v.as_str())
            .unwrap_or(&file_id)
            .to_string();
        log::info!("[files] uploaded {} ({} bytes) as {}", name, size, id);
        Ok(StoredFile {
            path: id,
            name: name.to_string(),
            size,
        })
    }

    fn signed_url(&self, path: &str, ttl: Duration) -> Result<String> {
        let file_id = self.file_id(path)?;
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| Error::Config(e.to_string()))?;
        let expire = (chrono::Utc::now() + ttl).to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let body = self.client.post(
            &format!("/tokens/buckets/{}/files/{}", self.bucket_id, file_id),
            &json!({ "expire": expire }),
        )?;
        let secret = body
            .get("secret")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Decode("token response has no secret".into()))?;
        self.view_url(file_id, Some(secret))
    }

    fn public_url(&self, path: &str) -> Result<String> {
        self.view_url(self.file_id(path)?, None)
    }
}

use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use serde_json::Value;

use crate::config::Config;
use crate::error::{Error, Result};

/// Shared HTTP plumbing for the Appwrite REST API. Built once at startup and
/// shared by the database, storage, account and provisioning handles.
pub struct AppwriteClient {
    http: Client,
    endpoint: String,
    project_id: String,
    api_key: String,
}

impl AppwriteClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.request_timeout)
            .user_agent(concat!("campusdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client error: {}", e)))?;
        Ok(AppwriteClient {
            http,
            endpoint: cfg.endpoint.clone(),
            project_id: cfg.project_id.clone(),
            api_key: cfg.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// Server-side requests carry the project and the API key.
    fn authed(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
    }

    pub fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let resp = self.authed(self.http.get(self.url(path))).query(query).send()?;
        read(resp)
    }

    pub fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let resp = self.authed(self.http.post(self.url(path))).json(body).send()?;
        read(resp)
    }

    pub fn patch(&self, path: &str, body: &Value) -> Result<Value> {
        let resp = self.authed(self.http.patch(self.url(path))).json(body).send()?;
        read(resp)
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        let resp = self.authed(self.http.delete(self.url(path))).send()?;
        read(resp).map(|_| ())
    }

    pub fn post_multipart(&self, path: &str, form: multipart::Form) -> Result<Value> {
        let resp = self.authed(self.http.post(self.url(path))).multipart(form).send()?;
        read(resp)
    }

    /// Request made on behalf of an end user: the user's JWT instead of the
    /// server key, so the backend applies that user's permissions.
    pub fn get_as_user(&self, path: &str, jwt: &str) -> Result<Value> {
        let resp = self
            .http
            .get(self.url(path))
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-JWT", jwt)
            .send()?;
        read(resp)
    }
}

/// Turn a response into JSON, mapping non-success statuses through
/// Appwrite's `{ message, code, type }` error body.
fn read(resp: Response) -> Result<Value> {
    let status = resp.status();
    let text = resp.text().unwrap_or_default();
    if status.is_success() {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(&text).map_err(|e| Error::Decode(format!("response body: {}", e)));
    }
    let (kind, message) = parse_error_body(&text);
    let message = if message.is_empty() {
        format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or(""))
    } else {
        message
    };
    log::debug!("[appwrite] {} {}: {}", status.as_u16(), kind, message);
    Err(Error::from_status(status.as_u16(), &kind, &message))
}

fn parse_error_body(text: &str) -> (String, String) {
    let body: Value = serde_json::from_str(text).unwrap_or(Value::Null);
    let kind = body.get("type").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let message = body
        .get("message")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| text.trim().to_string());
    (kind, message)
}

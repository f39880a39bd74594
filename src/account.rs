use std::sync::Arc;

use serde::Deserialize;

use crate::appwrite::AppwriteClient;
use crate::error::{Error, Result};

/// The signed-in user as the auth backend reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Account {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

pub trait AccountBackend: Send + Sync {
    /// Resolve a session JWT to its account. Invalid or expired tokens are
    /// `Unauthorized`.
    fn account_for(&self, jwt: &str) -> Result<Account>;
}

pub struct AppwriteAccounts {
    client: Arc<AppwriteClient>,
}

impl AppwriteAccounts {
    pub fn new(client: Arc<AppwriteClient>) -> Self {
        AppwriteAccounts { client }
    }
}

impl AccountBackend for AppwriteAccounts {
    fn account_for(&self, jwt: &str) -> Result<Account> {
        let body = self.client.get_as_user("/account", jwt).map_err(|e| match e {
            Error::Forbidden(m) | Error::NotFound(m) => Error::Unauthorized(m),
            other => other,
        })?;
        serde_json::from_value(body).map_err(|e| Error::Decode(format!("account: {}", e)))
    }
}

use serde_json::{Map, Value};

use crate::account::AccountBackend;
use crate::adapter::Adapter;
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::models::profile::{Profile, ProfileForm, Role};
use crate::models::Record;

/// Resolve a session JWT to the caller's profile, creating a student
/// profile the first time an account is seen.
pub fn resolve(
    adapter: &Adapter,
    accounts: &dyn AccountBackend,
    jwt: &str,
    cancel: &CancelToken,
) -> Result<Profile> {
    if jwt.trim().is_empty() {
        return Err(Error::Unauthorized("missing session token".into()));
    }
    cancel.check()?;
    let account = accounts.account_for(jwt)?;
    if let Some(profile) = adapter.get::<Profile>(&account.id, cancel)? {
        return Ok(profile);
    }

    let fresh = Profile {
        id: account.id.clone(),
        full_name: account.name,
        email: account.email,
        role: Role::Student,
        avatar_url: None,
        last_active_at: None,
    };
    match adapter.insert_record(&fresh, cancel) {
        Ok(profile) => {
            log::info!("[session] created profile for {}", profile.id);
            Ok(profile)
        }
        // Another request created it first.
        Err(e) if e.is_conflict() => adapter
            .get::<Profile>(&account.id, cancel)?
            .ok_or_else(|| Error::NotFound(format!("profile {}", account.id))),
        Err(e) => Err(e),
    }
}

pub fn update_profile(
    adapter: &Adapter,
    caller: &Profile,
    form: &ProfileForm,
    cancel: &CancelToken,
) -> Result<Profile> {
    let mut patch = Map::new();
    if let Some(name) = &form.full_name {
        patch.insert("full_name".into(), Value::String(super::require_text("full_name", name)?));
    }
    if let Some(url) = &form.avatar_url {
        patch.insert("avatar_url".into(), Value::String(url.trim().to_string()));
    }
    if patch.is_empty() {
        return Ok(caller.clone());
    }
    cancel.check()?;
    adapter
        .store()
        .update_document(adapter.collection_id(Profile::TABLE), &caller.id, &patch)?
        .decode()
}

/// Admin-only role change.
pub fn set_role(
    adapter: &Adapter,
    caller: &Profile,
    user_id: &str,
    role: Role,
    cancel: &CancelToken,
) -> Result<Profile> {
    if !caller.is_admin() {
        return Err(Error::Forbidden("only admins can change roles".into()));
    }
    let mut patch = Map::new();
    patch.insert("role".into(), Value::String(role.as_str().into()));
    cancel.check()?;
    let doc = adapter
        .store()
        .update_document(adapter.collection_id(Profile::TABLE), user_id, &patch)?;
    log::info!("[session] {} set role of {} to {}", caller.id, user_id, role.as_str());
    doc.decode()
}

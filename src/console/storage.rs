//! Browser-style key/value storage used by the bootstrap.
//!
//! Two records live here: the authentication callback URL (session storage)
//! and per-tenant user settings (local storage, `{tenant: {username: settings}}`).
//! Updates rewrite the whole record; concurrent writers race and the last
//! write wins.

use crate::console::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Session storage key holding the console's authentication callback URL.
pub const AUTH_CALLBACK_KEY: &str = "auth_callback_url_console";

/// Synchronous storage collaborator. Implementations return
/// [`Error::StorageUnavailable`] when the backing store cannot be accessed.
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    /// Returns an error if the store is unavailable.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// # Errors
    /// Returns an error if the store is unavailable.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// # Errors
    /// Returns an error if the store is unavailable.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store; `unavailable()` mimics storage disabled by the browser.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    disabled: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            entries: Mutex::default(),
            disabled: true,
        }
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        if self.disabled {
            return Err(Error::StorageUnavailable);
        }
        Ok(self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Reads, writes and clears the stored authentication callback.
pub struct CallbackStore<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> CallbackStore<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Stores `url` before redirecting to the login page.
    ///
    /// # Errors
    /// Returns an error if the store is unavailable.
    pub fn remember(&self, url: &str) -> Result<()> {
        self.store.set(AUTH_CALLBACK_KEY, url)
    }

    /// Stored callback, with blanks and unavailable storage read as absent.
    pub fn get(&self) -> Option<String> {
        match self.store.get(AUTH_CALLBACK_KEY) {
            Ok(value) => value.filter(|url| !url.trim().is_empty()),
            Err(err) => {
                debug!("callback storage not readable: {err}");
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(err) = self.store.remove(AUTH_CALLBACK_KEY) {
            debug!("callback storage not writable: {err}");
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PortalSettings {
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub userstore: String,
}

/// Settings persisted per user and tenant.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default)]
    pub identity_apps_settings: IdentityAppsSettings,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityAppsSettings {
    #[serde(default)]
    pub dev_portal: PortalSettings,
}

impl Default for IdentityAppsSettings {
    fn default() -> Self {
        Self {
            dev_portal: PortalSettings {
                tenant: String::new(),
                userstore: "PRIMARY".to_string(),
            },
        }
    }
}

/// Makes sure `username` has a settings entry under `tenant`.
/// Returns `true` when the record was written.
///
/// # Errors
/// Returns an error if the store is unavailable or holds a record that is not
/// a JSON object.
pub fn ensure_user_settings(store: &dyn KeyValueStore, tenant: &str, username: &str) -> Result<bool> {
    if tenant.trim().is_empty() || username.trim().is_empty() {
        return Ok(false);
    }

    let mut record = match store.get(tenant)? {
        Some(raw) => match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                return Err(Error::Config(format!(
                    "settings for tenant {tenant} are not an object"
                )))
            }
        },
        None => Map::new(),
    };

    if record.contains_key(username) {
        return Ok(false);
    }

    record.insert(
        username.to_string(),
        serde_json::to_value(UserSettings::default())?,
    );
    store.set(tenant, &Value::Object(record).to_string())?;
    debug!(tenant, "initialized user settings");

    Ok(true)
}

//! Symbolic console paths and login error codes.
//!
//! Every redirect the bootstrap performs is drawn from this registry so the
//! tenant-qualified app base is applied consistently.

use crate::console::config::DeploymentConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

/// Symbolic path names.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum PathKey {
    Login,
    Logout,
    Home,
    Unauthorized,
    CreateTenant,
    StoringDataDisabled,
}

impl PathKey {
    pub const ALL: [Self; 6] = [
        Self::Login,
        Self::Logout,
        Self::Home,
        Self::Unauthorized,
        Self::CreateTenant,
        Self::StoringDataDisabled,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::Home => "HOME",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::CreateTenant => "CREATE_TENANT",
            Self::StoringDataDisabled => "STORING_DATA_DISABLED",
        }
    }

    fn suffix(self, home_path: &str) -> String {
        match self {
            Self::Login => "/login".to_string(),
            Self::Logout => "/logout".to_string(),
            Self::Home => format!("/{}", home_path.trim().trim_matches('/')),
            Self::Unauthorized => "/unauthorized".to_string(),
            Self::CreateTenant => "/create-tenant".to_string(),
            Self::StoringDataDisabled => "/storing-data-disabled".to_string(),
        }
    }
}

/// Error codes appended as `?error=<code>` to the unauthorized page.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginError {
    NoValidScopes,
    UserDeniedConsent,
    AccessDenied,
}

impl LoginError {
    pub fn code(self) -> &'static str {
        match self {
            Self::NoValidScopes => "0001",
            Self::UserDeniedConsent => "0002",
            Self::AccessDenied => "0003",
        }
    }
}

/// The `error_description` the authorization server sends when consent is refused.
pub const USER_DENIED_CONSENT_SERVER_ERROR: &str = "User denied the consent";

/// A navigation target: pathname plus optional query string (with leading `?`).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub pathname: String,
    pub search: String,
}

impl Location {
    pub fn path(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            search: String::new(),
        }
    }

    /// Splits a stored `pathname?query` string.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('?') {
            Some((pathname, query)) => Self {
                pathname: pathname.to_string(),
                search: format!("?{query}"),
            },
            None => Self::path(raw),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}{}", self.pathname, self.search)
    }
}

/// Resolved paths for a deployment.
#[derive(Clone, Debug)]
pub struct PathRegistry {
    base: String,
    paths: BTreeMap<PathKey, String>,
}

impl PathRegistry {
    pub fn new(deployment: &DeploymentConfig) -> Self {
        let base = deployment.app_base_with_tenant();
        let paths = PathKey::ALL
            .into_iter()
            .map(|key| (key, format!("{base}{}", key.suffix(&deployment.home_path))))
            .collect();
        Self { base, paths }
    }

    pub fn get(&self, key: PathKey) -> &str {
        self.paths.get(&key).map_or(self.base.as_str(), String::as_str)
    }

    /// Tenant-qualified app base, e.g. `/t/wso2.com/console`.
    pub fn app_base_with_tenant(&self) -> &str {
        &self.base
    }

    pub fn login(&self) -> &str {
        self.get(PathKey::Login)
    }

    pub fn logout(&self) -> &str {
        self.get(PathKey::Logout)
    }

    pub fn home(&self) -> &str {
        self.get(PathKey::Home)
    }

    pub fn unauthorized(&self, error: LoginError) -> Location {
        Location {
            pathname: self.get(PathKey::Unauthorized).to_string(),
            search: format!("?error={}", error.code()),
        }
    }
}

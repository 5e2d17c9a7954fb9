//! Post-login destination resolution.
//!
//! Flow Overview:
//! - Without organization associations the user lands on the stored callback
//!   when it is usable, otherwise on the home page.
//! - With associations, users that have no associated tenant, are not
//!   privileged and are not switching organization go to tenant creation.
//! - A usable callback is non-empty, is not the login page or the bare app
//!   base, and belongs to the tenant derived from the token subject. Honouring
//!   a callback from another tenant would carry a logged-in session across the
//!   tenant boundary.

use crate::console::{
    config::DeploymentConfig,
    paths::{LoginError, Location, PathKey, PathRegistry, USER_DENIED_CONSENT_SERVER_ERROR},
    token::DecodedToken,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use utoipa::ToSchema;

/// Where the user should land after sign-in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Destination {
    Home,
    StoredCallback(Location),
    CreateTenant,
    Unauthorized(LoginError),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    Home,
    StoredCallback,
    CreateTenant,
    Unauthorized,
}

impl Destination {
    pub fn kind(&self) -> DestinationKind {
        match self {
            Self::Home => DestinationKind::Home,
            Self::StoredCallback(_) => DestinationKind::StoredCallback,
            Self::CreateTenant => DestinationKind::CreateTenant,
            Self::Unauthorized(_) => DestinationKind::Unauthorized,
        }
    }

    pub fn location(&self, paths: &PathRegistry) -> Location {
        match self {
            Self::Home => Location::path(paths.home()),
            Self::StoredCallback(location) => location.clone(),
            Self::CreateTenant => Location::path(paths.get(PathKey::CreateTenant)),
            Self::Unauthorized(error) => paths.unauthorized(*error),
        }
    }
}

/// Applies the post-login decision table for one deployment.
#[derive(Clone, Debug)]
pub struct DestinationResolver {
    paths: PathRegistry,
    super_tenant: String,
    tenant_segment: Option<Regex>,
}

impl DestinationResolver {
    pub fn new(deployment: &DeploymentConfig) -> Self {
        let prefix = deployment.tenant_prefix.trim().trim_matches('/');
        let tenant_segment = if prefix.is_empty() {
            None
        } else {
            Regex::new(&format!("^/{}/([^/?#]+)", regex::escape(prefix))).ok()
        };

        Self {
            paths: PathRegistry::new(deployment),
            super_tenant: deployment.super_tenant.clone(),
            tenant_segment,
        }
    }

    pub fn paths(&self) -> &PathRegistry {
        &self.paths
    }

    /// Picks the destination for a completed sign-in.
    pub fn resolve(
        &self,
        token: &DecodedToken,
        stored_callback: Option<&str>,
        org_associations_enabled: bool,
    ) -> Destination {
        if org_associations_enabled
            && !(token.has_associated_tenants()
                || token.is_privileged_user()
                || token.is_organization_switch())
        {
            debug!("no tenant association, redirecting to tenant creation");
            return Destination::CreateTenant;
        }

        match stored_callback {
            Some(callback) if self.is_usable_callback(callback, token) => {
                Destination::StoredCallback(Location::parse(callback.trim()))
            }
            _ => Destination::Home,
        }
    }

    /// `true` when the callback may be honoured for this token.
    pub fn is_usable_callback(&self, callback: &str, token: &DecodedToken) -> bool {
        let callback = callback.trim();
        if callback.is_empty() {
            return false;
        }

        let login = self.paths.login();
        if callback == login || callback == format!("{login}/") {
            return false;
        }

        if callback == format!("{}/", self.paths.app_base_with_tenant()) {
            return false;
        }

        let tenant = token.tenant_domain(&self.super_tenant);
        if self.is_callback_from_another_tenant(callback, &tenant) {
            debug!(tenant, "ignoring callback from another tenant");
            return false;
        }

        true
    }

    /// Compares the tenant encoded in the callback path with `tenant`.
    /// Only `/<tenant-prefix>/<other>/` paths are foreign; callbacks without a
    /// tenant segment are kept.
    pub fn is_callback_from_another_tenant(&self, callback: &str, tenant: &str) -> bool {
        let path = callback_path(callback);
        self.tenant_segment
            .as_ref()
            .and_then(|re| re.captures(&path))
            .and_then(|caps| caps.get(1))
            .is_some_and(|segment| segment.as_str() != tenant)
    }
}

// Stored callbacks are usually `pathname?query`, but absolute URLs also occur.
fn callback_path(callback: &str) -> String {
    match Url::parse(callback) {
        Ok(url) => url.path().to_string(),
        Err(_) => callback
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Organization name following the `/<prefix>/` segment of a path.
pub fn organization_name_from_path(path: &str, organization_prefix: &str) -> Option<String> {
    let prefix = organization_prefix.trim().trim_matches('/');
    if prefix.is_empty() {
        return None;
    }

    let path = callback_path(path);
    let chunks: Vec<&str> = path.split('/').collect();
    let index = chunks.iter().position(|chunk| *chunk == prefix)?;
    chunks
        .get(index + 1)
        .filter(|name| !name.is_empty())
        .map(|name| (*name).to_string())
}

/// Detects a refused consent in the landing URL's query string.
pub fn consent_denied(search: &str) -> Option<Destination> {
    let query = search.trim_start_matches('?');
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "error_description")
        .filter(|(_, value)| value == USER_DENIED_CONSENT_SERVER_ERROR)
        .map(|_| Destination::Unauthorized(LoginError::UserDeniedConsent))
}

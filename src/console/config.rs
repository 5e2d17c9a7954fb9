//! Deployment, endpoint and localization configuration for the console.
//! Values are resolved once at startup (CLI flags or env) and passed down
//! explicitly; nothing in the pipeline reads globals. Configuration values are
//! public; do not store secrets here.

use crate::console::paths::PathRegistry;
use serde::Serialize;

pub const DEFAULT_SUPER_TENANT: &str = "carbon.super";
pub const DEFAULT_TENANT_PREFIX: &str = "t";
pub const DEFAULT_ORGANIZATION_PREFIX: &str = "o";
pub const DEFAULT_FALLBACK_LANGUAGE: &str = "en-US";

/// Everything the console needs to know about where it is deployed.
#[derive(Clone, Debug, Serialize)]
pub struct DeploymentConfig {
    pub server_origin: String,
    pub app_base_name: String,
    pub tenant: String,
    pub tenant_prefix: String,
    pub organization_prefix: String,
    pub super_tenant: String,
    pub tenant_qualified_urls: bool,
    pub home_path: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            server_origin: String::new(),
            app_base_name: "console".to_string(),
            tenant: DEFAULT_SUPER_TENANT.to_string(),
            tenant_prefix: DEFAULT_TENANT_PREFIX.to_string(),
            organization_prefix: DEFAULT_ORGANIZATION_PREFIX.to_string(),
            super_tenant: DEFAULT_SUPER_TENANT.to_string(),
            tenant_qualified_urls: true,
            home_path: "/getting-started".to_string(),
        }
    }
}

impl DeploymentConfig {
    /// `true` when the deployment has not been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.server_origin.trim().is_empty() || self.tenant.trim().is_empty()
    }

    /// App base without the tenant segment, e.g. `/console` (or `""` at the root).
    pub fn app_base_name_without_tenant(&self) -> String {
        let base = remove_slashes(&self.app_base_name);
        if base.is_empty() {
            String::new()
        } else {
            format!("/{base}")
        }
    }

    /// App base qualified with the tenant, e.g. `/t/wso2.com/console`.
    pub fn app_base_with_tenant(&self) -> String {
        let base = self.app_base_name_without_tenant();
        if self.tenant_qualified_urls {
            format!("/{}/{}{base}", self.tenant_prefix, self.tenant)
        } else {
            base
        }
    }
}

/// Remote endpoints used by the console bootstrap.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ServiceEndpoints {
    pub feature_gate: String,
    pub tenant_tier: String,
    pub governance_connectors: String,
}

impl ServiceEndpoints {
    /// Derives the endpoint set from the server origin.
    pub fn from_origin(origin: &str) -> Self {
        let origin = origin.trim().trim_end_matches('/');
        if origin.is_empty() {
            return Self::default();
        }
        Self {
            feature_gate: format!("{origin}/api/server/v1/feature-gate/features"),
            tenant_tier: format!("{origin}/api/server/v1/subscription/tier"),
            governance_connectors: format!("{origin}/api/server/v1/identity-governance"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.feature_gate.trim().is_empty() && self.tenant_tier.trim().is_empty()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct I18nConfig {
    pub resource_path: String,
    pub meta_hash: Option<String>,
    pub fallback_language: String,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            resource_path: "/resources/i18n".to_string(),
            meta_hash: None,
            fallback_language: DEFAULT_FALLBACK_LANGUAGE.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ConsoleConfig {
    pub deployment: DeploymentConfig,
    pub endpoints: ServiceEndpoints,
    pub i18n: I18nConfig,
    pub enable_organization_associations: bool,
    pub debug: bool,
}

impl ConsoleConfig {
    pub fn paths(&self) -> PathRegistry {
        PathRegistry::new(&self.deployment)
    }
}

/// Strips leading and trailing slashes, mirroring how paths are joined.
pub fn remove_slashes(path: &str) -> &str {
    path.trim().trim_matches('/')
}

/// Trims a configuration value and treats blanks as missing.
pub fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

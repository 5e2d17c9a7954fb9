//! Feature-gate resolution.
//!
//! Remote descriptors name a gate with a hyphen-delimited identifier
//! (`api-resources`) which maps onto a dot-delimited path (`api.resources`) in
//! the gate tree. Merging writes `<path>.status` and `<path>.tags` onto a copy
//! of the defaults, in descriptor order, so the last descriptor for a path
//! wins. A failed or empty fetch leaves the defaults untouched (fail-open).
//! The merged tree only drives what the console shows; it grants nothing.

use crate::console::error::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{debug, warn};
use utoipa::ToSchema;

/// Status of a gated capability. Unknown statuses are preserved verbatim.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum FeatureStatus {
    Active,
    Disabled,
    ComingSoon,
    New,
    Experimental,
    Other(String),
}

impl From<String> for FeatureStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ACTIVE" => Self::Active,
            "DISABLED" => Self::Disabled,
            "COMING_SOON" => Self::ComingSoon,
            "NEW" => Self::New,
            "EXPERIMENTAL" => Self::Experimental,
            _ => Self::Other(value),
        }
    }
}

impl From<FeatureStatus> for String {
    fn from(status: FeatureStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Active => "ACTIVE",
            Self::Disabled => "DISABLED",
            Self::ComingSoon => "COMING_SOON",
            Self::New => "NEW",
            Self::Experimental => "EXPERIMENTAL",
            Self::Other(value) => value,
        };
        formatter.write_str(value)
    }
}

/// One gated capability as served by the feature-gate API.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct FeatureDescriptor {
    #[serde(rename = "featureIdentifier")]
    pub identifier: String,
    #[serde(rename = "featureStatus")]
    pub status: FeatureStatus,
    #[serde(rename = "featureTags", default)]
    pub tags: Vec<String>,
}

impl FeatureDescriptor {
    /// Gate path segments for the identifier (`api-resources` -> `["api", "resources"]`).
    pub fn path(&self) -> Vec<&str> {
        self.identifier
            .split('-')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect()
    }
}

/// Gate tree keyed by dot-delimited paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct FeatureConfig(Value);

impl Default for FeatureConfig {
    fn default() -> Self {
        Self::default_gates()
    }
}

impl FeatureConfig {
    /// Wraps an arbitrary tree; non-objects become an empty tree.
    pub fn from_value(value: Value) -> Self {
        if value.is_object() {
            Self(value)
        } else {
            Self(Value::Object(Map::new()))
        }
    }

    /// Gates shipped with the console before any remote data arrives.
    pub fn default_gates() -> Self {
        Self(json!({
            "api": {
                "resources": { "status": "ACTIVE", "tags": [] }
            },
            "applications": {
                "status": "ACTIVE",
                "tags": [],
                "templates": { "status": "ACTIVE", "tags": [] }
            },
            "branding": {
                "status": "ACTIVE",
                "tags": [],
                "customText": { "status": "ACTIVE", "tags": [] }
            },
            "loginFlow": {
                "ai": { "status": "COMING_SOON", "tags": ["premium"] }
            },
            "organizations": { "status": "ACTIVE", "tags": [] },
            "userStores": { "status": "ACTIVE", "tags": [] },
            "workflowApprovals": { "status": "DISABLED", "tags": [] }
        }))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    fn node(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(&self.0, |node, segment| node.get(segment))
    }

    /// Status recorded at `path`, e.g. `api.resources`.
    pub fn status_of(&self, path: &str) -> Option<FeatureStatus> {
        self.node(path)?
            .get("status")?
            .as_str()
            .map(|status| FeatureStatus::from(status.to_string()))
    }

    pub fn tags_of(&self, path: &str) -> Vec<String> {
        self.node(path)
            .and_then(|node| node.get("tags"))
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|tag| tag.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A gate without a recorded status is open.
    pub fn is_enabled(&self, path: &str) -> bool {
        self.status_of(path)
            .map_or(true, |status| status != FeatureStatus::Disabled)
    }
}

/// Merges descriptors into a copy of `default_config`.
pub fn merge_features(
    default_config: &FeatureConfig,
    descriptors: &[FeatureDescriptor],
) -> FeatureConfig {
    let mut merged = default_config.0.clone();

    for descriptor in descriptors {
        let path = descriptor.path();
        if path.is_empty() {
            warn!(identifier = %descriptor.identifier, "skipping feature without identifier");
            continue;
        }

        merged = set_path(
            merged,
            &path,
            "status",
            Value::String(descriptor.status.to_string()),
        );
        merged = set_path(
            merged,
            &path,
            "tags",
            Value::Array(descriptor.tags.iter().cloned().map(Value::String).collect()),
        );
    }

    FeatureConfig(merged)
}

/// Merges the outcome of a feature fetch, keeping the defaults on error or no data.
pub fn merge_fetched(
    default_config: &FeatureConfig,
    fetched: Result<Option<Vec<FeatureDescriptor>>, Error>,
) -> FeatureConfig {
    match fetched {
        Ok(Some(descriptors)) if !descriptors.is_empty() => {
            debug!(count = descriptors.len(), "merging feature gates");
            merge_features(default_config, &descriptors)
        }
        Ok(_) => default_config.clone(),
        Err(err) => {
            warn!("feature gate fetch failed, using defaults: {err}");
            default_config.clone()
        }
    }
}

/// Remote source of feature descriptors for an organization.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// `Ok(None)` when the API has no data for `organization_id`.
    async fn fetch_features(
        &self,
        organization_id: &str,
    ) -> Result<Option<Vec<FeatureDescriptor>>, Error>;
}

/// Fetches and merges in one step; never fails.
pub async fn resolve_features(
    default_config: &FeatureConfig,
    source: &dyn FeatureSource,
    organization_id: &str,
) -> FeatureConfig {
    merge_fetched(default_config, source.fetch_features(organization_id).await)
}

// Rebuilds `node` along `path`, replacing anything that is not an object, then sets `leaf`.
fn set_path(node: Value, path: &[&str], leaf: &str, value: Value) -> Value {
    let mut map = match node {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    match path.split_first() {
        Some((head, rest)) => {
            let child = map.remove(*head).unwrap_or(Value::Null);
            map.insert((*head).to_string(), set_path(child, rest, leaf, value));
        }
        None => {
            map.insert(leaf.to_string(), value);
        }
    }

    Value::Object(map)
}

/// Read/create/update/delete scopes of a UI feature.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FeatureScopes {
    #[serde(default)]
    pub read: Vec<String>,
    #[serde(default)]
    pub create: Vec<String>,
    #[serde(default)]
    pub update: Vec<String>,
    #[serde(default)]
    pub delete: Vec<String>,
}

/// A UI region described in the deployment's UI config.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UiFeature {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub scopes: FeatureScopes,
}

pub type UiFeatureConfig = BTreeMap<String, UiFeature>;

/// `true` when every scope in `required` appears in `allowed_scopes`
/// (a space-separated scope string).
pub fn scopes_granted(required: &[String], allowed_scopes: &str) -> bool {
    let allowed: HashSet<&str> = allowed_scopes.split_whitespace().collect();
    required.iter().all(|scope| allowed.contains(scope.as_str()))
}

/// `true` when at least one enabled UI feature is readable with `allowed_scopes`.
pub fn portal_access_granted(features: &UiFeatureConfig, allowed_scopes: &str) -> bool {
    features
        .values()
        .any(|feature| feature.enabled && scopes_granted(&feature.scopes.read, allowed_scopes))
}

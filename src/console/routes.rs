use crate::console::{
    error::Result,
    features::{scopes_granted, UiFeatureConfig},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// UI feature that turns on the server configuration area.
pub const SERVER_FEATURE: &str = "server";
/// UI feature whose read scopes guard the governance connector list.
pub const GOVERNANCE_CONNECTORS_FEATURE: &str = "governanceConnectors";

/// A connector inside a governance category.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceConnector {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
}

/// Category of governance connectors; each one backs a server-settings route.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceConnectorCategory {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub connectors: Vec<GovernanceConnector>,
}

#[async_trait]
pub trait GovernanceConnectorSource: Send + Sync {
    async fn fetch_categories(&self) -> Result<Vec<GovernanceConnectorCategory>>;
}

/// Connectors are listed only for first-level organizations with the server
/// area enabled and the connector read scopes granted.
pub fn governance_connectors_visible(
    ui_features: &UiFeatureConfig,
    first_level_organization: bool,
    allowed_scopes: &str,
) -> bool {
    let server_enabled = ui_features
        .get(SERVER_FEATURE)
        .is_some_and(|feature| feature.enabled);
    let readable = ui_features
        .get(GOVERNANCE_CONNECTORS_FEATURE)
        .is_some_and(|feature| scopes_granted(&feature.scopes.read, allowed_scopes));

    server_enabled && first_level_organization && readable
}

/// Fetches the categories; on failure the `previous` list is kept.
pub async fn resolve_governance_connectors(
    source: &dyn GovernanceConnectorSource,
    previous: &[GovernanceConnectorCategory],
) -> Vec<GovernanceConnectorCategory> {
    match source.fetch_categories().await {
        Ok(categories) => categories,
        Err(err) => {
            tracing::debug!("governance connectors unavailable: {err}");
            previous.to_vec()
        }
    }
}

/// Routing collaborator that prunes routes the user cannot reach.
#[async_trait]
pub trait RouteFilter: Send + Sync {
    /// Filters the route table; completion moves the render gate forward.
    async fn filter_routes(
        &self,
        first_level_organization: bool,
        governance_connectors: &[GovernanceConnectorCategory],
    ) -> Result<()>;
}

/// Accepts every route.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAllRoutes;

#[async_trait]
impl RouteFilter for AllowAllRoutes {
    async fn filter_routes(
        &self,
        _first_level_organization: bool,
        _governance_connectors: &[GovernanceConnectorCategory],
    ) -> Result<()> {
        Ok(())
    }
}

use crate::console::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const FREE_TIER: &str = "Free";

/// Subscription tier of the signed-in tenant.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantTier {
    pub tier_name: String,
}

impl Default for TenantTier {
    fn default() -> Self {
        Self {
            tier_name: FREE_TIER.to_string(),
        }
    }
}

#[async_trait]
pub trait TenantTierSource: Send + Sync {
    /// `None` when the tier API has nothing for the tenant.
    async fn fetch_tier(&self) -> Result<Option<TenantTier>>;
}

/// Resolves the tier, falling back to `Free` on errors and blank answers.
pub async fn resolve_tier(source: &dyn TenantTierSource) -> TenantTier {
    match source.fetch_tier().await {
        Ok(Some(tier)) if !tier.tier_name.trim().is_empty() => tier,
        Ok(_) => TenantTier::default(),
        Err(err) => {
            tracing::debug!("tenant tier unavailable: {err}");
            TenantTier::default()
        }
    }
}

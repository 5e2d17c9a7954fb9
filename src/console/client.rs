//! HTTP implementations of the remote collaborators.
//!
//! One client serves the feature-gate, tenant-tier and identity-governance
//! APIs along with the localization metadata file. The caller's access token, when present, is
//! forwarded as a bearer token and never logged.

use crate::{
    console::{
        config::ServiceEndpoints,
        error::{Error, Result},
        features::{FeatureDescriptor, FeatureSource},
        i18n::{LanguageMeta, LocaleSource},
        routes::{GovernanceConnectorCategory, GovernanceConnectorSource},
        tier::{TenantTier, TenantTierSource},
    },
    APP_USER_AGENT,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const REQUEST_TIMEOUT_SECONDS: u64 = 10;

#[derive(Clone, Debug)]
pub struct ConsoleClient {
    client: Client,
    server_origin: String,
    endpoints: ServiceEndpoints,
    access_token: Option<SecretString>,
}

impl ConsoleClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(server_origin: &str, endpoints: ServiceEndpoints) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            client,
            server_origin: server_origin.trim().trim_end_matches('/').to_string(),
            endpoints,
            access_token: None,
        })
    }

    /// Returns a copy that forwards `token` on every request.
    #[must_use]
    pub fn with_access_token(&self, token: SecretString) -> Self {
        Self {
            access_token: Some(token),
            ..self.clone()
        }
    }

    fn get(&self, url: Url) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.access_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    fn endpoint(raw: &str, name: &str) -> Result<Url> {
        if raw.trim().is_empty() {
            return Err(Error::Config(format!("{name} endpoint is not configured")));
        }
        Ok(Url::parse(raw.trim())?)
    }
}

#[async_trait]
impl FeatureSource for ConsoleClient {
    #[instrument(skip(self))]
    async fn fetch_features(&self, organization_id: &str) -> Result<Option<Vec<FeatureDescriptor>>> {
        let mut url = Self::endpoint(&self.endpoints.feature_gate, "feature gate")?;
        url.query_pairs_mut().append_pair("orgId", organization_id);

        let response = self.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => {
                let descriptors: Vec<FeatureDescriptor> = response.json().await?;
                debug!(count = descriptors.len(), "fetched feature descriptors");
                Ok(Some(descriptors))
            }
            status => Err(Error::FeatureGate(format!("unexpected status {status}"))),
        }
    }
}

#[async_trait]
impl TenantTierSource for ConsoleClient {
    #[instrument(skip(self))]
    async fn fetch_tier(&self) -> Result<Option<TenantTier>> {
        let url = Self::endpoint(&self.endpoints.tenant_tier, "tenant tier")?;

        let response = self.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(Error::TenantTier(format!("unexpected status {status}"))),
        }
    }
}

#[async_trait]
impl GovernanceConnectorSource for ConsoleClient {
    #[instrument(skip(self))]
    async fn fetch_categories(&self) -> Result<Vec<GovernanceConnectorCategory>> {
        let url = Self::endpoint(&self.endpoints.governance_connectors, "governance connectors")?;

        let response = self.get(url).send().await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(Vec::new()),
            status if status.is_success() => {
                let categories: Vec<GovernanceConnectorCategory> = response.json().await?;
                debug!(count = categories.len(), "fetched governance connector categories");
                Ok(categories)
            }
            status => Err(Error::Governance(format!("unexpected status {status}"))),
        }
    }
}

#[async_trait]
impl LocaleSource for ConsoleClient {
    #[instrument(skip(self))]
    async fn fetch_meta(&self, path: &str) -> Result<LanguageMeta> {
        let origin = Self::endpoint(&self.server_origin, "server origin")?;
        let url = origin.join(path)?;

        // Static resource; no credentials.
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::I18nInit(format!("meta file returned {status}")));
        }

        Ok(response.json().await?)
    }
}

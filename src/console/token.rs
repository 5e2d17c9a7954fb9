//! Decoded ID token claims consumed by the bootstrap decisions.
//!
//! The claims are read, never verified: signature and expiry checks belong to
//! the auth collaborator that produced the token.

use crate::console::error::{Error, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Deserializer, Serialize};

/// First `amr` entry that marks a privileged (enterprise IdP) user.
pub const PRIVILEGED_AUTHENTICATOR: &str = "EnterpriseIDPAuthenticator";

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DecodedToken {
    #[serde(rename = "sub", default)]
    pub subject: String,
    #[serde(rename = "org_id", default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(rename = "user_org", default, skip_serializing_if = "Option::is_none")]
    pub user_organization_id: Option<String>,
    #[serde(rename = "amr", default)]
    pub authentication_method_references: Vec<String>,
    #[serde(
        rename = "associated_tenants",
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub associated_tenants: Option<Vec<String>>,
    #[serde(rename = "org_name", default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
}

impl DecodedToken {
    /// Decodes the claims segment of a compact JWT.
    ///
    /// # Errors
    /// Returns an error if the token is not three dot-separated segments, the
    /// payload is not base64url, or the claims are not valid JSON.
    pub fn from_jwt(raw: &str) -> Result<Self> {
        let mut segments = raw.trim().split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(Error::TokenFormat);
        };

        let bytes = Base64UrlUnpadded::decode_vec(payload.trim_end_matches('='))
            .map_err(|_| Error::Base64)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `true` when the first authentication method is the enterprise IdP.
    pub fn is_privileged_user(&self) -> bool {
        self.authentication_method_references
            .first()
            .is_some_and(|amr| amr == PRIVILEGED_AUTHENTICATOR)
    }

    /// `true` when both organization claims exist and differ.
    pub fn is_organization_switch(&self) -> bool {
        match (&self.organization_id, &self.user_organization_id) {
            (Some(org), Some(user_org)) => org != user_org,
            _ => false,
        }
    }

    /// `true` when the token lists at least one associated tenant.
    pub fn has_associated_tenants(&self) -> bool {
        self.associated_tenants
            .as_ref()
            .is_some_and(|tenants| tenants.iter().any(|tenant| !tenant.trim().is_empty()))
    }

    /// Tenant domain derived from the subject (`user@tenant`).
    /// Subjects without a tenant suffix belong to the super tenant.
    pub fn tenant_domain(&self, super_tenant: &str) -> String {
        match self.subject.rsplit_once('@') {
            Some((_, tenant)) if !tenant.trim().is_empty() => tenant.trim().to_string(),
            _ => super_tenant.to_string(),
        }
    }
}

// `associated_tenants` is emitted either as a single string or a list.
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(
        Option::<OneOrMany>::deserialize(deserializer)?.map(|value| match value {
            OneOrMany::One(tenant) => vec![tenant],
            OneOrMany::Many(tenants) => tenants,
        }),
    )
}

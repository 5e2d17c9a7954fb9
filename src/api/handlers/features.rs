use super::error_response;
use crate::api::ApiState;
use crate::console::features::{resolve_features, FeatureConfig};
use axum::{
    extract::{Extension, Query},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Deserialize, Debug, IntoParams)]
pub struct FeaturesQuery {
    /// Organization name (super or first-level organizations) or id.
    pub org: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/console/features",
    params(FeaturesQuery),
    responses(
        (status = 200, description = "Default feature gates merged with the remote ones", body = FeatureConfig),
        (status = 400, description = "Missing organization", body = super::ErrorResponse),
    ),
    tag = "console"
)]
/// Fetch feature descriptors for an organization and merge them into the
/// default gates. Upstream failures fall back to the defaults.
pub async fn features(
    headers: HeaderMap,
    state: Extension<Arc<ApiState>>,
    Query(query): Query<FeaturesQuery>,
) -> impl IntoResponse {
    let Some(org) = query.org.filter(|org| !org.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Missing org");
    };

    let client = match bearer_token(&headers) {
        Some(token) => state.client.with_access_token(token),
        None => state.client.clone(),
    };

    let merged = resolve_features(&FeatureConfig::default_gates(), &client, org.trim()).await;

    Json(merged).into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<SecretString> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return None;
    }
    Some(SecretString::from(token.trim().to_string()))
}

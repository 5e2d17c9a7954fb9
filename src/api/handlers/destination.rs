//! Post-login destination endpoint.
//!
//! The frontend posts the raw ID token plus the callback it stored before the
//! login redirect and receives the location to navigate to. A refused consent
//! on the landing URL wins over everything else.

use super::error_response;
use crate::api::ApiState;
use crate::console::{
    destination::{consent_denied, Destination, DestinationKind},
    paths::Location,
    token::DecodedToken,
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DestinationRequest {
    pub id_token: String,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub landing_url: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct DestinationResponse {
    pub destination: DestinationKind,
    pub pathname: String,
    pub search: String,
}

#[utoipa::path(
    post,
    path = "/v1/console/destination",
    request_body = DestinationRequest,
    responses(
        (status = 200, description = "Where to navigate after sign-in", body = DestinationResponse),
        (status = 400, description = "The ID token cannot be decoded", body = super::ErrorResponse),
    ),
    tag = "console"
)]
/// Resolve the post-login destination for a decoded ID token.
pub async fn destination(
    state: Extension<Arc<ApiState>>,
    Json(payload): Json<DestinationRequest>,
) -> impl IntoResponse {
    let paths = state.resolver.paths();

    if let Some(denied) = payload
        .landing_url
        .as_deref()
        .and_then(|landing| consent_denied(&Location::parse(landing).search))
    {
        info!("user denied consent");
        return Json(response(&denied, denied.location(paths))).into_response();
    }

    let token = match DecodedToken::from_jwt(&payload.id_token) {
        Ok(token) => token,
        Err(err) => {
            debug!("rejecting undecodable id token: {err}");
            return error_response(StatusCode::BAD_REQUEST, "Invalid ID token");
        }
    };

    let destination = state.resolver.resolve(
        &token,
        payload.callback_url.as_deref(),
        state.config.enable_organization_associations,
    );
    debug!(destination = ?destination.kind(), "resolved destination");

    Json(response(&destination, destination.location(paths))).into_response()
}

fn response(destination: &Destination, location: Location) -> DestinationResponse {
    DestinationResponse {
        destination: destination.kind(),
        pathname: location.pathname,
        search: location.search,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::console::ConsoleConfig;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
        routing::post,
        Router,
    };
    use base64ct::{Base64UrlUnpadded, Encoding};
    use serde_json::json;
    use tower::ServiceExt;

    fn app(associations: bool) -> Router {
        let mut config = ConsoleConfig {
            enable_organization_associations: associations,
            ..ConsoleConfig::default()
        };
        config.deployment.server_origin = "https://localhost:9443".to_string();
        config.deployment.tenant = "t1".to_string();
        let state = Arc::new(ApiState::new(config).unwrap());
        Router::new()
            .route("/v1/console/destination", post(destination))
            .layer(Extension(state))
    }

    fn jwt(claims: &serde_json::Value) -> String {
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"none"}"#);
        let payload = Base64UrlUnpadded::encode_string(claims.to_string().as_bytes());
        format!("{header}.{payload}.sig")
    }

    async fn call(app: Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/console/destination")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn stored_callback_is_returned() {
        let token = jwt(&json!({ "sub": "alice@t1", "associated_tenants": ["t1"] }));
        let (status, body) = call(
            app(true),
            json!({ "id_token": token, "callback_url": "/t/t1/console/users?page=2" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["destination"], "stored_callback");
        assert_eq!(body["pathname"], "/t/t1/console/users");
        assert_eq!(body["search"], "?page=2");

        let response: DestinationResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.destination, DestinationKind::StoredCallback);
    }

    #[tokio::test]
    async fn missing_association_goes_to_tenant_creation() {
        let token = jwt(&json!({ "sub": "alice@t1", "amr": ["BasicAuthenticator"] }));
        let (_, body) = call(app(true), json!({ "id_token": token })).await;
        assert_eq!(body["destination"], "create_tenant");
        assert_eq!(body["pathname"], "/t/t1/console/create-tenant");
    }

    #[tokio::test]
    async fn denied_consent_wins() {
        let (status, body) = call(
            app(false),
            json!({
                "id_token": "garbage",
                "landing_url": "https://localhost:9443/t/t1/console?error_description=User%20denied%20the%20consent"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["destination"], "unauthorized");
        assert_eq!(body["search"], "?error=0002");
    }

    #[tokio::test]
    async fn invalid_token_is_rejected() {
        let (status, body) = call(app(false), json!({ "id_token": "not-a-jwt" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid ID token");
    }
}

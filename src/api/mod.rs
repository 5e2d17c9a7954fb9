//! HTTP surface of the console bootstrap.
//!
//! The server is a thin transport: handlers decode requests, call into
//! [`crate::console`] and serialize the outcome.

use crate::console::{client::ConsoleClient, ConsoleConfig, DestinationResolver};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request},
    routing::{get, options},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

pub mod handlers;

use handlers::{destination, features, health};

/// Shared, read-only state for all handlers.
#[derive(Debug)]
pub struct ApiState {
    pub config: ConsoleConfig,
    pub resolver: DestinationResolver,
    pub client: ConsoleClient,
}

impl ApiState {
    /// # Errors
    /// Returns an error if the outbound HTTP client cannot be built.
    pub fn new(config: ConsoleConfig) -> Result<Self> {
        let client = ConsoleClient::new(&config.deployment.server_origin, config.endpoints.clone())
            .context("Failed to build console HTTP client")?;
        Ok(Self {
            resolver: DestinationResolver::new(&config.deployment),
            config,
            client,
        })
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    with_tags(openapi)
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` document.
fn api_router() -> OpenApiRouter {
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(destination::destination))
        .routes(routes!(features::features))
}

fn with_tags(mut openapi: utoipa::openapi::OpenApi) -> utoipa::openapi::OpenApi {
    let mut console_tag = Tag::new("console");
    console_tag.description = Some("Console bootstrap decisions".to_string());
    openapi.tags = Some(vec![console_tag, Tag::new("health")]);
    openapi
}

/// Full application with middleware, ready to serve.
pub fn app(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    let (router, openapi) = api_router().split_for_parts();
    let openapi = Arc::new(with_tags(openapi));

    router
        .route("/health", options(health::health))
        .route(
            "/openapi.json",
            get(move || {
                let openapi = openapi.clone();
                async move { axum::Json(openapi.as_ref().clone()) }
            }),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state)),
        )
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, email)) => (non_empty(name), non_empty(email.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}

/// Serve the API until Ctrl-C.
/// # Errors
/// Returns an error if the server fails to start
pub async fn new(port: u16, config: ConsoleConfig) -> Result<()> {
    let state = Arc::new(ApiState::new(config)?);
    let app = app(state);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, request_id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};
    use tower::ServiceExt;

    fn state() -> Arc<ApiState> {
        let mut config = ConsoleConfig::default();
        config.deployment.server_origin = "https://localhost:9443".to_string();
        Arc::new(ApiState::new(config).unwrap())
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Team Permesi <team@permesi.dev>"),
            (Some("Team Permesi"), Some("team@permesi.dev"))
        );
        assert_eq!(parse_author("Solo"), (Some("Solo"), None));
        assert_eq!(parse_author("<only@mail>"), (None, Some("only@mail")));
    }

    #[test]
    fn openapi_lists_console_routes() {
        let doc = openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| *p == "/health"));
        assert!(paths.iter().any(|p| *p == "/v1/console/destination"));
        assert!(paths.iter().any(|p| *p == "/v1/console/features"));
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        let tags: Vec<String> = doc.tags.unwrap_or_default().into_iter().map(|tag| tag.name).collect();
        assert_eq!(tags, vec!["console".to_string(), "health".to_string()]);
    }

    #[tokio::test]
    async fn request_id_is_generated_and_propagated() {
        let response = app(state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let request_id = response.headers().get("x-request-id").unwrap();
        assert!(Ulid::from_string(request_id.to_str().unwrap()).is_ok());

        let response = app(state())
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers().get("x-request-id").unwrap(), "abc");
    }

    #[tokio::test]
    async fn openapi_json_is_served() {
        let response = app(state())
            .oneshot(Request::builder().uri("/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(doc["paths"]["/v1/console/destination"].is_object());
    }
}

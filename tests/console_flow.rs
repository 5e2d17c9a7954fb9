use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::{net::TcpListener, sync::Arc};
use vestibule::console::{
    auth::{AuthClient, AuthEvent, SignInResponse, SilentSignIn},
    client::ConsoleClient,
    config::{DeploymentConfig, ServiceEndpoints},
    features::FeatureStatus,
    i18n::StaticLocalizer,
    navigation::{MemoryHistory, Navigator},
    paths::Location,
    routes::AllowAllRoutes,
    storage::MemoryStore,
    Collaborators, Console, ConsoleConfig, DecodedToken, Destination, Organization, RenderState,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

struct StubAuth {
    token: DecodedToken,
}

#[async_trait]
impl AuthClient for StubAuth {
    async fn sign_in(&self, _prompt_login: bool) -> vestibule::console::Result<()> {
        Ok(())
    }

    async fn sign_out(&self) -> vestibule::console::Result<()> {
        Ok(())
    }

    async fn decoded_id_token(&self) -> vestibule::console::Result<DecodedToken> {
        Ok(self.token.clone())
    }

    async fn try_sign_in_silently(&self) -> vestibule::console::Result<SilentSignIn> {
        Ok(SilentSignIn::NotAuthenticated)
    }

    async fn switch_organization(
        &self,
        _organization: &str,
    ) -> vestibule::console::Result<SignInResponse> {
        Ok(SignInResponse::default())
    }
}

async fn mount_backend(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/server/v1/feature-gate/features"))
        .and(query_param("orgId", "wso2.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "featureIdentifier": "api-resources", "featureStatus": "DISABLED", "featureTags": [] },
            { "featureIdentifier": "loginFlow-ai", "featureStatus": "ACTIVE", "featureTags": ["premium"] }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/server/v1/subscription/tier"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tierName": "Enterprise" })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/console/resources/i18n/meta.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "en-US": { "code": "en-US", "name": "English" },
            "pt-BR": { "code": "pt-BR", "name": "Português" }
        })))
        .mount(server)
        .await;
}

fn console(origin: &str) -> Result<(Console, Arc<MemoryHistory>, Arc<StaticLocalizer>)> {
    let deployment = DeploymentConfig {
        server_origin: origin.to_string(),
        tenant: "wso2.com".to_string(),
        ..DeploymentConfig::default()
    };
    let endpoints = ServiceEndpoints::from_origin(origin);
    let config = ConsoleConfig {
        deployment,
        endpoints: endpoints.clone(),
        enable_organization_associations: true,
        ..ConsoleConfig::default()
    };

    let client = Arc::new(ConsoleClient::new(origin, endpoints)?);
    let history = Arc::new(MemoryHistory::starting_at(Location::path(
        "/t/wso2.com/console",
    )));
    let localizer = Arc::new(StaticLocalizer::new("de-DE"));
    let token = DecodedToken {
        subject: "alice@wso2.com".to_string(),
        associated_tenants: Some(vec!["wso2.com".to_string()]),
        organization_name: Some("wso2.com".to_string()),
        ..DecodedToken::default()
    };

    let console = Console::new(
        config,
        Collaborators {
            auth: Arc::new(StubAuth { token }),
            navigator: history.clone(),
            session_storage: Arc::new(MemoryStore::new()),
            local_storage: Arc::new(MemoryStore::new()),
            features: client.clone(),
            tier: client.clone(),
            governance: client.clone(),
            locales: client,
            localizer: localizer.clone(),
            routes: Arc::new(AllowAllRoutes),
        },
    );
    Ok((console, history, localizer))
}

fn sign_in_response() -> SignInResponse {
    SignInResponse {
        username: "alice".to_string(),
        tenant_domain: "wso2.com".to_string(),
        org_id: Some("root".to_string()),
        user_org: Some("root".to_string()),
        allowed_scopes: "console:read".to_string(),
    }
}

#[tokio::test]
async fn sign_in_bootstraps_the_console() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_backend(&server).await;

    let (console, history, localizer) = console(&server.uri())?;
    assert_eq!(console.render_state(), RenderState::Loading);

    let destination = console
        .handle_event(AuthEvent::SignIn(sign_in_response()))
        .await?;
    assert_eq!(destination, Some(Destination::Home));
    assert_eq!(
        history.current().pathname,
        "/t/wso2.com/console/getting-started"
    );

    console
        .on_authenticated(Organization {
            id: "root".to_string(),
            is_super: false,
            is_first_level: true,
        })
        .await?;

    assert_eq!(console.render_state(), RenderState::Ready);
    assert!(console.renders_content());

    let features = console.features();
    assert_eq!(
        features.status_of("api.resources"),
        Some(FeatureStatus::Disabled)
    );
    assert_eq!(
        features.status_of("loginFlow.ai"),
        Some(FeatureStatus::Active)
    );
    assert_eq!(
        features.status_of("workflowApprovals"),
        Some(FeatureStatus::Disabled)
    );

    assert_eq!(console.tier().tier_name, "Enterprise");
    assert!(console.languages().contains_key("pt-BR"));
    assert_eq!(vestibule::console::i18n::Localizer::language(localizer.as_ref()), "en-US");
    Ok(())
}

#[tokio::test]
async fn backend_failures_fall_back_to_defaults() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/console/resources/i18n/meta.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "en-US": { "code": "en-US", "name": "English" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (console, _history, _localizer) = console(&server.uri())?;
    console.handle_sign_in(sign_in_response()).await?;
    console
        .on_authenticated(Organization {
            id: "root".to_string(),
            is_super: true,
            is_first_level: false,
        })
        .await?;

    assert_eq!(
        console.features(),
        vestibule::console::FeatureConfig::default_gates()
    );
    assert_eq!(console.tier().tier_name, "Free");
    assert_eq!(console.render_state(), RenderState::Ready);
    Ok(())
}

#[tokio::test]
async fn timeout_then_failed_silent_sign_in_logs_out() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_backend(&server).await;

    let (console, history, _localizer) = console(&server.uri())?;
    console.handle_sign_in(sign_in_response()).await?;
    console
        .on_authenticated(Organization {
            id: "root".to_string(),
            is_super: false,
            is_first_level: true,
        })
        .await?;

    assert_eq!(console.session_timed_out()?, RenderState::SessionTimedOut);
    assert!(!console.renders_content());

    assert_eq!(console.stay_logged_in().await?, RenderState::LoggedOut);
    assert!(!console.is_authenticated());
    assert_eq!(history.current().pathname, "/t/wso2.com/console/logout");
    Ok(())
}

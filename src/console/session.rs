//! Console session orchestrator.
//!
//! [`Console`] owns one signed-in session: it receives auth events, resolves
//! the post-login destination, loads feature gates, tier and localization
//! after authentication, and drives the render gate. Collaborators are
//! injected through [`Collaborators`].
//!
//! Every async continuation runs under the session's [`CancellationToken`].
//! After [`Console::shutdown`] in-flight work resolves to [`Error::Cancelled`]
//! and leaves the state untouched.

use crate::console::{
    auth::{AuthClient, AuthEvent, HttpActivity, SignInResponse, SilentSignIn},
    config::ConsoleConfig,
    destination::{consent_denied, organization_name_from_path, Destination, DestinationResolver},
    error::{Error, Result},
    features::{portal_access_granted, resolve_features, FeatureConfig, FeatureSource, UiFeatureConfig},
    gate::{GateEvent, RenderGate, RenderState},
    i18n::{self, LanguageMeta, LocaleSource, Localizer},
    navigation::Navigator,
    paths::{LoginError, Location, PathKey},
    routes::{
        governance_connectors_visible, resolve_governance_connectors, GovernanceConnectorCategory,
        GovernanceConnectorSource, RouteFilter,
    },
    storage::{ensure_user_settings, CallbackStore, KeyValueStore},
    tier::{resolve_tier, TenantTier, TenantTierSource},
};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

const STORAGE_CHECK_KEY: &str = "vestibule_storage_check";

/// External collaborators of a console session.
#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn AuthClient>,
    pub navigator: Arc<dyn Navigator>,
    pub session_storage: Arc<dyn KeyValueStore>,
    pub local_storage: Arc<dyn KeyValueStore>,
    pub features: Arc<dyn FeatureSource>,
    pub tier: Arc<dyn TenantTierSource>,
    pub governance: Arc<dyn GovernanceConnectorSource>,
    pub locales: Arc<dyn LocaleSource>,
    pub localizer: Arc<dyn Localizer>,
    pub routes: Arc<dyn RouteFilter>,
}

/// Organization the session is operating in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Organization {
    pub id: String,
    pub is_super: bool,
    pub is_first_level: bool,
}

#[derive(Debug)]
struct SessionState {
    gate: RenderGate,
    http: HttpActivity,
    user: Option<SignInResponse>,
    organization: Organization,
    features: FeatureConfig,
    tier: TenantTier,
    governance_connectors: Vec<GovernanceConnectorCategory>,
    languages: LanguageMeta,
}

pub struct Console {
    config: ConsoleConfig,
    resolver: DestinationResolver,
    collaborators: Collaborators,
    state: Mutex<SessionState>,
    cancel: CancellationToken,
}

impl Console {
    pub fn new(config: ConsoleConfig, collaborators: Collaborators) -> Self {
        let gate = RenderGate::new(!config.deployment.is_empty(), !config.endpoints.is_empty());
        Self {
            resolver: DestinationResolver::new(&config.deployment),
            config,
            collaborators,
            state: Mutex::new(SessionState {
                gate,
                http: HttpActivity::default(),
                user: None,
                organization: Organization::default(),
                features: FeatureConfig::default_gates(),
                tier: TenantTier::default(),
                governance_connectors: Vec::new(),
                languages: LanguageMeta::new(),
            }),
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ends the session; pending continuations stop without touching state.
    pub fn shutdown(&self) {
        debug!("console session shutting down");
        self.cancel.cancel();
    }

    pub fn render_state(&self) -> RenderState {
        self.read(|state| state.gate.state())
    }

    /// Protected content may render.
    pub fn renders_content(&self) -> bool {
        self.read(|state| state.gate.renders_content())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|state| state.user.is_some())
    }

    pub fn features(&self) -> FeatureConfig {
        self.read(|state| state.features.clone())
    }

    pub fn tier(&self) -> TenantTier {
        self.read(|state| state.tier.clone())
    }

    pub fn governance_connectors(&self) -> Vec<GovernanceConnectorCategory> {
        self.read(|state| state.governance_connectors.clone())
    }

    pub fn languages(&self) -> LanguageMeta {
        self.read(|state| state.languages.clone())
    }

    pub fn http_activity(&self) -> HttpActivity {
        self.read(|state| state.http)
    }

    fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> Result<R> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner)))
    }

    async fn guarded<F: Future>(&self, future: F) -> Result<F::Output> {
        tokio::select! {
            () = self.cancel.cancelled() => Err(Error::Cancelled),
            output = future => Ok(output),
        }
    }

    fn callbacks(&self) -> CallbackStore<'_> {
        CallbackStore::new(self.collaborators.session_storage.as_ref())
    }

    fn navigate(&self, location: Location) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.collaborators.navigator.push(location);
        Ok(())
    }

    /// Redirects to the storing-data-disabled page when session storage cannot
    /// be used. Returns `true` when storage is available.
    pub fn check_session_storage(&self) -> Result<bool> {
        let storage = self.collaborators.session_storage.as_ref();
        let available = storage
            .set(STORAGE_CHECK_KEY, "1")
            .and_then(|()| storage.remove(STORAGE_CHECK_KEY))
            .is_ok();
        if available {
            return Ok(true);
        }

        let target = self.resolver.paths().get(PathKey::StoringDataDisabled).to_string();
        if self.collaborators.navigator.current().pathname != target {
            warn!("session storage unavailable");
            self.navigate(Location::path(target))?;
        }
        Ok(false)
    }

    /// Sends users who refused consent to the unauthorized page.
    pub fn check_consent_denied(&self, landing: &Location) -> Result<Option<Destination>> {
        let Some(destination) = consent_denied(&landing.search) else {
            return Ok(None);
        };
        info!("user denied consent");
        self.navigate(destination.location(self.resolver.paths()))?;
        Ok(Some(destination))
    }

    /// Stores the location to return to once sign-in completes.
    pub fn remember_callback(&self, location: &Location) -> Result<()> {
        self.callbacks().remember(&location.to_string())
    }

    /// Starts sign-in; a `prompt` parameter on the landing URL forces the login prompt.
    pub async fn sign_in(&self, landing: &Location) -> Result<()> {
        let query = landing.search.trim_start_matches('?');
        let prompt_login = url::form_urlencoded::parse(query.as_bytes()).any(|(key, _)| key == "prompt");
        debug!(prompt_login, "signing in");
        self.guarded(self.collaborators.auth.sign_in(prompt_login)).await?
    }

    /// Entry point for auth SDK hooks. Returns the destination for `SignIn`.
    pub async fn handle_event(&self, event: AuthEvent) -> Result<Option<Destination>> {
        match event {
            AuthEvent::SignIn(response) => self.handle_sign_in(response).await.map(Some),
            other => {
                self.mutate(|state| state.http.record(&other))?;
                Ok(None)
            }
        }
    }

    /// Completes a sign-in: switches organization when the callback targets
    /// one, resolves the destination, navigates once and clears the callback.
    #[instrument(skip_all, fields(username = %response.username))]
    pub async fn handle_sign_in(&self, response: SignInResponse) -> Result<Destination> {
        let auth = &self.collaborators.auth;
        let stored_callback = self.callbacks().get();

        let path = stored_callback
            .clone()
            .unwrap_or_else(|| self.collaborators.navigator.current().pathname);
        let organization = organization_name_from_path(&path, &self.config.deployment.organization_prefix);

        let response = match organization {
            Some(name) if !response.is_home_organization() => {
                debug!(organization = name, "switching organization");
                self.guarded(auth.switch_organization(&name)).await??
            }
            _ => response,
        };

        let token = self.guarded(auth.decoded_id_token()).await??;
        let destination = self.resolver.resolve(
            &token,
            stored_callback.as_deref(),
            self.config.enable_organization_associations,
        );
        info!(destination = ?destination.kind(), "sign-in complete");

        let tenant = if response.tenant_domain.trim().is_empty() {
            token.tenant_domain(&self.config.deployment.super_tenant)
        } else {
            response.tenant_domain.clone()
        };
        let username = response.username.clone();

        self.mutate(|state| state.user = Some(response))?;
        self.navigate(destination.location(self.resolver.paths()))?;
        self.callbacks().clear();

        if let Err(err) = ensure_user_settings(self.collaborators.local_storage.as_ref(), &tenant, &username) {
            debug!("user settings not stored: {err}");
        }

        Ok(destination)
    }

    /// Post-authentication bootstrap: feature gates, tenant tier, route
    /// filtering and localization run concurrently. Feature and tier failures
    /// fall back to defaults; localization and route errors are returned.
    #[instrument(skip(self))]
    pub async fn on_authenticated(&self, organization: Organization) -> Result<()> {
        if !self.is_authenticated() {
            return Err(Error::Auth("session is not authenticated".to_string()));
        }

        self.mutate(|state| {
            state.organization = organization.clone();
            state.gate.apply(GateEvent::Authenticated);
        })?;

        let (features, tier, routes, languages) = tokio::join!(
            self.load_features(&organization),
            self.load_tier(),
            self.refresh_routes(),
            self.load_languages(),
        );

        features?;
        tier?;
        routes?;
        languages.map(|_| ())
    }

    async fn load_features(&self, organization: &Organization) -> Result<()> {
        let Some(organization_id) = self.feature_organization_id(organization).await? else {
            debug!("no organization id, keeping default feature gates");
            return Ok(());
        };

        let defaults = FeatureConfig::default_gates();
        let merged = self
            .guarded(resolve_features(
                &defaults,
                self.collaborators.features.as_ref(),
                &organization_id,
            ))
            .await?;

        self.mutate(|state| state.features = merged)
    }

    // Super and first-level organizations are addressed by the token's
    // `org_name`, sub-organizations by their id.
    async fn feature_organization_id(&self, organization: &Organization) -> Result<Option<String>> {
        if !(organization.is_super || organization.is_first_level) {
            return Ok(Some(organization.id.clone()).filter(|id| !id.is_empty()));
        }

        match self.guarded(self.collaborators.auth.decoded_id_token()).await? {
            Ok(token) => Ok(token.organization_name.filter(|name| !name.is_empty())),
            Err(err) => {
                debug!("id token not decodable: {err}");
                Ok(None)
            }
        }
    }

    async fn load_tier(&self) -> Result<()> {
        let tier = self
            .guarded(resolve_tier(self.collaborators.tier.as_ref()))
            .await?;
        self.mutate(|state| state.tier = tier)
    }

    async fn load_languages(&self) -> Result<LanguageMeta> {
        let meta = self
            .guarded(i18n::initialize(
                &self.config,
                self.collaborators.locales.as_ref(),
                self.collaborators.localizer.as_ref(),
            ))
            .await??;
        self.mutate(|state| state.languages = meta.clone())?;
        Ok(meta)
    }

    /// Re-runs the route filter and marks routes as filtered on success.
    pub async fn refresh_routes(&self) -> Result<RenderState> {
        let (first_level, connectors) = self.read(|state| {
            (
                state.organization.is_first_level,
                state.governance_connectors.clone(),
            )
        });
        self.guarded(self.collaborators.routes.filter_routes(first_level, &connectors))
            .await?
            .map_err(|err| match err {
                Error::Routes(_) => err,
                other => Error::Routes(other.to_string()),
            })?;
        self.mutate(|state| state.gate.apply(GateEvent::RoutesFiltered))
    }

    /// Loads the governance connector categories when the organization may
    /// list them. A failed fetch keeps the previous list; a changed list runs
    /// the route filter again. Returns `true` when routes were re-filtered.
    pub async fn load_governance_connectors(&self, ui_features: &UiFeatureConfig) -> Result<bool> {
        let (visible, previous) = self.read(|state| {
            let visible = state.user.as_ref().is_some_and(|user| {
                governance_connectors_visible(
                    ui_features,
                    state.organization.is_first_level,
                    &user.allowed_scopes,
                )
            });
            (visible, state.governance_connectors.clone())
        });
        if !visible {
            return Ok(false);
        }

        let connectors = self
            .guarded(resolve_governance_connectors(
                self.collaborators.governance.as_ref(),
                &previous,
            ))
            .await?;
        if connectors == previous {
            return Ok(false);
        }

        debug!(count = connectors.len(), "governance connectors changed");
        self.mutate(|state| state.governance_connectors = connectors)?;
        self.refresh_routes().await?;
        Ok(true)
    }

    /// Timeout signal from session management.
    pub fn session_timed_out(&self) -> Result<RenderState> {
        self.mutate(|state| state.gate.apply(GateEvent::SessionTimeout))
    }

    /// "Stay logged in": silent re-authentication; failure logs out.
    pub async fn stay_logged_in(&self) -> Result<RenderState> {
        match self.guarded(self.collaborators.auth.try_sign_in_silently()).await? {
            Ok(SilentSignIn::Authenticated(response)) => self.mutate(|state| {
                state.user = Some(response);
                state.gate.apply(GateEvent::SilentSignInSucceeded)
            }),
            Ok(SilentSignIn::NotAuthenticated) => self.force_logout(GateEvent::SilentSignInFailed),
            Err(err) => {
                warn!("silent sign-in failed: {err}");
                self.force_logout(GateEvent::SilentSignInFailed)
            }
        }
    }

    /// "Sign out" from the network-error (session expired) modal.
    pub async fn network_error_sign_out(&self) -> Result<RenderState> {
        if let Err(err) = self.guarded(self.collaborators.auth.sign_out()).await? {
            warn!("sign-out failed: {err}");
        }
        self.mutate(|state| state.http = HttpActivity::default())?;
        self.force_logout(GateEvent::Logout)
    }

    /// "Go back" from the timeout modal: resume at `url`.
    pub fn session_timeout_abort(&self, url: &Location) -> Result<RenderState> {
        let state = self.mutate(|state| state.gate.apply(GateEvent::SessionTimeoutAborted))?;
        self.navigate(url.clone())?;
        Ok(state)
    }

    /// Explicit logout.
    pub fn logout(&self) -> Result<RenderState> {
        self.end_session(GateEvent::Logout)
    }

    // Drops the user and leaves for the logout page whatever state the gate is in.
    fn force_logout(&self, event: GateEvent) -> Result<RenderState> {
        let state = self.mutate(|state| {
            state.user = None;
            state.gate.apply(event)
        })?;
        self.callbacks().clear();
        self.navigate(Location::path(self.resolver.paths().logout()))?;
        Ok(state)
    }

    fn end_session(&self, event: GateEvent) -> Result<RenderState> {
        let state = self.mutate(|state| {
            let next = state.gate.apply(event);
            if next == RenderState::LoggedOut {
                state.user = None;
            }
            next
        })?;
        if state == RenderState::LoggedOut {
            self.callbacks().clear();
            self.navigate(Location::path(self.resolver.paths().logout()))?;
        }
        Ok(state)
    }

    /// Denies the portal when no enabled UI feature is readable with the
    /// user's scopes. Users without any association go to tenant creation.
    pub async fn check_portal_access(&self, ui_features: &UiFeatureConfig) -> Result<Option<Destination>> {
        let Some(allowed_scopes) = self.read(|state| state.user.as_ref().map(|user| user.allowed_scopes.clone()))
        else {
            return Ok(None);
        };

        if ui_features.is_empty() || portal_access_granted(ui_features, &allowed_scopes) {
            return Ok(None);
        }

        let destination = if self.config.enable_organization_associations {
            match self.guarded(self.collaborators.auth.decoded_id_token()).await? {
                Ok(token) if token.has_associated_tenants() || token.is_privileged_user() => {
                    Destination::Unauthorized(LoginError::AccessDenied)
                }
                Ok(_) => Destination::CreateTenant,
                Err(err) => {
                    debug!("id token not decodable: {err}");
                    return Ok(None);
                }
            }
        } else {
            Destination::Unauthorized(LoginError::AccessDenied)
        };

        info!(destination = ?destination.kind(), "portal access denied");
        self.navigate(destination.location(self.resolver.paths()))?;
        Ok(Some(destination))
    }
}

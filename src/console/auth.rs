//! Authentication collaborator contract and auth events.

use crate::console::{error::Result, token::DecodedToken};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Basic user info delivered with a completed sign-in.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub tenant_domain: String,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub user_org: Option<String>,
    #[serde(default)]
    pub allowed_scopes: String,
}

impl SignInResponse {
    /// The user signed in directly to the organization they belong to.
    pub fn is_home_organization(&self) -> bool {
        self.user_org == self.org_id
    }
}

/// Outcome of a silent re-authentication attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SilentSignIn {
    Authenticated(SignInResponse),
    NotAuthenticated,
}

/// Hooks the auth SDK delivers to the console.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    SignIn(SignInResponse),
    HttpRequestStart,
    HttpRequestFinish,
    HttpRequestSuccess,
    /// `status` is `None` for transport errors.
    HttpRequestError { status: Option<u16> },
}

/// Authentication SDK operations used by the bootstrap.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Starts an interactive sign-in; `prompt_login` forces the login prompt.
    async fn sign_in(&self, prompt_login: bool) -> Result<()>;

    async fn sign_out(&self) -> Result<()>;

    /// Claims of the current ID token.
    async fn decoded_id_token(&self) -> Result<DecodedToken>;

    async fn try_sign_in_silently(&self) -> Result<SilentSignIn>;

    /// Switches the session into `organization` and returns the new user info.
    async fn switch_organization(&self, organization: &str) -> Result<SignInResponse>;
}

/// Outbound request bookkeeping driven by HTTP auth events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HttpActivity {
    in_flight: usize,
    network_error: bool,
}

impl HttpActivity {
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Session expired or the server could not be reached.
    pub fn network_error(&self) -> bool {
        self.network_error
    }

    /// Applies an HTTP event; `SignIn` is ignored here.
    pub fn record(&mut self, event: &AuthEvent) {
        match event {
            AuthEvent::HttpRequestStart => self.in_flight += 1,
            AuthEvent::HttpRequestFinish => self.in_flight = self.in_flight.saturating_sub(1),
            AuthEvent::HttpRequestSuccess => self.network_error = false,
            AuthEvent::HttpRequestError { status } => match status {
                Some(401) | None => {
                    warn!(?status, "request failed, flagging session as expired");
                    self.network_error = true;
                }
                Some(status) => debug!(status, "request failed"),
            },
            AuthEvent::SignIn(_) => {}
        }
    }
}

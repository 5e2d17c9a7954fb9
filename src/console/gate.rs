//! Render gate for the protected console shell.
//!
//! The shell renders only in [`RenderState::Ready`]; every other state shows a
//! placeholder. `Ready` additionally requires non-empty deployment and
//! endpoint configuration, whatever the route filter reports.

use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    #[default]
    Loading,
    RoutesPending,
    Ready,
    SessionTimedOut,
    LoggedOut,
}

/// Signals that move the gate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GateEvent {
    /// Authentication and first-level-organization status are known.
    Authenticated,
    /// The asynchronous route filter completed.
    RoutesFiltered,
    /// The session-management collaborator reported a timeout.
    SessionTimeout,
    /// "Go back" from the timeout modal.
    SessionTimeoutAborted,
    SilentSignInSucceeded,
    SilentSignInFailed,
    Logout,
}

#[derive(Clone, Debug, Default)]
pub struct RenderGate {
    state: RenderState,
    routes_filtered: bool,
    deployment_ready: bool,
    endpoints_ready: bool,
}

impl RenderGate {
    pub fn new(deployment_ready: bool, endpoints_ready: bool) -> Self {
        Self {
            deployment_ready,
            endpoints_ready,
            ..Self::default()
        }
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn routes_filtered(&self) -> bool {
        self.routes_filtered
    }

    pub fn session_timed_out(&self) -> bool {
        self.state == RenderState::SessionTimedOut
    }

    /// Protected content may render.
    pub fn renders_content(&self) -> bool {
        self.state == RenderState::Ready
    }

    fn configured(&self) -> bool {
        self.deployment_ready && self.endpoints_ready
    }

    /// Records configuration changes; may promote `RoutesPending` to `Ready`.
    pub fn set_configuration(&mut self, deployment_ready: bool, endpoints_ready: bool) -> RenderState {
        self.deployment_ready = deployment_ready;
        self.endpoints_ready = endpoints_ready;

        match self.state {
            RenderState::RoutesPending if self.routes_filtered && self.configured() => {
                self.state = RenderState::Ready;
            }
            RenderState::Ready if !self.configured() => {
                self.state = RenderState::RoutesPending;
            }
            _ => {}
        }

        self.state
    }

    /// Applies `event`; transitions that are not defined leave the state unchanged.
    pub fn apply(&mut self, event: GateEvent) -> RenderState {
        let next = match (self.state, event) {
            (RenderState::Loading | RenderState::RoutesPending, GateEvent::Authenticated) => {
                self.routes_filtered = false;
                Some(RenderState::RoutesPending)
            }
            (RenderState::RoutesPending, GateEvent::RoutesFiltered) => {
                self.routes_filtered = true;
                self.configured().then_some(RenderState::Ready)
            }
            (RenderState::Ready, GateEvent::SessionTimeout) => Some(RenderState::SessionTimedOut),
            (
                RenderState::SessionTimedOut,
                GateEvent::SilentSignInSucceeded | GateEvent::SessionTimeoutAborted,
            ) => Some(if self.configured() {
                RenderState::Ready
            } else {
                RenderState::RoutesPending
            }),
            (
                RenderState::RoutesPending | RenderState::Ready | RenderState::SessionTimedOut,
                GateEvent::SilentSignInFailed,
            )
            | (RenderState::Ready | RenderState::SessionTimedOut, GateEvent::Logout) => {
                Some(RenderState::LoggedOut)
            }
            _ => None,
        };

        match next {
            Some(state) => {
                debug!(from = ?self.state, to = ?state, ?event, "render gate transition");
                self.state = state;
            }
            None => debug!(state = ?self.state, ?event, "render gate ignored event"),
        }

        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_gate() -> RenderGate {
        let mut gate = RenderGate::new(true, true);
        gate.apply(GateEvent::Authenticated);
        gate.apply(GateEvent::RoutesFiltered);
        gate
    }

    #[test]
    fn happy_path_reaches_ready() {
        let mut gate = RenderGate::new(true, true);
        assert_eq!(gate.state(), RenderState::Loading);
        assert!(!gate.renders_content());
        assert_eq!(gate.apply(GateEvent::Authenticated), RenderState::RoutesPending);
        assert_eq!(gate.apply(GateEvent::RoutesFiltered), RenderState::Ready);
        assert!(gate.renders_content());
    }

    #[test]
    fn never_ready_without_configuration() {
        for (deployment, endpoints) in [(false, true), (true, false), (false, false)] {
            let mut gate = RenderGate::new(deployment, endpoints);
            gate.apply(GateEvent::Authenticated);
            assert_eq!(gate.apply(GateEvent::RoutesFiltered), RenderState::RoutesPending);
            assert!(gate.routes_filtered());
            assert!(!gate.renders_content());
            assert_eq!(gate.apply(GateEvent::RoutesFiltered), RenderState::RoutesPending);
        }
    }

    #[test]
    fn configuration_promotes_filtered_routes() {
        let mut gate = RenderGate::new(false, true);
        gate.apply(GateEvent::Authenticated);
        gate.apply(GateEvent::RoutesFiltered);
        assert_eq!(gate.set_configuration(true, true), RenderState::Ready);
        assert_eq!(gate.set_configuration(true, false), RenderState::RoutesPending);
    }

    #[test]
    fn routes_filtered_before_authentication_is_ignored() {
        let mut gate = RenderGate::new(true, true);
        assert_eq!(gate.apply(GateEvent::RoutesFiltered), RenderState::Loading);
    }

    #[test]
    fn timeout_then_silent_sign_in() {
        let mut gate = ready_gate();
        assert_eq!(gate.apply(GateEvent::SessionTimeout), RenderState::SessionTimedOut);
        assert!(gate.session_timed_out());
        assert!(!gate.renders_content());
        assert_eq!(gate.apply(GateEvent::SilentSignInSucceeded), RenderState::Ready);
    }

    #[test]
    fn timeout_then_failed_silent_sign_in_logs_out() {
        let mut gate = ready_gate();
        gate.apply(GateEvent::SessionTimeout);
        assert_eq!(gate.apply(GateEvent::SilentSignInFailed), RenderState::LoggedOut);
        assert_eq!(gate.apply(GateEvent::Authenticated), RenderState::LoggedOut);
    }

    #[test]
    fn failed_silent_sign_in_while_rendered_logs_out() {
        let mut gate = ready_gate();
        assert_eq!(gate.apply(GateEvent::SilentSignInFailed), RenderState::LoggedOut);

        let mut loading = RenderGate::new(true, true);
        assert_eq!(loading.apply(GateEvent::SilentSignInFailed), RenderState::Loading);
    }

    #[test]
    fn timeout_abort_returns_to_ready() {
        let mut gate = ready_gate();
        gate.apply(GateEvent::SessionTimeout);
        assert_eq!(gate.apply(GateEvent::SessionTimeoutAborted), RenderState::Ready);
    }

    #[test]
    fn logout_from_ready_or_timeout() {
        let mut gate = ready_gate();
        assert_eq!(gate.apply(GateEvent::Logout), RenderState::LoggedOut);

        let mut gate = ready_gate();
        gate.apply(GateEvent::SessionTimeout);
        assert_eq!(gate.apply(GateEvent::Logout), RenderState::LoggedOut);

        let mut loading = RenderGate::new(true, true);
        assert_eq!(loading.apply(GateEvent::Logout), RenderState::Loading);
    }
}

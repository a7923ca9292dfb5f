//! Route guard for protected surfaces.
//!
//! # Invariants
//! - The guard state is a pure function of the session state; the guard owns
//!   no timers and never polls.
//! - Protected content is produced only for a verified session.

use crate::model::session::{Session, SessionState};
use log::debug;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    /// No provider event yet; render nothing and do not navigate.
    Resolving,
    Unauthenticated,
    Authenticated(Session),
}

impl GuardState {
    pub fn from_session(state: &SessionState) -> Self {
        if state.is_resolving() {
            return Self::Resolving;
        }
        match &state.session {
            Some(session) if session.email_verified => Self::Authenticated(session.clone()),
            _ => Self::Unauthenticated,
        }
    }

    /// Surface to navigate to, if the protected one may not be shown.
    ///
    /// A signed-in but unverified session is sent to the verification
    /// notice rather than the sign-in form.
    pub fn redirect(&self, state: &SessionState) -> Option<Route> {
        match self {
            Self::Resolving | Self::Authenticated(_) => None,
            Self::Unauthenticated => match &state.session {
                Some(session) if !session.email_verified => Some(Route::VerifyEmail),
                _ => Some(Route::SignIn),
            },
        }
    }
}

/// Entry-point surfaces the guard redirects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SignIn,
    VerifyEmail,
}

/// Outcome of gating one protected render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate<T> {
    Placeholder,
    Redirect(Route),
    Protected(T),
}

/// Guard bound to the session store's state channel.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: watch::Receiver<SessionState>,
}

impl RouteGuard {
    pub fn new(session: watch::Receiver<SessionState>) -> Self {
        Self { session }
    }

    pub fn state(&self) -> GuardState {
        GuardState::from_session(&self.session.borrow())
    }

    /// Renders protected content only for a verified session.
    pub fn gate<T>(&self, render: impl FnOnce(&Session) -> T) -> Gate<T> {
        let session = self.session.borrow().clone();
        let state = GuardState::from_session(&session);
        match &state {
            GuardState::Resolving => Gate::Placeholder,
            GuardState::Authenticated(active) => Gate::Protected(render(active)),
            GuardState::Unauthenticated => {
                let route = state.redirect(&session).unwrap_or(Route::SignIn);
                debug!("event=route_guard module=guard status=redirect route={route:?}");
                Gate::Redirect(route)
            }
        }
    }

    /// Waits for the next session event and returns the resulting state.
    ///
    /// Returns `None` once the session store has shut down.
    pub async fn next(&mut self) -> Option<GuardState> {
        self.session.changed().await.ok()?;
        Some(self.state())
    }
}

#[cfg(test)]
mod tests {
    use super::{Gate, GuardState, Route, RouteGuard};
    use crate::backend::IdentityId;
    use crate::model::session::{Session, SessionState};
    use rstest::rstest;
    use tokio::sync::watch;

    fn session(verified: bool) -> Session {
        Session {
            identity_id: IdentityId::new("u1"),
            email: "ana@example.com".to_string(),
            display_name: Some("Ana".to_string()),
            email_verified: verified,
        }
    }

    fn state(initialized: bool, session: Option<Session>) -> SessionState {
        SessionState {
            initialized,
            session,
        }
    }

    #[rstest]
    #[case(state(false, None), Gate::Placeholder)]
    #[case(state(true, None), Gate::Redirect(Route::SignIn))]
    #[case(state(true, Some(session(false))), Gate::Redirect(Route::VerifyEmail))]
    #[case(state(true, Some(session(true))), Gate::Protected("ana@example.com".to_string()))]
    fn gate_follows_session_state(#[case] current: SessionState, #[case] expected: Gate<String>) {
        let (_sender, receiver) = watch::channel(current);
        let guard = RouteGuard::new(receiver);
        assert_eq!(guard.gate(|session| session.email.clone()), expected);
    }

    #[test]
    fn resolving_has_no_redirect() {
        let current = state(false, None);
        assert_eq!(GuardState::from_session(&current), GuardState::Resolving);
        assert_eq!(GuardState::Resolving.redirect(&current), None);
    }
}

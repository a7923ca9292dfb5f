use super::profile::spawn_profile_provisioning;
use crate::backend::{AuthProvider, DocumentStore, Identity, ListenerRegistration};
use crate::error::AuthError;
use crate::model::session::{Session, SessionState};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::watch;

/// Owned session store injected into hooks and the route guard.
///
/// Lifecycle: `start` on app start, updated on every provider event,
/// `shutdown` (or drop) on app teardown.
pub struct SessionStore {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn DocumentStore>,
    state: Arc<watch::Sender<SessionState>>,
    registration: ListenerRegistration,
}

impl SessionStore {
    /// Starts observing provider auth events.
    pub fn start(auth: Arc<dyn AuthProvider>, store: Arc<dyn DocumentStore>) -> Self {
        let (sender, _) = watch::channel(SessionState::default());
        let state = Arc::new(sender);
        let sink = Arc::clone(&state);
        let registration = auth.observe_auth_state(Box::new(move |identity| {
            apply_auth_event(&sink, identity);
        }));
        info!("event=session_observe module=session status=start");

        Self {
            auth,
            store,
            state,
            registration,
        }
    }

    /// Receiver notified on every session change.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    /// `true` until the first provider event has been applied.
    pub fn is_resolving(&self) -> bool {
        self.state.borrow().is_resolving()
    }

    /// Waits for the first provider event.
    pub async fn resolved(&self) -> SessionState {
        let mut receiver = self.watch();
        let state = match receiver.wait_for(|state| state.initialized).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        state
    }

    /// Creates a credential, names it and requests email verification.
    ///
    /// The returned session is unverified until the emailed link is followed.
    /// The profile document is written in the background; its failure does
    /// not fail sign-up.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, AuthError> {
        let identity = self
            .auth
            .create_identity(email, password)
            .await
            .inspect_err(|err| warn!("event=sign_up module=session status=error error={err}"))?;
        self.auth.set_display_name(&identity.id, display_name).await?;
        let identity = Identity {
            display_name: Some(display_name.to_string()),
            ..identity
        };

        self.auth.send_verification(&identity).await;
        spawn_profile_provisioning(Arc::clone(&self.store), &identity, display_name);

        info!(
            "event=sign_up module=session status=ok identity={}",
            identity.id
        );
        Ok(Session::from(identity))
    }

    /// Signs in; unverified identities are signed straight back out.
    ///
    /// # Errors
    /// - `AuthError::EmailNotVerified` after the provider session has been
    ///   terminated.
    /// - Provider errors unchanged.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let identity = self
            .auth
            .authenticate(email, password)
            .await
            .inspect_err(|err| warn!("event=sign_in module=session status=error error={err}"))?;

        if !identity.email_verified {
            self.auth.sign_out().await?;
            warn!(
                "event=sign_in module=session status=rejected identity={} error_code=email_not_verified",
                identity.id
            );
            return Err(AuthError::EmailNotVerified);
        }

        info!(
            "event=sign_in module=session status=ok identity={}",
            identity.id
        );
        Ok(Session::from(identity))
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.auth.sign_out().await?;
        info!("event=sign_out module=session status=ok");
        Ok(())
    }

    /// Stops observing provider events.
    pub fn shutdown(self) {
        self.registration.remove();
        info!("event=session_observe module=session status=stopped");
    }
}

fn apply_auth_event(sink: &watch::Sender<SessionState>, identity: Option<Identity>) {
    debug!(
        "event=auth_state module=session status=ok signed_in={}",
        identity.is_some()
    );
    sink.send_replace(SessionState {
        initialized: true,
        session: identity.map(Session::from),
    });
}

//! Session snapshot mirrored from the auth provider.

use crate::backend::{Identity, IdentityId};
use serde::Serialize;

/// Signed-in identity as seen by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub identity_id: IdentityId,
    pub email: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
}

impl From<Identity> for Session {
    fn from(identity: Identity) -> Self {
        Self {
            identity_id: identity.id,
            email: identity.email,
            display_name: identity.display_name,
            email_verified: identity.email_verified,
        }
    }
}

/// Session store state.
///
/// `initialized` flips to `true` on the first provider event and never
/// returns to `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub initialized: bool,
    pub session: Option<Session>,
}

impl SessionState {
    /// Identity that live queries should be scoped to.
    pub fn identity(&self) -> Option<&IdentityId> {
        self.session.as_ref().map(|session| &session.identity_id)
    }

    pub fn is_resolving(&self) -> bool {
        !self.initialized
    }
}

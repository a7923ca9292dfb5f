//! Best-effort profile document written after sign-up.

use crate::backend::{DocumentStore, FieldValue, Fields, Identity, OWNER_FIELD};
use crate::live_query::codec::{put, CREATED_AT_FIELD, UPDATED_AT_FIELD};
use log::{info, warn};
use std::sync::Arc;

/// Collection holding one profile document per identity, keyed by identity id.
pub const PROFILES_COLLECTION: &str = "users";

fn profile_fields(identity: &Identity, display_name: &str) -> Fields {
    let mut fields = Fields::new();
    put(&mut fields, "uid", &identity.id);
    put(&mut fields, OWNER_FIELD, &identity.id);
    put(&mut fields, "email", identity.email.as_str());
    put(&mut fields, "displayName", display_name);
    put(&mut fields, CREATED_AT_FIELD, FieldValue::ServerTimestamp);
    put(&mut fields, UPDATED_AT_FIELD, FieldValue::ServerTimestamp);
    fields
}

/// Writes the profile document in the background. Failures are logged and
/// never reach the sign-up caller.
pub(crate) fn spawn_profile_provisioning(
    store: Arc<dyn DocumentStore>,
    identity: &Identity,
    display_name: &str,
) {
    let id = identity.id.clone();
    let fields = profile_fields(identity, display_name);
    tokio::spawn(async move {
        match store.set(PROFILES_COLLECTION, id.as_str(), fields).await {
            Ok(()) => info!("event=profile_provision module=session status=ok identity={id}"),
            Err(err) => warn!(
                "event=profile_provision module=session status=error identity={id} error={err}"
            ),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::profile_fields;
    use crate::backend::{FieldValue, Identity, IdentityId};

    #[test]
    fn profile_stamps_owner_and_server_timestamps() {
        let identity = Identity {
            id: IdentityId::new("u1"),
            email: "ada@example.com".to_string(),
            display_name: None,
            email_verified: false,
        };
        let fields = profile_fields(&identity, "Ada");
        assert_eq!(fields.get("ownerId"), Some(&FieldValue::from("u1")));
        assert_eq!(fields.get("displayName"), Some(&FieldValue::from("Ada")));
        assert_eq!(fields.get("createdAt"), Some(&FieldValue::ServerTimestamp));
    }
}

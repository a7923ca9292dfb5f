mod common;

use common::{within, Harness, PASSWORD};
use std::sync::{Arc, Mutex};
use thrivepad_core::backend::{FieldValue, Query, SnapshotResult, OWNER_FIELD};
use thrivepad_core::session::PROFILES_COLLECTION;
use thrivepad_core::AuthError;

#[tokio::test]
async fn store_resolves_to_signed_out_on_first_event() {
    let harness = Harness::new();
    let store = harness.session_store();

    let state = within(store.resolved()).await;
    assert!(state.initialized);
    assert!(state.session.is_none());
    assert!(!store.is_resolving());
}

#[tokio::test]
async fn sign_up_returns_unverified_session_and_requests_verification() {
    let harness = Harness::new();
    let store = harness.session_store();

    let session = store
        .sign_up("ana@example.com", PASSWORD, "Ana")
        .await
        .unwrap();

    assert_eq!(session.email, "ana@example.com");
    assert_eq!(session.display_name.as_deref(), Some("Ana"));
    assert!(!session.email_verified);
    assert_eq!(
        harness
            .backend
            .verification_requests("ana@example.com")
            .unwrap(),
        1
    );
    assert_eq!(
        store.session().map(|current| current.identity_id),
        Some(session.identity_id)
    );
}

#[tokio::test]
async fn sign_up_provisions_profile_document_in_background() {
    let harness = Harness::new();
    let store = harness.session_store();
    let session = store
        .sign_up("ben@example.com", PASSWORD, "Ben")
        .await
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let (ready_tx, mut ready_rx) = tokio::sync::mpsc::unbounded_channel();
    let _registration = harness
        .store()
        .subscribe(
            PROFILES_COLLECTION,
            Query::new().where_eq(OWNER_FIELD, &session.identity_id),
            Box::new(move |snapshot: SnapshotResult| {
                let documents = snapshot.unwrap();
                if !documents.is_empty() {
                    sink.lock().unwrap().extend(documents);
                    let _ = ready_tx.send(());
                }
            }),
        )
        .await
        .unwrap();

    within(ready_rx.recv()).await;
    let profiles = seen.lock().unwrap().clone();
    assert_eq!(profiles[0].id, session.identity_id.as_str());
    assert_eq!(profiles[0].get("displayName"), Some(&FieldValue::from("Ben")));
    assert!(matches!(
        profiles[0].get("createdAt"),
        Some(FieldValue::Timestamp(_))
    ));
}

#[tokio::test]
async fn sign_up_rejections_are_reported() {
    let harness = Harness::new();
    let store = harness.session_store();
    store
        .sign_up("cy@example.com", PASSWORD, "Cy")
        .await
        .unwrap();

    assert_eq!(
        store.sign_up("CY@example.com", PASSWORD, "Cy").await,
        Err(AuthError::EmailAlreadyInUse)
    );
    assert_eq!(
        store.sign_up("dee@example.com", "123", "Dee").await,
        Err(AuthError::WeakPassword)
    );
    assert_eq!(
        store.sign_up("not-an-email", PASSWORD, "Dee").await,
        Err(AuthError::InvalidEmail)
    );
}

#[tokio::test]
async fn unverified_sign_in_ends_the_session() {
    let harness = Harness::new();
    let store = harness.session_store();
    store
        .sign_up("eve@example.com", PASSWORD, "Eve")
        .await
        .unwrap();
    store.sign_out().await.unwrap();

    let result = store.sign_in("eve@example.com", PASSWORD).await;

    assert_eq!(result, Err(AuthError::EmailNotVerified));
    assert!(store.session().is_none());
    assert!(harness.backend.current_identity().is_none());
}

#[tokio::test]
async fn verified_sign_in_publishes_session() {
    let harness = Harness::new();
    let store = harness.session_store();
    store
        .sign_up("fay@example.com", PASSWORD, "Fay")
        .await
        .unwrap();
    harness.backend.verify_email("fay@example.com").unwrap();
    store.sign_out().await.unwrap();
    let mut changes = store.watch();

    let session = store.sign_in("fay@example.com", PASSWORD).await.unwrap();

    assert!(session.email_verified);
    assert!(changes.has_changed().unwrap());
    assert_eq!(changes.borrow_and_update().session.as_ref(), Some(&session));
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
    let harness = Harness::new();
    harness.verified_user("gus@example.com").await;
    let store = harness.session_store();

    assert_eq!(
        store.sign_in("gus@example.com", "wrong-password").await,
        Err(AuthError::InvalidCredentials)
    );
    assert_eq!(
        store.sign_in("nobody@example.com", PASSWORD).await,
        Err(AuthError::InvalidCredentials)
    );
}

#[tokio::test]
async fn sign_out_works_offline() {
    let harness = Harness::new();
    harness.verified_user("hal@example.com").await;
    let store = harness.session_store();
    assert!(store.session().is_some());

    harness.backend.set_offline(true);
    store.sign_out().await.unwrap();

    assert!(store.session().is_none());
}

#[tokio::test]
async fn offline_sign_in_is_a_transport_error() {
    let harness = Harness::new();
    harness.verified_user("ivy@example.com").await;
    let store = harness.session_store();
    store.sign_out().await.unwrap();
    harness.backend.set_offline(true);

    assert!(matches!(
        store.sign_in("ivy@example.com", PASSWORD).await,
        Err(AuthError::Transport(_))
    ));
}

#[tokio::test]
async fn shutdown_removes_the_auth_observer() {
    let harness = Harness::new();
    let store = harness.session_store();
    assert_eq!(harness.backend.active_auth_observers(), 1);

    store.shutdown();

    assert_eq!(harness.backend.active_auth_observers(), 0);
}

//! Identity-scoped live views over one entity collection.
//!
//! # Responsibility
//! - Keep an ordered, decoded view of the signed-in identity's documents.
//! - Follow session changes: close the old subscription, open a new one.
//! - Stamp owner and timestamps on create/update and forward to the store.
//!
//! # Invariants
//! - At most one backend subscription is open per hook instance; the previous
//!   registration is dropped before the next `subscribe` call is issued.
//! - Each snapshot replaces the whole view; stale snapshots from a closed
//!   subscription are discarded with its channel.
//! - After `dispose` (or drop) no snapshot reaches the instance and its
//!   registration has been removed.

pub mod codec;

use crate::backend::{
    Direction, Document, DocumentId, DocumentStore, Fields, IdentityId, ListenerRegistration,
    Query, SnapshotResult, OWNER_FIELD,
};
use crate::error::{DecodeError, StoreError, SyncError, ValidationError};
use crate::model::session::SessionState;
use crate::model::task::{Task, TaskPatch};
use crate::SharedClock;
use codec::{put, CREATED_AT_FIELD, UPDATED_AT_FIELD};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Typed record stored in one synchronized collection.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Author-supplied fields for `create`.
    type Draft: Send;
    /// Partial update for `update`.
    type Patch: Send;

    const COLLECTION: &'static str;
    /// Canonical order field of the live view.
    const ORDER_FIELD: &'static str;
    const ORDER_DIRECTION: Direction;

    fn decode(document: &Document) -> Result<Self, DecodeError>;

    /// Builds the insert payload; owner and timestamps are added by the hook.
    fn encode_draft(draft: Self::Draft) -> Result<Fields, ValidationError>;

    /// Builds the merge payload holding only the fields the patch sets.
    fn encode_patch(patch: Self::Patch) -> Result<Fields, ValidationError>;

    fn id(&self) -> &str;

    fn owner_id(&self) -> &IdentityId;
}

/// Latest decoded view published by a hook.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionView<E> {
    pub records: Vec<E>,
    pub loading: bool,
    /// Listen or decode failure of the current subscription.
    pub error: Option<SyncError>,
}

impl<E> CollectionView<E> {
    fn loading() -> Self {
        Self {
            records: Vec::new(),
            loading: true,
            error: None,
        }
    }

    fn empty() -> Self {
        Self {
            records: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

/// Query every hook issues for `owner`.
pub fn owner_query<E: Entity>(owner: &IdentityId) -> Query {
    Query::new()
        .where_eq(OWNER_FIELD, owner)
        .order_by(E::ORDER_FIELD, E::ORDER_DIRECTION)
}

type RegistrationSlot = Arc<Mutex<Option<ListenerRegistration>>>;

/// Live query hook for one entity kind.
pub struct LiveQuery<E: Entity> {
    session: watch::Receiver<SessionState>,
    store: Arc<dyn DocumentStore>,
    clock: SharedClock,
    view: Arc<watch::Sender<CollectionView<E>>>,
    registration: RegistrationSlot,
    listener: JoinHandle<()>,
}

impl<E: Entity> LiveQuery<E> {
    /// Spawns the listener task on the current tokio runtime.
    pub fn start(
        session: watch::Receiver<SessionState>,
        store: Arc<dyn DocumentStore>,
        clock: SharedClock,
    ) -> Self {
        let (sender, _) = watch::channel(CollectionView::loading());
        let view = Arc::new(sender);
        let registration: RegistrationSlot = Arc::new(Mutex::new(None));

        let listener = tokio::spawn(run_listener::<E>(
            session.clone(),
            Arc::clone(&store),
            Arc::clone(&view),
            Arc::clone(&registration),
        ));

        Self {
            session,
            store,
            clock,
            view,
            registration,
            listener,
        }
    }

    pub fn view(&self) -> CollectionView<E> {
        self.view.borrow().clone()
    }

    pub fn records(&self) -> Vec<E> {
        self.view.borrow().records.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.view.borrow().loading
    }

    pub fn error(&self) -> Option<SyncError> {
        self.view.borrow().error.clone()
    }

    /// Receiver notified on every view replacement.
    pub fn watch(&self) -> watch::Receiver<CollectionView<E>> {
        self.view.subscribe()
    }

    /// Waits for the next view replacement.
    pub async fn changed(&self) -> CollectionView<E> {
        let mut receiver = self.watch();
        let _ = receiver.changed().await;
        let view = receiver.borrow().clone();
        view
    }

    /// Waits until the view satisfies `predicate`, checking the current one
    /// first.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&CollectionView<E>) -> bool,
    ) -> CollectionView<E> {
        let mut receiver = self.watch();
        let view = match receiver.wait_for(|view| predicate(view)).await {
            Ok(view) => view.clone(),
            Err(_) => self.view(),
        };
        view
    }

    /// Inserts a new record owned by the signed-in identity.
    ///
    /// The record reaches the view with the next pushed snapshot; nothing is
    /// injected locally.
    pub async fn create(&self, draft: E::Draft) -> Result<DocumentId, SyncError> {
        let owner = self.require_identity()?;
        let mut fields = E::encode_draft(draft)?;
        let now = self.clock.utc();
        put(&mut fields, OWNER_FIELD, &owner);
        put(&mut fields, CREATED_AT_FIELD, now);
        put(&mut fields, UPDATED_AT_FIELD, now);

        let id = self
            .store
            .insert(E::COLLECTION, fields)
            .await
            .map_err(|err| mutation_failed::<E>("create", None, err))?;
        info!(
            "event=create module=live_query status=ok collection={} id={id}",
            E::COLLECTION
        );
        Ok(id)
    }

    /// Merges `patch` into record `id`; `updatedAt` is always refreshed.
    pub async fn update(&self, id: &str, patch: E::Patch) -> Result<(), SyncError> {
        self.require_identity()?;
        let mut fields = E::encode_patch(patch)?;
        put(&mut fields, UPDATED_AT_FIELD, self.clock.utc());

        self.store
            .merge_update(E::COLLECTION, id, fields)
            .await
            .map_err(|err| mutation_failed::<E>("update", Some(id), err))?;
        info!(
            "event=update module=live_query status=ok collection={} id={id}",
            E::COLLECTION
        );
        Ok(())
    }

    /// Deletes record `id`. Deleting an absent record succeeds.
    pub async fn delete(&self, id: &str) -> Result<(), SyncError> {
        self.require_identity()?;
        self.store
            .remove(E::COLLECTION, id)
            .await
            .map_err(|err| mutation_failed::<E>("delete", Some(id), err))?;
        info!(
            "event=delete module=live_query status=ok collection={} id={id}",
            E::COLLECTION
        );
        Ok(())
    }

    /// Stops the listener and removes the backend subscription.
    pub fn dispose(self) {
        drop(self);
    }

    fn require_identity(&self) -> Result<IdentityId, SyncError> {
        self.session
            .borrow()
            .identity()
            .cloned()
            .ok_or(SyncError::NotAuthenticated)
    }
}

impl LiveQuery<Task> {
    /// Flips a task between completed and pending.
    pub async fn toggle_completion(&self, task: &Task) -> Result<(), SyncError> {
        self.update(&task.id, TaskPatch::status(task.status.toggled()))
            .await
    }
}

impl<E: Entity> Drop for LiveQuery<E> {
    fn drop(&mut self) {
        self.listener.abort();
        replace_registration(&self.registration, None);
        debug!(
            "event=live_query_dispose module=live_query status=ok collection={}",
            E::COLLECTION
        );
    }
}

fn mutation_failed<E: Entity>(operation: &str, id: Option<&str>, err: StoreError) -> SyncError {
    warn!(
        "event={operation} module=live_query status=error collection={} id={} error={err}",
        E::COLLECTION,
        id.unwrap_or("-")
    );
    SyncError::from(err)
}

/// Swaps the active registration; the previous one unregisters after the
/// lock is released.
fn replace_registration(slot: &RegistrationSlot, next: Option<ListenerRegistration>) {
    let previous = {
        let mut guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, next)
    };
    drop(previous);
}

enum ListenerEvent {
    Session { open: bool },
    Snapshot(Option<SnapshotResult>),
}

async fn next_snapshot(
    snapshots: &mut Option<mpsc::UnboundedReceiver<SnapshotResult>>,
) -> Option<SnapshotResult> {
    match snapshots {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

async fn run_listener<E: Entity>(
    mut session: watch::Receiver<SessionState>,
    store: Arc<dyn DocumentStore>,
    view: Arc<watch::Sender<CollectionView<E>>>,
    registration: RegistrationSlot,
) {
    let mut scoped_to: Option<(bool, Option<IdentityId>)> = None;
    let mut snapshots: Option<mpsc::UnboundedReceiver<SnapshotResult>> = None;

    loop {
        let state = session.borrow_and_update().clone();
        let identity = state.identity().cloned();
        let scope = (state.initialized, identity.clone());

        if scoped_to.as_ref() != Some(&scope) {
            replace_registration(&registration, None);
            snapshots = None;
            scoped_to = Some(scope);

            match identity {
                None if state.is_resolving() => {
                    view.send_replace(CollectionView::loading());
                }
                None => {
                    view.send_replace(CollectionView::empty());
                }
                Some(owner) => {
                    view.send_replace(CollectionView::loading());
                    snapshots = open_subscription::<E>(&store, &owner, &view, &registration).await;
                }
            }
        }

        let event = tokio::select! {
            changed = session.changed() => ListenerEvent::Session { open: changed.is_ok() },
            snapshot = next_snapshot(&mut snapshots) => ListenerEvent::Snapshot(snapshot),
        };

        match event {
            ListenerEvent::Session { open: true } => {}
            ListenerEvent::Session { open: false } => {
                replace_registration(&registration, None);
                return;
            }
            ListenerEvent::Snapshot(Some(snapshot)) => {
                if let Some((_, Some(owner))) = &scoped_to {
                    apply_snapshot(&view, owner, snapshot);
                }
            }
            ListenerEvent::Snapshot(None) => {
                // The backend dropped the listener; wait for the next session event.
                snapshots = None;
            }
        }
    }
}

async fn open_subscription<E: Entity>(
    store: &Arc<dyn DocumentStore>,
    owner: &IdentityId,
    view: &watch::Sender<CollectionView<E>>,
    registration: &RegistrationSlot,
) -> Option<mpsc::UnboundedReceiver<SnapshotResult>> {
    let (sender, receiver) = mpsc::unbounded_channel();
    let listener = Box::new(move |snapshot: SnapshotResult| {
        let _ = sender.send(snapshot);
    });

    match store
        .subscribe(E::COLLECTION, owner_query::<E>(owner), listener)
        .await
    {
        Ok(handle) => {
            replace_registration(registration, Some(handle));
            info!(
                "event=live_query_subscribe module=live_query status=ok collection={} identity={owner}",
                E::COLLECTION
            );
            Some(receiver)
        }
        Err(err) => {
            warn!(
                "event=live_query_subscribe module=live_query status=error collection={} identity={owner} error={err}",
                E::COLLECTION
            );
            view.send_replace(CollectionView {
                records: Vec::new(),
                loading: false,
                error: Some(SyncError::from(err)),
            });
            None
        }
    }
}

/// Replaces the view with `snapshot`, keeping only records owned by `owner`.
fn apply_snapshot<E: Entity>(
    view: &watch::Sender<CollectionView<E>>,
    owner: &IdentityId,
    snapshot: SnapshotResult,
) {
    let decoded = snapshot
        .map_err(SyncError::from)
        .and_then(|documents| {
            documents
                .iter()
                .map(E::decode)
                .collect::<Result<Vec<_>, _>>()
                .map_err(SyncError::from)
        });

    match decoded {
        Ok(mut records) => {
            records.retain(|record| {
                let owned = record.owner_id() == owner;
                if !owned {
                    warn!(
                        "event=snapshot module=live_query status=skipped collection={} id={} reason=foreign_owner",
                        E::COLLECTION,
                        record.id()
                    );
                }
                owned
            });
            debug!(
                "event=snapshot module=live_query status=ok collection={} count={}",
                E::COLLECTION,
                records.len()
            );
            view.send_replace(CollectionView {
                records,
                loading: false,
                error: None,
            });
        }
        Err(err) => {
            warn!(
                "event=snapshot module=live_query status=error collection={} error={err}",
                E::COLLECTION
            );
            view.send_modify(|current| {
                current.loading = false;
                current.error = Some(err);
            });
        }
    }
}

//! In-process reference backend persisted in SQLite.
//!
//! # Responsibility
//! - Implement `AuthProvider` and `DocumentStore` without a hosted service.
//! - Enforce the same access rules a hosted backend applies per identity.
//! - Push full ordered snapshots to live listeners after every write.
//!
//! # Invariants
//! - Exactly one identity is signed in at a time (process-wide session).
//! - Every data call fails with a transport error while offline.
//! - Change notifications run with no internal lock held. The initial
//!   snapshot of a subscription is delivered under the database lock, so no
//!   write can commit between it and the listener's registration.

mod auth;
mod listeners;
mod store;

use crate::backend::{Identity, Query, SnapshotResult};
use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::error::StoreError;
use crate::SharedClock;
use listeners::ListenerSet;
use rusqlite::Connection;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) const OFFLINE_MESSAGE: &str = "local backend is offline";

/// SQLite-backed auth + document backend.
///
/// Cloning is cheap; clones share the same database and session.
#[derive(Clone)]
pub struct LocalBackend {
    inner: Arc<Inner>,
}

struct Inner {
    conn: Mutex<Connection>,
    clock: SharedClock,
    current: Mutex<Option<Identity>>,
    offline: AtomicBool,
    auth_listeners: ListenerSet<(), Option<Identity>>,
    query_listeners: ListenerSet<(String, Query), SnapshotResult>,
}

impl LocalBackend {
    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>, clock: SharedClock) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?, clock))
    }

    /// Opens a fresh in-memory database.
    pub fn in_memory(clock: SharedClock) -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?, clock))
    }

    fn from_connection(conn: Connection, clock: SharedClock) -> Self {
        Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(conn),
                clock,
                current: Mutex::new(None),
                offline: AtomicBool::new(false),
                auth_listeners: ListenerSet::new(),
                query_listeners: ListenerSet::new(),
            }),
        }
    }

    /// Simulates losing (or regaining) connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Identity currently signed in, if any.
    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.current_identity()
    }

    /// Number of live document listeners.
    pub fn active_subscriptions(&self) -> usize {
        self.inner.query_listeners.len()
    }

    /// Number of live auth-state listeners.
    pub fn active_auth_observers(&self) -> usize {
        self.inner.auth_listeners.len()
    }
}

impl Inner {
    fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("database lock poisoned".to_string()))
    }

    fn current_identity(&self) -> Option<Identity> {
        self.lock_current().clone()
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<Identity>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the signed-in identity and notifies observers on change.
    fn set_current(&self, next: Option<Identity>) {
        {
            let mut current = self.lock_current();
            if *current == next {
                return;
            }
            current.clone_from(&next);
        }
        for (_, listener) in self.auth_listeners.matching(|_| true) {
            listener(next.clone());
        }
    }
}

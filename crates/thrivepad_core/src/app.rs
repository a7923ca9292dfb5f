//! Application wiring: one session store shared by the hooks and the guard.
//!
//! # Invariants
//! - Every hook and the guard observe the same session channel.
//! - `shutdown` disposes hooks before the session observer.

use crate::backend::local::LocalBackend;
use crate::backend::{AuthProvider, DocumentStore};
use crate::guard::RouteGuard;
use crate::live_query::LiveQuery;
use crate::model::goal::Goal;
use crate::model::journal::JournalEntry;
use crate::model::task::Task;
use crate::service::dashboard::Overview;
use crate::session::SessionStore;
use crate::SharedClock;
use log::info;
use std::sync::Arc;

pub struct AppContext {
    pub session: SessionStore,
    pub goals: LiveQuery<Goal>,
    pub tasks: LiveQuery<Task>,
    pub journal: LiveQuery<JournalEntry>,
    pub guard: RouteGuard,
    clock: SharedClock,
}

impl AppContext {
    /// Starts the session observer and the three live hooks.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn DocumentStore>,
        clock: SharedClock,
    ) -> Self {
        let session = SessionStore::start(auth, Arc::clone(&store));
        let goals = LiveQuery::start(session.watch(), Arc::clone(&store), Arc::clone(&clock));
        let tasks = LiveQuery::start(session.watch(), Arc::clone(&store), Arc::clone(&clock));
        let journal = LiveQuery::start(session.watch(), store, Arc::clone(&clock));
        let guard = RouteGuard::new(session.watch());
        info!("event=app_context module=app status=start");

        Self {
            session,
            goals,
            tasks,
            journal,
            guard,
            clock,
        }
    }

    /// Wires the context to a local backend serving both capabilities.
    pub fn with_local_backend(backend: LocalBackend, clock: SharedClock) -> Self {
        let auth: Arc<dyn AuthProvider> = Arc::new(backend.clone());
        let store: Arc<dyn DocumentStore> = Arc::new(backend);
        Self::start(auth, store, clock)
    }

    /// Dashboard figures over the current views.
    pub fn overview(&self) -> Overview {
        Overview::compute(
            &self.goals.records(),
            &self.tasks.records(),
            &self.journal.records(),
            self.clock.utc(),
        )
    }

    pub fn shutdown(self) {
        let Self {
            session,
            goals,
            tasks,
            journal,
            guard,
            clock: _,
        } = self;
        goals.dispose();
        tasks.dispose();
        journal.dispose();
        drop(guard);
        session.shutdown();
        info!("event=app_context module=app status=stopped");
    }
}

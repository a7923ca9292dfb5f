//! Realtime sync core for ThrivePad.
//!
//! Session tracking, identity-scoped live collections of goals, tasks and
//! journal entries, and the route guard that gates protected surfaces. The
//! backend is reached only through the `backend` traits.

pub mod app;
pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod live_query;
pub mod logging;
pub mod model;
pub mod mutation;
pub mod service;
pub mod session;

use std::sync::Arc;

/// Injected source of "now" for stamps and date-relative views.
pub type SharedClock = Arc<dyn mockable::Clock + Send + Sync>;

pub use app::AppContext;
pub use backend::local::LocalBackend;
pub use backend::{AuthProvider, DocumentStore, Identity, IdentityId, ListenerRegistration};
pub use config::AppConfig;
pub use error::{AuthError, DecodeError, StoreError, SyncError, ValidationError};
pub use guard::{Gate, GuardState, Route, RouteGuard};
pub use live_query::{CollectionView, Entity, LiveQuery};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::goal::{Goal, GoalCategory, GoalDraft, GoalPatch, GoalStatus};
pub use model::journal::{JournalDraft, JournalEntry, JournalPatch, Mood};
pub use model::session::{Session, SessionState};
pub use model::task::{Task, TaskDraft, TaskPatch, TaskPriority, TaskStatus};
pub use mutation::{run_optimistic, MutationOutcome, PendingMutation};
pub use session::SessionStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Session store: single source of truth for who is signed in.
//!
//! # Responsibility
//! - Mirror provider auth events into an observable `SessionState`.
//! - Expose sign-up, sign-in (verified email only) and sign-out.
//! - Provision the user profile document after sign-up, best-effort.
//!
//! # Invariants
//! - State changes only in response to provider events, in emission order.
//! - `initialized` is `false` until the first provider event arrives.
//! - An unverified sign-in never leaves a session behind.

mod profile;
mod store;

pub use profile::PROFILES_COLLECTION;
pub use store::SessionStore;

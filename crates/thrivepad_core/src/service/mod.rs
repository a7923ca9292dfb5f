//! Read-side use-cases over live views.
//!
//! # Responsibility
//! - Derive dashboard figures and list filters from decoded records.
//! - Stay pure: no backend calls, "now" is always passed in.

pub mod dashboard;
pub mod filters;

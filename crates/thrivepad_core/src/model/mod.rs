//! Domain model for the synchronized collections and the session.
//!
//! # Responsibility
//! - Define typed records decoded from live snapshots.
//! - Define drafts (create input) and patches (partial update input).
//!
//! # Invariants
//! - Every record carries the identity that owns it.
//! - Patches only name known fields; arbitrary key/value bags are not
//!   accepted.

use crate::error::ValidationError;

pub mod goal;
pub mod journal;
pub mod session;
pub mod task;

/// Trims `value` and rejects it when nothing is left.
pub(crate) fn require_text(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if trimmed.len() == value.len() {
        Ok(value)
    } else {
        Ok(trimmed.to_string())
    }
}

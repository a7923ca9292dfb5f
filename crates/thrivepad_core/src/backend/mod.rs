//! Backend contract consumed by the session store and live query hooks.
//!
//! # Responsibility
//! - Define the capability set expected from any auth + document backend.
//! - Keep hosted-product details out of the core.
//!
//! # Invariants
//! - Listeners only receive values; they must not call back into the backend.
//! - Dropping a `ListenerRegistration` unregisters the listener before `drop`
//!   returns; a delivery already in flight may still complete.
//! - Access rules (ownership, existence) are enforced by the backend, not by
//!   callers.

pub mod document;
pub mod local;

use crate::error::{AuthError, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

pub use document::{Document, DocumentId, FieldValue, Fields, Timestamp};

/// Field carrying the owning identity on every user-owned document.
pub const OWNER_FIELD: &str = "ownerId";

/// Stable identifier of one authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IdentityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&IdentityId> for FieldValue {
    fn from(value: &IdentityId) -> Self {
        Self::String(value.0.clone())
    }
}

/// Identity as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: IdentityId,
    pub email: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
}

/// Sort direction for ordered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Single-field ordering applied by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Equality constraint on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub value: FieldValue,
}

/// Filtered, ordered collection query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Returns the identity this query is scoped to, if it filters on owner.
    pub fn owner_scope(&self) -> Option<&str> {
        self.filters
            .iter()
            .find(|filter| filter.field == OWNER_FIELD)
            .and_then(|filter| filter.value.as_str())
    }

    /// Whether one field bag satisfies filters and carries the order field.
    ///
    /// Documents without the order field are excluded, as hosted stores do.
    pub fn matches(&self, fields: &Fields) -> bool {
        let filters_hold = self
            .filters
            .iter()
            .all(|filter| fields.get(&filter.field) == Some(&filter.value));
        let has_order_field = self
            .order_by
            .as_ref()
            .map_or(true, |order| fields.contains_key(&order.field));
        filters_hold && has_order_field
    }

    /// Sorts matching documents by the order field, ties broken by id.
    pub fn sort(&self, documents: &mut [Document]) {
        let Some(order) = &self.order_by else {
            documents.sort_by(|a, b| a.id.cmp(&b.id));
            return;
        };
        documents.sort_by(|a, b| {
            let ordering = match (a.get(&order.field), b.get(&order.field)) {
                (Some(left), Some(right)) => left.order_cmp(right),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ordering = match order.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            };
            ordering.then_with(|| a.id.cmp(&b.id))
        });
    }
}

/// Callback invoked by the backend for every pushed value.
pub type Listener<T> = Box<dyn Fn(T) + Send + Sync>;

/// Full result set of one subscription, or the listen failure.
pub type SnapshotResult = Result<Vec<Document>, StoreError>;

/// Handle returned by every `observe`/`subscribe` call.
///
/// Dropping the handle unregisters the listener.
#[must_use = "dropping the registration unsubscribes immediately"]
pub struct ListenerRegistration {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ListenerRegistration {
    pub fn new(remove: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    /// Unregisters the listener now.
    pub fn remove(mut self) {
        self.unregister();
    }

    fn unregister(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl std::fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

/// Authentication capability set.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Signs in with email/password; the identity becomes the current one.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Creates a credential and signs it in.
    async fn create_identity(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Dispatches a verification message. Fire-and-forget.
    async fn send_verification(&self, identity: &Identity);

    async fn set_display_name(&self, id: &IdentityId, name: &str) -> Result<(), AuthError>;

    /// Ends the current session, if any.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Registers an auth-state listener.
    ///
    /// The listener receives the current state on registration and then every
    /// change, in emission order.
    fn observe_auth_state(&self, listener: Listener<Option<Identity>>) -> ListenerRegistration;
}

/// Document database capability set.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Opens a live query. The listener receives a full snapshot on
    /// registration and after every change to the collection.
    async fn subscribe(
        &self,
        collection: &str,
        query: Query,
        listener: Listener<SnapshotResult>,
    ) -> Result<ListenerRegistration, StoreError>;

    async fn insert(&self, collection: &str, fields: Fields) -> Result<DocumentId, StoreError>;

    /// Creates or replaces one document under a caller-chosen id.
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Merges `fields` into an existing document.
    async fn merge_update(&self, collection: &str, id: &str, fields: Fields)
        -> Result<(), StoreError>;

    /// Deletes one document; deleting a missing id is not an error.
    async fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::{Direction, Document, FieldValue, Fields, Query, OWNER_FIELD};

    fn doc(id: &str, owner: &str, rank: Option<i64>) -> Document {
        let mut fields = Fields::new();
        fields.insert(OWNER_FIELD.to_string(), FieldValue::from(owner));
        if let Some(rank) = rank {
            fields.insert("rank".to_string(), FieldValue::Integer(rank));
        }
        Document::new(id, fields)
    }

    #[test]
    fn query_filters_on_owner_and_requires_order_field() {
        let query = Query::new()
            .where_eq(OWNER_FIELD, "u1")
            .order_by("rank", Direction::Ascending);
        assert!(query.matches(&doc("a", "u1", Some(1)).fields));
        assert!(!query.matches(&doc("b", "u2", Some(1)).fields));
        assert!(!query.matches(&doc("c", "u1", None).fields));
        assert_eq!(query.owner_scope(), Some("u1"));
    }

    #[test]
    fn query_sorts_descending_with_id_tie_break() {
        let query = Query::new().order_by("rank", Direction::Descending);
        let mut docs = vec![
            doc("b", "u1", Some(1)),
            doc("c", "u1", Some(3)),
            doc("a", "u1", Some(1)),
        ];
        query.sort(&mut docs);
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}

//! Document model shared by every backend adapter.
//!
//! # Responsibility
//! - Represent schemaless documents as typed field bags.
//! - Carry the server-timestamp write sentinel and its resolved form.
//! - Define the total order used by ordered queries.
//!
//! # Invariants
//! - `FieldValue::ServerTimestamp` is only valid in write payloads; stores
//!   resolve it to `FieldValue::Timestamp` before persisting.
//! - Ordering across value kinds follows the rank
//!   `null < bool < integer < timestamp < string < array`.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Backend-assigned document identifier.
pub type DocumentId = String;

/// Field bag of one document, keyed by storage field name.
pub type Fields = BTreeMap<String, FieldValue>;

/// Storage representation of a point in time.
///
/// Mirrors the seconds/nanos split used by hosted document stores so adapters
/// can map it without loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn from_date_time(value: DateTime<Utc>) -> Self {
        Self {
            seconds: value.timestamp(),
            nanos: value.timestamp_subsec_nanos(),
        }
    }

    /// Converts back to a UTC date, `None` when out of chrono's range.
    pub fn to_date_time(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanos).single()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_date_time(value)
    }
}

/// One typed field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    String(String),
    Timestamp(Timestamp),
    Array(Vec<FieldValue>),
    /// Write-time sentinel replaced by the store's clock on commit.
    ServerTimestamp,
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) => 2,
            // Unresolved sentinels only appear in write payloads; rank them
            // with timestamps so a stray one still sorts deterministically.
            Self::Timestamp(_) | Self::ServerTimestamp => 3,
            Self::String(_) => 4,
            Self::Array(_) => 5,
        }
    }

    /// Total order used by `Query::order_by`.
    pub fn order_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Array(a), Self::Array(b)) => {
                for (left, right) in a.iter().zip(b.iter()) {
                    let ordering = left.order_cmp(right);
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(Timestamp::from_date_time(value))
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One stored document as delivered in snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }
}

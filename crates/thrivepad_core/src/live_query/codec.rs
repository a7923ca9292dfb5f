//! Typed field access for decoding documents and building write payloads.
//!
//! # Invariants
//! - A missing field and an explicit `null` are treated the same way.
//! - Decoders never panic on malformed documents; they return `DecodeError`.

use crate::backend::{Document, FieldValue, Fields, IdentityId, OWNER_FIELD};
use crate::error::DecodeError;
use chrono::{DateTime, Utc};

/// Storage name of the creation stamp.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Storage name of the last-mutation stamp.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Read-only typed view over one document's fields.
pub struct FieldReader<'a> {
    document: &'a Document,
}

impl<'a> FieldReader<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    fn value(&self, field: &'static str) -> Option<&'a FieldValue> {
        self.document.get(field).filter(|value| !value.is_null())
    }

    fn missing(&self, field: &'static str) -> DecodeError {
        DecodeError::MissingField {
            id: self.document.id.clone(),
            field,
        }
    }

    fn invalid(&self, field: &'static str, message: impl Into<String>) -> DecodeError {
        DecodeError::InvalidField {
            id: self.document.id.clone(),
            field,
            message: message.into(),
        }
    }

    pub fn owner(&self) -> Result<IdentityId, DecodeError> {
        self.string(OWNER_FIELD).map(IdentityId::new)
    }

    pub fn string(&self, field: &'static str) -> Result<String, DecodeError> {
        self.optional_string(field)?
            .ok_or_else(|| self.missing(field))
    }

    /// Text field that older documents may omit.
    pub fn string_or_empty(&self, field: &'static str) -> Result<String, DecodeError> {
        Ok(self.optional_string(field)?.unwrap_or_default())
    }

    pub fn optional_string(&self, field: &'static str) -> Result<Option<String>, DecodeError> {
        match self.value(field) {
            None => Ok(None),
            Some(FieldValue::String(value)) => Ok(Some(value.clone())),
            Some(other) => Err(self.invalid(field, format!("expected string, got {other:?}"))),
        }
    }

    pub fn bool_or(&self, field: &'static str, default: bool) -> Result<bool, DecodeError> {
        match self.value(field) {
            None => Ok(default),
            Some(FieldValue::Boolean(value)) => Ok(*value),
            Some(other) => Err(self.invalid(field, format!("expected boolean, got {other:?}"))),
        }
    }

    pub fn integer_or(&self, field: &'static str, default: i64) -> Result<i64, DecodeError> {
        match self.value(field) {
            None => Ok(default),
            Some(FieldValue::Integer(value)) => Ok(*value),
            Some(other) => Err(self.invalid(field, format!("expected integer, got {other:?}"))),
        }
    }

    pub fn date(&self, field: &'static str) -> Result<DateTime<Utc>, DecodeError> {
        self.optional_date(field)?
            .ok_or_else(|| self.missing(field))
    }

    /// Absent or null timestamps decode to `None`.
    pub fn optional_date(
        &self,
        field: &'static str,
    ) -> Result<Option<DateTime<Utc>>, DecodeError> {
        match self.value(field) {
            None | Some(FieldValue::ServerTimestamp) => Ok(None),
            Some(FieldValue::Timestamp(stamp)) => stamp
                .to_date_time()
                .map(Some)
                .ok_or_else(|| self.invalid(field, "timestamp out of range")),
            Some(other) => Err(self.invalid(field, format!("expected timestamp, got {other:?}"))),
        }
    }

    pub fn string_list(&self, field: &'static str) -> Result<Vec<String>, DecodeError> {
        match self.value(field) {
            None => Ok(Vec::new()),
            Some(FieldValue::Array(items)) => items
                .iter()
                .map(|item| match item {
                    FieldValue::String(value) => Ok(value.clone()),
                    other => Err(self.invalid(field, format!("expected string item, got {other:?}"))),
                })
                .collect(),
            Some(other) => Err(self.invalid(field, format!("expected array, got {other:?}"))),
        }
    }

    /// Decodes a string-backed enum with `parse`.
    pub fn enumerated<T>(
        &self,
        field: &'static str,
        parse: fn(&str) -> Option<T>,
    ) -> Result<T, DecodeError> {
        self.optional_enumerated(field, parse)?
            .ok_or_else(|| self.missing(field))
    }

    pub fn optional_enumerated<T>(
        &self,
        field: &'static str,
        parse: fn(&str) -> Option<T>,
    ) -> Result<Option<T>, DecodeError> {
        match self.optional_string(field)? {
            None => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| self.invalid(field, format!("unknown value `{raw}`"))),
        }
    }
}

/// Inserts one field into a write payload.
pub fn put(fields: &mut Fields, field: &str, value: impl Into<FieldValue>) {
    fields.insert(field.to_string(), value.into());
}

/// Inserts one field only when the patch carries it.
pub fn put_some<T: Into<FieldValue>>(fields: &mut Fields, field: &str, value: Option<T>) {
    if let Some(value) = value {
        put(fields, field, value);
    }
}

pub fn string_array<'a>(values: impl IntoIterator<Item = &'a String>) -> FieldValue {
    FieldValue::Array(values.into_iter().cloned().map(FieldValue::String).collect())
}

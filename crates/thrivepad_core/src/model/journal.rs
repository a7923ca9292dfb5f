//! Journal entries, drafts and patches.
//!
//! # Invariants
//! - Tags form a set: trimmed, non-empty, deduplicated.
//! - New entries are private unless the author opts out.

use crate::backend::{Direction, Document, DocumentId, FieldValue, Fields, IdentityId};
use crate::error::{DecodeError, ValidationError};
use crate::live_query::codec::{
    put, put_some, string_array, FieldReader, CREATED_AT_FIELD, UPDATED_AT_FIELD,
};
use crate::live_query::Entity;
use crate::model::require_text;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const JOURNAL_COLLECTION: &str = "journal";

const TITLE: &str = "title";
const CONTENT: &str = "content";
const TAGS: &str = "tags";
const MOOD: &str = "mood";
const IS_PRIVATE: &str = "isPrivate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Great,
    Good,
    Okay,
    Bad,
    Terrible,
}

impl Mood {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Great => "great",
            Self::Good => "good",
            Self::Okay => "okay",
            Self::Bad => "bad",
            Self::Terrible => "terrible",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "great" => Some(Self::Great),
            "good" => Some(Self::Good),
            "okay" => Some(Self::Okay),
            "bad" => Some(Self::Bad),
            "terrible" => Some(Self::Terrible),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    pub id: DocumentId,
    pub owner_id: IdentityId,
    pub title: String,
    pub content: String,
    pub tags: BTreeSet<String>,
    pub mood: Option<Mood>,
    pub is_private: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalDraft {
    pub title: String,
    pub content: String,
    pub tags: BTreeSet<String>,
    pub mood: Option<Mood>,
    pub is_private: bool,
}

impl JournalDraft {
    /// Private, untagged entry without mood.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            tags: BTreeSet::new(),
            mood: None,
            is_private: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Replaces the whole tag set.
    pub tags: Option<BTreeSet<String>>,
    pub mood: Option<Option<Mood>>,
    pub is_private: Option<bool>,
}

/// Normalizes free-form tags into a set.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| tag.as_ref().trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Parses comma-separated tag input, e.g. `"work, focus ,,"`.
pub fn parse_tag_list(input: &str) -> BTreeSet<String> {
    normalize_tags(input.split(','))
}

impl Entity for JournalEntry {
    type Draft = JournalDraft;
    type Patch = JournalPatch;

    const COLLECTION: &'static str = JOURNAL_COLLECTION;
    const ORDER_FIELD: &'static str = CREATED_AT_FIELD;
    const ORDER_DIRECTION: Direction = Direction::Descending;

    fn decode(document: &Document) -> Result<Self, DecodeError> {
        let reader = FieldReader::new(document);
        Ok(Self {
            id: document.id.clone(),
            owner_id: reader.owner()?,
            title: reader.string(TITLE)?,
            content: reader.string_or_empty(CONTENT)?,
            tags: normalize_tags(reader.string_list(TAGS)?),
            mood: reader.optional_enumerated(MOOD, Mood::parse)?,
            is_private: reader.bool_or(IS_PRIVATE, true)?,
            created_at: reader.optional_date(CREATED_AT_FIELD)?,
            updated_at: reader.optional_date(UPDATED_AT_FIELD)?,
        })
    }

    fn encode_draft(draft: JournalDraft) -> Result<Fields, ValidationError> {
        let mut fields = Fields::new();
        put(&mut fields, TITLE, require_text(TITLE, draft.title)?);
        put(&mut fields, CONTENT, draft.content);
        put(&mut fields, TAGS, string_array(&normalize_tags(&draft.tags)));
        put(&mut fields, MOOD, draft.mood.map(Mood::as_str));
        put(&mut fields, IS_PRIVATE, draft.is_private);
        Ok(fields)
    }

    fn encode_patch(patch: JournalPatch) -> Result<Fields, ValidationError> {
        let mut fields = Fields::new();
        if let Some(title) = patch.title {
            put(&mut fields, TITLE, require_text(TITLE, title)?);
        }
        put_some(&mut fields, CONTENT, patch.content);
        put_some(
            &mut fields,
            TAGS,
            patch.tags.map(|tags| string_array(&normalize_tags(&tags))),
        );
        put_some(
            &mut fields,
            MOOD,
            patch.mood.map(|mood| FieldValue::from(mood.map(Mood::as_str))),
        );
        put_some(&mut fields, IS_PRIVATE, patch.is_private);
        Ok(fields)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &IdentityId {
        &self.owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_tags, parse_tag_list, JournalDraft, JournalEntry, Mood};
    use crate::backend::{Document, FieldValue, OWNER_FIELD};
    use crate::live_query::Entity;

    #[test]
    fn tag_input_is_trimmed_and_deduplicated() {
        let tags = parse_tag_list(" work, focus ,,work ");
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["focus", "work"]);
    }

    #[test]
    fn drafts_default_to_private() {
        assert!(JournalDraft::new("Day one", "").is_private);
    }

    #[test]
    fn absent_mood_and_privacy_decode_to_defaults() {
        let mut draft = JournalDraft::new("Walk", "Long walk by the river");
        draft.tags = normalize_tags(["outdoors"]);
        let mut fields = JournalEntry::encode_draft(draft).unwrap();
        fields.remove("isPrivate");
        fields.insert(OWNER_FIELD.to_string(), FieldValue::from("u1"));

        let entry = JournalEntry::decode(&Document::new("j1", fields)).unwrap();
        assert_eq!(entry.mood, None);
        assert!(entry.is_private);
        assert!(entry.tags.contains("outdoors"));
    }

    #[test]
    fn mood_wire_names_parse() {
        assert_eq!(Mood::parse("great"), Some(Mood::Great));
        assert_eq!(Mood::parse("meh"), None);
    }
}

//! Goal records, drafts and patches.
//!
//! # Invariants
//! - `progress` is always within `0..=100`; inputs are clamped on write and
//!   stored values are clamped again on read.
//! - `title` is never blank.

use crate::backend::{Direction, Document, DocumentId, Fields, IdentityId};
use crate::error::{DecodeError, ValidationError};
use crate::live_query::codec::{put, put_some, FieldReader, CREATED_AT_FIELD, UPDATED_AT_FIELD};
use crate::live_query::Entity;
use crate::model::require_text;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const GOALS_COLLECTION: &str = "goals";

const TITLE: &str = "title";
const DESCRIPTION: &str = "description";
const CATEGORY: &str = "category";
const TARGET_DATE: &str = "targetDate";
const PROGRESS: &str = "progress";
const STATUS: &str = "status";

const MAX_PROGRESS: u8 = 100;

/// Life area a goal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalCategory {
    Personal,
    Professional,
    Health,
    Learning,
    Finance,
    Relationships,
}

impl GoalCategory {
    pub const ALL: [Self; 6] = [
        Self::Personal,
        Self::Professional,
        Self::Health,
        Self::Learning,
        Self::Finance,
        Self::Relationships,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "Personal",
            Self::Professional => "Professional",
            Self::Health => "Health",
            Self::Learning => "Learning",
            Self::Finance => "Finance",
            Self::Relationships => "Relationships",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
    }
}

/// Goal lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalStatus {
    NotStarted,
    InProgress,
    Completed,
    Paused,
}

impl GoalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Paused => "paused",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not-started" => Some(Self::NotStarted),
            "in-progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }
}

/// Goal as decoded from the live collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Goal {
    pub id: DocumentId,
    pub owner_id: IdentityId,
    pub title: String,
    pub description: String,
    pub category: GoalCategory,
    pub target_date: DateTime<Utc>,
    pub progress: u8,
    pub status: GoalStatus,
    /// `None` only while a server-assigned stamp is pending.
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields supplied by the author when creating a goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalDraft {
    pub title: String,
    pub description: String,
    pub category: GoalCategory,
    pub target_date: DateTime<Utc>,
    /// Clamped into `0..=100` on write.
    pub progress: i64,
    pub status: GoalStatus,
}

impl GoalDraft {
    /// New goal with no progress, not started.
    pub fn new(
        title: impl Into<String>,
        category: GoalCategory,
        target_date: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category,
            target_date,
            progress: 0,
            status: GoalStatus::NotStarted,
        }
    }
}

/// Partial goal update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<GoalCategory>,
    pub target_date: Option<DateTime<Utc>>,
    pub progress: Option<i64>,
    pub status: Option<GoalStatus>,
}

/// Clamps raw progress input into `0..=100`.
pub fn clamp_progress(value: i64) -> u8 {
    u8::try_from(value.clamp(0, i64::from(MAX_PROGRESS))).unwrap_or(MAX_PROGRESS)
}

impl Entity for Goal {
    type Draft = GoalDraft;
    type Patch = GoalPatch;

    const COLLECTION: &'static str = GOALS_COLLECTION;
    const ORDER_FIELD: &'static str = CREATED_AT_FIELD;
    const ORDER_DIRECTION: Direction = Direction::Descending;

    fn decode(document: &Document) -> Result<Self, DecodeError> {
        let reader = FieldReader::new(document);
        Ok(Self {
            id: document.id.clone(),
            owner_id: reader.owner()?,
            title: reader.string(TITLE)?,
            description: reader.string_or_empty(DESCRIPTION)?,
            category: reader.enumerated(CATEGORY, GoalCategory::parse)?,
            target_date: reader.date(TARGET_DATE)?,
            progress: clamp_progress(reader.integer_or(PROGRESS, 0)?),
            status: reader.enumerated(STATUS, GoalStatus::parse)?,
            created_at: reader.optional_date(CREATED_AT_FIELD)?,
            updated_at: reader.optional_date(UPDATED_AT_FIELD)?,
        })
    }

    fn encode_draft(draft: GoalDraft) -> Result<Fields, ValidationError> {
        let mut fields = Fields::new();
        put(&mut fields, TITLE, require_text(TITLE, draft.title)?);
        put(&mut fields, DESCRIPTION, draft.description);
        put(&mut fields, CATEGORY, draft.category.as_str());
        put(&mut fields, TARGET_DATE, draft.target_date);
        put(&mut fields, PROGRESS, i64::from(clamp_progress(draft.progress)));
        put(&mut fields, STATUS, draft.status.as_str());
        Ok(fields)
    }

    fn encode_patch(patch: GoalPatch) -> Result<Fields, ValidationError> {
        let mut fields = Fields::new();
        if let Some(title) = patch.title {
            put(&mut fields, TITLE, require_text(TITLE, title)?);
        }
        put_some(&mut fields, DESCRIPTION, patch.description);
        put_some(&mut fields, CATEGORY, patch.category.map(GoalCategory::as_str));
        put_some(&mut fields, TARGET_DATE, patch.target_date);
        put_some(
            &mut fields,
            PROGRESS,
            patch.progress.map(|value| i64::from(clamp_progress(value))),
        );
        put_some(&mut fields, STATUS, patch.status.map(GoalStatus::as_str));
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
    use super::{clamp_progress, Goal, GoalCategory, GoalDraft, GoalPatch, GoalStatus};
    use crate::backend::FieldValue;
    use crate::error::ValidationError;
    use crate::live_query::Entity;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    #[rstest]
    #[case(-5, 0)]
    #[case(0, 0)]
    #[case(42, 42)]
    #[case(100, 100)]
    #[case(150, 100)]
    fn progress_is_clamped(#[case] input: i64, #[case] expected: u8) {
        assert_eq!(clamp_progress(input), expected);
    }

    #[test]
    fn categories_round_trip_through_wire_names() {
        for category in GoalCategory::ALL {
            assert_eq!(GoalCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(GoalStatus::parse("in-progress"), Some(GoalStatus::InProgress));
        assert_eq!(GoalStatus::parse("In Progress"), None);
    }

    #[test]
    fn patch_only_carries_set_fields() {
        let fields = Goal::encode_patch(GoalPatch {
            progress: Some(150),
            ..GoalPatch::default()
        })
        .unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("progress"), Some(&FieldValue::Integer(100)));
    }

    #[test]
    fn blank_title_is_rejected() {
        let draft = GoalDraft::new(
            "   ",
            GoalCategory::Health,
            Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
        );
        assert_eq!(
            Goal::encode_draft(draft),
            Err(ValidationError::EmptyField("title"))
        );
    }
}

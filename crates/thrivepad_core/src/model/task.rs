//! Task records, drafts and patches.
//!
//! # Invariants
//! - Live task collections are ordered by `dueDate` ascending.
//! - `reminder_time` and `goal_id` are cleared by writing `null`, never by
//!   dropping the field from a patch.

use crate::backend::{Direction, Document, DocumentId, FieldValue, Fields, IdentityId};
use crate::error::{DecodeError, ValidationError};
use crate::live_query::codec::{put, put_some, FieldReader, CREATED_AT_FIELD, UPDATED_AT_FIELD};
use crate::live_query::Entity;
use crate::model::require_text;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TASKS_COLLECTION: &str = "tasks";

const TITLE: &str = "title";
const DESCRIPTION: &str = "description";
const DUE_DATE: &str = "dueDate";
const PRIORITY: &str = "priority";
const STATUS: &str = "status";
const REMINDER: &str = "reminder";
const REMINDER_TIME: &str = "reminderTime";
const GOAL_ID: &str = "goalId";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "in-progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Checkbox semantics: completed tasks reopen as pending, anything else
    /// completes.
    pub fn toggled(self) -> Self {
        match self {
            Self::Completed => Self::Pending,
            Self::Pending | Self::InProgress => Self::Completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: DocumentId,
    pub owner_id: IdentityId,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub reminder: bool,
    pub reminder_time: Option<DateTime<Utc>>,
    /// Goal this task contributes to, if linked.
    pub goal_id: Option<DocumentId>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Open tasks whose due date has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Completed && self.due_date < now
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub reminder: bool,
    pub reminder_time: Option<DateTime<Utc>>,
    pub goal_id: Option<DocumentId>,
}

impl TaskDraft {
    /// Pending, medium-priority task without reminder.
    pub fn new(title: impl Into<String>, due_date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            due_date,
            priority: TaskPriority::Medium,
            status: TaskStatus::Pending,
            reminder: false,
            reminder_time: None,
            goal_id: None,
        }
    }
}

/// Partial task update. Outer `None` leaves a field untouched; for the
/// clearable fields `Some(None)` writes `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub reminder: Option<bool>,
    pub reminder_time: Option<Option<DateTime<Utc>>>,
    pub goal_id: Option<Option<DocumentId>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Entity for Task {
    type Draft = TaskDraft;
    type Patch = TaskPatch;

    const COLLECTION: &'static str = TASKS_COLLECTION;
    const ORDER_FIELD: &'static str = DUE_DATE;
    const ORDER_DIRECTION: Direction = Direction::Ascending;

    fn decode(document: &Document) -> Result<Self, DecodeError> {
        let reader = FieldReader::new(document);
        Ok(Self {
            id: document.id.clone(),
            owner_id: reader.owner()?,
            title: reader.string(TITLE)?,
            description: reader.string_or_empty(DESCRIPTION)?,
            due_date: reader.date(DUE_DATE)?,
            priority: reader.enumerated(PRIORITY, TaskPriority::parse)?,
            status: reader.enumerated(STATUS, TaskStatus::parse)?,
            reminder: reader.bool_or(REMINDER, false)?,
            reminder_time: reader.optional_date(REMINDER_TIME)?,
            goal_id: reader.optional_string(GOAL_ID)?,
            created_at: reader.optional_date(CREATED_AT_FIELD)?,
            updated_at: reader.optional_date(UPDATED_AT_FIELD)?,
        })
    }

    fn encode_draft(draft: TaskDraft) -> Result<Fields, ValidationError> {
        let mut fields = Fields::new();
        put(&mut fields, TITLE, require_text(TITLE, draft.title)?);
        put(&mut fields, DESCRIPTION, draft.description);
        put(&mut fields, DUE_DATE, draft.due_date);
        put(&mut fields, PRIORITY, draft.priority.as_str());
        put(&mut fields, STATUS, draft.status.as_str());
        put(&mut fields, REMINDER, draft.reminder);
        put(&mut fields, REMINDER_TIME, draft.reminder_time);
        put(&mut fields, GOAL_ID, draft.goal_id);
        Ok(fields)
    }

    fn encode_patch(patch: TaskPatch) -> Result<Fields, ValidationError> {
        let mut fields = Fields::new();
        if let Some(title) = patch.title {
            put(&mut fields, TITLE, require_text(TITLE, title)?);
        }
        put_some(&mut fields, DESCRIPTION, patch.description);
        put_some(&mut fields, DUE_DATE, patch.due_date);
        put_some(&mut fields, PRIORITY, patch.priority.map(TaskPriority::as_str));
        put_some(&mut fields, STATUS, patch.status.map(TaskStatus::as_str));
        put_some(&mut fields, REMINDER, patch.reminder);
        put_some(&mut fields, REMINDER_TIME, patch.reminder_time.map(FieldValue::from));
        put_some(&mut fields, GOAL_ID, patch.goal_id.map(FieldValue::from));
        Ok(fields)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &IdentityId {
        &self.owner_id
    }
}

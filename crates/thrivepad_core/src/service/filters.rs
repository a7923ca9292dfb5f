//! List filters used by the task and journal screens.

use crate::model::journal::JournalEntry;
use crate::model::task::{Task, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
    Overdue,
}

impl TaskFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "overdue" => Some(Self::Overdue),
            _ => None,
        }
    }

    pub fn matches(self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            Self::All => true,
            Self::Pending => task.status == TaskStatus::Pending,
            Self::Completed => task.status == TaskStatus::Completed,
            Self::Overdue => task.is_overdue(now),
        }
    }

    /// Keeps the input order.
    pub fn apply<'a>(self, tasks: &'a [Task], now: DateTime<Utc>) -> Vec<&'a Task> {
        tasks.iter().filter(|task| self.matches(task, now)).collect()
    }
}

/// Case-insensitive match of `term` against title, content or any tag.
///
/// A blank term matches every entry.
pub fn journal_matches(entry: &JournalEntry, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    entry.title.to_lowercase().contains(&needle)
        || entry.content.to_lowercase().contains(&needle)
        || entry
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::{journal_matches, TaskFilter};
    use crate::backend::IdentityId;
    use crate::model::journal::JournalEntry;
    use crate::model::journal::normalize_tags;
    use rstest::rstest;

    fn entry() -> JournalEntry {
        JournalEntry {
            id: "j1".to_string(),
            owner_id: IdentityId::new("u1"),
            title: "Morning pages".to_string(),
            content: "Slept well, long run planned".to_string(),
            tags: normalize_tags(["Health", "routine"]),
            mood: None,
            is_private: true,
            created_at: None,
            updated_at: None,
        }
    }

    #[rstest]
    #[case("", true)]
    #[case("MORNING", true)]
    #[case("long run", true)]
    #[case("health", true)]
    #[case("finance", false)]
    fn journal_search_covers_title_content_and_tags(#[case] term: &str, #[case] expected: bool) {
        assert_eq!(journal_matches(&entry(), term), expected);
    }

    #[test]
    fn filter_names_parse_case_insensitively() {
        assert_eq!(TaskFilter::parse("Overdue"), Some(TaskFilter::Overdue));
        assert_eq!(TaskFilter::parse("someday"), None);
    }
}

//! Dashboard overview figures.
//!
//! # Invariants
//! - Inputs are the hook views in their canonical order; slices keep it.
//! - `overall_progress` is the rounded mean goal progress, `0` without goals.

use crate::model::goal::{Goal, GoalStatus};
use crate::model::journal::JournalEntry;
use crate::model::task::{Task, TaskStatus};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

const RECENT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Overview {
    /// Goals currently in progress.
    pub active_goals: usize,
    pub pending_tasks: usize,
    /// Entries written during the last seven days.
    pub recent_entries: usize,
    pub overall_progress: u8,
}

impl Overview {
    pub fn compute(
        goals: &[Goal],
        tasks: &[Task],
        entries: &[JournalEntry],
        now: DateTime<Utc>,
    ) -> Self {
        let window_start = now - Duration::days(RECENT_WINDOW_DAYS);
        Self {
            active_goals: goals
                .iter()
                .filter(|goal| goal.status == GoalStatus::InProgress)
                .count(),
            pending_tasks: tasks
                .iter()
                .filter(|task| task.status == TaskStatus::Pending)
                .count(),
            // An entry still waiting for its creation stamp was just written.
            recent_entries: entries
                .iter()
                .filter(|entry| entry.created_at.map_or(true, |at| at >= window_start))
                .count(),
            overall_progress: mean_progress(goals),
        }
    }
}

fn mean_progress(goals: &[Goal]) -> u8 {
    if goals.is_empty() {
        return 0;
    }
    let count = goals.len() as u64;
    let total: u64 = goals.iter().map(|goal| u64::from(goal.progress)).sum();
    // Half rounds up.
    u8::try_from((total * 2 + count) / (count * 2)).unwrap_or(100)
}

/// Newest goals first, at most `limit`.
pub fn recent_goals(goals: &[Goal], limit: usize) -> &[Goal] {
    &goals[..goals.len().min(limit)]
}

/// Next open tasks by due date, at most `limit`.
pub fn upcoming_tasks(tasks: &[Task], limit: usize) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| task.status != TaskStatus::Completed)
        .take(limit)
        .collect()
}

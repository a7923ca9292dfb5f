//! Two-phase state for optimistic UI mutations.
//!
//! A form closes as soon as the user submits (`begin`) and is restored from
//! the kept input if the backend rejects the write (`settle`). Whether the
//! record itself shows up is still decided by the next pushed snapshot.

use crate::error::SyncError;
use std::future::Future;

/// Submitted input waiting for the backend result.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "a pending mutation must be settled with the backend result"]
pub struct PendingMutation<I> {
    input: I,
}

/// Result of settling a pending mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome<I, R> {
    Committed(R),
    /// The write failed; `input` is handed back so the form can reopen.
    RolledBack { input: I, error: SyncError },
}

impl<I, R> MutationOutcome<I, R> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

impl<I> PendingMutation<I> {
    pub fn begin(input: I) -> Self {
        Self { input }
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn settle<R>(self, result: Result<R, SyncError>) -> MutationOutcome<I, R> {
        match result {
            Ok(value) => MutationOutcome::Committed(value),
            Err(error) => MutationOutcome::RolledBack {
                input: self.input,
                error,
            },
        }
    }
}

/// Runs `mutate` on a copy of `input` and settles with its result.
pub async fn run_optimistic<I, R, F, Fut>(input: I, mutate: F) -> MutationOutcome<I, R>
where
    I: Clone,
    F: FnOnce(I) -> Fut,
    Fut: Future<Output = Result<R, SyncError>>,
{
    let pending = PendingMutation::begin(input);
    let result = mutate(pending.input().clone()).await;
    pending.settle(result)
}

#[cfg(test)]
mod tests {
    use super::{run_optimistic, MutationOutcome, PendingMutation};
    use crate::error::SyncError;

    #[test]
    fn failed_write_returns_input_for_reopening() {
        let pending = PendingMutation::begin("Run 5k".to_string());
        let outcome: MutationOutcome<String, ()> =
            pending.settle(Err(SyncError::Transport("offline".to_string())));
        assert_eq!(
            outcome,
            MutationOutcome::RolledBack {
                input: "Run 5k".to_string(),
                error: SyncError::Transport("offline".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn successful_write_commits() {
        let outcome = run_optimistic(3_u8, |value| async move { Ok::<_, SyncError>(value * 2) }).await;
        assert!(outcome.is_committed());
        assert_eq!(outcome, MutationOutcome::Committed(6));
    }
}

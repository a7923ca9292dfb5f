mod common;

use chrono::Duration;
use common::{day, eventually, within, Harness, PASSWORD};
use mockable::Clock;
use thrivepad_core::mutation::run_optimistic;
use thrivepad_core::service::dashboard::{recent_goals, upcoming_tasks};
use thrivepad_core::service::filters::{journal_matches, TaskFilter};
use thrivepad_core::{
    AppContext, Gate, GoalCategory, GoalDraft, GoalPatch, GoalStatus, JournalDraft,
    MutationOutcome, SyncError, TaskDraft, TaskStatus,
};

fn start(harness: &Harness) -> AppContext {
    AppContext::with_local_backend(harness.backend.clone(), harness.shared_clock())
}

#[tokio::test]
async fn full_cycle_from_sign_up_to_dashboard() {
    let harness = Harness::new();
    let app = start(&harness);
    within(app.session.resolved()).await;
    assert!(matches!(app.guard.gate(|_| ()), Gate::Redirect(_)));

    app.session
        .sign_up("ana@example.com", PASSWORD, "Ana")
        .await
        .unwrap();
    harness.backend.verify_email("ana@example.com").unwrap();
    app.session
        .sign_in("ana@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(
        app.guard.gate(|session| session.email.clone()),
        Gate::Protected("ana@example.com".to_string())
    );

    let now = harness.clock.utc();
    let goal_id = app
        .goals
        .create(GoalDraft::new("Learn Rust", GoalCategory::Learning, day(2025, 12, 1)))
        .await
        .unwrap();
    app.goals
        .update(
            &goal_id,
            GoalPatch {
                progress: Some(40),
                status: Some(GoalStatus::InProgress),
                ..GoalPatch::default()
            },
        )
        .await
        .unwrap();
    harness.clock.advance(Duration::minutes(1));
    app.goals
        .create(GoalDraft::new("Call grandma weekly", GoalCategory::Relationships, day(2025, 3, 1)))
        .await
        .unwrap();

    app.tasks
        .create(TaskDraft::new("Overdue chapter", now - Duration::days(2)))
        .await
        .unwrap();
    let mut done = TaskDraft::new("Install toolchain", now + Duration::days(1));
    done.status = TaskStatus::Completed;
    app.tasks.create(done).await.unwrap();
    app.tasks
        .create(TaskDraft::new("Write first crate", now + Duration::days(3)))
        .await
        .unwrap();

    app.journal
        .create(JournalDraft::new("Day one", "Borrow checker won today."))
        .await
        .unwrap();

    within(app.goals.wait_for(|view| {
        view.records.len() == 2 && view.records.iter().any(|goal| goal.progress == 40)
    }))
    .await;
    within(app.tasks.wait_for(|view| view.records.len() == 3)).await;
    within(app.journal.wait_for(|view| view.records.len() == 1)).await;

    let overview = app.overview();
    assert_eq!(overview.active_goals, 1);
    assert_eq!(overview.pending_tasks, 2);
    assert_eq!(overview.recent_entries, 1);
    assert_eq!(overview.overall_progress, 20);

    let goals = app.goals.records();
    assert_eq!(recent_goals(&goals, 1)[0].title, "Call grandma weekly");
    let tasks = app.tasks.records();
    let upcoming: Vec<_> = upcoming_tasks(&tasks, 3)
        .into_iter()
        .map(|task| task.title.as_str())
        .collect();
    assert_eq!(upcoming, vec!["Overdue chapter", "Write first crate"]);

    let overdue = TaskFilter::Overdue.apply(&tasks, now);
    assert_eq!(overdue.len(), 1);
    assert_eq!(TaskFilter::Completed.apply(&tasks, now).len(), 1);
    assert!(journal_matches(&app.journal.records()[0], "borrow"));

    harness.clock.advance(Duration::days(8));
    assert_eq!(app.overview().recent_entries, 0);

    app.shutdown();
    assert_eq!(harness.backend.active_subscriptions(), 0);
    assert_eq!(harness.backend.active_auth_observers(), 0);
}

#[tokio::test]
async fn failed_optimistic_create_hands_the_draft_back() {
    let harness = Harness::new();
    harness.verified_user("ben@example.com").await;
    let app = start(&harness);
    eventually(|| harness.backend.active_subscriptions() == 3).await;
    harness.backend.set_offline(true);

    let draft = GoalDraft::new("Offline goal", GoalCategory::Personal, day(2025, 8, 8));
    let outcome = run_optimistic(draft.clone(), |draft| app.goals.create(draft)).await;

    match outcome {
        MutationOutcome::RolledBack { input, error } => {
            assert_eq!(input, draft);
            assert!(matches!(error, SyncError::Transport(_)));
        }
        MutationOutcome::Committed(id) => panic!("unexpected commit {id}"),
    }

    harness.backend.set_offline(false);
    let outcome = run_optimistic(draft, |draft| app.goals.create(draft)).await;
    assert!(outcome.is_committed());
    within(app.goals.wait_for(|view| view.records.len() == 1)).await;
    app.shutdown();
}

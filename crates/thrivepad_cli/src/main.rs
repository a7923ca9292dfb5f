//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire `thrivepad_core` to the local backend and walk one sign-up,
//!   verification, sign-in and CRUD cycle.
//! - Print the resulting views and dashboard figures.

use chrono::Duration;
use clap::Parser;
use log::info;
use mockable::{DefaultClock, DefaultEnv, Env};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use thrivepad_core::config::ConfigError;
use thrivepad_core::{
    init_logging, AppConfig, AppContext, Gate, GoalCategory, GoalDraft, GoalPatch, GoalStatus,
    JournalDraft, LocalBackend, Mood, SharedClock, TaskDraft,
};

#[derive(Debug, Parser)]
#[command(name = "thrivepad", version, about = "ThrivePad sync core smoke run")]
struct Args {
    /// SQLite file for the local backend (overrides THRIVEPAD_DB_PATH).
    #[arg(long)]
    db: Option<PathBuf>,
    /// Absolute log directory (overrides THRIVEPAD_LOG_DIR).
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// trace|debug|info|warn|error (overrides THRIVEPAD_LOG_LEVEL).
    #[arg(long)]
    log_level: Option<String>,
    #[arg(long, default_value = "demo@thrivepad.local")]
    email: String,
    #[arg(long, default_value = "demo-password")]
    password: String,
    #[arg(long, default_value = "Demo")]
    name: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("thrivepad: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Environment settings with command-line flags taking precedence.
fn load_config<E: Env>(args: &Args, env: &E) -> Result<AppConfig, ConfigError> {
    let mut config = AppConfig::from_env(env)?;
    if let Some(db) = &args.db {
        config.database_path = Some(db.clone());
    }
    if let Some(level) = &args.log_level {
        config.set_log_level(level)?;
    }
    if let Some(dir) = &args.log_dir {
        config.set_log_dir(dir.clone())?;
    }
    Ok(config)
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args, &DefaultEnv::new())?;
    if let Some(dir) = &config.log_dir {
        init_logging(config.log_level, dir)?;
    }

    let clock: SharedClock = Arc::new(DefaultClock);
    let backend = match &config.database_path {
        Some(path) => LocalBackend::open(path, Arc::clone(&clock))?,
        None => LocalBackend::in_memory(Arc::clone(&clock))?,
    };
    let app = AppContext::with_local_backend(backend.clone(), Arc::clone(&clock));
    app.session.resolved().await;

    let signed_up = app.session.sign_up(&args.email, &args.password, &args.name).await;
    match signed_up {
        Ok(session) => println!("signed up {} (verified={})", session.email, session.email_verified),
        Err(err) => println!("sign-up skipped: {err}"),
    }
    backend.verify_email(&args.email)?;
    let session = app.session.sign_in(&args.email, &args.password).await?;
    info!("event=cli_sign_in module=cli status=ok identity={}", session.identity_id);

    let greeting = app.guard.gate(|session| {
        format!(
            "welcome back, {}",
            session.display_name.as_deref().unwrap_or("User")
        )
    });
    if let Gate::Protected(line) = greeting {
        println!("{line}");
    }

    let now = clock.utc();
    let goal_id = app
        .goals
        .create(GoalDraft::new("Run a half marathon", GoalCategory::Health, now + Duration::days(90)))
        .await?;
    app.goals
        .update(
            &goal_id,
            GoalPatch {
                progress: Some(35),
                status: Some(GoalStatus::InProgress),
                ..GoalPatch::default()
            },
        )
        .await?;

    let mut task = TaskDraft::new("Long run", now + Duration::days(2));
    task.goal_id = Some(goal_id.clone());
    app.tasks.create(task).await?;

    let mut entry = JournalDraft::new("First week", "Legs sore, spirits high.");
    entry.mood = Some(Mood::Good);
    app.journal.create(entry).await?;

    let goals = app.goals.wait_for(|view| !view.loading && !view.records.is_empty()).await;
    let tasks = app.tasks.wait_for(|view| !view.loading && !view.records.is_empty()).await;
    let entries = app.journal.wait_for(|view| !view.loading && !view.records.is_empty()).await;
    for goal in &goals.records {
        println!("goal  {} [{}%] {}", goal.title, goal.progress, goal.status.as_str());
    }
    for task in &tasks.records {
        println!("task  {} due {}", task.title, task.due_date.format("%Y-%m-%d"));
    }
    for entry in &entries.records {
        println!("entry {} ({} tags)", entry.title, entry.tags.len());
    }

    let overview = app.overview();
    println!(
        "overview: active_goals={} pending_tasks={} recent_entries={} progress={}%",
        overview.active_goals,
        overview.pending_tasks,
        overview.recent_entries,
        overview.overall_progress
    );

    app.session.sign_out().await?;
    app.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load_config, Args};
    use clap::Parser;
    use mockable::MockEnv;
    use std::path::PathBuf;
    use thrivepad_core::config::{DB_PATH_ENV, LOG_LEVEL_ENV};

    fn env_with(vars: &'static [(&'static str, &'static str)]) -> MockEnv {
        let mut env = MockEnv::new();
        env.expect_string().times(0..).returning(move |key| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value).to_string())
        });
        env
    }

    #[test]
    fn flags_override_environment() {
        let env = env_with(&[(DB_PATH_ENV, "/var/lib/env.sqlite3"), (LOG_LEVEL_ENV, "warn")]);
        let args = Args::parse_from(["thrivepad", "--db", "/tmp/flag.sqlite3", "--log-level", "debug"]);

        let config = load_config(&args, &env).unwrap();

        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/flag.sqlite3")));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn environment_applies_without_flags() {
        let env = env_with(&[(DB_PATH_ENV, "/var/lib/env.sqlite3")]);
        let args = Args::parse_from(["thrivepad"]);

        let config = load_config(&args, &env).unwrap();

        assert_eq!(config.database_path, Some(PathBuf::from("/var/lib/env.sqlite3")));
    }

    #[test]
    fn relative_log_dir_flag_is_rejected() {
        let env = env_with(&[]);
        let args = Args::parse_from(["thrivepad", "--log-dir", "logs"]);

        assert!(load_config(&args, &env).is_err());
    }
}

//! Initialization helpers for the application:
//! - database connection + migrations
//! - background reminder jobs
//!
//! This module centralizes bits that would otherwise live in `main.rs`.

use std::{path::Path, sync::Arc};

use anyhow::Result;

use crate::config::Config;
use crate::services::{reminders, scheduler};
use crate::AppState;

/// Redact potentially sensitive information from a database URL before logging.
///
/// Attempts to parse the URL and remove userinfo (username:password) components.
/// Falls back to removing everything before '@' or returning "(redacted)".
pub fn redact_db_url(db_url: &str) -> String {
    if let Ok(url) = url::Url::parse(db_url) {
        let scheme = url.scheme();
        let host = url.host_str().unwrap_or("");
        let port_part = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
        let path = url.path();
        format!("{}://{}{}{}", scheme, host, port_part, path)
    } else {
        if let Some(at_pos) = db_url.find('@') {
            let without_creds = &db_url[at_pos + 1..];
            return format!("(redacted){}", without_creds);
        }
        "(redacted)".to_string()
    }
}

/// Open the SQLite pool and run migrations.
///
/// Creates the parent directory of the database file when missing. Foreign
/// keys are switched on so meal foods follow their meal on delete.
pub async fn init_db(config: &Config) -> Result<sqlx::SqlitePool> {
    let db_url = &config.database.url;
    tracing::info!("Connecting to database: {}", redact_db_url(db_url));

    let db_path = db_url.strip_prefix("sqlite://").unwrap_or(db_url);
    let db_file_path = Path::new(db_path);

    if let Some(parent) = db_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let connect_options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(5));

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(connect_options)
        .await?;

    tracing::info!("Connected to database file: {}", db_file_path.display());

    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Spawn the reminder jobs:
/// - tomorrow's workouts, daily at the configured time
/// - workouts starting soon, on a fixed interval
/// - overdue goals, daily (opt-in)
///
/// Returns the `JoinHandle`s so callers can await task shutdown. Each job
/// listens for a shutdown notification on `shutdown`.
pub fn spawn_background_workers(
    state: Arc<AppState>,
    shutdown: tokio::sync::broadcast::Sender<()>,
) -> Result<Vec<tokio::task::JoinHandle<()>>> {
    let cfg = &state.config.scheduler;
    let mut handles = Vec::new();

    if !cfg.enabled {
        tracing::info!("Reminder scheduler disabled");
        return Ok(handles);
    }

    let offset = reminders::utc_offset(cfg.utc_offset_minutes)?;

    // Tomorrow's workouts
    {
        let state = state.clone();
        handles.push(tokio::spawn(scheduler::run_daily(
            "Workout reminder",
            state.clock.clone(),
            offset,
            (cfg.workout_reminder_hour, cfg.workout_reminder_minute),
            shutdown.subscribe(),
            move || {
                let state = state.clone();
                async move { reminders::tomorrow_workouts(&state).await }
            },
        )));
    }

    // Same-day "starts soon"
    {
        let state = state.clone();
        let period = std::time::Duration::from_secs(cfg.same_day_interval_minutes * 60);
        handles.push(tokio::spawn(scheduler::run_every(
            "Same-day workout reminder",
            period,
            shutdown.subscribe(),
            move || {
                let state = state.clone();
                async move { reminders::same_day_workouts(&state).await }
            },
        )));
    }

    // Overdue goals
    if cfg.overdue_goals_enabled {
        let state = state.clone();
        handles.push(tokio::spawn(scheduler::run_daily(
            "Overdue goal reminder",
            state.clock.clone(),
            offset,
            (cfg.overdue_goals_hour, cfg.overdue_goals_minute),
            shutdown.subscribe(),
            move || {
                let state = state.clone();
                async move { reminders::overdue_goals(&state).await }
            },
        )));
    }

    tracing::info!("Started {} reminder jobs", handles.len());
    Ok(handles)
}

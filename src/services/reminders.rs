//! Reminder scans run by the background scheduler.
//!
//! Each scan queries the store for qualifying rows and pushes one candidate
//! per row through `NotificationService::notify`, so the cooldown decides
//! what actually reaches the inbox. A failed query aborts the scan; an
//! undecodable row or a failed emission only counts against the report.

use chrono::{Duration, FixedOffset, NaiveDateTime, NaiveTime};

use crate::db::{AlertKey, AlertKind, GoalRepository, ScanRows, WorkoutRepository};
use crate::error::{AppError, AppResult};
use crate::messages;
use crate::services::notifications::Emission;
use crate::AppState;

/// Counters for one scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Rows returned by the query, undecodable ones included.
    pub candidates: usize,
    pub emitted: usize,
    pub suppressed: usize,
    pub failed: usize,
    /// Rows that could not be decoded or fell outside the reminder window.
    pub skipped: usize,
}

impl ScanReport {
    fn for_rows<T>(rows: &ScanRows<T>) -> Self {
        Self {
            candidates: rows.total(),
            skipped: rows.undecodable,
            ..Default::default()
        }
    }

    fn record(&mut self, emission: Emission) {
        match emission {
            Emission::Emitted(_) => self.emitted += 1,
            Emission::Suppressed => self.suppressed += 1,
            Emission::Failed => self.failed += 1,
        }
    }
}

pub fn utc_offset(minutes: i32) -> AppResult<FixedOffset> {
    FixedOffset::east_opt(minutes.saturating_mul(60)).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("UTC offset out of range: {} minutes", minutes))
    })
}

/// The users' wall clock, as configured.
pub fn local_now(state: &AppState) -> AppResult<NaiveDateTime> {
    let offset = utc_offset(state.config.scheduler.utc_offset_minutes)?;
    Ok(state.clock.now().with_timezone(&offset).naive_local())
}

/// Whether a start time on today's date falls in `(now, now + horizon]`.
pub fn within_look_ahead(now: NaiveDateTime, start: NaiveTime, horizon: Duration) -> bool {
    let start = now.date().and_time(start);
    start > now && start <= now + horizon
}

fn format_start(start: NaiveTime) -> String {
    start.format("%H:%M").to_string()
}

/// Remind about every workout dated tomorrow.
pub async fn tomorrow_workouts(state: &AppState) -> AppResult<ScanReport> {
    let tomorrow = local_now(state)?.date() + Duration::days(1);
    let workouts = WorkoutRepository::find_scheduled_on(&state.db, tomorrow).await?;

    let mut report = ScanReport::for_rows(&workouts);

    for w in workouts.rows {
        let key = AlertKey::new(&w.user_id, Some(&w.id), AlertKind::WorkoutTomorrow)
            .with_bucket(w.workout_date.format("%Y-%m-%d").to_string());
        let message = messages::t_with("workout.tomorrow", &[("name", &w.name)]);
        report.record(state.notifications.notify(&key, &message).await);
    }

    tracing::info!("Tomorrow workout scan for {}: {:?}", tomorrow, report);
    Ok(report)
}

/// Remind about workouts starting within the look-ahead window today.
///
/// Runs every few minutes; the formatted start time is part of the cooldown
/// key so a workout is announced once per start time.
pub async fn same_day_workouts(state: &AppState) -> AppResult<ScanReport> {
    let now = local_now(state)?;
    let horizon = Duration::hours(state.config.scheduler.same_day_lookahead_hours);
    let workouts = WorkoutRepository::find_timed_on(&state.db, now.date()).await?;

    let mut report = ScanReport::for_rows(&workouts);

    for w in workouts.rows {
        let Some(start) = w.start_time else {
            report.skipped += 1;
            continue;
        };
        if !within_look_ahead(now, start, horizon) {
            report.skipped += 1;
            continue;
        }

        let time = format_start(start);
        let key =
            AlertKey::new(&w.user_id, Some(&w.id), AlertKind::WorkoutStartingSoon).with_bucket(&time);
        let message = messages::t_with("workout.starting_soon", &[("name", &w.name), ("time", &time)]);
        report.record(state.notifications.notify(&key, &message).await);
    }

    tracing::debug!("Same-day workout scan at {}: {:?}", now, report);
    Ok(report)
}

/// Remind about open goals nobody touched for a while.
pub async fn overdue_goals(state: &AppState) -> AppResult<ScanReport> {
    let days = state.config.scheduler.overdue_goal_days;
    let cutoff = (state.clock.now() - Duration::days(days)).naive_utc();
    let goals = GoalRepository::find_stale(&state.db, cutoff).await?;

    let mut report = ScanReport::for_rows(&goals);

    let days = days.to_string();
    for g in goals.rows {
        let key = AlertKey::new(&g.user_id, Some(&g.id), AlertKind::GoalOverdue);
        let message = messages::t_with("goal.overdue", &[("goal", &g.goal_type), ("days", &days)]);
        report.record(state.notifications.notify(&key, &message).await);
    }

    tracing::info!("Overdue goal scan (cutoff {}): {:?}", cutoff, report);
    Ok(report)
}

//! Timer loops for the reminder scans.
//!
//! Fire times are recomputed from the clock on every cycle and never
//! persisted, so a restart simply picks the next slot.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, FixedOffset, NaiveDateTime, NaiveTime};
use tokio::sync::broadcast;

use crate::error::AppResult;
use crate::services::clock::Clock;
use crate::services::reminders::ScanReport;

/// Next `hour:minute` strictly after `now`. Inputs are wall-clock times.
pub fn next_daily_fire(now: NaiveDateTime, hour: u32, minute: u32) -> NaiveDateTime {
    let slot = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date().and_time(slot);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Run `job` every day at `hour:minute` in `offset` until shutdown.
pub async fn run_daily<F, Fut>(
    name: &'static str,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    (hour, minute): (u32, u32),
    mut shutdown: broadcast::Receiver<()>,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<ScanReport>>,
{
    // Slot of the previous run. The sleep is monotonic while `now` is wall
    // time, so a clock stepped back mid-sleep must not re-arm the same slot.
    let mut last_fire: Option<NaiveDateTime> = None;

    loop {
        let now = clock.now().with_timezone(&offset).naive_local();
        let from = last_fire.map_or(now, |last| last.max(now));
        let next = next_daily_fire(from, hour, minute);
        let wait = (next - now).to_std().unwrap_or(StdDuration::ZERO);
        tracing::info!("{} job next runs at {} (in {}s)", name, next, wait.as_secs());

        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("{} job shutting down", name);
                break;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        last_fire = Some(next);
        match job().await {
            Ok(report) => tracing::debug!("{} job finished: {:?}", name, report),
            Err(e) => tracing::warn!("{} job failed: {:?}", name, e),
        }
    }
}

/// Run `job` every `period` until shutdown. The first run happens one full
/// period after start.
pub async fn run_every<F, Fut>(
    name: &'static str,
    period: StdDuration,
    mut shutdown: broadcast::Receiver<()>,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<ScanReport>>,
{
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("{} job shutting down", name);
                break;
            }
            _ = tokio::time::sleep(period) => {}
        }

        match job().await {
            Ok(report) => tracing::debug!("{} job finished: {:?}", name, report),
            Err(e) => tracing::warn!("{} job failed: {:?}", name, e),
        }
    }
}

//! Background refresh of the active date window.
//!
//! Two drivers share one job value: a periodic task that rewrites the
//! temporary tier for every date in the window and then prunes the tier
//! down to the window, and a daily task that captures a fresh backup of
//! the whole window at a fixed wall-clock hour. Both fetch strictly
//! sequentially through the shared rate-limit gate; a failed date
//! degrades to an empty snapshot and never aborts the rest of the run.

use crate::calendar;
use crate::config::{CalendarConfig, RefreshConfig};
use crate::retry::{RetrySchedule, with_retry};
use crate::scrape::PlanFetcher;
use crate::store::{PlanStore, Tier};
use crate::types::DaySnapshot;
use chrono::{NaiveDateTime, Timelike};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Orchestrates window computation, fetching, and cache writes.
#[derive(Debug, Clone)]
pub struct RefreshJob {
    store: PlanStore,
    fetcher: PlanFetcher,
    retry: RetrySchedule,
    calendar: CalendarConfig,
}

impl RefreshJob {
    #[must_use]
    pub fn new(
        store: PlanStore,
        fetcher: PlanFetcher,
        retry: RetrySchedule,
        calendar: CalendarConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            retry,
            calendar,
        }
    }

    /// The window of dates currently kept warm, oldest to newest.
    #[must_use]
    pub fn current_window(&self) -> Vec<chrono::NaiveDate> {
        let anchor = calendar::effective_today(
            self.calendar.utc_offset_minutes,
            self.calendar.cutoff_hour,
        );
        calendar::window(anchor, self.calendar.window_back, self.calendar.window_forward)
    }

    /// One periodic refresh pass: rewrite the temporary tier for every
    /// window date, then prune the tier down to the window. Always runs
    /// to completion; per-date failures become empty snapshots.
    pub async fn run_refresh_cycle(&self) {
        let window = self.current_window();
        info!(
            first = %window[0],
            last = %window[window.len() - 1],
            days = window.len(),
            "refresh cycle started"
        );

        for &date in &window {
            let snapshot = self.fetch_or_empty(date).await;
            if let Err(e) = self.store.write(Tier::Temporary, date, &snapshot) {
                warn!(date = %date, error = %e, "failed to write temporary snapshot");
            }
        }

        match self.store.prune_temporary(&window) {
            Ok(removed) if removed > 0 => {
                debug!(removed, "pruned temporary tier to current window");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "temporary tier prune failed"),
        }

        info!("refresh cycle finished");
    }

    /// One daily backup pass: fetch fresh data for every window date,
    /// ignoring whatever is cached, and write it to the backup tier.
    pub async fn run_backup_cycle(&self) {
        let window = self.current_window();
        info!(days = window.len(), "daily backup started");

        for &date in &window {
            let snapshot = self.fetch_or_empty(date).await;
            if let Err(e) = self.store.write(Tier::Backup, date, &snapshot) {
                warn!(date = %date, error = %e, "failed to write backup snapshot");
            }
        }

        info!("daily backup finished");
    }

    async fn fetch_or_empty(&self, date: chrono::NaiveDate) -> DaySnapshot {
        match with_retry(self.retry, || self.fetcher.fetch_day(date)).await {
            Ok(entries) => DaySnapshot::from_entries(entries),
            Err(e) => {
                warn!(date = %date, error = %e, "no data for date, storing empty snapshot");
                DaySnapshot::empty()
            }
        }
    }

    /// Spawn both drivers. The periodic driver runs immediately, then
    /// every `interval_secs`; the daily driver sleeps until the next
    /// occurrence of `backup_hour` and then once per day.
    #[must_use]
    pub fn start(self, config: &RefreshConfig) -> RefreshHandle {
        let interval = Duration::from_secs(config.interval_secs);
        let backup_hour = config.backup_hour;
        let offset = self.calendar.utc_offset_minutes;

        let periodic_job = self.clone();
        let periodic = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                periodic_job.run_refresh_cycle().await;
            }
        });

        let daily = tokio::spawn(async move {
            loop {
                let now = calendar::local_now(offset);
                let wait = until_next_hour(now, backup_hour);
                debug!(
                    hour = backup_hour,
                    wait_secs = wait.as_secs(),
                    "daily backup sleeping until next run"
                );
                tokio::time::sleep(wait).await;
                self.run_backup_cycle().await;
            }
        });

        RefreshHandle { periodic, daily }
    }
}

/// Handle to the two spawned refresh drivers. Aborts both on shutdown
/// or drop.
#[derive(Debug)]
pub struct RefreshHandle {
    periodic: JoinHandle<()>,
    daily: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stop both drivers.
    pub fn shutdown(&self) {
        self.periodic.abort();
        self.daily.abort();
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Time from `now` until the next occurrence of `hour:00`. A `now`
/// already inside that hour waits for tomorrow's occurrence.
fn until_next_hour(now: NaiveDateTime, hour: u32) -> Duration {
    let today_at = now
        .date()
        .and_hms_opt(hour, 0, 0)
        .unwrap_or_else(|| now.date().and_hms_opt(0, 0, 0).unwrap_or(now));

    let target = if now.hour() < hour {
        today_at
    } else {
        today_at + chrono::Duration::days(1)
    };

    (target - now).to_std().unwrap_or(Duration::ZERO)
}

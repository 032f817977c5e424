//! Cron-driven daily summary loop.
//!
//! The cron expression is evaluated in the roster's reference zone, so
//! `0 22 * * *` means 22:00 local time across DST changes.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Normalize a 5-field cron expression to the 6-field form `cron` expects.
fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct SummarySchedule {
    schedule: Schedule,
    tz: Tz,
}

impl SummarySchedule {
    pub fn parse(expr: &str, tz: Tz) -> Result<Self, cron::error::Error> {
        let schedule = Schedule::from_str(&normalize_cron(expr))?;
        Ok(Self { schedule, tz })
    }

    /// First scheduled instant strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&after.with_timezone(&self.tz))
            .next()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Whether a scheduled instant falls in `(last_run, now]`.
    pub fn is_due(&self, now: DateTime<Utc>, last_run: DateTime<Utc>) -> bool {
        self.next_after(last_run).is_some_and(|next| next <= now)
    }
}

/// Run the daily summary whenever the schedule comes due.
///
/// Only ticks after startup count, so a restart shortly after the scheduled
/// time does not post a second digest.
pub async fn run_summary_loop(state: Arc<AppState>, schedule: SummarySchedule, tick: Duration) {
    let mut last_run = Utc::now();
    info!(
        next = ?schedule.next_after(last_run),
        tick_secs = tick.as_secs(),
        "Summary scheduler started"
    );

    let mut interval = tokio::time::interval(tick);
    loop {
        interval.tick().await;
        let now = Utc::now();
        if !schedule.is_due(now, last_run) {
            debug!(%now, "Summary tick: not due");
            continue;
        }
        last_run = now;

        let report = state.summary_job.run(now).await;
        if report.failures() > 0 {
            warn!(
                day = %report.day,
                failures = report.failures(),
                "Scheduled summary finished with failures"
            );
        }
        info!(next = ?schedule.next_after(now), "Scheduled summary done");
    }
}

//! Daily sweep scheduling
//!
//! Runs [`BranchGate::run_sweep`] once per day at a fixed local hour.
//! Owned by the process lifecycle manager and shut down through its
//! cancellation token; dependencies are injected the same way as for
//! request handlers.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::BranchGate;

/// Time until the next occurrence of `hour:00` local time in `tz`
///
/// If the hour has already passed today, the next occurrence is
/// tomorrow. DST gaps resolve to the earliest valid instant.
pub fn duration_until_next(now: DateTime<Utc>, tz: Tz, hour: u32) -> Duration {
    let local_now = now.with_timezone(&tz);
    let today = local_now.date_naive();

    let mut candidate = today.and_hms_opt(hour, 0, 0).expect("hour out of range");
    let mut next = resolve_local(&tz, candidate);
    if next <= now {
        candidate = (today + ChronoDuration::days(1))
            .and_hms_opt(hour, 0, 0)
            .expect("hour out of range");
        next = resolve_local(&tz, candidate);
    }

    (next - now).to_std().unwrap_or(Duration::ZERO)
}

fn resolve_local(tz: &Tz, naive: chrono::NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // DST gap: shift forward an hour
        chrono::LocalResult::None => {
            let shifted = naive + ChronoDuration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&shifted))
        }
    }
}

/// Sweep loop: sleep until the scheduled hour, run, repeat
pub async fn run(gate: Arc<BranchGate>, tz: Tz, hour: u32, token: CancellationToken) {
    loop {
        let wait = duration_until_next(Utc::now(), tz, hour);
        tracing::info!(
            timezone = %tz,
            hour = hour,
            wait_secs = wait.as_secs(),
            "Sweep scheduled"
        );

        tokio::select! {
            _ = token.cancelled() => {
                tracing::info!("Sweep task shutting down");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        match gate.run_sweep().await {
            Ok(report) => {
                tracing::info!(
                    inspected = report.inspected,
                    closed = report.closed.len(),
                    "Sweep completed"
                );
            }
            Err(err) => {
                tracing::error!(error = %err, "Sweep failed, retrying at next schedule");
            }
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::engine::Engine;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Time left until the next local midnight after `now`.
pub fn until_next_midnight(now: NaiveDateTime) -> Duration {
    let next = (now.date() + TimeDelta::days(1)).and_hms_opt(0, 0, 0);
    next.and_then(|next| (next - now).to_std().ok())
        .filter(|d| !d.is_zero())
        .unwrap_or(DAY)
}

/// Background task that rolls the calendar over at every local midnight.
pub async fn run_purger(engine: Arc<Engine>) {
    run_purger_with(engine, || Local::now().naive_local()).await
}

/// Sleep until the next midnight on `now`, purge, repeat. The wait is taken
/// from the wall clock each round, so a DST shift moves only one day.
async fn run_purger_with(engine: Arc<Engine>, now: impl Fn() -> NaiveDateTime) {
    loop {
        tokio::time::sleep(until_next_midnight(now())).await;
        engine.purge_passed_reservations().await;
    }
}

/// Background task that snapshots the engine every `period`.
pub async fn run_backup(engine: Arc<Engine>, period: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        debug!("periodic backup");
        engine.backup().await;
    }
}

use std::time::Instant;

use chrono::NaiveDate;
use tracing::{debug, error, info};

use crate::model::*;
use crate::observability;

use super::{Engine, Ledger};

impl Engine {
    /// Daily rollover as of the local date.
    pub async fn purge_passed_reservations(&self) -> PurgeReport {
        self.purge_passed_reservations_at(today()).await
    }

    /// Drop dates on or before `today` and reservations that ended before
    /// it, then refill the window so `today+1 ..= today+window_days` exists.
    pub async fn purge_passed_reservations_at(&self, today: NaiveDate) -> PurgeReport {
        let started = Instant::now();
        let mut ledger = self.ledger.lock().await;
        let report = ledger.purge(today, self.policy.window_days);
        observability::record_occupancy(ledger.reservation_count(), ledger.free_count());
        drop(ledger);

        metrics::counter!(observability::PURGED_RESERVATIONS_TOTAL).increment(report.expired as u64);
        observability::record_operation("purge", "ok", started);
        info!(
            "purge as of {today}: {} expired, {} dates dropped, {} dates added",
            report.expired, report.dropped_dates, report.added_dates
        );
        report
    }

    /// Write a snapshot of both maps. The copy is taken under the lock, the
    /// file I/O happens after it is released. Failures are logged only.
    pub async fn backup(&self) {
        let Some(store) = self.store.clone() else {
            debug!("backup skipped: no snapshot directory configured");
            return;
        };
        let (calendar, index) = self.snapshot().await;
        let reservations = index.len();

        let started = Instant::now();
        let result = tokio::task::spawn_blocking(move || store.backup(&calendar, &index)).await;
        match result {
            Ok(Ok(())) => {
                metrics::histogram!(observability::BACKUP_DURATION_SECONDS)
                    .record(started.elapsed().as_secs_f64());
                info!("backed up {reservations} reservations");
            }
            Ok(Err(e)) => {
                metrics::counter!(observability::BACKUP_FAILURES_TOTAL).increment(1);
                error!("backup failed: {e}");
            }
            Err(e) => {
                metrics::counter!(observability::BACKUP_FAILURES_TOTAL).increment(1);
                error!("backup task failed: {e}");
            }
        }
    }

    /// Replace the in-memory state with the last snapshot as of the local date.
    pub async fn restore(&self) {
        self.restore_at(today()).await
    }

    /// Replace the in-memory state with the last snapshot, then purge as of
    /// `today`. An unreadable snapshot restores as empty and the window is
    /// re-seeded.
    pub async fn restore_at(&self, today: NaiveDate) {
        let Some(store) = self.store.clone() else {
            debug!("restore skipped: no snapshot directory configured");
            return;
        };
        let (calendar, index) =
            tokio::task::spawn_blocking(move || (store.restore_calendar(), store.restore_index()))
                .await
                .unwrap_or_else(|e| {
                    error!("restore task failed: {e}");
                    Default::default()
                });

        let started = Instant::now();
        let mut ledger = self.ledger.lock().await;
        *ledger = Ledger::from_parts(calendar, index);
        let report = ledger.purge(today, self.policy.window_days);
        let fixed = ledger.reconcile();
        observability::record_occupancy(ledger.reservation_count(), ledger.free_count());
        info!(
            "restored {} reservations ({fixed} dates reconciled, {} expired)",
            ledger.reservation_count(),
            report.expired
        );
        drop(ledger);
        observability::record_operation("restore", "ok", started);
    }
}

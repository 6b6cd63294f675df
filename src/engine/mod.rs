mod conflict;
mod error;
mod maintenance;
mod mutations;
mod queries;
mod store;

pub use conflict::{StayPolicy, validate_query_range};
pub use error::{EngineError, ErrorKind};
pub use store::Ledger;

use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::info;

use crate::model::*;
use crate::observability;
use crate::snapshot::SnapshotStore;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Where snapshots live. `None` disables backup and restore.
    pub snapshot_dir: Option<PathBuf>,
    /// Load the last snapshot when the engine starts.
    pub restore_on_start: bool,
    pub policy: StayPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: None,
            restore_on_start: true,
            policy: StayPolicy::default(),
        }
    }
}

/// Availability calendar and reservation index for the single campsite.
///
/// Every operation, reads included, runs inside one exclusive lock over both
/// maps, and no operation awaits while holding it. Check-then-occupy is
/// therefore atomic: of N concurrent reservations for clashing dates exactly
/// one wins.
pub struct Engine {
    pub(super) ledger: Mutex<Ledger>,
    pub(super) store: Option<SnapshotStore>,
    pub(super) policy: StayPolicy,
}

impl Engine {
    /// Build an engine as of the local date.
    pub fn new(config: EngineConfig) -> Self {
        Self::new_at(config, today())
    }

    /// Build an engine as if today were `today`: restore the snapshot when
    /// configured, purge whatever expired while we were down and reseed the
    /// window, then let stored stays claim their dates.
    pub fn new_at(config: EngineConfig, today: NaiveDate) -> Self {
        let store = config.snapshot_dir.map(SnapshotStore::new);
        let mut ledger = Ledger::new();

        if config.restore_on_start
            && let Some(store) = &store
        {
            ledger = Ledger::from_parts(store.restore_calendar(), store.restore_index());
            let report = ledger.purge(today, config.policy.window_days);
            let fixed = ledger.reconcile();
            info!(
                "restored {} reservations from {} ({fixed} dates reconciled, {} expired)",
                ledger.reservation_count(),
                store.dir().display(),
                report.expired,
            );
        }
        if ledger.is_calendar_empty() {
            ledger.fill_window(today, config.policy.window_days);
        }
        observability::record_occupancy(ledger.reservation_count(), ledger.free_count());

        Self {
            ledger: Mutex::new(ledger),
            store,
            policy: config.policy,
        }
    }

    /// Engine with default policy and no snapshot directory.
    pub fn in_memory() -> Self {
        Self::new(EngineConfig::default())
    }

    pub fn policy(&self) -> &StayPolicy {
        &self.policy
    }

    pub fn snapshot_store(&self) -> Option<&SnapshotStore> {
        self.store.as_ref()
    }

    /// Consistent copy of both maps.
    pub async fn snapshot(&self) -> (Calendar, Index) {
        let ledger = self.ledger.lock().await;
        (ledger.calendar.clone(), ledger.index.clone())
    }
}

/// Metrics bookkeeping shared by the operation bodies.
pub(super) fn finish<T>(
    op: &'static str,
    started: Instant,
    result: Result<T, EngineError>,
) -> Result<T, EngineError> {
    let status = match &result {
        Ok(_) => "ok",
        Err(e) => e.label(),
    };
    observability::record_operation(op, status, started);
    result
}

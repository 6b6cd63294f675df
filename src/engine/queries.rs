use std::time::Instant;

use chrono::NaiveDate;

use crate::model::*;

use super::{Engine, EngineError, finish};

impl Engine {
    /// Free dates within the optional inclusive bounds, ascending. Inverted
    /// bounds match nothing.
    pub async fn available_dates(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Vec<NaiveDate> {
        let started = Instant::now();
        let dates = self.ledger.lock().await.free_dates(start, end);
        crate::observability::record_operation("available_dates", "ok", started);
        dates
    }

    pub async fn reservation(&self, id: &ReservationId) -> Result<Reservation, EngineError> {
        let started = Instant::now();
        let result = self
            .ledger
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(id.clone()));
        finish("get_reservation", started, result)
    }

    /// Every stored reservation, ordered by start date.
    pub async fn reservations(&self) -> Vec<Reservation> {
        let ledger = self.ledger.lock().await;
        let mut all: Vec<Reservation> = ledger.index.values().cloned().collect();
        all.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));
        all
    }
}

use std::time::Instant;

use tracing::{debug, info};

use crate::model::*;
use crate::observability;

use super::conflict::{check_range_free, validate_request};
use super::{Engine, EngineError, Ledger, finish};

/// Create-or-replace. When `retire` names an existing reservation it is
/// released first so the new stay may reuse its dates; if the new stay then
/// clashes, the retired reservation is put back unchanged before the error
/// is returned. Caller holds the engine lock.
fn upsert(
    ledger: &mut Ledger,
    request: ReservationRequest,
    stay: StayRange,
    retire: Option<&ReservationId>,
) -> Result<Reservation, EngineError> {
    let retired = retire.and_then(|id| ledger.release(id));

    if let Err(e) = check_range_free(&ledger.calendar, &stay) {
        // Its dates were freed a moment ago and nothing else holds the
        // lock, so putting it back cannot clash.
        if let Some(old) = retired {
            ledger.occupy(old);
        }
        return Err(e);
    }

    let reservation = Reservation::from_request(ledger.mint_id(), request);
    ledger.occupy(reservation.clone());
    Ok(reservation)
}

impl Engine {
    /// Book the campsite for the request's dates. The returned reservation
    /// carries a freshly minted id.
    pub async fn reserve(&self, request: ReservationRequest) -> Result<Reservation, EngineError> {
        let started = Instant::now();
        let result = self.reserve_inner(request).await;
        finish("reserve", started, result)
    }

    async fn reserve_inner(&self, request: ReservationRequest) -> Result<Reservation, EngineError> {
        let stay = validate_request(&request, today(), &self.policy)?;
        let mut ledger = self.ledger.lock().await;
        let reservation = upsert(&mut ledger, request, stay, None).inspect_err(|e| {
            debug!("reserve {}..={} rejected: {e}", stay.start, stay.end);
        })?;
        info!(
            "reserved {} for {}..={}",
            reservation.id, reservation.start_date, reservation.end_date
        );
        observability::record_occupancy(ledger.reservation_count(), ledger.free_count());
        Ok(reservation)
    }

    /// Move an existing reservation to the request's dates. Only the email on
    /// record may do this. On success the old id is gone and the reservation
    /// lives on under a new one; on failure nothing changes.
    pub async fn update(
        &self,
        id: &ReservationId,
        request: ReservationRequest,
    ) -> Result<Reservation, EngineError> {
        let started = Instant::now();
        let result = self.update_inner(id, request).await;
        finish("update", started, result)
    }

    async fn update_inner(
        &self,
        id: &ReservationId,
        request: ReservationRequest,
    ) -> Result<Reservation, EngineError> {
        let today = today();
        let mut ledger = self.ledger.lock().await;

        let existing = ledger
            .get(id)
            .ok_or_else(|| EngineError::NotFound(id.clone()))?;
        if existing.email != request.email {
            return Err(EngineError::Unauthorized(id.clone()));
        }
        let stay = validate_request(&request, today, &self.policy)?;

        let updated = upsert(&mut ledger, request, stay, Some(id)).inspect_err(|e| {
            debug!("update of {id} rejected: {e}");
        })?;
        info!(
            "moved {id} to {} for {}..={}",
            updated.id, updated.start_date, updated.end_date
        );
        observability::record_occupancy(ledger.reservation_count(), ledger.free_count());
        Ok(updated)
    }

    /// Free the reservation's dates. Only the email on record may do this.
    pub async fn cancel(&self, id: &ReservationId, email: &str) -> Result<(), EngineError> {
        let started = Instant::now();
        let result = self.cancel_inner(id, email).await;
        finish("cancel", started, result)
    }

    async fn cancel_inner(&self, id: &ReservationId, email: &str) -> Result<(), EngineError> {
        let mut ledger = self.ledger.lock().await;
        let existing = ledger
            .get(id)
            .ok_or_else(|| EngineError::NotFound(id.clone()))?;
        if existing.email != email {
            return Err(EngineError::Unauthorized(id.clone()));
        }
        ledger.release(id);
        info!("cancelled {id}");
        observability::record_occupancy(ledger.reservation_count(), ledger.free_count());
        Ok(())
    }
}

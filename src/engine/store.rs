use std::collections::btree_map::Entry;
use std::ops::Bound;

use chrono::NaiveDate;
use tracing::warn;

use crate::limits::MAX_ID_MINT_ATTEMPTS;
use crate::model::*;

/// Calendar and index together. Every invariant spans both maps, so they are
/// only ever mutated through one `&mut Ledger`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    pub(super) calendar: Calendar,
    pub(super) index: Index,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(calendar: Calendar, index: Index) -> Self {
        Self { calendar, index }
    }

    // ── Reads ────────────────────────────────────────────────

    pub fn get(&self, id: &ReservationId) -> Option<&Reservation> {
        self.index.get(id)
    }

    pub fn reservation_count(&self) -> usize {
        self.index.len()
    }

    pub fn is_calendar_empty(&self) -> bool {
        self.calendar.is_empty()
    }

    pub fn free_count(&self) -> usize {
        self.calendar.values().filter(|owner| owner.is_none()).count()
    }

    /// Free dates within the optional inclusive bounds, ascending.
    pub fn free_dates(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<NaiveDate> {
        if let (Some(s), Some(e)) = (start, end)
            && s > e
        {
            return Vec::new();
        }
        let lower = start.map_or(Bound::Unbounded, Bound::Included);
        let upper = end.map_or(Bound::Unbounded, Bound::Included);
        self.calendar
            .range((lower, upper))
            .filter(|(_, owner)| owner.is_none())
            .map(|(date, _)| *date)
            .collect()
    }

    // ── Mutations ────────────────────────────────────────────

    /// A token not currently present in the index.
    pub fn mint_id(&self) -> ReservationId {
        let mut id = ReservationId::generate();
        for _ in 1..MAX_ID_MINT_ATTEMPTS {
            if !self.index.contains_key(&id) {
                break;
            }
            id = ReservationId::generate();
        }
        id
    }

    /// Write the reservation's id into every calendar date of its stay and
    /// index it. Dates already rolled off the calendar are not re-added.
    pub fn occupy(&mut self, reservation: Reservation) {
        for date in reservation.stay().days() {
            if let Some(slot) = self.calendar.get_mut(&date) {
                *slot = Some(reservation.id.clone());
            }
        }
        self.index.insert(reservation.id.clone(), reservation);
    }

    /// Free the reservation's dates and drop it from the index.
    pub fn release(&mut self, id: &ReservationId) -> Option<Reservation> {
        let reservation = self.index.remove(id)?;
        for date in reservation.stay().days() {
            if let Some(slot) = self.calendar.get_mut(&date)
                && slot.as_ref() == Some(id)
            {
                *slot = None;
            }
        }
        Some(reservation)
    }

    /// Ensure every date in `today+1 ..= today+window_days` exists.
    /// Returns how many free dates were added.
    pub fn fill_window(&mut self, today: NaiveDate, window_days: u32) -> usize {
        let mut added = 0;
        for n in 1..=window_days {
            if let Entry::Vacant(slot) = self.calendar.entry(days_after(today, n)) {
                slot.insert(None);
                added += 1;
            }
        }
        added
    }

    /// Drop every date on or before `today`, drop reservations that ended
    /// before `today`, then top the window back up.
    pub fn purge(&mut self, today: NaiveDate, window_days: u32) -> PurgeReport {
        let future = self.calendar.split_off(&days_after(today, 1));
        let passed = std::mem::replace(&mut self.calendar, future);

        let before = self.index.len();
        self.index.retain(|_, r| r.end_date >= today);

        PurgeReport {
            expired: before - self.index.len(),
            dropped_dates: passed.len(),
            added_dates: self.fill_window(today, window_days),
        }
    }

    /// Repair a freshly restored ledger so both maps agree: dates pointing at
    /// unknown reservations become free, and free dates inside a stored stay
    /// are claimed by it. Returns the number of dates changed.
    pub fn reconcile(&mut self) -> usize {
        let mut fixed = 0;
        for slot in self.calendar.values_mut() {
            if let Some(id) = slot
                && !self.index.contains_key(id)
            {
                *slot = None;
                fixed += 1;
            }
        }
        for reservation in self.index.values() {
            for date in reservation.stay().days() {
                let Some(slot) = self.calendar.get_mut(&date) else {
                    continue;
                };
                if slot.is_none() {
                    *slot = Some(reservation.id.clone());
                    fixed += 1;
                } else if let Some(owner) = slot.as_ref()
                    && *owner != reservation.id
                {
                    warn!("reconcile: {date} held by {owner}, also claimed by {}", reservation.id);
                }
            }
        }
        fixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 5, day).unwrap()
    }

    fn res(id: &str, start: u32, end: u32) -> Reservation {
        Reservation {
            id: ReservationId::from(id),
            first_name: "Fern".into(),
            last_name: "Gully".into(),
            email: format!("{id}@example.com"),
            start_date: d(start),
            end_date: d(end),
        }
    }

    fn seeded(today: u32) -> Ledger {
        let mut ledger = Ledger::new();
        ledger.fill_window(d(today), 10);
        ledger
    }

    #[test]
    fn fill_window_starts_tomorrow() {
        let ledger = seeded(1);
        let dates: Vec<_> = ledger.calendar.keys().copied().collect();
        assert_eq!(dates.first(), Some(&d(2)));
        assert_eq!(dates.last(), Some(&d(11)));
        assert_eq!(ledger.free_count(), 10);
    }

    #[test]
    fn fill_window_is_idempotent() {
        let mut ledger = seeded(1);
        assert_eq!(ledger.fill_window(d(1), 10), 0);
        assert_eq!(ledger.calendar.len(), 10);
    }

    #[test]
    fn occupy_and_release() {
        let mut ledger = seeded(1);
        ledger.occupy(res("A", 3, 5));
        assert_eq!(ledger.free_count(), 7);
        assert_eq!(ledger.calendar[&d(4)], Some(ReservationId::from("A")));

        let released = ledger.release(&ReservationId::from("A")).unwrap();
        assert_eq!(released.start_date, d(3));
        assert_eq!(ledger.free_count(), 10);
        assert!(ledger.get(&ReservationId::from("A")).is_none());
    }

    #[test]
    fn release_unknown_is_none() {
        let mut ledger = seeded(1);
        assert!(ledger.release(&ReservationId::from("nope")).is_none());
    }

    #[test]
    fn release_does_not_free_foreign_dates() {
        let mut ledger = seeded(1);
        ledger.occupy(res("A", 3, 5));
        // Stale entry claiming an overlapping stay.
        ledger.index.insert(ReservationId::from("B"), res("B", 5, 6));
        ledger.release(&ReservationId::from("B"));
        assert_eq!(ledger.calendar[&d(5)], Some(ReservationId::from("A")));
    }

    #[test]
    fn occupy_skips_dates_outside_calendar() {
        let mut ledger = seeded(1);
        ledger.occupy(res("A", 1, 2));
        assert!(!ledger.calendar.contains_key(&d(1)));
        assert_eq!(ledger.calendar[&d(2)], Some(ReservationId::from("A")));
    }

    #[test]
    fn free_dates_bounds_are_inclusive() {
        let mut ledger = seeded(1);
        ledger.occupy(res("A", 4, 4));
        assert_eq!(ledger.free_dates(Some(d(3)), Some(d(5))), vec![d(3), d(5)]);
        assert_eq!(ledger.free_dates(None, Some(d(3))), vec![d(2), d(3)]);
        assert_eq!(ledger.free_dates(Some(d(10)), None), vec![d(10), d(11)]);
        assert!(ledger.free_dates(Some(d(5)), Some(d(3))).is_empty());
    }

    #[test]
    fn purge_drops_passed_dates_and_expired() {
        let mut ledger = seeded(1);
        ledger.occupy(res("OLD", 2, 3));
        ledger.occupy(res("ENDS_TODAY", 4, 5));
        ledger.occupy(res("FUTURE", 8, 9));

        let report = ledger.purge(d(5), 10);
        assert_eq!(report.expired, 1);
        assert_eq!(report.dropped_dates, 4); // 2..=5
        assert_eq!(report.added_dates, 4); // 12..=15

        assert!(ledger.get(&ReservationId::from("OLD")).is_none());
        assert!(ledger.get(&ReservationId::from("ENDS_TODAY")).is_some());
        assert!(ledger.get(&ReservationId::from("FUTURE")).is_some());
        let dates: Vec<_> = ledger.calendar.keys().copied().collect();
        assert_eq!(dates.first(), Some(&d(6)));
        assert_eq!(dates.last(), Some(&d(15)));
        assert_eq!(ledger.calendar.len(), 10);
    }

    #[test]
    fn purge_keeps_dates_beyond_window() {
        let mut ledger = seeded(1);
        ledger.calendar.insert(d(25), None);
        ledger.purge(d(1), 10);
        assert!(ledger.calendar.contains_key(&d(25)));
    }

    #[test]
    fn purge_drops_unreferenced_expired_reservations() {
        let mut ledger = seeded(10);
        // Only in the index, its dates long gone.
        ledger.index.insert(ReservationId::from("GHOST"), res("GHOST", 1, 2));
        let report = ledger.purge(d(10), 10);
        assert_eq!(report.expired, 1);
        assert_eq!(ledger.reservation_count(), 0);
    }

    #[test]
    fn reconcile_frees_dangling_and_claims_missing() {
        let mut ledger = seeded(1);
        ledger.calendar.insert(d(3), Some(ReservationId::from("DANGLING")));
        ledger.index.insert(ReservationId::from("A"), res("A", 6, 7));

        let fixed = ledger.reconcile();
        assert_eq!(fixed, 3);
        assert_eq!(ledger.calendar[&d(3)], None);
        assert_eq!(ledger.calendar[&d(6)], Some(ReservationId::from("A")));
        assert_eq!(ledger.calendar[&d(7)], Some(ReservationId::from("A")));
    }

    #[test]
    fn reconcile_after_reseed_claims_stays_from_empty_calendar() {
        let mut index = Index::new();
        index.insert(ReservationId::from("A"), res("A", 4, 5));
        let mut ledger = Ledger::from_parts(Calendar::new(), index);

        let report = ledger.purge(d(1), 10);
        assert_eq!(report.added_dates, 10);
        assert_eq!(ledger.reconcile(), 2);
        assert_eq!(ledger.calendar[&d(4)], Some(ReservationId::from("A")));
        assert_eq!(ledger.calendar[&d(5)], Some(ReservationId::from("A")));
        assert_eq!(ledger.free_count(), 8);
    }

    #[test]
    fn mint_id_avoids_existing() {
        let mut ledger = seeded(1);
        let id = ledger.mint_id();
        ledger.occupy(Reservation { id: id.clone(), ..res("x", 2, 2) });
        assert_ne!(ledger.mint_id(), id);
    }
}

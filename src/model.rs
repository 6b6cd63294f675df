use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Opaque reservation token. Only the engine mints new ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(String);

impl ReservationId {
    /// Mint a new 26-character alphanumeric token.
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReservationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ReservationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Inclusive day range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl StayRange {
    /// Returns `None` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Number of calendar days covered, both ends included.
    pub fn len_days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1) as u32
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every date in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// Candidate reservation as submitted by a caller. Carries no identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// A stored reservation. The engine owns these; callers get clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Reservation {
    pub fn from_request(id: ReservationId, request: ReservationRequest) -> Self {
        Self {
            id,
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            start_date: request.start_date,
            end_date: request.end_date,
        }
    }

    /// Date range of the stay. Stored reservations always have `start <= end`;
    /// a malformed one (hand-edited snapshot) degrades to its start day.
    pub fn stay(&self) -> StayRange {
        StayRange::new(self.start_date, self.end_date).unwrap_or(StayRange {
            start: self.start_date,
            end: self.start_date,
        })
    }
}

/// Date → owning reservation, or `None` when free.
pub type Calendar = BTreeMap<NaiveDate, Option<ReservationId>>;

/// Reservation id → reservation.
pub type Index = HashMap<ReservationId, Reservation>;

/// `today + n` days, saturating at the far end of the calendar.
pub fn days_after(today: NaiveDate, n: u32) -> NaiveDate {
    today.checked_add_days(Days::new(u64::from(n))).unwrap_or(NaiveDate::MAX)
}

/// Local calendar date. The campsite lives in one timezone: the host's.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

// ── Maintenance results ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Reservations dropped because their end date passed.
    pub expired: usize,
    /// Calendar dates on or before today that were removed.
    pub dropped_dates: usize,
    /// Free dates appended to restore the rolling window.
    pub added_dates: usize,
}

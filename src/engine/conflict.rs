use chrono::NaiveDate;

use crate::limits::*;
use crate::model::*;

use super::EngineError;

/// Request-level booking rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayPolicy {
    pub max_stay_days: u32,
    pub window_days: u32,
}

impl Default for StayPolicy {
    fn default() -> Self {
        Self {
            max_stay_days: DEFAULT_MAX_STAY_DAYS,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

fn invalid(msg: impl Into<String>) -> EngineError {
    EngineError::Invalid(msg.into())
}

fn check_name(field: &str, value: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} is required")));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(invalid(format!("{field} too long")));
    }
    Ok(())
}

/// Check a candidate against the stay policy as of `today`.
pub(crate) fn validate_request(
    request: &ReservationRequest,
    today: NaiveDate,
    policy: &StayPolicy,
) -> Result<StayRange, EngineError> {
    check_name("first name", &request.first_name)?;
    check_name("last name", &request.last_name)?;
    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(invalid("a valid email is required"));
    }
    if request.email.len() > MAX_EMAIL_LEN {
        return Err(invalid("email too long"));
    }

    let stay = StayRange::new(request.start_date, request.end_date)
        .ok_or_else(|| invalid("start date must not be after end date"))?;
    if stay.start <= today {
        return Err(invalid("cannot start on the same day or in the past"));
    }
    if stay.len_days() > policy.max_stay_days {
        return Err(invalid(format!(
            "cannot exceed {} days",
            policy.max_stay_days
        )));
    }
    let horizon = days_after(today, policy.window_days);
    if stay.end > horizon {
        return Err(invalid(format!(
            "allowed up to {} days in advance",
            policy.window_days
        )));
    }
    Ok(stay)
}

/// Reject an availability query whose bounds are inverted.
pub fn validate_query_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), EngineError> {
    if let (Some(s), Some(e)) = (start, end)
        && s > e
    {
        return Err(invalid("range start must not be after range end"));
    }
    Ok(())
}

/// Every date of `stay` must exist in the calendar and be free.
pub(crate) fn check_range_free(calendar: &Calendar, stay: &StayRange) -> Result<(), EngineError> {
    for date in stay.days() {
        match calendar.get(&date) {
            None => return Err(EngineError::OutsideWindow(date)),
            Some(Some(_)) => return Err(EngineError::Occupied(date)),
            Some(None) => {}
        }
    }
    Ok(())
}

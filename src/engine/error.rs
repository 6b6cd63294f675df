use chrono::NaiveDate;

use crate::model::ReservationId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    NotFound(ReservationId),
    /// Email on the request does not match the one on record.
    Unauthorized(ReservationId),
    /// First date in the requested range already owned by a reservation.
    Occupied(NaiveDate),
    /// Requested date is not part of the bookable calendar.
    OutsideWindow(NaiveDate),
    Invalid(String),
}

/// Coarse classification an adapter maps to its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    Validation,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::Unauthorized(_) => ErrorKind::Unauthorized,
            EngineError::Occupied(_) | EngineError::OutsideWindow(_) | EngineError::Invalid(_) => {
                ErrorKind::Validation
            }
        }
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::Unauthorized(_) => "unauthorized",
            EngineError::Occupied(_) => "occupied",
            EngineError::OutsideWindow(_) => "outside_window",
            EngineError::Invalid(_) => "invalid",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "reservation not found: {id}"),
            EngineError::Unauthorized(id) => {
                write!(f, "email is not associated with reservation {id}")
            }
            EngineError::Occupied(date) => {
                write!(f, "the campsite is occupied on {date}")
            }
            EngineError::OutsideWindow(date) => {
                write!(f, "{date} is outside the bookable window")
            }
            EngineError::Invalid(msg) => write!(f, "invalid reservation: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_failures_are_validation_errors() {
        let date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert_eq!(EngineError::Occupied(date).kind(), ErrorKind::Validation);
        assert_eq!(EngineError::OutsideWindow(date).kind(), ErrorKind::Validation);
        assert_eq!(EngineError::Invalid("x".into()).kind(), ErrorKind::Validation);
        let id = ReservationId::from("R1");
        assert_eq!(EngineError::NotFound(id.clone()).kind(), ErrorKind::NotFound);
        assert_eq!(EngineError::Unauthorized(id).kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn display_names_the_date() {
        let date = NaiveDate::from_ymd_opt(2030, 7, 4).unwrap();
        assert_eq!(
            EngineError::Occupied(date).to_string(),
            "the campsite is occupied on 2030-07-04"
        );
    }
}

//! Booking-date predicates. Each takes its reference day explicitly so callers decide
//! which clock applies.

use chrono::{Days, NaiveDate};

use super::FieldError;

/// How far ahead a rental may start.
pub const BOOKING_WINDOW_DAYS: u32 = 14;

/// Default upper bound on a single rental.
pub const DEFAULT_MAX_RENT_DAYS: u32 = 30;

pub(crate) fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

pub fn not_in_past(date: NaiveDate, today: NaiveDate) -> Result<(), FieldError> {
    if date < today {
        return Err(FieldError::DateInPast);
    }
    Ok(())
}

pub fn not_too_far_in_future(
    date: NaiveDate,
    today: NaiveDate,
    window_days: u32,
) -> Result<(), FieldError> {
    if date > add_days(today, window_days) {
        return Err(FieldError::BeyondBookingWindow { window_days });
    }
    Ok(())
}

pub fn not_too_long(date: NaiveDate, today: NaiveDate, max_days: u32) -> Result<(), FieldError> {
    if date > add_days(today, max_days) {
        return Err(FieldError::RentalTooLong { max_days });
    }
    Ok(())
}

//! Rent status rules. Status is a pure function of the stored dates, the close flag and
//! the current day, recomputed on every write and by the daily sweep.

use chrono::NaiveDate;

use super::domain::{NewRent, Rent, RentId, RentStatus, UserId};
use super::validation::add_days;

/// Derive the status for a rental.
///
/// A closed rental is `Finished`; otherwise it is `Pending` before its start day,
/// `Active` through its end day inclusive and `Overdue` afterwards.
pub fn compute_status(
    rent_start: NaiveDate,
    rent_end: NaiveDate,
    close_rent: bool,
    today: NaiveDate,
) -> RentStatus {
    if close_rent {
        RentStatus::Finished
    } else if rent_start > today {
        RentStatus::Pending
    } else if today <= rent_end {
        RentStatus::Active
    } else {
        RentStatus::Overdue
    }
}

pub fn rent_end_for(rent_start: NaiveDate, duration: u32) -> NaiveDate {
    add_days(rent_start, duration)
}

impl Rent {
    /// Build a booking and evaluate its entry state (`pending` or `active`).
    pub fn book(
        id: RentId,
        renter: UserId,
        booking: &NewRent,
        today: NaiveDate,
    ) -> Self {
        let mut rent = Rent {
            id,
            offer: booking.offer,
            renter,
            rent_start: booking.rent_start,
            duration: booking.duration,
            rent_end: rent_end_for(booking.rent_start, booking.duration),
            status: RentStatus::Pending,
            close_rent: false,
        };
        rent.apply_lifecycle(today);
        rent
    }

    /// Recompute `rent_end` and `status` for `today`; returns whether anything changed.
    ///
    /// Finished rentals are frozen, so closing is applied exactly once and the
    /// early `rent_end` survives later sweeps.
    pub fn apply_lifecycle(&mut self, today: NaiveDate) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        let before = (self.status, self.rent_end);

        self.rent_end = if self.close_rent {
            today
        } else {
            rent_end_for(self.rent_start, self.duration)
        };
        self.status = compute_status(self.rent_start, self.rent_end, self.close_rent, today);

        before != (self.status, self.rent_end)
    }

    /// Whether this rental still holds its offer.
    pub fn blocks_offer(&self) -> bool {
        !self.status.is_terminal() && !self.close_rent
    }
}

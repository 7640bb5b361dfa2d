use chrono::NaiveDate;

use super::domain::{Car, CarId, NewCar, NewRent, UserId};
use super::lifecycle::rent_end_for;
use super::validation::{
    check_vin, normalize_vin, not_in_past, not_too_far_in_future, not_too_long,
    validate_description, validate_duration, validate_mileage, validate_model, validate_price,
    validate_year, FieldErrors, BOOKING_WINDOW_DAYS, DEFAULT_MAX_RENT_DAYS,
};
use crate::config::RentalConfig;

/// Booking limits applied to every new rent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalPolicy {
    max_rent_days: u32,
    booking_window_days: u32,
}

impl RentalPolicy {
    /// A zero maximum would make every booking invalid, so it falls back to the default.
    pub fn new(max_rent_days: u32, booking_window_days: u32) -> Self {
        let max_rent_days = if max_rent_days == 0 {
            DEFAULT_MAX_RENT_DAYS
        } else {
            max_rent_days
        };

        Self {
            max_rent_days,
            booking_window_days,
        }
    }

    pub fn max_rent_days(&self) -> u32 {
        self.max_rent_days
    }

    pub fn booking_window_days(&self) -> u32 {
        self.booking_window_days
    }
}

impl Default for RentalPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RENT_DAYS, BOOKING_WINDOW_DAYS)
    }
}

impl From<&RentalConfig> for RentalPolicy {
    fn from(config: &RentalConfig) -> Self {
        Self::new(config.max_rent_days, config.booking_window_days)
    }
}

/// Runs every field validator before anything is written.
#[derive(Debug, Clone, Default)]
pub struct ListingGuard {
    policy: RentalPolicy,
}

impl ListingGuard {
    pub fn with_policy(policy: RentalPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RentalPolicy {
        &self.policy
    }

    /// Validate a listing and turn it into a car record with a normalized VIN.
    pub fn car_from_submission(
        &self,
        id: CarId,
        owner: UserId,
        submission: NewCar,
        today: NaiveDate,
    ) -> Result<Car, FieldErrors> {
        let car = Car {
            id,
            vin: normalize_vin(&submission.vin),
            brand: submission.brand,
            model: submission.model.trim().to_string(),
            mileage: submission.mileage,
            production_year: submission.production_year,
            owner,
        };
        self.check_car(&car, today)?;
        Ok(car)
    }

    pub fn check_car(&self, car: &Car, today: NaiveDate) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors
            .check("vin", check_vin(&car.vin))
            .check("model", validate_model(&car.model))
            .check("mileage", validate_mileage(car.mileage));
        if let Some(year) = car.production_year {
            errors.check("production_year", validate_year(year, today));
        }
        errors.into_result()
    }

    pub fn check_offer(&self, description: &str, price: f64) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors
            .check("description", validate_description(description))
            .check("price", validate_price(price));
        errors.into_result()
    }

    /// Start day must fall inside the booking window and the return day must come no
    /// later than today plus the configured maximum.
    pub fn check_booking(&self, booking: &NewRent, today: NaiveDate) -> Result<(), FieldErrors> {
        let rent_end = rent_end_for(booking.rent_start, booking.duration);
        let mut errors = FieldErrors::new();
        errors
            .check("rent_start", not_in_past(booking.rent_start, today))
            .check(
                "rent_start",
                not_too_far_in_future(booking.rent_start, today, self.policy.booking_window_days),
            )
            .check(
                "duration",
                validate_duration(booking.duration, self.policy.max_rent_days),
            )
            .check(
                "rent_end",
                not_too_long(rent_end, today, self.policy.max_rent_days),
            );
        errors.into_result()
    }
}

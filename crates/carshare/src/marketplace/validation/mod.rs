//! Field validators for car, offer and rent submissions.

mod dates;
mod vehicle;
mod vin;

use std::collections::BTreeMap;
use std::fmt;

pub(crate) use dates::add_days;
pub use dates::{
    not_in_past, not_too_far_in_future, not_too_long, BOOKING_WINDOW_DAYS, DEFAULT_MAX_RENT_DAYS,
};
pub use vehicle::{
    validate_description, validate_duration, validate_mileage, validate_model, validate_price,
    validate_year, FIRST_CAR_YEAR, MAX_DESCRIPTION_LENGTH, MAX_MILEAGE, MAX_MODEL_LENGTH,
    MAX_PRICE, MIN_PRICE,
};
pub use vin::{check_vin, is_valid_vin, normalize_vin, VIN_LENGTH};

/// A single rejected field value. Messages are shown to end users verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("VIN is too short.")]
    VinLength,
    #[error("VIN should contain only letters and numbers.")]
    VinCharacters,
    #[error("VIN is invalid.")]
    VinChecksum,
    #[error("Enter a valid date.")]
    DateInPast,
    #[error("You can rent a car for a maximum of two weeks in advance.")]
    BeyondBookingWindow { window_days: u32 },
    #[error("A rental can last at most {max_days} days.")]
    RentalTooLong { max_days: u32 },
    #[error("Rental duration must be between 1 and {max_days} days.")]
    DurationOutOfRange { max_days: u32 },
    #[error("You can't enter the year before the first car was made.")]
    YearBeforeFirstCar,
    #[error("You can't add the car from future.")]
    YearInFuture,
    #[error("Enter the valid year.")]
    YearNotFourDigits,
    #[error("You can't add the car with more than 1 000 000 km.")]
    MileageTooHigh,
    #[error("Ensure the price is greater than or equal to 10.0.")]
    PriceTooLow,
    #[error("Ensure the price is less than or equal to 100000.0.")]
    PriceTooHigh,
    #[error("Enter a number.")]
    PriceNotFinite,
    #[error("This field is required.")]
    ModelBlank,
    #[error("Ensure the model has at most 15 characters.")]
    ModelTooLong,
    #[error("Ensure the description has at most 300 characters.")]
    DescriptionTooLong,
}

/// Every failure of a submission, grouped per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    fields: BTreeMap<&'static str, Vec<FieldError>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one validator against `field`.
    pub fn check(&mut self, field: &'static str, outcome: Result<(), FieldError>) -> &mut Self {
        if let Err(error) = outcome {
            self.fields.entry(field).or_default().push(error);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[FieldError] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn messages(&self) -> BTreeMap<&'static str, Vec<String>> {
        self.fields
            .iter()
            .map(|(field, errors)| (*field, errors.iter().map(ToString::to_string).collect()))
            .collect()
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.keys().copied().collect();
        write!(f, "invalid fields: {}", names.join(", "))
    }
}

impl std::error::Error for FieldErrors {}

impl From<(&'static str, FieldError)> for FieldErrors {
    fn from((field, error): (&'static str, FieldError)) -> Self {
        let mut errors = FieldErrors::new();
        errors.check(field, Err(error));
        errors
    }
}

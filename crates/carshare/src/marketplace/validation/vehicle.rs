use chrono::{Datelike, NaiveDate};

use super::FieldError;

/// Benz Patent-Motorwagen.
pub const FIRST_CAR_YEAR: i32 = 1886;
pub const MAX_MILEAGE: u32 = 1_000_000;
pub const MIN_PRICE: f64 = 10.0;
pub const MAX_PRICE: f64 = 100_000.0;
pub const MAX_MODEL_LENGTH: usize = 15;
pub const MAX_DESCRIPTION_LENGTH: usize = 300;

pub fn validate_year(year: i32, today: NaiveDate) -> Result<(), FieldError> {
    if year < FIRST_CAR_YEAR {
        return Err(FieldError::YearBeforeFirstCar);
    }
    if year > today.year() {
        return Err(FieldError::YearInFuture);
    }
    if year.to_string().len() != 4 {
        return Err(FieldError::YearNotFourDigits);
    }
    Ok(())
}

pub fn validate_mileage(mileage: u32) -> Result<(), FieldError> {
    if mileage > MAX_MILEAGE {
        return Err(FieldError::MileageTooHigh);
    }
    Ok(())
}

pub fn validate_price(price: f64) -> Result<(), FieldError> {
    if !price.is_finite() {
        return Err(FieldError::PriceNotFinite);
    }
    if price < MIN_PRICE {
        return Err(FieldError::PriceTooLow);
    }
    if price > MAX_PRICE {
        return Err(FieldError::PriceTooHigh);
    }
    Ok(())
}

pub fn validate_duration(duration: u32, max_days: u32) -> Result<(), FieldError> {
    if duration == 0 || duration > max_days {
        return Err(FieldError::DurationOutOfRange { max_days });
    }
    Ok(())
}

pub fn validate_model(model: &str) -> Result<(), FieldError> {
    let model = model.trim();
    if model.is_empty() {
        return Err(FieldError::ModelBlank);
    }
    if model.chars().count() > MAX_MODEL_LENGTH {
        return Err(FieldError::ModelTooLong);
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), FieldError> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(FieldError::DescriptionTooLong);
    }
    Ok(())
}

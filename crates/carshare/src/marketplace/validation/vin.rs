//! Vehicle Identification Number checksum (North American check digit scheme).

use super::FieldError;

pub const VIN_LENGTH: usize = 17;

const CHECK_DIGIT_INDEX: usize = 8;
const WEIGHTS: [u32; VIN_LENGTH] = [8, 7, 6, 5, 4, 3, 2, 10, 0, 9, 8, 7, 6, 5, 4, 3, 2];

/// Numeric value of a VIN character. `I`, `O` and `Q` have no value.
fn transliterate(c: char) -> Option<u32> {
    match c.to_ascii_uppercase() {
        digit @ '0'..='9' => digit.to_digit(10),
        'A' | 'J' => Some(1),
        'B' | 'K' | 'S' => Some(2),
        'C' | 'L' | 'T' => Some(3),
        'D' | 'M' | 'U' => Some(4),
        'E' | 'N' | 'V' => Some(5),
        'F' | 'W' => Some(6),
        'G' | 'P' | 'X' => Some(7),
        'H' | 'Y' => Some(8),
        'R' | 'Z' => Some(9),
        _ => None,
    }
}

/// Returns whether `vin` carries a correct check digit in position 9.
pub fn is_valid_vin(vin: &str) -> bool {
    let chars: Vec<char> = vin.chars().collect();
    if chars.len() != VIN_LENGTH {
        return false;
    }

    let mut checksum = 0u32;
    for (index, c) in chars.iter().enumerate() {
        if index == CHECK_DIGIT_INDEX {
            continue;
        }
        match transliterate(*c) {
            Some(value) => checksum += value * WEIGHTS[index],
            None => return false,
        }
    }

    let remainder = checksum % 11;
    match chars[CHECK_DIGIT_INDEX].to_ascii_uppercase() {
        'X' => remainder == 10,
        digit => digit.to_digit(10) == Some(remainder),
    }
}

/// Canonical stored form: trimmed and upper-cased.
pub fn normalize_vin(vin: &str) -> String {
    vin.trim().to_ascii_uppercase()
}

/// Field-level check reporting the most specific failure.
pub fn check_vin(vin: &str) -> Result<(), FieldError> {
    if vin.chars().count() != VIN_LENGTH {
        return Err(FieldError::VinLength);
    }
    if !vin.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(FieldError::VinCharacters);
    }
    if !is_valid_vin(vin) {
        return Err(FieldError::VinChecksum);
    }
    Ok(())
}

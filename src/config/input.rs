use crate::error::EvolverError;
use std::str::FromStr;

/// Parse a numeric value typed by the user.
///
/// Malformed text yields `InvalidNumericInput`; the caller reports it and
/// keeps whatever state it had.
pub fn parse_numeric<T: FromStr>(field: &str, text: &str) -> Result<T, EvolverError> {
    text.trim().parse::<T>().map_err(|_| EvolverError::InvalidNumericInput {
        field: field.to_string(),
        value: text.to_string(),
    })
}

/// Like [`parse_numeric`], but also rejects values below `min` and non-finite floats.
pub fn parse_at_least(field: &str, text: &str, min: f64) -> Result<f64, EvolverError> {
    let value: f64 = parse_numeric(field, text)?;
    if !value.is_finite() || value < min {
        return Err(EvolverError::InvalidNumericInput {
            field: field.to_string(),
            value: text.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_whitespace() {
        let steps: u32 = parse_numeric("steps", " 25 ").unwrap();
        assert_eq!(steps, 25);
    }

    #[test]
    fn test_parse_reports_field() {
        let err = parse_numeric::<u64>("seed", "abc").unwrap_err();
        match err {
            EvolverError::InvalidNumericInput { field, value } => {
                assert_eq!(field, "seed");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_negative_into_unsigned_is_invalid() {
        assert!(parse_numeric::<u32>("steps", "-3").is_err());
    }

    #[test]
    fn test_parse_at_least() {
        assert_eq!(parse_at_least("guidance", "7.5", 1.0).unwrap(), 7.5);
        assert!(parse_at_least("guidance", "0.5", 1.0).is_err());
        assert!(parse_at_least("guidance", "NaN", 1.0).is_err());
    }
}

//! Input validation functions
//!
//! Range validators used by CSV ingestion to reject implausible reference
//! rows, plus the field-level error type surfaced by the API. Request
//! bodies use the `validator` derive on [`crate::types::PredictRequest`];
//! these functions cover data that arrives outside that path.

/// Validate an age in years
pub fn validate_age(age: i32) -> Result<(), String> {
    if age < 5 {
        return Err("age must be at least 5".to_string());
    }
    if age > 120 {
        return Err("age must be at most 120".to_string());
    }
    Ok(())
}

/// Validate a height value (in cm)
pub fn validate_height_cm(height_cm: f64) -> Result<(), String> {
    if height_cm.is_nan() || height_cm.is_infinite() {
        return Err("height must be a valid number".to_string());
    }
    if height_cm < 50.0 {
        return Err("height must be at least 50 cm".to_string());
    }
    if height_cm > 300.0 {
        return Err("height must be at most 300 cm".to_string());
    }
    Ok(())
}

/// Validate a weight value (in kg)
pub fn validate_weight_kg(weight_kg: f64) -> Result<(), String> {
    if weight_kg.is_nan() || weight_kg.is_infinite() {
        return Err("weight must be a valid number".to_string());
    }
    if weight_kg < 20.0 {
        return Err("weight must be at least 20 kg".to_string());
    }
    if weight_kg > 500.0 {
        return Err("weight must be at most 500 kg".to_string());
    }
    Ok(())
}

/// Validate a sit-up count
pub fn validate_sit_ups(sit_ups: i32) -> Result<(), String> {
    if sit_ups < 0 {
        return Err("sit-up count cannot be negative".to_string());
    }
    if sit_ups > 200 {
        return Err("sit-up count unreasonably high".to_string());
    }
    Ok(())
}

/// Validate a broad jump distance (in cm)
pub fn validate_broad_jump_cm(broad_jump_cm: f64) -> Result<(), String> {
    if broad_jump_cm.is_nan() || broad_jump_cm.is_infinite() {
        return Err("broad jump must be a valid number".to_string());
    }
    if broad_jump_cm < 0.0 {
        return Err("broad jump cannot be negative".to_string());
    }
    if broad_jump_cm > 500.0 {
        return Err("broad jump unreasonably far".to_string());
    }
    Ok(())
}

/// Validation error with field context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate the core anthropometric fields of a reference row.
///
/// Performance readings (sit-ups, broad jump) may legitimately be absent
/// and are only checked when present.
pub fn validate_reference_row(
    age: i32,
    height_cm: f64,
    weight_kg: f64,
    sit_ups: Option<i32>,
    broad_jump_cm: Option<f64>,
) -> Result<(), FieldError> {
    validate_age(age).map_err(|m| FieldError::new("age", m))?;
    validate_height_cm(height_cm).map_err(|m| FieldError::new("height_cm", m))?;
    validate_weight_kg(weight_kg).map_err(|m| FieldError::new("weight_kg", m))?;
    if let Some(s) = sit_ups {
        validate_sit_ups(s).map_err(|m| FieldError::new("sit_ups_counts", m))?;
    }
    if let Some(b) = broad_jump_cm {
        validate_broad_jump_cm(b).map_err(|m| FieldError::new("broad_jump_cm", m))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_validate_age() {
        assert!(validate_age(28).is_ok());
        assert!(validate_age(5).is_ok());
        assert!(validate_age(120).is_ok());
        assert!(validate_age(4).is_err());
        assert!(validate_age(121).is_err());
    }

    #[test]
    fn test_validate_height() {
        assert!(validate_height_cm(175.0).is_ok());
        assert!(validate_height_cm(49.9).is_err());
        assert!(validate_height_cm(300.1).is_err());
        assert!(validate_height_cm(f64::NAN).is_err());
        assert!(validate_height_cm(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_weight() {
        assert!(validate_weight_kg(70.0).is_ok());
        assert!(validate_weight_kg(19.9).is_err());
        assert!(validate_weight_kg(500.1).is_err());
        assert!(validate_weight_kg(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_reference_row_optional_fields() {
        assert!(validate_reference_row(30, 170.0, 65.0, None, None).is_ok());
        assert!(validate_reference_row(30, 170.0, 65.0, Some(40), Some(210.0)).is_ok());
        assert!(validate_reference_row(30, 170.0, 65.0, Some(-1), None).is_err());
        assert!(validate_reference_row(30, 170.0, 65.0, None, Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_field_error_names_the_field() {
        let err = validate_reference_row(2, 170.0, 65.0, None, None).unwrap_err();
        assert_eq!(err.field, "age");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_valid_age_range(age in 5i32..=120) {
            prop_assert!(validate_age(age).is_ok());
        }

        #[test]
        fn prop_valid_height_range(height in 50.0f64..=300.0) {
            prop_assert!(validate_height_cm(height).is_ok());
        }

        #[test]
        fn prop_valid_weight_range(weight in 20.0f64..=500.0) {
            prop_assert!(validate_weight_kg(weight).is_ok());
        }

        #[test]
        fn prop_invalid_weight_below_min(weight in 0.0f64..20.0) {
            prop_assert!(validate_weight_kg(weight).is_err());
        }
    }
}

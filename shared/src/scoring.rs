//! Fitness metric calculators
//!
//! Pure functions computing BMI, BMI category, the deterministic base
//! fitness score, age-group labels, and the ideal weight range. All band
//! boundaries are fixed scoring constants.
//!
//! # Design Principles
//!
//! 1. **Pure Functions**: All calculations are pure, no side effects
//! 2. **Fail Closed**: out-of-domain input degrades to the lowest band,
//!    never NaN or a panic

use serde::{Deserialize, Serialize};

// ============================================================================
// BMI
// ============================================================================

/// BMI category classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    /// Classify a BMI value. Non-finite input fails closed to `Obese`
    /// (the lowest-scoring band).
    pub fn from_bmi(bmi: f64) -> BmiCategory {
        if !bmi.is_finite() {
            return BmiCategory::Obese;
        }
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }

    /// Get a human-readable label
    pub fn description(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obese => "Obese",
        }
    }
}

/// Calculate BMI from weight and height.
///
/// Formula: BMI = weight(kg) / height(m)². Upstream request validation
/// bounds weight to 30-300 kg and height to 100-250 cm.
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    weight_kg / (height_m * height_m)
}

/// Ideal weight range (whole kg) for a height, from the healthy BMI
/// band 18.5-24.9.
pub fn ideal_weight_range(height_cm: f64) -> (i32, i32) {
    let height_m = height_cm / 100.0;
    let min = (18.5 * height_m * height_m).round() as i32;
    let max = (24.9 * height_m * height_m).round() as i32;
    (min, max)
}

// ============================================================================
// Base fitness score
// ============================================================================

/// Sit-up sub-score, 0-30 points, age-tiered.
fn sit_up_points(age: i32, sit_ups: i32) -> i32 {
    if age < 30 {
        match sit_ups {
            s if s >= 40 => 30,
            s if s >= 30 => 25,
            s if s >= 20 => 20,
            s if s >= 10 => 15,
            _ => 10,
        }
    } else if age < 50 {
        match sit_ups {
            s if s >= 35 => 30,
            s if s >= 25 => 25,
            s if s >= 15 => 20,
            s if s >= 8 => 15,
            _ => 10,
        }
    } else {
        match sit_ups {
            s if s >= 25 => 30,
            s if s >= 18 => 25,
            s if s >= 12 => 20,
            s if s >= 6 => 15,
            _ => 10,
        }
    }
}

/// Broad-jump sub-score, 0-30 points, age-tiered.
fn broad_jump_points(age: i32, broad_jump_cm: f64) -> i32 {
    if age < 30 {
        match broad_jump_cm {
            b if b >= 240.0 => 30,
            b if b >= 220.0 => 25,
            b if b >= 200.0 => 20,
            b if b >= 180.0 => 15,
            _ => 10,
        }
    } else if age < 50 {
        match broad_jump_cm {
            b if b >= 220.0 => 30,
            b if b >= 200.0 => 25,
            b if b >= 180.0 => 20,
            b if b >= 160.0 => 15,
            _ => 10,
        }
    } else {
        match broad_jump_cm {
            b if b >= 200.0 => 30,
            b if b >= 180.0 => 25,
            b if b >= 160.0 => 20,
            b if b >= 140.0 => 15,
            _ => 10,
        }
    }
}

/// BMI sub-score, 0-20 points. Non-finite BMI lands in the lowest band.
fn bmi_points(bmi: f64) -> i32 {
    if (18.5..25.0).contains(&bmi) {
        20
    } else if (25.0..30.0).contains(&bmi) {
        15
    } else if (30.0..35.0).contains(&bmi) {
        10
    } else {
        5
    }
}

/// Age sub-score, 0-20 points, monotonically decreasing.
fn age_points(age: i32) -> i32 {
    if age < 25 {
        20
    } else if age < 35 {
        18
    } else if age < 45 {
        16
    } else if age < 55 {
        14
    } else if age < 65 {
        12
    } else {
        10
    }
}

/// Base fitness score in [0, 100].
///
/// Sum of four independently-bucketed sub-scores: sit-ups (0-30),
/// broad jump (0-30), BMI (0-20), age (0-20). This is the fallback
/// classifier input when no neighbor vote is available.
pub fn base_fitness_score(age: i32, sit_ups: i32, broad_jump_cm: f64, bmi: f64) -> i32 {
    let score = sit_up_points(age, sit_ups)
        + broad_jump_points(age, broad_jump_cm)
        + bmi_points(bmi)
        + age_points(age);
    score.clamp(0, 100)
}

// ============================================================================
// Age groups
// ============================================================================

/// Age-group label for response metadata and recommendation text.
pub fn age_group(age: i32) -> &'static str {
    if age < 25 {
        "Young Adult"
    } else if age < 35 {
        "Adult"
    } else if age < 50 {
        "Middle Age"
    } else if age < 65 {
        "Senior"
    } else {
        "Elderly"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_bmi_formula() {
        let value = bmi(70.0, 175.0);
        assert!((value - 22.857).abs() < 0.01, "got {value}");
    }

    #[test]
    fn test_bmi_categories() {
        assert_eq!(BmiCategory::from_bmi(17.0), BmiCategory::Underweight);
        assert_eq!(BmiCategory::from_bmi(18.5), BmiCategory::Normal);
        assert_eq!(BmiCategory::from_bmi(24.9), BmiCategory::Normal);
        assert_eq!(BmiCategory::from_bmi(25.0), BmiCategory::Overweight);
        assert_eq!(BmiCategory::from_bmi(30.0), BmiCategory::Obese);
        assert_eq!(BmiCategory::from_bmi(f64::NAN), BmiCategory::Obese);
    }

    #[test]
    fn test_near_maximum_score() {
        // Young, fit profile hits the top band of every component
        let score = base_fitness_score(25, 50, 250.0, 22.0);
        assert_eq!(score, 30 + 30 + 20 + 18);
        let score = base_fitness_score(24, 50, 250.0, 22.0);
        assert_eq!(score, 100);
    }

    #[test]
    fn test_minimum_score_stays_in_range() {
        let score = base_fitness_score(80, 0, 0.0, 40.0);
        assert_eq!(score, 10 + 10 + 5 + 10);
    }

    #[rstest]
    #[case(20, "Young Adult")]
    #[case(25, "Adult")]
    #[case(34, "Adult")]
    #[case(35, "Middle Age")]
    #[case(50, "Senior")]
    #[case(64, "Senior")]
    #[case(65, "Elderly")]
    fn test_age_groups(#[case] age: i32, #[case] expected: &str) {
        assert_eq!(age_group(age), expected);
    }

    #[test]
    fn test_ideal_weight_range() {
        let (min, max) = ideal_weight_range(175.0);
        assert_eq!(min, 57);
        assert_eq!(max, 76);
    }

    #[test]
    fn test_non_finite_bmi_fails_closed() {
        let score = base_fitness_score(25, 30, 200.0, f64::NAN);
        // NaN falls through every band comparison into the lowest
        assert_eq!(score, 25 + 20 + 5 + 18);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_score_always_in_range(
            age in 10i32..=100,
            sit_ups in 0i32..=100,
            broad_jump in 50.0f64..=400.0,
            bmi in 10.0f64..=60.0,
        ) {
            let score = base_fitness_score(age, sit_ups, broad_jump, bmi);
            prop_assert!((0..=100).contains(&score));
        }

        #[test]
        fn prop_score_monotonic_in_sit_ups(
            age in 10i32..=100,
            sit_ups in 0i32..=99,
            broad_jump in 50.0f64..=400.0,
            bmi in 10.0f64..=60.0,
        ) {
            let lower = base_fitness_score(age, sit_ups, broad_jump, bmi);
            let higher = base_fitness_score(age, sit_ups + 1, broad_jump, bmi);
            prop_assert!(higher >= lower);
        }

        #[test]
        fn prop_score_monotonic_in_broad_jump(
            age in 10i32..=100,
            sit_ups in 0i32..=100,
            broad_jump in 50.0f64..=399.0,
            bmi in 10.0f64..=60.0,
        ) {
            let lower = base_fitness_score(age, sit_ups, broad_jump, bmi);
            let higher = base_fitness_score(age, sit_ups, broad_jump + 1.0, bmi);
            prop_assert!(higher >= lower);
        }

        #[test]
        fn prop_ideal_weight_range_ordered(height in 100.0f64..=250.0) {
            let (min, max) = ideal_weight_range(height);
            prop_assert!(min < max);
            prop_assert!(min > 0);
        }
    }
}

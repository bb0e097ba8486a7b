//! Derived health metrics
//!
//! BMI and the U.S. Navy circumference body-fat estimate, computed from the
//! most recent usable measurement of each required type.

use std::str::FromStr;

use tracing::debug;

use crate::error::AnalyticsError;
use crate::measurements::{
    entries_of_type, to_centimeters, to_kilograms, BODY_WEIGHT, HEIGHT, HIPS, NECK, WAIST,
};
use crate::types::{BmiCategory, Gender, Measurement};

/// Most recent entry of `measurement_type` whose unit `convert` understands
fn latest_converted(
    measurements: &[Measurement],
    measurement_type: &str,
    convert: fn(f64, &str) -> Option<f64>,
) -> Option<f64> {
    entries_of_type(measurements, measurement_type)
        .into_iter()
        .rev()
        .find_map(|m| {
            let converted = convert(m.value, &m.unit);
            if converted.is_none() {
                debug!(
                    measurement_type,
                    unit = %m.unit,
                    "skipping measurement with unsupported unit"
                );
            }
            converted
        })
}

fn latest_cm(measurements: &[Measurement], measurement_type: &str) -> Option<f64> {
    latest_converted(measurements, measurement_type, to_centimeters).filter(|v| *v > 0.0)
}

/// Body mass index from the latest body weight and height
pub fn bmi(measurements: &[Measurement]) -> Option<f64> {
    let weight_kg = latest_converted(measurements, BODY_WEIGHT, to_kilograms)?;
    let height_m = latest_cm(measurements, HEIGHT)? / 100.0;
    let value = weight_kg / (height_m * height_m);
    value.is_finite().then_some(value)
}

/// WHO adult category for a BMI value
pub fn bmi_category(bmi: f64) -> BmiCategory {
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

/// Navy-method body fat percentage from the latest height, waist, neck and
/// (for women) hips measurements.
///
/// Fails for an unrecognized `gender`; returns `Ok(None)` when a required
/// measurement is missing.
pub fn navy_body_fat(
    measurements: &[Measurement],
    gender: &str,
) -> Result<Option<f64>, AnalyticsError> {
    let gender = Gender::from_str(gender)?;

    let (Some(height), Some(waist), Some(neck)) = (
        latest_cm(measurements, HEIGHT),
        latest_cm(measurements, WAIST),
        latest_cm(measurements, NECK),
    ) else {
        return Ok(None);
    };
    let hips = latest_cm(measurements, HIPS);

    Ok(navy_body_fat_from(gender, height, waist, neck, hips))
}

/// Closed-form Navy formula on centimeter inputs
pub fn navy_body_fat_from(
    gender: Gender,
    height_cm: f64,
    waist_cm: f64,
    neck_cm: f64,
    hips_cm: Option<f64>,
) -> Option<f64> {
    let density = match gender {
        Gender::Male => {
            let girth = waist_cm - neck_cm;
            if girth <= 0.0 || height_cm <= 0.0 {
                return None;
            }
            1.0324 - 0.19077 * girth.log10() + 0.15456 * height_cm.log10()
        }
        Gender::Female => {
            let girth = waist_cm + hips_cm? - neck_cm;
            if girth <= 0.0 || height_cm <= 0.0 {
                return None;
            }
            1.29579 - 0.35004 * girth.log10() + 0.22100 * height_cm.log10()
        }
    };

    let body_fat = 495.0 / density - 450.0;
    body_fat.is_finite().then_some(body_fat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurements::test_support::{make_measurement, make_with_unit};

    fn male_measurements() -> Vec<Measurement> {
        vec![
            make_with_unit(HEIGHT, 180.0, "cm", 30),
            make_with_unit(WAIST, 85.0, "cm", 2),
            make_with_unit(NECK, 38.0, "cm", 2),
        ]
    }

    #[test]
    fn test_male_body_fat_closed_form() {
        let body_fat = navy_body_fat(&male_measurements(), "male").unwrap().unwrap();
        let expected =
            495.0 / (1.0324 - 0.19077 * 47.0_f64.log10() + 0.15456 * 180.0_f64.log10()) - 450.0;

        assert!((body_fat - expected).abs() < 1e-12);
        assert!((body_fat - 16.1).abs() < 0.1);
    }

    #[test]
    fn test_female_requires_hips() {
        let mut measurements = male_measurements();
        assert_eq!(navy_body_fat(&measurements, "female").unwrap(), None);

        measurements.push(make_with_unit(HIPS, 100.0, "cm", 2));
        let body_fat = navy_body_fat(&measurements, "Female").unwrap().unwrap();
        let expected =
            495.0 / (1.29579 - 0.35004 * 147.0_f64.log10() + 0.22100 * 180.0_f64.log10()) - 450.0;
        assert!((body_fat - expected).abs() < 1e-12);
    }

    #[test]
    fn test_unsupported_gender_fails() {
        let result = navy_body_fat(&male_measurements(), "unknown");
        assert!(matches!(result, Err(AnalyticsError::UnsupportedGender(_))));

        // Still an error when data is missing
        let result = navy_body_fat(&[], "other");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_measurement() {
        let measurements = vec![
            make_measurement(HEIGHT, 180.0, 1),
            make_measurement(WAIST, 85.0, 1),
        ];
        assert_eq!(navy_body_fat(&measurements, "male").unwrap(), None);
    }

    #[test]
    fn test_uses_latest_and_converts_units() {
        let measurements = vec![
            make_with_unit(HEIGHT, 180.0, "cm", 100),
            make_with_unit(WAIST, 90.0, "cm", 20),
            make_with_unit(WAIST, 85.0 / 2.54, "in", 1),
            make_with_unit(NECK, 38.0, "cm", 1),
        ];
        let body_fat = navy_body_fat(&measurements, "m").unwrap().unwrap();
        let expected = navy_body_fat_from(Gender::Male, 180.0, 85.0, 38.0, None).unwrap();
        assert!((body_fat - expected).abs() < 1e-9);
    }

    #[test]
    fn test_bmi() {
        let measurements = vec![
            make_with_unit(BODY_WEIGHT, 90.0, "kg", 40),
            make_with_unit(BODY_WEIGHT, 85.0, "kg", 1),
            make_with_unit(HEIGHT, 1.8, "m", 60),
        ];
        let value = bmi(&measurements).unwrap();
        assert!((value - 85.0 / 3.24).abs() < 1e-9);
        assert_eq!(bmi_category(value), BmiCategory::Overweight);
    }

    #[test]
    fn test_bmi_skips_unknown_units() {
        let measurements = vec![
            make_with_unit(BODY_WEIGHT, 70.0, "kg", 5),
            make_with_unit(BODY_WEIGHT, 11.0, "stone", 1),
            make_with_unit(HEIGHT, 175.0, "cm", 5),
        ];
        let value = bmi(&measurements).unwrap();
        assert!((value - 70.0 / (1.75 * 1.75)).abs() < 1e-9);

        assert!(bmi(&[make_measurement(BODY_WEIGHT, 70.0, 1)]).is_none());
    }

    #[test]
    fn test_bmi_categories() {
        assert_eq!(bmi_category(17.0), BmiCategory::Underweight);
        assert_eq!(bmi_category(22.0), BmiCategory::Normal);
        assert_eq!(bmi_category(32.0), BmiCategory::Obese);
    }

    #[test]
    fn test_degenerate_girth() {
        assert_eq!(navy_body_fat_from(Gender::Male, 180.0, 38.0, 40.0, None), None);
    }
}

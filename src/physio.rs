//! Physiological estimations and normative comparisons.
//!
//! Implements the heart-rate-ratio VO2max estimate (15.3 x MHR/RHR) and
//! classifies the result against simplified ACSM normative data, plus
//! age-banded norms for RSA amplitude and breath rate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Gender;

/// Thresholds for one age group of the normative table, ml/kg/min.
struct Vo2NormRow {
    max_age: u8,
    poor: f64,
    fair: f64,
    good: f64,
    excellent: f64,
}

const MALE_NORMS: [Vo2NormRow; 5] = [
    Vo2NormRow { max_age: 29, poor: 34.0, fair: 43.0, good: 51.0, excellent: 56.0 },
    Vo2NormRow { max_age: 39, poor: 32.0, fair: 41.0, good: 49.0, excellent: 54.0 },
    Vo2NormRow { max_age: 49, poor: 30.0, fair: 39.0, good: 47.0, excellent: 52.0 },
    Vo2NormRow { max_age: 59, poor: 28.0, fair: 37.0, good: 44.0, excellent: 49.0 },
    Vo2NormRow { max_age: 99, poor: 25.0, fair: 34.0, good: 41.0, excellent: 46.0 },
];

const FEMALE_NORMS: [Vo2NormRow; 5] = [
    Vo2NormRow { max_age: 29, poor: 27.0, fair: 36.0, good: 40.0, excellent: 45.0 },
    Vo2NormRow { max_age: 39, poor: 26.0, fair: 34.0, good: 38.0, excellent: 43.0 },
    Vo2NormRow { max_age: 49, poor: 24.0, fair: 32.0, good: 36.0, excellent: 40.0 },
    Vo2NormRow { max_age: 59, poor: 23.0, fair: 30.0, good: 33.0, excellent: 37.0 },
    Vo2NormRow { max_age: 99, poor: 21.0, fair: 28.0, good: 31.0, excellent: 34.0 },
];

/// Aerobic fitness classification against ACSM norms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessClass {
    Poor,
    Fair,
    Good,
    Excellent,
    Superior,
}

impl fmt::Display for FitnessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FitnessClass::Poor => "Poor",
            FitnessClass::Fair => "Fair",
            FitnessClass::Good => "Good",
            FitnessClass::Excellent => "Excellent",
            FitnessClass::Superior => "Superior",
        };
        write!(f, "{label}")
    }
}

/// RSA amplitude classification against age-banded norms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HrvClass {
    Low,
    Normal,
    High,
}

impl fmt::Display for HrvClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HrvClass::Low => "Low",
            HrvClass::Normal => "Normal",
            HrvClass::High => "High",
        };
        write!(f, "{label}")
    }
}

/// Resting breath rate classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreathRateClass {
    Slow,
    Normal,
    Fast,
}

impl fmt::Display for BreathRateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BreathRateClass::Slow => "Slow",
            BreathRateClass::Normal => "Normal",
            BreathRateClass::Fast => "Fast",
        };
        write!(f, "{label}")
    }
}

/// Estimate VO2max from age and resting heart rate.
///
/// Uses the heart rate ratio method: VO2max = 15.3 x (220 - age) / RHR,
/// scaled by 0.85 for female athletes, rounded to one decimal. Returns
/// `None` when the resting heart rate is not positive.
pub fn estimate_vo2max(age: u8, gender: Gender, resting_hr: f64) -> Option<f64> {
    if resting_hr <= 0.0 {
        return None;
    }

    let max_hr = f64::from(220u16.saturating_sub(u16::from(age)));
    let mut vo2 = 15.3 * max_hr / resting_hr;
    if gender == Gender::Female {
        vo2 *= 0.85;
    }

    Some((vo2 * 10.0).round() / 10.0)
}

/// Classify a VO2max value against the normative table for age and gender.
pub fn classify_vo2max(vo2: f64, age: u8, gender: Gender) -> FitnessClass {
    let table = match gender {
        Gender::Male => &MALE_NORMS,
        Gender::Female => &FEMALE_NORMS,
    };
    let row = table
        .iter()
        .find(|r| age <= r.max_age)
        .unwrap_or(&table[4]);

    if vo2 < row.poor {
        FitnessClass::Poor
    } else if vo2 < row.fair {
        FitnessClass::Fair
    } else if vo2 < row.good {
        FitnessClass::Good
    } else if vo2 < row.excellent {
        FitnessClass::Excellent
    } else {
        FitnessClass::Superior
    }
}

/// Classify an RSA amplitude (ms) against age-banded norms.
pub fn classify_hrv_amplitude(amplitude_ms: f64, age: u8) -> HrvClass {
    let (low, high) = if age <= 30 {
        (50.0, 100.0)
    } else if age <= 50 {
        (30.0, 60.0)
    } else {
        (15.0, 35.0)
    };

    if amplitude_ms < low {
        HrvClass::Low
    } else if amplitude_ms > high {
        HrvClass::High
    } else {
        HrvClass::Normal
    }
}

/// Classify a breath rate in breaths per minute.
pub fn classify_breath_rate(breaths_per_min: f64) -> BreathRateClass {
    if breaths_per_min < 10.0 {
        BreathRateClass::Slow
    } else if breaths_per_min > 20.0 {
        BreathRateClass::Fast
    } else {
        BreathRateClass::Normal
    }
}

/// Resting heart rate proxy from a recording: the slowest beat observed.
pub fn resting_hr_from_series(rr_intervals: &[u16]) -> Option<f64> {
    let longest = rr_intervals.iter().copied().max()?;
    if longest == 0 {
        return None;
    }
    Some(60_000.0 / f64::from(longest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vo2max_estimate() {
        // 15.3 * 190 / 60 = 48.45, rounded to 48.5
        assert_eq!(estimate_vo2max(30, Gender::Male, 60.0), Some(48.5));
        // Female correction: 48.45 * 0.85 = 41.1825 -> 41.2
        assert_eq!(estimate_vo2max(30, Gender::Female, 60.0), Some(41.2));
    }

    #[test]
    fn test_vo2max_requires_positive_resting_hr() {
        assert_eq!(estimate_vo2max(30, Gender::Male, 0.0), None);
        assert_eq!(estimate_vo2max(30, Gender::Male, -5.0), None);
    }

    #[test]
    fn test_vo2max_classification_bands() {
        assert_eq!(classify_vo2max(33.9, 25, Gender::Male), FitnessClass::Poor);
        // Thresholds are lower-inclusive for the next band up
        assert_eq!(classify_vo2max(34.0, 25, Gender::Male), FitnessClass::Fair);
        assert_eq!(classify_vo2max(48.5, 30, Gender::Male), FitnessClass::Good);
        assert_eq!(classify_vo2max(53.0, 30, Gender::Male), FitnessClass::Excellent);
        assert_eq!(classify_vo2max(57.0, 25, Gender::Male), FitnessClass::Superior);
        assert_eq!(classify_vo2max(41.2, 30, Gender::Female), FitnessClass::Excellent);
    }

    #[test]
    fn test_vo2max_classification_age_fallback() {
        // Ages past the last bracket use the oldest group's thresholds
        assert_eq!(classify_vo2max(46.0, 120, Gender::Male), FitnessClass::Superior);
        assert_eq!(classify_vo2max(24.9, 120, Gender::Male), FitnessClass::Poor);
    }

    #[test]
    fn test_hrv_amplitude_bands_shift_with_age() {
        assert_eq!(classify_hrv_amplitude(49.9, 30), HrvClass::Low);
        assert_eq!(classify_hrv_amplitude(50.0, 30), HrvClass::Normal);
        assert_eq!(classify_hrv_amplitude(101.0, 30), HrvClass::High);
        assert_eq!(classify_hrv_amplitude(50.0, 45), HrvClass::Normal);
        assert_eq!(classify_hrv_amplitude(61.0, 45), HrvClass::High);
        assert_eq!(classify_hrv_amplitude(20.0, 60), HrvClass::Normal);
        assert_eq!(classify_hrv_amplitude(14.0, 60), HrvClass::Low);
    }

    #[test]
    fn test_breath_rate_bands() {
        assert_eq!(classify_breath_rate(9.9), BreathRateClass::Slow);
        assert_eq!(classify_breath_rate(10.0), BreathRateClass::Normal);
        assert_eq!(classify_breath_rate(20.0), BreathRateClass::Normal);
        assert_eq!(classify_breath_rate(20.1), BreathRateClass::Fast);
    }

    #[test]
    fn test_resting_hr_proxy_uses_longest_interval() {
        assert_eq!(resting_hr_from_series(&[800, 1000, 750]), Some(60.0));
        assert_eq!(resting_hr_from_series(&[]), None);
        assert_eq!(resting_hr_from_series(&[0]), None);
    }
}

//! Risk classifier.
//!
//! Two schemes grew up in separate dashboard iterations and were never
//! reconciled, so both are exposed and the caller picks one with
//! [`ClassifierMode`]. Rules are checked from most to least severe and the
//! first match wins.

use serde::{Deserialize, Serialize};

use crate::config::ModelProfile;
use crate::models::{CumulativeWindEnergy, Prediction, RiskAssessment, RiskLevel};

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// Predicted temperature and anomaly, plus the southerly wind outlook.
    Temperature,
    /// Cumulative southerly wind energy and hours.
    Energy,
}

/// Inputs for either scheme. A scheme whose input is absent yields
/// [`RiskLevel::Unknown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskInput<'a> {
    pub prediction: Option<&'a Prediction>,
    pub southerly_risk: bool,
    pub energy: Option<&'a CumulativeWindEnergy>,
}

impl<'a> RiskInput<'a> {
    pub fn from_prediction(prediction: Option<&'a Prediction>, southerly_risk: bool) -> Self {
        Self {
            prediction,
            southerly_risk,
            energy: None,
        }
    }

    pub fn from_energy(energy: &'a CumulativeWindEnergy) -> Self {
        Self {
            energy: Some(energy),
            ..Self::default()
        }
    }
}

pub fn classify_risk(
    input: &RiskInput<'_>,
    mode: ClassifierMode,
    profile: &ModelProfile,
) -> RiskAssessment {
    // ---
    let level = match mode {
        ClassifierMode::Temperature => input
            .prediction
            .map(|p| temperature_level(p, input.southerly_risk, profile)),
        ClassifierMode::Energy => input.energy.map(|e| energy_level(e, profile)),
    }
    .unwrap_or(RiskLevel::Unknown);

    assessment(level, mode)
}

fn temperature_level(p: &Prediction, southerly_risk: bool, profile: &ModelProfile) -> RiskLevel {
    if p.predicted_temp < profile.high_temp_c || p.anomaly < profile.high_anomaly_c {
        RiskLevel::High
    } else if p.predicted_temp < profile.moderate_temp_c
        || p.anomaly < profile.moderate_anomaly_c
        || southerly_risk
    {
        RiskLevel::Moderate
    } else if p.predicted_temp < profile.low_temp_c {
        RiskLevel::Low
    } else {
        RiskLevel::Good
    }
}

fn energy_level(e: &CumulativeWindEnergy, profile: &ModelProfile) -> RiskLevel {
    if e.energy_mh > profile.high_energy_threshold
        || e.hours_southerly > profile.high_hours_threshold
    {
        RiskLevel::High
    } else if e.energy_mh > profile.moderate_energy_threshold
        || e.hours_southerly > profile.moderate_hours_threshold
    {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

fn assessment(level: RiskLevel, mode: ClassifierMode) -> RiskAssessment {
    // ---
    let advisory = match (level, mode) {
        (RiskLevel::High, ClassifierMode::Temperature) => {
            "High risk of cold water at the venue. Expect a marked temperature drop."
        }
        (RiskLevel::High, ClassifierMode::Energy) => {
            "Sustained southerly wind is likely to trigger upwelling of cold bottom water."
        }
        (RiskLevel::Moderate, ClassifierMode::Temperature) => {
            "Moderate risk. Water may be cooler than normal; follow updates closely."
        }
        (RiskLevel::Moderate, ClassifierMode::Energy) => {
            "Southerly wind build-up. Upwelling is possible within 24-48 hours."
        }
        (RiskLevel::Low, ClassifierMode::Temperature) => "Cool but acceptable water temperature.",
        (RiskLevel::Low, ClassifierMode::Energy) => "Little southerly wind. Upwelling is unlikely.",
        (RiskLevel::Good, _) => "Good conditions expected.",
        (RiskLevel::Unknown, _) => "Not enough data to assess the risk.",
    };

    RiskAssessment {
        level,
        color: level.color(),
        advisory: advisory.to_string(),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn prediction(predicted_temp: f64, anomaly: f64) -> Prediction {
        let t = Utc.with_ymd_and_hms(2026, 8, 1, 8, 0, 0).unwrap();
        Prediction {
            target_time: t,
            predicted_temp,
            source_temp: predicted_temp + anomaly,
            source_time: t,
            baseline_temp: predicted_temp,
            anomaly,
            confidence: 1.0,
        }
    }

    fn energy(energy_mh: f64, hours_southerly: f64) -> CumulativeWindEnergy {
        CumulativeWindEnergy {
            energy_mh,
            hours_southerly,
            resolution_hours: 1.0,
        }
    }

    fn temp_level(predicted: f64, anomaly: f64, southerly: bool) -> RiskLevel {
        let p = prediction(predicted, anomaly);
        let input = RiskInput::from_prediction(Some(&p), southerly);
        classify_risk(&input, ClassifierMode::Temperature, &ModelProfile::default()).level
    }

    fn energy_risk(energy_mh: f64, hours: f64) -> RiskLevel {
        let e = energy(energy_mh, hours);
        classify_risk(
            &RiskInput::from_energy(&e),
            ClassifierMode::Energy,
            &ModelProfile::default(),
        )
        .level
    }

    #[test]
    fn test_temperature_scheme_thresholds() {
        // ---
        assert_eq!(temp_level(13.9, 0.0, false), RiskLevel::High);
        assert_eq!(temp_level(17.0, -3.5, false), RiskLevel::High);
        assert_eq!(temp_level(15.0, 0.0, false), RiskLevel::Moderate);
        assert_eq!(temp_level(17.0, -2.5, false), RiskLevel::Moderate);
        assert_eq!(temp_level(17.0, 0.0, true), RiskLevel::Moderate);
        assert_eq!(temp_level(17.0, 0.0, false), RiskLevel::Low);
        assert_eq!(temp_level(18.0, 0.0, false), RiskLevel::Good);
        assert_eq!(temp_level(21.0, 0.0, true), RiskLevel::Moderate);
    }

    #[test]
    fn test_high_checked_before_moderate() {
        // ---
        // Matches both the HIGH anomaly rule and the MODERATE southerly rule.
        assert_eq!(temp_level(19.0, -3.1, true), RiskLevel::High);
    }

    #[test]
    fn test_energy_scheme_thresholds() {
        // ---
        assert_eq!(energy_risk(0.0, 0.0), RiskLevel::Low);
        assert_eq!(energy_risk(100.0, 15.0), RiskLevel::Low);
        assert_eq!(energy_risk(100.1, 0.0), RiskLevel::Moderate);
        assert_eq!(energy_risk(0.0, 16.0), RiskLevel::Moderate);
        assert_eq!(energy_risk(150.1, 0.0), RiskLevel::High);
        assert_eq!(energy_risk(48.0, 24.0), RiskLevel::High);
    }

    #[test]
    fn test_recalibrated_profile_changes_outcome() {
        // ---
        let strict = ModelProfile {
            moderate_energy_threshold: 40.0,
            high_energy_threshold: 45.0,
            ..ModelProfile::default()
        };
        let e = energy(48.0, 10.0);
        let level =
            classify_risk(&RiskInput::from_energy(&e), ClassifierMode::Energy, &strict).level;
        assert_eq!(level, RiskLevel::High);
    }

    #[test]
    fn test_missing_input_is_unknown() {
        // ---
        let profile = ModelProfile::default();
        let none = RiskInput::from_prediction(None, true);
        let a = classify_risk(&none, ClassifierMode::Temperature, &profile);
        assert_eq!(a.level, RiskLevel::Unknown);
        assert_eq!(a.color, "#6c757d");

        // Energy mode ignores the prediction and vice versa.
        let p = prediction(20.0, 0.0);
        let only_prediction = RiskInput::from_prediction(Some(&p), false);
        let b = classify_risk(&only_prediction, ClassifierMode::Energy, &profile);
        assert_eq!(b.level, RiskLevel::Unknown);
    }

    #[test]
    fn test_assessment_carries_color() {
        // ---
        let p = prediction(12.0, -4.0);
        let a = classify_risk(
            &RiskInput::from_prediction(Some(&p), false),
            ClassifierMode::Temperature,
            &ModelProfile::default(),
        );
        assert_eq!(a.color, "#dc3545");
        assert!(!a.advisory.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn energy_risk_is_monotonic_in_energy(
            low in 0.0f64..300.0,
            extra in 0.0f64..300.0,
            hours in 0.0f64..40.0,
        ) {
            let a = energy_risk(low, hours).severity();
            let b = energy_risk(low + extra, hours).severity();
            prop_assert!(a.is_some() && b.is_some());
            prop_assert!(b >= a);
        }
    }
}

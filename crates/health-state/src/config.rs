//! Health state engine configuration

use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::HealthStateError;

/// Maximum gap between two frames for an angle drop to count as a collapse (seconds)
pub const SUDDEN_CHANGE_THRESHOLD_SECS: f64 = 2.0;

/// Continuous reclined time after which sleep becomes oversleep (3 hours)
pub const OVERSLEEP_THRESHOLD_SECS: u64 = 3 * 60 * 60;

/// Classification thresholds and history bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Sudden-change window for fainting detection (seconds)
    pub sudden_change_secs: f64,

    /// Sleep run length that turns normal sleep into oversleep (seconds)
    pub oversleep_threshold_secs: u64,

    /// Samples kept per subject before FIFO eviction
    pub history_capacity: usize,

    /// Angles below this are reclined (degrees)
    pub reclined_below_deg: f64,

    /// Angles at or above this are upright (degrees)
    pub upright_from_deg: f64,

    /// Previous angle must exceed this for a collapse (degrees)
    pub faint_prior_angle_deg: f64,

    /// Current angle must be below this for a collapse (degrees)
    pub faint_collapsed_angle_deg: f64,

    /// Allowed backward clock skew before a sample is rejected (milliseconds)
    pub out_of_order_tolerance_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            sudden_change_secs: SUDDEN_CHANGE_THRESHOLD_SECS,
            oversleep_threshold_secs: OVERSLEEP_THRESHOLD_SECS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            reclined_below_deg: 45.0,
            upright_from_deg: 75.0,
            faint_prior_angle_deg: 60.0,
            faint_collapsed_angle_deg: 30.0,
            out_of_order_tolerance_ms: 0,
        }
    }
}

impl HealthConfig {
    /// Create strict config (wider collapse window, earlier oversleep warning)
    pub fn strict() -> Self {
        Self {
            sudden_change_secs: 3.0,
            oversleep_threshold_secs: 2 * 60 * 60,
            ..Default::default()
        }
    }

    /// Create lenient config (narrower collapse window, later oversleep warning)
    pub fn lenient() -> Self {
        Self {
            sudden_change_secs: 1.5,
            oversleep_threshold_secs: 4 * 60 * 60,
            ..Default::default()
        }
    }

    /// Reject threshold combinations the classifier cannot honor
    pub fn validate(&self) -> Result<(), HealthStateError> {
        if self.history_capacity == 0 {
            return Err(HealthStateError::Config(
                "history_capacity must be at least 1".into(),
            ));
        }
        if !(self.sudden_change_secs.is_finite() && self.sudden_change_secs > 0.0) {
            return Err(HealthStateError::Config(format!(
                "sudden_change_secs must be positive, got {}",
                self.sudden_change_secs
            )));
        }
        let angles = [
            ("reclined_below_deg", self.reclined_below_deg),
            ("upright_from_deg", self.upright_from_deg),
            ("faint_prior_angle_deg", self.faint_prior_angle_deg),
            ("faint_collapsed_angle_deg", self.faint_collapsed_angle_deg),
        ];
        for (name, value) in angles {
            if !(0.0..=90.0).contains(&value) {
                return Err(HealthStateError::Config(format!(
                    "{} must be within [0, 90], got {}",
                    name, value
                )));
            }
        }
        if self.reclined_below_deg > self.upright_from_deg {
            return Err(HealthStateError::Config(format!(
                "reclined_below_deg ({}) exceeds upright_from_deg ({})",
                self.reclined_below_deg, self.upright_from_deg
            )));
        }
        if self.faint_collapsed_angle_deg >= self.faint_prior_angle_deg {
            return Err(HealthStateError::Config(format!(
                "faint_collapsed_angle_deg ({}) must be below faint_prior_angle_deg ({})",
                self.faint_collapsed_angle_deg, self.faint_prior_angle_deg
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = HealthConfig::default();
        assert_eq!(config.sudden_change_secs, 2.0);
        assert_eq!(config.oversleep_threshold_secs, 10_800);
        assert_eq!(config.history_capacity, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(HealthConfig::strict().validate().is_ok());
        assert!(HealthConfig::lenient().validate().is_ok());
        assert!(HealthConfig::strict().oversleep_threshold_secs < OVERSLEEP_THRESHOLD_SECS);
    }

    #[test]
    fn test_invalid_configs() {
        let zero_cap = HealthConfig {
            history_capacity: 0,
            ..Default::default()
        };
        assert!(zero_cap.validate().is_err());

        let inverted = HealthConfig {
            reclined_below_deg: 80.0,
            upright_from_deg: 70.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let bad_faint = HealthConfig {
            faint_collapsed_angle_deg: 65.0,
            ..Default::default()
        };
        assert!(bad_faint.validate().is_err());

        let nan_window = HealthConfig {
            sudden_change_secs: f64::NAN,
            ..Default::default()
        };
        assert!(nan_window.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: HealthConfig =
            serde_json::from_str(r#"{"oversleep_threshold_secs": 7200}"#).unwrap();
        assert_eq!(config.oversleep_threshold_secs, 7200);
        assert_eq!(config.history_capacity, 1000);
    }
}

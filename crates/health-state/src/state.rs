//! Health states and per-state classification details

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified condition of a subject at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// No pose in the frame
    #[default]
    Unknown,
    Active,
    Resting,
    NormalSleep,
    /// Reclined for longer than the oversleep threshold
    Oversleep,
    /// Sudden collapse from an upright posture
    Fainting,
}

impl HealthState {
    /// States that keep a sleep run going
    pub fn is_sleep_like(self) -> bool {
        matches!(
            self,
            HealthState::NormalSleep | HealthState::Resting | HealthState::Oversleep
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Unknown => "unknown",
            HealthState::Active => "active",
            HealthState::Resting => "resting",
            HealthState::NormalSleep => "normal_sleep",
            HealthState::Oversleep => "oversleep",
            HealthState::Fainting => "fainting",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed posture label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    Upright,
    SittingRelaxed,
    Sleeping,
    SleepingLong,
    Collapsed,
}

/// Diagnostic details, one variant per state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StateDetails {
    Unknown,

    Active {
        posture: Posture,
        /// `None` when the reported angle was unusable
        #[serde(skip_serializing_if = "Option::is_none")]
        body_angle: Option<f64>,
    },

    Resting {
        posture: Posture,
        body_angle: f64,
    },

    NormalSleep {
        posture: Posture,
        duration_seconds: u64,
        location: String,
    },

    Oversleep {
        posture: Posture,
        duration_seconds: u64,
        concern: String,
    },

    Fainting {
        posture: Posture,
        body_angle: f64,
        movement_suddenness: f64,
        alert: String,
    },
}

impl StateDetails {
    /// State these details belong to
    pub fn state(&self) -> HealthState {
        match self {
            StateDetails::Unknown => HealthState::Unknown,
            StateDetails::Active { .. } => HealthState::Active,
            StateDetails::Resting { .. } => HealthState::Resting,
            StateDetails::NormalSleep { .. } => HealthState::NormalSleep,
            StateDetails::Oversleep { .. } => HealthState::Oversleep,
            StateDetails::Fainting { .. } => HealthState::Fainting,
        }
    }

    /// Length of the current sleep run, for the sleep variants
    pub fn duration_seconds(&self) -> Option<u64> {
        match self {
            StateDetails::NormalSleep {
                duration_seconds, ..
            }
            | StateDetails::Oversleep {
                duration_seconds, ..
            } => Some(*duration_seconds),
            _ => None,
        }
    }
}

/// Serde adapter writing `StateDetails::Unknown` as an empty object
pub(crate) mod details_or_empty {
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::StateDetails;

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Empty {}

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Details(StateDetails),
        Empty(Empty),
    }

    pub fn serialize<S: Serializer>(details: &StateDetails, serializer: S) -> Result<S::Ok, S::Error> {
        match details {
            StateDetails::Unknown => serializer.serialize_map(Some(0))?.end(),
            other => other.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StateDetails, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Details(details) => details,
            Repr::Empty(_) => StateDetails::Unknown,
        })
    }
}

/// Outcome of classifying one observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub state: HealthState,
    /// Confidence in [0, 1]
    pub confidence: f64,
    #[serde(with = "details_or_empty")]
    pub details: StateDetails,
}

impl ClassificationResult {
    /// Build a result whose state always matches its details
    pub fn new(confidence: f64, details: StateDetails) -> Self {
        Self {
            state: details.state(),
            confidence,
            details,
        }
    }

    pub fn unknown() -> Self {
        Self::new(0.0, StateDetails::Unknown)
    }
}

//! State to alert mapping

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::HealthState;

pub const EMERGENCY_RECOMMENDATION: &str =
    "CALL EMERGENCY SERVICES IMMEDIATELY! Possible fainting or medical emergency detected.";

pub const OVERSLEEP_RECOMMENDATION: &str =
    "Subject has been sleeping in an uncomfortable position for an extended period. Check on them.";

/// Alert severity, ordered from least to most severe
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    #[default]
    None,
    Warning,
    Emergency,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::None => "none",
            AlertLevel::Warning => "warning",
            AlertLevel::Emergency => "emergency",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert raised for a classified state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertResult {
    pub level: AlertLevel,
    pub recommendation: Option<String>,
}

impl AlertResult {
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether anyone needs to be told about this
    pub fn is_alert(&self) -> bool {
        self.level > AlertLevel::None
    }
}

/// Map a state to its alert level and recommendation
pub fn to_alert(state: HealthState) -> AlertResult {
    match state {
        HealthState::Fainting => AlertResult {
            level: AlertLevel::Emergency,
            recommendation: Some(EMERGENCY_RECOMMENDATION.to_string()),
        },
        HealthState::Oversleep => AlertResult {
            level: AlertLevel::Warning,
            recommendation: Some(OVERSLEEP_RECOMMENDATION.to_string()),
        },
        HealthState::Unknown
        | HealthState::Active
        | HealthState::Resting
        | HealthState::NormalSleep => AlertResult::none(),
    }
}

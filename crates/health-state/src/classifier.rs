//! Per-instant health state classification

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::HealthConfig;
use crate::fainting::is_fainting;
use crate::history::History;
use crate::sleep::sleep_duration;
use crate::state::{ClassificationResult, Posture, StateDetails};

pub const FAINTING_CONFIDENCE: f64 = 0.92;
pub const OVERSLEEP_CONFIDENCE: f64 = 0.88;
pub const NORMAL_SLEEP_CONFIDENCE: f64 = 0.90;
pub const RESTING_CONFIDENCE: f64 = 0.85;
pub const ACTIVE_CONFIDENCE: f64 = 0.80;

/// Valid body angle range (degrees)
pub const MIN_BODY_ANGLE: f64 = 0.0;
pub const MAX_BODY_ANGLE: f64 = 90.0;

const FAINTING_ALERT: &str = "IMMEDIATE EMERGENCY";
const OVERSLEEP_CONCERN: &str = "Uncomfortable position for extended period";
const RECLINED_LOCATION: &str = "reclined";

/// Clamp a reported angle into [0, 90]; `None` for NaN
pub fn sanitize_angle(angle: f64) -> Option<f64> {
    if angle.is_nan() {
        None
    } else {
        Some(angle.clamp(MIN_BODY_ANGLE, MAX_BODY_ANGLE))
    }
}

/// Rule-based classifier over the current angle and the subject's history
#[derive(Debug, Clone, Default)]
pub struct StateClassifier {
    config: HealthConfig,
}

impl StateClassifier {
    pub fn new(config: HealthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Classify one observation. Always returns a state.
    ///
    /// Rules, first match wins:
    /// 1. fainting (checked for every posture)
    /// 2. reclined: normal sleep, or oversleep once the sleep run is too long
    /// 3. sitting relaxed: resting
    /// 4. upright: active
    pub fn classify(
        &self,
        body_angle: f64,
        movement_suddenness: f64,
        history: &History,
        now: DateTime<Utc>,
    ) -> ClassificationResult {
        let Some(angle) = sanitize_angle(body_angle) else {
            warn!("Body angle is NaN, falling back to active");
            return ClassificationResult::new(
                ACTIVE_CONFIDENCE,
                StateDetails::Active {
                    posture: Posture::Upright,
                    body_angle: None,
                },
            );
        };
        if angle != body_angle {
            debug!("Body angle {} clamped to {}", body_angle, angle);
        }

        let movement_suddenness = if movement_suddenness.is_finite() {
            movement_suddenness
        } else {
            0.0
        };

        if is_fainting(angle, history, now, &self.config) {
            return ClassificationResult::new(
                FAINTING_CONFIDENCE,
                StateDetails::Fainting {
                    posture: Posture::Collapsed,
                    body_angle: angle,
                    movement_suddenness,
                    alert: FAINTING_ALERT.to_string(),
                },
            );
        }

        if angle < self.config.reclined_below_deg {
            let duration_seconds = sleep_duration(history, now);

            if duration_seconds > self.config.oversleep_threshold_secs {
                return ClassificationResult::new(
                    OVERSLEEP_CONFIDENCE,
                    StateDetails::Oversleep {
                        posture: Posture::SleepingLong,
                        duration_seconds,
                        concern: OVERSLEEP_CONCERN.to_string(),
                    },
                );
            }

            return ClassificationResult::new(
                NORMAL_SLEEP_CONFIDENCE,
                StateDetails::NormalSleep {
                    posture: Posture::Sleeping,
                    duration_seconds,
                    location: RECLINED_LOCATION.to_string(),
                },
            );
        }

        if angle < self.config.upright_from_deg {
            return ClassificationResult::new(
                RESTING_CONFIDENCE,
                StateDetails::Resting {
                    posture: Posture::SittingRelaxed,
                    body_angle: angle,
                },
            );
        }

        ClassificationResult::new(
            ACTIVE_CONFIDENCE,
            StateDetails::Active {
                posture: Posture::Upright,
                body_angle: Some(angle),
            },
        )
    }
}

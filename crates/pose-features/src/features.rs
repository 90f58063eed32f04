//! Per-frame feature types and the provider seam

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::landmarks::{body_angle_from_landmarks, PoseLandmarks};
use crate::FeatureError;

/// Body angle reported when no pose is present (upright)
pub const UNDETECTED_BODY_ANGLE: f64 = 90.0;

/// Pose presence and torso inclination for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseFeatures {
    /// Whether a person was found in the frame
    pub detected: bool,
    /// Torso inclination in degrees (90 = upright, 0 = lying flat)
    pub body_angle: f64,
}

impl Default for PoseFeatures {
    fn default() -> Self {
        Self::undetected()
    }
}

impl PoseFeatures {
    pub fn detected(body_angle: f64) -> Self {
        Self {
            detected: true,
            body_angle,
        }
    }

    pub fn undetected() -> Self {
        Self {
            detected: false,
            body_angle: UNDETECTED_BODY_ANGLE,
        }
    }

    /// Build pose features from model landmarks, if the model found a person
    pub fn from_landmarks(landmarks: Option<&PoseLandmarks>) -> Result<Self, FeatureError> {
        match landmarks {
            Some(lm) => {
                let angle = body_angle_from_landmarks(lm)?;
                debug!("Body angle from landmarks: {:.1}", angle);
                Ok(Self::detected(angle))
            }
            None => Ok(Self::undetected()),
        }
    }
}

/// Face presence for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceFeatures {
    pub detected: bool,
}

/// Everything the classifier needs from a single frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameFeatures {
    pub pose: PoseFeatures,
    pub face: FaceFeatures,
}

/// Source of per-frame features (pose model, face model, or a recording)
pub trait FeatureProvider {
    /// Frame type accepted by this provider
    type Frame;

    /// Extract pose and face features from one frame
    fn extract(&self, frame: &Self::Frame) -> Result<FrameFeatures, FeatureError>;
}

//! Body angle geometry from pose landmarks

use serde::{Deserialize, Serialize};

use crate::FeatureError;

/// A single landmark in normalized image coordinates (y grows downward)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn midpoint(&self, other: &Landmark) -> Landmark {
        Landmark {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// The four torso landmarks needed for the body angle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseLandmarks {
    pub left_shoulder: Landmark,
    pub right_shoulder: Landmark,
    pub left_hip: Landmark,
    pub right_hip: Landmark,
}

impl PoseLandmarks {
    fn check_finite(&self) -> Result<(), FeatureError> {
        let named = [
            ("left_shoulder", self.left_shoulder),
            ("right_shoulder", self.right_shoulder),
            ("left_hip", self.left_hip),
            ("right_hip", self.right_hip),
        ];
        for (name, lm) in named {
            if !lm.x.is_finite() || !lm.y.is_finite() {
                return Err(FeatureError::NonFiniteLandmark(name));
            }
        }
        Ok(())
    }
}

/// Torso inclination in degrees: 90 = vertical, 0 = horizontal.
///
/// Uses the vector from the hip midpoint to the shoulder midpoint. Only the
/// magnitudes of its components matter, so leaning left or right and the
/// inverted image y-axis give the same angle.
pub fn body_angle_from_landmarks(landmarks: &PoseLandmarks) -> Result<f64, FeatureError> {
    landmarks.check_finite()?;

    let shoulder = landmarks.left_shoulder.midpoint(&landmarks.right_shoulder);
    let hip = landmarks.left_hip.midpoint(&landmarks.right_hip);

    let dx = shoulder.x - hip.x;
    let dy = shoulder.y - hip.y;

    if dx.abs() < f64::EPSILON && dy.abs() < f64::EPSILON {
        return Err(FeatureError::DegenerateLandmarks);
    }

    Ok(dy.abs().atan2(dx.abs()).to_degrees())
}

//! Pose Feature Contract
//!
//! Per-frame features supplied by the external computer-vision model:
//! - Pose presence and torso inclination (body angle)
//! - Face presence
//! - Body angle geometry from shoulder/hip landmarks

pub mod features;
pub mod landmarks;

pub use features::{FaceFeatures, FeatureProvider, FrameFeatures, PoseFeatures};
pub use landmarks::{body_angle_from_landmarks, Landmark, PoseLandmarks};

use thiserror::Error;

/// Feature extraction error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("Shoulder and hip midpoints coincide, body angle is undefined")]
    DegenerateLandmarks,

    #[error("Landmark coordinate is not finite: {0}")]
    NonFiniteLandmark(&'static str),

    #[error("Feature extraction failed: {0}")]
    Extraction(String),
}

//! Health State Engine
//!
//! Temporal classification of monitored subjects from per-frame posture:
//! - Bounded per-subject sample history
//! - Sudden collapse (fainting) detection from angle deltas
//! - Sustained sleep duration from the trailing sleep-like run
//! - State to alert level and recommendation mapping

pub mod alert;
pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod fainting;
pub mod history;
pub mod sleep;
pub mod state;

pub use alert::{to_alert, AlertLevel, AlertResult};
pub use analyzer::{HealthAnalysis, HealthAnalyzer, Observation};
pub use classifier::{sanitize_angle, StateClassifier};
pub use config::HealthConfig;
pub use fainting::is_fainting;
pub use history::{History, HistoryStore, Sample};
pub use sleep::sleep_duration;
pub use state::{ClassificationResult, HealthState, Posture, StateDetails};

use chrono::{DateTime, Utc};
use pose_features::FeatureError;
use thiserror::Error;

/// Health state engine error types
#[derive(Error, Debug)]
pub enum HealthStateError {
    #[error("Out-of-order sample for subject {subject_id}: {timestamp} precedes latest {latest}")]
    OutOfOrderSample {
        subject_id: String,
        timestamp: DateTime<Utc>,
        latest: DateTime<Utc>,
    },

    #[error("Lock error: {0}")]
    LockPoisoned(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feature extraction failed: {0}")]
    Features(#[from] FeatureError),
}

//! Per-observation analysis: classify, record, alert

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use pose_features::features::UNDETECTED_BODY_ANGLE;
use pose_features::{FeatureProvider, FrameFeatures};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::alert::{to_alert, AlertLevel, AlertResult};
use crate::classifier::{sanitize_angle, StateClassifier};
use crate::config::HealthConfig;
use crate::history::{HistoryStore, Sample};
use crate::state::{ClassificationResult, HealthState, StateDetails};
use crate::HealthStateError;

fn default_body_angle() -> f64 {
    UNDETECTED_BODY_ANGLE
}

/// One posture observation for a subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub subject_id: String,
    /// Whether the pose model found a person
    pub pose_detected: bool,
    /// Torso inclination in degrees (90 = upright)
    #[serde(default = "default_body_angle")]
    pub body_angle: f64,
    /// Face presence; carried through but not used by any rule
    #[serde(default)]
    pub face_detected: bool,
    /// Movement signal; currently a placeholder that does not gate fainting
    #[serde(default)]
    pub movement_suddenness: f64,
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    /// Detected pose at `body_angle`
    pub fn new(subject_id: impl Into<String>, body_angle: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            subject_id: subject_id.into(),
            pose_detected: true,
            body_angle,
            face_detected: false,
            movement_suddenness: 0.0,
            timestamp,
        }
    }

    /// Frame in which no pose was found
    pub fn undetected(subject_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            pose_detected: false,
            body_angle: UNDETECTED_BODY_ANGLE,
            ..Self::new(subject_id, UNDETECTED_BODY_ANGLE, timestamp)
        }
    }

    /// Observation from provider features
    pub fn from_features(
        subject_id: impl Into<String>,
        features: &FrameFeatures,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            pose_detected: features.pose.detected,
            face_detected: features.face.detected,
            ..Self::new(subject_id, features.pose.body_angle, timestamp)
        }
    }

    pub fn with_face(mut self, detected: bool) -> Self {
        self.face_detected = detected;
        self
    }

    pub fn with_movement(mut self, suddenness: f64) -> Self {
        self.movement_suddenness = suddenness;
        self
    }
}

/// Classification merged with its alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAnalysis {
    pub state: HealthState,
    pub confidence: f64,
    #[serde(with = "crate::state::details_or_empty")]
    pub details: StateDetails,
    pub alert_level: AlertLevel,
    pub recommendation: Option<String>,
}

impl HealthAnalysis {
    /// Result for frames without a pose
    pub fn empty() -> Self {
        Self::from_parts(ClassificationResult::unknown(), AlertResult::none())
    }

    pub fn from_parts(classification: ClassificationResult, alert: AlertResult) -> Self {
        Self {
            state: classification.state,
            confidence: classification.confidence,
            details: classification.details,
            alert_level: alert.level,
            recommendation: alert.recommendation,
        }
    }

    /// Check if an alert is raised
    pub fn has_alert(&self) -> bool {
        self.alert_level > AlertLevel::None
    }
}

impl Default for HealthAnalysis {
    fn default() -> Self {
        Self::empty()
    }
}

/// Health state analyzer owning the per-subject history store
pub struct HealthAnalyzer {
    classifier: StateClassifier,
    store: HistoryStore,
    tolerance: Duration,
}

impl HealthAnalyzer {
    /// Create an analyzer with its own history store
    pub fn new(config: HealthConfig) -> Result<Self, HealthStateError> {
        let store = HistoryStore::new(config.history_capacity);
        Self::with_store(config, store)
    }

    /// Create an analyzer over an existing history store
    pub fn with_store(config: HealthConfig, store: HistoryStore) -> Result<Self, HealthStateError> {
        config.validate()?;
        info!("Creating health analyzer with config: {:?}", config);
        let tolerance = Duration::milliseconds(
            i64::try_from(config.out_of_order_tolerance_ms).unwrap_or(i64::MAX),
        );
        Ok(Self {
            classifier: StateClassifier::new(config),
            store,
            tolerance,
        })
    }

    pub fn config(&self) -> &HealthConfig {
        self.classifier.config()
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Analyze one observation and record it in the subject's history.
    ///
    /// Frames without a pose return the empty result and leave history
    /// untouched. A timestamp older than the subject's latest sample (beyond
    /// the configured tolerance) is rejected without mutating history.
    pub fn analyze(&self, observation: &Observation) -> Result<HealthAnalysis, HealthStateError> {
        let subject_id = observation.subject_id.as_str();

        if !observation.pose_detected {
            debug!("No pose for subject {}, skipping classification", subject_id);
            counter!("health_state_undetected_frames_total").increment(1);
            return Ok(HealthAnalysis::empty());
        }

        let now = observation.timestamp;
        let classification = self.store.with_history(subject_id, |history| {
            if let Some(latest) = history.latest() {
                if latest.timestamp - now > self.tolerance {
                    return Err(HealthStateError::OutOfOrderSample {
                        subject_id: subject_id.to_string(),
                        timestamp: now,
                        latest: latest.timestamp,
                    });
                }
            }

            let result = self.classifier.classify(
                observation.body_angle,
                observation.movement_suddenness,
                history,
                now,
            );

            let stored_angle =
                sanitize_angle(observation.body_angle).unwrap_or(UNDETECTED_BODY_ANGLE);
            history.push(Sample::new(now, stored_angle, result.state));

            Ok(result)
        })?;

        let classification = match classification {
            Ok(c) => c,
            Err(e) => {
                warn!("Rejected sample: {}", e);
                counter!("health_state_rejected_samples_total").increment(1);
                return Err(e);
            }
        };

        counter!("health_state_classifications_total", "state" => classification.state.as_str())
            .increment(1);
        debug!(
            "Subject {} classified {} (confidence {:.2}, face {})",
            subject_id, classification.state, classification.confidence, observation.face_detected
        );

        let alert = to_alert(classification.state);
        match alert.level {
            AlertLevel::Emergency => {
                error!("EMERGENCY for subject {}: possible fainting", subject_id);
            }
            AlertLevel::Warning => {
                warn!(
                    "Warning for subject {}: {} for {}s",
                    subject_id,
                    classification.state,
                    classification.details.duration_seconds().unwrap_or(0)
                );
            }
            AlertLevel::None => {}
        }
        if alert.is_alert() {
            counter!("health_state_alerts_total", "level" => alert.level.as_str()).increment(1);
        }

        Ok(HealthAnalysis::from_parts(classification, alert))
    }

    /// Extract features from a frame, then analyze them
    pub fn analyze_frame<P: FeatureProvider>(
        &self,
        subject_id: &str,
        provider: &P,
        frame: &P::Frame,
        timestamp: DateTime<Utc>,
    ) -> Result<HealthAnalysis, HealthStateError> {
        let features = provider.extract(frame)?;
        self.analyze(&Observation::from_features(subject_id, &features, timestamp))
    }

    /// Number of samples stored for a subject
    pub fn history_len(&self, subject_id: &str) -> Result<usize, HealthStateError> {
        self.store.len(subject_id)
    }

    /// Most recent sample for a subject
    pub fn latest_sample(&self, subject_id: &str) -> Result<Option<Sample>, HealthStateError> {
        self.store.latest(subject_id)
    }

    /// Number of subjects being tracked
    pub fn subject_count(&self) -> Result<usize, HealthStateError> {
        self.store.subject_count()
    }

    /// Drop a subject's history (end of monitoring session)
    pub fn forget(&self, subject_id: &str) -> Result<bool, HealthStateError> {
        self.store.remove(subject_id)
    }
}

impl Default for HealthAnalyzer {
    fn default() -> Self {
        let config = HealthConfig::default();
        Self {
            store: HistoryStore::new(config.history_capacity),
            classifier: StateClassifier::new(config),
            tolerance: Duration::zero(),
        }
    }
}

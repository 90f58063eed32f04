//! Sudden collapse detection

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::HealthConfig;
use crate::history::{elapsed_secs, History};

/// Whether `current_angle` at `now` is a collapse relative to the latest sample.
///
/// Only the immediately preceding sample is considered. A drop from above
/// `faint_prior_angle_deg` to below `faint_collapsed_angle_deg` counts only if
/// it happened inside the sudden-change window; the same drop over a longer
/// interval is someone lying down on purpose.
pub fn is_fainting(
    current_angle: f64,
    history: &History,
    now: DateTime<Utc>,
    config: &HealthConfig,
) -> bool {
    let Some(prev) = history.latest() else {
        return false;
    };

    if prev.body_angle > config.faint_prior_angle_deg
        && current_angle < config.faint_collapsed_angle_deg
    {
        let elapsed = elapsed_secs(prev.timestamp, now);
        debug!(
            "Angle drop {:.1} -> {:.1} in {:.3}s (window {:.1}s)",
            prev.body_angle, current_angle, elapsed, config.sudden_change_secs
        );
        if elapsed < config.sudden_change_secs {
            return true;
        }
    }

    false
}

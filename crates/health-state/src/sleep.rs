//! Sustained sleep duration

use chrono::{DateTime, Utc};

use crate::history::History;

/// Seconds since the start of the trailing run of sleep-like samples.
///
/// Walks the history newest to oldest and stops at the first sample that is
/// not resting, sleeping or oversleeping. Returns 0 when the history is empty
/// or the latest sample already breaks the run.
pub fn sleep_duration(history: &History, now: DateTime<Utc>) -> u64 {
    let run_start = history
        .iter_recent()
        .take_while(|sample| sample.state.is_sleep_like())
        .last()
        .map(|sample| sample.timestamp);

    match run_start {
        Some(start) => (now - start).num_seconds().max(0) as u64,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Sample;
    use crate::state::HealthState;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(sleep_duration(&History::default(), t(0)), 0);
    }

    #[test]
    fn test_resting_run_duration() {
        let mut history = History::default();
        for i in 0..50 {
            history.push(Sample::new(t(i * 70), 50.0, HealthState::Resting));
        }
        assert_eq!(sleep_duration(&history, t(3700)), 3700);
    }

    #[test]
    fn test_latest_not_sleep_like() {
        let mut history = History::default();
        history.push(Sample::new(t(0), 20.0, HealthState::NormalSleep));
        history.push(Sample::new(t(60), 85.0, HealthState::Active));
        assert_eq!(sleep_duration(&history, t(120)), 0);
    }

    #[test]
    fn test_active_sample_breaks_run() {
        let mut history = History::default();
        history.push(Sample::new(t(0), 20.0, HealthState::NormalSleep));
        history.push(Sample::new(t(600), 20.0, HealthState::NormalSleep));
        history.push(Sample::new(t(1200), 85.0, HealthState::Active));
        history.push(Sample::new(t(1800), 20.0, HealthState::NormalSleep));
        history.push(Sample::new(t(2400), 20.0, HealthState::Oversleep));

        assert_eq!(sleep_duration(&history, t(3000)), 1200);
    }

    #[test]
    fn test_mixed_sleep_states_form_one_run() {
        let mut history = History::default();
        history.push(Sample::new(t(0), 85.0, HealthState::Fainting));
        history.push(Sample::new(t(10), 60.0, HealthState::Resting));
        history.push(Sample::new(t(20), 20.0, HealthState::NormalSleep));
        history.push(Sample::new(t(30), 20.0, HealthState::Oversleep));

        assert_eq!(sleep_duration(&history, t(100)), 90);
    }

    #[test]
    fn test_clock_behind_run_start_is_zero() {
        let mut history = History::default();
        history.push(Sample::new(t(100), 20.0, HealthState::NormalSleep));
        assert_eq!(sleep_duration(&history, t(50)), 0);
    }
}

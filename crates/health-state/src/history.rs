//! Per-subject bounded sample history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

use crate::state::HealthState;
use crate::HealthStateError;

/// Default samples kept per subject
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// One classified observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    /// Torso inclination in degrees, already clamped to [0, 90]
    pub body_angle: f64,
    pub state: HealthState,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, body_angle: f64, state: HealthState) -> Self {
        Self {
            timestamp,
            body_angle,
            state,
        }
    }
}

/// Seconds from `from` to `to`, millisecond precision (negative if `to` is earlier)
pub(crate) fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// Chronological samples for one subject, oldest evicted first once full
#[derive(Debug, Clone)]
pub struct History {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl History {
    /// Create a history holding at most `capacity` samples (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity,
        }
    }

    /// Create a history with default capacity (1000 samples)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }

    /// Append a sample, returning the evicted oldest sample if the history was full
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        let evicted = if self.samples.len() >= self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Oldest sample still retained
    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    /// Samples oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample> + ExactSizeIterator {
        self.samples.iter()
    }

    /// Samples newest first
    pub fn iter_recent(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Shared handle to one subject's history
type SubjectHistory = Arc<Mutex<History>>;

/// Histories for every subject seen so far.
///
/// The outer map lock is only held to find or create a subject's handle.
/// Reads and appends for a subject run under that subject's own mutex, so
/// frames for different subjects never wait on each other.
pub struct HistoryStore {
    subjects: RwLock<HashMap<String, SubjectHistory>>,
    capacity: usize,
}

impl HistoryStore {
    /// Create an empty store whose histories hold `capacity` samples each
    pub fn new(capacity: usize) -> Self {
        info!("Creating history store (capacity {} per subject)", capacity);
        Self {
            subjects: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Per-subject capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn get(&self, subject_id: &str) -> Result<Option<SubjectHistory>, HealthStateError> {
        let subjects = self
            .subjects
            .read()
            .map_err(|e| HealthStateError::LockPoisoned(format!("history map: {}", e)))?;
        Ok(subjects.get(subject_id).cloned())
    }

    fn get_or_create(&self, subject_id: &str) -> Result<SubjectHistory, HealthStateError> {
        if let Some(handle) = self.get(subject_id)? {
            return Ok(handle);
        }

        let mut subjects = self
            .subjects
            .write()
            .map_err(|e| HealthStateError::LockPoisoned(format!("history map: {}", e)))?;
        let capacity = self.capacity;
        let handle = subjects
            .entry(subject_id.to_string())
            .or_insert_with(|| {
                debug!("New subject {}, creating empty history", subject_id);
                Arc::new(Mutex::new(History::new(capacity)))
            })
            .clone();
        Ok(handle)
    }

    /// Whether `handle` is still the history registered for `subject_id`
    fn is_current(
        &self,
        subject_id: &str,
        handle: &SubjectHistory,
    ) -> Result<bool, HealthStateError> {
        Ok(self
            .get(subject_id)?
            .is_some_and(|current| Arc::ptr_eq(&current, handle)))
    }

    /// Run `f` with exclusive access to a subject's history, creating it on first contact.
    ///
    /// If the subject is removed between looking up its handle and locking it,
    /// the lookup is retried so the update lands in the registered history.
    /// Lock order is subject mutex, then map.
    pub fn with_history<R>(
        &self,
        subject_id: &str,
        f: impl FnOnce(&mut History) -> R,
    ) -> Result<R, HealthStateError> {
        loop {
            let handle = self.get_or_create(subject_id)?;
            let mut history = handle.lock().map_err(|e| {
                HealthStateError::LockPoisoned(format!("history of {}: {}", subject_id, e))
            })?;
            if !self.is_current(subject_id, &handle)? {
                debug!("History of {} removed while waiting, retrying", subject_id);
                continue;
            }
            return Ok(f(&mut history));
        }
    }

    /// Copy of a subject's history, if the subject is known
    pub fn snapshot(&self, subject_id: &str) -> Result<Option<History>, HealthStateError> {
        match self.get(subject_id)? {
            Some(handle) => {
                let history = handle.lock().map_err(|e| {
                    HealthStateError::LockPoisoned(format!("history of {}: {}", subject_id, e))
                })?;
                Ok(Some(history.clone()))
            }
            None => Ok(None),
        }
    }

    /// Number of samples stored for a subject (0 if unknown)
    pub fn len(&self, subject_id: &str) -> Result<usize, HealthStateError> {
        Ok(self.snapshot(subject_id)?.map_or(0, |h| h.len()))
    }

    /// Most recent sample for a subject
    pub fn latest(&self, subject_id: &str) -> Result<Option<Sample>, HealthStateError> {
        Ok(self
            .snapshot(subject_id)?
            .and_then(|h| h.latest().cloned()))
    }

    /// Drop a subject's history (end of session)
    pub fn remove(&self, subject_id: &str) -> Result<bool, HealthStateError> {
        let mut subjects = self
            .subjects
            .write()
            .map_err(|e| HealthStateError::LockPoisoned(format!("history map: {}", e)))?;
        let removed = subjects.remove(subject_id).is_some();
        if removed {
            info!("Removed history for subject {}", subject_id);
        }
        Ok(removed)
    }

    /// Number of subjects with a history
    pub fn subject_count(&self) -> Result<usize, HealthStateError> {
        let subjects = self
            .subjects
            .read()
            .map_err(|e| HealthStateError::LockPoisoned(format!("history map: {}", e)))?;
        Ok(subjects.len())
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn test_push_and_latest() {
        let mut history = History::new(10);
        assert!(history.latest().is_none());

        for i in 0..5 {
            history.push(Sample::new(t(i), 80.0, HealthState::Active));
        }

        assert_eq!(history.len(), 5);
        assert_eq!(history.latest().unwrap().timestamp, t(4));
        assert_eq!(history.oldest().unwrap().timestamp, t(0));

        let recent: Vec<_> = history.iter_recent().map(|s| s.timestamp).collect();
        assert_eq!(recent[0], t(4));
        assert_eq!(recent[4], t(0));
    }

    #[test]
    fn test_iter_capacity_and_clear() {
        let mut history = History::new(3);
        assert_eq!(history.capacity(), 3);

        for i in 0..4 {
            history.push(Sample::new(t(i), 80.0, HealthState::Active));
        }

        let iter = history.iter();
        assert_eq!(iter.len(), 3);
        let oldest_first: Vec<_> = iter.map(|s| s.timestamp).collect();
        assert_eq!(oldest_first, vec![t(1), t(2), t(3)]);
        assert_eq!(history.iter().next_back().unwrap().timestamp, t(3));

        history.clear();
        assert!(history.is_empty());
        assert!(history.latest().is_none());
        assert_eq!(history.capacity(), 3);
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut history = History::with_default_capacity();

        let mut evicted = Vec::new();
        for i in 0..1001 {
            if let Some(old) = history.push(Sample::new(t(i), 50.0, HealthState::Resting)) {
                evicted.push(old);
            }
        }

        assert_eq!(history.len(), 1000);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].timestamp, t(0));
        assert_eq!(history.oldest().unwrap().timestamp, t(1));
        assert_eq!(history.latest().unwrap().timestamp, t(1000));
    }

    #[test]
    fn test_zero_capacity_still_holds_latest() {
        let mut history = History::new(0);
        history.push(Sample::new(t(0), 80.0, HealthState::Active));
        history.push(Sample::new(t(1), 20.0, HealthState::NormalSleep));
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().state, HealthState::NormalSleep);
    }

    #[test]
    fn test_elapsed_secs() {
        let start = t(0);
        assert_eq!(elapsed_secs(start, start + Duration::milliseconds(1500)), 1.5);
        assert_eq!(elapsed_secs(start + Duration::seconds(1), start), -1.0);
    }

    #[test]
    fn test_store_creates_lazily() {
        let store = HistoryStore::new(5);
        assert_eq!(store.subject_count().unwrap(), 0);
        assert_eq!(store.len("alice").unwrap(), 0);
        assert!(store.snapshot("alice").unwrap().is_none());

        store
            .with_history("alice", |h| h.push(Sample::new(t(0), 85.0, HealthState::Active)))
            .unwrap();

        assert_eq!(store.subject_count().unwrap(), 1);
        assert_eq!(store.len("alice").unwrap(), 1);
        assert_eq!(store.latest("alice").unwrap().unwrap().body_angle, 85.0);
    }

    #[test]
    fn test_store_subjects_are_isolated() {
        let store = HistoryStore::new(3);
        for i in 0..5 {
            store
                .with_history("alice", |h| h.push(Sample::new(t(i), 85.0, HealthState::Active)))
                .unwrap();
        }
        store
            .with_history("bob", |h| h.push(Sample::new(t(0), 20.0, HealthState::NormalSleep)))
            .unwrap();

        assert_eq!(store.len("alice").unwrap(), 3);
        assert_eq!(store.len("bob").unwrap(), 1);
        assert_eq!(
            store.latest("bob").unwrap().unwrap().state,
            HealthState::NormalSleep
        );
    }

    #[test]
    fn test_store_remove() {
        let store = HistoryStore::default();
        store.with_history("alice", |_| ()).unwrap();
        assert!(store.remove("alice").unwrap());
        assert!(!store.remove("alice").unwrap());
        assert_eq!(store.subject_count().unwrap(), 0);
    }

    #[test]
    fn test_removed_handle_is_stale() {
        let store = HistoryStore::new(5);
        let stale = store.get_or_create("alice").unwrap();
        assert!(store.is_current("alice", &stale).unwrap());

        store.remove("alice").unwrap();
        assert!(!store.is_current("alice", &stale).unwrap());

        store
            .with_history("alice", |h| h.push(Sample::new(t(0), 85.0, HealthState::Active)))
            .unwrap();
        let fresh = store.get_or_create("alice").unwrap();
        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert_eq!(store.len("alice").unwrap(), 1);
        assert!(stale.lock().unwrap().is_empty());
    }

    #[test]
    fn test_appends_and_removal_interleave_without_deadlock() {
        let store = HistoryStore::default();

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..200 {
                        let landed = store
                            .with_history("shared", |h| {
                                let ts = t(worker * 1000 + i);
                                h.push(Sample::new(ts, 80.0, HealthState::Active));
                                h.latest().map(|s| s.timestamp)
                            })
                            .unwrap();
                        assert_eq!(landed, Some(t(worker * 1000 + i)));
                    }
                });
            }
            let store = &store;
            scope.spawn(move || {
                for _ in 0..50 {
                    store.remove("shared").unwrap();
                    std::thread::yield_now();
                }
            });
        });

        assert!(store.len("shared").unwrap() <= 800);
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let store = Arc::new(HistoryStore::default());

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    for i in 0..100 {
                        store
                            .with_history("shared", |h| {
                                h.push(Sample::new(t(worker * 1000 + i), 80.0, HealthState::Active))
                            })
                            .unwrap();
                        store
                            .with_history(&format!("own-{}", worker), |h| {
                                h.push(Sample::new(t(i), 80.0, HealthState::Active))
                            })
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(store.len("shared").unwrap(), 400);
        for worker in 0..4 {
            assert_eq!(store.len(&format!("own-{}", worker)).unwrap(), 100);
        }
        assert_eq!(store.subject_count().unwrap(), 5);
    }
}

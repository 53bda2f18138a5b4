// Notification de-duplication: bucket keys and a bounded, time-windowed key store

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

const HOUR_MS: f64 = 3_600_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Upcoming,
    Overdue,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Upcoming => "upcoming",
            Condition::Overdue => "overdue",
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            Condition::Upcoming => "Task Due Soon",
            Condition::Overdue => "Task Overdue",
        }
    }

    pub fn message(&self, task_name: &str, hours: i64) -> String {
        match self {
            Condition::Upcoming => format!("\"{}\" is due in ~{} hour(s).", task_name, hours),
            Condition::Overdue => format!("\"{}\" is overdue by ~{} hour(s).", task_name, hours),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of the fixed-width bucket containing `at`.
///
/// Euclidean division keeps pre-epoch instants in the right bucket.
pub fn bucket_index(at: DateTime<Utc>, width: Duration) -> i64 {
    let width_ms = i64::try_from(width.as_millis()).unwrap_or(i64::MAX).max(1);
    at.timestamp_millis().div_euclid(width_ms)
}

/// Whole hours for display: rounded, never below 1.
pub fn approx_hours(delta: chrono::Duration) -> i64 {
    let hours = (delta.num_milliseconds() as f64 / HOUR_MS).round() as i64;
    hours.max(1)
}

/// `(task, condition, bucket)`: dispatched at most once while retained
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationKey {
    pub task_id: Uuid,
    pub condition: Condition,
    pub bucket: i64,
}

impl NotificationKey {
    /// Bucketed by due date, so the key only changes when the due date is edited.
    pub fn upcoming(task_id: Uuid, due_date: DateTime<Utc>, window: Duration) -> Self {
        Self {
            task_id,
            condition: Condition::Upcoming,
            bucket: bucket_index(due_date, window),
        }
    }

    /// Bucketed by the scan time, so a new key appears every `bucket_width`.
    pub fn overdue(task_id: Uuid, now: DateTime<Utc>, bucket_width: Duration) -> Self {
        Self {
            task_id,
            condition: Condition::Overdue,
            bucket: bucket_index(now, bucket_width),
        }
    }
}

impl fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.task_id, self.condition, self.bucket)
    }
}

/// Sent-key memory with age-based eviction and a hard size cap.
///
/// `by_age` orders keys by recording time, so both eviction paths pop from the front.
#[derive(Debug)]
pub struct DedupStore {
    entries: HashMap<NotificationKey, (DateTime<Utc>, u64)>,
    by_age: BTreeMap<(DateTime<Utc>, u64), NotificationKey>,
    next_seq: u64,
    retention: chrono::Duration,
    max_entries: usize,
}

impl DedupStore {
    pub fn new(retention: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            by_age: BTreeMap::new(),
            next_seq: 0,
            retention: chrono::Duration::from_std(retention)
                .unwrap_or_else(|_| chrono::Duration::days(365)),
            max_entries: max_entries.max(1),
        }
    }

    pub fn contains(&self, key: &NotificationKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns `false` if the key was already recorded.
    pub fn record(&mut self, key: NotificationKey, at: DateTime<Utc>) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        let slot = (at, self.next_seq);
        self.next_seq += 1;
        self.by_age.insert(slot, key.clone());
        self.entries.insert(key, slot);

        while self.entries.len() > self.max_entries {
            if self.pop_oldest().is_none() {
                break;
            }
        }
        true
    }

    /// Drop entries recorded more than the retention window before `now`.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(self.retention) else {
            return 0;
        };
        let mut evicted = 0;
        while self
            .by_age
            .first_key_value()
            .is_some_and(|((recorded_at, _), _)| *recorded_at < cutoff)
        {
            self.pop_oldest();
            evicted += 1;
        }
        evicted
    }

    fn pop_oldest(&mut self) -> Option<NotificationKey> {
        let (_, key) = self.by_age.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

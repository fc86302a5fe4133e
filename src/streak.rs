//! Daily completion streak, persisted through a [`KeyValueStore`].
//!
//! The streak carries over only when the last completion happened today or
//! yesterday; any older (or future) date breaks it. `total_sessions` is a
//! lifetime counter and never resets.

use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::storage::KeyValueStore;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const STREAK_KEY: &str = "ambifocus.streak";

/// Which calendar decides where "today" starts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DayAnchor {
    #[default]
    Local,
    Utc,
}

impl DayAnchor {
    pub fn today(self) -> NaiveDate {
        match self {
            DayAnchor::Local => Local::now().date_naive(),
            DayAnchor::Utc => Utc::now().date_naive(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StreakRecord {
    pub count: u32,
    pub last_update_date: Option<NaiveDate>,
    pub total_sessions: u64,
}

impl StreakRecord {
    /// Applies the gap rule relative to `today`. Returns true when the record
    /// changed.
    fn roll_forward(&mut self, today: NaiveDate) -> bool {
        let Some(last) = self.last_update_date else {
            return false;
        };
        if last == today {
            return false;
        }
        if today.pred_opt() == Some(last) {
            self.last_update_date = Some(today);
            return true;
        }
        if self.count == 0 {
            return false;
        }
        self.count = 0;
        true
    }
}

pub struct StreakTracker {
    store: Arc<dyn KeyValueStore>,
    record: Mutex<StreakRecord>,
}

impl StreakTracker {
    /// Reads the persisted record and applies the gap rule. Never fails:
    /// unreadable or malformed data yields a fresh record.
    pub fn load(store: Arc<dyn KeyValueStore>, today: NaiveDate) -> Self {
        let mut record = match store.get(STREAK_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<StreakRecord>(&raw) {
                Ok(record) => record,
                Err(err) => {
                    log_warn!("discarding malformed streak record {raw:?}: {err}");
                    StreakRecord::default()
                }
            },
            Ok(None) => StreakRecord::default(),
            Err(err) => {
                log_warn!("failed to read streak record: {err:#}");
                StreakRecord::default()
            }
        };

        if record.roll_forward(today) {
            log_info!(
                "streak adjusted on load: count={} date={:?}",
                record.count,
                record.last_update_date
            );
            persist(store.as_ref(), &record);
        }

        Self {
            store,
            record: Mutex::new(record),
        }
    }

    pub fn record(&self) -> StreakRecord {
        self.lock().clone()
    }

    pub fn count(&self) -> u32 {
        self.lock().count
    }

    /// Counts a completed work session and returns the new streak.
    ///
    /// The record is updated and written under the same lock, so the value
    /// returned is always the value handed to the store.
    pub fn increment(&self, today: NaiveDate) -> u32 {
        let mut guard = self.lock();
        guard.roll_forward(today);
        guard.count = guard.count.saturating_add(1);
        guard.total_sessions = guard.total_sessions.saturating_add(1);
        guard.last_update_date = Some(today);
        persist(self.store.as_ref(), &guard);
        guard.count
    }

    pub fn reset(&self) {
        let mut guard = self.lock();
        guard.count = 0;
        persist(self.store.as_ref(), &guard);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StreakRecord> {
        self.record.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn persist(store: &dyn KeyValueStore, record: &StreakRecord) {
    let serialized = match serde_json::to_string(record) {
        Ok(serialized) => serialized,
        Err(err) => {
            log_warn!("failed to serialize streak record: {err}");
            return;
        }
    };
    if let Err(err) = store.set(STREAK_KEY, &serialized) {
        log_warn!("failed to persist streak record: {err:#}");
    }
}

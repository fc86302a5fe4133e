use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::storage::KeyValueStore;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub const TODOS_KEY: &str = "ambifocus.todos";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    pub done: bool,
    pub created_at: DateTime<Utc>,
}

/// Small task list kept next to the timer. Written through on every change;
/// storage problems are logged and never surface to the caller.
pub struct TodoList {
    store: Arc<dyn KeyValueStore>,
    items: Mutex<Vec<TodoItem>>,
}

impl TodoList {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let items = match store.get(TODOS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                log_warn!("discarding malformed task list: {err}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                log_warn!("failed to read task list: {err:#}");
                Vec::new()
            }
        };
        Self {
            store,
            items: Mutex::new(items),
        }
    }

    pub fn list(&self) -> Vec<TodoItem> {
        self.lock().clone()
    }

    pub fn add(&self, text: &str) -> Result<TodoItem> {
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow!("task text must not be empty"));
        }
        let item = TodoItem {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            done: false,
            created_at: Utc::now(),
        };
        let mut items = self.lock();
        items.push(item.clone());
        self.persist(&items);
        Ok(item)
    }

    /// Flips completion of the item at `index` (zero-based).
    pub fn toggle(&self, index: usize) -> Result<TodoItem> {
        let mut items = self.lock();
        let item = items
            .get_mut(index)
            .ok_or_else(|| anyhow!("no task at position {}", index + 1))?;
        item.done = !item.done;
        let updated = item.clone();
        self.persist(&items);
        Ok(updated)
    }

    pub fn remove(&self, index: usize) -> Result<TodoItem> {
        let mut items = self.lock();
        if index >= items.len() {
            return Err(anyhow!("no task at position {}", index + 1));
        }
        let removed = items.remove(index);
        self.persist(&items);
        Ok(removed)
    }

    /// Drops finished items and returns how many were removed.
    pub fn clear_completed(&self) -> usize {
        let mut items = self.lock();
        let before = items.len();
        items.retain(|item| !item.done);
        let removed = before - items.len();
        if removed > 0 {
            self.persist(&items);
        }
        removed
    }

    fn persist(&self, items: &[TodoItem]) {
        match serde_json::to_string(items) {
            Ok(serialized) => {
                if let Err(err) = self.store.set(TODOS_KEY, &serialized) {
                    log_warn!("failed to persist task list: {err:#}");
                }
            }
            Err(err) => log_warn!("failed to serialize task list: {err}"),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TodoItem>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use crate::{catalog, streak::DayAnchor, timer::TimerConfig};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub const SETTINGS_FILE: &str = "settings.json";

/// Process-level configuration read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub debug: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = std::env::var_os("AMBIFOCUS_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::data_local_dir().map(|dir| dir.join("ambifocus")))
            .unwrap_or_else(|| PathBuf::from(".ambifocus"));
        let debug = std::env::var("AMBIFOCUS_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self { data_dir, debug }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default = "default_video_id")]
    pub video_id: String,
    #[serde(default = "default_theme_id")]
    pub theme_id: String,
    #[serde(default = "default_true")]
    pub alert_enabled: bool,
    #[serde(default)]
    pub streak_day: DayAnchor,
}

fn default_work_minutes() -> u32 {
    25
}

fn default_break_minutes() -> u32 {
    5
}

fn default_volume() -> u8 {
    50
}

fn default_video_id() -> String {
    catalog::DEFAULT_VIDEO_ID.to_string()
}

fn default_theme_id() -> String {
    catalog::DEFAULT_THEME_ID.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            break_minutes: default_break_minutes(),
            volume: default_volume(),
            video_id: default_video_id(),
            theme_id: default_theme_id(),
            alert_enabled: true,
            streak_day: DayAnchor::default(),
        }
    }
}

impl UserSettings {
    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig::from_minutes(self.work_minutes, self.break_minutes)
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`. A missing file means defaults; an
    /// unreadable or malformed one is logged and replaced by defaults.
    pub fn new(path: PathBuf) -> Self {
        let mut data = if path.exists() {
            match read_settings(&path) {
                Ok(data) => data,
                Err(err) => {
                    log_warn!("using default settings: {err:#}");
                    UserSettings::default()
                }
            }
        } else {
            UserSettings::default()
        };
        data.volume = data.volume.min(100);

        Self {
            path,
            data: RwLock::new(data),
        }
    }

    pub fn get(&self) -> UserSettings {
        self.data.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Applies `change` and writes the result to disk. The in-memory
    /// settings only change once the write has succeeded.
    pub fn update<F>(&self, change: F) -> Result<UserSettings>
    where
        F: FnOnce(&mut UserSettings),
    {
        let mut guard = self.data.write().unwrap_or_else(|e| e.into_inner());
        let mut next = guard.clone();
        change(&mut next);
        self.persist(&next)?;
        *guard = next.clone();
        Ok(next)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serialized)
            .with_context(|| format!("Failed to write settings to {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to move {} into place", tmp.display()))
    }
}

fn read_settings(path: &Path) -> Result<UserSettings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Malformed settings in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join(SETTINGS_FILE));
        let settings = store.get();
        assert_eq!(settings, UserSettings::default());
        assert_eq!(settings.timer_config(), TimerConfig::default());
    }

    #[test]
    fn updates_survive_a_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let store = SettingsStore::new(path.clone());
        store
            .update(|s| {
                s.volume = 0;
                s.theme_id = "forest".into();
                s.streak_day = DayAnchor::Utc;
            })
            .unwrap();

        let reloaded = SettingsStore::new(path).get();
        assert_eq!(reloaded.volume, 0);
        assert_eq!(reloaded.theme_id, "forest");
        assert_eq!(reloaded.streak_day, DayAnchor::Utc);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{"workMinutes": 50, "volume": 180}"#).unwrap();
        let settings = SettingsStore::new(path).get();
        assert_eq!(settings.work_minutes, 50);
        assert_eq!(settings.break_minutes, 5);
        assert_eq!(settings.volume, 100);
        assert_eq!(settings.video_id, catalog::DEFAULT_VIDEO_ID);
        assert_eq!(settings.timer_config().work_duration_secs, 3000);
    }

    #[test]
    fn failed_write_leaves_settings_untouched() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let store = SettingsStore::new(blocker.join(SETTINGS_FILE));

        assert!(store.update(|s| s.work_minutes = 99).is_err());
        assert_eq!(store.get().work_minutes, 25);
        assert_eq!(store.get(), UserSettings::default());
    }

    #[test]
    fn writes_leave_no_temp_file_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let store = SettingsStore::new(path.clone());
        store.update(|s| s.break_minutes = 7).unwrap();
        store.update(|s| s.break_minutes = 8).unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        let on_disk: UserSettings =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.break_minutes, 8);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "not json").unwrap();
        assert_eq!(SettingsStore::new(path).get(), UserSettings::default());
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::arm::ArmAxis;
use crate::gesture::{MatcherConfig, UnlockSequence};
use crate::unlock::ControllerConfig;

/// Operator configuration, persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LockSettings {
    pub sequence: Vec<String>,
    pub debounce_ms: u64,
    pub confidence_threshold: f32,
    pub lockout_threshold: u32,
    pub arm_axis: ArmAxis,
    pub arm_interval_ms: u64,
    pub tick_hz: u32,
    pub serial_path: Option<PathBuf>,
    pub alerts_dir: Option<PathBuf>,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            sequence: UnlockSequence::default()
                .names()
                .iter()
                .map(|name| name.to_string())
                .collect(),
            debounce_ms: 2000,
            confidence_threshold: 0.8,
            lockout_threshold: 3,
            arm_axis: ArmAxis::X,
            arm_interval_ms: 0,
            tick_hz: 60,
            serial_path: None,
            alerts_dir: None,
        }
    }
}

impl LockSettings {
    pub fn unlock_sequence(&self) -> Result<UnlockSequence> {
        UnlockSequence::from_names(self.sequence.as_slice()).context("invalid unlock sequence in settings")
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            matcher: MatcherConfig {
                debounce: Duration::from_millis(self.debounce_ms),
                confidence_threshold: self.confidence_threshold,
                lockout_threshold: self.lockout_threshold,
            },
            arm_axis: self.arm_axis,
            arm_interval: Duration::from_millis(self.arm_interval_ms),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_hz.max(1)
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<LockSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            LockSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> LockSettings {
        self.read().clone()
    }

    /// Validates and persists a new pin.
    pub fn update_sequence(&self, sequence: &UnlockSequence) -> Result<()> {
        let mut guard = self.write();
        guard.sequence = sequence.names().iter().map(|name| name.to_string()).collect();
        self.persist(&guard)
    }

    pub fn update(&self, settings: LockSettings) -> Result<()> {
        settings.unlock_sequence()?;
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &LockSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, LockSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, LockSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::GestureId;

    fn temp_settings_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("gesturelock-settings-{}", uuid::Uuid::new_v4()))
            .join("settings.json")
    }

    #[test]
    fn defaults_when_missing_or_corrupt() {
        let path = temp_settings_path();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.get(), LockSettings::default());

        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.get(), LockSettings::default());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn sequence_round_trips_through_disk() {
        let path = temp_settings_path();
        let store = SettingsStore::new(path.clone()).unwrap();
        let seq = UnlockSequence::new(
            GestureId::ThumbUpRight,
            GestureId::ThumbUpLeft,
            GestureId::StopRight,
        );
        store.update_sequence(&seq).unwrap();

        let reopened = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reopened.get().unlock_sequence().unwrap(), seq);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: LockSettings =
            serde_json::from_str(r#"{"armAxis":"Y","armIntervalMs":3000}"#).unwrap();
        assert_eq!(settings.arm_axis, ArmAxis::Y);
        assert_eq!(settings.debounce_ms, 2000);
        let config = settings.controller_config();
        assert_eq!(config.arm_interval, Duration::from_millis(3000));
        assert_eq!(config.matcher.lockout_threshold, 3);
    }

    #[test]
    fn rejects_bad_sequence_update() {
        let store = SettingsStore::new(temp_settings_path()).unwrap();
        let mut settings = LockSettings::default();
        settings.sequence = vec!["Stop_Left".into(), "Wave".into(), "Stop_Right".into()];
        assert!(store.update(settings).is_err());
        assert_eq!(store.get(), LockSettings::default());
    }

    #[test]
    fn tick_interval_from_rate() {
        let settings = LockSettings::default();
        assert_eq!(settings.tick_interval(), Duration::from_secs(1) / 60);
    }
}

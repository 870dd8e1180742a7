//! Application settings storage

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Sync worker settings
    pub sync: SyncSettings,

    /// Notification settings
    pub notifications: NotificationSettings,

    /// Session settings
    pub session: SessionSettings,
}

/// Sync worker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Pause between records (milliseconds)
    pub step_delay_ms: u64,

    /// Show a blocking progress dialog while syncing. The dialog-bound sync
    /// is cancelled when the network drops.
    pub show_progress_dialog: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            step_delay_ms: 250,
            show_progress_dialog: true,
        }
    }
}

/// Notification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Enable notifications
    pub enabled: bool,

    /// How long a toast stays on screen (milliseconds)
    pub toast_timeout_ms: u32,

    /// Application name shown on notifications
    pub app_name: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            toast_timeout_ms: 3000,
            app_name: "FieldSync".to_string(),
        }
    }
}

/// Session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Ask before logging out while a sync is running
    pub confirm_logout_during_sync: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            confirm_logout_during_sync: true,
        }
    }
}

/// Resolve the platform data directory, creating it if needed
pub fn data_dir() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("org", "fieldsync", "FieldSync")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

    let data_dir = project_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}

/// Settings repository
pub struct SettingsRepository {
    settings_path: PathBuf,
    settings: Settings,
}

impl SettingsRepository {
    /// Load settings from `data_dir`, falling back to defaults
    pub fn new(data_dir: &Path) -> Self {
        let settings_path = data_dir.join("settings.json");

        let settings = if settings_path.exists() {
            match std::fs::read_to_string(&settings_path)
                .map_err(anyhow::Error::from)
                .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from))
            {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable settings at {:?}: {}", settings_path, e);
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };

        Self {
            settings_path,
            settings,
        }
    }

    /// Get current settings
    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Get mutable settings
    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Save settings
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(&self.settings_path, content)?;
        Ok(())
    }

    /// Reset to defaults
    pub fn reset(&mut self) {
        self.settings = Settings::default();
    }
}

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use super::kv::{KeyValueStore, SETTINGS_KEY};
use crate::notes::PracticeMode;

/// Preferences the user changes from the CLI, kept in the data store
/// (unlike config.toml, which holds tuning parameters).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    /// Reference tone volume, 0-100
    pub volume: u8,
    /// Draw the target note with large block letters
    pub large_notes: bool,
    /// Mode used when `practice` is run without --mode
    pub practice_mode: PracticeMode,
    /// Whether sessions pick notes adaptively by default
    pub adaptive: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            volume: 70,
            large_notes: false,
            practice_mode: PracticeMode::default(),
            adaptive: true,
        }
    }
}

impl UserSettings {
    /// Load settings, falling back to defaults if the blob is missing or
    /// unreadable.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let blob = match store.load(SETTINGS_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Self::default(),
            Err(e) => {
                warn!("failed to read settings, using defaults: {e:#}");
                return Self::default();
            }
        };

        match serde_json::from_str::<UserSettings>(&blob) {
            Ok(mut settings) => {
                settings.volume = settings.volume.min(100);
                settings
            }
            Err(e) => {
                warn!("discarding corrupt settings: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        let blob = serde_json::to_string(self).context("Failed to serialize settings")?;
        store.save(SETTINGS_KEY, &blob)
    }
}

//! Game settings and preferences
//!
//! Persisted separately from high scores in platform storage.

use serde::{Deserialize, Serialize};

use crate::platform::{Storage, StorageError};

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Controls ===
    /// Steer by pointer position instead of the arrow keys
    pub mouse_control: bool,

    // === Visual Effects ===
    /// Screen shake on impacts
    pub screen_shake: bool,
    /// White flash on impacts
    pub impact_flash: bool,

    // === Audio ===
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,

    // === Accessibility ===
    /// Reduced motion (minimize shake, flashes)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mouse_control: false,
            screen_shake: true,
            impact_flash: true,
            sfx_volume: 1.0,
            muted: false,
            reduced_motion: false,
        }
    }
}

impl Settings {
    const STORAGE_KEY: &'static str = "future_drive_settings";

    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    pub fn effective_impact_flash(&self) -> bool {
        self.impact_flash && !self.reduced_motion
    }

    /// Volume a cue of the given intensity should play at
    pub fn effective_sfx_volume(&self, intensity: f32) -> f32 {
        if self.muted {
            return 0.0;
        }
        self.sfx_volume.clamp(0.0, 1.0) * intensity.clamp(0.0, 1.0)
    }

    pub fn load_from(storage: &dyn Storage) -> Result<Option<Self>, StorageError> {
        storage
            .get(Self::STORAGE_KEY)?
            .map(|json| serde_json::from_str(&json).map_err(StorageError::from))
            .transpose()
    }

    pub fn save_to(&self, storage: &dyn Storage) -> Result<(), StorageError> {
        let json = serde_json::to_string(self)?;
        storage.set(Self::STORAGE_KEY, &json)
    }

    pub fn load(storage: &dyn Storage) -> Self {
        match Self::load_from(storage) {
            Ok(Some(settings)) => {
                log::info!("Loaded settings");
                settings
            }
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Ignoring stored settings: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, storage: &dyn Storage) {
        match self.save_to(storage) {
            Ok(()) => log::info!("Settings saved"),
            Err(e) => log::warn!("Failed to save settings: {}", e),
        }
    }
}

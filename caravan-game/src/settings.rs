//! Player-adjustable preferences.
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_VOLUME;

/// Visual theme handed to the renderer. The engine ships a single one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Desert,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub music_volume: f32,
    pub ambient_volume: f32,
    /// Steer toward the pointer instead of using movement keys.
    pub pointer_follow: bool,
    pub theme: Theme,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            music_volume: DEFAULT_VOLUME,
            ambient_volume: DEFAULT_VOLUME,
            pointer_follow: false,
            theme: Theme::Desert,
        }
    }
}

impl PlayerSettings {
    /// Copy with both volumes clamped to `[0, 1]`. NaN becomes silence.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            music_volume: clamp_volume(self.music_volume),
            ambient_volume: clamp_volume(self.ambient_volume),
            ..self
        }
    }

    /// Parse persisted settings; unknown or missing fields fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::normalized)
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

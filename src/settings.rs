//! Player profile persistence
//!
//! Stores the player's name, best score and table color between sessions.
//! The simulation never touches storage; the host loads a [`Profile`] at
//! startup, seeds the simulator from it and saves it when the values change.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::theme::ThemeColor;

/// Persisted player preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub player_name: String,
    pub highest_score: u32,
    /// Theme stored as raw RGBA components
    pub color: Vec<f32>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            player_name: String::new(),
            highest_score: 0,
            color: ThemeColor::default().color().components().to_vec(),
        }
    }
}

impl Profile {
    pub fn new(player_name: impl Into<String>, highest_score: u32, theme: ThemeColor) -> Self {
        Self {
            player_name: player_name.into(),
            highest_score,
            color: theme.color().components().to_vec(),
        }
    }

    /// Stored theme, or the default theme if the components are unknown
    pub fn theme(&self) -> ThemeColor {
        ThemeColor::from_components_or_default(&self.color)
    }

    pub fn set_theme(&mut self, theme: ThemeColor) {
        self.color = theme.color().components().to_vec();
    }

    /// Load a profile from disk, starting fresh if it is missing or corrupt
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(profile) => {
                log::info!("Loaded profile from {}", path.display());
                profile
            }
            Err(ProfileError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No profile found, starting fresh");
                Self::default()
            }
            Err(e) => {
                log::warn!("Could not read profile ({}), starting fresh", e);
                Self::default()
            }
        }
    }

    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProfileError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Profile saved");
        Ok(())
    }
}

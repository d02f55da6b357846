//! Runtime physics and timing configuration.
//!
//! [`TableConfig`] holds every tunable magnitude and delay used by the
//! simulator. All fields default to the values the table was tuned with, so
//! a JSON file only needs the keys it wants to override:
//!
//! ```json
//! { "gravity": [0.0, -300.0], "kick_impulse": 12.0 }
//! ```
//!
//! Units: positions in points, time in seconds. Forces and impulses are in
//! physical units (newtons, newton-seconds) and converted through
//! `points_per_meter`, so a ball of `ball_mass` kilograms receiving an
//! impulse `j` changes speed by `j / ball_mass * points_per_meter` points/s.

use std::f32::consts::PI;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    // ── Physics ──────────────────────────────────────────────────────────────
    /// Gravity acceleration, points/s² (-2.5 m/s² at 150 points per meter)
    pub gravity: Vec2,
    /// Scale between engine impulses and points/s
    pub points_per_meter: f32,
    pub ball_mass: f32,
    pub ball_restitution: f32,
    /// Default restitution for shapes that don't set one
    pub default_restitution: f32,
    /// Tangential friction coefficient against walls
    pub friction: f32,
    /// Upper bound on physics iterations per tick (tunneling guard)
    pub max_iterations: u32,

    // ── Feedback ─────────────────────────────────────────────────────────────
    /// How long a point target stays red after a hit
    pub flash_duration: f32,

    // ── Flippers ─────────────────────────────────────────────────────────────
    /// How long a press keeps the wing able to transfer energy
    pub wing_window: f32,
    /// Minimum gap between two flipper impulses
    pub impulse_lockout: f32,
    /// Collision impulse separating a graze (nudge) from a square hit (kick)
    pub kick_threshold: f32,
    pub nudge_force: f32,
    pub nudge_duration: f32,
    pub kick_impulse: f32,
    /// Wing rotation for one press (radians), out and back
    pub wing_swing_angle: f32,
    pub wing_swing_duration: f32,
    /// Half side of the square hit zone around a flipper pivot
    pub touch_half_extent: f32,

    // ── Ball lifecycle ───────────────────────────────────────────────────────
    pub load_fade_in: f32,
    pub free_ball_debounce: f32,
    pub free_ball_fade: f32,
    pub free_ball_respawn_delay: f32,
    pub free_ball_notice_duration: f32,
    pub drain_fade: f32,

    // ── Plunger ──────────────────────────────────────────────────────────────
    pub pusher_travel: f32,
    pub pusher_down: f32,
    pub pusher_hold: f32,
    pub pusher_return: f32,
    pub launch_delay: f32,
    pub launch_impulse: f32,
    pub launch_impulse_duration: f32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -375.0),
            points_per_meter: 150.0,
            ball_mass: 4.0,
            ball_restitution: 0.2,
            default_restitution: 0.2,
            friction: 0.1,
            max_iterations: 16,

            flash_duration: 0.3,

            wing_window: 0.25,
            impulse_lockout: 0.1,
            kick_threshold: 1.0,
            nudge_force: 30.0,
            nudge_duration: 0.2,
            kick_impulse: 10.0,
            wing_swing_angle: PI / 2.5,
            wing_swing_duration: 0.3,
            touch_half_extent: 40.0,

            load_fade_in: 0.5,
            free_ball_debounce: 2.0,
            free_ball_fade: 1.0,
            free_ball_respawn_delay: 1.0,
            free_ball_notice_duration: 3.0,
            drain_fade: 0.1,

            pusher_travel: 30.0,
            pusher_down: 0.2,
            pusher_hold: 0.3,
            pusher_return: 0.1,
            launch_delay: 0.5,
            launch_impulse: 20.0,
            launch_impulse_duration: 0.05,
        }
    }
}

impl TableConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file, falling back to defaults if it is missing or invalid
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let loaded = std::fs::read_to_string(path)
            .map_err(ConfigError::from)
            .and_then(|json| Self::from_json_str(&json));
        match loaded {
            Ok(config) => {
                log::info!("Loaded table config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Using default table config ({})", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = TableConfig::from_json_str(r#"{ "kick_impulse": 12.5 }"#).unwrap();
        assert_eq!(config.kick_impulse, 12.5);
        assert_eq!(config.wing_window, 0.25);
        assert_eq!(config.gravity, Vec2::new(0.0, -375.0));
    }

    #[test]
    fn test_gravity_from_json_array() {
        let config = TableConfig::from_json_str(r#"{ "gravity": [0.0, -300.0] }"#).unwrap();
        assert_eq!(config.gravity, Vec2::new(0.0, -300.0));
    }

    #[test]
    fn test_bad_json_is_an_error() {
        let err = TableConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().starts_with("config json"));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = TableConfig::load("/definitely/not/here/table.json");
        assert_eq!(config, TableConfig::default());
    }
}

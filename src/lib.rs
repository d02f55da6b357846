//! Flipper Table - a single-table pinball simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (table geometry, physics, scoring state machine)
//! - `theme`: Table color themes
//! - `settings`: Persisted player profile (name, best score, theme)
//! - `config`: Runtime-tunable physics and timing values

pub mod config;
pub mod error;
pub mod settings;
pub mod sim;
pub mod theme;

pub use config::TableConfig;
pub use error::{ConfigError, ProfileError, TableError};
pub use settings::Profile;
pub use theme::{Color, ThemeColor};

use glam::Vec2;

/// Table configuration constants
///
/// Geometry is derived from the viewport alone, so everything that shapes the
/// layout is fixed here rather than in [`TableConfig`].
pub mod consts {
    use std::f32::consts::PI;

    /// Fixed simulation timestep (120 Hz for smooth physics)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Width reserved for the launch lane (ball diameter plus clearance)
    pub const BALL_WIDTH: f32 = 25.0;
    /// Thickness of lane walls
    pub const EDGE_WIDTH: f32 = 10.0;

    /// Ball collision radius
    pub const BALL_RADIUS: f32 = 9.0;
    /// Ball drawn radius (slightly larger than the body)
    pub const BALL_VISUAL_RADIUS: f32 = 10.0;

    /// Flipper pivot button radius (also the wing's root arc radius)
    pub const FLIPPER_BUTTON_RADIUS: f32 = 20.0;
    /// Radius of the rounded wing tip
    pub const WING_TIP_RADIUS: f32 = 5.0;
    /// Horizontal inset of the pivots from the inner field edges
    pub const FLIPPER_INSET: f32 = 45.0;
    /// Half width of the drain gap between the bottom slopes
    pub const DRAIN_HALF_WIDTH: f32 = 15.0;
    /// Rise of the bottom slopes from the drain to the side walls
    pub const SLOPE_RISE: f32 = 70.0;
    /// Height of the vertical drain walls
    pub const DRAIN_WALL_HEIGHT: f32 = 30.0;

    /// Point bumper radius
    pub const TARGET_RADIUS: f32 = 20.0;
    /// Premium sensor radius (body) and drawn radius
    pub const PREMIUM_RADIUS: f32 = 12.0;
    pub const PREMIUM_VISUAL_RADIUS: f32 = 15.0;
    /// Pass-through lane sensor radius
    pub const LANE_SENSOR_RADIUS: f32 = 5.0;
    /// End-game strip size
    pub const END_GAME_WIDTH: f32 = 30.0;
    pub const END_GAME_HEIGHT: f32 = 2.0;

    /// Where the right lane wall's arc stops and curls inward
    pub const LANE_ARC_END: f32 = 0.25 * PI;
    /// Lower end of the left redirector crescent
    pub const REDIRECTOR_ANGLE: f32 = 1.2 * PI;
    /// Start angle of the redirector's lower arc
    pub const REDIRECTOR_ANGLE_2: f32 = 0.8 * PI;
    /// End of the right premium wedge arc
    pub const PREMIUM_ARC_ANGLE: f32 = 1.7 * PI;

    /// Maximum distance between flattened points on arcs and curves
    pub const ARC_RESOLUTION: f32 = 4.0;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Point on a circle of radius `r` around `center` at angle `theta`
#[inline]
pub fn point_on_circle(center: Vec2, r: f32, theta: f32) -> Vec2 {
    center + polar_to_cartesian(r, theta)
}

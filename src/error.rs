//! Error types for table construction, config loading and profile persistence.
//!
//! None of these cross into the presentation layer as panics: geometry
//! errors are returned from construction, missing shapes are absorbed by the
//! simulator as no-ops, and bad color profiles fall back to the default theme.

use thiserror::Error;

use crate::sim::ShapeId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    /// The viewport cannot produce a valid layout.
    #[error("degenerate table geometry for viewport {width}x{height}: {reason}")]
    DegenerateGeometry {
        width: f32,
        height: f32,
        reason: &'static str,
    },

    /// A shape was referenced after it was destroyed, or before it was built.
    #[error("shape {0} not present")]
    MissingShape(ShapeId),

    /// A stored theme color does not match any known theme.
    #[error("invalid color profile: {0}")]
    InvalidColorProfile(String),
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile io: {0}")]
    Io(#[from] std::io::Error),

    #[error("profile json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
}

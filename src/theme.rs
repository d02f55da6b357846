//! Table color themes
//!
//! The table is drawn in one main color chosen by the player. Persisted
//! themes are stored as raw RGBA components and matched back to a known
//! theme on load.

use serde::{Deserialize, Serialize};

use crate::error::TableError;

/// Linear RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const CLEAR: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn components(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Build from a hex value like `0x4da6a6`
    pub fn from_hex(rgb: u32) -> Self {
        let r = ((rgb >> 16) & 0xff) as f32 / 255.0;
        let g = ((rgb >> 8) & 0xff) as f32 / 255.0;
        let b = (rgb & 0xff) as f32 / 255.0;
        Self::rgb(r, g, b)
    }
}

/// Main table color, selectable by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThemeColor {
    #[default]
    MetalGray,
    SkyBlue,
    DeepPurple,
}

impl ThemeColor {
    pub const ALL: [ThemeColor; 3] = [
        ThemeColor::MetalGray,
        ThemeColor::SkyBlue,
        ThemeColor::DeepPurple,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeColor::MetalGray => "Metal Gray",
            ThemeColor::SkyBlue => "Sky Blue",
            ThemeColor::DeepPurple => "Deep Purple",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            ThemeColor::MetalGray => Color::from_hex(0x6e7681),
            ThemeColor::SkyBlue => Color::from_hex(0x4a90d9),
            ThemeColor::DeepPurple => Color::from_hex(0x4b2a7b),
        }
    }

    /// Match stored RGBA components against the known themes
    pub fn from_components(components: &[f32]) -> Result<Self, TableError> {
        if components.len() != 4 {
            return Err(TableError::InvalidColorProfile(format!(
                "expected 4 components, got {}",
                components.len()
            )));
        }
        Self::ALL
            .into_iter()
            .find(|theme| {
                theme
                    .color()
                    .components()
                    .iter()
                    .zip(components)
                    .all(|(a, b)| (a - b).abs() < 1e-4)
            })
            .ok_or_else(|| {
                TableError::InvalidColorProfile(format!("unknown components {:?}", components))
            })
    }

    /// Like [`ThemeColor::from_components`], falling back to the default theme
    pub fn from_components_or_default(components: &[f32]) -> Self {
        match Self::from_components(components) {
            Ok(theme) => theme,
            Err(e) => {
                log::warn!("{}; using {}", e, ThemeColor::default().as_str());
                ThemeColor::default()
            }
        }
    }
}

//! Collision categories
//!
//! Every body belongs to exactly one category, each with its own bit. Two
//! masks per body decide what happens on overlap: the collision mask selects
//! categories the body physically bounces off, the contact mask selects
//! categories that produce contact events.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionCategory {
    /// Static walls, playfield boundary, pusher, flipper buttons
    Field,
    Ball,
    /// Flipper wings
    Wing,
    /// Point bumpers (solid, score on contact)
    Target,
    /// Pass-through sensors: start lane, free ball, premium points
    Sensor,
    /// Drain strip
    EndGame,
}

impl CollisionCategory {
    pub const fn bit(self) -> u32 {
        match self {
            CollisionCategory::Field => 1 << 0,
            CollisionCategory::Ball => 1 << 1,
            CollisionCategory::Wing => 1 << 2,
            CollisionCategory::Target => 1 << 3,
            CollisionCategory::Sensor => 1 << 4,
            CollisionCategory::EndGame => 1 << 5,
        }
    }

    /// Categories this body bounces off by default
    pub fn default_collision_mask(self) -> CategoryMask {
        use CollisionCategory::*;
        match self {
            Ball => Field | Wing | Target,
            Field | Wing | Target => CategoryMask::from(Ball),
            Sensor | EndGame => CategoryMask::NONE,
        }
    }

    /// Categories this body reports contacts with by default
    pub fn default_contact_mask(self) -> CategoryMask {
        use CollisionCategory::*;
        match self {
            Ball => Wing | Target | Sensor | EndGame,
            Wing | Target | Sensor | EndGame => CategoryMask::from(Ball),
            Field => CategoryMask::NONE,
        }
    }
}

/// A set of collision categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CategoryMask(u32);

impl CategoryMask {
    pub const NONE: CategoryMask = CategoryMask(0);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, category: CollisionCategory) -> bool {
        self.0 & category.bit() != 0
    }
}

impl From<CollisionCategory> for CategoryMask {
    fn from(category: CollisionCategory) -> Self {
        CategoryMask(category.bit())
    }
}

impl BitOr for CollisionCategory {
    type Output = CategoryMask;

    fn bitor(self, rhs: Self) -> CategoryMask {
        CategoryMask(self.bit() | rhs.bit())
    }
}

impl BitOr<CollisionCategory> for CategoryMask {
    type Output = CategoryMask;

    fn bitor(self, rhs: CollisionCategory) -> CategoryMask {
        CategoryMask(self.0 | rhs.bit())
    }
}

impl BitOr for CategoryMask {
    type Output = CategoryMask;

    fn bitor(self, rhs: Self) -> CategoryMask {
        CategoryMask(self.0 | rhs.0)
    }
}

impl fmt::Display for CategoryMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08b}", self.0)
    }
}

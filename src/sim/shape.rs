//! Table shapes and the arena that owns them
//!
//! Shapes live in a flat arena addressed by [`ShapeId`]. A shape may name a
//! parent; its transform is then local to the parent's (the flipper wing
//! rotates in its button's frame). Ids are never reused, so a stale id held
//! by a delayed task simply stops resolving once its shape is destroyed.

use std::fmt;

use glam::{Affine2, Vec2};
use serde::{Deserialize, Serialize};

use super::category::{CategoryMask, CollisionCategory};
use super::path::circle_outline;
use crate::theme::Color;

/// Parent chains deeper than this are treated as broken
const MAX_PARENT_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeId(pub u32);

impl ShapeId {
    /// Never allocated by an arena; names a shape that does not exist
    pub const NONE: ShapeId = ShapeId(0);
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Scoring targets and their values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Three,
    Five,
    Seven,
    Premium,
}

impl TargetKind {
    pub fn points(self) -> u32 {
        match self {
            TargetKind::Three => 3,
            TargetKind::Five => 5,
            TargetKind::Seven => 7,
            TargetKind::Premium => 10,
        }
    }
}

/// Which of the two launch-lane sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaneSensor {
    Top,
    Bottom,
}

/// What a shape means to the contact handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeRole {
    Playfield,
    Wall,
    Pusher,
    FlipperButton(Side),
    FlipperWing(Side),
    Target(TargetKind),
    FreeBallDetector,
    StartBallDetector(LaneSensor),
    EndGameDetector,
    Ball,
}

/// Physical outline, in the shape's local frame
#[derive(Debug, Clone, PartialEq)]
pub enum Collider {
    Circle { radius: f32 },
    /// Solid closed polygon
    Polygon { points: Vec<Vec2> },
    /// Hollow closed outline; only its edges collide
    EdgeLoop { points: Vec<Vec2> },
}

impl Collider {
    /// Outline points for drawing (circles are flattened)
    pub fn outline(&self) -> Vec<Vec2> {
        match self {
            Collider::Circle { radius } => circle_outline(Vec2::ZERO, *radius),
            Collider::Polygon { points } | Collider::EdgeLoop { points } => points.clone(),
        }
    }
}

/// Position and rotation, relative to the parent if there is one
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub position: Vec2,
    pub rotation: f32,
    pub parent: Option<ShapeId>,
}

impl Transform {
    pub fn local(&self) -> Affine2 {
        Affine2::from_angle_translation(self.rotation, self.position)
    }
}

#[derive(Debug, Clone)]
pub struct Shape {
    pub id: ShapeId,
    /// Debug name; the handler dispatches on `role`
    pub name: &'static str,
    pub role: ShapeRole,
    pub collider: Collider,
    pub transform: Transform,
    pub category: CollisionCategory,
    pub collision_mask: CategoryMask,
    pub contact_mask: CategoryMask,
    /// `None` uses the world default
    pub restitution: Option<f32>,
    pub is_dynamic: bool,
    pub fill: Color,
    pub stroke: Color,
    /// Opacity, 0 hides the shape
    pub alpha: f32,
    pub z: i32,
    /// Drawn radius when it differs from the collider's
    pub visual_radius: Option<f32>,
}

impl Shape {
    pub fn new(
        name: &'static str,
        role: ShapeRole,
        collider: Collider,
        category: CollisionCategory,
    ) -> Self {
        Self {
            id: ShapeId(0),
            name,
            role,
            collider,
            transform: Transform::default(),
            category,
            collision_mask: category.default_collision_mask(),
            contact_mask: category.default_contact_mask(),
            restitution: None,
            is_dynamic: false,
            fill: Color::WHITE,
            stroke: Color::CLEAR,
            alpha: 1.0,
            z: 0,
            visual_radius: None,
        }
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.transform.position = position;
        self
    }

    pub fn child_of(mut self, parent: ShapeId) -> Self {
        self.transform.parent = Some(parent);
        self
    }

    pub fn fill(mut self, fill: Color) -> Self {
        self.fill = fill;
        self
    }

    pub fn stroke(mut self, stroke: Color) -> Self {
        self.stroke = stroke;
        self
    }

    pub fn restitution(mut self, restitution: f32) -> Self {
        self.restitution = Some(restitution);
        self
    }

    pub fn z(mut self, z: i32) -> Self {
        self.z = z;
        self
    }

    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn dynamic(mut self) -> Self {
        self.is_dynamic = true;
        self
    }

    pub fn visual_radius(mut self, radius: f32) -> Self {
        self.visual_radius = Some(radius);
        self
    }
}

/// Everything the presentation layer needs to draw one shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderShape {
    pub id: ShapeId,
    pub name: &'static str,
    pub role: ShapeRole,
    /// Outline in the shape's local frame
    pub outline: Vec<Vec2>,
    pub position: Vec2,
    pub rotation: f32,
    pub fill: Color,
    pub stroke: Color,
    pub alpha: f32,
    pub z: i32,
}

/// Owns all shapes, sorted by id
#[derive(Debug, Clone, Default)]
pub struct ShapeArena {
    shapes: Vec<Shape>,
    next_id: u32,
}

impl ShapeArena {
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            next_id: 1,
        }
    }

    /// Add a shape and return its freshly allocated id
    pub fn insert(&mut self, mut shape: Shape) -> ShapeId {
        let id = ShapeId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        shape.id = id;
        // Ids only grow, so pushing keeps the vector sorted
        self.shapes.push(shape);
        id
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes
            .binary_search_by_key(&id, |s| s.id)
            .ok()
            .map(|i| &self.shapes[i])
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        match self.shapes.binary_search_by_key(&id, |s| s.id) {
            Ok(i) => Some(&mut self.shapes[i]),
            Err(_) => None,
        }
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.get(id).is_some()
    }

    /// Remove a shape and any children parented to it
    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        let index = self.shapes.binary_search_by_key(&id, |s| s.id).ok()?;
        let removed = self.shapes.remove(index);
        let children: Vec<ShapeId> = self
            .shapes
            .iter()
            .filter(|s| s.transform.parent == Some(id))
            .map(|s| s.id)
            .collect();
        for child in children {
            self.remove(child);
        }
        Some(removed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// First shape with the given role
    pub fn find_role(&self, role: ShapeRole) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.role == role)
    }

    /// Local-to-world transform, composing the parent chain
    pub fn world_transform(&self, id: ShapeId) -> Option<Affine2> {
        let (affine, _) = self.world_pose(id)?;
        Some(affine)
    }

    /// World transform plus accumulated rotation angle
    fn world_pose(&self, id: ShapeId) -> Option<(Affine2, f32)> {
        let mut shape = self.get(id)?;
        let mut affine = shape.transform.local();
        let mut rotation = shape.transform.rotation;
        for _ in 0..MAX_PARENT_DEPTH {
            let Some(parent_id) = shape.transform.parent else {
                return Some((affine, rotation));
            };
            shape = self.get(parent_id)?;
            affine = shape.transform.local() * affine;
            rotation += shape.transform.rotation;
        }
        None
    }

    /// Draw list sorted back to front
    pub fn render_list(&self) -> Vec<RenderShape> {
        let mut list: Vec<RenderShape> = self
            .shapes
            .iter()
            .filter_map(|shape| {
                let (affine, rotation) = self.world_pose(shape.id)?;
                let outline = match shape.visual_radius {
                    Some(r) => circle_outline(Vec2::ZERO, r),
                    None => shape.collider.outline(),
                };
                Some(RenderShape {
                    id: shape.id,
                    name: shape.name,
                    role: shape.role,
                    outline,
                    position: affine.translation,
                    rotation,
                    fill: shape.fill,
                    stroke: shape.stroke,
                    alpha: shape.alpha,
                    z: shape.z,
                })
            })
            .collect();
        list.sort_by_key(|r| (r.z, r.id));
        list
    }
}

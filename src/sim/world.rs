//! Physics world
//!
//! A small purpose-built 2D engine for one ball on a static table:
//! - Gravity plus timed forces and instant impulses on the ball
//! - Static shapes, and kinematic ones moved by animations (pusher, wings)
//! - Sub-stepped integration so the ball never moves more than half its
//!   radius between collision checks
//! - Collision response with restitution, friction and the surface velocity
//!   of moving shapes
//! - Contact begin events for every shape whose masks ask for them
//!
//! Impulses and forces are in physical units and converted to points/s
//! through `points_per_meter`; see [`TableConfig`].

use std::collections::BTreeSet;

use glam::{Affine2, Vec2};

use super::anim::{AnimStep, Animator};
use super::category::CollisionCategory;
use super::collision::ball_collider_collision;
use super::shape::{Collider, Shape, ShapeArena, ShapeId, ShapeRole};
use crate::config::TableConfig;
use crate::error::TableError;
use crate::theme::Color;

/// Distance a resting contact may open up before it counts as ended
const CONTACT_SLOP: f32 = 0.5;

/// A contact that began during a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub shape: ShapeId,
    pub role: ShapeRole,
    pub category: CollisionCategory,
    /// Simulation time of the iteration the contact began in
    pub time: f32,
    pub point: Vec2,
    /// Surface normal, pointing toward the ball
    pub normal: Vec2,
    /// Collision impulse magnitude (zero for pass-through sensors)
    pub impulse: f32,
}

#[derive(Debug, Clone, Copy)]
struct TimedForce {
    force: Vec2,
    remaining: f32,
}

/// Dynamic state of the single ball
#[derive(Debug, Clone)]
pub struct BallBody {
    pub shape: ShapeId,
    pub velocity: Vec2,
    pub radius: f32,
    pub mass: f32,
    pub restitution: f32,
    forces: Vec<TimedForce>,
}

impl BallBody {
    /// Number of timed forces still acting on the ball
    pub fn active_forces(&self) -> usize {
        self.forces.len()
    }
}

#[derive(Debug, Clone)]
pub struct PhysicsWorld {
    shapes: ShapeArena,
    animator: Animator,
    ball: Option<BallBody>,
    /// Shapes the ball was touching at the end of the last iteration
    touching: BTreeSet<ShapeId>,
    time: f32,
    gravity: Vec2,
    points_per_meter: f32,
    default_restitution: f32,
    friction: f32,
    max_iterations: u32,
}

impl PhysicsWorld {
    pub fn new(shapes: ShapeArena, config: &TableConfig, start_time: f32) -> Self {
        Self {
            shapes,
            animator: Animator::new(),
            ball: None,
            touching: BTreeSet::new(),
            time: start_time,
            gravity: config.gravity,
            points_per_meter: config.points_per_meter,
            default_restitution: config.default_restitution,
            friction: config.friction,
            max_iterations: config.max_iterations.max(1),
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn shapes(&self) -> &ShapeArena {
        &self.shapes
    }

    pub fn ball(&self) -> Option<&BallBody> {
        self.ball.as_ref()
    }

    pub fn ball_position(&self) -> Option<Vec2> {
        let ball = self.ball.as_ref()?;
        self.shapes.get(ball.shape).map(|s| s.transform.position)
    }

    pub fn is_animating(&self, id: ShapeId) -> bool {
        self.animator.is_animating(id)
    }

    /// Add the ball, replacing any previous one
    pub fn spawn_ball(&mut self, shape: Shape, mass: f32, restitution: f32) -> ShapeId {
        if let Some(old) = self.ball.take() {
            self.discard(old.shape);
        }
        let radius = match shape.collider {
            Collider::Circle { radius } => radius,
            _ => 0.0,
        };
        let shape = shape.restitution(restitution);
        let id = self.shapes.insert(shape);
        self.ball = Some(BallBody {
            shape: id,
            velocity: Vec2::ZERO,
            radius,
            mass,
            restitution,
            forces: Vec::new(),
        });
        id
    }

    /// Destroy a shape (and its children), stopping its animations
    pub fn remove_shape(&mut self, id: ShapeId) -> Result<Shape, TableError> {
        if self.ball.as_ref().is_some_and(|b| b.shape == id) {
            self.ball = None;
        }
        self.animator.cancel(id);
        self.touching.remove(&id);
        self.shapes.remove(id).ok_or(TableError::MissingShape(id))
    }

    fn discard(&mut self, id: ShapeId) {
        if let Err(e) = self.remove_shape(id) {
            log::debug!("Discard skipped: {}", e);
        }
    }

    /// Place the ball and set its velocity directly
    pub fn place_ball(&mut self, position: Vec2, velocity: Vec2) -> Result<(), TableError> {
        let ball = self.ball.as_mut().ok_or(TableError::MissingShape(ShapeId::NONE))?;
        let shape = self
            .shapes
            .get_mut(ball.shape)
            .ok_or(TableError::MissingShape(ball.shape))?;
        shape.transform.position = position;
        ball.velocity = velocity;
        Ok(())
    }

    /// Instant velocity change on the ball
    pub fn apply_impulse(&mut self, impulse: Vec2) -> Result<(), TableError> {
        let ppm = self.points_per_meter;
        let ball = self.ball.as_mut().ok_or(TableError::MissingShape(ShapeId::NONE))?;
        ball.velocity += impulse / ball.mass * ppm;
        Ok(())
    }

    /// Constant force on the ball for `duration` seconds
    pub fn apply_force(&mut self, force: Vec2, duration: f32) -> Result<(), TableError> {
        let ball = self.ball.as_mut().ok_or(TableError::MissingShape(ShapeId::NONE))?;
        ball.forces.push(TimedForce {
            force,
            remaining: duration,
        });
        Ok(())
    }

    pub fn set_fill(&mut self, id: ShapeId, color: Color) -> Result<(), TableError> {
        let shape = self.shapes.get_mut(id).ok_or(TableError::MissingShape(id))?;
        shape.fill = color;
        Ok(())
    }

    pub fn run_animation(
        &mut self,
        id: ShapeId,
        steps: impl IntoIterator<Item = AnimStep>,
    ) -> Result<(), TableError> {
        if !self.shapes.contains(id) {
            return Err(TableError::MissingShape(id));
        }
        self.animator.run(id, steps);
        Ok(())
    }

    /// Advance by `dt`, returning the contacts that began during the step.
    ///
    /// Each shape reports at most one contact per step, even if the ball
    /// bounces off and back onto it between iterations.
    pub fn step(&mut self, dt: f32) -> Vec<ContactEvent> {
        if dt <= 0.0 {
            return Vec::new();
        }
        let mut events = Vec::new();
        let mut reported: BTreeSet<ShapeId> = BTreeSet::new();

        let iterations = match &self.ball {
            Some(ball) if ball.radius > 0.0 => {
                let travel = ball.velocity.length() * dt;
                ((travel / (ball.radius * 0.5)).ceil() as u32).clamp(1, self.max_iterations)
            }
            _ => 1,
        };
        let h = dt / iterations as f32;

        for _ in 0..iterations {
            let before = self.world_transforms();
            self.animator.advance(&mut self.shapes, h);
            self.time += h;

            if self.ball.is_none() {
                self.touching.clear();
                continue;
            }
            self.integrate(h);
            self.resolve(h, &before, &mut reported, &mut events);
        }
        events
    }

    fn world_transforms(&self) -> Vec<(ShapeId, Affine2)> {
        self.shapes
            .iter()
            .filter(|s| !s.is_dynamic)
            .filter_map(|s| Some((s.id, self.shapes.world_transform(s.id)?)))
            .collect()
    }

    fn integrate(&mut self, h: f32) {
        let gravity = self.gravity;
        let ppm = self.points_per_meter;
        let Some(ball) = self.ball.as_mut() else {
            return;
        };
        let Some(shape) = self.shapes.get_mut(ball.shape) else {
            self.ball = None;
            return;
        };

        let force: Vec2 = ball.forces.iter().map(|f| f.force).sum();
        ball.velocity += (gravity + force / ball.mass * ppm) * h;
        shape.transform.position += ball.velocity * h;

        for f in &mut ball.forces {
            f.remaining -= h;
        }
        ball.forces.retain(|f| f.remaining > 1e-6);
    }

    fn resolve(
        &mut self,
        h: f32,
        before: &[(ShapeId, Affine2)],
        reported: &mut BTreeSet<ShapeId>,
        events: &mut Vec<ContactEvent>,
    ) {
        let Some(ball) = self.ball.as_mut() else {
            return;
        };
        let Some(ball_shape) = self.shapes.get(ball.shape) else {
            return;
        };
        let ball_id = ball.shape;
        let ball_category = ball_shape.category;
        let collision_mask = ball_shape.collision_mask;
        let contact_mask = ball_shape.contact_mask;
        let mut position = ball_shape.transform.position;
        let mut touching_now = BTreeSet::new();

        for &(id, prev) in before {
            let Some(shape) = self.shapes.get(id) else {
                continue;
            };
            if id == ball_id {
                continue;
            }
            let physical = collision_mask.contains(shape.category);
            let reports = contact_mask.contains(shape.category)
                || shape.contact_mask.contains(ball_category);
            if !physical && !reports {
                continue;
            }
            let Some(transform) = self.shapes.world_transform(id) else {
                continue;
            };

            let touch = ball_collider_collision(
                position,
                ball.radius + CONTACT_SLOP,
                &shape.collider,
                &transform,
            );
            if !touch.hit {
                continue;
            }
            let overlapping = touch.penetration > CONTACT_SLOP;
            if !overlapping && !self.touching.contains(&id) {
                continue;
            }

            let mut impulse = 0.0;
            if physical && overlapping {
                let normal = touch.normal;
                position += normal * (touch.penetration - CONTACT_SLOP);

                // Velocity of the surface point under the ball this iteration
                let local = transform.inverse().transform_point2(touch.point);
                let surface = (touch.point - prev.transform_point2(local)) / h;
                let relative = ball.velocity - surface;
                let vn = relative.dot(normal);
                if vn < 0.0 {
                    let restitution = ball
                        .restitution
                        .max(shape.restitution.unwrap_or(self.default_restitution));
                    let dv_normal = -(1.0 + restitution) * vn;
                    let tangential = relative - normal * vn;
                    let slip = tangential.length().min(self.friction * dv_normal);
                    ball.velocity = relative + normal * dv_normal
                        - tangential.normalize_or_zero() * slip
                        + surface;
                    impulse = ball.mass * dv_normal / self.points_per_meter;
                }
            }

            if reports {
                touching_now.insert(id);
                let begins = overlapping && !self.touching.contains(&id);
                if begins && reported.insert(id) {
                    events.push(ContactEvent {
                        shape: id,
                        role: shape.role,
                        category: shape.category,
                        time: self.time,
                        point: touch.point,
                        normal: touch.normal,
                        impulse,
                    });
                }
            }
        }

        if let Some(shape) = self.shapes.get_mut(ball_id) {
            shape.transform.position = position;
        }
        self.touching = touching_now;
    }
}

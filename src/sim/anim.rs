//! Scripted shape animations
//!
//! An [`Animation`] is a queue of steps run one after another on a single
//! shape. Rotations apply their change incrementally, so several animations
//! on the same shape stack: two overlapping wing swings rotate twice as far.
//! Moves and fades finish exactly on their absolute target.

use std::collections::VecDeque;

use glam::Vec2;

use super::shape::{ShapeArena, ShapeId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimStep {
    /// Move to an absolute local position
    MoveTo { target: Vec2, duration: f32 },
    /// Rotate by a relative angle (radians, counter-clockwise)
    RotateBy { angle: f32, duration: f32 },
    FadeTo { alpha: f32, duration: f32 },
    Wait(f32),
}

impl AnimStep {
    pub fn duration(&self) -> f32 {
        match *self {
            AnimStep::MoveTo { duration, .. }
            | AnimStep::RotateBy { duration, .. }
            | AnimStep::FadeTo { duration, .. } => duration,
            AnimStep::Wait(duration) => duration,
        }
        .max(0.0)
    }
}

/// Values captured when a step begins
#[derive(Debug, Clone, Copy)]
struct StepStart {
    position: Vec2,
    alpha: f32,
}

#[derive(Debug, Clone)]
pub struct Animation {
    shape: ShapeId,
    steps: VecDeque<AnimStep>,
    elapsed: f32,
    start: Option<StepStart>,
}

impl Animation {
    pub fn new(shape: ShapeId, steps: impl IntoIterator<Item = AnimStep>) -> Self {
        Self {
            shape,
            steps: steps.into_iter().collect(),
            elapsed: 0.0,
            start: None,
        }
    }

    pub fn shape(&self) -> ShapeId {
        self.shape
    }

    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }

    /// Advance by `dt`, carrying leftover time into following steps.
    /// Returns false once the animation is done or its shape is gone.
    pub fn advance(&mut self, shapes: &mut ShapeArena, mut dt: f32) -> bool {
        while let Some(&step) = self.steps.front() {
            let Some(shape) = shapes.get_mut(self.shape) else {
                self.steps.clear();
                return false;
            };
            let start = *self.start.get_or_insert(StepStart {
                position: shape.transform.position,
                alpha: shape.alpha,
            });

            let duration = step.duration();
            let used = dt.min(duration - self.elapsed).max(0.0);
            let t_prev = fraction(self.elapsed, duration);
            self.elapsed += used;
            dt -= used;
            let t = fraction(self.elapsed, duration);
            let dt_frac = t - t_prev;

            match step {
                AnimStep::MoveTo { target, .. } => {
                    shape.transform.position += (target - start.position) * dt_frac;
                }
                AnimStep::RotateBy { angle, .. } => {
                    shape.transform.rotation += angle * dt_frac;
                }
                AnimStep::FadeTo { alpha, .. } => {
                    shape.alpha = (shape.alpha + (alpha - start.alpha) * dt_frac).clamp(0.0, 1.0);
                }
                AnimStep::Wait(_) => {}
            }

            if self.elapsed < duration {
                return true;
            }
            // Land exactly on absolute targets
            match step {
                AnimStep::MoveTo { target, .. } => shape.transform.position = target,
                AnimStep::FadeTo { alpha, .. } => shape.alpha = alpha.clamp(0.0, 1.0),
                _ => {}
            }
            self.steps.pop_front();
            self.elapsed = 0.0;
            self.start = None;
        }
        false
    }
}

#[inline]
fn fraction(elapsed: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        1.0
    } else {
        (elapsed / duration).clamp(0.0, 1.0)
    }
}

/// All running animations, in start order
#[derive(Debug, Clone, Default)]
pub struct Animator {
    running: Vec<Animation>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&mut self, shape: ShapeId, steps: impl IntoIterator<Item = AnimStep>) {
        let animation = Animation::new(shape, steps);
        if !animation.is_finished() {
            self.running.push(animation);
        }
    }

    pub fn advance(&mut self, shapes: &mut ShapeArena, dt: f32) {
        self.running.retain_mut(|anim| anim.advance(shapes, dt));
    }

    pub fn is_animating(&self, shape: ShapeId) -> bool {
        self.running.iter().any(|a| a.shape == shape)
    }

    /// Drop every animation on `shape`, leaving it where it is
    pub fn cancel(&mut self, shape: ShapeId) {
        self.running.retain(|a| a.shape != shape);
    }

    pub fn clear(&mut self) {
        self.running.clear();
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::category::CollisionCategory;
    use crate::sim::shape::{Collider, Shape, ShapeRole};

    fn arena_with_shape() -> (ShapeArena, ShapeId) {
        let mut arena = ShapeArena::new();
        let id = arena.insert(Shape::new(
            "block",
            ShapeRole::Pusher,
            Collider::Circle { radius: 1.0 },
            CollisionCategory::Field,
        ));
        (arena, id)
    }

    fn run_for(animator: &mut Animator, arena: &mut ShapeArena, seconds: f32) {
        let steps = (seconds / 0.01).round() as usize;
        for _ in 0..steps {
            animator.advance(arena, 0.01);
        }
    }

    #[test]
    fn test_sequence_moves_holds_and_returns() {
        let (mut arena, id) = arena_with_shape();
        let mut animator = Animator::new();
        animator.run(
            id,
            [
                AnimStep::MoveTo { target: Vec2::new(0.0, -30.0), duration: 0.2 },
                AnimStep::Wait(0.3),
                AnimStep::MoveTo { target: Vec2::ZERO, duration: 0.1 },
            ],
        );

        run_for(&mut animator, &mut arena, 0.1);
        let y = arena.get(id).unwrap().transform.position.y;
        assert!((y + 15.0).abs() < 0.5, "halfway down, got {}", y);

        run_for(&mut animator, &mut arena, 0.3);
        assert!((arena.get(id).unwrap().transform.position.y + 30.0).abs() < 1e-3);

        run_for(&mut animator, &mut arena, 0.25);
        assert_eq!(arena.get(id).unwrap().transform.position, Vec2::ZERO);
        assert!(animator.is_empty());
    }

    #[test]
    fn test_concurrent_rotations_stack() {
        let (mut arena, id) = arena_with_shape();
        let mut animator = Animator::new();
        let swing = [AnimStep::RotateBy { angle: 1.0, duration: 0.3 }];
        animator.run(id, swing);
        run_for(&mut animator, &mut arena, 0.05);
        animator.run(id, swing);
        assert_eq!(animator.len(), 2);

        run_for(&mut animator, &mut arena, 0.5);
        assert!((arena.get(id).unwrap().transform.rotation - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_fade_lands_on_target() {
        let (mut arena, id) = arena_with_shape();
        arena.get_mut(id).unwrap().alpha = 0.0;
        let mut animator = Animator::new();
        animator.run(id, [AnimStep::FadeTo { alpha: 1.0, duration: 0.5 }]);
        run_for(&mut animator, &mut arena, 0.25);
        let alpha = arena.get(id).unwrap().alpha;
        assert!((alpha - 0.5).abs() < 0.05);
        run_for(&mut animator, &mut arena, 0.3);
        assert_eq!(arena.get(id).unwrap().alpha, 1.0);
    }

    #[test]
    fn test_animation_on_removed_shape_is_dropped() {
        let (mut arena, id) = arena_with_shape();
        let mut animator = Animator::new();
        animator.run(id, [AnimStep::Wait(1.0)]);
        arena.remove(id);
        animator.advance(&mut arena, 0.01);
        assert!(animator.is_empty());
    }

    #[test]
    fn test_leftover_time_carries_into_next_step() {
        let (mut arena, id) = arena_with_shape();
        let mut animator = Animator::new();
        animator.run(
            id,
            [
                AnimStep::Wait(0.1),
                AnimStep::RotateBy { angle: 1.0, duration: 0.2 },
            ],
        );
        animator.advance(&mut arena, 0.2);
        assert!((arena.get(id).unwrap().transform.rotation - 0.5).abs() < 1e-5);
    }
}

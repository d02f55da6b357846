//! Collision detection between the ball and table shapes
//!
//! Every test works on a circle (the ball) against one collider and returns
//! the contact point, the surface normal (pointing toward the ball center,
//! ready for reflection) and the penetration depth for position correction.

use glam::{Affine2, Vec2};

use super::shape::Collider;

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Collision point (if hit)
    pub point: Vec2,
    /// Surface normal at collision (pointing toward ball center, for reflection)
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }

    fn deeper(self, other: CollisionResult) -> CollisionResult {
        match (self.hit, other.hit) {
            (true, true) if other.penetration > self.penetration => other,
            (false, true) => other,
            _ => self,
        }
    }
}

/// Check collision between the ball and a solid circle
pub fn ball_circle_collision(ball_pos: Vec2, ball_radius: f32, center: Vec2, radius: f32) -> CollisionResult {
    let offset = ball_pos - center;
    let dist = offset.length();
    let reach = ball_radius + radius;
    if dist >= reach {
        return CollisionResult::miss();
    }
    // Concentric: push straight up
    let normal = if dist > 1e-6 { offset / dist } else { Vec2::Y };
    CollisionResult {
        hit: true,
        point: center + normal * radius,
        normal,
        penetration: reach - dist,
    }
}

/// Closest point to `p` on segment `a`-`b`
#[inline]
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-8 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Check collision between the ball and a line segment
pub fn ball_segment_collision(ball_pos: Vec2, ball_radius: f32, a: Vec2, b: Vec2) -> CollisionResult {
    let closest = closest_point_on_segment(ball_pos, a, b);
    let offset = ball_pos - closest;
    let dist = offset.length();
    if dist >= ball_radius {
        return CollisionResult::miss();
    }
    let normal = if dist > 1e-6 {
        offset / dist
    } else {
        // Ball center is on the line - use the segment's left-hand perpendicular
        (b - a).perp().normalize_or(Vec2::Y)
    };
    CollisionResult {
        hit: true,
        point: closest,
        normal,
        penetration: ball_radius - dist,
    }
}

/// Even-odd point-in-polygon test
pub fn point_in_polygon(p: Vec2, points: &[Vec2]) -> bool {
    let n = points.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Check collision between the ball and a closed outline
///
/// A `solid` outline also catches a ball whose center has sunk inside it and
/// pushes it back out through the nearest edge. A hollow outline only has
/// edges, so a ball may live inside it (the playfield).
pub fn ball_outline_collision(
    ball_pos: Vec2,
    ball_radius: f32,
    points: &[Vec2],
    solid: bool,
) -> CollisionResult {
    let n = points.len();
    if n < 2 {
        return CollisionResult::miss();
    }

    if solid && n >= 3 && point_in_polygon(ball_pos, points) {
        let (closest, dist) = (0..n)
            .map(|i| {
                let c = closest_point_on_segment(ball_pos, points[i], points[(i + 1) % n]);
                (c, c.distance(ball_pos))
            })
            .fold((ball_pos, f32::MAX), |best, cand| if cand.1 < best.1 { cand } else { best });
        let normal = (closest - ball_pos).normalize_or(Vec2::Y);
        return CollisionResult {
            hit: true,
            point: closest,
            normal,
            penetration: dist + ball_radius,
        };
    }

    (0..n)
        .map(|i| ball_segment_collision(ball_pos, ball_radius, points[i], points[(i + 1) % n]))
        .fold(CollisionResult::miss(), CollisionResult::deeper)
}

/// Check collision against a collider placed in the world by `transform`
///
/// The ball is moved into the collider's local frame, tested there, and the
/// result mapped back to world space.
pub fn ball_collider_collision(
    ball_pos: Vec2,
    ball_radius: f32,
    collider: &Collider,
    transform: &Affine2,
) -> CollisionResult {
    let local = transform.inverse().transform_point2(ball_pos);
    let result = match collider {
        Collider::Circle { radius } => ball_circle_collision(local, ball_radius, Vec2::ZERO, *radius),
        Collider::Polygon { points } => ball_outline_collision(local, ball_radius, points, true),
        Collider::EdgeLoop { points } => ball_outline_collision(local, ball_radius, points, false),
    };
    if !result.hit {
        return result;
    }
    CollisionResult {
        hit: true,
        point: transform.transform_point2(result.point),
        normal: transform.transform_vector2(result.normal).normalize_or(result.normal),
        penetration: result.penetration,
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

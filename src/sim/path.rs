//! Outline geometry for table shapes
//!
//! Table pieces are described the way they are drawn: a pen moving through
//! straight lines, circular arcs and the odd cubic curve. [`PathBuilder`]
//! flattens such a description into a closed outline of points, which is
//! what both collision and rendering consume.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::ARC_RESOLUTION;
use crate::point_on_circle;

/// Direction an arc is swept in (y axis points up)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winding {
    CounterClockwise,
    Clockwise,
}

/// A circular arc around an arbitrary center
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArcSegment {
    pub center: Vec2,
    pub radius: f32,
    /// Start angle (radians)
    pub theta_start: f32,
    /// End angle (radians)
    pub theta_end: f32,
    pub winding: Winding,
}

impl ArcSegment {
    pub fn new(center: Vec2, radius: f32, theta_start: f32, theta_end: f32, winding: Winding) -> Self {
        Self {
            center,
            radius,
            theta_start,
            theta_end,
            winding,
        }
    }

    /// Signed sweep from start to end, in (-TAU, TAU)
    ///
    /// Counter-clockwise sweeps are positive. Equal angles sweep nothing.
    pub fn sweep(&self) -> f32 {
        match self.winding {
            Winding::CounterClockwise => (self.theta_end - self.theta_start).rem_euclid(TAU),
            Winding::Clockwise => -(self.theta_start - self.theta_end).rem_euclid(TAU),
        }
    }

    /// Point at parameter `t` in [0, 1] along the arc
    pub fn point_at(&self, t: f32) -> Vec2 {
        point_on_circle(self.center, self.radius, self.theta_start + self.sweep() * t)
    }

    pub fn start_point(&self) -> Vec2 {
        self.point_at(0.0)
    }

    pub fn end_point(&self) -> Vec2 {
        self.point_at(1.0)
    }

    /// Sample the arc, endpoints included, at most `ARC_RESOLUTION` apart
    pub fn sample(&self) -> Vec<Vec2> {
        let length = self.sweep().abs() * self.radius;
        let segments = ((length / ARC_RESOLUTION).ceil() as usize).clamp(2, 128);
        (0..=segments)
            .map(|i| self.point_at(i as f32 / segments as f32))
            .collect()
    }
}

/// Incrementally builds a closed outline
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    points: Vec<Vec2>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(mut self, p: Vec2) -> Self {
        self.push(p);
        self
    }

    pub fn line_to(mut self, p: Vec2) -> Self {
        self.push(p);
        self
    }

    /// Append an arc; a line joins the current point to the arc start
    pub fn arc(mut self, arc: ArcSegment) -> Self {
        for p in arc.sample() {
            self.push(p);
        }
        self
    }

    /// Append a cubic Bézier curve from the current point
    pub fn cubic_to(mut self, c1: Vec2, c2: Vec2, end: Vec2) -> Self {
        let Some(&start) = self.points.last() else {
            self.push(end);
            return self;
        };
        let approx_len = start.distance(c1) + c1.distance(c2) + c2.distance(end);
        let segments = ((approx_len / ARC_RESOLUTION).ceil() as usize).clamp(2, 32);
        for i in 1..=segments {
            let t = i as f32 / segments as f32;
            let u = 1.0 - t;
            let p = start * (u * u * u)
                + c1 * (3.0 * u * u * t)
                + c2 * (3.0 * u * t * t)
                + end * (t * t * t);
            self.push(p);
        }
        self
    }

    /// Finish the outline; the last point connects back to the first
    pub fn close(mut self) -> Vec<Vec2> {
        while self.points.len() > 1 {
            let first = self.points[0];
            match self.points.last() {
                Some(last) if last.distance_squared(first) < 1e-6 => {
                    self.points.pop();
                }
                _ => break,
            }
        }
        self.points
    }

    fn push(&mut self, p: Vec2) {
        if let Some(last) = self.points.last() {
            if last.distance_squared(p) < 1e-6 {
                return;
            }
        }
        self.points.push(p);
    }
}

/// Outline of a circle, counter-clockwise
pub fn circle_outline(center: Vec2, radius: f32) -> Vec<Vec2> {
    let segments = ((TAU * radius / ARC_RESOLUTION).ceil() as usize).clamp(8, 128);
    (0..segments)
        .map(|i| point_on_circle(center, radius, TAU * i as f32 / segments as f32))
        .collect()
}

/// Axis-aligned rectangle outline from its bottom-left corner
pub fn rect_outline(origin: Vec2, size: Vec2) -> Vec<Vec2> {
    vec![
        origin,
        origin + Vec2::new(size.x, 0.0),
        origin + size,
        origin + Vec2::new(0.0, size.y),
    ]
}

/// Signed area (positive for counter-clockwise outlines)
pub fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| points[i].perp_dot(points[(i + 1) % n]))
        .sum::<f32>()
        * 0.5
}

/// True if the closed outline encloses some area and no two non-adjacent
/// edges cross
pub fn is_simple_polygon(points: &[Vec2]) -> bool {
    let n = points.len();
    if n < 3 || signed_area(points).abs() < 1e-3 {
        return false;
    }
    for i in 0..n {
        let (a1, a2) = (points[i], points[(i + 1) % n]);
        for j in (i + 2)..n {
            // First and last edges share a vertex
            if i == 0 && j == n - 1 {
                continue;
            }
            let (b1, b2) = (points[j], points[(j + 1) % n]);
            if segments_cross(a1, a2, b1, b2) {
                return false;
            }
        }
    }
    true
}

/// Proper crossing test (touching endpoints don't count)
fn segments_cross(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    let d1 = (a2 - a1).perp_dot(b1 - a1);
    let d2 = (a2 - a1).perp_dot(b2 - a1);
    let d3 = (b2 - b1).perp_dot(a1 - b1);
    let d4 = (b2 - b1).perp_dot(a2 - b1);
    const EPS: f32 = 1e-4;
    ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
        && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
}

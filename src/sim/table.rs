//! Table geometry
//!
//! Every static shape on the table is derived from the viewport size with
//! closed-form trigonometry. The layout is a pure function of
//! (viewport, theme): building twice gives identical shapes.
//!
//! Coordinates have the origin at the bottom-left corner with y pointing up.
//! The playfield is a bucket with a half-circle top of radius `W/2` centred
//! at `(W/2, H - W/2)`; the launch lane runs up the right side.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::category::CollisionCategory;
use super::path::{ArcSegment, PathBuilder, Winding, is_simple_polygon, rect_outline};
use super::shape::{Collider, LaneSensor, Shape, ShapeArena, ShapeId, ShapeRole, Side, TargetKind};
use crate::consts::*;
use crate::error::TableError;
use crate::point_on_circle;
use crate::theme::{Color, ThemeColor};

/// Horizontal offset of the wing's tip solve from the slope run
const WING_LENGTH_TRIM: f32 = 35.0;
/// Clearance kept between the resting wing and the bottom slope
const WING_SLOPE_CLEARANCE: f32 = 14.0;
/// Inset of the vertical bars and free-ball sensors from the side walls
const BAR_INSET: f32 = 35.0;
const BAR_WIDTH: f32 = 10.0;
const FREE_BALL_INSET: f32 = 20.0;
/// Distance of the free-ball sensors below the bar tops
const FREE_BALL_DROP: f32 = 20.0;
/// Offset of the start-lane sensors from mid height
const START_SENSOR_OFFSET: f32 = 20.0;

/// Drawing order
const Z_PLAYFIELD: i32 = -15;
const Z_FURNITURE: i32 = -10;
const Z_WING: i32 = -5;

/// Screen size the table is derived from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Every derived length and reference point of the layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableMetrics {
    pub viewport: Viewport,
    /// Radius of the playfield's top arc (`W/2`)
    pub radius: f32,
    /// Field width left of the launch lane
    pub inner_width: f32,
    pub inner_radius: f32,
    /// Center of the playfield's top arc
    pub arc_center: Vec2,
    /// Horizontal run of each bottom slope (drain edge to side wall)
    pub slope_run: f32,
    /// Resting angle of the wings, equal to the bottom slopes' angle
    pub wing_angle: f32,
    pub left_pivot: Vec2,
    pub right_pivot: Vec2,
    /// Right wing tip center relative to its pivot; the left one is mirrored
    pub wing_tip: Vec2,
    /// Vertical drop of the redirector's arc (`radius * |sin(1.2π)|`)
    pub redirector_drop: f32,
    pub ball_spawn: Vec2,
}

impl TableMetrics {
    /// Derive the layout metrics, rejecting viewports that produce
    /// invalid lengths
    pub fn new(viewport: Viewport) -> Result<Self, TableError> {
        let Viewport { width, height } = viewport;
        let degenerate = |reason| TableError::DegenerateGeometry {
            width,
            height,
            reason,
        };

        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(degenerate("viewport must be positive and finite"));
        }
        if height <= width {
            return Err(degenerate("viewport height must exceed its width"));
        }

        let radius = width / 2.0;
        let inner_width = width - BALL_WIDTH - EDGE_WIDTH;
        let inner_radius = inner_width / 2.0;
        let arc_center = Vec2::new(width / 2.0, height - width / 2.0);

        // Right triangle under each slope: run x rise
        let slope_run = inner_width / 2.0 - DRAIN_HALF_WIDTH;
        let run_from_pivot = slope_run - FLIPPER_INSET;
        if run_from_pivot <= 0.0 {
            return Err(degenerate("viewport too narrow for the flippers"));
        }
        let hypotenuse = slope_run.hypot(SLOPE_RISE);
        let wing_angle = (SLOPE_RISE / hypotenuse).asin();

        // Similar triangle from the pivot's x to the drain, lifted by the
        // button's clearance above the slope
        let beta = FRAC_PI_2 - wing_angle;
        let height_above_slope = FLIPPER_INSET / beta.sin();
        let shorter_hypotenuse = hypotenuse * run_from_pivot / slope_run;
        let pivot_y = (shorter_hypotenuse.powi(2) - run_from_pivot.powi(2)).sqrt()
            + height_above_slope
            + DRAIN_WALL_HEIGHT;

        let right_pivot = Vec2::new(inner_width - FLIPPER_INSET, pivot_y);
        let left_pivot = Vec2::new(FLIPPER_INSET, pivot_y);

        // Tip: distance c along the wing, dropped by a below the pivot
        let c = slope_run - WING_LENGTH_TRIM;
        let a = c * wing_angle.sin() + WING_SLOPE_CLEARANCE / wing_angle.cos();
        if c <= 0.0 || c * c <= a * a {
            return Err(degenerate("wing tip has no solution at this width"));
        }
        let b = (c * c - a * a).sqrt();
        let wing_tip = Vec2::new(-b, -a);

        let metrics = Self {
            viewport,
            radius,
            inner_width,
            inner_radius,
            arc_center,
            slope_run,
            wing_angle,
            left_pivot,
            right_pivot,
            wing_tip,
            redirector_drop: radius * REDIRECTOR_ANGLE.sin().abs(),
            ball_spawn: Vec2::new(width - BALL_WIDTH / 2.0, height / 5.0),
        };
        if !metrics.all_finite() {
            return Err(degenerate("derived lengths are not finite"));
        }
        Ok(metrics)
    }

    fn all_finite(&self) -> bool {
        [
            self.radius,
            self.inner_width,
            self.wing_angle,
            self.left_pivot.y,
            self.wing_tip.x,
            self.wing_tip.y,
            self.redirector_drop,
        ]
        .iter()
        .all(|v| v.is_finite())
    }

    /// Tip center of a wing, relative to its pivot
    pub fn wing_tip_for(&self, side: Side) -> Vec2 {
        match side {
            Side::Right => self.wing_tip,
            Side::Left => Vec2::new(-self.wing_tip.x, self.wing_tip.y),
        }
    }

    pub fn pivot_for(&self, side: Side) -> Vec2 {
        match side {
            Side::Left => self.left_pivot,
            Side::Right => self.right_pivot,
        }
    }

    /// Top of the vertical bars, also the reference for the out-lanes
    fn bar_top(&self) -> f32 {
        self.arc_center.y - 1.6 * self.redirector_drop
    }

    /// Radius of the inner lane wall, just inside the launch lane
    fn lip_radius(&self) -> f32 {
        self.radius - BALL_WIDTH - EDGE_WIDTH
    }

    /// Height of the premium wedge's lower corner above the arc center
    fn premium_height(&self) -> f32 {
        self.lip_radius() * (PREMIUM_ARC_ANGLE - self.wing_angle).sin()
    }
}

/// Ids of the shapes the simulator drives directly
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableHandles {
    pub pusher: ShapeId,
    pub left_button: ShapeId,
    pub left_wing: ShapeId,
    pub right_button: ShapeId,
    pub right_wing: ShapeId,
}

impl TableHandles {
    pub fn button(&self, side: Side) -> ShapeId {
        match side {
            Side::Left => self.left_button,
            Side::Right => self.right_button,
        }
    }

    pub fn wing(&self, side: Side) -> ShapeId {
        match side {
            Side::Left => self.left_wing,
            Side::Right => self.right_wing,
        }
    }
}

/// A built table: metrics plus all static shapes
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub metrics: TableMetrics,
    pub theme: ThemeColor,
    pub shapes: ShapeArena,
    pub handles: TableHandles,
}

/// Build the whole table for a viewport
pub fn build_table(viewport: Viewport, theme: ThemeColor) -> Result<TableLayout, TableError> {
    TableBuilder::new(viewport, theme)?.build()
}

/// Derives and creates every static table shape
pub struct TableBuilder {
    metrics: TableMetrics,
    theme: ThemeColor,
    main: Color,
}

impl TableBuilder {
    pub fn new(viewport: Viewport, theme: ThemeColor) -> Result<Self, TableError> {
        Ok(Self {
            metrics: TableMetrics::new(viewport)?,
            theme,
            main: theme.color(),
        })
    }

    pub fn metrics(&self) -> &TableMetrics {
        &self.metrics
    }

    pub fn build(self) -> Result<TableLayout, TableError> {
        let mut shapes = ShapeArena::new();

        for outline_shape in [self.playfield(), self.right_lane_wall()] {
            self.check_outline(&outline_shape)?;
            shapes.insert(outline_shape);
        }
        let pusher = shapes.insert(self.pusher());
        shapes.insert(self.bottom_slope(Side::Left));
        shapes.insert(self.bottom_slope(Side::Right));
        let redirector = self.redirector();
        self.check_outline(&redirector)?;
        shapes.insert(redirector);
        shapes.insert(self.end_game_detector());

        let right_button = shapes.insert(self.flipper_button(Side::Right));
        let right_wing = shapes.insert(self.flipper_wing(Side::Right, right_button));
        let left_button = shapes.insert(self.flipper_button(Side::Left));
        let left_wing = shapes.insert(self.flipper_wing(Side::Left, left_button));

        for shape in self.start_ball_detectors() {
            shapes.insert(shape);
        }
        for shape in self.free_ball_detectors() {
            shapes.insert(shape);
        }
        shapes.insert(self.premium_wedge());
        shapes.insert(self.premium_detector());
        for shape in self.vertical_bars() {
            shapes.insert(shape);
        }
        shapes.insert(self.central_diamond());
        for shape in self.point_targets() {
            shapes.insert(shape);
        }

        log::info!(
            "Table built for {}x{}: {} shapes, pivots at y={:.2}",
            self.metrics.viewport.width,
            self.metrics.viewport.height,
            shapes.len(),
            self.metrics.left_pivot.y
        );

        Ok(TableLayout {
            metrics: self.metrics,
            theme: self.theme,
            shapes,
            handles: TableHandles {
                pusher,
                left_button,
                left_wing,
                right_button,
                right_wing,
            },
        })
    }

    fn check_outline(&self, shape: &Shape) -> Result<(), TableError> {
        match &shape.collider {
            Collider::Polygon { points } | Collider::EdgeLoop { points }
                if !is_simple_polygon(points) =>
            {
                Err(TableError::DegenerateGeometry {
                    width: self.metrics.viewport.width,
                    height: self.metrics.viewport.height,
                    reason: "table outline intersects itself",
                })
            }
            _ => Ok(()),
        }
    }

    fn wall(&self, name: &'static str, collider: Collider) -> Shape {
        Shape::new(name, ShapeRole::Wall, collider, CollisionCategory::Field)
            .fill(self.main)
            .z(Z_FURNITURE)
    }

    fn sensor(&self, name: &'static str, role: ShapeRole, center: Vec2) -> Shape {
        Shape::new(
            name,
            role,
            Collider::Circle {
                radius: LANE_SENSOR_RADIUS,
            },
            CollisionCategory::Sensor,
        )
        .at(center)
        .fill(Color::CLEAR)
    }

    /// Bottom edge, right edge, top half circle, closed down the left side
    fn playfield(&self) -> Shape {
        let m = &self.metrics;
        let w = m.viewport.width;
        let points = PathBuilder::new()
            .move_to(Vec2::ZERO)
            .line_to(Vec2::new(w, 0.0))
            .line_to(Vec2::new(w, m.arc_center.y))
            .arc(ArcSegment::new(m.arc_center, m.radius, 0.0, PI, Winding::CounterClockwise))
            .close();
        Shape::new(
            "MainPlayingfield",
            ShapeRole::Playfield,
            Collider::EdgeLoop { points },
            CollisionCategory::Field,
        )
        .fill(Color::WHITE)
        .z(Z_PLAYFIELD)
    }

    /// Inner wall of the launch lane, curling into the field at the top
    fn right_lane_wall(&self) -> Shape {
        let m = &self.metrics;
        let w = m.viewport.width;
        let c = m.arc_center;
        let outer_r = m.radius - BALL_WIDTH;
        let lip_r = m.lip_radius();
        let curl = LANE_ARC_END + PI * 0.01;

        let points = PathBuilder::new()
            .move_to(Vec2::new(w - BALL_WIDTH, 0.0))
            .line_to(Vec2::new(w - BALL_WIDTH, c.y))
            .arc(ArcSegment::new(c, outer_r, 0.0, LANE_ARC_END, Winding::CounterClockwise))
            .cubic_to(
                point_on_circle(c, outer_r, curl),
                point_on_circle(c, lip_r, curl),
                point_on_circle(c, lip_r, LANE_ARC_END),
            )
            .arc(ArcSegment::new(c, lip_r, LANE_ARC_END, 0.0, Winding::Clockwise))
            .line_to(Vec2::new(w - EDGE_WIDTH - BALL_WIDTH, 0.0))
            .close();
        self.wall("RightEdgeWithArc", Collider::EdgeLoop { points })
    }

    /// Plunger block at the bottom of the launch lane
    fn pusher(&self) -> Shape {
        let m = &self.metrics;
        let points = rect_outline(
            Vec2::new(m.viewport.width - BALL_WIDTH - EDGE_WIDTH, 0.0),
            Vec2::new(BALL_WIDTH + EDGE_WIDTH, m.viewport.height / 10.0),
        );
        Shape::new(
            "StartPusherRectangle",
            ShapeRole::Pusher,
            Collider::EdgeLoop { points },
            CollisionCategory::Field,
        )
        .fill(self.main)
        .z(Z_FURNITURE)
    }

    /// Slope from a side wall down to the drain
    fn bottom_slope(&self, side: Side) -> Shape {
        let m = &self.metrics;
        let drain_x = m.inner_width / 2.0;
        let top = DRAIN_WALL_HEIGHT + SLOPE_RISE;
        let (name, points) = match side {
            Side::Left => (
                "LeftBottomEdge",
                vec![
                    Vec2::ZERO,
                    Vec2::new(drain_x - DRAIN_HALF_WIDTH, 0.0),
                    Vec2::new(drain_x - DRAIN_HALF_WIDTH, DRAIN_WALL_HEIGHT),
                    Vec2::new(0.0, top),
                ],
            ),
            Side::Right => (
                "RightBottomEdge",
                vec![
                    Vec2::new(drain_x + DRAIN_HALF_WIDTH, 0.0),
                    Vec2::new(drain_x + DRAIN_HALF_WIDTH, DRAIN_WALL_HEIGHT),
                    Vec2::new(m.inner_width, top),
                    Vec2::new(m.inner_width, 0.0),
                ],
            ),
        };
        self.wall(name, Collider::EdgeLoop { points })
    }

    /// Crescent on the left wall that turns the ball back into the field
    fn redirector(&self) -> Shape {
        let m = &self.metrics;
        let c = m.arc_center;
        let lower_center = Vec2::new(c.x, c.y - 2.0 * m.redirector_drop);
        let points = PathBuilder::new()
            .move_to(Vec2::new(0.0, c.y))
            .arc(ArcSegment::new(c, m.radius, PI, REDIRECTOR_ANGLE, Winding::CounterClockwise))
            .arc(ArcSegment::new(
                lower_center,
                m.radius,
                REDIRECTOR_ANGLE_2,
                PI,
                Winding::CounterClockwise,
            ))
            .close();
        self.wall("BallRedirector", Collider::EdgeLoop { points })
    }

    fn end_game_detector(&self) -> Shape {
        let m = &self.metrics;
        let points = rect_outline(
            Vec2::new(m.inner_width / 2.0 - DRAIN_HALF_WIDTH, 0.0),
            Vec2::new(END_GAME_WIDTH, END_GAME_HEIGHT),
        );
        Shape::new(
            "Endgame",
            ShapeRole::EndGameDetector,
            Collider::Polygon { points },
            CollisionCategory::EndGame,
        )
        .fill(Color::CLEAR)
        .z(Z_WING)
    }

    fn flipper_button(&self, side: Side) -> Shape {
        let name = match side {
            Side::Left => "LeftFlipperButton",
            Side::Right => "RightFlipperButton",
        };
        Shape::new(
            name,
            ShapeRole::FlipperButton(side),
            Collider::Circle {
                radius: FLIPPER_BUTTON_RADIUS,
            },
            CollisionCategory::Field,
        )
        .at(self.metrics.pivot_for(side))
        .fill(Color::RED)
        .stroke(self.main)
    }

    /// Wing outline around its pivot: the root arc hugs the button, the tip
    /// is a small round cap. Mirrored so a positive swing on the left and a
    /// negative one on the right both lift the tip toward the ball.
    fn flipper_wing(&self, side: Side, button: ShapeId) -> Shape {
        let alpha = self.metrics.wing_angle;
        let tip = self.metrics.wing_tip_for(side);
        let (name, root, cap) = match side {
            Side::Right => (
                "RightFlipperWing",
                ArcSegment::new(
                    Vec2::ZERO,
                    FLIPPER_BUTTON_RADIUS,
                    FRAC_PI_2 + alpha,
                    3.0 * FRAC_PI_2 + alpha,
                    Winding::CounterClockwise,
                ),
                ArcSegment::new(
                    tip,
                    WING_TIP_RADIUS,
                    3.0 * FRAC_PI_2 + alpha,
                    FRAC_PI_2 + alpha,
                    Winding::Clockwise,
                ),
            ),
            Side::Left => (
                "LeftFlipperWing",
                ArcSegment::new(
                    Vec2::ZERO,
                    FLIPPER_BUTTON_RADIUS,
                    FRAC_PI_2 - alpha,
                    3.0 * FRAC_PI_2 - alpha,
                    Winding::Clockwise,
                ),
                ArcSegment::new(
                    tip,
                    WING_TIP_RADIUS,
                    3.0 * FRAC_PI_2 - alpha,
                    FRAC_PI_2 - alpha,
                    Winding::CounterClockwise,
                ),
            ),
        };
        let points = PathBuilder::new().arc(root).arc(cap).close();
        Shape::new(
            name,
            ShapeRole::FlipperWing(side),
            Collider::Polygon { points },
            CollisionCategory::Wing,
        )
        .child_of(button)
        .fill(self.main)
        .restitution(0.5)
        .z(Z_WING)
    }

    fn start_ball_detectors(&self) -> [Shape; 2] {
        let v = self.metrics.viewport;
        let x = v.width - BALL_WIDTH / 2.0;
        [
            self.sensor(
                "StartBallDetector1",
                ShapeRole::StartBallDetector(LaneSensor::Top),
                Vec2::new(x, v.height / 2.0 + START_SENSOR_OFFSET),
            ),
            self.sensor(
                "StartBallDetector2",
                ShapeRole::StartBallDetector(LaneSensor::Bottom),
                Vec2::new(x, v.height / 2.0 - START_SENSOR_OFFSET),
            ),
        ]
    }

    /// One sensor in each out-lane, below the vertical bars' tops
    fn free_ball_detectors(&self) -> [Shape; 2] {
        let m = &self.metrics;
        let y = m.bar_top() - FREE_BALL_DROP;
        [
            self.sensor(
                "FreeBallDetector",
                ShapeRole::FreeBallDetector,
                Vec2::new(FREE_BALL_INSET, y),
            ),
            self.sensor(
                "FreeBallDetector",
                ShapeRole::FreeBallDetector,
                Vec2::new(m.inner_width - FREE_BALL_INSET, y),
            ),
        ]
    }

    /// Wedge on the right wall under the lane's lip
    fn premium_wedge(&self) -> Shape {
        let m = &self.metrics;
        let c = m.arc_center;
        let points = PathBuilder::new()
            .move_to(Vec2::new(m.inner_width, c.y))
            .arc(ArcSegment::new(
                c,
                m.lip_radius(),
                0.0,
                PREMIUM_ARC_ANGLE,
                Winding::Clockwise,
            ))
            .line_to(Vec2::new(m.inner_width, c.y + m.premium_height()))
            .close();
        Shape::new(
            "RightPremiumPointsItem",
            ShapeRole::Wall,
            Collider::Polygon { points },
            CollisionCategory::Field,
        )
        .fill(self.main)
        .restitution(1.0)
        .z(Z_FURNITURE)
    }

    fn premium_detector(&self) -> Shape {
        let m = &self.metrics;
        let center = Vec2::new(
            m.inner_width - 30.0,
            m.arc_center.y + m.premium_height() + PREMIUM_RADIUS,
        );
        Shape::new(
            "PremiumPointsDetector",
            ShapeRole::Target(TargetKind::Premium),
            Collider::Circle {
                radius: PREMIUM_RADIUS,
            },
            CollisionCategory::Sensor,
        )
        .at(center)
        .fill(Color::WHITE)
        .stroke(self.main)
        .visual_radius(PREMIUM_VISUAL_RADIUS)
    }

    /// Posts separating the out-lanes from the flippers
    fn vertical_bars(&self) -> [Shape; 2] {
        let m = &self.metrics;
        let bottom = m.left_pivot.y + DRAIN_WALL_HEIGHT;
        let top = m.bar_top();
        let bar = |name, near: f32, far: f32| {
            let points = vec![
                Vec2::new(near, bottom),
                Vec2::new(near, top),
                Vec2::new(far, top),
                Vec2::new(far, bottom),
            ];
            self.wall(name, Collider::Polygon { points }).restitution(0.5)
        };
        [
            bar("LeftVerticalBar", BAR_INSET, BAR_INSET + BAR_WIDTH),
            bar(
                "RightVerticalBar",
                m.inner_width - BAR_INSET,
                m.inner_width - BAR_INSET - BAR_WIDTH,
            ),
        ]
    }

    fn central_diamond(&self) -> Shape {
        let m = &self.metrics;
        let cy = m.arc_center.y;
        let d = m.redirector_drop;
        let points = vec![
            Vec2::new(m.inner_width / 2.0, cy - d),
            Vec2::new(m.inner_width * 3.0 / 7.0, cy - 1.5 * d),
            Vec2::new(m.inner_width / 2.0, cy - 2.0 * d),
            Vec2::new(m.inner_width * 4.0 / 7.0, cy - 1.5 * d),
        ];
        self.wall("CentralDiamond", Collider::Polygon { points })
            .restitution(1.0)
    }

    /// Round bumpers at fixed fractions of the inner radius from the arc
    /// center; higher targets need straighter shots
    fn point_targets(&self) -> [Shape; 3] {
        let m = &self.metrics;
        let c = m.arc_center;
        let r = m.inner_radius;
        let target = |name, kind, center| {
            Shape::new(
                name,
                ShapeRole::Target(kind),
                Collider::Circle {
                    radius: TARGET_RADIUS,
                },
                CollisionCategory::Target,
            )
            .at(center)
            .fill(Color::WHITE)
            .stroke(self.main)
            .restitution(1.0)
        };
        [
            target(
                "ThreePointsDetector",
                TargetKind::Three,
                Vec2::new(c.x + r / 3.0, c.y - r / 3.0),
            ),
            target(
                "FivePointsDetector",
                TargetKind::Five,
                Vec2::new(c.x - r / 3.0, c.y),
            ),
            target(
                "SevenPointsDetector",
                TargetKind::Seven,
                Vec2::new(c.x, c.y + r * 2.0 / 3.0),
            ),
        ]
    }
}

/// A fresh, invisible ball at the bottom of the launch lane
pub fn ball_shape(metrics: &TableMetrics) -> Shape {
    Shape::new(
        "Ball",
        ShapeRole::Ball,
        Collider::Circle {
            radius: BALL_RADIUS,
        },
        CollisionCategory::Ball,
    )
    .at(metrics.ball_spawn)
    .dynamic()
    .fill(Color::WHITE)
    .alpha(0.0)
    .visual_radius(BALL_VISUAL_RADIUS)
}

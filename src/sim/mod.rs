//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Stable iteration order (by shape ID)
//! - Simulation clock only, no wall time
//! - No rendering or platform dependencies

pub mod anim;
pub mod category;
pub mod collision;
pub mod path;
pub mod scheduler;
pub mod shape;
pub mod state;
pub mod table;
pub mod tick;
pub mod world;

pub use anim::{AnimStep, Animation, Animator};
pub use category::{CategoryMask, CollisionCategory};
pub use collision::{CollisionResult, ball_collider_collision, reflect_velocity};
pub use path::{ArcSegment, PathBuilder, Winding};
pub use scheduler::{ScheduledTask, Scheduler};
pub use shape::{
    Collider, LaneSensor, RenderShape, Shape, ShapeArena, ShapeId, ShapeRole, Side, TargetKind,
    Transform,
};
pub use state::{BallPhase, BallView, Command, GameEvent, GameState, Snapshot, TickInput};
pub use table::{TableBuilder, TableHandles, TableLayout, TableMetrics, Viewport, ball_shape, build_table};
pub use tick::TableSimulator;
pub use world::{BallBody, ContactEvent, PhysicsWorld};

//! Game state and the simulator's input/output types
//!
//! The presentation layer never mutates the simulation directly: it sends
//! [`Command`]s in a [`TickInput`] and reads back a [`Snapshot`] each tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::shape::{ShapeId, Side, TargetKind};
use super::table::Viewport;
use crate::settings::Profile;
use crate::theme::ThemeColor;

/// Lifecycle of the current ball
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BallPhase {
    /// No ball on the table, waiting for a load
    #[default]
    Empty,
    /// Ball just spawned (moves to `InLane` within the same tick)
    Loaded,
    /// Ball in the launch lane, waiting for the plunger
    InLane,
    /// Ball in the field: targets, flippers and free-ball lanes are live
    InPlay,
    /// Free ball granted, old ball fading out before the respawn
    FreeBall,
    /// Ball hit the drain, fading out before removal
    Draining,
}

/// HUD state, seeded from the player profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub points: u32,
    /// Never decreases; only updated when a ball drains
    pub highest_score: u32,
    pub player_name: String,
    pub main_color: ThemeColor,
    pub load_enabled: bool,
    pub launch_enabled: bool,
    pub show_free_ball_notice: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            points: 0,
            highest_score: 0,
            player_name: String::new(),
            main_color: ThemeColor::default(),
            load_enabled: true,
            launch_enabled: false,
            show_free_ball_notice: false,
        }
    }
}

impl GameState {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            highest_score: profile.highest_score,
            player_name: profile.player_name.clone(),
            main_color: profile.theme(),
            ..Self::default()
        }
    }

    /// Profile values worth persisting
    pub fn to_profile(&self) -> Profile {
        Profile::new(self.player_name.clone(), self.highest_score, self.main_color)
    }
}

/// Requests from the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Put a new ball in the launch lane (only while loading is enabled)
    LoadBall,
    /// Fire the plunger (only while launching is enabled)
    Launch,
    /// Touch or click at a table position
    Press(Vec2),
    /// Switch theme; rebuilds the table
    SetTheme(ThemeColor),
    SetPlayerName(String),
    /// New screen size; rebuilds the table
    Resize(Viewport),
}

/// Commands for a single tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    pub commands: Vec<Command>,
}

impl TickInput {
    pub fn with(command: Command) -> Self {
        Self {
            commands: vec![command],
        }
    }

    pub fn press(position: Vec2) -> Self {
        Self::with(Command::Press(position))
    }
}

/// Things that happened during a tick, for HUD, sound or logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    BallLoaded,
    BallLaunched,
    Scored {
        target: TargetKind,
        points: u32,
        total: u32,
    },
    FlipperSwing(Side),
    /// Light graze: a short force along the contact normal
    FlipperNudge(Side),
    /// Square hit: an instant impulse along the contact normal
    FlipperKick(Side),
    FreeBall,
    BallRespawned,
    BallDrained { points: u32 },
    HighScore { score: u32 },
    LaunchEnabled(bool),
    TableRebuilt { theme: ThemeColor },
}

/// Ball details for the HUD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallView {
    pub id: ShapeId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub alpha: f32,
}

/// Read-only view of the simulation after a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub time: f32,
    pub phase: BallPhase,
    pub state: GameState,
    pub ball: Option<BallView>,
    pub events: Vec<GameEvent>,
}

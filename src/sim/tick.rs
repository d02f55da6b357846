//! Fixed timestep simulation tick
//!
//! [`TableSimulator`] owns the live table and advances it one tick at a
//! time, always in the same order:
//! 1. Fire scheduled tasks that have come due
//! 2. Apply the tick's commands
//! 3. Step physics
//! 4. Turn the contacts that began into effects (scoring, ball lifecycle,
//!    flipper energy), which may schedule further tasks
//!
//! Anything that refers to a shape that no longer exists is skipped, never
//! treated as a fault.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use glam::Vec2;

use super::anim::AnimStep;
use super::scheduler::{ScheduledTask, Scheduler};
use super::shape::{LaneSensor, RenderShape, ShapeId, ShapeRole, Side, TargetKind};
use super::state::{BallPhase, BallView, Command, GameEvent, GameState, Snapshot, TickInput};
use super::table::{TableHandles, TableMetrics, Viewport, ball_shape, build_table};
use super::world::{ContactEvent, PhysicsWorld};
use crate::config::TableConfig;
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::error::TableError;
use crate::settings::Profile;
use crate::theme::Color;

/// Longest frame the accumulator will try to catch up on
const MAX_FRAME_DT: f32 = 0.1;

const SIDES: [Side; 2] = [Side::Left, Side::Right];

#[inline]
fn side_index(side: Side) -> usize {
    match side {
        Side::Left => 0,
        Side::Right => 1,
    }
}

/// Skip an effect whose shape is gone
fn absorb(result: Result<(), TableError>) {
    if let Err(e) = result {
        log::debug!("Skipped effect: {}", e);
    }
}

pub struct TableSimulator {
    config: TableConfig,
    viewport: Viewport,
    metrics: TableMetrics,
    handles: TableHandles,
    world: PhysicsWorld,
    scheduler: Scheduler,
    state: GameState,
    phase: BallPhase,
    ball: Option<ShapeId>,
    /// Per side, the time until which a press lets the wing transfer energy
    wing_armed_until: [f32; 2],
    last_flipper_impulse: f32,
    last_free_ball: f32,
    accumulator: f32,
    /// Commands received by `advance` while no tick ran
    pending: Vec<Command>,
    events: Vec<GameEvent>,
}

impl TableSimulator {
    pub fn new(viewport: Viewport, state: GameState, config: TableConfig) -> Result<Self, TableError> {
        let layout = build_table(viewport, state.main_color)?;
        let world = PhysicsWorld::new(layout.shapes, &config, 0.0);
        Ok(Self {
            config,
            viewport,
            metrics: layout.metrics,
            handles: layout.handles,
            world,
            scheduler: Scheduler::new(),
            state,
            phase: BallPhase::Empty,
            ball: None,
            wing_armed_until: [f32::NEG_INFINITY; 2],
            last_flipper_impulse: f32::NEG_INFINITY,
            last_free_ball: f32::NEG_INFINITY,
            accumulator: 0.0,
            pending: Vec::new(),
            events: Vec::new(),
        })
    }

    pub fn from_profile(
        viewport: Viewport,
        profile: &Profile,
        config: TableConfig,
    ) -> Result<Self, TableError> {
        Self::new(viewport, GameState::from_profile(profile), config)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> BallPhase {
        self.phase
    }

    /// Simulation clock, seconds
    pub fn time(&self) -> f32 {
        self.world.time()
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn metrics(&self) -> &TableMetrics {
        &self.metrics
    }

    pub fn handles(&self) -> &TableHandles {
        &self.handles
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn ball_id(&self) -> Option<ShapeId> {
        self.ball
    }

    /// Live shape list for drawing, back to front
    pub fn render_shapes(&self) -> Vec<RenderShape> {
        self.world.shapes().render_list()
    }

    /// Move the ball directly (debug and test hook)
    pub fn place_ball(&mut self, position: Vec2, velocity: Vec2) -> Result<(), TableError> {
        self.world.place_ball(position, velocity)
    }

    /// Current state without events
    pub fn snapshot(&self) -> Snapshot {
        let ball = self.world.ball().and_then(|body| {
            let shape = self.world.shapes().get(body.shape)?;
            Some(BallView {
                id: body.shape,
                position: shape.transform.position,
                velocity: body.velocity,
                alpha: shape.alpha,
            })
        });
        Snapshot {
            time: self.world.time(),
            phase: self.phase,
            state: self.state.clone(),
            ball,
            events: Vec::new(),
        }
    }

    /// Advance the game by one fixed timestep
    pub fn tick(&mut self, input: &TickInput, dt: f32) -> Snapshot {
        self.run_due_tasks();

        let pending = std::mem::take(&mut self.pending);
        for command in pending.into_iter().chain(input.commands.iter().cloned()) {
            self.apply_command(command);
        }

        let contacts = self.world.step(dt);
        self.handle_contacts(&contacts);
        self.check_ball_lost();

        let mut snapshot = self.snapshot();
        snapshot.events = std::mem::take(&mut self.events);
        snapshot
    }

    /// Run as many fixed ticks as `frame_dt` covers
    ///
    /// Commands are applied by the first tick; if the frame is too short
    /// for any tick they wait for the next frame.
    pub fn advance(&mut self, frame_dt: f32, input: &TickInput) -> Snapshot {
        self.accumulator += frame_dt.clamp(0.0, MAX_FRAME_DT);
        self.pending.extend(input.commands.iter().cloned());

        let empty = TickInput::default();
        let mut events = Vec::new();
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            events.extend(self.tick(&empty, SIM_DT).events);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }

        let mut snapshot = self.snapshot();
        snapshot.events = events;
        snapshot
    }

    // ── Commands ────────────────────────────────────────────────────────────

    fn apply_command(&mut self, command: Command) {
        match command {
            Command::LoadBall => self.load_ball(),
            Command::Launch => self.launch(),
            Command::Press(position) => self.press(position),
            Command::SetTheme(theme) => {
                let previous = std::mem::replace(&mut self.state.main_color, theme);
                if let Err(e) = self.rebuild() {
                    log::warn!("Theme change failed: {}", e);
                    self.state.main_color = previous;
                }
            }
            Command::SetPlayerName(name) => self.state.player_name = name,
            Command::Resize(viewport) => {
                let previous = std::mem::replace(&mut self.viewport, viewport);
                if let Err(e) = self.rebuild() {
                    log::warn!("Keeping previous table: {}", e);
                    self.viewport = previous;
                }
            }
        }
    }

    fn load_ball(&mut self) {
        if !self.state.load_enabled {
            log::debug!("Load ignored, loading is disabled");
            return;
        }
        let id = self.world.spawn_ball(
            ball_shape(&self.metrics),
            self.config.ball_mass,
            self.config.ball_restitution,
        );
        absorb(self.world.run_animation(
            id,
            [AnimStep::FadeTo {
                alpha: 1.0,
                duration: self.config.load_fade_in,
            }],
        ));
        self.ball = Some(id);
        self.state.points = 0;
        self.state.load_enabled = false;
        self.set_launch_enabled(true);
        self.phase = BallPhase::Loaded;
        log::info!("Ball {} loaded", id);
        self.events.push(GameEvent::BallLoaded);
        // Nothing holds a loaded ball outside the lane
        self.phase = BallPhase::InLane;
    }

    /// Plunger: the pusher drops, holds and snaps back while a delayed
    /// push sends the ball up the lane
    fn launch(&mut self) {
        if !self.state.launch_enabled {
            log::debug!("Launch ignored, launching is disabled");
            return;
        }
        let Some(ball) = self.ball else {
            log::debug!("Launch ignored, no ball");
            return;
        };
        self.set_launch_enabled(false);
        self.state.show_free_ball_notice = false;

        let c = &self.config;
        let plunger = [
            AnimStep::MoveTo {
                target: Vec2::new(0.0, -c.pusher_travel),
                duration: c.pusher_down,
            },
            AnimStep::Wait(c.pusher_hold),
            AnimStep::MoveTo {
                target: Vec2::ZERO,
                duration: c.pusher_return,
            },
        ];
        let fire_at = self.world.time() + c.launch_delay;
        absorb(self.world.run_animation(self.handles.pusher, plunger));
        self.scheduler
            .schedule(fire_at, ScheduledTask::LaunchImpulse { ball });

        self.phase = BallPhase::InPlay;
        log::info!("Ball {} launched", ball);
        self.events.push(GameEvent::BallLaunched);
    }

    /// A press inside a flipper's hit zone swings its wing and opens the
    /// window in which a wing contact transfers energy
    fn press(&mut self, position: Vec2) {
        let now = self.world.time();
        let half = self.config.touch_half_extent;
        for side in SIDES {
            let Some(pivot) = self
                .world
                .shapes()
                .world_transform(self.handles.button(side))
                .map(|t| t.translation)
            else {
                log::debug!("Press skipped, {:?} flipper button missing", side);
                continue;
            };
            let offset = (position - pivot).abs();
            if offset.x >= half || offset.y >= half {
                continue;
            }

            self.wing_armed_until[side_index(side)] = now + self.config.wing_window;
            let swing = match side {
                Side::Left => self.config.wing_swing_angle,
                Side::Right => -self.config.wing_swing_angle,
            };
            let duration = self.config.wing_swing_duration;
            absorb(self.world.run_animation(
                self.handles.wing(side),
                [
                    AnimStep::RotateBy {
                        angle: swing,
                        duration,
                    },
                    AnimStep::RotateBy {
                        angle: -swing,
                        duration,
                    },
                ],
            ));
            self.events.push(GameEvent::FlipperSwing(side));
        }
    }

    /// Discard the table and build it again for the current viewport and
    /// theme; the ball and every pending task go with it
    fn rebuild(&mut self) -> Result<(), TableError> {
        let layout = build_table(self.viewport, self.state.main_color)?;
        self.world = PhysicsWorld::new(layout.shapes, &self.config, self.world.time());
        self.metrics = layout.metrics;
        self.handles = layout.handles;
        self.scheduler.clear();
        self.ball = None;
        self.phase = BallPhase::Empty;
        self.wing_armed_until = [f32::NEG_INFINITY; 2];
        self.state.load_enabled = true;
        self.state.show_free_ball_notice = false;
        self.set_launch_enabled(false);
        log::info!("Table rebuilt ({})", self.state.main_color.as_str());
        self.events.push(GameEvent::TableRebuilt {
            theme: self.state.main_color,
        });
        Ok(())
    }

    fn set_launch_enabled(&mut self, enabled: bool) {
        if self.state.launch_enabled != enabled {
            self.state.launch_enabled = enabled;
            self.events.push(GameEvent::LaunchEnabled(enabled));
        }
    }

    // ── Scheduled tasks ─────────────────────────────────────────────────────

    fn run_due_tasks(&mut self) {
        let now = self.world.time();
        while let Some(task) = self.scheduler.pop_due(now) {
            self.run_task(task);
        }
    }

    fn run_task(&mut self, task: ScheduledTask) {
        match task {
            ScheduledTask::RestoreFill { shape, color } => absorb(self.world.set_fill(shape, color)),
            ScheduledTask::LaunchImpulse { ball } => {
                if self.ball != Some(ball) {
                    log::debug!("Launch push skipped, ball {} is gone", ball);
                    return;
                }
                let duration = self.config.launch_impulse_duration.max(SIM_DT);
                let force = Vec2::new(0.0, self.config.launch_impulse / duration);
                absorb(self.world.apply_force(force, duration));
            }
            ScheduledTask::RespawnBall { old_ball } => {
                if self.ball != Some(old_ball) {
                    log::debug!("Respawn skipped, ball {} is gone", old_ball);
                    return;
                }
                let id = self.world.spawn_ball(
                    ball_shape(&self.metrics).alpha(1.0),
                    self.config.ball_mass,
                    self.config.ball_restitution,
                );
                self.ball = Some(id);
                self.phase = BallPhase::InLane;
                self.set_launch_enabled(true);
                log::info!("Free ball {} in the lane", id);
                self.events.push(GameEvent::BallRespawned);
            }
            ScheduledTask::HideFreeBallNotice => self.state.show_free_ball_notice = false,
            ScheduledTask::DestroyBall { ball } => {
                if self.ball != Some(ball) {
                    log::debug!("Destroy skipped, ball {} is gone", ball);
                    return;
                }
                if let Err(e) = self.world.remove_shape(ball) {
                    log::debug!("Destroy skipped: {}", e);
                }
                self.ball = None;
                self.phase = BallPhase::Empty;
            }
        }
    }

    // ── Contacts ────────────────────────────────────────────────────────────

    /// Apply the effect of each contact that began this step
    ///
    /// A shape produces at most one effect per call, however many contacts
    /// it reports.
    pub fn handle_contacts(&mut self, contacts: &[ContactEvent]) {
        let mut handled = BTreeSet::new();
        let mut lane_top: Option<f32> = None;
        let mut lane_bottom: Option<f32> = None;

        for contact in contacts {
            if !handled.insert(contact.shape) {
                continue;
            }
            match (contact.role, self.phase) {
                (ShapeRole::Target(kind), BallPhase::InPlay) => self.score(kind, contact.shape),
                (ShapeRole::FlipperWing(side), BallPhase::InPlay) => {
                    self.flipper_contact(side, contact)
                }
                (ShapeRole::FreeBallDetector, BallPhase::InPlay) => self.free_ball(contact.time),
                (ShapeRole::EndGameDetector, BallPhase::InLane | BallPhase::InPlay) => {
                    self.end_game()
                }
                (
                    ShapeRole::StartBallDetector(sensor),
                    BallPhase::InLane | BallPhase::InPlay,
                ) => {
                    let latest = match sensor {
                        LaneSensor::Top => &mut lane_top,
                        LaneSensor::Bottom => &mut lane_bottom,
                    };
                    *latest = Some(latest.map_or(contact.time, |t| t.max(contact.time)));
                }
                (role, phase) => log::trace!("Contact with {:?} ignored in {:?}", role, phase),
            }
        }

        if matches!(self.phase, BallPhase::InLane | BallPhase::InPlay)
            && (lane_top.is_some() || lane_bottom.is_some())
        {
            self.infer_lane_direction(lane_top, lane_bottom);
        }
    }

    fn score(&mut self, kind: TargetKind, shape: ShapeId) {
        self.state.points += kind.points();
        absorb(self.world.set_fill(shape, Color::RED));
        self.scheduler.schedule(
            self.world.time() + self.config.flash_duration,
            ScheduledTask::RestoreFill {
                shape,
                color: Color::WHITE,
            },
        );
        log::debug!("{:?} target: {} points", kind, self.state.points);
        self.events.push(GameEvent::Scored {
            target: kind,
            points: kind.points(),
            total: self.state.points,
        });
    }

    /// Energy transfer from a wing, only within its press window and
    /// outside the shared lockout. Only a kick starts the lockout; a nudge
    /// is a force, not an impulse.
    fn flipper_contact(&mut self, side: Side, contact: &ContactEvent) {
        if contact.time > self.wing_armed_until[side_index(side)] {
            return;
        }
        if contact.time - self.last_flipper_impulse < self.config.impulse_lockout {
            log::debug!("{:?} wing contact inside lockout", side);
            return;
        }

        if contact.impulse > self.config.kick_threshold {
            absorb(
                self.world
                    .apply_impulse(contact.normal * self.config.kick_impulse),
            );
            self.events.push(GameEvent::FlipperKick(side));
            self.last_flipper_impulse = contact.time;
        } else if contact.impulse > 0.0 {
            absorb(self.world.apply_force(
                contact.normal * self.config.nudge_force,
                self.config.nudge_duration,
            ));
            self.events.push(GameEvent::FlipperNudge(side));
        }
    }

    fn free_ball(&mut self, time: f32) {
        if time - self.last_free_ball < self.config.free_ball_debounce {
            log::debug!("Free ball debounced");
            return;
        }
        let Some(ball) = self.ball else {
            return;
        };
        self.last_free_ball = time;
        self.phase = BallPhase::FreeBall;
        self.state.show_free_ball_notice = true;

        let now = self.world.time();
        absorb(self.world.run_animation(
            ball,
            [AnimStep::FadeTo {
                alpha: 0.0,
                duration: self.config.free_ball_fade,
            }],
        ));
        self.scheduler.schedule(
            now + self.config.free_ball_respawn_delay,
            ScheduledTask::RespawnBall { old_ball: ball },
        );
        self.scheduler.schedule(
            now + self.config.free_ball_notice_duration,
            ScheduledTask::HideFreeBallNotice,
        );
        log::info!("Free ball");
        self.events.push(GameEvent::FreeBall);
    }

    /// The only place the high score changes
    fn end_game(&mut self) {
        let points = self.state.points;
        self.phase = BallPhase::Draining;
        if let Some(ball) = self.ball {
            let now = self.world.time();
            absorb(self.world.run_animation(
                ball,
                [AnimStep::FadeTo {
                    alpha: 0.0,
                    duration: self.config.drain_fade,
                }],
            ));
            self.scheduler
                .schedule(now + self.config.drain_fade, ScheduledTask::DestroyBall { ball });
        }
        self.state.load_enabled = true;
        self.set_launch_enabled(false);

        log::info!("Ball drained with {} points", points);
        self.events.push(GameEvent::BallDrained { points });
        if points > self.state.highest_score {
            self.state.highest_score = points;
            log::info!("New high score: {}", points);
            self.events.push(GameEvent::HighScore { score: points });
        }
    }

    /// The top sensor firing before the bottom one means the ball is
    /// rolling back down into the lane
    fn infer_lane_direction(&mut self, top: Option<f32>, bottom: Option<f32>) {
        let top = top.unwrap_or(f32::NEG_INFINITY);
        let bottom = bottom.unwrap_or(f32::NEG_INFINITY);
        match top.partial_cmp(&bottom) {
            Some(Ordering::Less) => self.set_launch_enabled(true),
            Some(Ordering::Greater) => self.set_launch_enabled(false),
            _ => log::debug!("Lane sensors fired together, launch state unchanged"),
        }
    }

    /// A ball that escaped the table counts as drained
    fn check_ball_lost(&mut self) {
        let Some(position) = self.world.ball_position() else {
            return;
        };
        if position.y < -self.viewport.height
            && matches!(self.phase, BallPhase::InLane | BallPhase::InPlay)
        {
            log::warn!("Ball left the table at {:?}", position);
            self.end_game();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulator() -> TableSimulator {
        TableSimulator::new(
            Viewport::new(300.0, 500.0),
            GameState::default(),
            TableConfig::default(),
        )
        .unwrap()
    }

    fn run(sim: &mut TableSimulator, seconds: f32) -> Vec<GameEvent> {
        let ticks = (seconds / SIM_DT).round() as usize;
        (0..ticks)
            .flat_map(|_| sim.tick(&TickInput::default(), SIM_DT).events)
            .collect()
    }

    fn contact(sim: &TableSimulator, shape: ShapeId, role: ShapeRole, impulse: f32) -> ContactEvent {
        ContactEvent {
            shape,
            role,
            category: crate::sim::CollisionCategory::Wing,
            time: sim.time(),
            point: Vec2::ZERO,
            normal: Vec2::Y,
            impulse,
        }
    }

    fn in_play() -> TableSimulator {
        let mut sim = simulator();
        sim.tick(&TickInput::with(Command::LoadBall), SIM_DT);
        sim.tick(&TickInput::with(Command::Launch), SIM_DT);
        assert_eq!(sim.phase(), BallPhase::InPlay);
        sim
    }

    #[test]
    fn test_load_then_launch() {
        let mut sim = simulator();
        assert_eq!(sim.phase(), BallPhase::Empty);

        // Launch before load does nothing
        let snapshot = sim.tick(&TickInput::with(Command::Launch), SIM_DT);
        assert!(snapshot.events.is_empty());

        let snapshot = sim.tick(&TickInput::with(Command::LoadBall), SIM_DT);
        assert!(snapshot.events.contains(&GameEvent::BallLoaded));
        assert_eq!(sim.phase(), BallPhase::InLane);
        assert!(!sim.state().load_enabled);
        assert!(sim.state().launch_enabled);
        assert!(snapshot.ball.is_some());

        let snapshot = sim.tick(&TickInput::with(Command::Launch), SIM_DT);
        assert!(snapshot.events.contains(&GameEvent::BallLaunched));
        assert_eq!(sim.phase(), BallPhase::InPlay);
        assert!(!sim.state().launch_enabled);
    }

    #[test]
    fn test_second_load_is_ignored() {
        let mut sim = simulator();
        sim.tick(&TickInput::with(Command::LoadBall), SIM_DT);
        let first = sim.ball_id();
        sim.tick(&TickInput::with(Command::LoadBall), SIM_DT);
        assert_eq!(sim.ball_id(), first);
    }

    #[test]
    fn test_ball_fades_in_on_load() {
        let mut sim = simulator();
        let snapshot = sim.tick(&TickInput::with(Command::LoadBall), SIM_DT);
        assert!(snapshot.ball.unwrap().alpha < 0.1);
        run(&mut sim, 0.6);
        assert_eq!(sim.snapshot().ball.unwrap().alpha, 1.0);
    }

    #[test]
    fn test_plunger_sends_ball_up_the_lane() {
        let mut sim = simulator();
        sim.tick(&TickInput::with(Command::LoadBall), SIM_DT);
        run(&mut sim, 1.0);
        let resting = sim.snapshot().ball.unwrap().position;
        assert!(resting.y < 70.0, "ball should rest on the pusher, y = {}", resting.y);

        sim.tick(&TickInput::with(Command::Launch), SIM_DT);
        run(&mut sim, 0.7);
        let ball = sim.snapshot().ball.unwrap();
        assert!(ball.velocity.y > 200.0 || ball.position.y > 250.0, "{:?}", ball);
    }

    #[test]
    fn test_target_scores_and_flashes() {
        let mut sim = in_play();
        let target = sim
            .world()
            .shapes()
            .find_role(ShapeRole::Target(TargetKind::Five))
            .unwrap()
            .id;
        let c = contact(&sim, target, ShapeRole::Target(TargetKind::Five), 3.0);
        sim.handle_contacts(&[c, c]);
        assert_eq!(sim.state().points, 5);
        assert_eq!(sim.world().shapes().get(target).unwrap().fill, Color::RED);

        run(&mut sim, 0.4);
        assert_eq!(sim.world().shapes().get(target).unwrap().fill, Color::WHITE);
    }

    #[test]
    fn test_targets_do_not_score_in_lane() {
        let mut sim = simulator();
        sim.tick(&TickInput::with(Command::LoadBall), SIM_DT);
        let target = sim
            .world()
            .shapes()
            .find_role(ShapeRole::Target(TargetKind::Seven))
            .unwrap()
            .id;
        let c = contact(&sim, target, ShapeRole::Target(TargetKind::Seven), 3.0);
        sim.handle_contacts(&[c]);
        assert_eq!(sim.state().points, 0);
    }

    #[test]
    fn test_press_outside_hit_zone_does_nothing() {
        let mut sim = simulator();
        let pivot = sim.metrics().left_pivot;
        let snapshot = sim.tick(&TickInput::press(pivot + Vec2::new(40.0, 0.0)), SIM_DT);
        assert!(snapshot.events.is_empty());
        assert!(!sim.world().is_animating(sim.handles().left_wing));

        let snapshot = sim.tick(&TickInput::press(pivot + Vec2::new(39.0, -39.0)), SIM_DT);
        assert_eq!(snapshot.events, vec![GameEvent::FlipperSwing(Side::Left)]);
        assert!(sim.world().is_animating(sim.handles().left_wing));
    }

    #[test]
    fn test_wing_swings_out_and_back() {
        let mut sim = simulator();
        let wing = sim.handles().right_wing;
        sim.tick(&TickInput::press(sim.metrics().right_pivot), SIM_DT);
        run(&mut sim, 0.3);
        let rotation = sim.world().shapes().get(wing).unwrap().transform.rotation;
        assert!(rotation < -1.0, "right wing swings clockwise, got {}", rotation);
        run(&mut sim, 0.4);
        let rotation = sim.world().shapes().get(wing).unwrap().transform.rotation;
        assert!(rotation.abs() < 1e-4);
    }

    #[test]
    fn test_wing_contact_needs_press() {
        let mut sim = in_play();
        let wing = sim.handles().left_wing;
        let c = contact(&sim, wing, ShapeRole::FlipperWing(Side::Left), 1.5);
        sim.handle_contacts(&[c]);
        assert!(sim.events.is_empty());
    }

    #[test]
    fn test_wing_window_closes() {
        let mut sim = in_play();
        let wing = sim.handles().left_wing;
        sim.tick(&TickInput::press(sim.metrics().left_pivot), SIM_DT);
        run(&mut sim, 0.3);
        let c = contact(&sim, wing, ShapeRole::FlipperWing(Side::Left), 1.5);
        sim.handle_contacts(&[c]);
        assert!(!sim.events.contains(&GameEvent::FlipperKick(Side::Left)));
    }

    #[test]
    fn test_flipper_impulse_tiers() {
        let mut sim = in_play();
        let wing = sim.handles().right_wing;

        sim.tick(&TickInput::press(sim.metrics().right_pivot), SIM_DT);
        let forces_before = sim.world().ball().unwrap().active_forces();
        let c = contact(&sim, wing, ShapeRole::FlipperWing(Side::Right), 0.5);
        sim.handle_contacts(&[c]);
        assert_eq!(sim.events.last(), Some(&GameEvent::FlipperNudge(Side::Right)));
        assert_eq!(sim.world().ball().unwrap().active_forces(), forces_before + 1);

        run(&mut sim, 0.15);
        sim.tick(&TickInput::press(sim.metrics().right_pivot), SIM_DT);
        let velocity_before = sim.world().ball().unwrap().velocity;
        let c = contact(&sim, wing, ShapeRole::FlipperWing(Side::Right), 1.5);
        sim.handle_contacts(&[c]);
        assert_eq!(sim.events.last(), Some(&GameEvent::FlipperKick(Side::Right)));
        let dv = sim.world().ball().unwrap().velocity - velocity_before;
        // Impulse 10 on a 4 kg ball at 150 points per meter
        assert!((dv.y - 375.0).abs() < 1e-2);
    }

    #[test]
    fn test_nudge_does_not_start_lockout() {
        let mut sim = in_play();
        let wing = sim.handles().left_wing;
        let role = ShapeRole::FlipperWing(Side::Left);
        sim.tick(&TickInput::press(sim.metrics().left_pivot), SIM_DT);

        let mut graze = contact(&sim, wing, role, 0.5);
        sim.handle_contacts(&[graze]);
        assert_eq!(sim.events, vec![GameEvent::FlipperNudge(Side::Left)]);

        let velocity_before = sim.world().ball().unwrap().velocity;
        graze.time += 0.05;
        graze.impulse = 1.5;
        sim.handle_contacts(&[graze]);
        assert_eq!(sim.events.last(), Some(&GameEvent::FlipperKick(Side::Left)));
        let dv = sim.world().ball().unwrap().velocity - velocity_before;
        assert!((dv.y - 375.0).abs() < 1e-2);

        // The kick does start it
        graze.time += 0.05;
        sim.handle_contacts(&[graze]);
        let kicks = sim
            .events
            .iter()
            .filter(|e| **e == GameEvent::FlipperKick(Side::Left))
            .count();
        assert_eq!(kicks, 1);
    }

    #[test]
    fn test_zero_impulse_wing_contact_is_ignored() {
        let mut sim = in_play();
        let wing = sim.handles().left_wing;
        sim.tick(&TickInput::press(sim.metrics().left_pivot), SIM_DT);
        sim.events.clear();
        let c = contact(&sim, wing, ShapeRole::FlipperWing(Side::Left), 0.0);
        sim.handle_contacts(&[c]);
        assert!(sim.events.is_empty());
    }

    #[test]
    fn test_free_ball_cycle() {
        let mut sim = in_play();
        let old = sim.ball_id().unwrap();
        let detector = sim
            .world()
            .shapes()
            .find_role(ShapeRole::FreeBallDetector)
            .unwrap()
            .id;
        let c = contact(&sim, detector, ShapeRole::FreeBallDetector, 0.0);
        sim.handle_contacts(&[c]);
        assert_eq!(sim.phase(), BallPhase::FreeBall);
        assert!(sim.state().show_free_ball_notice);

        let events = run(&mut sim, 1.1);
        assert!(events.contains(&GameEvent::BallRespawned));
        assert_ne!(sim.ball_id(), Some(old));
        assert!(sim.world().shapes().get(old).is_none());
        assert_eq!(sim.phase(), BallPhase::InLane);
        assert!(sim.state().launch_enabled);
        assert_eq!(sim.snapshot().ball.unwrap().alpha, 1.0);
        assert!(sim.state().show_free_ball_notice);

        run(&mut sim, 2.0);
        assert!(!sim.state().show_free_ball_notice);
    }

    #[test]
    fn test_end_game_commits_high_score() {
        let mut sim = in_play();
        sim.state.points = 42;
        sim.state.highest_score = 10;
        let drain = sim.world().shapes().find_role(ShapeRole::EndGameDetector).unwrap().id;
        let c = contact(&sim, drain, ShapeRole::EndGameDetector, 0.0);
        sim.handle_contacts(&[c]);

        assert_eq!(sim.state().highest_score, 42);
        assert!(sim.state().load_enabled);
        assert!(!sim.state().launch_enabled);
        assert_eq!(sim.phase(), BallPhase::Draining);

        run(&mut sim, 0.2);
        assert_eq!(sim.phase(), BallPhase::Empty);
        assert!(sim.ball_id().is_none());
        assert!(sim.world().ball().is_none());
    }

    #[test]
    fn test_end_game_keeps_higher_record() {
        let mut sim = in_play();
        sim.state.points = 3;
        sim.state.highest_score = 10;
        let drain = sim.world().shapes().find_role(ShapeRole::EndGameDetector).unwrap().id;
        let c = contact(&sim, drain, ShapeRole::EndGameDetector, 0.0);
        sim.handle_contacts(&[c]);
        assert_eq!(sim.state().highest_score, 10);
    }

    #[test]
    fn test_lane_sensor_order_sets_launch() {
        let mut sim = in_play();
        let top = sim
            .world()
            .shapes()
            .find_role(ShapeRole::StartBallDetector(LaneSensor::Top))
            .unwrap()
            .id;
        let bottom = sim
            .world()
            .shapes()
            .find_role(ShapeRole::StartBallDetector(LaneSensor::Bottom))
            .unwrap()
            .id;
        let mut top_hit = contact(&sim, top, ShapeRole::StartBallDetector(LaneSensor::Top), 0.0);
        let mut bottom_hit =
            contact(&sim, bottom, ShapeRole::StartBallDetector(LaneSensor::Bottom), 0.0);

        // Rolling back down: top first
        top_hit.time = 1.0;
        bottom_hit.time = 1.002;
        sim.handle_contacts(&[bottom_hit, top_hit]);
        assert!(sim.state().launch_enabled);

        // Going up: bottom first
        bottom_hit.time = 2.0;
        top_hit.time = 2.002;
        sim.handle_contacts(&[bottom_hit, top_hit]);
        assert!(!sim.state().launch_enabled);

        // Same instant: unchanged
        top_hit.time = 3.0;
        bottom_hit.time = 3.0;
        sim.handle_contacts(&[top_hit, bottom_hit]);
        assert!(!sim.state().launch_enabled);
    }

    #[test]
    fn test_theme_change_rebuilds_table() {
        let mut sim = in_play();
        let snapshot = sim.tick(&TickInput::with(Command::SetTheme(crate::ThemeColor::SkyBlue)), SIM_DT);
        assert!(snapshot.events.contains(&GameEvent::TableRebuilt {
            theme: crate::ThemeColor::SkyBlue
        }));
        assert_eq!(sim.phase(), BallPhase::Empty);
        assert!(sim.ball_id().is_none());
        assert!(sim.state().load_enabled);
        assert!(!sim.state().launch_enabled);
        let pusher = sim.world().shapes().get(sim.handles().pusher).unwrap();
        assert_eq!(pusher.fill, crate::ThemeColor::SkyBlue.color());
    }

    #[test]
    fn test_bad_resize_keeps_table() {
        let mut sim = simulator();
        let before = sim.metrics().left_pivot;
        sim.tick(&TickInput::with(Command::Resize(Viewport::new(500.0, 300.0))), SIM_DT);
        assert_eq!(sim.metrics().left_pivot, before);

        sim.tick(&TickInput::with(Command::Resize(Viewport::new(390.0, 844.0))), SIM_DT);
        assert_ne!(sim.metrics().left_pivot, before);
    }

    #[test]
    fn test_advance_runs_fixed_ticks() {
        let mut sim = simulator();
        // Too short for a tick: the command waits
        let snapshot = sim.advance(SIM_DT * 0.5, &TickInput::with(Command::LoadBall));
        assert!(snapshot.events.is_empty());
        assert_eq!(sim.time(), 0.0);

        let snapshot = sim.advance(SIM_DT * 0.6, &TickInput::default());
        assert!(snapshot.events.contains(&GameEvent::BallLoaded));

        // A long frame is capped
        sim.advance(1.0, &TickInput::default());
        assert!(sim.time() <= (MAX_SUBSTEPS + 2) as f32 * SIM_DT + 1e-4);
    }

    #[test]
    fn test_determinism() {
        let inputs = [
            TickInput::with(Command::LoadBall),
            TickInput::default(),
            TickInput::with(Command::Launch),
        ];
        let mut a = simulator();
        let mut b = simulator();
        for input in &inputs {
            a.tick(input, SIM_DT);
            b.tick(input, SIM_DT);
        }
        run(&mut a, 2.0);
        run(&mut b, 2.0);
        assert_eq!(a.snapshot(), b.snapshot());
    }
}

//! Whole-game scenarios driven through the public simulator API

use flipper_table::consts::SIM_DT;
use flipper_table::sim::{
    BallPhase, CollisionCategory, Command, ContactEvent, GameEvent, GameState, ShapeId, ShapeRole,
    Side, TableSimulator, TargetKind, TickInput, Viewport,
};
use flipper_table::{Profile, TableConfig, ThemeColor};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

fn phone() -> TableSimulator {
    TableSimulator::new(
        Viewport::new(390.0, 844.0),
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

fn shape_with_role(sim: &TableSimulator, role: ShapeRole) -> ShapeId {
    sim.world().shapes().find_role(role).unwrap().id
}

fn contact_at(shape: ShapeId, role: ShapeRole, time: f32, impulse: f32) -> ContactEvent {
    ContactEvent {
        shape,
        role,
        category: CollisionCategory::Sensor,
        time,
        point: Vec2::ZERO,
        normal: Vec2::Y,
        impulse,
    }
}

/// Load, wait for the fade-in, launch, and let the plunger finish
fn launch_ball(sim: &mut TableSimulator) -> Vec<GameEvent> {
    let mut events = sim.tick(&TickInput::with(Command::LoadBall), SIM_DT).events;
    events.extend(run(sim, 0.6));
    events.extend(sim.tick(&TickInput::with(Command::Launch), SIM_DT).events);
    events.extend(run(sim, 0.6));
    events
}

fn score(sim: &mut TableSimulator, kind: TargetKind) {
    let role = ShapeRole::Target(kind);
    let target = shape_with_role(sim, role);
    let time = sim.time();
    sim.handle_contacts(&[contact_at(target, role, time, 2.0)]);
}

/// Drop the ball straight into the drain gap
fn drain(sim: &mut TableSimulator) -> Vec<GameEvent> {
    let x = sim.metrics().inner_width / 2.0;
    sim.place_ball(Vec2::new(x, 40.0), Vec2::ZERO).unwrap();
    run(sim, 1.0)
}

#[test]
fn test_round_drains_and_commits_high_score() {
    let mut sim = phone();
    let events = launch_ball(&mut sim);
    assert!(events.contains(&GameEvent::BallLoaded));
    assert!(events.contains(&GameEvent::BallLaunched));

    score(&mut sim, TargetKind::Seven);
    score(&mut sim, TargetKind::Three);
    assert_eq!(sim.state().points, 10);

    let events = drain(&mut sim);
    assert!(events.contains(&GameEvent::BallDrained { points: 10 }));
    assert!(events.contains(&GameEvent::HighScore { score: 10 }));
    assert_eq!(sim.phase(), BallPhase::Empty);
    assert!(sim.state().load_enabled);
    assert!(!sim.state().launch_enabled);
    assert!(sim.world().ball().is_none());
    assert_eq!(sim.state().highest_score, 10);

    // Next ball starts from zero and a lower round keeps the record
    launch_ball(&mut sim);
    assert_eq!(sim.state().points, 0);
    score(&mut sim, TargetKind::Five);
    let events = drain(&mut sim);
    assert!(events.contains(&GameEvent::BallDrained { points: 5 }));
    assert!(!events.iter().any(|e| matches!(e, GameEvent::HighScore { .. })));
    assert_eq!(sim.state().highest_score, 10);
    assert_eq!(sim.state().points, 5);
}

#[test]
fn test_untouched_ball_drains_on_its_own() {
    let mut sim = TableSimulator::new(
        Viewport::new(300.0, 500.0),
        GameState::default(),
        TableConfig::default(),
    )
    .unwrap();
    sim.tick(&TickInput::with(Command::LoadBall), SIM_DT);
    sim.tick(&TickInput::with(Command::Launch), SIM_DT);
    assert_eq!(sim.phase(), BallPhase::InPlay);

    let events = run(&mut sim, 5.0);
    let drained = events.iter().find_map(|e| match e {
        GameEvent::BallDrained { points } => Some(*points),
        _ => None,
    });
    let Some(points) = drained else {
        panic!("ball never reached the drain: {:?}", events);
    };

    assert!(sim.state().load_enabled);
    assert!(!sim.state().launch_enabled);
    assert_eq!(sim.phase(), BallPhase::Empty);
    assert!(sim.ball_id().is_none());
    assert!(sim.world().ball().is_none());
    assert_eq!(sim.state().highest_score, points);
    assert_eq!(
        events.contains(&GameEvent::HighScore { score: points }),
        points > 0
    );
}

#[test]
fn test_profile_seeds_and_receives_record() {
    let profile = Profile::new("Ada", 8, ThemeColor::DeepPurple);
    let mut sim = TableSimulator::from_profile(
        Viewport::new(390.0, 844.0),
        &profile,
        TableConfig::default(),
    )
    .unwrap();
    assert_eq!(sim.state().main_color, ThemeColor::DeepPurple);

    launch_ball(&mut sim);
    score(&mut sim, TargetKind::Premium);
    drain(&mut sim);

    let saved = sim.state().to_profile();
    assert_eq!(saved.highest_score, 10);
    assert_eq!(saved.player_name, "Ada");
    assert_eq!(saved.theme(), ThemeColor::DeepPurple);
}

#[test]
fn test_free_ball_is_debounced() {
    let mut sim = phone();
    launch_ball(&mut sim);
    let detector = shape_with_role(&sim, ShapeRole::FreeBallDetector);
    let first = sim.time();
    sim.handle_contacts(&[contact_at(detector, ShapeRole::FreeBallDetector, first, 0.0)]);
    assert_eq!(sim.phase(), BallPhase::FreeBall);

    let events = run(&mut sim, 1.1);
    assert!(events.contains(&GameEvent::FreeBall));
    assert!(events.contains(&GameEvent::BallRespawned));
    assert_eq!(sim.phase(), BallPhase::InLane);

    // Relaunch the respawned ball
    sim.tick(&TickInput::with(Command::Launch), SIM_DT);
    assert_eq!(sim.phase(), BallPhase::InPlay);

    sim.handle_contacts(&[contact_at(detector, ShapeRole::FreeBallDetector, first + 1.5, 0.0)]);
    assert_eq!(sim.phase(), BallPhase::InPlay);

    sim.handle_contacts(&[contact_at(detector, ShapeRole::FreeBallDetector, first + 2.1, 0.0)]);
    assert_eq!(sim.phase(), BallPhase::FreeBall);
}

#[test]
fn test_double_press_is_locked_out() {
    let mut sim = phone();
    launch_ball(&mut sim);
    let pivot = sim.metrics().left_pivot;
    let wing = sim.handles().left_wing;
    let role = ShapeRole::FlipperWing(Side::Left);

    sim.tick(&TickInput::press(pivot), SIM_DT);
    let t = sim.time();
    sim.handle_contacts(&[contact_at(wing, role, t, 1.5)]);
    let events = run(&mut sim, 0.05);
    assert!(events.contains(&GameEvent::FlipperKick(Side::Left)));

    let snapshot = sim.tick(&TickInput::press(pivot), SIM_DT);
    assert!(snapshot.events.contains(&GameEvent::FlipperSwing(Side::Left)));
    sim.handle_contacts(&[contact_at(wing, role, t + 0.06, 1.5)]);
    let events = run(&mut sim, SIM_DT);
    assert!(!events.contains(&GameEvent::FlipperKick(Side::Left)));

    // Past the lockout the wing works again
    sim.handle_contacts(&[contact_at(wing, role, t + 0.12, 1.5)]);
    let events = run(&mut sim, SIM_DT);
    assert!(events.contains(&GameEvent::FlipperKick(Side::Left)));
}

#[test]
fn test_swinging_wing_hits_falling_ball() {
    let mut sim = phone();
    launch_ball(&mut sim);
    let pivot = sim.metrics().right_pivot;
    let tip = sim.metrics().wing_tip_for(Side::Right);
    sim.place_ball(pivot + tip * 0.6 + Vec2::new(0.0, 30.0), Vec2::new(0.0, -50.0))
        .unwrap();

    let mut events = sim.tick(&TickInput::press(pivot), SIM_DT).events;
    events.extend(run(&mut sim, 0.25));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, GameEvent::FlipperKick(Side::Right) | GameEvent::FlipperNudge(Side::Right))),
        "{:?}",
        events
    );
}

#[test]
fn test_resize_mid_round_resets_the_table() {
    let mut sim = phone();
    launch_ball(&mut sim);
    let before = sim.time();

    let snapshot = sim.tick(&TickInput::with(Command::Resize(Viewport::new(768.0, 1024.0))), SIM_DT);
    assert!(snapshot.events.contains(&GameEvent::TableRebuilt {
        theme: ThemeColor::MetalGray
    }));
    assert!(snapshot.ball.is_none());
    assert_eq!(sim.phase(), BallPhase::Empty);
    assert!(sim.state().load_enabled);
    assert!(sim.time() > before);
    assert_eq!(sim.metrics().viewport, Viewport::new(768.0, 1024.0));

    // Tasks from the old table never fire on the new one
    let events = run(&mut sim, 3.0);
    assert!(events.is_empty(), "{:?}", events);
}

#[test]
fn test_rejected_resize_is_harmless() {
    let mut sim = phone();
    launch_ball(&mut sim);
    let ball = sim.ball_id();
    let snapshot = sim.tick(&TickInput::with(Command::Resize(Viewport::new(844.0, 390.0))), SIM_DT);
    assert!(snapshot.events.is_empty());
    assert_eq!(sim.ball_id(), ball);
    assert_eq!(sim.phase(), BallPhase::InPlay);
}

#[test]
fn test_autoplay_soak() {
    let mut sim = phone();
    let mut rng = Pcg32::seed_from_u64(7);
    let mut last_time = sim.time();
    let mut record = sim.state().highest_score;

    for _ in 0..(60.0 / SIM_DT) as usize {
        let snapshot = sim.snapshot();
        let mut input = TickInput::default();
        if snapshot.state.load_enabled {
            input.commands.push(Command::LoadBall);
        } else if snapshot.state.launch_enabled && snapshot.phase == BallPhase::InLane {
            input.commands.push(Command::Launch);
        }
        if rng.random_bool(0.05) {
            let side = if rng.random_bool(0.5) { Side::Left } else { Side::Right };
            input.commands.push(Command::Press(sim.metrics().pivot_for(side)));
        }

        let snapshot = sim.tick(&input, SIM_DT);
        assert!(snapshot.time > last_time);
        last_time = snapshot.time;
        assert!(snapshot.state.highest_score >= record);
        record = snapshot.state.highest_score;
        if let Some(ball) = snapshot.ball {
            assert!(ball.position.is_finite());
            assert!(ball.velocity.is_finite());
            assert!((0.0..=1.0).contains(&ball.alpha));
        }
        for event in &snapshot.events {
            if let GameEvent::Scored { points, .. } = event {
                assert!([3, 5, 7, 10].contains(points));
            }
        }
    }
}

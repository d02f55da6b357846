//! Flipper Table entry point
//!
//! Runs a headless autoplay session on a table of the given size: loads and
//! launches balls, taps a flipper whenever the ball drops near it, and prints
//! a summary. The session is fully determined by its arguments.
//!
//! Usage: `flipper-table [width] [height] [seconds] [seed]`
//!
//! Environment:
//! - `FLIPPER_PROFILE`: player profile JSON to load and save
//! - `FLIPPER_CONFIG`: table config JSON overriding the tuned defaults
//! - `RUST_LOG`: log filter (env_logger)

#[cfg(not(target_arch = "wasm32"))]
use anyhow::{Context, Result};

/// Host frame rate of the simulated display
#[cfg(not(target_arch = "wasm32"))]
const FRAME_DT: f32 = 1.0 / 60.0;

/// Distance from a pivot at which the autoplayer reacts
#[cfg(not(target_arch = "wasm32"))]
const REACH: f32 = 70.0;

#[cfg(not(target_arch = "wasm32"))]
fn parse_arg<T: std::str::FromStr>(args: &[String], index: usize, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match args.get(index) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid argument {}: {:?}", index, raw)),
        None => Ok(default),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<()> {
    use flipper_table::sim::{BallPhase, Command, GameEvent, Side, TableSimulator, TickInput, Viewport};
    use flipper_table::{Profile, TableConfig};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let width: f32 = parse_arg(&args, 0, 390.0)?;
    let height: f32 = parse_arg(&args, 1, 844.0)?;
    let seconds: f32 = parse_arg(&args, 2, 120.0)?;
    let seed: u64 = parse_arg(&args, 3, 1)?;

    let profile_path = std::env::var("FLIPPER_PROFILE").ok();
    let profile = profile_path
        .as_deref()
        .map(Profile::load)
        .unwrap_or_default();
    let config = std::env::var("FLIPPER_CONFIG")
        .ok()
        .map(TableConfig::load)
        .unwrap_or_default();

    log::info!("Flipper Table starting: {}x{} for {}s (seed {})", width, height, seconds, seed);
    let mut sim = TableSimulator::from_profile(Viewport::new(width, height), &profile, config)
        .context("could not build the table")?;
    let mut rng = Pcg32::seed_from_u64(seed);

    let frames = (seconds / FRAME_DT).ceil() as usize;
    let mut balls = 0u32;
    let mut hits = 0u32;
    let mut swings = 0u32;
    let mut best_round = 0u32;

    for _ in 0..frames {
        let snapshot = sim.snapshot();
        let mut input = TickInput::default();

        if snapshot.state.load_enabled {
            input.commands.push(Command::LoadBall);
        } else if snapshot.state.launch_enabled
            && snapshot.phase == BallPhase::InLane
            && snapshot.ball.is_some_and(|b| b.alpha >= 1.0)
        {
            input.commands.push(Command::Launch);
        }

        if let Some(ball) = snapshot.ball.filter(|b| b.velocity.y < 0.0) {
            for side in [Side::Left, Side::Right] {
                let pivot = sim.metrics().pivot_for(side);
                if ball.position.distance(pivot) < REACH && rng.random_bool(0.3) {
                    let jitter = glam::Vec2::new(
                        rng.random_range(-30.0..30.0),
                        rng.random_range(-30.0..30.0),
                    );
                    input.commands.push(Command::Press(pivot + jitter));
                }
            }
        }

        for event in sim.advance(FRAME_DT, &input).events {
            match event {
                GameEvent::BallLoaded => balls += 1,
                GameEvent::Scored { .. } => hits += 1,
                GameEvent::FlipperSwing(_) => swings += 1,
                GameEvent::BallDrained { points } => {
                    best_round = best_round.max(points);
                    log::info!("Ball {} drained with {} points", balls, points);
                }
                GameEvent::HighScore { score } => log::info!("New high score {}", score),
                _ => {}
            }
        }
    }

    let state = sim.state();
    println!("balls played:   {}", balls);
    println!("targets hit:    {}", hits);
    println!("flipper swings: {}", swings);
    println!("best round:     {}", best_round);
    println!("current points: {}", state.points);
    println!("high score:     {}", state.highest_score);

    if let Some(path) = profile_path {
        state
            .to_profile()
            .save(&path)
            .with_context(|| format!("could not save profile to {}", path))?;
    }
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Library only on the web; the host page drives the simulator
}

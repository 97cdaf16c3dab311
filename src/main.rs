//! Physac - physics movement demo (headless)
//!
//! Static floor, platforms and walls with a rotation-locked player box that
//! is driven by a seeded input script. Random polygons rain down and one of
//! them gets shattered. Run with `RUST_LOG=debug` for per-body logging.
//!
//! Usage: `physac-demo [seed]`

use std::time::Duration;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use physac::api::*;
use physac::{BodyHandle, PhysicsError, Result, ShapeType, StepMode};

/// Scene size in world units (+y down)
const SCREEN_WIDTH: f32 = 80.0;
const SCREEN_HEIGHT: f32 = 45.0;

/// Player horizontal speed (units/s)
const VELOCITY: f32 = 12.0;
/// Player jump speed (units/s)
const JUMP_VELOCITY: f32 = 20.0;

const FRAMES: u32 = 900;
const FRAME_TIME: Duration = Duration::from_micros(16_667);
/// Frames between input changes
const INPUT_INTERVAL: u32 = 20;
/// Frames between polygon drops
const DROP_INTERVAL: u32 = 60;
const MAX_DROPS: usize = 8;
const SHATTER_FRAME: u32 = 600;
const SHATTER_FORCE: f32 = 4000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Idle,
    Left,
    Right,
    Jump,
    Reset,
}

impl Input {
    fn random(rng: &mut Pcg32) -> Self {
        match rng.random_range(0..20) {
            0..=5 => Input::Left,
            6..=11 => Input::Right,
            12..=15 => Input::Jump,
            16 => Input::Reset,
            _ => Input::Idle,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(42);
    log::info!("Physac movement demo starting (seed {})", seed);

    let result = run(seed);
    close_physics();

    if let Err(e) = result {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Headless demo is native only
}

fn run(seed: u64) -> Result<()> {
    init_physics(StepMode::Manual)?;

    // Floor, platforms and walls don't take part in dynamics
    let statics = [
        create_physics_body_rectangle(
            Vec2::new(SCREEN_WIDTH / 2.0, SCREEN_HEIGHT),
            SCREEN_WIDTH,
            10.0,
            10.0,
        )?,
        create_physics_body_rectangle(
            Vec2::new(SCREEN_WIDTH * 0.25, SCREEN_HEIGHT * 0.6),
            SCREEN_WIDTH * 0.25,
            1.0,
            10.0,
        )?,
        create_physics_body_rectangle(
            Vec2::new(SCREEN_WIDTH * 0.75, SCREEN_HEIGHT * 0.6),
            SCREEN_WIDTH * 0.25,
            1.0,
            10.0,
        )?,
        create_physics_body_rectangle(
            Vec2::new(-0.5, SCREEN_HEIGHT / 2.0),
            1.0,
            SCREEN_HEIGHT,
            10.0,
        )?,
        create_physics_body_rectangle(
            Vec2::new(SCREEN_WIDTH + 0.5, SCREEN_HEIGHT / 2.0),
            1.0,
            SCREEN_HEIGHT,
            10.0,
        )?,
    ];
    for body in statics {
        update_physics_body(body, |b| b.enabled = false)?;
    }

    let spawn = Vec2::new(SCREEN_WIDTH / 2.0, SCREEN_HEIGHT / 2.0);
    let player = create_physics_body_rectangle(spawn, 5.0, 5.0, 1.0)?;
    update_physics_body(player, |b| b.freeze_orient = true)?;

    let mut rng = Pcg32::seed_from_u64(seed);
    let mut input = Input::Idle;
    let mut drops: Vec<BodyHandle> = Vec::new();
    let mut jumps = 0u32;
    let mut steps = 0u32;

    for frame in 0..FRAMES {
        steps += advance_physics(FRAME_TIME)?;

        if frame % INPUT_INTERVAL == 0 {
            input = Input::random(&mut rng);
            log::debug!("Frame {}: input {:?}", frame, input);
        }

        match input {
            Input::Reset => {
                update_physics_body(player, |b| {
                    b.position = spawn;
                    b.velocity = Vec2::ZERO;
                })?;
                set_physics_body_rotation(player, 0.0)?;
                input = Input::Idle;
            }
            Input::Left => update_physics_body(player, |b| b.velocity.x = -VELOCITY)?,
            Input::Right => update_physics_body(player, |b| b.velocity.x = VELOCITY)?,
            Input::Jump => {
                let jumped = update_physics_body(player, |b| {
                    if b.is_grounded {
                        b.velocity.y = -JUMP_VELOCITY;
                    }
                    b.is_grounded
                })?;
                if jumped {
                    jumps += 1;
                }
            }
            Input::Idle => {}
        }

        if frame % DROP_INTERVAL == 0 && drops.len() < MAX_DROPS {
            let pos = Vec2::new(rng.random_range(8.0..SCREEN_WIDTH - 8.0), 4.0);
            let radius = rng.random_range(1.5..3.5);
            let sides = rng.random_range(3..=8);
            match create_physics_body_polygon(pos, radius, sides, 1.0) {
                Ok(handle) => drops.push(handle),
                Err(PhysicsError::CapacityExceeded { .. }) => {
                    log::warn!("Body pool full, skipping drop at frame {}", frame)
                }
                Err(e) => return Err(e),
            }
        }

        if frame == SHATTER_FRAME {
            shatter_first_drop(&drops)?;
        }
    }

    let lines = count_outline_segments()?;
    let player_state = get_physics_body_by_handle(player)?;
    log::info!(
        "Simulated {} frames ({} steps), {} bodies, {} outline segments",
        FRAMES,
        steps,
        get_physics_bodies_count()?,
        lines
    );
    log::info!(
        "Player at ({:.2}, {:.2}), grounded: {}, jumps: {}",
        player_state.position.x,
        player_state.position.y,
        player_state.is_grounded,
        jumps
    );

    for i in 0..get_physics_bodies_count()? {
        let body = get_physics_body(i)?;
        log::debug!(
            "  #{} {:?} ({} vertices) at ({:.2}, {:.2}) orient {:.2}",
            body.id,
            get_physics_shape_type(i)?,
            get_physics_shape_vertices_count(i)?,
            body.position.x,
            body.position.y,
            body.orient()
        );
    }

    Ok(())
}

/// Shatter the oldest dropped polygon at its own center
fn shatter_first_drop(drops: &[BodyHandle]) -> Result<()> {
    let Some(&target) = drops.first() else {
        return Ok(());
    };
    let body = match get_physics_body_by_handle(target) {
        Ok(body) => body,
        Err(PhysicsError::InvalidHandle(_)) => return Ok(()),
        Err(e) => return Err(e),
    };

    match physics_shatter(target, body.position, SHATTER_FORCE) {
        Ok(fragments) => log::info!("Shattered {} into {} fragments", target, fragments.len()),
        Err(PhysicsError::CapacityExceeded { .. }) => {
            log::warn!("Not enough room in the body pool to shatter {}", target)
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

/// Walk every outline the way a renderer would, one segment per vertex pair
fn count_outline_segments() -> Result<usize> {
    let mut segments = 0;
    for i in 0..get_physics_bodies_count()? {
        let handle = get_physics_body_handle(i)?;
        let count = get_physics_shape_vertices_count(i)?;
        if get_physics_shape_type(i)? == ShapeType::Circle {
            log::trace!("Body {} is a circle drawn with {} segments", handle, count);
        }
        for j in 0..count {
            let a = get_physics_shape_vertex(handle, j)?;
            let b = get_physics_shape_vertex(handle, (j + 1) % count)?;
            if a.is_finite() && b.is_finite() {
                segments += 1;
            }
        }
    }
    Ok(segments)
}

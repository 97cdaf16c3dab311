//! Process-wide physics instance behind free functions
//!
//! Mirrors the classic single-header entry points for callers that want one
//! global engine instead of carrying a [`Physics`] handle around. Every call
//! made before [`init_physics`] or after [`close_physics`] returns
//! [`PhysicsError::NotInitialized`].

use std::time::Duration;

use glam::Vec2;
use parking_lot::Mutex;

use crate::error::{PhysicsError, Result};
use crate::scheduler::{Physics, StepMode};
use crate::settings::PhysicsSettings;
use crate::sim::{Body, BodyHandle, ShapeType};

static ENGINE: Mutex<Option<Physics>> = parking_lot::const_mutex(None);

fn with_engine<R>(f: impl FnOnce(&Physics) -> Result<R>) -> Result<R> {
    let engine = ENGINE.lock();
    f(engine.as_ref().ok_or(PhysicsError::NotInitialized)?)
}

/// Initialize the global engine with default settings
pub fn init_physics(mode: StepMode) -> Result<()> {
    init_physics_with(PhysicsSettings::default(), mode)
}

/// Initialize the global engine; a second call keeps the running instance
pub fn init_physics_with(settings: PhysicsSettings, mode: StepMode) -> Result<()> {
    let mut engine = ENGINE.lock();
    if engine.is_some() {
        log::warn!("init_physics called while physics is already initialized; ignoring");
        return Ok(());
    }
    *engine = Some(Physics::init(settings, mode)?);
    Ok(())
}

/// Whether the autonomous stepping thread is running
pub fn is_physics_enabled() -> bool {
    ENGINE.lock().as_ref().is_some_and(Physics::is_enabled)
}

/// Manual mode: step for the time elapsed since the previous call
pub fn run_physics_step() -> Result<u32> {
    with_engine(Physics::run_step)
}

/// Manual mode: step for a caller-measured frame time
pub fn advance_physics(elapsed: Duration) -> Result<u32> {
    with_engine(|physics| physics.advance(elapsed))
}

pub fn set_physics_gravity(x: f32, y: f32) -> Result<()> {
    with_engine(|physics| physics.set_gravity(x, y))
}

pub fn create_physics_body_circle(pos: Vec2, radius: f32, density: f32) -> Result<BodyHandle> {
    with_engine(|physics| physics.create_circle(pos, radius, density))
}

pub fn create_physics_body_rectangle(
    pos: Vec2,
    width: f32,
    height: f32,
    density: f32,
) -> Result<BodyHandle> {
    with_engine(|physics| physics.create_rectangle(pos, width, height, density))
}

pub fn create_physics_body_polygon(
    pos: Vec2,
    radius: f32,
    sides: usize,
    density: f32,
) -> Result<BodyHandle> {
    with_engine(|physics| physics.create_polygon(pos, radius, sides, density))
}

pub fn physics_add_force(body: BodyHandle, force: Vec2) -> Result<()> {
    with_engine(|physics| physics.add_force(body, force))
}

pub fn physics_add_torque(body: BodyHandle, amount: f32) -> Result<()> {
    with_engine(|physics| physics.add_torque(body, amount))
}

pub fn physics_shatter(body: BodyHandle, position: Vec2, force: f32) -> Result<Vec<BodyHandle>> {
    with_engine(|physics| physics.shatter(body, position, force))
}

pub fn update_physics_body<R>(body: BodyHandle, f: impl FnOnce(&mut Body) -> R) -> Result<R> {
    with_engine(|physics| physics.update_body(body, f))
}

pub fn get_physics_bodies_count() -> Result<usize> {
    with_engine(Physics::count)
}

/// Copy of the `index`-th body in creation order
pub fn get_physics_body(index: usize) -> Result<Body> {
    with_engine(|physics| physics.get(index))
}

pub fn get_physics_body_by_handle(body: BodyHandle) -> Result<Body> {
    with_engine(|physics| physics.body(body))
}

pub fn get_physics_body_handle(index: usize) -> Result<BodyHandle> {
    with_engine(|physics| physics.handle_at(index))
}

pub fn get_physics_shape_type(index: usize) -> Result<ShapeType> {
    with_engine(|physics| physics.shape_type(index))
}

pub fn get_physics_shape_vertices_count(index: usize) -> Result<usize> {
    with_engine(|physics| physics.shape_vertex_count(index))
}

/// World-space vertex of a body's shape
pub fn get_physics_shape_vertex(body: BodyHandle, vertex: usize) -> Result<Vec2> {
    with_engine(|physics| physics.shape_vertex(body, vertex))
}

pub fn set_physics_body_rotation(body: BodyHandle, radians: f32) -> Result<()> {
    with_engine(|physics| physics.set_rotation(body, radians))
}

pub fn destroy_physics_body(body: BodyHandle) -> Result<()> {
    with_engine(|physics| physics.destroy(body))
}

/// Drop every body; gravity and settings are kept
pub fn reset_physics() -> Result<()> {
    with_engine(Physics::reset)
}

/// Stop stepping and release the global engine (blocks on an in-flight step)
pub fn close_physics() {
    // Joined outside the global lock
    let physics = ENGINE.lock().take();
    if let Some(physics) = physics {
        physics.close();
    }
}

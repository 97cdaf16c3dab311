//! `Physics` handle: owns the world and decides when it steps
//!
//! In [`StepMode::Autonomous`] a worker thread advances the world at the
//! desired rate. In [`StepMode::Manual`] the caller drives it once per frame
//! with [`Physics::run_step`] or [`Physics::advance`]. Either way every access
//! goes through one mutex around the whole world, so a reader sees the world
//! before or after a step, never halfway through one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use glam::Vec2;
use parking_lot::Mutex;

use crate::error::{PhysicsError, Result};
use crate::settings::PhysicsSettings;
use crate::sim::{self, Body, BodyHandle, Manifold, ShapeType, World};

/// Who drives the fixed-step loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    /// Background thread steps at `desired_delta_time`
    Autonomous,
    /// Caller steps once per frame
    #[default]
    Manual,
}

struct Shared {
    /// `None` once closed
    world: Mutex<Option<World>>,
    running: AtomicBool,
}

pub struct Physics {
    shared: Arc<Shared>,
    mode: StepMode,
    /// Wall-clock time of the last `run_step` (or init)
    last_frame: Mutex<Instant>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Physics {
    pub fn init(settings: PhysicsSettings, mode: StepMode) -> Result<Self> {
        let world = World::new(settings)?;
        let dt = Duration::from_secs_f32(world.settings().desired_delta_time);

        let shared = Arc::new(Shared {
            world: Mutex::new(Some(world)),
            running: AtomicBool::new(mode == StepMode::Autonomous),
        });

        let worker = match mode {
            StepMode::Autonomous => {
                let shared = Arc::clone(&shared);
                let handle = thread::Builder::new()
                    .name("physics-step".into())
                    .spawn(move || run_worker(&shared, dt))?;
                Some(handle)
            }
            StepMode::Manual => None,
        };

        log::info!("Physics initialized ({:?} stepping, dt = {:?})", mode, dt);

        Ok(Self {
            shared,
            mode,
            last_frame: Mutex::new(Instant::now()),
            worker: Mutex::new(worker),
        })
    }

    #[inline]
    pub fn mode(&self) -> StepMode {
        self.mode
    }

    /// Whether the autonomous worker is currently stepping
    pub fn is_enabled(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.world.lock().is_some()
    }

    /// Stop the worker (waiting for an in-flight step) and release the world
    ///
    /// Safe to call more than once. Every later call on this handle returns
    /// [`PhysicsError::NotInitialized`].
    pub fn close(&self) {
        self.shared.running.store(false, Ordering::Release);

        if let Some(handle) = self.worker.lock().take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                log::error!("Physics worker thread panicked");
            }
        }

        if self.shared.world.lock().take().is_some() {
            log::info!("Physics closed");
        }
    }

    // === Stepping ===

    /// Step using the wall-clock time since the previous call
    ///
    /// Returns the number of fixed steps taken. Does nothing while the
    /// autonomous worker owns stepping.
    pub fn run_step(&self) -> Result<u32> {
        let now = Instant::now();
        let elapsed = {
            let mut last = self.last_frame.lock();
            let elapsed = now.duration_since(*last);
            *last = now;
            elapsed
        };
        self.advance(elapsed)
    }

    /// Step using a caller-measured frame time
    pub fn advance(&self, elapsed: Duration) -> Result<u32> {
        let running = self.is_enabled();
        self.with_world_mut(|world| {
            if running {
                return 0;
            }
            sim::advance(world, elapsed.as_secs_f32())
        })
    }

    /// Exactly one fixed step, ignoring the accumulator
    pub fn step(&self) -> Result<()> {
        let running = self.is_enabled();
        self.with_world_mut(|world| {
            if !running {
                sim::step(world);
            }
        })
    }

    pub fn steps_count(&self) -> Result<u64> {
        self.with_world(World::steps_count)
    }

    // === Global state ===

    /// Drop every body and manifold; gravity and settings survive
    pub fn reset(&self) -> Result<()> {
        self.with_world_mut(World::reset)?;
        log::info!("Physics reset");
        Ok(())
    }

    pub fn set_gravity(&self, x: f32, y: f32) -> Result<()> {
        self.with_world_mut(|world| world.set_gravity(x, y))
    }

    pub fn gravity(&self) -> Result<Vec2> {
        self.with_world(World::gravity)
    }

    pub fn settings(&self) -> Result<PhysicsSettings> {
        self.with_world(|world| world.settings().clone())
    }

    // === Bodies ===

    pub fn create_circle(&self, pos: Vec2, radius: f32, density: f32) -> Result<BodyHandle> {
        self.with_world_mut(|world| world.create_circle(pos, radius, density))?
    }

    pub fn create_rectangle(
        &self,
        pos: Vec2,
        width: f32,
        height: f32,
        density: f32,
    ) -> Result<BodyHandle> {
        self.with_world_mut(|world| world.create_rectangle(pos, width, height, density))?
    }

    pub fn create_polygon(
        &self,
        pos: Vec2,
        radius: f32,
        sides: usize,
        density: f32,
    ) -> Result<BodyHandle> {
        self.with_world_mut(|world| world.create_polygon(pos, radius, sides, density))?
    }

    pub fn destroy(&self, handle: BodyHandle) -> Result<()> {
        self.with_world_mut(|world| world.destroy(handle).map(drop))?
    }

    pub fn add_force(&self, handle: BodyHandle, force: Vec2) -> Result<()> {
        self.with_world_mut(|world| world.add_force(handle, force))?
    }

    pub fn add_torque(&self, handle: BodyHandle, amount: f32) -> Result<()> {
        self.with_world_mut(|world| world.add_torque(handle, amount))?
    }

    pub fn set_rotation(&self, handle: BodyHandle, radians: f32) -> Result<()> {
        self.with_world_mut(|world| world.set_rotation(handle, radians))?
    }

    pub fn shatter(
        &self,
        handle: BodyHandle,
        position: Vec2,
        force: f32,
    ) -> Result<Vec<BodyHandle>> {
        self.with_world_mut(|world| world.shatter(handle, position, force))?
    }

    /// Mutate one body under the world lock
    pub fn update_body<R>(&self, handle: BodyHandle, f: impl FnOnce(&mut Body) -> R) -> Result<R> {
        self.with_world_mut(|world| world.update_body(handle, f))?
    }

    // === Queries ===

    /// Copy of a body's current state
    pub fn body(&self, handle: BodyHandle) -> Result<Body> {
        self.with_world(|world| world.body(handle).cloned())?
    }

    pub fn count(&self) -> Result<usize> {
        self.with_world(World::count)
    }

    /// Copy of the `index`-th body in creation order
    pub fn get(&self, index: usize) -> Result<Body> {
        self.with_world(|world| world.get(index).cloned())?
    }

    pub fn handle_at(&self, index: usize) -> Result<BodyHandle> {
        self.with_world(|world| world.handle_at(index))?
    }

    pub fn shape_type(&self, index: usize) -> Result<ShapeType> {
        self.with_world(|world| world.shape_type(index))?
    }

    pub fn shape_vertex_count(&self, index: usize) -> Result<usize> {
        self.with_world(|world| world.shape_vertex_count(index))?
    }

    pub fn shape_vertex(&self, handle: BodyHandle, vertex: usize) -> Result<Vec2> {
        self.with_world(|world| world.shape_vertex(handle, vertex))?
    }

    /// Consistent copy of every body, in creation order
    pub fn snapshot(&self) -> Result<Vec<(BodyHandle, Body)>> {
        self.with_world(World::snapshot)
    }

    /// Manifolds from the most recent step
    pub fn manifolds(&self) -> Result<Vec<Manifold>> {
        self.with_world(|world| world.manifolds().to_vec())
    }

    /// Run `f` against the world under the lock
    pub fn with_world<R>(&self, f: impl FnOnce(&World) -> R) -> Result<R> {
        let guard = self.shared.world.lock();
        let world = guard.as_ref().ok_or(PhysicsError::NotInitialized)?;
        Ok(f(world))
    }

    pub fn with_world_mut<R>(&self, f: impl FnOnce(&mut World) -> R) -> Result<R> {
        let mut guard = self.shared.world.lock();
        let world = guard.as_mut().ok_or(PhysicsError::NotInitialized)?;
        Ok(f(world))
    }
}

impl Drop for Physics {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Physics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Physics")
            .field("mode", &self.mode)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

/// Autonomous loop: step, then sleep for one timestep or until woken by `close`
fn run_worker(shared: &Shared, dt: Duration) {
    log::debug!("Physics worker started");
    let mut last = Instant::now();

    while shared.running.load(Ordering::Acquire) {
        let now = Instant::now();
        let elapsed = now.duration_since(last);
        last = now;

        {
            let mut guard = shared.world.lock();
            let Some(world) = guard.as_mut() else {
                break;
            };
            sim::advance(world, elapsed.as_secs_f32());
        }

        thread::park_timeout(dt);
    }

    log::debug!("Physics worker stopped");
}

//! Rigid bodies and their handles

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::shape::{MassData, Shape, ShapeType};
use crate::consts::*;

/// Generation-tagged reference into the body pool
///
/// A handle stays valid until its body is destroyed; afterwards the slot's
/// generation moves on and the handle is rejected as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyHandle {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl BodyHandle {
    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}v{}", self.slot, self.generation)
    }
}

/// A rigid body
///
/// Orientation, mass and inertia are only reachable through methods so the
/// shape transform and the inverse values stay consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Unique among live bodies
    pub id: u32,
    /// Enabled dynamics state (collisions are still detected when disabled)
    pub enabled: bool,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Accumulated force, cleared after every step
    pub force: Vec2,
    pub angular_velocity: f32,
    /// Accumulated torque, cleared after every step
    pub torque: f32,
    orient: f32,
    inertia: f32,
    inverse_inertia: f32,
    mass: f32,
    inverse_mass: f32,
    /// Friction while at rest (0 to 1)
    pub static_friction: f32,
    /// Friction while sliding (0 to 1)
    pub dynamic_friction: f32,
    /// Bounciness (0 to 1)
    pub restitution: f32,
    pub use_gravity: bool,
    /// Resting on another body (updated every step)
    pub is_grounded: bool,
    /// Rotation constraint
    pub freeze_orient: bool,
    shape: Shape,
}

impl Body {
    pub(crate) fn new(id: u32, position: Vec2, shape: Shape, mass: MassData) -> Self {
        let mut body = Self {
            id,
            enabled: true,
            position,
            velocity: Vec2::ZERO,
            force: Vec2::ZERO,
            angular_velocity: 0.0,
            torque: 0.0,
            orient: 0.0,
            inertia: 0.0,
            inverse_inertia: 0.0,
            mass: 0.0,
            inverse_mass: 0.0,
            static_friction: DEFAULT_STATIC_FRICTION,
            dynamic_friction: DEFAULT_DYNAMIC_FRICTION,
            restitution: DEFAULT_RESTITUTION,
            use_gravity: true,
            is_grounded: false,
            freeze_orient: false,
            shape,
        };
        body.set_mass(mass.mass);
        body.set_inertia(mass.inertia);
        body
    }

    /// Rotation in radians
    #[inline]
    pub fn orient(&self) -> f32 {
        self.orient
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    #[inline]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    #[inline]
    pub fn inverse_inertia(&self) -> f32 {
        self.inverse_inertia
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_type(&self) -> ShapeType {
        self.shape.shape_type()
    }

    /// Set mass; a mass without a finite positive inverse makes the body
    /// immovable (mass and inverse mass 0)
    pub fn set_mass(&mut self, mass: f32) {
        (self.mass, self.inverse_mass) = with_inverse(mass);
    }

    /// Set moment of inertia; same rule as [`Body::set_mass`]
    pub fn set_inertia(&mut self, inertia: f32) {
        (self.inertia, self.inverse_inertia) = with_inverse(inertia);
    }

    /// Turn the body into a static (infinite mass) body
    pub fn make_static(&mut self) {
        self.set_mass(0.0);
        self.set_inertia(0.0);
        self.velocity = Vec2::ZERO;
        self.angular_velocity = 0.0;
    }

    /// Whether nothing (force, gravity, impulse) can move this body
    #[inline]
    pub fn is_static(&self) -> bool {
        self.inverse_mass == 0.0 && self.inverse_inertia == 0.0
    }

    /// Set orientation and refresh the shape transform
    pub fn set_rotation(&mut self, radians: f32) {
        self.orient = radians;
        self.shape.set_orientation(radians);
    }

    pub fn add_force(&mut self, force: Vec2) {
        self.force += force;
    }

    pub fn add_torque(&mut self, amount: f32) {
        self.torque += amount;
    }

    /// Shape vertex `i` in world space
    pub fn shape_vertex(&self, i: usize) -> Option<Vec2> {
        self.shape.vertex_offset(i).map(|offset| self.position + offset)
    }

    /// Whether a world-space point lies inside the body's shape
    pub fn contains_point(&self, point: Vec2) -> bool {
        self.shape.contains_offset(point - self.position)
    }

    /// Inverse mass as seen by the solver (disabled bodies are immovable)
    #[inline]
    pub(crate) fn effective_inverse_mass(&self) -> f32 {
        if self.enabled { self.inverse_mass } else { 0.0 }
    }

    /// Inverse inertia as seen by the solver
    #[inline]
    pub(crate) fn effective_inverse_inertia(&self) -> f32 {
        if self.enabled && !self.freeze_orient {
            self.inverse_inertia
        } else {
            0.0
        }
    }

    /// Semi-implicit Euler, first half: forces into velocities
    pub(crate) fn integrate_forces(&mut self, gravity: Vec2, dt: f32) {
        if self.inverse_mass == 0.0 || !self.enabled {
            return;
        }

        self.velocity += self.force * self.inverse_mass * dt;
        if self.use_gravity {
            self.velocity += gravity * dt;
        }

        if !self.freeze_orient {
            self.angular_velocity += self.torque * self.inverse_inertia * dt;
        }
    }

    /// Semi-implicit Euler, second half: velocities into position/orientation
    pub(crate) fn integrate_velocity(&mut self, dt: f32) {
        if !self.enabled {
            return;
        }

        self.position += self.velocity * dt;
        if !self.freeze_orient {
            self.set_rotation(self.orient + self.angular_velocity * dt);
        }
    }

    pub(crate) fn clear_forces(&mut self) {
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }
}

/// `(value, 1 / value)`, or `(0, 0)` unless both are finite and positive
fn with_inverse(value: f32) -> (f32, f32) {
    let inverse = 1.0 / value;
    if value.is_finite() && value > 0.0 && inverse.is_finite() {
        (value, inverse)
    } else {
        (0.0, 0.0)
    }
}

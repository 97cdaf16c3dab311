//! Physac - a small 2D rigid-body physics engine
//!
//! Core modules:
//! - `sim`: Deterministic simulation (shapes, bodies, collisions, solver, fixed step)
//! - `scheduler`: `Physics` handle driving the world manually or from a worker thread
//! - `api`: Process-wide free functions over a single `Physics` instance
//! - `settings`: Serializable engine configuration
//! - `error`: Error taxonomy shared by every fallible operation

pub mod api;
pub mod error;
pub mod scheduler;
pub mod settings;
pub mod sim;

pub use error::{PhysicsError, Result};
pub use scheduler::{Physics, StepMode};
pub use settings::PhysicsSettings;
pub use sim::{Body, BodyHandle, Shape, ShapeKind, ShapeType, World};

use glam::{Mat2, Vec2};

/// Engine configuration constants
pub mod consts {
    use glam::Vec2;

    /// Body pool capacity
    pub const MAX_BODIES: usize = 64;
    /// Manifold pool capacity per step
    pub const MAX_MANIFOLDS: usize = 4096;
    /// Maximum vertices (and normals) of a polygon shape
    pub const MAX_VERTICES: usize = 24;
    /// Vertices reported for a circle when drawing it as a polygon
    pub const CIRCLE_VERTICES: usize = 24;

    /// Fixed simulation timestep (60 Hz)
    pub const DESIRED_DELTA_TIME: f32 = 1.0 / 60.0;
    /// Largest frame time simulated per call, to prevent spiral of death
    pub const MAX_TIMESTEP: f32 = 0.02;
    /// Sequential impulse passes per step
    pub const COLLISION_ITERATIONS: u32 = 100;
    /// Penetration depth left uncorrected to avoid jitter
    pub const PENETRATION_ALLOWANCE: f32 = 0.05;
    /// Fraction of the remaining penetration corrected each step
    pub const PENETRATION_CORRECTION: f32 = 0.4;

    /// Default gravity (screen space, +y is down)
    pub const DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, 9.81);

    /// Material defaults for newly created bodies
    pub const DEFAULT_STATIC_FRICTION: f32 = 0.4;
    pub const DEFAULT_DYNAMIC_FRICTION: f32 = 0.2;
    pub const DEFAULT_RESTITUTION: f32 = 0.0;

    /// A contact normal must point this far "up" to ground the body resting on it
    pub const GROUNDED_NORMAL_THRESHOLD: f32 = 0.5;
}

/// 2D cross product of two vectors (z component of the 3D cross)
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Cross product of a scalar (angular velocity around z) with a vector
#[inline]
pub fn cross_scalar(w: f32, v: Vec2) -> Vec2 {
    Vec2::new(-w * v.y, w * v.x)
}

/// Rotation matrix for the given angle in radians
#[inline]
pub fn rotation(radians: f32) -> Mat2 {
    Mat2::from_angle(radians)
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Barycenter of the triangle (a, b, c)
#[inline]
pub fn triangle_barycenter(a: Vec2, b: Vec2, c: Vec2) -> Vec2 {
    (a + b + c) / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_cross_products() {
        assert_eq!(cross(Vec2::X, Vec2::Y), 1.0);
        assert_eq!(cross(Vec2::Y, Vec2::X), -1.0);
        // w x r is perpendicular to r
        let v = cross_scalar(2.0, Vec2::new(1.0, 0.0));
        assert!((v - Vec2::new(0.0, 2.0)).length() < 1e-6);
    }

    #[test]
    fn test_rotation_matches_sin_cos() {
        let m = rotation(FRAC_PI_2);
        let v = m * Vec2::X;
        assert!((v - Vec2::Y).length() < 1e-6);
        // Transpose undoes the rotation
        let back = m.transpose() * v;
        assert!((back - Vec2::X).length() < 1e-6);
    }

    #[test]
    fn test_barycenter() {
        let c = triangle_barycenter(Vec2::ZERO, Vec2::new(3.0, 0.0), Vec2::new(0.0, 3.0));
        assert!((c - Vec2::new(1.0, 1.0)).length() < 1e-6);
    }
}

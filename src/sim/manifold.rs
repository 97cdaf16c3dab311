//! Collision manifolds and impulse resolution
//!
//! Manifolds live for a single step. Material values of the two bodies are
//! mixed with the geometric mean `sqrt(a * b)`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{Body, BodyHandle};
use super::collision::Contact;
use crate::{cross, cross_scalar};

/// One collision between two bodies during one step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Manifold {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Depth of penetration from collision
    pub penetration: f32,
    /// Normal direction from `body_a` to `body_b`
    pub normal: Vec2,
    pub contacts: [Vec2; 2],
    pub contact_count: usize,
    /// Mixed restitution during collision
    pub restitution: f32,
    /// Mixed dynamic friction during collision
    pub dynamic_friction: f32,
    /// Mixed static friction during collision
    pub static_friction: f32,
}

/// Geometric mean used to combine two material coefficients
#[inline]
pub fn mix(a: f32, b: f32) -> f32 {
    (a * b).sqrt()
}

impl Manifold {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, contact: Contact) -> Self {
        Self {
            body_a,
            body_b,
            penetration: contact.penetration,
            normal: contact.normal,
            contacts: contact.points,
            contact_count: contact.point_count,
            restitution: 0.0,
            dynamic_friction: 0.0,
            static_friction: 0.0,
        }
    }

    pub fn contacts(&self) -> &[Vec2] {
        &self.contacts[..self.contact_count]
    }

    /// Mix materials and drop restitution for resting contacts
    ///
    /// A contact is resting when its relative speed is no more than what one
    /// step of gravity produces; bouncing it would make stacks jitter.
    pub(crate) fn initialize(&mut self, a: &Body, b: &Body, gravity: Vec2, dt: f32) {
        self.restitution = mix(a.restitution, b.restitution);
        self.static_friction = mix(a.static_friction, b.static_friction);
        self.dynamic_friction = mix(a.dynamic_friction, b.dynamic_friction);

        let resting_sq = (gravity * dt).length_squared() + f32::EPSILON;
        let resting = self.contacts().iter().any(|&contact| {
            let ra = contact - a.position;
            let rb = contact - b.position;
            relative_velocity(a, b, ra, rb).length_squared() < resting_sq
        });
        if resting {
            self.restitution = 0.0;
        }
    }

    /// One sequential-impulse pass: normal impulse then Coulomb friction per contact
    pub(crate) fn apply_impulse(&self, a: &mut Body, b: &mut Body) {
        let inv_mass_a = a.effective_inverse_mass();
        let inv_inertia_a = a.effective_inverse_inertia();
        let inv_mass_b = b.effective_inverse_mass();
        let inv_inertia_b = b.effective_inverse_inertia();

        if inv_mass_a + inv_mass_b <= f32::EPSILON {
            return;
        }

        let count = self.contact_count as f32;
        for &contact in self.contacts() {
            let ra = contact - a.position;
            let rb = contact - b.position;

            let rv = relative_velocity(a, b, ra, rb);
            let contact_velocity = rv.dot(self.normal);

            // Already separating
            if contact_velocity > 0.0 {
                continue;
            }

            let ra_cross_n = cross(ra, self.normal);
            let rb_cross_n = cross(rb, self.normal);
            let inverse_mass_sum = inv_mass_a
                + inv_mass_b
                + ra_cross_n * ra_cross_n * inv_inertia_a
                + rb_cross_n * rb_cross_n * inv_inertia_b;

            let impulse = -(1.0 + self.restitution) * contact_velocity / inverse_mass_sum / count;
            let impulse_v = self.normal * impulse;
            apply(a, b, ra, rb, impulse_v);

            // Friction along the contact tangent
            let rv = relative_velocity(a, b, ra, rb);
            let tangent = (rv - self.normal * rv.dot(self.normal)).normalize_or_zero();
            let impulse_tangent = -rv.dot(tangent) / inverse_mass_sum / count;

            if impulse_tangent.abs() <= f32::EPSILON {
                continue;
            }

            // Coulomb's law
            let tangent_impulse = if impulse_tangent.abs() < impulse * self.static_friction {
                tangent * impulse_tangent
            } else {
                tangent * (-impulse * self.dynamic_friction)
            };
            apply(a, b, ra, rb, tangent_impulse);
        }
    }

    /// Push overlapping bodies apart along the normal, split by inverse mass
    pub(crate) fn correct_positions(
        &self,
        a: &mut Body,
        b: &mut Body,
        allowance: f32,
        factor: f32,
    ) {
        let inv_mass_a = a.effective_inverse_mass();
        let inv_mass_b = b.effective_inverse_mass();
        let inv_mass_sum = inv_mass_a + inv_mass_b;
        if inv_mass_sum <= 0.0 {
            return;
        }

        let correction =
            self.normal * ((self.penetration - allowance).max(0.0) / inv_mass_sum * factor);
        a.position -= correction * inv_mass_a;
        b.position += correction * inv_mass_b;
    }
}

/// Velocity of `b`'s contact point relative to `a`'s
#[inline]
fn relative_velocity(a: &Body, b: &Body, ra: Vec2, rb: Vec2) -> Vec2 {
    let va = a.velocity + cross_scalar(a.angular_velocity, ra);
    let vb = b.velocity + cross_scalar(b.angular_velocity, rb);
    vb - va
}

/// Apply an impulse to `b` and its opposite to `a`
#[inline]
fn apply(a: &mut Body, b: &mut Body, ra: Vec2, rb: Vec2, impulse: Vec2) {
    a.velocity -= impulse * a.effective_inverse_mass();
    a.angular_velocity -= a.effective_inverse_inertia() * cross(ra, impulse);
    b.velocity += impulse * b.effective_inverse_mass();
    b.angular_velocity += b.effective_inverse_inertia() * cross(rb, impulse);
}

/// Fixed-capacity manifold storage, cleared at the start of every step
#[derive(Debug, Clone)]
pub struct ManifoldPool {
    manifolds: Vec<Manifold>,
    capacity: usize,
    dropped: usize,
}

impl ManifoldPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            manifolds: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn clear(&mut self) {
        self.manifolds.clear();
        self.dropped = 0;
    }

    /// Store a manifold; returns false (and counts it) when the pool is full
    pub fn push(&mut self, manifold: Manifold) -> bool {
        if self.manifolds.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.manifolds.push(manifold);
        true
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&Manifold) -> bool) {
        self.manifolds.retain(keep);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.manifolds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.manifolds.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Manifolds dropped during the last step because the pool was full
    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn as_slice(&self) -> &[Manifold] {
        &self.manifolds
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Manifold] {
        &mut self.manifolds
    }
}

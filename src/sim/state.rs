//! World state: body pool, manifold pool and global simulation values
//!
//! Bodies live in a fixed number of slots. Each slot carries a generation
//! counter that moves on when its body is destroyed, so handles to destroyed
//! bodies are rejected instead of aliasing a reused slot. Index-based queries
//! walk bodies in creation order; destroying a body compacts that order.

use glam::Vec2;

use super::body::{Body, BodyHandle};
use super::manifold::{Manifold, ManifoldPool};
use super::shape::{MassData, PolygonData, Shape, ShapeType};
use crate::error::{PhysicsError, Result};
use crate::settings::PhysicsSettings;
use crate::triangle_barycenter;

/// Fragments are shrunk by this factor so they don't start out overlapping
const SHATTER_SHRINK: f32 = 0.95;

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    body: Option<Body>,
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct World {
    settings: PhysicsSettings,
    gravity: Vec2,
    slots: Vec<Slot>,
    /// Occupied slots in creation order
    order: Vec<u32>,
    pub(crate) manifolds: ManifoldPool,
    /// Unsimulated time carried between `advance` calls (seconds)
    pub(crate) accumulator: f32,
    pub(crate) steps_count: u64,
}

impl World {
    pub fn new(settings: PhysicsSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            gravity: settings.gravity,
            slots: vec![Slot::default(); settings.max_bodies],
            order: Vec::with_capacity(settings.max_bodies),
            manifolds: ManifoldPool::new(settings.max_manifolds),
            accumulator: 0.0,
            steps_count: 0,
            settings,
        })
    }

    #[inline]
    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    #[inline]
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn set_gravity(&mut self, x: f32, y: f32) {
        self.gravity = Vec2::new(x, y);
    }

    /// Fixed steps run since creation or the last reset
    #[inline]
    pub fn steps_count(&self) -> u64 {
        self.steps_count
    }

    /// Manifolds produced by the last step
    pub fn manifolds(&self) -> &[Manifold] {
        self.manifolds.as_slice()
    }

    // === Creation ===

    pub fn create_circle(&mut self, pos: Vec2, radius: f32, density: f32) -> Result<BodyHandle> {
        let mass = MassData::circle(radius, density)?;
        let handle = self.insert(|id| Body::new(id, pos, Shape::circle(radius), mass))?;
        log::debug!("Created circle body {} (r={}) at {}", handle, radius, pos);
        Ok(handle)
    }

    pub fn create_rectangle(
        &mut self,
        pos: Vec2,
        width: f32,
        height: f32,
        density: f32,
    ) -> Result<BodyHandle> {
        let mut data = PolygonData::rectangle(width, height)?;
        let mass = MassData::polygon(&mut data, density)?;
        let handle = self.insert(|id| Body::new(id, pos, Shape::polygon(data), mass))?;
        log::debug!("Created rectangle body {} ({}x{}) at {}", handle, width, height, pos);
        Ok(handle)
    }

    /// Regular polygon with `sides` vertices inscribed in `radius`
    pub fn create_polygon(
        &mut self,
        pos: Vec2,
        radius: f32,
        sides: usize,
        density: f32,
    ) -> Result<BodyHandle> {
        let mut data = PolygonData::regular(radius, sides)?;
        let mass = MassData::polygon(&mut data, density)?;
        let handle = self.insert(|id| Body::new(id, pos, Shape::polygon(data), mass))?;
        log::debug!("Created {}-gon body {} at {}", sides, handle, pos);
        Ok(handle)
    }

    /// Place a body in the first free slot; the slot index doubles as the body id
    fn insert(&mut self, make: impl FnOnce(u32) -> Body) -> Result<BodyHandle> {
        let Some(slot) = self.slots.iter().position(|s| s.body.is_none()) else {
            log::debug!("Body creation rejected: pool is full");
            return Err(PhysicsError::CapacityExceeded {
                what: "body",
                capacity: self.slots.len(),
            });
        };

        let slot = slot as u32;
        let entry = &mut self.slots[slot as usize];
        entry.body = Some(make(slot));
        self.order.push(slot);

        Ok(BodyHandle {
            slot,
            generation: entry.generation,
        })
    }

    // === Lifecycle ===

    /// Remove a body; its handle (and any copy of it) becomes stale
    pub fn destroy(&mut self, handle: BodyHandle) -> Result<Body> {
        self.body(handle)?;

        let slot = &mut self.slots[handle.slot()];
        let body = slot.body.take().ok_or(PhysicsError::InvalidHandle(handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.order.retain(|&s| s != handle.slot);
        self.manifolds
            .retain(|m| m.body_a != handle && m.body_b != handle);

        log::debug!("Destroyed body {}", handle);
        Ok(body)
    }

    /// Drop every body and manifold; gravity and settings are kept
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            if slot.body.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.order.clear();
        self.manifolds.clear();
        self.accumulator = 0.0;
        self.steps_count = 0;
    }

    // === Handle access ===

    pub fn is_valid(&self, handle: BodyHandle) -> bool {
        self.body(handle).is_ok()
    }

    pub fn body(&self, handle: BodyHandle) -> Result<&Body> {
        self.slots
            .get(handle.slot())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_ref())
            .ok_or(PhysicsError::InvalidHandle(handle))
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body> {
        self.slots
            .get_mut(handle.slot())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_mut())
            .ok_or(PhysicsError::InvalidHandle(handle))
    }

    /// Mutate a body in place (flags, velocity, material...)
    pub fn update_body<R>(
        &mut self,
        handle: BodyHandle,
        f: impl FnOnce(&mut Body) -> R,
    ) -> Result<R> {
        Ok(f(self.body_mut(handle)?))
    }

    pub fn add_force(&mut self, handle: BodyHandle, force: Vec2) -> Result<()> {
        self.body_mut(handle)?.add_force(force);
        Ok(())
    }

    pub fn add_torque(&mut self, handle: BodyHandle, amount: f32) -> Result<()> {
        self.body_mut(handle)?.add_torque(amount);
        Ok(())
    }

    pub fn set_rotation(&mut self, handle: BodyHandle, radians: f32) -> Result<()> {
        self.body_mut(handle)?.set_rotation(radians);
        Ok(())
    }

    // === Index queries (creation order) ===

    #[inline]
    pub fn count(&self) -> usize {
        self.order.len()
    }

    pub fn handle_at(&self, index: usize) -> Result<BodyHandle> {
        let slot = *self.order.get(index).ok_or(PhysicsError::IndexOutOfRange {
            index,
            count: self.order.len(),
        })?;
        Ok(BodyHandle {
            slot,
            generation: self.slots[slot as usize].generation,
        })
    }

    pub fn get(&self, index: usize) -> Result<&Body> {
        self.body(self.handle_at(index)?)
    }

    pub fn shape_type(&self, index: usize) -> Result<ShapeType> {
        Ok(self.get(index)?.shape_type())
    }

    pub fn shape_vertex_count(&self, index: usize) -> Result<usize> {
        Ok(self.get(index)?.shape().vertex_count())
    }

    /// World-space position of one of a body's shape vertices
    pub fn shape_vertex(&self, handle: BodyHandle, vertex: usize) -> Result<Vec2> {
        let body = self.body(handle)?;
        body.shape_vertex(vertex).ok_or(PhysicsError::IndexOutOfRange {
            index: vertex,
            count: body.shape().vertex_count(),
        })
    }

    /// Live bodies with their handles, in creation order
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> + '_ {
        self.order.iter().filter_map(move |&slot| {
            let entry = &self.slots[slot as usize];
            entry.body.as_ref().map(|body| {
                (
                    BodyHandle {
                        slot,
                        generation: entry.generation,
                    },
                    body,
                )
            })
        })
    }

    /// Owned copy of every body, in creation order
    pub fn snapshot(&self) -> Vec<(BodyHandle, Body)> {
        self.bodies().map(|(handle, body)| (handle, body.clone())).collect()
    }

    // === Shatter ===

    /// Split a polygon body into triangles fanning out from `position`
    ///
    /// Each fragment keeps the parent's material, orientation and velocity and
    /// receives `force` pointing away from `position`. Circles and points
    /// outside the body leave the world untouched and return no fragments.
    pub fn shatter(
        &mut self,
        handle: BodyHandle,
        position: Vec2,
        force: f32,
    ) -> Result<Vec<BodyHandle>> {
        let parent = self.body(handle)?.clone();
        let Some(poly) = parent.shape().polygon_data() else {
            return Ok(Vec::new());
        };
        if !parent.contains_point(position) {
            return Ok(Vec::new());
        }

        let transform = parent.shape().transform();
        let local_point = transform.transpose() * (position - parent.position);
        let density = if parent.mass() > 0.0 {
            let mut copy = *poly;
            parent.mass() / MassData::polygon(&mut copy, 1.0)?.mass
        } else {
            1.0
        };

        // Build every fragment before touching the pool
        let mut fragments = Vec::with_capacity(poly.vertex_count());
        for i in 0..poly.vertex_count() {
            let (v1, v2) = poly.face(i);
            let center = triangle_barycenter(v1, v2, local_point);
            let triangle = [v1 - center, v2 - center, local_point - center];
            let Ok(mut data) = PolygonData::from_vertices(&triangle) else {
                continue;
            };
            data.scale(SHATTER_SHRINK);
            let Ok(mass) = MassData::polygon(&mut data, density) else {
                continue;
            };
            fragments.push((parent.position + transform * center, data, mass));
        }

        let capacity = self.slots.len();
        if self.count() - 1 + fragments.len() > capacity {
            return Err(PhysicsError::CapacityExceeded {
                what: "body",
                capacity,
            });
        }

        self.destroy(handle)?;

        let mut handles = Vec::with_capacity(fragments.len());
        for (center, data, mass) in fragments {
            let fragment = self.insert(|id| {
                let mut body = Body::new(id, center, Shape::polygon(data), mass);
                body.set_rotation(parent.orient());
                body.enabled = parent.enabled;
                body.velocity = parent.velocity;
                body.angular_velocity = parent.angular_velocity;
                body.static_friction = parent.static_friction;
                body.dynamic_friction = parent.dynamic_friction;
                body.restitution = parent.restitution;
                body.use_gravity = parent.use_gravity;
                body.freeze_orient = parent.freeze_orient;
                body.add_force((center - position).normalize_or_zero() * force);
                body
            })?;
            handles.push(fragment);
        }

        log::debug!(
            "Shattered body {} into {} fragments at {}",
            handle,
            handles.len(),
            position
        );
        Ok(handles)
    }

    // === Stepper access ===

    /// Occupied slot indices in creation order
    pub(crate) fn order(&self) -> &[u32] {
        &self.order
    }

    pub(crate) fn body_at_slot(&self, slot: u32) -> Option<&Body> {
        self.slots.get(slot as usize).and_then(|s| s.body.as_ref())
    }

    pub(crate) fn handle_for_slot(&self, slot: u32) -> BodyHandle {
        BodyHandle {
            slot,
            generation: self.slots[slot as usize].generation,
        }
    }

    pub(crate) fn bodies_mut(&mut self) -> impl Iterator<Item = &mut Body> + '_ {
        self.slots.iter_mut().filter_map(|s| s.body.as_mut())
    }

    /// Two distinct bodies borrowed mutably at once
    pub(crate) fn pair_mut(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
    ) -> Option<(&mut Body, &mut Body)> {
        let (ia, ib) = (a.slot(), b.slot());
        if ia == ib || ia >= self.slots.len() || ib >= self.slots.len() {
            return None;
        }

        let (first, second) = if ia < ib {
            let (lo, hi) = self.slots.split_at_mut(ib);
            (&mut lo[ia], &mut hi[0])
        } else {
            let (lo, hi) = self.slots.split_at_mut(ia);
            (&mut hi[0], &mut lo[ib])
        };

        if first.generation != a.generation || second.generation != b.generation {
            return None;
        }
        Some((first.body.as_mut()?, second.body.as_mut()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MAX_BODIES;

    fn world() -> World {
        World::new(PhysicsSettings::default()).unwrap()
    }

    #[test]
    fn test_create_and_query() {
        let mut world = world();
        let a = world.create_circle(Vec2::new(1.0, 2.0), 1.0, 1.0).unwrap();
        let b = world.create_rectangle(Vec2::ZERO, 2.0, 1.0, 1.0).unwrap();
        let c = world.create_polygon(Vec2::ZERO, 1.0, 5, 1.0).unwrap();

        assert_eq!(world.count(), 3);
        assert_eq!(world.shape_type(0).unwrap(), ShapeType::Circle);
        assert_eq!(world.shape_type(1).unwrap(), ShapeType::Polygon);
        assert_eq!(world.shape_vertex_count(1).unwrap(), 4);
        assert_eq!(world.shape_vertex_count(2).unwrap(), 5);
        assert_eq!(world.get(0).unwrap().position, Vec2::new(1.0, 2.0));
        assert!(world.is_valid(a) && world.is_valid(b) && world.is_valid(c));

        let ids: Vec<u32> = world.bodies().map(|(_, body)| body.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_invalid_parameters_leave_pool_unchanged() {
        let mut world = world();
        assert!(matches!(
            world.create_circle(Vec2::ZERO, -1.0, 1.0),
            Err(PhysicsError::InvalidShapeParameters(_))
        ));
        assert!(world.create_rectangle(Vec2::ZERO, 1.0, 1.0, 0.0).is_err());
        assert!(world.create_polygon(Vec2::ZERO, 1.0, 2, 1.0).is_err());
        assert_eq!(world.count(), 0);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut world = world();
        for i in 0..MAX_BODIES {
            world.create_circle(Vec2::new(i as f32 * 3.0, 0.0), 1.0, 1.0).unwrap();
        }
        let err = world.create_circle(Vec2::ZERO, 1.0, 1.0).unwrap_err();
        assert!(matches!(err, PhysicsError::CapacityExceeded { capacity: MAX_BODIES, .. }));
        assert_eq!(world.count(), MAX_BODIES);
    }

    #[test]
    fn test_unusable_mass_rejected_at_creation() {
        let mut world = world();
        assert!(matches!(
            world.create_circle(Vec2::ZERO, 1.0, 1e-40),
            Err(PhysicsError::InvalidShapeParameters(_))
        ));
        assert!(matches!(
            world.create_polygon(Vec2::ZERO, 1e30, 5, 1.0),
            Err(PhysicsError::InvalidShapeParameters(_))
        ));
        assert!(world.create_rectangle(Vec2::ZERO, 1e25, 1e25, 1.0).is_err());
        assert_eq!(world.count(), 0);

        let h = world.create_circle(Vec2::ZERO, 1.0, 1.0).unwrap();
        crate::sim::step(&mut world);
        let body = world.body(h).unwrap();
        assert!(body.inverse_mass().is_finite() && body.position.is_finite());
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let mut world = world();
        let first = world.create_circle(Vec2::ZERO, 1.0, 1.0).unwrap();
        world.destroy(first).unwrap();
        let second = world.create_circle(Vec2::ONE, 1.0, 1.0).unwrap();

        // Same slot, new generation
        assert_eq!(first.slot(), second.slot());
        assert_ne!(first, second);
        assert!(matches!(world.body(first), Err(PhysicsError::InvalidHandle(_))));
        assert!(world.add_force(first, Vec2::X).is_err());
        assert!(world.destroy(first).is_err());
        assert_eq!(world.body(second).unwrap().position, Vec2::ONE);
    }

    #[test]
    fn test_destroy_compacts_index_order() {
        let mut world = world();
        let a = world.create_circle(Vec2::new(0.0, 0.0), 1.0, 1.0).unwrap();
        let _b = world.create_circle(Vec2::new(5.0, 0.0), 1.0, 1.0).unwrap();
        let _c = world.create_circle(Vec2::new(10.0, 0.0), 1.0, 1.0).unwrap();
        world.destroy(a).unwrap();
        assert_eq!(world.count(), 2);
        assert_eq!(world.get(0).unwrap().position.x, 5.0);
        assert_eq!(world.get(1).unwrap().position.x, 10.0);
        assert!(matches!(
            world.get(2),
            Err(PhysicsError::IndexOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_reset_keeps_gravity() {
        let mut world = world();
        world.set_gravity(0.0, -3.0);
        let h = world.create_circle(Vec2::ZERO, 1.0, 1.0).unwrap();
        world.reset();
        assert_eq!(world.count(), 0);
        assert_eq!(world.gravity(), Vec2::new(0.0, -3.0));
        assert!(!world.is_valid(h));
    }

    #[test]
    fn test_shape_vertex_in_world_space() {
        let mut world = world();
        let h = world.create_rectangle(Vec2::new(10.0, 10.0), 2.0, 2.0, 1.0).unwrap();
        let v = world.shape_vertex(h, 0).unwrap();
        assert!((v - Vec2::new(11.0, 9.0)).length() < 1e-5);
        world.set_rotation(h, std::f32::consts::FRAC_PI_2).unwrap();
        let v = world.shape_vertex(h, 0).unwrap();
        assert!((v - Vec2::new(11.0, 11.0)).length() < 1e-5);
        assert!(world.shape_vertex(h, 4).is_err());
    }

    #[test]
    fn test_shatter_splits_polygon() {
        let mut world = world();
        let h = world.create_polygon(Vec2::new(50.0, 50.0), 10.0, 6, 2.0).unwrap();
        let parent_mass = world.body(h).unwrap().mass();

        let fragments = world.shatter(h, Vec2::new(51.0, 49.0), 100.0).unwrap();
        assert_eq!(fragments.len(), 6);
        assert!(!world.is_valid(h));
        assert_eq!(world.count(), 6);

        let total: f32 = fragments.iter().map(|&f| world.body(f).unwrap().mass()).sum();
        // Fragments are shrunk to 95%, so area scales by 0.95²
        assert!((total - parent_mass * 0.95 * 0.95).abs() / parent_mass < 1e-3);
        for &f in &fragments {
            let body = world.body(f).unwrap();
            assert_eq!(body.shape().vertex_count(), 3);
            assert!(body.force.length() > 0.0);
            // Pushed away from the shatter point
            assert!(body.force.dot(body.position - Vec2::new(51.0, 49.0)) > 0.0);
        }
    }

    #[test]
    fn test_shatter_fragments_inherit_flags() {
        let mut world = world();
        let h = world.create_polygon(Vec2::ZERO, 4.0, 5, 1.0).unwrap();
        world
            .update_body(h, |body| {
                body.freeze_orient = true;
                body.use_gravity = false;
            })
            .unwrap();

        let fragments = world.shatter(h, Vec2::new(0.5, 0.5), 10.0).unwrap();
        assert!(!fragments.is_empty());
        for &f in &fragments {
            let body = world.body(f).unwrap();
            assert!(body.freeze_orient);
            assert!(!body.use_gravity);
            assert!(body.enabled);
        }
    }

    #[test]
    fn test_shatter_outside_or_circle_is_noop() {
        let mut world = world();
        let poly = world.create_polygon(Vec2::ZERO, 1.0, 4, 1.0).unwrap();
        let ball = world.create_circle(Vec2::new(10.0, 0.0), 1.0, 1.0).unwrap();
        assert!(world.shatter(poly, Vec2::new(5.0, 5.0), 1.0).unwrap().is_empty());
        assert!(world.shatter(ball, Vec2::new(10.0, 0.0), 1.0).unwrap().is_empty());
        assert_eq!(world.count(), 2);
        assert!(world.is_valid(poly) && world.is_valid(ball));
    }

    #[test]
    fn test_shatter_rejected_when_pool_cannot_fit() {
        let settings = PhysicsSettings {
            max_bodies: 4,
            ..Default::default()
        };
        let mut world = World::new(settings).unwrap();
        let h = world.create_polygon(Vec2::ZERO, 2.0, 5, 1.0).unwrap();
        let err = world.shatter(h, Vec2::new(0.1, 0.1), 1.0).unwrap_err();
        assert!(matches!(err, PhysicsError::CapacityExceeded { .. }));
        assert!(world.is_valid(h));
        assert_eq!(world.count(), 1);
    }

    #[test]
    fn test_pair_mut_rejects_stale_and_same() {
        let mut world = world();
        let a = world.create_circle(Vec2::ZERO, 1.0, 1.0).unwrap();
        let b = world.create_circle(Vec2::new(3.0, 0.0), 1.0, 1.0).unwrap();
        assert!(world.pair_mut(a, a).is_none());
        {
            let (ba, bb) = world.pair_mut(b, a).unwrap();
            assert_eq!(ba.position.x, 3.0);
            assert_eq!(bb.position.x, 0.0);
        }
        world.destroy(b).unwrap();
        assert!(world.pair_mut(a, b).is_none());
    }
}

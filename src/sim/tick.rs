//! Fixed timestep physics step
//!
//! One call to [`step`] advances the world by exactly `desired_delta_time`.
//! [`advance`] feeds variable frame times through an accumulator.

use super::collision::collide;
use super::manifold::Manifold;
use super::state::World;
use crate::consts::GROUNDED_NORMAL_THRESHOLD;

/// Advance the world by one fixed timestep
pub fn step(world: &mut World) {
    let dt = world.settings().desired_delta_time;
    let gravity = world.gravity();

    world.manifolds.clear();

    // Forces and gravity into velocities
    for body in world.bodies_mut() {
        body.integrate_forces(gravity, dt);
    }

    detect_collisions(world);

    let count = world.manifolds.len();
    for i in 0..count {
        let mut manifold = world.manifolds.as_slice()[i];
        if let Some((a, b)) = world.pair_mut(manifold.body_a, manifold.body_b) {
            manifold.initialize(a, b, gravity, dt);
        }
        world.manifolds.as_mut_slice()[i] = manifold;
    }

    // Sequential impulses
    for _ in 0..world.settings().collision_iterations {
        for i in 0..count {
            let manifold = world.manifolds.as_slice()[i];
            if let Some((a, b)) = world.pair_mut(manifold.body_a, manifold.body_b) {
                manifold.apply_impulse(a, b);
            }
        }
    }

    for body in world.bodies_mut() {
        body.integrate_velocity(dt);
    }

    let allowance = world.settings().penetration_allowance;
    let factor = world.settings().penetration_correction;
    for i in 0..count {
        let manifold = world.manifolds.as_slice()[i];
        if let Some((a, b)) = world.pair_mut(manifold.body_a, manifold.body_b) {
            manifold.correct_positions(a, b, allowance, factor);
        }
    }

    for body in world.bodies_mut() {
        body.clear_forces();
        body.is_grounded = false;
    }

    update_grounded(world);

    world.steps_count += 1;
    log::trace!(
        "Step {}: {} bodies, {} manifolds",
        world.steps_count,
        world.count(),
        count
    );
}

/// Feed `elapsed` seconds of frame time through the accumulator
///
/// Elapsed time is clamped to `max_timestep` so a slow frame cannot trigger a
/// burst of catch-up steps. Returns the number of fixed steps taken.
pub fn advance(world: &mut World, elapsed: f32) -> u32 {
    let dt = world.settings().desired_delta_time;
    let elapsed = if elapsed.is_finite() {
        elapsed.clamp(0.0, world.settings().max_timestep)
    } else {
        0.0
    };

    world.accumulator += elapsed;
    let mut steps = 0;
    while world.accumulator >= dt {
        step(world);
        world.accumulator -= dt;
        steps += 1;
    }
    steps
}

/// Test every pair once, in creation order
fn detect_collisions(world: &mut World) {
    let order = world.order().to_vec();

    for (i, &slot_a) in order.iter().enumerate() {
        for &slot_b in &order[i + 1..] {
            let manifold = {
                let (Some(a), Some(b)) = (world.body_at_slot(slot_a), world.body_at_slot(slot_b))
                else {
                    continue;
                };
                // Two immovable bodies never need resolving
                if a.effective_inverse_mass() == 0.0 && b.effective_inverse_mass() == 0.0 {
                    continue;
                }
                let Some(contact) = collide(a, b) else {
                    continue;
                };
                Manifold::new(
                    world.handle_for_slot(slot_a),
                    world.handle_for_slot(slot_b),
                    contact,
                )
            };
            world.manifolds.push(manifold);
        }
    }

    if world.manifolds.dropped() > 0 {
        log::warn!(
            "Manifold pool full ({}), dropped {} contacts this step",
            world.manifolds.capacity(),
            world.manifolds.dropped()
        );
    }
}

/// Mark bodies resting on top of another body
///
/// Normals point from `body_a` to `body_b` and +y is down, so a normal
/// pointing down means `body_a` sits on `body_b`.
fn update_grounded(world: &mut World) {
    let count = world.manifolds.len();
    for i in 0..count {
        let manifold = world.manifolds.as_slice()[i];
        let grounded = if manifold.normal.y > GROUNDED_NORMAL_THRESHOLD {
            manifold.body_a
        } else if manifold.normal.y < -GROUNDED_NORMAL_THRESHOLD {
            manifold.body_b
        } else {
            continue;
        };
        if let Ok(body) = world.body_mut(grounded) {
            body.is_grounded = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PhysicsSettings;
    use glam::Vec2;

    fn world() -> World {
        World::new(PhysicsSettings::default()).unwrap()
    }

    #[test]
    fn test_free_fall_uses_semi_implicit_euler() {
        let mut world = world();
        let h = world.create_circle(Vec2::ZERO, 1.0, 1.0).unwrap();
        step(&mut world);
        let dt = world.settings().desired_delta_time;
        let body = world.body(h).unwrap();
        assert!((body.velocity.y - 9.81 * dt).abs() < 1e-5);
        // Position uses the updated velocity
        assert!((body.position.y - 9.81 * dt * dt).abs() < 1e-6);
        assert_eq!(world.steps_count(), 1);
    }

    #[test]
    fn test_forces_cleared_after_step() {
        let mut world = world();
        world.set_gravity(0.0, 0.0);
        let h = world.create_circle(Vec2::ZERO, 1.0, 1.0).unwrap();
        world.add_force(h, Vec2::new(100.0, 0.0)).unwrap();
        world.add_torque(h, 10.0).unwrap();
        step(&mut world);
        let body = world.body(h).unwrap();
        assert_eq!(body.force, Vec2::ZERO);
        assert_eq!(body.torque, 0.0);
        assert!(body.velocity.x > 0.0);
        assert!(body.angular_velocity > 0.0);
    }

    #[test]
    fn test_static_pair_not_collected() {
        let mut world = world();
        let a = world.create_rectangle(Vec2::ZERO, 10.0, 1.0, 1.0).unwrap();
        let b = world.create_rectangle(Vec2::new(1.0, 0.0), 10.0, 1.0, 1.0).unwrap();
        world.update_body(a, |body| body.make_static()).unwrap();
        world.update_body(b, |body| body.enabled = false).unwrap();
        step(&mut world);
        assert!(world.manifolds().is_empty());
    }

    #[test]
    fn test_box_rests_on_floor_and_is_grounded() {
        let mut world = world();
        let floor = world.create_rectangle(Vec2::new(0.0, 10.0), 20.0, 2.0, 1.0).unwrap();
        world.update_body(floor, |body| body.enabled = false).unwrap();
        let crate_box = world.create_rectangle(Vec2::new(0.0, 5.0), 1.0, 1.0, 1.0).unwrap();

        for _ in 0..300 {
            step(&mut world);
        }

        let body = world.body(crate_box).unwrap();
        assert!(body.is_grounded);
        // Floor top is y = 9, box half height 0.5
        assert!((body.position.y - 8.5).abs() < 0.1, "y = {}", body.position.y);
        assert!(body.velocity.length() < 0.5);
        assert_eq!(world.body(floor).unwrap().position, Vec2::new(0.0, 10.0));
    }

    #[test]
    fn test_step_drops_manifolds_over_capacity() {
        let settings = PhysicsSettings {
            max_manifolds: 2,
            ..Default::default()
        };
        let mut world = World::new(settings).unwrap();
        world.set_gravity(0.0, 0.0);
        // Four overlapping circles make six colliding pairs
        for i in 0..4 {
            world.create_circle(Vec2::new(i as f32 * 0.1, 0.0), 1.0, 1.0).unwrap();
        }

        step(&mut world);
        assert_eq!(world.steps_count(), 1);
        assert_eq!(world.manifolds().len(), 2);
        assert_eq!(world.manifolds.dropped(), 4);
        assert!(world.bodies().all(|(_, body)| body.position.is_finite()));

        // The pool is reused, not grown, on the next step
        step(&mut world);
        assert_eq!(world.steps_count(), 2);
        assert!(world.manifolds().len() <= 2);
    }

    #[test]
    fn test_advance_clamps_long_frames() {
        let mut world = world();
        // A one second hitch only simulates max_timestep worth of time
        let steps = advance(&mut world, 1.0);
        assert_eq!(steps, 1);
        assert!(world.accumulator < world.settings().desired_delta_time);

        let mut total = 0;
        for _ in 0..60 {
            total += advance(&mut world, 1.0 / 60.0);
        }
        assert!((59..=61).contains(&total));
        assert_eq!(advance(&mut world, f32::NAN), 0);
    }
}

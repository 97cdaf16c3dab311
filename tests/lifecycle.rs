//! End-to-end scenarios through the `Physics` handle

use std::thread;
use std::time::{Duration, Instant};

use glam::Vec2;

use physac::consts::MAX_BODIES;
use physac::{Physics, PhysicsError, PhysicsSettings, ShapeType, StepMode};

fn manual() -> Physics {
    Physics::init(PhysicsSettings::default(), StepMode::Manual).unwrap()
}

#[test]
fn test_sixty_fifth_body_is_rejected() {
    let physics = manual();
    for i in 0..MAX_BODIES {
        physics
            .create_circle(Vec2::new(i as f32 * 3.0, 0.0), 1.0, 1.0)
            .unwrap();
    }
    let err = physics.create_rectangle(Vec2::ZERO, 1.0, 1.0, 1.0).unwrap_err();
    assert!(matches!(err, PhysicsError::CapacityExceeded { .. }));
    assert_eq!(physics.count().unwrap(), MAX_BODIES);

    // Freeing one slot makes room again
    let first = physics.handle_at(0).unwrap();
    physics.destroy(first).unwrap();
    assert!(physics.create_polygon(Vec2::ZERO, 1.0, 6, 1.0).is_ok());
}

#[test]
fn test_reset_drops_bodies_and_keeps_gravity() {
    let physics = manual();
    physics.set_gravity(0.0, 0.0).unwrap();
    let h = physics.create_circle(Vec2::ZERO, 1.0, 1.0).unwrap();
    physics.step().unwrap();

    physics.reset().unwrap();
    assert_eq!(physics.count().unwrap(), 0);
    assert_eq!(physics.gravity().unwrap(), Vec2::ZERO);
    assert_eq!(physics.steps_count().unwrap(), 0);
    assert!(physics.manifolds().unwrap().is_empty());
    assert!(matches!(physics.body(h), Err(PhysicsError::InvalidHandle(_))));
}

#[test]
fn test_elastic_head_on_swap() {
    let physics = manual();
    physics.set_gravity(0.0, 0.0).unwrap();
    let a = physics.create_circle(Vec2::new(0.0, 0.0), 1.0, 1.0).unwrap();
    let b = physics.create_circle(Vec2::new(1.9, 0.0), 1.0, 1.0).unwrap();
    physics
        .update_body(a, |body| {
            body.velocity = Vec2::new(3.0, 0.0);
            body.restitution = 1.0;
        })
        .unwrap();
    physics
        .update_body(b, |body| {
            body.velocity = Vec2::new(-3.0, 0.0);
            body.restitution = 1.0;
        })
        .unwrap();

    physics.step().unwrap();

    let (a, b) = (physics.body(a).unwrap(), physics.body(b).unwrap());
    assert!((a.velocity - Vec2::new(-3.0, 0.0)).length() < 1e-3, "a: {}", a.velocity);
    assert!((b.velocity - Vec2::new(3.0, 0.0)).length() < 1e-3, "b: {}", b.velocity);
}

#[test]
fn test_box_settles_on_static_floor() {
    let physics = manual();
    let floor = physics
        .create_rectangle(Vec2::new(0.0, 10.0), 20.0, 2.0, 1.0)
        .unwrap();
    physics.update_body(floor, |body| body.make_static()).unwrap();
    let crate_box = physics
        .create_rectangle(Vec2::new(0.0, 5.0), 1.0, 1.0, 1.0)
        .unwrap();

    for _ in 0..300 {
        physics.step().unwrap();
    }

    let body = physics.body(crate_box).unwrap();
    assert!(body.is_grounded);
    assert!((body.position.y - 8.5).abs() < 0.1, "y = {}", body.position.y);
    assert!(body.orient().abs() < 0.05);
    assert_eq!(physics.body(floor).unwrap().position, Vec2::new(0.0, 10.0));
}

#[test]
fn test_stale_handle_rejected_everywhere() {
    let physics = manual();
    let h = physics.create_polygon(Vec2::ZERO, 2.0, 5, 1.0).unwrap();
    physics.destroy(h).unwrap();

    assert!(matches!(physics.destroy(h), Err(PhysicsError::InvalidHandle(_))));
    assert!(physics.add_force(h, Vec2::X).is_err());
    assert!(physics.add_torque(h, 1.0).is_err());
    assert!(physics.set_rotation(h, 1.0).is_err());
    assert!(physics.shape_vertex(h, 0).is_err());
    assert!(physics.shatter(h, Vec2::ZERO, 1.0).is_err());
}

#[test]
fn test_index_queries_follow_creation_order() {
    let physics = manual();
    physics.create_circle(Vec2::ZERO, 1.0, 1.0).unwrap();
    let middle = physics.create_rectangle(Vec2::new(5.0, 0.0), 1.0, 2.0, 1.0).unwrap();
    physics.create_polygon(Vec2::new(10.0, 0.0), 1.0, 7, 1.0).unwrap();

    assert_eq!(physics.shape_type(0).unwrap(), ShapeType::Circle);
    assert_eq!(physics.shape_vertex_count(0).unwrap(), 24);
    assert_eq!(physics.shape_vertex_count(2).unwrap(), 7);

    physics.destroy(middle).unwrap();
    assert_eq!(physics.count().unwrap(), 2);
    assert_eq!(physics.shape_type(1).unwrap(), ShapeType::Polygon);
    assert_eq!(physics.shape_vertex_count(1).unwrap(), 7);
    assert!(matches!(
        physics.get(2),
        Err(PhysicsError::IndexOutOfRange { .. })
    ));

    let snapshot = physics.snapshot().unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[1].1.position, Vec2::new(10.0, 0.0));
}

#[test]
fn test_run_step_clamps_slow_frames() {
    let physics = manual();
    thread::sleep(Duration::from_millis(100));
    // 100ms of wall time only simulates max_timestep
    let steps = physics.run_step().unwrap();
    assert!(steps <= 1);
}

#[test]
fn test_autonomous_worker_lifecycle() {
    let physics = Physics::init(PhysicsSettings::default(), StepMode::Autonomous).unwrap();
    assert!(physics.is_enabled());
    let ball = physics.create_circle(Vec2::ZERO, 1.0, 1.0).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while physics.steps_count().unwrap() < 5 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(physics.steps_count().unwrap() >= 5);

    // Reads during stepping see a consistent body
    let body = physics.body(ball).unwrap();
    assert!(body.position.is_finite());
    assert!(body.velocity.y > 0.0);

    physics.close();
    assert!(!physics.is_enabled());
    assert!(matches!(physics.steps_count(), Err(PhysicsError::NotInitialized)));
    assert!(matches!(
        physics.create_circle(Vec2::ZERO, 1.0, 1.0),
        Err(PhysicsError::NotInitialized)
    ));
}

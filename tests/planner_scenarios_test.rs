//! Scenario tests for the path search: small rapier scenes with a runner standing on
//! them, checking which input the planner chooses and how much work it does.
//!
//! Run with: cargo test --test planner_scenarios_test -- --nocapture

use nalgebra::{Point3, Vector3};
use runnerpath::config::{Kinematics, PlannerConfig};
use runnerpath::planner::landing::{is_steppable, StepTolerance};
use runnerpath::planner::{
    AgentPose, CountingTerrain, PathSearchEngine, PlanStatus, RapierTerrain, SurfaceContact, SurfaceId,
    SurfacePlacement, Transition,
};

// ---------------------------------------------------------------------------
// Scene helpers
// ---------------------------------------------------------------------------

const A: SurfaceId = SurfaceId(1);
const B: SurfaceId = SurfaceId(2);

/// Axis-aligned slab spanning z in [z0, z1] with its top at `top`, 1 unit thick.
fn slab(terrain: &mut RapierTerrain, id: SurfaceId, z0: f32, z1: f32, top: f32) {
    let placement = SurfacePlacement::block([0.0, top - 0.5, (z0 + z1) / 2.0], [20.0, 1.0, z1 - z0]);
    terrain.add_surface(id, placement).unwrap();
}

fn two_slabs(b_start: f32, b_top: f32) -> RapierTerrain {
    let mut terrain = RapierTerrain::new();
    slab(&mut terrain, A, -5.0, 5.0, 0.0);
    slab(&mut terrain, B, b_start, 40.0, b_top);
    terrain
}

fn flat_plane() -> RapierTerrain {
    let mut terrain = RapierTerrain::new();
    terrain.add_surface(A, SurfacePlacement::plane(0.0)).unwrap();
    terrain
}

fn engine() -> PathSearchEngine {
    PathSearchEngine::new(PlannerConfig::default(), Kinematics::default()).unwrap()
}

fn pose_at(z: f32) -> AgentPose {
    AgentPose::new(Point3::new(0.0, 0.1, z), 0.0)
}

fn standing_root(engine: &PathSearchEngine, z: f32) -> runnerpath::planner::SearchState {
    let contact = SurfaceContact {
        point: Point3::new(0.0, 0.0, z),
        normal: Vector3::y(),
        surface: A,
    };
    // Straight-ahead seed is pushed last
    engine.seed_states(&contact).pop().unwrap()
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[test]
fn test_infinite_plane_reaches_horizon() {
    let outcome = engine().plan(&flat_plane(), &pose_at(0.0));

    assert_eq!(outcome.status, PlanStatus::HorizonReached);
    assert!(outcome.progress >= 12.0, "progress {}", outcome.progress);

    let input = outcome.input.expect("a plan");
    assert!(!input.jump);
    assert!(input.movement.x.abs() < 1.0e-4);
    assert!((input.movement.y - 1.0).abs() < 1.0e-4);

    let state = outcome.state.unwrap();
    assert_eq!(state.first_input, outcome.input);
    assert_eq!(state.quality, 1.0);
}

#[test]
fn test_no_ground_yields_no_plan() {
    let outcome = engine().plan(&flat_plane(), &AgentPose::new(Point3::new(0.0, 50.0, 0.0), 0.0));
    assert_eq!(outcome.status, PlanStatus::NotGrounded);
    assert!(outcome.input.is_none());
    assert_eq!(outcome.iterations, 0);
}

#[test]
fn test_gap_too_wide_returns_best_partial() {
    let terrain = two_slabs(30.0, 0.0);
    let outcome = engine().plan(&terrain, &pose_at(0.5));

    assert_eq!(outcome.status, PlanStatus::Exhausted);
    let input = outcome.input.expect("best partial path still steers");
    assert!(!input.jump);
    assert!(
        outcome.progress > 3.0 && outcome.progress < 4.6,
        "progress {}",
        outcome.progress
    );
}

#[test]
fn test_jumps_across_gap() {
    let terrain = two_slabs(8.0, 0.0);
    let engine = engine();

    let frame = engine.heading_frame(0.0);
    let root = standing_root(&engine, 4.5);
    let children = engine.expand(&terrain, &root, &frame);
    assert_eq!(children.len(), 1, "drop falls under the far ledge");
    assert_eq!(children[0].transition, Transition::Jump);
    assert_eq!(children[0].state.surface, B);
    assert!((children[0].state.quality - 0.9).abs() < 1.0e-6);

    let outcome = engine.plan(&terrain, &pose_at(4.5));
    assert_eq!(outcome.status, PlanStatus::HorizonReached);
    let input = outcome.input.unwrap();
    assert!(input.jump);
    assert!((input.movement.y - 1.0).abs() < 1.0e-4);
}

#[test]
fn test_same_landing_surface_prefers_drop() {
    let terrain = two_slabs(5.0, -2.0);
    let engine = engine();

    let root = standing_root(&engine, 4.5);
    let children = engine.expand(&terrain, &root, &engine.heading_frame(0.0));
    let transitions: Vec<_> = children.iter().map(|c| c.transition).collect();
    assert_eq!(transitions, vec![Transition::Drop]);
    assert_eq!(children[0].state.quality, 1.0);
    assert!((children[0].state.current_position.y + 1.9).abs() < 1.0e-3);

    let outcome = engine.plan(&terrain, &pose_at(4.5));
    assert!(!outcome.input.unwrap().jump);
}

#[test]
fn test_stair_is_walked() {
    let terrain = two_slabs(5.0, -0.3);
    let engine = engine();

    let root = standing_root(&engine, 4.5);
    let children = engine.expand(&terrain, &root, &engine.heading_frame(0.0));
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].transition, Transition::Walk);
    assert_eq!(children[0].state.surface, B);
    assert!(children.iter().all(|c| !c.transition.is_airborne()));
}

#[test]
fn test_stair_crack_is_walked_straight() {
    // The next foot point lands in the 0.09 crack between the slabs
    let terrain = two_slabs(5.09, -0.3);
    let engine = engine();

    let root = standing_root(&engine, 4.05);
    let children = engine.expand(&terrain, &root, &engine.heading_frame(0.0));
    assert_eq!(children.len(), 1, "got {:?}", children);
    let child = children[0];
    assert_eq!(child.transition, Transition::Walk);
    assert_eq!(child.state.surface, B);
    assert_eq!(child.state.quality, 1.0);
    assert!((child.state.current_position.y + 0.2).abs() < 1.0e-3);
    assert!((child.state.current_position.z - 5.09).abs() < 1.0e-3);

    for z in [4.05, 3.05] {
        let outcome = engine.plan(&terrain, &pose_at(z));
        assert_eq!(outcome.status, PlanStatus::HorizonReached);
        let input = outcome.input.unwrap();
        assert!(!input.jump);
        assert!(input.movement.x.abs() < 1.0e-4, "veered at {}: {:?}", z, input.movement);
        assert!((input.movement.y - 1.0).abs() < 1.0e-4);
    }
}

#[test]
fn test_curb_step_up_is_walked() {
    let terrain = two_slabs(5.0, 0.3);
    let engine = engine();

    let root = standing_root(&engine, 4.5);
    let children = engine.expand(&terrain, &root, &engine.heading_frame(0.0));
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].transition, Transition::Walk);
    assert!((children[0].state.current_position.y - 0.4).abs() < 1.0e-3);
}

#[test]
fn test_wall_blocks_walking() {
    let mut terrain = two_slabs(5.0, 0.0);
    terrain
        .add_surface(SurfaceId(3), SurfacePlacement::block([0.0, 2.0, 5.6], [20.0, 4.0, 0.2]))
        .unwrap();
    let engine = engine();

    let root = standing_root(&engine, 4.9);
    let children = engine.expand(&terrain, &root, &engine.heading_frame(0.0));
    assert!(children.is_empty(), "got {:?}", children);
}

#[test]
fn test_ramp_is_climbed() {
    let mut terrain = RapierTerrain::new();
    slab(&mut terrain, A, -5.0, 5.0, 0.0);
    // 30 degree ramp rising along +Z, its lower edge flush with the slab
    let pitch = -30.0_f32;
    let run = 10.0_f32;
    let half = run / 2.0;
    let center = [
        0.0,
        half * pitch.to_radians().sin().abs() - 0.5 * pitch.to_radians().cos(),
        5.0 + half * pitch.to_radians().cos() + 0.5 * pitch.to_radians().sin().abs(),
    ];
    terrain
        .add_surface(
            B,
            SurfacePlacement::block(center, [20.0, 1.0, run]).with_rotation([pitch, 0.0, 0.0]),
        )
        .unwrap();

    let engine = engine();
    let mut state = standing_root(&engine, 4.5);
    let frame = engine.heading_frame(0.0);
    for _ in 0..4 {
        let children = engine.expand(&terrain, &state, &frame);
        assert_eq!(children.len(), 1);
        assert!(matches!(children[0].transition, Transition::Walk | Transition::Climb));
        state = children[0].state;
    }
    assert_eq!(state.surface, B);
    assert!(state.current_position.y > 1.0, "climbed to {:?}", state.current_position);
}

#[test]
fn test_steppable_edges() {
    let tolerance = StepTolerance {
        horizontal: 0.1,
        vertical: 0.5,
    };
    let stair = two_slabs(5.0, -0.3);
    assert!(is_steppable(&stair, A, B, &Point3::new(0.0, -0.3, 6.0), 0.0, tolerance));

    let gap = two_slabs(7.0, -0.3);
    assert!(!is_steppable(&gap, A, B, &Point3::new(0.0, -0.3, 8.0), 0.0, tolerance));

    let cliff = two_slabs(5.0, -2.0);
    assert!(!is_steppable(&cliff, A, B, &Point3::new(0.0, -2.0, 7.0), 0.0, tolerance));

    assert!(!is_steppable(&stair, A, SurfaceId(99), &Point3::new(0.0, 0.0, 6.0), 0.0, tolerance));
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn test_best_partial_keeps_first_within_increment() {
    let config = PlannerConfig {
        min_improvement_increment: 2.5,
        ..PlannerConfig::default()
    };
    let engine = PathSearchEngine::new(config, Kinematics::default()).unwrap();
    let outcome = engine.plan(&two_slabs(30.0, 0.0), &pose_at(0.5));

    // Straight ahead reaches 3 then 4 before the edge; 4 is not 2.5 better than 3
    assert_eq!(outcome.status, PlanStatus::Exhausted);
    assert!((outcome.progress - 3.0).abs() < 1.0e-3, "progress {}", outcome.progress);
    let input = outcome.input.unwrap();
    assert!(input.movement.x.abs() < 1.0e-4);
}

#[test]
fn test_plan_is_deterministic() {
    let terrain = two_slabs(30.0, 0.0);
    let engine = engine();
    let first = engine.plan(&terrain, &pose_at(0.5));
    let second = engine.plan(&terrain, &pose_at(0.5));
    assert_eq!(first, second);
}

#[test]
fn test_iteration_cap_bounds_work() {
    let config = PlannerConfig {
        max_iterations: 5,
        ..PlannerConfig::default()
    };
    let engine = PathSearchEngine::new(config, Kinematics::default()).unwrap();
    let terrain = CountingTerrain::new(flat_plane());

    let outcome = engine.plan(&terrain, &pose_at(0.0));
    assert_eq!(outcome.status, PlanStatus::IterationCapReached);
    assert_eq!(outcome.iterations, 5);
    assert!(outcome.input.is_some(), "best partial path is still used");
    assert!(terrain.queries() <= 1 + 5 * engine.max_queries_per_expansion());
}

#[test]
fn test_exhaustive_search_stays_within_query_bound() {
    let engine = engine();
    let terrain = CountingTerrain::new(two_slabs(30.0, 0.0));

    let outcome = engine.plan(&terrain, &pose_at(0.5));
    assert_eq!(outcome.status, PlanStatus::Exhausted);
    assert!(outcome.iterations < 1_000);
    assert!(terrain.queries() <= 1 + outcome.iterations as u64 * engine.max_queries_per_expansion());
}

#[test]
fn test_first_step_follows_body_yaw() {
    let outcome = engine().plan(&flat_plane(), &AgentPose::new(Point3::new(0.0, 0.1, 0.0), 30.0));
    assert_eq!(outcome.status, PlanStatus::HorizonReached);

    let movement = outcome.input.unwrap().movement;
    assert!((movement.x - 0.5).abs() < 1.0e-3, "movement {:?}", movement);
    assert!((movement.y - 0.866).abs() < 1.0e-3, "movement {:?}", movement);
}

#[test]
fn test_custom_course_axis() {
    let config = PlannerConfig {
        course_axis: [1.0, 0.0, 0.0],
        ..PlannerConfig::default()
    };
    let engine = PathSearchEngine::new(config, Kinematics::default()).unwrap();
    let outcome = engine.plan(&flat_plane(), &AgentPose::new(Point3::new(0.0, 0.1, 0.0), 90.0));

    assert_eq!(outcome.status, PlanStatus::HorizonReached);
    let movement = outcome.input.unwrap().movement;
    assert!((movement.x - 1.0).abs() < 1.0e-3);
}

use tracing::debug;

use super::input::VirtualInput;
use crate::planner::{AgentPose, PathSearchEngine, PlanOutcome, TerrainQuery};

/// Drives the path search once per fixed tick and feeds the result into a
/// [`VirtualInput`].
///
/// A jump held when the tick starts is released after the new plan is applied, so a jump
/// is never held for two consecutive ticks.
pub struct PathFollower {
    engine: PathSearchEngine,
    ticks: u64,
}

impl PathFollower {
    pub fn new(engine: PathSearchEngine) -> Self {
        Self { engine, ticks: 0 }
    }

    pub fn engine(&self) -> &PathSearchEngine {
        &self.engine
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick<T: TerrainQuery + ?Sized>(
        &mut self,
        terrain: &T,
        pose: &AgentPose,
        input: &mut VirtualInput,
    ) -> PlanOutcome {
        self.ticks += 1;
        let release_jump = input.current().jump;

        let outcome = self.engine.plan(terrain, pose);
        match outcome.input {
            Some(planned) => {
                if !input.update(|current| *current = planned) {
                    debug!("[Follower] tick {}: input locked, plan {} dropped", self.ticks, planned);
                }
            }
            None => input.reset(),
        }

        if release_jump {
            input.update(|current| current.jump = false);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Kinematics, PlannerConfig};
    use crate::planner::{ControlInput, RapierTerrain, SurfaceId, SurfacePlacement};
    use nalgebra::{Point3, Vector2};

    fn follower() -> PathFollower {
        PathFollower::new(PathSearchEngine::new(PlannerConfig::default(), Kinematics::default()).unwrap())
    }

    #[test]
    fn test_no_ground_resets_input() {
        let terrain = RapierTerrain::new();
        let mut input = VirtualInput::new();
        input.update(|i| *i = ControlInput::new(Vector2::new(0.0, 1.0), false));

        let outcome = follower().tick(&terrain, &AgentPose::new(Point3::origin(), 0.0), &mut input);
        assert!(outcome.input.is_none());
        assert!(input.current().is_neutral());
    }

    #[test]
    fn test_held_jump_is_released() {
        let mut terrain = RapierTerrain::new();
        terrain.add_surface(SurfaceId(1), SurfacePlacement::plane(0.0)).unwrap();
        let pose = AgentPose::new(Point3::new(0.0, 0.1, 0.0), 0.0);

        let mut input = VirtualInput::new();
        input.update(|i| i.jump = true);

        let mut follower = follower();
        follower.tick(&terrain, &pose, &mut input);
        assert!(!input.current().jump);
        assert!((input.current().movement.y - 1.0).abs() < 1.0e-4);
        assert_eq!(follower.ticks(), 1);
    }

    #[test]
    fn test_locked_input_is_left_alone() {
        let mut terrain = RapierTerrain::new();
        terrain.add_surface(SurfaceId(1), SurfacePlacement::plane(0.0)).unwrap();
        let pose = AgentPose::new(Point3::new(0.0, 0.1, 0.0), 0.0);

        let mut input = VirtualInput::new();
        input.reset_and_lock();
        let outcome = follower().tick(&terrain, &pose, &mut input);
        assert!(outcome.input.is_some());
        assert!(input.current().is_neutral());
    }
}

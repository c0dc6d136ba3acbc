//! Reactive decision layer over the walk and jump sensors.
//!
//! A fixed priority list evaluated every tick: while grounded, keep walking if there is
//! room, otherwise take a jump, otherwise a drop; anything else resets the input.

use serde::{Deserialize, Serialize};

use super::input::VirtualInput;
use crate::planner::constants::sensors::{MIN_WALK_DISTANCE, TURN_SPEED};
use crate::planner::geometry::{heading_direction, planar};
use crate::sensors::Observations;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    /// Maximum steering change per tick (degrees)
    pub turn_speed: f32,
    /// Walking wins while the open distance ahead exceeds this
    pub min_walk_distance: f32,
    /// Scale of the movement vector, clamped to [0, 1]
    pub throttle: f32,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            turn_speed: TURN_SPEED,
            min_walk_distance: MIN_WALK_DISTANCE,
            throttle: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Walk,
    Jump,
    Drop,
    Reset,
}

#[derive(Debug, Clone)]
pub struct RunnerBrain {
    config: BrainConfig,
    /// World yaw the runner is steering along (degrees)
    heading: f32,
    release_jump: bool,
}

impl RunnerBrain {
    pub fn new(config: BrainConfig, initial_heading: f32) -> Self {
        Self {
            config,
            heading: initial_heading,
            release_jump: false,
        }
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn tick(&mut self, grounded: bool, observations: &Observations, input: &mut VirtualInput) -> Decision {
        if self.release_jump {
            self.release_jump = false;
            input.update(|i| i.jump = false);
        }

        if !grounded {
            input.reset();
            return Decision::Reset;
        }

        if let Some(walk) = observations
            .walk
            .filter(|w| w.approximate_walkable_distance > self.config.min_walk_distance)
        {
            self.steer(walk.relative_rotation_offset, input);
            return Decision::Walk;
        }

        if let Some(landing) = observations.jump.jump {
            self.steer(landing.relative_angle, input);
            self.jump(input);
            return Decision::Jump;
        }

        if let Some(landing) = observations.jump.drop {
            self.steer(landing.relative_angle, input);
            return Decision::Drop;
        }

        input.reset();
        Decision::Reset
    }

    /// Turns toward `offset` by at most `turn_speed` and writes the new movement vector.
    fn steer(&mut self, offset: f32, input: &mut VirtualInput) {
        let turn = offset.abs().min(self.config.turn_speed).copysign(offset);
        self.heading = (self.heading + turn).rem_euclid(360.0);
        let movement = planar(&heading_direction(self.heading)) * self.config.throttle.clamp(0.0, 1.0);
        input.update(|i| i.movement = movement);
    }

    /// Presses jump for one tick; the press is released on the next tick.
    fn jump(&mut self, input: &mut VirtualInput) {
        if !input.current().jump && input.update(|i| i.jump = true) {
            self.release_jump = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{JumpObservation, Landing, WalkObservation};
    use crate::planner::SurfaceId;
    use nalgebra::{Point3, Vector3};

    fn walk(offset: f32, distance: f32) -> Option<WalkObservation> {
        Some(WalkObservation {
            relative_rotation_offset: offset,
            approximate_walkable_distance: distance,
            horizon_target: Point3::origin(),
        })
    }

    fn landing(angle: f32) -> Option<Landing> {
        Some(Landing {
            surface: SurfaceId(2),
            normal: Vector3::y(),
            point: Point3::origin(),
            relative_angle: angle,
        })
    }

    #[test]
    fn test_priority_order() {
        let mut brain = RunnerBrain::new(BrainConfig::default(), 0.0);
        let mut input = VirtualInput::new();
        let everything = Observations {
            walk: walk(0.0, 5.0),
            jump: JumpObservation {
                jump: landing(0.0),
                drop: landing(0.0),
            },
        };
        assert_eq!(brain.tick(true, &everything, &mut input), Decision::Walk);
        assert_eq!(brain.tick(false, &everything, &mut input), Decision::Reset);
        assert!(input.current().is_neutral());

        let short_walk = Observations {
            walk: walk(0.0, 1.0),
            ..everything
        };
        assert_eq!(brain.tick(true, &short_walk, &mut input), Decision::Jump);

        let drop_only = Observations {
            walk: None,
            jump: JumpObservation {
                jump: None,
                drop: landing(0.0),
            },
        };
        assert_eq!(brain.tick(true, &drop_only, &mut input), Decision::Drop);
        assert_eq!(brain.tick(true, &Observations::default(), &mut input), Decision::Reset);
        assert!(input.current().is_neutral());
    }

    #[test]
    fn test_steering_is_rate_limited_and_signed() {
        let mut brain = RunnerBrain::new(BrainConfig::default(), 0.0);
        let mut input = VirtualInput::new();

        let left = Observations {
            walk: walk(-30.0, 5.0),
            ..Observations::default()
        };
        brain.tick(true, &left, &mut input);
        assert!((brain.heading() - 356.0).abs() < 1.0e-4);
        assert!(input.current().movement.x < 0.0);

        let slight_right = Observations {
            walk: walk(1.5, 5.0),
            ..Observations::default()
        };
        brain.tick(true, &slight_right, &mut input);
        assert!((brain.heading() - 357.5).abs() < 1.0e-4);
        assert!((input.current().movement.norm() - 1.0).abs() < 1.0e-5);
    }

    #[test]
    fn test_jump_is_a_one_tick_pulse() {
        let mut brain = RunnerBrain::new(BrainConfig::default(), 0.0);
        let mut input = VirtualInput::new();
        let jump = Observations {
            walk: None,
            jump: JumpObservation {
                jump: landing(0.0),
                drop: None,
            },
        };

        assert_eq!(brain.tick(true, &jump, &mut input), Decision::Jump);
        assert!(input.current().jump);

        // Next tick releases the press before deciding again, then presses anew
        let walk_on = Observations {
            walk: walk(0.0, 5.0),
            ..Observations::default()
        };
        assert_eq!(brain.tick(true, &walk_on, &mut input), Decision::Walk);
        assert!(!input.current().jump);
    }
}

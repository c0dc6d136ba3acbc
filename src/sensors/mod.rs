//! Single-shot reactive observations, independent of the path search.

pub mod jump;
pub mod walk;

use serde::{Deserialize, Serialize};

use crate::config::Kinematics;
use crate::error::ConfigError;
use crate::planner::constants::search::LANDABLE_NORMAL_DOT;
use crate::planner::terrain::{SurfaceId, SurfaceMask, TerrainQuery};
use crate::planner::AgentPose;

pub use jump::{JumpObservation, JumpProbe, JumpSensor, Landing};
pub use walk::{WalkObservation, WalkProbe, WalkSensor};

/// Probe layout for both sensors, as read from a course file's `[sensors]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Layers the jump sensor can land on
    pub ground_mask: SurfaceMask,
    pub landable_normal_dot: f32,
    pub walk: Vec<WalkProbe>,
    pub jump: Vec<JumpProbe>,
    pub drop: Vec<JumpProbe>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        let fan = [0.0, -15.0, 15.0];
        Self {
            ground_mask: SurfaceMask::ALL,
            landable_normal_dot: LANDABLE_NORMAL_DOT,
            walk: [-30.0, 0.0, 30.0].into_iter().map(WalkProbe::at_angle).collect(),
            jump: fan.into_iter().map(JumpProbe::at_angle).collect(),
            drop: fan.into_iter().map(JumpProbe::at_angle).collect(),
        }
    }
}

impl SensorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for probe in &self.walk {
            probe.validate()?;
        }
        for probe in self.jump.iter().chain(&self.drop) {
            probe.validate()?;
        }
        crate::config::in_range("sensors.landable_normal_dot", self.landable_normal_dot, -1.0, 1.0)
    }
}

/// Both observations taken on the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Observations {
    pub walk: Option<WalkObservation>,
    pub jump: JumpObservation,
}

/// Walk and jump sensors sampled together once per tick.
#[derive(Debug, Clone)]
pub struct Perception {
    walk: WalkSensor,
    jump: JumpSensor,
}

impl Perception {
    pub fn new(config: &SensorConfig, kinematics: Kinematics) -> Result<Self, ConfigError> {
        config.validate()?;
        kinematics.validate()?;
        Ok(Self {
            walk: WalkSensor::new(config.walk.clone()),
            jump: JumpSensor::new(
                config.jump.clone(),
                config.drop.clone(),
                config.ground_mask,
                config.landable_normal_dot,
                kinematics,
            ),
        })
    }

    pub fn observe<T: TerrainQuery + ?Sized>(
        &self,
        terrain: &T,
        pose: &AgentPose,
        standing_on: Option<SurfaceId>,
    ) -> Observations {
        Observations {
            walk: self.walk.observe(terrain, pose),
            jump: self.jump.observe(terrain, pose, standing_on),
        }
    }
}

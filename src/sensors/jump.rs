//! Jump and drop landing sensor.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::{positive, Kinematics};
use crate::error::ConfigError;
use crate::planner::geometry::rotate_about_up;
use crate::planner::landing::{first_hit_along, LandingCriteria, LandingVerdict};
use crate::planner::terrain::{SurfaceId, SurfaceMask, TerrainQuery};
use crate::planner::trajectory::BallisticArc;
use crate::planner::AgentPose;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpProbe {
    pub num_steps: u32,
    /// Integration time slice in seconds
    pub step_interval: f32,
    pub angle_offset: f32,
}

impl Default for JumpProbe {
    fn default() -> Self {
        Self {
            num_steps: 10,
            step_interval: 0.1,
            angle_offset: 0.0,
        }
    }
}

impl JumpProbe {
    pub fn at_angle(angle_offset: f32) -> Self {
        Self {
            angle_offset,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_steps == 0 {
            return Err(ConfigError::Zero { field: "jump.num_steps" });
        }
        positive("jump.step_interval", self.step_interval)
    }

    /// Flight segments (`num_steps + 1` of them) for a launch with `relative_velocity`
    /// in the runner's local frame.
    fn arc(&self, pose: &AgentPose, relative_velocity: Vector3<f32>, gravity: f32) -> BallisticArc {
        let velocity = rotate_about_up(&relative_velocity, pose.yaw + self.angle_offset);
        BallisticArc::new(pose.position, velocity, gravity, self.step_interval, self.num_steps + 1)
    }
}

/// Where a probed flight would come down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landing {
    pub surface: SurfaceId,
    pub normal: Vector3<f32>,
    pub point: Point3<f32>,
    /// Angle offset of the probe that found it (degrees)
    pub relative_angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JumpObservation {
    pub jump: Option<Landing>,
    pub drop: Option<Landing>,
}

#[derive(Debug, Clone)]
pub struct JumpSensor {
    jump_probes: Vec<JumpProbe>,
    drop_probes: Vec<JumpProbe>,
    mask: SurfaceMask,
    criteria: LandingCriteria,
    kinematics: Kinematics,
}

impl JumpSensor {
    pub fn new(
        jump_probes: Vec<JumpProbe>,
        drop_probes: Vec<JumpProbe>,
        mask: SurfaceMask,
        landable_normal_dot: f32,
        kinematics: Kinematics,
    ) -> Self {
        Self {
            jump_probes,
            drop_probes,
            mask,
            criteria: LandingCriteria { landable_normal_dot },
            kinematics,
        }
    }

    /// Probes every drop and jump arc in registration order; the first arc that lands
    /// wins for each kind. `standing_on` is the surface the runner is currently on.
    pub fn observe<T: TerrainQuery + ?Sized>(
        &self,
        terrain: &T,
        pose: &AgentPose,
        standing_on: Option<SurfaceId>,
    ) -> JumpObservation {
        let speed = self.kinematics.movement_speed;
        let drop_velocity = Vector3::new(0.0, 0.0, speed);
        let jump_velocity = Vector3::new(0.0, self.kinematics.jump_speed, speed);

        JumpObservation {
            drop: self.first_landing(terrain, &self.drop_probes, pose, drop_velocity, standing_on),
            jump: self.first_landing(terrain, &self.jump_probes, pose, jump_velocity, standing_on),
        }
    }

    fn first_landing<T: TerrainQuery + ?Sized>(
        &self,
        terrain: &T,
        probes: &[JumpProbe],
        pose: &AgentPose,
        velocity: Vector3<f32>,
        standing_on: Option<SurfaceId>,
    ) -> Option<Landing> {
        probes.iter().find_map(|probe| {
            let arc = probe.arc(pose, velocity, self.kinematics.gravity);
            let (delta, hit) = first_hit_along(terrain, arc, self.mask)?;
            if self.criteria.judge(&delta, &hit, standing_on) != LandingVerdict::Landing {
                return None;
            }
            Some(Landing {
                surface: hit.surface,
                normal: hit.normal,
                point: hit.point,
                relative_angle: probe.angle_offset,
            })
        })
    }
}

//! Walkable-ground sensor: samples the ground along a fan of headings and reports
//! which way, and how far, the runner can keep walking.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::in_range;
use crate::error::ConfigError;
use crate::planner::constants::sensors::{GROUND_LIFT, WALK_RAY_SLACK};
use crate::planner::geometry::{heading_direction, horizontal_distance, signed_angle_about_up, up};
use crate::planner::terrain::{SurfaceMask, TerrainQuery};
use crate::planner::AgentPose;

/// One heading the sensor samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkProbe {
    pub mask: SurfaceMask,
    pub num_steps: u32,
    pub step_size: f32,
    /// Yaw relative to the runner's facing (degrees)
    pub angle_offset: f32,
    pub max_slope_grade: f32,
    pub weight: f32,
}

impl Default for WalkProbe {
    fn default() -> Self {
        Self {
            mask: SurfaceMask::ALL,
            num_steps: 5,
            step_size: 2.0,
            angle_offset: 0.0,
            max_slope_grade: 1.0,
            weight: 1.0,
        }
    }
}

impl WalkProbe {
    pub fn at_angle(angle_offset: f32) -> Self {
        Self {
            angle_offset,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_steps == 0 {
            return Err(ConfigError::Zero { field: "walk.num_steps" });
        }
        in_range("walk.step_size", self.step_size, 0.0, f32::MAX)?;
        in_range("walk.max_slope_grade", self.max_slope_grade, 0.0, f32::MAX)?;
        Ok(())
    }

    /// Sample points ahead of `pose`, one per step.
    pub fn points(&self, pose: &AgentPose) -> impl Iterator<Item = Point3<f32>> + '_ {
        let dir = heading_direction(pose.yaw + self.angle_offset);
        let origin = pose.position;
        (0..self.num_steps).map(move |i| origin + dir * ((i + 1) as f32 * self.step_size))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalkObservation {
    /// Signed yaw from the runner's facing to the blended walk direction (degrees)
    pub relative_rotation_offset: f32,
    /// Mean horizontal distance to the first unsupported sample; infinite when every
    /// probe found ground all the way
    pub approximate_walkable_distance: f32,
    pub horizon_target: Point3<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct WalkSensor {
    probes: Vec<WalkProbe>,
}

impl WalkSensor {
    pub fn new(probes: Vec<WalkProbe>) -> Self {
        Self { probes }
    }

    pub fn probes(&self) -> &[WalkProbe] {
        &self.probes
    }

    /// Returns `None` when there are no probes or the blended displacement vanishes.
    pub fn observe<T: TerrainQuery + ?Sized>(&self, terrain: &T, pose: &AgentPose) -> Option<WalkObservation> {
        if self.probes.is_empty() {
            return None;
        }

        let share = 1.0 / self.probes.len() as f32;
        let mut blended = Vector3::zeros();
        let mut missed_total = 0.0_f32;
        let mut missed_count = 0_u32;

        for probe in &self.probes {
            let rise = probe.max_slope_grade * probe.step_size;
            let length = 2.0 * rise + WALK_RAY_SLACK;
            let mut last_ground = pose.position;

            for point in probe.points(pose) {
                let origin = point + up() * rise;
                match terrain.raycast(&origin, &(-up()), length, probe.mask) {
                    Some(hit) => last_ground = hit.point + up() * GROUND_LIFT,
                    None => {
                        missed_total += horizontal_distance(&pose.position, &origin);
                        missed_count += 1;
                        break;
                    }
                }
            }

            blended += (last_ground - pose.position) * share * probe.weight;
        }

        if blended.norm_squared() <= 0.0 {
            return None;
        }

        Some(WalkObservation {
            relative_rotation_offset: signed_angle_about_up(&heading_direction(pose.yaw), &blended),
            approximate_walkable_distance: if missed_count == 0 {
                f32::INFINITY
            } else {
                missed_total / missed_count as f32
            },
            horizon_target: pose.position + blended,
        })
    }
}

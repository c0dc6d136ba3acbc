//! Planner, trajectory and kinematics settings.
//!
//! Every field has a default from `planner::constants`, so a TOML table only needs the
//! values it overrides.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::planner::constants::{kinematics as kin, search, trajectory as traj};
use crate::planner::terrain::SurfaceMask;

/// Kinematic model supplied by the movement controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Kinematics {
    pub gravity: f32,
    pub movement_speed: f32,
    pub jump_speed: f32,
}

impl Default for Kinematics {
    fn default() -> Self {
        Self {
            gravity: kin::DEFAULT_GRAVITY,
            movement_speed: kin::DEFAULT_MOVEMENT_SPEED,
            jump_speed: kin::DEFAULT_JUMP_SPEED,
        }
    }
}

impl Kinematics {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("gravity", self.gravity)?;
        positive("movement_speed", self.movement_speed)?;
        in_range("jump_speed", self.jump_speed, 0.0, f32::MAX)
    }
}

/// Arc integration settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    pub step_count: u32,
    pub step_interval: f32,
    pub simplification_tolerance: f32,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            step_count: traj::STEP_COUNT,
            step_interval: traj::STEP_INTERVAL,
            simplification_tolerance: traj::SIMPLIFICATION_TOLERANCE,
        }
    }
}

/// Search engine settings. Immutable once handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub alignment_rate: f32,
    pub step_size: f32,
    pub max_lookahead_distance: f32,
    pub extra_paths: u32,
    pub extra_paths_step_angle: f32,
    pub max_valid_start_angle: f32,
    pub hover_distance: f32,
    pub ground_probe_radius: f32,
    pub grounding_distance: f32,
    pub ground_probe_distance: f32,
    pub slope_probe_height: f32,
    pub max_slope_grade: f32,
    pub crest_probe_height: f32,
    pub landable_normal_dot: f32,
    pub steppable_distance: f32,
    pub max_step_height: f32,
    pub jump_quality_penalty: f32,
    pub min_improvement_increment: f32,
    pub max_iterations: u32,
    pub drop_velocity_scale: f32,
    pub jump_velocity_scale: f32,
    pub surface_mask: SurfaceMask,
    /// World direction progress is measured along; only its horizontal part is used
    pub course_axis: [f32; 3],
    pub trajectory: TrajectoryConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            alignment_rate: search::ALIGNMENT_RATE,
            step_size: search::STEP_SIZE,
            max_lookahead_distance: search::MAX_LOOKAHEAD_DISTANCE,
            extra_paths: search::EXTRA_PATHS,
            extra_paths_step_angle: search::EXTRA_PATHS_STEP_ANGLE,
            max_valid_start_angle: search::MAX_VALID_START_ANGLE,
            hover_distance: search::HOVER_DISTANCE,
            ground_probe_radius: search::GROUND_PROBE_RADIUS,
            grounding_distance: search::GROUNDING_DISTANCE,
            ground_probe_distance: search::GROUND_PROBE_DISTANCE,
            slope_probe_height: search::SLOPE_PROBE_HEIGHT,
            max_slope_grade: search::MAX_SLOPE_GRADE,
            crest_probe_height: search::CREST_PROBE_HEIGHT,
            landable_normal_dot: search::LANDABLE_NORMAL_DOT,
            steppable_distance: search::STEPPABLE_DISTANCE,
            max_step_height: search::MAX_STEP_HEIGHT,
            jump_quality_penalty: search::JUMP_QUALITY_PENALTY,
            min_improvement_increment: search::MIN_IMPROVEMENT_INCREMENT,
            max_iterations: search::MAX_ITERATIONS,
            drop_velocity_scale: 1.0,
            jump_velocity_scale: 1.0,
            surface_mask: SurfaceMask::ALL,
            course_axis: [0.0, 0.0, 1.0],
            trajectory: TrajectoryConfig::default(),
        }
    }
}

impl PlannerConfig {
    /// Normalized horizontal course axis, or `None` when it is vertical or zero.
    pub fn course_axis(&self) -> Option<Vector3<f32>> {
        let [x, _, z] = self.course_axis;
        let axis = Vector3::new(x, 0.0, z);
        axis.try_normalize(1.0e-6)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        in_range("alignment_rate", self.alignment_rate, 0.0, 1.0)?;
        positive("step_size", self.step_size)?;
        in_range("max_lookahead_distance", self.max_lookahead_distance, 0.0, f32::MAX)?;
        in_range("extra_paths_step_angle", self.extra_paths_step_angle, 0.0, 180.0)?;
        in_range("max_valid_start_angle", self.max_valid_start_angle, 0.0, 180.0)?;
        if self.extra_paths > search::MAX_EXTRA_PATHS {
            return Err(ConfigError::TooLarge {
                field: "extra_paths",
                value: self.extra_paths,
                max: search::MAX_EXTRA_PATHS,
            });
        }
        // The widest seed must still turn less than a half circle
        in_range(
            "extra_paths * extra_paths_step_angle",
            self.extra_paths as f32 * self.extra_paths_step_angle,
            0.0,
            180.0,
        )?;
        in_range("hover_distance", self.hover_distance, 0.0, f32::MAX)?;
        positive("ground_probe_radius", self.ground_probe_radius)?;
        positive("grounding_distance", self.grounding_distance)?;
        positive("ground_probe_distance", self.ground_probe_distance)?;
        in_range("slope_probe_height", self.slope_probe_height, 0.0, f32::MAX)?;
        in_range("max_slope_grade", self.max_slope_grade, 0.0, f32::MAX)?;
        in_range("crest_probe_height", self.crest_probe_height, 0.0, f32::MAX)?;
        in_range("landable_normal_dot", self.landable_normal_dot, -1.0, 1.0)?;
        in_range("steppable_distance", self.steppable_distance, 0.0, f32::MAX)?;
        in_range("max_step_height", self.max_step_height, 0.0, f32::MAX)?;
        positive("jump_quality_penalty", self.jump_quality_penalty)?;
        in_range("jump_quality_penalty", self.jump_quality_penalty, 0.0, 1.0)?;
        in_range("min_improvement_increment", self.min_improvement_increment, 0.0, f32::MAX)?;
        positive("drop_velocity_scale", self.drop_velocity_scale)?;
        positive("jump_velocity_scale", self.jump_velocity_scale)?;
        if self.max_iterations == 0 {
            return Err(ConfigError::Zero { field: "max_iterations" });
        }
        if self.trajectory.step_count == 0 {
            return Err(ConfigError::Zero { field: "trajectory.step_count" });
        }
        positive("trajectory.step_interval", self.trajectory.step_interval)?;
        in_range(
            "trajectory.simplification_tolerance",
            self.trajectory.simplification_tolerance,
            0.0,
            f32::MAX,
        )?;
        if self.course_axis().is_none() {
            return Err(ConfigError::DegenerateCourseAxis);
        }
        Ok(())
    }
}

pub(crate) fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

pub(crate) fn in_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, min, max })
    }
}

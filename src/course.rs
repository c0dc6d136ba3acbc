//! Course files: runner start, planner settings and the surfaces to build.
//!
//! Geometry comes from two places. `[[surfaces]]` lists free-standing primitives by id.
//! `[[chunks]]` lays out platforms end to end along +Z, each starting where the previous
//! one ended, accumulating height the way course chunks are stacked in game.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use nalgebra::{Point3, Rotation3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{in_range, positive, Kinematics, PlannerConfig};
use crate::error::{ConfigError, CourseError};
use crate::planner::{AgentPose, PathSearchEngine, RapierTerrain, SurfaceId, SurfacePlacement, SurfaceShape};
use crate::runner::BrainConfig;
use crate::sensors::{Perception, SensorConfig};

/// Where the runner starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub position: [f32; 3],
    /// Yaw in degrees; 0 faces +Z
    pub yaw: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.1, 0.0],
            yaw: 0.0,
        }
    }
}

/// A free-standing primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub id: u64,
    #[serde(default)]
    pub shape: SurfaceShape,
    pub position: [f32; 3],
    #[serde(default = "unit_size")]
    pub size: [f32; 3],
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default)]
    pub layer: u32,
    #[serde(default = "default_can_collide")]
    pub can_collide: bool,
}

fn unit_size() -> [f32; 3] {
    [1.0; 3]
}

fn default_can_collide() -> bool {
    true
}

impl SurfaceConfig {
    pub fn placement(&self) -> SurfacePlacement {
        SurfacePlacement::block(self.position, self.size)
            .with_shape(self.shape)
            .with_rotation(self.rotation)
            .with_layer(self.layer)
            .with_collision(self.can_collide)
    }
}

/// One platform of the chunk layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Run along +Z
    pub length: f32,
    pub width: f32,
    pub thickness: f32,
    /// Empty space before the chunk starts
    pub gap: f32,
    /// Height change at the chunk's start edge (negative is a drop)
    pub step: f32,
    /// Height gained from the chunk's start to its end; non-zero makes a ramp
    pub end_height: f32,
    pub layer: u32,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            length: 8.0,
            width: 5.0,
            thickness: 1.0,
            gap: 0.0,
            step: 0.0,
            end_height: 0.0,
            layer: 0,
        }
    }
}

impl ChunkConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        positive("length", self.length)?;
        positive("width", self.width)?;
        positive("thickness", self.thickness)?;
        in_range("gap", self.gap, 0.0, f32::MAX)
    }

    /// Placement of a chunk whose top surface starts at `start` (front edge center).
    fn placement(&self, start: Point3<f32>) -> SurfacePlacement {
        let pitch = -(self.end_height / self.length).atan();
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), pitch);
        let top_center = start + Vector3::new(0.0, self.end_height / 2.0, self.length / 2.0);
        let center = top_center - rotation * Vector3::y() * (self.thickness / 2.0);
        let run = (self.length * self.length + self.end_height * self.end_height).sqrt();

        SurfacePlacement::block(center.into(), [self.width, self.thickness, run])
            .with_rotation([pitch.to_degrees(), 0.0, 0.0])
            .with_layer(self.layer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseConfig {
    pub name: String,
    /// Front edge center of the first chunk's top surface
    pub origin: [f32; 3],
    pub agent: AgentConfig,
    pub kinematics: Kinematics,
    pub planner: PlannerConfig,
    pub sensors: SensorConfig,
    pub brain: BrainConfig,
    pub surfaces: Vec<SurfaceConfig>,
    pub chunks: Vec<ChunkConfig>,
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            name: "course".to_string(),
            origin: [0.0; 3],
            agent: AgentConfig::default(),
            kinematics: Kinematics::default(),
            planner: PlannerConfig::default(),
            sensors: SensorConfig::default(),
            brain: BrainConfig::default(),
            surfaces: Vec::new(),
            chunks: Vec::new(),
        }
    }
}

impl FromStr for CourseConfig {
    type Err = CourseError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        Self::parse(content, "<inline>")
    }
}

impl CourseConfig {
    /// Load a course from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, CourseError> {
        let content = std::fs::read_to_string(path).map_err(|source| CourseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: impl Into<PathBuf>) -> Result<Self, CourseError> {
        let course: CourseConfig = toml::from_str(content).map_err(|source| CourseError::Parse {
            path: path.into(),
            source,
        })?;
        course.validate()?;
        Ok(course)
    }

    pub fn to_toml(&self) -> Result<String, CourseError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), CourseError> {
        self.kinematics.validate()?;
        self.planner.validate()?;
        self.sensors.validate()?;
        for (index, chunk) in self.chunks.iter().enumerate() {
            chunk
                .validate()
                .map_err(|source| CourseError::Chunk { index, source })?;
        }
        let mut seen = BTreeSet::new();
        for surface in &self.surfaces {
            if !seen.insert(surface.id) {
                return Err(CourseError::DuplicateSurface(surface.id));
            }
        }
        Ok(())
    }

    pub fn agent_pose(&self) -> AgentPose {
        AgentPose::new(Point3::from(self.agent.position), self.agent.yaw)
    }

    /// Every surface of the course. Chunks take ids after the highest explicit one.
    pub fn placements(&self) -> Vec<(SurfaceId, SurfacePlacement)> {
        let mut out: Vec<_> = self
            .surfaces
            .iter()
            .map(|s| (SurfaceId(s.id), s.placement()))
            .collect();

        let mut next_id = self.surfaces.iter().map(|s| s.id + 1).max().unwrap_or(1);
        let mut cursor = Point3::from(self.origin);
        for chunk in &self.chunks {
            cursor.z += chunk.gap;
            cursor.y += chunk.step;
            out.push((SurfaceId(next_id), chunk.placement(cursor)));
            next_id += 1;
            cursor.z += chunk.length;
            cursor.y += chunk.end_height;
        }
        out
    }

    pub fn build_terrain(&self) -> Result<RapierTerrain, CourseError> {
        let mut terrain = RapierTerrain::new();
        for (id, placement) in self.placements() {
            terrain.add_surface(id, placement)?;
        }
        info!("[Course] '{}' built with {} surfaces", self.name, terrain.surface_count());
        Ok(terrain)
    }

    pub fn engine(&self) -> Result<PathSearchEngine, CourseError> {
        Ok(PathSearchEngine::new(self.planner.clone(), self.kinematics)?)
    }

    pub fn perception(&self) -> Result<Perception, CourseError> {
        Ok(Perception::new(&self.sensors, self.kinematics)?)
    }

    /// Random chunk course, deterministic for a given seed. The first chunk is a long
    /// flat run-up with the runner standing near its start.
    pub fn generate(name: &str, seed: u64, chunk_count: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut chunks = Vec::with_capacity(chunk_count.max(1));
        chunks.push(ChunkConfig {
            length: 12.0,
            width: 8.0,
            ..ChunkConfig::default()
        });

        for _ in 1..chunk_count {
            let gap = if rng.gen_bool(0.4) {
                0.0
            } else {
                rng.gen_range(1.0..4.0_f32)
            };
            let step = if gap > 0.0 { -rng.gen_range(0.0..3.0_f32) } else { 0.0 };
            let end_height = [-2.0, -1.0, 0.0, 0.0, 0.0, 1.0][rng.gen_range(0..6)];
            chunks.push(ChunkConfig {
                length: rng.gen_range(6..=16) as f32,
                width: 8.0,
                gap: round_to_tenth(gap),
                step: round_to_tenth(step),
                end_height,
                ..ChunkConfig::default()
            });
        }

        Self {
            name: name.to_string(),
            agent: AgentConfig {
                position: [0.0, 0.1, 2.0],
                yaw: 0.0,
            },
            chunks,
            ..Self::default()
        }
    }
}

fn round_to_tenth(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

//! Error types for configuration, course loading and terrain construction.
//!
//! Planning itself never fails; these only cover the inputs handed to it.

use std::path::PathBuf;

use thiserror::Error;

use crate::planner::terrain::SurfaceId;

/// Invalid planner or kinematics settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("{field} must be in [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("{field} must be at most {max}, got {value}")]
    TooLarge { field: &'static str, value: u32, max: u32 },
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
    #[error("course axis must have a horizontal component")]
    DegenerateCourseAxis,
}

/// Problems building collision geometry.
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("surface {0:?} has a degenerate {1} shape")]
    DegenerateShape(SurfaceId, &'static str),
    #[error("surface {0:?} has non-positive size {1:?}")]
    InvalidSize(SurfaceId, [f32; 3]),
    #[error("surface {0:?} uses layer {1}, only layers 0-31 exist")]
    InvalidLayer(SurfaceId, u32),
}

/// Errors that can occur when loading or building a course.
#[derive(Debug, Error)]
pub enum CourseError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize course: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid planner settings: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid surface: {0}")]
    Terrain(#[from] TerrainError),
    #[error("chunk {index}: {source}")]
    Chunk { index: usize, source: ConfigError },
    #[error("surface id {0} is used more than once")]
    DuplicateSurface(u64),
}

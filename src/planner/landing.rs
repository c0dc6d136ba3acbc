//! Landing validity shared by the search engine and the jump sensor.

use nalgebra::{Point3, Vector3};

use super::constants::EPSILON;
use super::geometry::{horizontal_distance, up};
use super::terrain::{SurfaceId, SurfaceMask, TerrainHit, TerrainQuery};

/// Why a hit along a flight path is or isn't a landing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingVerdict {
    Landing,
    /// Hit while still rising or moving level
    NotDescending,
    /// Surface too steep to stand on
    Steep,
    /// The surface the runner took off from
    SameSurface,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandingCriteria {
    /// Minimum dot(normal, up) of a landable surface (exclusive)
    pub landable_normal_dot: f32,
}

impl LandingCriteria {
    pub fn judge(
        &self,
        segment_delta: &Vector3<f32>,
        hit: &TerrainHit,
        takeoff_surface: Option<SurfaceId>,
    ) -> LandingVerdict {
        if (-up()).dot(segment_delta) <= 0.0 {
            LandingVerdict::NotDescending
        } else if hit.normal.dot(&up()) <= self.landable_normal_dot {
            LandingVerdict::Steep
        } else if takeoff_surface == Some(hit.surface) {
            LandingVerdict::SameSurface
        } else {
            LandingVerdict::Landing
        }
    }
}

/// Casts along consecutive segments and returns the first hit with the segment that
/// produced it. Zero-length segments are skipped.
pub fn first_hit_along<T, I>(terrain: &T, segments: I, mask: SurfaceMask) -> Option<(Vector3<f32>, TerrainHit)>
where
    T: TerrainQuery + ?Sized,
    I: IntoIterator<Item = (Point3<f32>, Point3<f32>)>,
{
    for (start, end) in segments {
        let delta = end - start;
        let length = delta.norm();
        if length < EPSILON {
            continue;
        }
        if let Some(hit) = terrain.raycast(&start, &(delta / length), length, mask) {
            return Some((delta, hit));
        }
    }
    None
}

/// Consecutive point pairs of a polyline.
pub fn segments(points: &[Point3<f32>]) -> impl Iterator<Item = (Point3<f32>, Point3<f32>)> + '_ {
    points.windows(2).map(|w| (w[0], w[1]))
}

/// Thresholds for telling a stair step apart from a real gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTolerance {
    pub horizontal: f32,
    pub vertical: f32,
}

/// True when `to` continues `from` like a curb or stair: the nearest boundary points of
/// the two surfaces (seen from the landing point) nearly touch horizontally, and the
/// landing is within a step of the takeoff ground height. Missing geometry counts as not
/// steppable.
pub fn is_steppable<T: TerrainQuery + ?Sized>(
    terrain: &T,
    from: SurfaceId,
    to: SurfaceId,
    landing_point: &Point3<f32>,
    takeoff_height: f32,
    tolerance: StepTolerance,
) -> bool {
    let Some(edge) = terrain.closest_point(from, landing_point) else {
        return false;
    };
    let Some(across) = terrain.closest_point(to, &edge) else {
        return false;
    };
    horizontal_distance(&edge, &across) < tolerance.horizontal
        && (landing_point.y - takeoff_height).abs() <= tolerance.vertical
}

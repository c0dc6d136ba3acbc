//! Collision query contract the planner runs against.

use std::cell::Cell;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Opaque identifier of the surface (collider) a point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

/// Layer mask selecting which surfaces a query may hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceMask(pub u32);

impl SurfaceMask {
    pub const ALL: SurfaceMask = SurfaceMask(u32::MAX);
    pub const NONE: SurfaceMask = SurfaceMask(0);

    /// Mask containing a single layer (0-based).
    pub fn layer(index: u32) -> Self {
        SurfaceMask(1u32.checked_shl(index).unwrap_or(0))
    }

    pub fn contains(self, layer: u32) -> bool {
        self.0 & layer != 0
    }
}

impl Default for SurfaceMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Result of a ray or sphere cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainHit {
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    pub distance: f32,
    pub surface: SurfaceId,
}

/// Read-only collision queries against static and dynamic geometry.
///
/// `direction` must be a unit vector so distances are in world units. Implementations
/// report misses as `None`; a failing backend is indistinguishable from empty space.
pub trait TerrainQuery {
    fn raycast(
        &self,
        origin: &Point3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
        mask: SurfaceMask,
    ) -> Option<TerrainHit>;

    fn spherecast(
        &self,
        origin: &Point3<f32>,
        radius: f32,
        direction: &Vector3<f32>,
        max_distance: f32,
        mask: SurfaceMask,
    ) -> Option<TerrainHit>;

    /// Closest point on the boundary (or inside) of `surface` to `point`.
    fn closest_point(&self, surface: SurfaceId, point: &Point3<f32>) -> Option<Point3<f32>>;
}

impl<T: TerrainQuery + ?Sized> TerrainQuery for &T {
    fn raycast(
        &self,
        origin: &Point3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
        mask: SurfaceMask,
    ) -> Option<TerrainHit> {
        (**self).raycast(origin, direction, max_distance, mask)
    }

    fn spherecast(
        &self,
        origin: &Point3<f32>,
        radius: f32,
        direction: &Vector3<f32>,
        max_distance: f32,
        mask: SurfaceMask,
    ) -> Option<TerrainHit> {
        (**self).spherecast(origin, radius, direction, max_distance, mask)
    }

    fn closest_point(&self, surface: SurfaceId, point: &Point3<f32>) -> Option<Point3<f32>> {
        (**self).closest_point(surface, point)
    }
}

/// Wraps a terrain and counts every query issued through it.
pub struct CountingTerrain<T> {
    inner: T,
    queries: Cell<u64>,
}

impl<T: TerrainQuery> CountingTerrain<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            queries: Cell::new(0),
        }
    }

    pub fn queries(&self) -> u64 {
        self.queries.get()
    }

    pub fn reset(&self) {
        self.queries.set(0);
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn bump(&self) {
        self.queries.set(self.queries.get() + 1);
    }
}

impl<T: TerrainQuery> TerrainQuery for CountingTerrain<T> {
    fn raycast(
        &self,
        origin: &Point3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
        mask: SurfaceMask,
    ) -> Option<TerrainHit> {
        self.bump();
        self.inner.raycast(origin, direction, max_distance, mask)
    }

    fn spherecast(
        &self,
        origin: &Point3<f32>,
        radius: f32,
        direction: &Vector3<f32>,
        max_distance: f32,
        mask: SurfaceMask,
    ) -> Option<TerrainHit> {
        self.bump();
        self.inner.spherecast(origin, radius, direction, max_distance, mask)
    }

    fn closest_point(&self, surface: SurfaceId, point: &Point3<f32>) -> Option<Point3<f32>> {
        self.bump();
        self.inner.closest_point(surface, point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nothing;

    impl TerrainQuery for Nothing {
        fn raycast(&self, _: &Point3<f32>, _: &Vector3<f32>, _: f32, _: SurfaceMask) -> Option<TerrainHit> {
            None
        }

        fn spherecast(
            &self,
            _: &Point3<f32>,
            _: f32,
            _: &Vector3<f32>,
            _: f32,
            _: SurfaceMask,
        ) -> Option<TerrainHit> {
            None
        }

        fn closest_point(&self, _: SurfaceId, _: &Point3<f32>) -> Option<Point3<f32>> {
            None
        }
    }

    #[test]
    fn test_surface_mask_layers() {
        assert_eq!(SurfaceMask::layer(0), SurfaceMask(1));
        assert_eq!(SurfaceMask::layer(3), SurfaceMask(8));
        assert_eq!(SurfaceMask::layer(40), SurfaceMask::NONE);
        assert!(SurfaceMask::ALL.contains(SurfaceMask::layer(7).0));
        assert!(!SurfaceMask::layer(1).contains(SurfaceMask::layer(2).0));
    }

    #[test]
    fn test_counting_terrain_counts_every_query() {
        let terrain = CountingTerrain::new(Nothing);
        let origin = Point3::origin();
        let down = -Vector3::y();
        terrain.raycast(&origin, &down, 1.0, SurfaceMask::ALL);
        terrain.spherecast(&origin, 0.1, &down, 1.0, SurfaceMask::ALL);
        terrain.closest_point(SurfaceId(1), &origin);
        assert_eq!(terrain.queries(), 3);
        terrain.reset();
        assert_eq!(terrain.queries(), 0);
    }
}

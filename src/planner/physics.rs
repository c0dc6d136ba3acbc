use nalgebra::{Isometry3, Translation3, UnitQuaternion};
use rapier3d::parry::query::ShapeCastOptions;
use rapier3d::parry::shape::Ball;
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::constants::EPSILON;
use super::terrain::{SurfaceId, SurfaceMask, TerrainHit, TerrainQuery};
use crate::error::TerrainError;

/// Collider primitive of a course surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceShape {
    #[default]
    Block,
    Ball,
    Cylinder,
    Wedge,
    /// Infinite ground plane through `position`, facing the rotated up axis.
    Plane,
}

impl SurfaceShape {
    pub fn name(self) -> &'static str {
        match self {
            SurfaceShape::Block => "block",
            SurfaceShape::Ball => "ball",
            SurfaceShape::Cylinder => "cylinder",
            SurfaceShape::Wedge => "wedge",
            SurfaceShape::Plane => "plane",
        }
    }
}

/// Placement of one surface in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePlacement {
    pub shape: SurfaceShape,
    pub position: [f32; 3],
    /// Euler angles in degrees (x, y, z)
    pub rotation: [f32; 3],
    /// Full extents; ignored for planes
    pub size: [f32; 3],
    /// Layer index 0-31
    pub layer: u32,
    /// Non-colliding surfaces become sensors and are invisible to queries
    pub can_collide: bool,
}

impl SurfacePlacement {
    pub fn block(position: [f32; 3], size: [f32; 3]) -> Self {
        Self {
            shape: SurfaceShape::Block,
            position,
            rotation: [0.0; 3],
            size,
            layer: 0,
            can_collide: true,
        }
    }

    pub fn plane(height: f32) -> Self {
        Self {
            shape: SurfaceShape::Plane,
            position: [0.0, height, 0.0],
            rotation: [0.0; 3],
            size: [1.0; 3],
            layer: 0,
            can_collide: true,
        }
    }

    pub fn with_shape(mut self, shape: SurfaceShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_rotation(mut self, rotation: [f32; 3]) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_collision(mut self, can_collide: bool) -> Self {
        self.can_collide = can_collide;
        self
    }
}

/// Builds a world pose from a position and Euler angles in degrees.
pub fn pose_from_euler(position: [f32; 3], rotation: [f32; 3]) -> Isometry3<f32> {
    let quat = UnitQuaternion::from_euler_angles(
        rotation[0].to_radians(),
        rotation[1].to_radians(),
        rotation[2].to_radians(),
    );
    Isometry3::from_parts(Translation3::new(position[0], position[1], position[2]), quat)
}

fn layer_group(id: SurfaceId, layer: u32) -> Result<Group, TerrainError> {
    if layer >= 32 {
        return Err(TerrainError::InvalidLayer(id, layer));
    }
    Ok(Group::from_bits_truncate(1u32 << layer))
}

/// Builds a collider with the correct shape for a given SurfaceShape and size.
fn build_collider(id: SurfaceId, placement: &SurfacePlacement) -> Result<Collider, TerrainError> {
    let [sx, sy, sz] = placement.size;
    if placement.shape != SurfaceShape::Plane && (sx <= 0.0 || sy <= 0.0 || sz <= 0.0) {
        return Err(TerrainError::InvalidSize(id, placement.size));
    }

    let shared_shape = match placement.shape {
        SurfaceShape::Block => SharedShape::cuboid(sx / 2.0, sy / 2.0, sz / 2.0),
        SurfaceShape::Ball => SharedShape::ball(sx / 2.0),
        SurfaceShape::Cylinder => SharedShape::cylinder(sy / 2.0, sx / 2.0),
        SurfaceShape::Wedge => {
            // Triangular prism: flat bottom, slope rises from +X to -X
            let hx = sx / 2.0;
            let hy = sy / 2.0;
            let hz = sz / 2.0;
            let points = [
                point![-hx, -hy, -hz],
                point![hx, -hy, -hz],
                point![-hx, -hy, hz],
                point![hx, -hy, hz],
                point![-hx, hy, -hz],
                point![-hx, hy, hz],
            ];
            SharedShape::convex_hull(&points)
                .ok_or(TerrainError::DegenerateShape(id, placement.shape.name()))?
        }
        SurfaceShape::Plane => SharedShape::halfspace(Vector::y_axis()),
    };

    let group = layer_group(id, placement.layer)?;
    Ok(ColliderBuilder::new(shared_shape)
        .position(pose_from_euler(placement.position, placement.rotation))
        .sensor(!placement.can_collide)
        .collision_groups(InteractionGroups::new(group, Group::ALL))
        .build())
}

/// Static course geometry backed by a Rapier3D query pipeline.
///
/// Surfaces are free colliders (no rigid bodies); moving a surface updates its collider
/// pose directly. Every mutation rebuilds the query acceleration structure, so the
/// terrain is always ready to query.
pub struct RapierTerrain {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub query_pipeline: QueryPipeline,
    island_manager: IslandManager,

    /// Maps surface ID to its collider handle
    surface_to_collider: HashMap<SurfaceId, ColliderHandle>,
    /// Maps collider handle to surface ID (reverse lookup for hits)
    collider_to_surface: HashMap<ColliderHandle, SurfaceId>,
    /// Placement each surface was built from
    placements: HashMap<SurfaceId, SurfacePlacement>,
}

impl RapierTerrain {
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
            island_manager: IslandManager::new(),
            surface_to_collider: HashMap::new(),
            collider_to_surface: HashMap::new(),
            placements: HashMap::new(),
        }
    }

    /// Adds a surface, replacing any existing surface with the same ID.
    pub fn add_surface(
        &mut self,
        id: SurfaceId,
        placement: SurfacePlacement,
    ) -> Result<ColliderHandle, TerrainError> {
        let collider = build_collider(id, &placement)?;
        self.detach(id);

        let handle = self.collider_set.insert(collider);
        self.surface_to_collider.insert(id, handle);
        self.collider_to_surface.insert(handle, id);
        self.placements.insert(id, placement);
        self.refresh();
        Ok(handle)
    }

    /// Removes a surface from the terrain
    pub fn remove_surface(&mut self, id: SurfaceId) -> bool {
        let removed = self.detach(id);
        if removed {
            self.refresh();
        }
        removed
    }

    /// Moves an existing surface (moving platforms, swinging obstacles)
    pub fn set_surface_pose(&mut self, id: SurfaceId, position: [f32; 3], rotation: [f32; 3]) -> bool {
        let Some(&handle) = self.surface_to_collider.get(&id) else {
            return false;
        };
        let Some(collider) = self.collider_set.get_mut(handle) else {
            return false;
        };
        collider.set_position(pose_from_euler(position, rotation));
        if let Some(placement) = self.placements.get_mut(&id) {
            placement.position = position;
            placement.rotation = rotation;
        }
        self.refresh();
        true
    }

    pub fn has_surface(&self, id: SurfaceId) -> bool {
        self.surface_to_collider.contains_key(&id)
    }

    pub fn surface_count(&self) -> usize {
        self.surface_to_collider.len()
    }

    pub fn placement(&self, id: SurfaceId) -> Option<&SurfacePlacement> {
        self.placements.get(&id)
    }

    /// Gets the surface ID for a collider handle
    pub fn surface_of(&self, handle: ColliderHandle) -> Option<SurfaceId> {
        self.collider_to_surface.get(&handle).copied()
    }

    /// Rebuilds the query acceleration structure from current collider poses
    pub fn refresh(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    fn detach(&mut self, id: SurfaceId) -> bool {
        let Some(handle) = self.surface_to_collider.remove(&id) else {
            return false;
        };
        self.collider_to_surface.remove(&handle);
        self.placements.remove(&id);
        self.collider_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.rigid_body_set,
            false,
        );
        true
    }

    fn filter(mask: SurfaceMask) -> QueryFilter<'static> {
        QueryFilter::default()
            .exclude_sensors()
            .groups(InteractionGroups::new(Group::ALL, Group::from_bits_truncate(mask.0)))
    }
}

impl Default for RapierTerrain {
    fn default() -> Self {
        Self::new()
    }
}

impl TerrainQuery for RapierTerrain {
    fn raycast(
        &self,
        origin: &Point<Real>,
        direction: &Vector<Real>,
        max_distance: f32,
        mask: SurfaceMask,
    ) -> Option<TerrainHit> {
        let ray = Ray::new(*origin, *direction);
        let (handle, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true, // solid
            Self::filter(mask),
        )?;

        Some(TerrainHit {
            point: ray.point_at(hit.time_of_impact),
            normal: hit.normal,
            distance: hit.time_of_impact,
            surface: self.surface_of(handle)?,
        })
    }

    fn spherecast(
        &self,
        origin: &Point<Real>,
        radius: f32,
        direction: &Vector<Real>,
        max_distance: f32,
        mask: SurfaceMask,
    ) -> Option<TerrainHit> {
        let ball = Ball::new(radius);
        let shape_pos = Isometry3::translation(origin.x, origin.y, origin.z);
        let (handle, hit) = self.query_pipeline.cast_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &shape_pos,
            direction,
            &ball,
            ShapeCastOptions::with_max_time_of_impact(max_distance),
            Self::filter(mask),
        )?;

        // Contact point is recovered by projecting the swept centre onto the hit collider
        let center = origin + direction * hit.time_of_impact;
        let collider = self.collider_set.get(handle)?;
        let projection = collider.shape().project_point(collider.position(), &center, false);
        let offset = center - projection.point;
        let normal = if !projection.is_inside && offset.norm() > EPSILON {
            offset.normalize()
        } else {
            -direction
        };

        Some(TerrainHit {
            point: projection.point,
            normal,
            distance: hit.time_of_impact,
            surface: self.surface_of(handle)?,
        })
    }

    fn closest_point(&self, surface: SurfaceId, point: &Point<Real>) -> Option<Point<Real>> {
        let handle = self.surface_to_collider.get(&surface)?;
        let collider = self.collider_set.get(*handle)?;
        Some(collider.shape().project_point(collider.position(), point, false).point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down() -> Vector<Real> {
        vector![0.0, -1.0, 0.0]
    }

    #[test]
    fn test_raycast_finds_floor_top() {
        let mut terrain = RapierTerrain::new();
        terrain
            .add_surface(SurfaceId(1), SurfacePlacement::block([0.0, 0.0, 0.0], [100.0, 1.0, 100.0]))
            .unwrap();

        let hit = terrain
            .raycast(&point![0.0, 6.0, 0.0], &down(), 10.0, SurfaceMask::ALL)
            .expect("Should detect floor");

        // Floor top at Y=0.5, distance = 5.5
        assert!((hit.distance - 5.5).abs() < 1.0e-3, "got {}", hit.distance);
        assert!((hit.point.y - 0.5).abs() < 1.0e-3);
        assert!(hit.normal.y > 0.99);
        assert_eq!(hit.surface, SurfaceId(1));
    }

    #[test]
    fn test_raycast_respects_max_distance_and_mask() {
        let mut terrain = RapierTerrain::new();
        terrain
            .add_surface(
                SurfaceId(1),
                SurfacePlacement::block([0.0, 0.0, 0.0], [10.0, 1.0, 10.0]).with_layer(3),
            )
            .unwrap();

        let origin = point![0.0, 3.0, 0.0];
        assert!(terrain.raycast(&origin, &down(), 2.0, SurfaceMask::ALL).is_none());
        assert!(terrain.raycast(&origin, &down(), 5.0, SurfaceMask::layer(0)).is_none());
        assert!(terrain.raycast(&origin, &down(), 5.0, SurfaceMask::layer(3)).is_some());
    }

    #[test]
    fn test_non_colliding_surfaces_are_ignored() {
        let mut terrain = RapierTerrain::new();
        terrain
            .add_surface(SurfaceId(1), SurfacePlacement::plane(0.0))
            .unwrap();
        // Non-collidable trigger volume floating above the floor
        terrain
            .add_surface(
                SurfaceId(2),
                SurfacePlacement::block([0.0, 2.0, 0.0], [4.0, 1.0, 4.0]).with_collision(false),
            )
            .unwrap();

        let hit = terrain
            .raycast(&point![0.0, 5.0, 0.0], &down(), 10.0, SurfaceMask::ALL)
            .unwrap();
        assert_eq!(hit.surface, SurfaceId(1));
        assert!(hit.point.y.abs() < 1.0e-3);
    }

    #[test]
    fn test_spherecast_reports_contact_on_surface() {
        let mut terrain = RapierTerrain::new();
        terrain
            .add_surface(SurfaceId(7), SurfacePlacement::plane(0.0))
            .unwrap();

        let hit = terrain
            .spherecast(&point![1.0, 1.0, 2.0], 0.25, &down(), 2.0, SurfaceMask::ALL)
            .expect("sphere should reach the plane");

        // Sphere centre travels 0.75 before touching the plane
        assert!((hit.distance - 0.75).abs() < 1.0e-2, "got {}", hit.distance);
        assert!(hit.point.y.abs() < 1.0e-2);
        assert!((hit.point.x - 1.0).abs() < 1.0e-2 && (hit.point.z - 2.0).abs() < 1.0e-2);
        assert!(hit.normal.y > 0.99);
        assert_eq!(hit.surface, SurfaceId(7));
    }

    #[test]
    fn test_closest_point_on_block_edge() {
        let mut terrain = RapierTerrain::new();
        terrain
            .add_surface(SurfaceId(1), SurfacePlacement::block([0.0, -0.5, 0.0], [2.0, 1.0, 2.0]))
            .unwrap();

        let closest = terrain
            .closest_point(SurfaceId(1), &point![0.0, 0.0, 3.0])
            .unwrap();
        assert!((closest.z - 1.0).abs() < 1.0e-3);
        assert!(closest.y.abs() < 1.0e-3);
        assert!(terrain.closest_point(SurfaceId(9), &point![0.0, 0.0, 0.0]).is_none());
    }

    #[test]
    fn test_wedge_slope_normal_is_tilted() {
        let mut terrain = RapierTerrain::new();
        terrain
            .add_surface(
                SurfaceId(1),
                SurfacePlacement::block([0.0, 0.0, 0.0], [4.0, 2.0, 4.0]).with_shape(SurfaceShape::Wedge),
            )
            .unwrap();

        let hit = terrain
            .raycast(&point![0.0, 5.0, 0.0], &down(), 10.0, SurfaceMask::ALL)
            .unwrap();
        assert!(hit.normal.y < 0.99 && hit.normal.y > 0.5, "normal {:?}", hit.normal);
        assert!(hit.normal.x > 0.0, "slope rises toward -X so it faces +X");
    }

    #[test]
    fn test_moving_and_removing_surfaces() {
        let mut terrain = RapierTerrain::new();
        terrain
            .add_surface(SurfaceId(1), SurfacePlacement::block([0.0, 0.0, 0.0], [2.0, 1.0, 2.0]))
            .unwrap();

        let origin = point![0.0, 5.0, 0.0];
        assert!(terrain.raycast(&origin, &down(), 10.0, SurfaceMask::ALL).is_some());

        assert!(terrain.set_surface_pose(SurfaceId(1), [10.0, 0.0, 0.0], [0.0; 3]));
        assert!(terrain.raycast(&origin, &down(), 10.0, SurfaceMask::ALL).is_none());
        assert_eq!(terrain.placement(SurfaceId(1)).unwrap().position, [10.0, 0.0, 0.0]);

        assert!(terrain.remove_surface(SurfaceId(1)));
        assert!(!terrain.remove_surface(SurfaceId(1)));
        assert_eq!(terrain.surface_count(), 0);
        assert!(terrain
            .raycast(&point![10.0, 5.0, 0.0], &down(), 10.0, SurfaceMask::ALL)
            .is_none());
    }

    #[test]
    fn test_invalid_placements_are_rejected() {
        let mut terrain = RapierTerrain::new();
        let err = terrain
            .add_surface(SurfaceId(1), SurfacePlacement::block([0.0; 3], [1.0, 0.0, 1.0]))
            .unwrap_err();
        assert!(matches!(err, TerrainError::InvalidSize(SurfaceId(1), _)));

        let err = terrain
            .add_surface(
                SurfaceId(2),
                SurfacePlacement::block([0.0; 3], [1.0, 1.0, 1.0]).with_layer(32),
            )
            .unwrap_err();
        assert!(matches!(err, TerrainError::InvalidLayer(SurfaceId(2), 32)));
        assert_eq!(terrain.surface_count(), 0);
    }
}

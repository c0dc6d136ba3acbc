//! Heading math and polyline utilities shared by the planner and the sensors.
//!
//! Headings are yaw angles in degrees about world up (+Y). A heading of 0 faces +Z and
//! positive angles turn toward +X, so `heading_direction(90.0)` is `(1, 0, 0)`.

use nalgebra::{Point3, Rotation3, Vector2, Vector3};

use super::constants::EPSILON;

/// World up axis.
pub fn up() -> Vector3<f32> {
    Vector3::y()
}

/// Rotates a vector about world up by `degrees`.
pub fn rotate_about_up(v: &Vector3<f32>, degrees: f32) -> Vector3<f32> {
    Rotation3::from_axis_angle(&Vector3::y_axis(), degrees.to_radians()) * v
}

/// Unit horizontal direction for a yaw in degrees.
pub fn heading_direction(degrees: f32) -> Vector3<f32> {
    let rad = degrees.to_radians();
    Vector3::new(rad.sin(), 0.0, rad.cos())
}

/// Drops the vertical component of a world direction, keeping x/z as a 2D movement value.
pub fn planar(v: &Vector3<f32>) -> Vector2<f32> {
    Vector2::new(v.x, v.z)
}

/// Shortest signed difference `to - from`, wrapped into (-180, 180].
pub fn delta_angle(from: f32, to: f32) -> f32 {
    let mut delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    delta
}

/// Interpolates between two angles along the shortest arc. `t` is clamped to [0, 1].
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    from + delta_angle(from, to) * t.clamp(0.0, 1.0)
}

/// Signed yaw (degrees) turning `from` onto `to`, measured in the horizontal plane.
/// Returns 0 when either vector has no horizontal extent.
pub fn signed_angle_about_up(from: &Vector3<f32>, to: &Vector3<f32>) -> f32 {
    let a = Vector2::new(from.x, from.z);
    let b = Vector2::new(to.x, to.z);
    if a.norm_squared() < EPSILON * EPSILON || b.norm_squared() < EPSILON * EPSILON {
        return 0.0;
    }
    // z-forward/x-right is a left-handed view from above, hence the swapped cross term
    let cross = a.y * b.x - a.x * b.y;
    cross.atan2(a.dot(&b)).to_degrees()
}

/// Distance between two points ignoring height.
pub fn horizontal_distance(a: &Point3<f32>, b: &Point3<f32>) -> f32 {
    let d = b - a;
    (d.x * d.x + d.z * d.z).sqrt()
}

fn distance_to_segment(p: &Point3<f32>, a: &Point3<f32>, b: &Point3<f32>) -> f32 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < EPSILON * EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Douglas-Peucker polyline simplification with reusable scratch space.
///
/// Endpoints are always kept. Interior points survive only when they deviate from the
/// simplified chord by more than the tolerance.
#[derive(Debug, Default)]
pub struct PolylineSimplifier {
    keep: Vec<bool>,
    ranges: Vec<(usize, usize)>,
}

impl PolylineSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes the simplified polyline into `out`, replacing its contents.
    pub fn simplify(&mut self, points: &[Point3<f32>], tolerance: f32, out: &mut Vec<Point3<f32>>) {
        out.clear();
        if points.len() < 3 {
            out.extend_from_slice(points);
            return;
        }

        let last = points.len() - 1;
        self.keep.clear();
        self.keep.resize(points.len(), false);
        self.keep[0] = true;
        self.keep[last] = true;

        self.ranges.clear();
        self.ranges.push((0, last));

        while let Some((start, end)) = self.ranges.pop() {
            if end <= start + 1 {
                continue;
            }

            let mut max_distance = 0.0_f32;
            let mut split = start;
            for i in (start + 1)..end {
                let d = distance_to_segment(&points[i], &points[start], &points[end]);
                if d > max_distance {
                    max_distance = d;
                    split = i;
                }
            }

            if max_distance > tolerance {
                self.keep[split] = true;
                self.ranges.push((start, split));
                self.ranges.push((split, end));
            }
        }

        out.extend(
            points
                .iter()
                .zip(&self.keep)
                .filter(|(_, keep)| **keep)
                .map(|(p, _)| *p),
        );
    }
}

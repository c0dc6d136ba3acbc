//! Ballistic arc simulation for jumps and drops.

use nalgebra::{Point3, Vector3};

use super::geometry::{rotate_about_up, PolylineSimplifier};
use crate::config::TrajectoryConfig;

/// Segments of a ballistic flight under constant gravity (semi-implicit Euler: each step
/// advances position with the current velocity, then applies gravity to the velocity).
#[derive(Debug, Clone)]
pub struct BallisticArc {
    position: Point3<f32>,
    velocity: Vector3<f32>,
    gravity: f32,
    dt: f32,
    remaining: u32,
}

impl BallisticArc {
    pub fn new(origin: Point3<f32>, velocity: Vector3<f32>, gravity: f32, dt: f32, steps: u32) -> Self {
        Self {
            position: origin,
            velocity,
            gravity,
            dt,
            remaining: steps,
        }
    }
}

impl Iterator for BallisticArc {
    type Item = (Point3<f32>, Point3<f32>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let start = self.position;
        let end = start + self.velocity * self.dt;
        self.velocity.y -= self.gravity * self.dt;
        self.position = end;
        Some((start, end))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

/// Produces simplified flight polylines for the search engine.
///
/// Scratch buffers are reused between calls; the returned slice is only valid until the
/// next call.
#[derive(Debug)]
pub struct TrajectorySimulator {
    config: TrajectoryConfig,
    gravity: f32,
    raw: Vec<Point3<f32>>,
    simplified: Vec<Point3<f32>>,
    simplifier: PolylineSimplifier,
}

impl TrajectorySimulator {
    pub fn new(config: TrajectoryConfig, gravity: f32) -> Self {
        let capacity = config.step_count as usize + 1;
        Self {
            config,
            gravity,
            raw: Vec::with_capacity(capacity),
            simplified: Vec::with_capacity(capacity),
            simplifier: PolylineSimplifier::new(),
        }
    }

    /// Simulates a launch from `origin` with `relative_velocity` given in the local
    /// (right, up, forward) frame of a runner facing `heading` degrees.
    pub fn simulate(
        &mut self,
        origin: Point3<f32>,
        heading: f32,
        relative_velocity: Vector3<f32>,
    ) -> &[Point3<f32>] {
        let velocity = rotate_about_up(&relative_velocity, heading);
        let arc = BallisticArc::new(
            origin,
            velocity,
            self.gravity,
            self.config.step_interval,
            self.config.step_count,
        );

        self.raw.clear();
        self.raw.push(origin);
        self.raw.extend(arc.map(|(_, end)| end));

        self.simplifier
            .simplify(&self.raw, self.config.simplification_tolerance, &mut self.simplified);
        &self.simplified
    }

    /// Unsimplified points of the last simulated arc
    pub fn raw_points(&self) -> &[Point3<f32>] {
        &self.raw
    }
}

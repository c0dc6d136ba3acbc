use nalgebra::{Point3, Vector2};
use serde::{Deserialize, Serialize};

use super::terrain::SurfaceId;

/// Virtual control signal consumed by the movement controller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlInput {
    /// World-space heading on the x/z plane, unit length while running
    pub movement: Vector2<f32>,
    pub jump: bool,
}

impl ControlInput {
    pub fn new(movement: Vector2<f32>, jump: bool) -> Self {
        Self { movement, jump }
    }

    /// Neutral input: no movement, no jump
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn is_neutral(&self) -> bool {
        !self.jump && self.movement == Vector2::zeros()
    }
}

impl std::fmt::Display for ControlInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Input(movement=({:.3}, {:.3}), jump={})",
            self.movement.x, self.movement.y, self.jump
        )
    }
}

/// How a search state was reached from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Walk,
    Climb,
    Jump,
    Drop,
}

impl Transition {
    pub fn is_airborne(self) -> bool {
        matches!(self, Transition::Jump | Transition::Drop)
    }
}

/// One node of the path search. Transitions build a new state; nothing is mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchState {
    pub step_count: u32,
    /// Heading in degrees relative to the runner's base orientation
    pub current_angle: f32,
    pub current_position: Point3<f32>,
    pub previous_position: Point3<f32>,
    pub surface: SurfaceId,
    /// Input chosen on the first transition out of the root; never overwritten
    pub first_input: Option<ControlInput>,
    /// Multiplicative confidence, decays on risky transitions
    pub quality: f32,
}

impl SearchState {
    /// Root state resting on `surface`.
    pub fn root(position: Point3<f32>, angle: f32, surface: SurfaceId) -> Self {
        Self {
            step_count: 0,
            current_angle: angle,
            current_position: position,
            previous_position: position,
            surface,
            first_input: None,
            quality: 1.0,
        }
    }

    /// Child state one step deeper. `quality_factor` is clamped to (0, 1] so quality never
    /// grows along a path.
    pub fn next(
        &self,
        position: Point3<f32>,
        angle: f32,
        surface: SurfaceId,
        input: ControlInput,
        quality_factor: f32,
    ) -> Self {
        Self {
            step_count: self.step_count + 1,
            current_angle: angle,
            current_position: position,
            previous_position: self.current_position,
            surface,
            first_input: self.first_input.or(Some(input)),
            quality: self.quality * quality_factor.clamp(f32::MIN_POSITIVE, 1.0),
        }
    }

    pub fn is_root(&self) -> bool {
        self.step_count == 0
    }
}

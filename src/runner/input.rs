use crate::planner::ControlInput;

/// Virtual input hub between the decision layers and the movement controller.
///
/// Decision layers write through [`update`](Self::update), which is refused while the
/// hub is locked (cutscenes, respawns). Resets always go through.
#[derive(Debug, Clone, Default)]
pub struct VirtualInput {
    input: ControlInput,
    locked: bool,
}

impl VirtualInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> ControlInput {
        self.input
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Applies `edit` unless locked. Returns whether the edit was applied.
    pub fn update(&mut self, edit: impl FnOnce(&mut ControlInput)) -> bool {
        if self.locked {
            return false;
        }
        self.force_update(edit);
        true
    }

    pub fn force_update(&mut self, edit: impl FnOnce(&mut ControlInput)) {
        edit(&mut self.input);
    }

    pub fn reset(&mut self) {
        self.force_update(|input| *input = ControlInput::neutral());
    }

    pub fn reset_and_lock(&mut self) {
        self.reset();
        self.locked = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;

    #[test]
    fn test_locked_input_refuses_updates_but_resets() {
        let mut hub = VirtualInput::new();
        assert!(hub.update(|i| *i = ControlInput::new(Vector2::new(0.0, 1.0), true)));
        assert!(hub.current().jump);

        hub.reset_and_lock();
        assert!(hub.is_locked());
        assert!(hub.current().is_neutral());

        assert!(!hub.update(|i| i.jump = true));
        assert!(!hub.current().jump);

        hub.force_update(|i| i.movement = Vector2::new(1.0, 0.0));
        assert_eq!(hub.current().movement, Vector2::new(1.0, 0.0));

        hub.unlock();
        assert!(hub.update(|i| i.jump = true));
        assert!(hub.current().jump);
    }
}

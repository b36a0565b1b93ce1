use winit::keyboard::{KeyCode, PhysicalKey};

use crate::render::CameraMovement;

/// One-shot commands triggered on key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    CycleCamera,
    ToggleAnimations,
    Quit,
}

#[derive(Default, Debug, Clone, Copy)]
pub struct InputState {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub aim_left: bool,
    pub aim_right: bool,
    pub aim_up: bool,
    pub aim_down: bool,
}

impl InputState {
    pub fn handle_key(&mut self, key: PhysicalKey, pressed: bool) -> Option<InputAction> {
        let PhysicalKey::Code(code) = key else {
            return None;
        };
        match code {
            KeyCode::ArrowLeft => self.aim_left = pressed,
            KeyCode::ArrowRight => self.aim_right = pressed,
            KeyCode::ArrowUp => self.aim_up = pressed,
            KeyCode::ArrowDown => self.aim_down = pressed,
            KeyCode::KeyW => self.move_forward = pressed,
            KeyCode::KeyS => self.move_backward = pressed,
            KeyCode::KeyA => self.move_left = pressed,
            KeyCode::KeyD => self.move_right = pressed,
            KeyCode::KeyE => self.move_up = pressed,
            KeyCode::KeyQ => self.move_down = pressed,
            KeyCode::KeyC if pressed => return Some(InputAction::CycleCamera),
            KeyCode::KeyP if pressed => return Some(InputAction::ToggleAnimations),
            KeyCode::Escape if pressed => return Some(InputAction::Quit),
            _ => {}
        }
        None
    }

    pub fn to_movement(&self) -> CameraMovement {
        CameraMovement {
            move_forward: self.move_forward,
            move_backward: self.move_backward,
            move_left: self.move_left,
            move_right: self.move_right,
            move_up: self.move_up,
            move_down: self.move_down,
            aim_left: self.aim_left,
            aim_right: self.aim_right,
            aim_up: self.aim_up,
            aim_down: self.aim_down,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_keys_map_to_movement() {
        let mut input = InputState::default();
        input.handle_key(PhysicalKey::Code(KeyCode::KeyW), true);
        input.handle_key(PhysicalKey::Code(KeyCode::ArrowLeft), true);
        input.handle_key(PhysicalKey::Code(KeyCode::KeyQ), true);
        let movement = input.to_movement();
        assert!(movement.move_forward);
        assert!(movement.aim_left);
        assert!(movement.move_down);
        assert!(!movement.move_up);

        input.handle_key(PhysicalKey::Code(KeyCode::KeyW), false);
        assert!(!input.to_movement().move_forward);
    }

    #[test]
    fn actions_fire_on_press_only() {
        let mut input = InputState::default();
        assert_eq!(
            input.handle_key(PhysicalKey::Code(KeyCode::KeyC), true),
            Some(InputAction::CycleCamera)
        );
        assert_eq!(input.handle_key(PhysicalKey::Code(KeyCode::KeyC), false), None);
        assert_eq!(
            input.handle_key(PhysicalKey::Code(KeyCode::Escape), true),
            Some(InputAction::Quit)
        );
        assert_eq!(input.handle_key(PhysicalKey::Code(KeyCode::KeyZ), true), None);
    }
}

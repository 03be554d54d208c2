//! Input state management for pointer and keyboard events.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Key name reported for the space bar.
pub const KEY_SPACE: &str = "Space";

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event in screen coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
    },
    Up {
        position: Point,
        button: MouseButton,
    },
    Move {
        position: Point,
    },
    Scroll {
        position: Point,
        delta: Vec2,
    },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Move { position }
            | PointerEvent::Scroll { position, .. } => *position,
        }
    }
}

/// Keyboard event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
}

/// Tracks held buttons, keys and modifiers across events.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Current pointer position in screen coordinates.
    pub pointer_position: Point,
    /// Currently pressed mouse buttons.
    pressed_buttons: HashSet<MouseButton>,
    /// Current modifier keys state.
    pub modifiers: Modifiers,
    /// Currently pressed keys.
    pressed_keys: HashSet<String>,
}

impl InputState {
    /// Create a new input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a pointer event.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) {
        match event {
            PointerEvent::Down { position, button } => {
                self.pointer_position = *position;
                self.pressed_buttons.insert(*button);
            }
            PointerEvent::Up { position, button } => {
                self.pointer_position = *position;
                self.pressed_buttons.remove(button);
            }
            PointerEvent::Move { position } | PointerEvent::Scroll { position, .. } => {
                self.pointer_position = *position;
            }
        }
    }

    /// Process a key event.
    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        match event {
            KeyEvent::Pressed(key) => {
                self.pressed_keys.insert(key.clone());
            }
            KeyEvent::Released(key) => {
                self.pressed_keys.remove(key);
            }
        }
    }

    /// Update modifier keys state.
    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    /// Check if a button is currently pressed.
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    /// Check if a key is currently pressed.
    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.pressed_keys.contains(key)
    }

    /// Space held turns any drag into a pan.
    pub fn is_space_held(&self) -> bool {
        self.is_key_pressed(KEY_SPACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_press_and_release() {
        let mut input = InputState::new();

        input.handle_pointer_event(&PointerEvent::Down {
            position: Point::new(100.0, 100.0),
            button: MouseButton::Left,
        });
        assert!(input.is_button_pressed(MouseButton::Left));
        assert!(!input.is_button_pressed(MouseButton::Right));

        input.handle_pointer_event(&PointerEvent::Up {
            position: Point::new(120.0, 100.0),
            button: MouseButton::Left,
        });
        assert!(!input.is_button_pressed(MouseButton::Left));
        assert_eq!(input.pointer_position, Point::new(120.0, 100.0));
    }

    #[test]
    fn test_space_tracking() {
        let mut input = InputState::new();
        input.handle_key_event(&KeyEvent::Pressed(KEY_SPACE.to_string()));
        assert!(input.is_space_held());
        input.handle_key_event(&KeyEvent::Released(KEY_SPACE.to_string()));
        assert!(!input.is_space_held());
    }

    #[test]
    fn test_command_modifier() {
        let mut input = InputState::new();
        assert!(!input.modifiers.command());
        input.set_modifiers(Modifiers { meta: true, ..Default::default() });
        assert!(input.modifiers.command());
    }

    #[test]
    fn test_event_position() {
        let e = PointerEvent::Scroll {
            position: Point::new(4.0, 2.0),
            delta: Vec2::new(0.0, 10.0),
        };
        assert_eq!(e.position(), Point::new(4.0, 2.0));
    }
}

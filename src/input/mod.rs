//! Keyboard and mouse state accumulated between frames

use glam::Vec2;
use std::collections::HashSet;

/// Keys the sandbox reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Q,
    F,
    F3,
    Space,
    Return,
    Left,
    Right,
    Up,
    Down,
    Shift,
    Control,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MouseButtons: u8 {
        const LEFT = 0x01;
        const RIGHT = 0x02;
        const MIDDLE = 0x04;
    }
}

#[derive(Debug, Default)]
pub struct InputState {
    keys_down: HashSet<Key>,
    keys_pressed: Vec<Key>,
    mouse_down: MouseButtons,
    mouse_pressed: MouseButtons,
    mouse_released: MouseButtons,
    mouse_point: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: Key) {
        // Auto-repeat does not count as a new press
        if self.keys_down.insert(key) {
            self.keys_pressed.push(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        self.keys_down.remove(&key);
    }

    pub fn mouse_button(&mut self, button: MouseButtons, pressed: bool) {
        if pressed {
            self.mouse_down.insert(button);
            self.mouse_pressed.insert(button);
        } else {
            self.mouse_down.remove(button);
            self.mouse_released.insert(button);
        }
    }

    pub fn mouse_moved(&mut self, point: Vec2) {
        self.mouse_point = point;
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    /// First key that went down since the last clear
    pub fn first_pressed(&self) -> Option<Key> {
        self.keys_pressed.first().copied()
    }

    pub fn mouse_pressed(&self) -> MouseButtons {
        self.mouse_pressed
    }

    pub fn mouse_released(&self) -> MouseButtons {
        self.mouse_released
    }

    pub fn mouse_down(&self) -> MouseButtons {
        self.mouse_down
    }

    pub fn mouse_point(&self) -> Vec2 {
        self.mouse_point
    }

    /// Forget edge-triggered state; held keys and buttons stay down
    pub fn clear_key_cache(&mut self) {
        self.keys_pressed.clear();
        self.mouse_pressed = MouseButtons::empty();
        self.mouse_released = MouseButtons::empty();
    }

    /// Drop everything, e.g. when the window loses focus
    pub fn release_all(&mut self) {
        self.keys_down.clear();
        self.mouse_down = MouseButtons::empty();
        self.clear_key_cache();
    }
}

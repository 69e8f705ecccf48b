use std::collections::HashSet;

use glam::Vec2;
use meshview_core::MoveKeys;
use meshview_core::camera::OrbitInput;
use sdl2::event::Event;
use sdl2::{keyboard::Keycode, mouse::MouseButton};

/// The current state of the keyboard.
#[derive(Default)]
pub struct KeyboardState {
    pub down: HashSet<Keycode>,
}

impl KeyboardState {
    pub fn shift(&self) -> bool {
        self.down.contains(&Keycode::LShift) || self.down.contains(&Keycode::RShift)
    }

    /// WASD thrust keys currently held.
    pub fn move_keys(&self) -> MoveKeys {
        MoveKeys {
            forward: self.down.contains(&Keycode::W),
            back: self.down.contains(&Keycode::S),
            left: self.down.contains(&Keycode::A),
            right: self.down.contains(&Keycode::D),
        }
    }
}

/// The current state of the mouse.
#[derive(Default)]
pub struct MouseState {
    pub delta: Vec2,
    pub down: HashSet<MouseButton>,
    pub scroll_delta: Vec2,
}

impl MouseState {
    pub fn left(&self) -> bool {
        self.down.contains(&MouseButton::Left)
    }

    pub fn right(&self) -> bool {
        self.down.contains(&MouseButton::Right)
    }
}

/// Keyboard and mouse state accumulated from window events.
#[derive(Default)]
pub struct InputState {
    pub keyboard: KeyboardState,
    pub mouse: MouseState,
}

impl InputState {
    /// Clears the per-frame deltas. Held keys and buttons persist.
    pub fn begin_frame(&mut self) {
        self.mouse.delta = Vec2::ZERO;
        self.mouse.scroll_delta = Vec2::ZERO;
    }

    pub fn handle_event(&mut self, event: &Event) {
        match event {
            Event::MouseMotion { xrel, yrel, .. } => {
                self.mouse.delta += Vec2::new(*xrel as f32, *yrel as f32);
            }
            Event::MouseWheel { x, y, .. } => {
                self.mouse.scroll_delta += Vec2::new(*x as f32, *y as f32);
            }
            Event::MouseButtonDown { mouse_btn, .. } => {
                self.mouse.down.insert(*mouse_btn);
            }
            Event::MouseButtonUp { mouse_btn, .. } => {
                self.mouse.down.remove(mouse_btn);
            }
            Event::KeyDown {
                keycode: Some(keycode),
                repeat: false,
                ..
            } => {
                self.keyboard.down.insert(*keycode);
            }
            Event::KeyUp {
                keycode: Some(keycode),
                repeat: false,
                ..
            } => {
                self.keyboard.down.remove(keycode);
            }
            // Focus loss swallows the matching key-up events.
            Event::Window {
                win_event: sdl2::event::WindowEvent::FocusLost,
                ..
            } => {
                self.keyboard.down.clear();
                self.mouse.down.clear();
            }
            _ => {}
        }
    }
}

/// Context provided to the camera controllers during the update phase.
pub struct UpdateContext<'a> {
    pub keyboard: &'a KeyboardState,
    pub mouse: &'a MouseState,
    pub delta_time: f32,
}

impl<'a> UpdateContext<'a> {
    /// Creates a new `UpdateContext` from the given keyboard and mouse states and delta time.
    pub fn new(input: &'a InputState, delta_time: f32) -> Self {
        Self {
            keyboard: &input.keyboard,
            mouse: &input.mouse,
            delta_time,
        }
    }

    /// Orbit amounts from this frame's mouse drag and wheel.
    pub fn orbit_input(&self, focus: f32) -> OrbitInput {
        OrbitInput::from_mouse(
            self.mouse.delta,
            self.mouse.left(),
            self.mouse.right(),
            self.keyboard.shift(),
            self.mouse.scroll_delta.y,
            focus,
        )
    }
}

#[cfg(test)]
mod tests {
    use sdl2::keyboard::Mod;

    use super::*;

    fn key(keycode: Keycode, down: bool) -> Event {
        if down {
            Event::KeyDown {
                timestamp: 0,
                window_id: 0,
                keycode: Some(keycode),
                scancode: None,
                keymod: Mod::NOMOD,
                repeat: false,
            }
        } else {
            Event::KeyUp {
                timestamp: 0,
                window_id: 0,
                keycode: Some(keycode),
                scancode: None,
                keymod: Mod::NOMOD,
                repeat: false,
            }
        }
    }

    #[test]
    fn held_keys_survive_frames() {
        let mut input = InputState::default();
        input.handle_event(&key(Keycode::W, true));
        input.handle_event(&key(Keycode::D, true));
        input.mouse.delta = Vec2::ONE;

        input.begin_frame();
        assert_eq!(input.mouse.delta, Vec2::ZERO);
        let keys = input.keyboard.move_keys();
        assert!(keys.forward && keys.right && !keys.back && !keys.left);

        input.handle_event(&key(Keycode::W, false));
        assert!(!input.keyboard.move_keys().forward);
        assert!(input.keyboard.down.contains(&Keycode::D));
    }

    #[test]
    fn shift_changes_drag_to_pan() {
        let mut input = InputState::default();
        input.mouse.down.insert(MouseButton::Left);
        input.mouse.delta = Vec2::new(10.0, 0.0);
        let rotate = UpdateContext::new(&input, 0.016).orbit_input(1.0);
        assert!(rotate.rotate.x > 0.0);
        assert_eq!(rotate.pan, Vec2::ZERO);

        input.handle_event(&key(Keycode::LShift, true));
        let pan = UpdateContext::new(&input, 0.016).orbit_input(1.0);
        assert_eq!(pan.rotate, Vec2::ZERO);
        assert!(pan.pan.x != 0.0);
    }
}

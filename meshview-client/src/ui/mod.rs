//! Immediate-mode widgets drawn over the scene with egui.
//!
//! [`Gui`] feeds SDL events to egui, runs the widget code once per frame and
//! paints the result through `egui_glow`. The painter manages its own GL
//! state, so the tracked bind state is reset after every paint.

pub mod panels;

use egui::{Modifiers, PointerButton, Pos2, Vec2 as EguiVec2};
use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::{Keycode, Mod};
use sdl2::mouse::MouseButton;

use crate::abs::{GlError, Window};

const KEYS: [(Keycode, egui::Key); 22] = [
    (Keycode::Left, egui::Key::ArrowLeft),
    (Keycode::Right, egui::Key::ArrowRight),
    (Keycode::Up, egui::Key::ArrowUp),
    (Keycode::Down, egui::Key::ArrowDown),
    (Keycode::Escape, egui::Key::Escape),
    (Keycode::Tab, egui::Key::Tab),
    (Keycode::Backspace, egui::Key::Backspace),
    (Keycode::Return, egui::Key::Enter),
    (Keycode::KpEnter, egui::Key::Enter),
    (Keycode::Space, egui::Key::Space),
    (Keycode::Insert, egui::Key::Insert),
    (Keycode::Delete, egui::Key::Delete),
    (Keycode::Home, egui::Key::Home),
    (Keycode::End, egui::Key::End),
    (Keycode::PageUp, egui::Key::PageUp),
    (Keycode::PageDown, egui::Key::PageDown),
    (Keycode::A, egui::Key::A),
    (Keycode::C, egui::Key::C),
    (Keycode::V, egui::Key::V),
    (Keycode::X, egui::Key::X),
    (Keycode::Y, egui::Key::Y),
    (Keycode::Z, egui::Key::Z),
];

fn egui_key(keycode: Keycode) -> Option<egui::Key> {
    KEYS.iter()
        .find(|(k, _)| *k == keycode)
        .map(|(_, key)| *key)
}

fn egui_modifiers(keymod: Mod) -> Modifiers {
    let ctrl = keymod.intersects(Mod::LCTRLMOD | Mod::RCTRLMOD);
    Modifiers {
        alt: keymod.intersects(Mod::LALTMOD | Mod::RALTMOD),
        ctrl,
        shift: keymod.intersects(Mod::LSHIFTMOD | Mod::RSHIFTMOD),
        mac_cmd: false,
        command: ctrl,
    }
}

fn egui_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

/// Translates one SDL event into egui input, tracking modifier state.
fn translate(event: &Event, modifiers: &mut Modifiers) -> Option<egui::Event> {
    match event {
        Event::MouseMotion { x, y, .. } => {
            Some(egui::Event::PointerMoved(Pos2::new(*x as f32, *y as f32)))
        }
        Event::MouseButtonDown {
            mouse_btn, x, y, ..
        }
        | Event::MouseButtonUp {
            mouse_btn, x, y, ..
        } => Some(egui::Event::PointerButton {
            pos: Pos2::new(*x as f32, *y as f32),
            button: egui_button(*mouse_btn)?,
            pressed: matches!(event, Event::MouseButtonDown { .. }),
            modifiers: *modifiers,
        }),
        Event::MouseWheel { x, y, .. } => Some(egui::Event::MouseWheel {
            unit: egui::MouseWheelUnit::Line,
            delta: EguiVec2::new(*x as f32, *y as f32),
            modifiers: *modifiers,
        }),
        Event::TextInput { text, .. } => Some(egui::Event::Text(text.clone())),
        Event::KeyDown {
            keycode, keymod, repeat, ..
        }
        | Event::KeyUp {
            keycode, keymod, repeat, ..
        } => {
            *modifiers = egui_modifiers(*keymod);
            let pressed = matches!(event, Event::KeyDown { .. });
            let key = egui_key((*keycode)?)?;
            if pressed && modifiers.command && !*repeat {
                match key {
                    egui::Key::C => return Some(egui::Event::Copy),
                    egui::Key::X => return Some(egui::Event::Cut),
                    _ => {}
                }
            }
            Some(egui::Event::Key {
                key,
                physical_key: None,
                pressed,
                repeat: *repeat,
                modifiers: *modifiers,
            })
        }
        Event::Window {
            win_event: WindowEvent::FocusLost,
            ..
        } => {
            *modifiers = Modifiers::default();
            Some(egui::Event::WindowFocused(false))
        }
        Event::Window {
            win_event: WindowEvent::FocusGained,
            ..
        } => Some(egui::Event::WindowFocused(true)),
        Event::Window {
            win_event: WindowEvent::Leave,
            ..
        } => Some(egui::Event::PointerGone),
        _ => None,
    }
}

/// The egui context and its GL painter.
pub struct Gui {
    ctx: egui::Context,
    painter: egui_glow::Painter,
    events: Vec<egui::Event>,
    modifiers: Modifiers,
}

impl Gui {
    pub fn new(window: &Window) -> Result<Self, GlError> {
        let painter = egui_glow::Painter::new(window.glow().clone(), "", None, false)
            .map_err(|e| GlError::Init(format!("egui painter: {}", e)))?;
        Ok(Self {
            ctx: egui::Context::default(),
            painter,
            events: Vec::new(),
            modifiers: Modifiers::default(),
        })
    }

    /// Queues `event` for the next frame.
    pub fn handle_event(&mut self, event: &Event) {
        if let Some(event) = translate(event, &mut self.modifiers) {
            self.events.push(event);
        }
    }

    /// Whether the pointer is over a widget, so the camera should ignore it.
    pub fn wants_pointer(&self) -> bool {
        self.ctx.wants_pointer_input() || self.ctx.is_pointer_over_area()
    }

    pub fn wants_keyboard(&self) -> bool {
        self.ctx.wants_keyboard_input()
    }

    /// Runs `build` and paints the widgets over the current framebuffer.
    pub fn frame(&mut self, window: &Window, build: impl FnMut(&egui::Context)) {
        let size = window.window_size().as_vec2();
        let mut raw_input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                Pos2::ZERO,
                EguiVec2::new(size.x, size.y),
            )),
            time: Some(window.time()),
            modifiers: self.modifiers,
            events: std::mem::take(&mut self.events),
            ..Default::default()
        };
        raw_input
            .viewports
            .entry(egui::ViewportId::ROOT)
            .or_default()
            .native_pixels_per_point = Some(window.pixels_per_point());

        let output = self.ctx.run(raw_input, build);
        let clipped = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        let framebuffer = window.framebuffer_size();
        self.painter.paint_and_update_textures(
            [framebuffer.x, framebuffer.y],
            output.pixels_per_point,
            &clipped,
            &output.textures_delta,
        );
        window.gl().reset_bind_state();
    }
}

impl Drop for Gui {
    fn drop(&mut self) {
        self.painter.destroy();
    }
}

//! SDL2 and OpenGL window management.
//!
//! This module defines the [`Window`] struct which encapsulates the SDL2
//! window, its OpenGL context and the input state fed by its events, and
//! [`Callbacks`] for reacting to individual events.

use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use glam::{UVec2, Vec2};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::mouse::MouseButton;

use super::context::GlContext;
use super::error::GlError;
use crate::other::InputState;

fn init_error(e: impl std::fmt::Display) -> GlError {
    GlError::Init(e.to_string())
}

/// The [`Window`] struct encapsulates the SDL2 window and OpenGL context.
pub struct Window {
    sdl: sdl2::Sdl,
    video_subsystem: sdl2::VideoSubsystem,
    window: sdl2::video::Window,
    _gl_context: sdl2::video::GLContext,
    glow: Arc<glow::Context>,
    gl: Rc<GlContext>,
    event_pump: sdl2::EventPump,
    input: InputState,
    should_close: bool,
}

impl Window {
    /// Opens a resizable window with a GL 3.3 core context made current.
    pub fn new(title: &str, size: UVec2) -> Result<Self, GlError> {
        let sdl = sdl2::init().map_err(init_error)?;
        let video_subsystem = sdl.video().map_err(init_error)?;
        let gl_attr = video_subsystem.gl_attr();
        gl_attr.set_context_profile(sdl2::video::GLProfile::Core);
        gl_attr.set_context_version(3, 3);
        gl_attr.set_depth_size(24);
        let window = video_subsystem
            .window(title, size.x.max(1), size.y.max(1))
            .opengl()
            .resizable()
            .allow_highdpi()
            .build()
            .map_err(init_error)?;
        let gl_context = window.gl_create_context().map_err(init_error)?;
        window.gl_make_current(&gl_context).map_err(init_error)?;
        let glow = unsafe {
            glow::Context::from_loader_function(|s| {
                video_subsystem.gl_get_proc_address(s) as *const _
            })
        };
        let event_pump = sdl.event_pump().map_err(init_error)?;
        let glow = Arc::new(glow);
        let gl = Rc::new(GlContext::new(glow.clone()));
        log::info!("opened {}x{} window \"{}\"", size.x, size.y, title);

        Ok(Self {
            sdl,
            video_subsystem,
            window,
            _gl_context: gl_context,
            glow,
            gl,
            event_pump,
            input: InputState::default(),
            should_close: false,
        })
    }

    /// The tracked rendering context every resource is created with.
    pub fn gl(&self) -> &Rc<GlContext> {
        &self.gl
    }

    /// The raw glow context, for painters that manage their own GL state.
    pub fn glow(&self) -> &Arc<glow::Context> {
        &self.glow
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Drains pending events into the input state and returns them.
    ///
    /// With `wait` set, blocks until at least one event arrives.
    pub fn poll_events(&mut self, wait: bool) -> Vec<Event> {
        self.input.begin_frame();
        let mut events = Vec::new();
        if wait {
            events.push(self.event_pump.wait_event());
        }
        events.extend(self.event_pump.poll_iter());
        for event in &events {
            if matches!(event, Event::Quit { .. }) {
                self.should_close = true;
            }
            self.input.handle_event(event);
        }
        events
    }

    /// Drawable size in pixels.
    pub fn framebuffer_size(&self) -> UVec2 {
        let (w, h) = self.window.drawable_size();
        UVec2::new(w, h)
    }

    /// Window size in screen coordinates.
    pub fn window_size(&self) -> UVec2 {
        let (w, h) = self.window.size();
        UVec2::new(w, h)
    }

    /// Pixels per screen coordinate, for high-DPI displays.
    pub fn pixels_per_point(&self) -> f32 {
        let window = self.window_size().max(UVec2::ONE);
        self.framebuffer_size().x as f32 / window.x as f32
    }

    pub fn should_close(&self) -> bool {
        self.should_close
    }

    pub fn set_title(&mut self, title: &str) {
        if let Err(e) = self.window.set_title(title) {
            log::warn!("cannot set window title: {}", e);
        }
    }

    pub fn set_clipboard(&self, text: &str) {
        if let Err(e) = self.video_subsystem.clipboard().set_clipboard_text(text) {
            log::warn!("cannot set clipboard: {}", e);
        }
    }

    /// Starts or stops SDL text input events.
    pub fn set_text_input(&self, enabled: bool) {
        let text_input = self.video_subsystem.text_input();
        if enabled && !text_input.is_active() {
            text_input.start();
        } else if !enabled && text_input.is_active() {
            text_input.stop();
        }
    }

    /// Seconds since SDL was initialized.
    pub fn time(&self) -> f64 {
        match self.sdl.timer() {
            Ok(timer) => timer.ticks64() as f64 / 1000.0,
            Err(_) => 0.0,
        }
    }

    pub fn swap(&self) {
        self.window.gl_swap_window();
    }
}

pub type DropCallback<S> = Box<dyn FnMut(&mut S, &Path)>;
/// Key and whether it went down.
pub type KeyCallback<S> = Box<dyn FnMut(&mut S, Keycode, bool)>;
/// Button, whether it went down, and the position in screen coordinates.
pub type ClickCallback<S> = Box<dyn FnMut(&mut S, MouseButton, bool, Vec2)>;
pub type ScrollCallback<S> = Box<dyn FnMut(&mut S, Vec2)>;

/// Event handlers registered against a state of type `S`.
pub struct Callbacks<S> {
    pub on_drop: Option<DropCallback<S>>,
    pub on_key: Option<KeyCallback<S>>,
    pub on_click: Option<ClickCallback<S>>,
    pub on_scroll: Option<ScrollCallback<S>>,
}

impl<S> Default for Callbacks<S> {
    fn default() -> Self {
        Self {
            on_drop: None,
            on_key: None,
            on_click: None,
            on_scroll: None,
        }
    }
}

impl<S> Callbacks<S> {
    /// Calls the handler registered for `event`, if any. Key repeats are
    /// not reported.
    pub fn dispatch(&mut self, state: &mut S, event: &Event) {
        match event {
            Event::DropFile { filename, .. } => {
                if let Some(on_drop) = &mut self.on_drop {
                    on_drop(state, Path::new(filename));
                }
            }
            Event::KeyDown {
                keycode: Some(keycode),
                repeat: false,
                ..
            } => {
                if let Some(on_key) = &mut self.on_key {
                    on_key(state, *keycode, true);
                }
            }
            Event::KeyUp {
                keycode: Some(keycode),
                repeat: false,
                ..
            } => {
                if let Some(on_key) = &mut self.on_key {
                    on_key(state, *keycode, false);
                }
            }
            Event::MouseButtonDown { mouse_btn, x, y, .. } => {
                if let Some(on_click) = &mut self.on_click {
                    on_click(state, *mouse_btn, true, Vec2::new(*x as f32, *y as f32));
                }
            }
            Event::MouseButtonUp { mouse_btn, x, y, .. } => {
                if let Some(on_click) = &mut self.on_click {
                    on_click(state, *mouse_btn, false, Vec2::new(*x as f32, *y as f32));
                }
            }
            Event::MouseWheel { x, y, .. } => {
                if let Some(on_scroll) = &mut self.on_scroll {
                    on_scroll(state, Vec2::new(*x as f32, *y as f32));
                }
            }
            _ => {}
        }
    }
}

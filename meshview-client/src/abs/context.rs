//! The rendering context and its tracked bind state.
//!
//! GL keeps "currently bound" objects as hidden global state. [`GlContext`]
//! makes that state explicit: every bind goes through it, redundant binds are
//! skipped, and deleting an object that is bound clears its slot.

use std::cell::RefCell;
use std::sync::Arc;

use super::device::{Device, RawHandle};

/// Texture units tracked by the context. Units past this are always rebound.
pub const TEXTURE_UNITS: usize = 8;

/// What the context believes is bound at one binding point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Binding {
    /// Someone else touched the state; the next bind must be issued.
    #[default]
    Unknown,
    Unbound,
    Bound(RawHandle),
}

impl Binding {
    fn of(handle: Option<RawHandle>) -> Self {
        handle.map_or(Self::Unbound, Self::Bound)
    }

    fn holds(self, handle: RawHandle) -> bool {
        self == Self::Bound(handle)
    }
}

/// Snapshot of the binding points the context tracks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindState {
    pub program: Binding,
    pub active_unit: Option<u32>,
    pub textures: [Binding; TEXTURE_UNITS],
    pub vertex_array: Binding,
    pub framebuffer: Binding,
}

/// Shared handle to the device plus the tracked bind state.
pub struct GlContext {
    device: Arc<dyn Device>,
    state: RefCell<BindState>,
}

impl GlContext {
    pub fn new(device: Arc<dyn Device>) -> Self {
        Self {
            device,
            state: RefCell::new(BindState::default()),
        }
    }

    pub fn device(&self) -> &dyn Device {
        self.device.as_ref()
    }

    pub fn bind_state(&self) -> BindState {
        self.state.borrow().clone()
    }

    /// Forgets everything the context believes is bound. Call after foreign
    /// code (the widget painter) has issued GL calls of its own.
    pub fn reset_bind_state(&self) {
        *self.state.borrow_mut() = BindState::default();
    }

    pub fn use_program(&self, program: Option<RawHandle>) {
        let mut state = self.state.borrow_mut();
        let binding = Binding::of(program);
        if state.program != binding {
            self.device.use_program(program);
            state.program = binding;
        }
    }

    /// Makes `unit` the active texture unit and binds `texture` to it.
    pub fn bind_texture(&self, unit: u32, texture: Option<RawHandle>) {
        let mut state = self.state.borrow_mut();
        if state.active_unit != Some(unit) {
            self.device.active_texture(unit);
            state.active_unit = Some(unit);
        }
        let binding = Binding::of(texture);
        match state.textures.get_mut(unit as usize) {
            Some(slot) if *slot == binding => {}
            Some(slot) => {
                self.device.bind_texture(texture);
                *slot = binding;
            }
            None => self.device.bind_texture(texture),
        }
    }

    pub fn bind_vertex_array(&self, vertex_array: Option<RawHandle>) {
        let mut state = self.state.borrow_mut();
        let binding = Binding::of(vertex_array);
        if state.vertex_array != binding {
            self.device.bind_vertex_array(vertex_array);
            state.vertex_array = binding;
        }
    }

    pub fn bind_framebuffer(&self, framebuffer: Option<RawHandle>) {
        let mut state = self.state.borrow_mut();
        let binding = Binding::of(framebuffer);
        if state.framebuffer != binding {
            self.device.bind_framebuffer(framebuffer);
            state.framebuffer = binding;
        }
    }

    /// Deletes a program. A program in use stays in use until replaced, so
    /// its slot becomes unknown rather than unbound.
    pub fn delete_program(&self, program: RawHandle) {
        self.device.delete_program(program);
        let mut state = self.state.borrow_mut();
        if state.program.holds(program) {
            state.program = Binding::Unknown;
        }
    }

    pub fn delete_texture(&self, texture: RawHandle) {
        self.device.delete_texture(texture);
        for slot in self.state.borrow_mut().textures.iter_mut() {
            if slot.holds(texture) {
                *slot = Binding::Unbound;
            }
        }
    }

    pub fn delete_vertex_array(&self, vertex_array: RawHandle) {
        self.device.delete_vertex_array(vertex_array);
        let mut state = self.state.borrow_mut();
        if state.vertex_array.holds(vertex_array) {
            state.vertex_array = Binding::Unbound;
        }
    }

    pub fn delete_framebuffer(&self, framebuffer: RawHandle) {
        self.device.delete_framebuffer(framebuffer);
        let mut state = self.state.borrow_mut();
        if state.framebuffer.holds(framebuffer) {
            state.framebuffer = Binding::Unbound;
        }
    }
}

//! A [`Device`] that records calls instead of talking to a GPU.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::{UVec2, Vec4};

use super::device::{
    BufferData, BufferUsage, Capability, Device, DrawMode, Pixels, RawHandle, ShaderStage,
    TextureDesc, TextureFormat,
};
use super::shader::UniformValue;

/// Kind of GL object a handle names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Shader,
    Program,
    Texture,
    Buffer,
    VertexArray,
    Framebuffer,
    Renderbuffer,
}

/// A state-changing or drawing call seen by the device.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    UseProgram(Option<RawHandle>),
    ActiveTexture(u32),
    BindTexture(Option<RawHandle>),
    TexImage {
        texture: Option<RawHandle>,
        desc: TextureDesc,
        with_pixels: bool,
    },
    TexSubImage {
        texture: Option<RawHandle>,
        offset: UVec2,
        size: UVec2,
    },
    GenerateMipmap(Option<RawHandle>),
    BufferData {
        buffer: RawHandle,
        len: usize,
        usage: BufferUsage,
    },
    BufferSubData { buffer: RawHandle, len: usize },
    BindVertexArray(Option<RawHandle>),
    AttribBuffer {
        location: u32,
        buffer: RawHandle,
        components: u32,
    },
    AttribConstant { location: u32, value: Vec4 },
    BindElementBuffer(Option<RawHandle>),
    DrawElements { mode: DrawMode, count: u32 },
    DrawArrays { mode: DrawMode, count: u32 },
    BindFramebuffer(Option<RawHandle>),
    AttachColor(RawHandle),
    Uniform { name: String, value: UniformValue },
    Viewport(UVec2),
    Clear(Vec4),
    Capability(Capability, bool),
    Wireframe(bool),
}

#[derive(Default)]
struct Inner {
    next: u32,
    live: HashMap<RawHandle, Kind>,
    created: HashMap<Kind, usize>,
    invalid_deletes: usize,
    failed_shaders: HashSet<RawHandle>,
    fail_link: bool,
    framebuffer_status: Option<u32>,
    active_unit: u32,
    bound_textures: HashMap<u32, RawHandle>,
    locations: HashMap<(RawHandle, String), u32>,
    location_names: HashMap<u32, String>,
    calls: Vec<Call>,
}

/// Recording device for tests.
///
/// Shaders whose source contains `#error` fail to compile. Every created
/// handle is tracked until deleted; deleting an unknown handle is counted as
/// an invalid delete.
#[derive(Default)]
pub struct RecordingDevice {
    inner: RefCell<Inner>,
}

impl RecordingDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn allocate(&self, kind: Kind) -> Result<RawHandle, String> {
        let mut inner = self.inner.borrow_mut();
        inner.next += 1;
        let handle = RawHandle::new(inner.next).ok_or("handle overflow")?;
        inner.live.insert(handle, kind);
        *inner.created.entry(kind).or_default() += 1;
        Ok(handle)
    }

    fn release(&self, handle: RawHandle, kind: Kind) {
        let mut inner = self.inner.borrow_mut();
        if inner.live.get(&handle) == Some(&kind) {
            inner.live.remove(&handle);
        } else {
            inner.invalid_deletes += 1;
        }
    }

    fn record(&self, call: Call) {
        self.inner.borrow_mut().calls.push(call);
    }

    fn bound_texture(&self) -> Option<RawHandle> {
        let inner = self.inner.borrow();
        inner.bound_textures.get(&inner.active_unit).copied()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.borrow_mut().calls.clear();
    }

    /// Draw calls issued so far.
    pub fn draws(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::DrawElements { .. } | Call::DrawArrays { .. }))
            .collect()
    }

    /// Last value set for the uniform `name`.
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.calls().into_iter().rev().find_map(|c| match c {
            Call::Uniform { name: n, value } if n == name => Some(value),
            _ => None,
        })
    }

    /// Number of objects of `kind` ever created.
    pub fn created(&self, kind: Kind) -> usize {
        self.inner.borrow().created.get(&kind).copied().unwrap_or(0)
    }

    /// Number of objects of `kind` created and not yet deleted.
    pub fn live(&self, kind: Kind) -> usize {
        self.inner.borrow().live.values().filter(|k| **k == kind).count()
    }

    pub fn invalid_deletes(&self) -> usize {
        self.inner.borrow().invalid_deletes
    }

    pub fn set_fail_link(&self, fail: bool) {
        self.inner.borrow_mut().fail_link = fail;
    }

    pub fn set_framebuffer_status(&self, status: u32) {
        self.inner.borrow_mut().framebuffer_status = Some(status);
    }
}

impl Device for RecordingDevice {
    fn create_shader(&self, _stage: ShaderStage) -> Result<RawHandle, String> {
        self.allocate(Kind::Shader)
    }

    fn compile_shader(&self, shader: RawHandle, source: &str) -> bool {
        let ok = !source.contains("#error");
        if !ok {
            self.inner.borrow_mut().failed_shaders.insert(shader);
        }
        ok
    }

    fn shader_info_log(&self, shader: RawHandle) -> String {
        if self.inner.borrow().failed_shaders.contains(&shader) {
            "0:1(1): error: #error directive".to_string()
        } else {
            String::new()
        }
    }

    fn delete_shader(&self, shader: RawHandle) {
        self.release(shader, Kind::Shader);
    }

    fn create_program(&self) -> Result<RawHandle, String> {
        self.allocate(Kind::Program)
    }

    fn link_program(&self, _program: RawHandle, shaders: &[RawHandle]) -> bool {
        let inner = self.inner.borrow();
        !inner.fail_link && shaders.iter().all(|s| !inner.failed_shaders.contains(s))
    }

    fn program_info_log(&self, _program: RawHandle) -> String {
        "error: linking failed".to_string()
    }

    fn delete_program(&self, program: RawHandle) {
        self.release(program, Kind::Program);
    }

    fn use_program(&self, program: Option<RawHandle>) {
        self.record(Call::UseProgram(program));
    }

    fn uniform_location(&self, program: RawHandle, name: &str) -> Option<u32> {
        let mut inner = self.inner.borrow_mut();
        let next = inner.locations.len() as u32;
        let location = *inner
            .locations
            .entry((program, name.to_string()))
            .or_insert(next);
        inner.location_names.insert(location, name.to_string());
        Some(location)
    }

    fn set_uniform(&self, location: u32, value: &UniformValue) {
        let name = self
            .inner
            .borrow()
            .location_names
            .get(&location)
            .cloned()
            .unwrap_or_default();
        self.record(Call::Uniform {
            name,
            value: value.clone(),
        });
    }

    fn create_texture(&self) -> Result<RawHandle, String> {
        self.allocate(Kind::Texture)
    }

    fn delete_texture(&self, texture: RawHandle) {
        self.release(texture, Kind::Texture);
        self.inner
            .borrow_mut()
            .bound_textures
            .retain(|_, bound| *bound != texture);
    }

    fn active_texture(&self, unit: u32) {
        self.inner.borrow_mut().active_unit = unit;
        self.record(Call::ActiveTexture(unit));
    }

    fn bind_texture(&self, texture: Option<RawHandle>) {
        {
            let mut inner = self.inner.borrow_mut();
            let unit = inner.active_unit;
            match texture {
                Some(texture) => inner.bound_textures.insert(unit, texture),
                None => inner.bound_textures.remove(&unit),
            };
        }
        self.record(Call::BindTexture(texture));
    }

    fn tex_image(&self, desc: &TextureDesc, pixels: Option<Pixels<'_>>) {
        self.record(Call::TexImage {
            texture: self.bound_texture(),
            desc: *desc,
            with_pixels: pixels.is_some(),
        });
    }

    fn tex_sub_image(&self, offset: UVec2, size: UVec2, _format: TextureFormat, _pixels: Pixels<'_>) {
        self.record(Call::TexSubImage {
            texture: self.bound_texture(),
            offset,
            size,
        });
    }

    fn generate_mipmap(&self) {
        self.record(Call::GenerateMipmap(self.bound_texture()));
    }

    fn create_buffer(&self) -> Result<RawHandle, String> {
        self.allocate(Kind::Buffer)
    }

    fn delete_buffer(&self, buffer: RawHandle) {
        self.release(buffer, Kind::Buffer);
    }

    fn buffer_data(&self, buffer: RawHandle, data: BufferData<'_>, usage: BufferUsage) {
        let len = match data {
            BufferData::Floats(d) => d.len(),
            BufferData::Indices(d) => d.len(),
        };
        self.record(Call::BufferData { buffer, len, usage });
    }

    fn buffer_sub_data(&self, buffer: RawHandle, data: BufferData<'_>) {
        let len = match data {
            BufferData::Floats(d) => d.len(),
            BufferData::Indices(d) => d.len(),
        };
        self.record(Call::BufferSubData { buffer, len });
    }

    fn create_vertex_array(&self) -> Result<RawHandle, String> {
        self.allocate(Kind::VertexArray)
    }

    fn delete_vertex_array(&self, vertex_array: RawHandle) {
        self.release(vertex_array, Kind::VertexArray);
    }

    fn bind_vertex_array(&self, vertex_array: Option<RawHandle>) {
        self.record(Call::BindVertexArray(vertex_array));
    }

    fn vertex_attrib_buffer(&self, location: u32, buffer: RawHandle, components: u32) {
        self.record(Call::AttribBuffer {
            location,
            buffer,
            components,
        });
    }

    fn vertex_attrib_constant(&self, location: u32, value: Vec4) {
        self.record(Call::AttribConstant { location, value });
    }

    fn bind_element_buffer(&self, buffer: Option<RawHandle>) {
        self.record(Call::BindElementBuffer(buffer));
    }

    fn draw_elements(&self, mode: DrawMode, count: u32) {
        self.record(Call::DrawElements { mode, count });
    }

    fn draw_arrays(&self, mode: DrawMode, count: u32) {
        self.record(Call::DrawArrays { mode, count });
    }

    fn create_framebuffer(&self) -> Result<RawHandle, String> {
        self.allocate(Kind::Framebuffer)
    }

    fn delete_framebuffer(&self, framebuffer: RawHandle) {
        self.release(framebuffer, Kind::Framebuffer);
    }

    fn bind_framebuffer(&self, framebuffer: Option<RawHandle>) {
        self.record(Call::BindFramebuffer(framebuffer));
    }

    fn attach_color_texture(&self, texture: RawHandle) {
        self.record(Call::AttachColor(texture));
    }

    fn create_depth_buffer(&self, _size: UVec2) -> Result<RawHandle, String> {
        self.allocate(Kind::Renderbuffer)
    }

    fn delete_depth_buffer(&self, renderbuffer: RawHandle) {
        self.release(renderbuffer, Kind::Renderbuffer);
    }

    fn framebuffer_status(&self) -> u32 {
        self.inner
            .borrow()
            .framebuffer_status
            .unwrap_or(glow::FRAMEBUFFER_COMPLETE)
    }

    fn viewport(&self, size: UVec2) {
        self.record(Call::Viewport(size));
    }

    fn clear(&self, color: Vec4) {
        self.record(Call::Clear(color));
    }

    fn set_capability(&self, capability: Capability, enabled: bool) {
        self.record(Call::Capability(capability, enabled));
    }

    fn set_wireframe(&self, enabled: bool) {
        self.record(Call::Wireframe(enabled));
    }
}

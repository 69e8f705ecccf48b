//! The raw graphics device.
//!
//! [`Device`] is the narrow set of GL entry points the resource wrappers are
//! written against. The real implementation forwards to [`glow::Context`];
//! tests substitute a recording device so resource lifetimes can be checked
//! without a window.

use std::num::NonZeroU32;

use glam::{UVec2, Vec4};
use glow::HasContext;

use super::shader::UniformValue;

/// A GL object name. Zero is never a valid name, so "no object" is `None`.
pub type RawHandle = NonZeroU32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Fragment => write!(f, "fragment"),
        }
    }
}

/// Pixel storage of a texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    #[default]
    Rgba8,
    /// 8-bit RGBA with sRGB-encoded color channels.
    Srgba8,
    Rgba32F,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 | Self::Srgba8 => 4,
            Self::Rgba32F => 16,
        }
    }

    /// `(internal format, format, type)` for `glTexImage2D`.
    fn gl_formats(self) -> (i32, u32, u32) {
        match self {
            Self::Rgba8 => (glow::RGBA8 as i32, glow::RGBA, glow::UNSIGNED_BYTE),
            Self::Srgba8 => (glow::SRGB8_ALPHA8 as i32, glow::RGBA, glow::UNSIGNED_BYTE),
            Self::Rgba32F => (glow::RGBA32F as i32, glow::RGBA, glow::FLOAT),
        }
    }
}

/// Everything that decides whether a texture can be updated in place.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub size: UVec2,
    pub format: TextureFormat,
    /// Linear filtering instead of nearest.
    pub linear: bool,
    pub mipmap: bool,
}

impl TextureDesc {
    pub fn new(size: UVec2, format: TextureFormat) -> Self {
        Self {
            size,
            format,
            linear: true,
            mipmap: false,
        }
    }
}

/// Pixel data handed to the device.
#[derive(Clone, Copy, Debug)]
pub enum Pixels<'a> {
    Bytes(&'a [u8]),
    Floats(&'a [f32]),
}

impl Pixels<'_> {
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Bytes(data) => data.len(),
            Self::Floats(data) => std::mem::size_of_val(*data),
        }
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(data) => data,
            Self::Floats(data) => bytes_of(data),
        }
    }
}

/// Buffer contents handed to the device.
#[derive(Clone, Copy, Debug)]
pub enum BufferData<'a> {
    Floats(&'a [f32]),
    Indices(&'a [u32]),
}

impl BufferData<'_> {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Floats(data) => bytes_of(data),
            Self::Indices(data) => bytes_of(data),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
}

/// Primitive assembly mode of a draw call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

impl DrawMode {
    fn gl_mode(self) -> u32 {
        match self {
            Self::Points => glow::POINTS,
            Self::Lines => glow::LINES,
            Self::LineStrip => glow::LINE_STRIP,
            Self::Triangles => glow::TRIANGLES,
            Self::TriangleStrip => glow::TRIANGLE_STRIP,
        }
    }
}

/// Toggleable pipeline state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Depth testing with `LEQUAL`.
    DepthTest,
    /// Alpha blending (`SRC_ALPHA`, `ONE_MINUS_SRC_ALPHA`).
    Blend,
    /// Back-face culling.
    CullFace,
    /// Point size written by the vertex shader.
    ProgramPointSize,
}

/// Graphics entry points used by the resource wrappers.
///
/// Texture calls act on the texture bound to the active unit; buffer uploads
/// never disturb vertex array state.
pub trait Device {
    fn create_shader(&self, stage: ShaderStage) -> Result<RawHandle, String>;
    /// Sets the source and compiles. Returns the compile status.
    fn compile_shader(&self, shader: RawHandle, source: &str) -> bool;
    fn shader_info_log(&self, shader: RawHandle) -> String;
    fn delete_shader(&self, shader: RawHandle);

    fn create_program(&self) -> Result<RawHandle, String>;
    /// Attaches `shaders` and links. Returns the link status.
    fn link_program(&self, program: RawHandle, shaders: &[RawHandle]) -> bool;
    fn program_info_log(&self, program: RawHandle) -> String;
    fn delete_program(&self, program: RawHandle);
    fn use_program(&self, program: Option<RawHandle>);
    fn uniform_location(&self, program: RawHandle, name: &str) -> Option<u32>;
    /// Sets a uniform of the program in use.
    fn set_uniform(&self, location: u32, value: &UniformValue);

    fn create_texture(&self) -> Result<RawHandle, String>;
    fn delete_texture(&self, texture: RawHandle);
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, texture: Option<RawHandle>);
    /// Allocates storage for the bound texture and sets its sampling state.
    fn tex_image(&self, desc: &TextureDesc, pixels: Option<Pixels<'_>>);
    fn tex_sub_image(&self, offset: UVec2, size: UVec2, format: TextureFormat, pixels: Pixels<'_>);
    fn generate_mipmap(&self);

    fn create_buffer(&self) -> Result<RawHandle, String>;
    fn delete_buffer(&self, buffer: RawHandle);
    fn buffer_data(&self, buffer: RawHandle, data: BufferData<'_>, usage: BufferUsage);
    fn buffer_sub_data(&self, buffer: RawHandle, data: BufferData<'_>);

    fn create_vertex_array(&self) -> Result<RawHandle, String>;
    fn delete_vertex_array(&self, vertex_array: RawHandle);
    fn bind_vertex_array(&self, vertex_array: Option<RawHandle>);
    /// Sources attribute `location` from `buffer`, tightly packed floats.
    fn vertex_attrib_buffer(&self, location: u32, buffer: RawHandle, components: u32);
    /// Feeds attribute `location` a constant value.
    fn vertex_attrib_constant(&self, location: u32, value: Vec4);
    /// Attaches an index buffer to the bound vertex array.
    fn bind_element_buffer(&self, buffer: Option<RawHandle>);
    fn draw_elements(&self, mode: DrawMode, count: u32);
    fn draw_arrays(&self, mode: DrawMode, count: u32);

    fn create_framebuffer(&self) -> Result<RawHandle, String>;
    fn delete_framebuffer(&self, framebuffer: RawHandle);
    fn bind_framebuffer(&self, framebuffer: Option<RawHandle>);
    /// Attaches `texture` as color attachment 0 of the bound framebuffer.
    fn attach_color_texture(&self, texture: RawHandle);
    /// Creates a depth renderbuffer and attaches it to the bound framebuffer.
    fn create_depth_buffer(&self, size: UVec2) -> Result<RawHandle, String>;
    fn delete_depth_buffer(&self, renderbuffer: RawHandle);
    fn framebuffer_status(&self) -> u32;

    fn viewport(&self, size: UVec2);
    /// Clears color and depth.
    fn clear(&self, color: Vec4);
    fn set_capability(&self, capability: Capability, enabled: bool);
    fn set_wireframe(&self, enabled: bool);
}

/// Views a slice of plain numbers as bytes.
fn bytes_of<T: Copy>(data: &[T]) -> &[u8] {
    // SAFETY: only instantiated with `f32` and `u32`, which have no padding
    // and no invalid bit patterns.
    unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, std::mem::size_of_val(data)) }
}

impl Device for glow::Context {
    fn create_shader(&self, stage: ShaderStage) -> Result<RawHandle, String> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe { HasContext::create_shader(self, kind) }.map(|s| s.0)
    }

    fn compile_shader(&self, shader: RawHandle, source: &str) -> bool {
        let shader = glow::NativeShader(shader);
        unsafe {
            self.shader_source(shader, source);
            HasContext::compile_shader(self, shader);
            self.get_shader_compile_status(shader)
        }
    }

    fn shader_info_log(&self, shader: RawHandle) -> String {
        unsafe { self.get_shader_info_log(glow::NativeShader(shader)) }
    }

    fn delete_shader(&self, shader: RawHandle) {
        unsafe { HasContext::delete_shader(self, glow::NativeShader(shader)) }
    }

    fn create_program(&self) -> Result<RawHandle, String> {
        unsafe { HasContext::create_program(self) }.map(|p| p.0)
    }

    fn link_program(&self, program: RawHandle, shaders: &[RawHandle]) -> bool {
        let program = glow::NativeProgram(program);
        unsafe {
            for &shader in shaders {
                self.attach_shader(program, glow::NativeShader(shader));
            }
            HasContext::link_program(self, program);
            for &shader in shaders {
                self.detach_shader(program, glow::NativeShader(shader));
            }
            self.get_program_link_status(program)
        }
    }

    fn program_info_log(&self, program: RawHandle) -> String {
        unsafe { self.get_program_info_log(glow::NativeProgram(program)) }
    }

    fn delete_program(&self, program: RawHandle) {
        unsafe { HasContext::delete_program(self, glow::NativeProgram(program)) }
    }

    fn use_program(&self, program: Option<RawHandle>) {
        unsafe { HasContext::use_program(self, program.map(glow::NativeProgram)) }
    }

    fn uniform_location(&self, program: RawHandle, name: &str) -> Option<u32> {
        unsafe { self.get_uniform_location(glow::NativeProgram(program), name) }.map(|l| l.0)
    }

    fn set_uniform(&self, location: u32, value: &UniformValue) {
        let location = glow::NativeUniformLocation(location);
        let loc = Some(&location);
        unsafe {
            match value {
                UniformValue::Bool(v) => self.uniform_1_i32(loc, *v as i32),
                UniformValue::Int(v) => self.uniform_1_i32(loc, *v),
                UniformValue::Float(v) => self.uniform_1_f32(loc, *v),
                UniformValue::Vec2(v) => self.uniform_2_f32(loc, v.x, v.y),
                UniformValue::Vec3(v) => self.uniform_3_f32(loc, v.x, v.y, v.z),
                UniformValue::Vec4(v) => self.uniform_4_f32(loc, v.x, v.y, v.z, v.w),
                UniformValue::IVec2(v) => self.uniform_2_i32(loc, v.x, v.y),
                UniformValue::IVec3(v) => self.uniform_3_i32(loc, v.x, v.y, v.z),
                UniformValue::IVec4(v) => self.uniform_4_i32(loc, v.x, v.y, v.z, v.w),
                UniformValue::Mat4(m) => {
                    self.uniform_matrix_4_f32_slice(loc, false, &m.to_cols_array())
                }
                UniformValue::IntArray(values) => self.uniform_1_i32_slice(loc, values),
                UniformValue::FloatArray(values) => self.uniform_1_f32_slice(loc, values),
                UniformValue::Vec3Array(values) => {
                    let flat: Vec<f32> = values.iter().flat_map(|v| v.to_array()).collect();
                    self.uniform_3_f32_slice(loc, &flat)
                }
            }
        }
    }

    fn create_texture(&self) -> Result<RawHandle, String> {
        unsafe { HasContext::create_texture(self) }.map(|t| t.0)
    }

    fn delete_texture(&self, texture: RawHandle) {
        unsafe { HasContext::delete_texture(self, glow::NativeTexture(texture)) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { HasContext::active_texture(self, glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&self, texture: Option<RawHandle>) {
        unsafe { HasContext::bind_texture(self, glow::TEXTURE_2D, texture.map(glow::NativeTexture)) }
    }

    fn tex_image(&self, desc: &TextureDesc, pixels: Option<Pixels<'_>>) {
        let (internal, format, ty) = desc.format.gl_formats();
        let (min_filter, mag_filter) = match (desc.linear, desc.mipmap) {
            (true, true) => (glow::LINEAR_MIPMAP_LINEAR, glow::LINEAR),
            (true, false) => (glow::LINEAR, glow::LINEAR),
            (false, true) => (glow::NEAREST_MIPMAP_NEAREST, glow::NEAREST),
            (false, false) => (glow::NEAREST, glow::NEAREST),
        };
        unsafe {
            self.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal,
                desc.size.x as i32,
                desc.size.y as i32,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(pixels.as_ref().map(Pixels::as_bytes)),
            );
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, min_filter as i32);
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, mag_filter as i32);
        }
    }

    fn tex_sub_image(&self, offset: UVec2, size: UVec2, format: TextureFormat, pixels: Pixels<'_>) {
        let (_, format, ty) = format.gl_formats();
        unsafe {
            self.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                offset.x as i32,
                offset.y as i32,
                size.x as i32,
                size.y as i32,
                format,
                ty,
                glow::PixelUnpackData::Slice(Some(pixels.as_bytes())),
            );
        }
    }

    fn generate_mipmap(&self) {
        unsafe { HasContext::generate_mipmap(self, glow::TEXTURE_2D) }
    }

    fn create_buffer(&self) -> Result<RawHandle, String> {
        unsafe { HasContext::create_buffer(self) }.map(|b| b.0)
    }

    fn delete_buffer(&self, buffer: RawHandle) {
        unsafe { HasContext::delete_buffer(self, glow::NativeBuffer(buffer)) }
    }

    fn buffer_data(&self, buffer: RawHandle, data: BufferData<'_>, usage: BufferUsage) {
        let usage = match usage {
            BufferUsage::Static => glow::STATIC_DRAW,
            BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
        };
        unsafe {
            // The array buffer binding is not part of vertex array state.
            self.bind_buffer(glow::ARRAY_BUFFER, Some(glow::NativeBuffer(buffer)));
            self.buffer_data_u8_slice(glow::ARRAY_BUFFER, data.as_bytes(), usage);
            self.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn buffer_sub_data(&self, buffer: RawHandle, data: BufferData<'_>) {
        unsafe {
            self.bind_buffer(glow::ARRAY_BUFFER, Some(glow::NativeBuffer(buffer)));
            self.buffer_sub_data_u8_slice(glow::ARRAY_BUFFER, 0, data.as_bytes());
            self.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn create_vertex_array(&self) -> Result<RawHandle, String> {
        unsafe { HasContext::create_vertex_array(self) }.map(|v| v.0)
    }

    fn delete_vertex_array(&self, vertex_array: RawHandle) {
        unsafe { HasContext::delete_vertex_array(self, glow::NativeVertexArray(vertex_array)) }
    }

    fn bind_vertex_array(&self, vertex_array: Option<RawHandle>) {
        unsafe { HasContext::bind_vertex_array(self, vertex_array.map(glow::NativeVertexArray)) }
    }

    fn vertex_attrib_buffer(&self, location: u32, buffer: RawHandle, components: u32) {
        unsafe {
            self.bind_buffer(glow::ARRAY_BUFFER, Some(glow::NativeBuffer(buffer)));
            self.vertex_attrib_pointer_f32(location, components as i32, glow::FLOAT, false, 0, 0);
            self.enable_vertex_attrib_array(location);
            self.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn vertex_attrib_constant(&self, location: u32, value: Vec4) {
        unsafe {
            self.disable_vertex_attrib_array(location);
            self.vertex_attrib_4_f32(location, value.x, value.y, value.z, value.w);
        }
    }

    fn bind_element_buffer(&self, buffer: Option<RawHandle>) {
        unsafe { self.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, buffer.map(glow::NativeBuffer)) }
    }

    fn draw_elements(&self, mode: DrawMode, count: u32) {
        unsafe { HasContext::draw_elements(self, mode.gl_mode(), count as i32, glow::UNSIGNED_INT, 0) }
    }

    fn draw_arrays(&self, mode: DrawMode, count: u32) {
        unsafe { HasContext::draw_arrays(self, mode.gl_mode(), 0, count as i32) }
    }

    fn create_framebuffer(&self) -> Result<RawHandle, String> {
        unsafe { HasContext::create_framebuffer(self) }.map(|f| f.0)
    }

    fn delete_framebuffer(&self, framebuffer: RawHandle) {
        unsafe { HasContext::delete_framebuffer(self, glow::NativeFramebuffer(framebuffer)) }
    }

    fn bind_framebuffer(&self, framebuffer: Option<RawHandle>) {
        unsafe {
            HasContext::bind_framebuffer(self, glow::FRAMEBUFFER, framebuffer.map(glow::NativeFramebuffer))
        }
    }

    fn attach_color_texture(&self, texture: RawHandle) {
        unsafe {
            self.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(glow::NativeTexture(texture)),
                0,
            );
        }
    }

    fn create_depth_buffer(&self, size: UVec2) -> Result<RawHandle, String> {
        unsafe {
            let renderbuffer = self.create_renderbuffer()?;
            self.bind_renderbuffer(glow::RENDERBUFFER, Some(renderbuffer));
            self.renderbuffer_storage(
                glow::RENDERBUFFER,
                glow::DEPTH_COMPONENT24,
                size.x as i32,
                size.y as i32,
            );
            self.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(renderbuffer),
            );
            self.bind_renderbuffer(glow::RENDERBUFFER, None);
            Ok(renderbuffer.0)
        }
    }

    fn delete_depth_buffer(&self, renderbuffer: RawHandle) {
        unsafe { self.delete_renderbuffer(glow::NativeRenderbuffer(renderbuffer)) }
    }

    fn framebuffer_status(&self) -> u32 {
        unsafe { self.check_framebuffer_status(glow::FRAMEBUFFER) }
    }

    fn viewport(&self, size: UVec2) {
        unsafe { HasContext::viewport(self, 0, 0, size.x as i32, size.y as i32) }
    }

    fn clear(&self, color: Vec4) {
        unsafe {
            self.clear_color(color.x, color.y, color.z, color.w);
            HasContext::clear(self, glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn set_capability(&self, capability: Capability, enabled: bool) {
        let cap = match capability {
            Capability::DepthTest => glow::DEPTH_TEST,
            Capability::Blend => glow::BLEND,
            Capability::CullFace => glow::CULL_FACE,
            Capability::ProgramPointSize => glow::PROGRAM_POINT_SIZE,
        };
        unsafe {
            if !enabled {
                self.disable(cap);
                return;
            }
            self.enable(cap);
            match capability {
                Capability::DepthTest => self.depth_func(glow::LEQUAL),
                Capability::Blend => self.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA),
                Capability::CullFace => self.cull_face(glow::BACK),
                Capability::ProgramPointSize => {}
            }
        }
    }

    fn set_wireframe(&self, enabled: bool) {
        let mode = if enabled { glow::LINE } else { glow::FILL };
        unsafe { self.polygon_mode(glow::FRONT_AND_BACK, mode) }
    }
}

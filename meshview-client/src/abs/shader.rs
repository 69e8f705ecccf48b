//! OpenGL shader programs
//!
//! This module defines the [`Program`] resource, a linked vertex + fragment
//! shader pair, and the [`UniformValue`] / [`Uniform`] types used to set its
//! uniform variables by name.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::{IVec2, IVec3, IVec4, Mat4, Vec2, Vec3, Vec4};

use super::context::GlContext;
use super::device::{RawHandle, ShaderStage};
use super::error::GlError;
use super::resource::{GpuResource, context};
use super::texture::Texture;

/// A value that can be assigned to a uniform.
#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    IVec2(IVec2),
    IVec3(IVec3),
    IVec4(IVec4),
    Mat4(Mat4),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    Vec3Array(Vec<Vec3>),
}

/// Represents a value that can be set as a uniform variable.
pub trait Uniform {
    fn to_uniform(&self) -> UniformValue;
}

macro_rules! uniform_types {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for UniformValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }

            impl Uniform for $ty {
                fn to_uniform(&self) -> UniformValue {
                    UniformValue::$variant(self.clone())
                }
            }
        )*
    };
}

uniform_types! {
    bool => Bool,
    i32 => Int,
    f32 => Float,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    IVec2 => IVec2,
    IVec3 => IVec3,
    IVec4 => IVec4,
    Mat4 => Mat4,
    Vec<i32> => IntArray,
    Vec<f32> => FloatArray,
    Vec<Vec3> => Vec3Array,
}

impl<const N: usize> Uniform for [Vec3; N] {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Vec3Array(self.to_vec())
    }
}

impl<T: Uniform + ?Sized> Uniform for &T {
    fn to_uniform(&self) -> UniformValue {
        (*self).to_uniform()
    }
}

/// What to do when a program fails to compile or link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Return the error.
    #[default]
    Strict,
    /// Log the error and keep the previous program.
    Soft,
}

/// Vertex and fragment source of a program.
#[derive(Clone, Copy, Debug)]
pub struct ProgramSource<'a> {
    pub vertex: &'a str,
    pub fragment: &'a str,
}

/// A linked shader program.
///
/// Either every handle is valid (both stages compiled, program linked) or
/// the program is empty.
#[derive(Default)]
pub struct Program {
    gl: Option<Rc<GlContext>>,
    program: Option<RawHandle>,
    vertex: Option<RawHandle>,
    fragment: Option<RawHandle>,
    locations: RefCell<HashMap<String, Option<u32>>>,
}

struct Linked {
    program: RawHandle,
    vertex: RawHandle,
    fragment: RawHandle,
}

fn compile(gl: &GlContext, stage: ShaderStage, source: &str) -> Result<RawHandle, GlError> {
    let device = gl.device();
    let shader = device
        .create_shader(stage)
        .map_err(|e| GlError::allocation("shader", e))?;
    if !device.compile_shader(shader, source) {
        let log = device.shader_info_log(shader);
        device.delete_shader(shader);
        return Err(GlError::ShaderCompile { stage, log });
    }
    Ok(shader)
}

fn link(gl: &GlContext, source: ProgramSource<'_>) -> Result<Linked, GlError> {
    let device = gl.device();
    let vertex = compile(gl, ShaderStage::Vertex, source.vertex)?;
    let fragment = compile(gl, ShaderStage::Fragment, source.fragment)
        .inspect_err(|_| device.delete_shader(vertex))?;
    let release_shaders = || {
        device.delete_shader(vertex);
        device.delete_shader(fragment);
    };
    let program = device.create_program().map_err(|e| {
        release_shaders();
        GlError::allocation("program", e)
    })?;
    if !device.link_program(program, &[vertex, fragment]) {
        let log = device.program_info_log(program);
        device.delete_program(program);
        release_shaders();
        return Err(GlError::ProgramLink(log));
    }
    Ok(Linked {
        program,
        vertex,
        fragment,
    })
}

impl Program {
    /// Builds the program from `source`.
    ///
    /// Returns `Ok(true)` when the new program replaced the old one. On
    /// failure the old program is left untouched; with
    /// [`ErrorPolicy::Soft`] the error is logged and `Ok(false)` returned.
    pub fn load(
        &mut self,
        gl: &Rc<GlContext>,
        source: ProgramSource<'_>,
        policy: ErrorPolicy,
    ) -> Result<bool, GlError> {
        match link(gl, source) {
            Ok(linked) => {
                self.delete();
                self.gl = Some(Rc::clone(gl));
                self.program = Some(linked.program);
                self.vertex = Some(linked.vertex);
                self.fragment = Some(linked.fragment);
                Ok(true)
            }
            Err(err) => match policy {
                ErrorPolicy::Strict => Err(err),
                ErrorPolicy::Soft => {
                    log::error!("{}", err);
                    Ok(false)
                }
            },
        }
    }

    pub fn handle(&self) -> Option<RawHandle> {
        self.program
    }

    fn location(&self, gl: &GlContext, program: RawHandle, name: &str) -> Option<u32> {
        let mut locations = self.locations.borrow_mut();
        if let Some(location) = locations.get(name) {
            return *location;
        }
        let location = gl.device().uniform_location(program, name);
        if location.is_none() {
            log::trace!("uniform {} is not active", name);
        }
        locations.insert(name.to_string(), location);
        location
    }

    /// Makes the program current and sets each named uniform. Uniforms the
    /// program does not use are ignored.
    pub fn set_uniforms(&self, uniforms: &[(&str, UniformValue)]) -> Result<(), GlError> {
        let gl = context(&self.gl, "program")?;
        let program = self.program.ok_or(GlError::Unallocated("program"))?;
        gl.use_program(Some(program));
        for (name, value) in uniforms {
            if let Some(location) = self.location(gl, program, name) {
                gl.device().set_uniform(location, value);
            }
        }
        Ok(())
    }

    pub fn set_uniform<T: Uniform>(&self, name: &str, value: T) -> Result<(), GlError> {
        self.set_uniforms(&[(name, value.to_uniform())])
    }

    /// Binds `texture` to `unit` and points the sampler `name` at it, setting
    /// `flag` to whether a texture is bound.
    pub fn set_texture(
        &self,
        name: &str,
        flag: &str,
        texture: Option<&Texture>,
        unit: u32,
    ) -> Result<(), GlError> {
        match texture.filter(|t| t.is_allocated()) {
            Some(texture) => {
                texture.bind(unit)?;
                self.set_uniforms(&[
                    (name, UniformValue::Int(unit as i32)),
                    (flag, UniformValue::Bool(true)),
                ])
            }
            None => self.set_uniforms(&[(flag, UniformValue::Bool(false))]),
        }
    }
}

impl GpuResource for Program {
    type Data<'a> = ProgramSource<'a>;
    type Slot = ();

    fn init(&mut self, gl: &Rc<GlContext>, data: ProgramSource<'_>) -> Result<(), GlError> {
        self.load(gl, data, ErrorPolicy::Strict).map(|_| ())
    }

    /// Relinks from new sources with the context the program was created on.
    fn update(&mut self, data: ProgramSource<'_>) -> Result<(), GlError> {
        let gl = Rc::clone(context(&self.gl, "program")?);
        self.init(&gl, data)
    }

    fn bind(&self, _slot: ()) -> Result<(), GlError> {
        let gl = context(&self.gl, "program")?;
        let program = self.program.ok_or(GlError::Unallocated("program"))?;
        gl.use_program(Some(program));
        Ok(())
    }

    fn delete(&mut self) {
        let Some(gl) = self.gl.take() else {
            return;
        };
        if let Some(program) = self.program.take() {
            gl.delete_program(program);
        }
        for shader in [self.vertex.take(), self.fragment.take()].into_iter().flatten() {
            gl.device().delete_shader(shader);
        }
        self.locations.borrow_mut().clear();
    }

    fn is_allocated(&self) -> bool {
        self.program.is_some()
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        self.delete();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::abs::testing::{Call, Kind, RecordingDevice};

    const VERT: &str = "#version 330 core\nvoid main() {}\n";
    const FRAG: &str = "#version 330 core\nout vec4 c; void main() { c = vec4(1.0); }\n";
    const BROKEN: &str = "#version 330 core\n#error broken\n";

    fn context() -> (Arc<RecordingDevice>, Rc<GlContext>) {
        let device = RecordingDevice::new();
        let gl = Rc::new(GlContext::new(device.clone()));
        (device, gl)
    }

    fn source(fragment: &str) -> ProgramSource<'_> {
        ProgramSource {
            vertex: VERT,
            fragment,
        }
    }

    #[test]
    fn strict_failure_leaves_nothing_behind() {
        let (device, gl) = context();
        let mut program = Program::default();
        let err = program.init(&gl, source(BROKEN)).unwrap_err();
        assert!(matches!(
            err,
            GlError::ShaderCompile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
        assert!(!program.is_allocated());
        assert_eq!(device.live(Kind::Shader), 0);
        assert_eq!(device.live(Kind::Program), 0);
    }

    #[test]
    fn soft_failure_keeps_previous_program() {
        let (device, gl) = context();
        let mut program = Program::default();
        assert!(program.load(&gl, source(FRAG), ErrorPolicy::Soft).unwrap());
        let handle = program.handle();
        assert!(!program.load(&gl, source(BROKEN), ErrorPolicy::Soft).unwrap());
        assert_eq!(program.handle(), handle);
        assert_eq!(device.live(Kind::Program), 1);
        assert_eq!(device.live(Kind::Shader), 2);
    }

    #[test]
    fn link_failure_is_reported() {
        let (device, gl) = context();
        device.set_fail_link(true);
        let mut program = Program::default();
        let err = program.init(&gl, source(FRAG)).unwrap_err();
        assert!(matches!(err, GlError::ProgramLink(_)));
        assert_eq!(device.live(Kind::Program), 0);
        assert_eq!(device.live(Kind::Shader), 0);
    }

    #[test]
    fn reinit_releases_old_program() {
        let (device, gl) = context();
        let mut program = Program::default();
        program.init(&gl, source(FRAG)).unwrap();
        program.init(&gl, source(FRAG)).unwrap();
        assert_eq!(device.created(Kind::Program), 2);
        assert_eq!(device.live(Kind::Program), 1);
        program.delete();
        program.delete();
        assert_eq!(device.live(Kind::Program), 0);
        assert_eq!(device.live(Kind::Shader), 0);
        assert_eq!(device.invalid_deletes(), 0);
    }

    #[test]
    fn take_leaves_an_empty_program() {
        let (device, gl) = context();
        let mut program = Program::default();
        program.init(&gl, source(FRAG)).unwrap();
        let moved = std::mem::take(&mut program);
        assert!(!program.is_allocated());
        assert!(moved.is_allocated());
        drop(program);
        assert_eq!(device.live(Kind::Program), 1);
        drop(moved);
        assert_eq!(device.live(Kind::Program), 0);
    }

    #[test]
    fn uniforms_are_set_by_name() {
        let (device, gl) = context();
        let mut program = Program::default();
        program.init(&gl, source(FRAG)).unwrap();
        program
            .set_uniforms(&[("exposure", 1.5f32.into()), ("lnum", 2i32.into())])
            .unwrap();
        program.set_uniform("cam_pos", Vec3::ONE).unwrap();
        assert_eq!(device.uniform("exposure"), Some(UniformValue::Float(1.5)));
        assert_eq!(device.uniform("lnum"), Some(UniformValue::Int(2)));
        assert_eq!(device.uniform("cam_pos"), Some(UniformValue::Vec3(Vec3::ONE)));
        assert!(device.calls().contains(&Call::UseProgram(program.handle())));
    }

    #[test]
    fn missing_texture_clears_flag() {
        let (device, gl) = context();
        let mut program = Program::default();
        program.init(&gl, source(FRAG)).unwrap();
        program
            .set_texture("mat_kd_txt", "mat_kd_txt_on", None, 1)
            .unwrap();
        assert_eq!(device.uniform("mat_kd_txt_on"), Some(UniformValue::Bool(false)));
        assert_eq!(device.uniform("mat_kd_txt"), None);
    }

    #[test]
    fn empty_program_cannot_be_used() {
        let program = Program::default();
        assert!(matches!(program.bind(()), Err(GlError::Unallocated(_))));
        assert!(program.set_uniform("gamma", 2.2f32).is_err());
    }
}

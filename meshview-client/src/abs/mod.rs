//! This module contains the GPU abstraction of the viewer, including window
//! setup, the tracked rendering context and the resource wrappers for
//! programs, textures, buffers, shapes and render targets.

pub mod app;
pub mod buffer;
pub mod context;
pub mod device;
pub mod error;
pub mod framebuffer;
pub mod resource;
pub mod shader;
pub mod shape;
pub mod texture;

#[cfg(test)]
pub mod testing;

pub use app::{Callbacks, Window};
pub use context::GlContext;
pub use device::Capability;
pub use error::GlError;
pub use framebuffer::RenderTarget;
pub use resource::GpuResource;
pub use shader::{ErrorPolicy, Program, ProgramSource, UniformValue};
pub use shape::{AttributeSource, Primitive, Shape, ShapeData};
pub use texture::{Texture, TextureImage};

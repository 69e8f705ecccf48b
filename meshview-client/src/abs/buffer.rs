//! Vertex attribute and index buffers.

use std::rc::Rc;

use super::context::GlContext;
use super::device::{BufferData, BufferUsage, RawHandle};
use super::error::GlError;
use super::resource::{GpuResource, context};

/// Per-vertex float data with 1 to 4 components per element.
#[derive(Clone, Copy, Debug)]
pub struct ArrayData<'a> {
    pub values: &'a [f32],
    pub components: u32,
    pub usage: BufferUsage,
}

impl<'a> ArrayData<'a> {
    pub fn new(values: &'a [f32], components: u32) -> Self {
        Self {
            values,
            components,
            usage: BufferUsage::Static,
        }
    }

    fn count(&self) -> Result<usize, String> {
        if !(1..=4).contains(&self.components) {
            return Err(format!("{} components per element", self.components));
        }
        let components = self.components as usize;
        if self.values.len() % components != 0 {
            return Err(format!(
                "{} values do not split into elements of {}",
                self.values.len(),
                components
            ));
        }
        Ok(self.values.len() / components)
    }
}

/// A vertex attribute buffer.
#[derive(Default)]
pub struct ArrayBuffer {
    gl: Option<Rc<GlContext>>,
    handle: Option<RawHandle>,
    count: usize,
    components: u32,
    usage: BufferUsage,
}

impl ArrayBuffer {
    /// Number of elements.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        self.components as usize * std::mem::size_of::<f32>()
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl GpuResource for ArrayBuffer {
    type Data<'a> = ArrayData<'a>;
    /// Attribute location, applied to the bound vertex array.
    type Slot = u32;

    fn init(&mut self, gl: &Rc<GlContext>, data: ArrayData<'_>) -> Result<(), GlError> {
        self.delete();
        let count = data
            .count()
            .map_err(|reason| GlError::allocation("array buffer", reason))?;
        let handle = gl
            .device()
            .create_buffer()
            .map_err(|e| GlError::allocation("array buffer", e))?;
        gl.device()
            .buffer_data(handle, BufferData::Floats(data.values), data.usage);
        self.gl = Some(Rc::clone(gl));
        self.handle = Some(handle);
        self.count = count;
        self.components = data.components;
        self.usage = data.usage;
        Ok(())
    }

    fn update(&mut self, data: ArrayData<'_>) -> Result<(), GlError> {
        let gl = context(&self.gl, "array buffer")?;
        let handle = self.handle.ok_or(GlError::Unallocated("array buffer"))?;
        let count = data
            .count()
            .map_err(|reason| GlError::incompatible("array buffer", reason))?;
        if count != self.count || data.components != self.components {
            return Err(GlError::incompatible(
                "array buffer",
                format!(
                    "{}x{} elements into a buffer of {}x{}",
                    count, data.components, self.count, self.components
                ),
            ));
        }
        gl.device().buffer_sub_data(handle, BufferData::Floats(data.values));
        Ok(())
    }

    fn bind(&self, location: u32) -> Result<(), GlError> {
        let gl = context(&self.gl, "array buffer")?;
        let handle = self.handle.ok_or(GlError::Unallocated("array buffer"))?;
        gl.device()
            .vertex_attrib_buffer(location, handle, self.components);
        Ok(())
    }

    fn delete(&mut self) {
        let Some(gl) = self.gl.take() else {
            return;
        };
        if let Some(handle) = self.handle.take() {
            gl.device().delete_buffer(handle);
        }
        self.count = 0;
    }

    fn is_allocated(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for ArrayBuffer {
    fn drop(&mut self) {
        self.delete();
    }
}

/// Indices grouped into primitives of 1 (points), 2 (lines) or 3
/// (triangles) vertices.
#[derive(Clone, Copy, Debug)]
pub struct ElementData<'a> {
    pub indices: &'a [u32],
    pub per_primitive: u32,
    pub usage: BufferUsage,
}

impl<'a> ElementData<'a> {
    pub fn new(indices: &'a [u32], per_primitive: u32) -> Self {
        Self {
            indices,
            per_primitive,
            usage: BufferUsage::Static,
        }
    }

    fn count(&self) -> Result<usize, String> {
        if !(1..=3).contains(&self.per_primitive) {
            return Err(format!("{} indices per primitive", self.per_primitive));
        }
        let per = self.per_primitive as usize;
        if self.indices.len() % per != 0 {
            return Err(format!(
                "{} indices do not split into primitives of {}",
                self.indices.len(),
                per
            ));
        }
        Ok(self.indices.len() / per)
    }
}

/// An index buffer.
#[derive(Default)]
pub struct ElementBuffer {
    gl: Option<Rc<GlContext>>,
    handle: Option<RawHandle>,
    count: usize,
    per_primitive: u32,
}

impl ElementBuffer {
    /// Number of primitives.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of indices a draw of the whole buffer consumes.
    pub fn index_count(&self) -> u32 {
        (self.count * self.per_primitive as usize) as u32
    }
}

impl GpuResource for ElementBuffer {
    type Data<'a> = ElementData<'a>;
    /// Attaches to the bound vertex array.
    type Slot = ();

    fn init(&mut self, gl: &Rc<GlContext>, data: ElementData<'_>) -> Result<(), GlError> {
        self.delete();
        let count = data
            .count()
            .map_err(|reason| GlError::allocation("element buffer", reason))?;
        let handle = gl
            .device()
            .create_buffer()
            .map_err(|e| GlError::allocation("element buffer", e))?;
        gl.device()
            .buffer_data(handle, BufferData::Indices(data.indices), data.usage);
        self.gl = Some(Rc::clone(gl));
        self.handle = Some(handle);
        self.count = count;
        self.per_primitive = data.per_primitive;
        Ok(())
    }

    fn update(&mut self, data: ElementData<'_>) -> Result<(), GlError> {
        let gl = context(&self.gl, "element buffer")?;
        let handle = self.handle.ok_or(GlError::Unallocated("element buffer"))?;
        let count = data
            .count()
            .map_err(|reason| GlError::incompatible("element buffer", reason))?;
        if count != self.count || data.per_primitive != self.per_primitive {
            return Err(GlError::incompatible(
                "element buffer",
                format!(
                    "{}x{} indices into a buffer of {}x{}",
                    count, data.per_primitive, self.count, self.per_primitive
                ),
            ));
        }
        gl.device().buffer_sub_data(handle, BufferData::Indices(data.indices));
        Ok(())
    }

    fn bind(&self, _slot: ()) -> Result<(), GlError> {
        let gl = context(&self.gl, "element buffer")?;
        let handle = self.handle.ok_or(GlError::Unallocated("element buffer"))?;
        gl.device().bind_element_buffer(Some(handle));
        Ok(())
    }

    fn delete(&mut self) {
        let Some(gl) = self.gl.take() else {
            return;
        };
        if let Some(handle) = self.handle.take() {
            gl.device().delete_buffer(handle);
        }
        self.count = 0;
    }

    fn is_allocated(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for ElementBuffer {
    fn drop(&mut self) {
        self.delete();
    }
}

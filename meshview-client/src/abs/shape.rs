//! Shape management module.
//!
//! A [`Shape`] is a vertex array object with its attribute buffers at fixed
//! locations, an optional index buffer and a primitive type.

use std::rc::Rc;

use glam::Vec4;

use super::buffer::{ArrayBuffer, ArrayData, ElementBuffer, ElementData};
use super::context::GlContext;
use super::device::{BufferUsage, DrawMode, RawHandle};
use super::error::GlError;
use super::resource::{GpuResource, context};

pub const POSITION: u32 = 0;
pub const NORMAL: u32 = 1;
pub const TEXCOORD: u32 = 2;
pub const COLOR: u32 = 3;
pub const TANGENT: u32 = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Primitive {
    Points,
    Lines,
    #[default]
    Triangles,
}

impl Primitive {
    /// Vertices per primitive.
    pub fn vertices(self) -> u32 {
        match self {
            Self::Points => 1,
            Self::Lines => 2,
            Self::Triangles => 3,
        }
    }

    fn indexed_mode(self) -> DrawMode {
        match self {
            Self::Points => DrawMode::Points,
            Self::Lines => DrawMode::Lines,
            Self::Triangles => DrawMode::Triangles,
        }
    }

    /// Mode for shapes without indices: a point list or a strip.
    fn strip_mode(self) -> DrawMode {
        match self {
            Self::Points => DrawMode::Points,
            Self::Lines => DrawMode::LineStrip,
            Self::Triangles => DrawMode::TriangleStrip,
        }
    }
}

/// Where an attribute gets its values.
#[derive(Clone, Copy, Debug)]
pub enum AttributeSource<'a> {
    Values { values: &'a [f32], components: u32 },
    /// The same value for every vertex.
    Constant(Vec4),
}

/// Everything a shape is built from.
#[derive(Clone, Debug, Default)]
pub struct ShapeData<'a> {
    pub primitive: Primitive,
    /// `(location, source)` pairs. Location [`POSITION`] must have values.
    pub attributes: Vec<(u32, AttributeSource<'a>)>,
    /// Indices, or empty to draw the vertices in order.
    pub elements: &'a [u32],
    pub usage: BufferUsage,
}

const QUAD_POSITIONS: [f32; 12] = [
    -1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0,
];
const QUAD_TEXCOORDS: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
const QUAD_ELEMENTS: [u32; 6] = [0, 1, 2, 0, 2, 3];

impl ShapeData<'static> {
    /// A quad covering clip space, with texture coordinates.
    pub fn quad() -> Self {
        Self {
            primitive: Primitive::Triangles,
            attributes: vec![
                (
                    POSITION,
                    AttributeSource::Values {
                        values: &QUAD_POSITIONS,
                        components: 3,
                    },
                ),
                (
                    TEXCOORD,
                    AttributeSource::Values {
                        values: &QUAD_TEXCOORDS,
                        components: 2,
                    },
                ),
            ],
            elements: &QUAD_ELEMENTS,
            usage: BufferUsage::Static,
        }
    }
}

enum Attribute {
    Buffer(ArrayBuffer),
    Constant(Vec4),
}

/// Represents a shape stored on the GPU side.
#[derive(Default)]
pub struct Shape {
    gl: Option<Rc<GlContext>>,
    vertex_array: Option<RawHandle>,
    attributes: Vec<(u32, Attribute)>,
    elements: ElementBuffer,
    primitive: Primitive,
    vertex_count: usize,
}

fn element_count(location: u32, values: &[f32], components: u32) -> Result<usize, String> {
    if components == 0 {
        return Err(format!("attribute {} has no components", location));
    }
    Ok(values.len() / components as usize)
}

/// Number of vertices, taken from the positions. Every other buffered
/// attribute must match it.
fn vertex_count(data: &ShapeData<'_>) -> Result<usize, String> {
    let count = data
        .attributes
        .iter()
        .find_map(|(location, source)| match source {
            AttributeSource::Values { values, components } if *location == POSITION => {
                Some(element_count(*location, values, *components))
            }
            _ => None,
        })
        .ok_or_else(|| "no position attribute".to_string())??;
    for (location, source) in &data.attributes {
        if let AttributeSource::Values { values, components } = source {
            let n = element_count(*location, values, *components)?;
            if n != count {
                return Err(format!(
                    "attribute {} has {} elements, positions have {}",
                    location, n, count
                ));
            }
        }
    }
    Ok(count)
}

impl Shape {
    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    pub fn is_indexed(&self) -> bool {
        self.elements.is_allocated()
    }

    /// Whether attribute `location` is sourced from a buffer rather than a
    /// constant.
    pub fn has_buffer(&self, location: u32) -> bool {
        self.attributes
            .iter()
            .any(|(l, attribute)| *l == location && matches!(attribute, Attribute::Buffer(_)))
    }

    /// Uploads `data`, reallocating only when the layout or counts change.
    ///
    /// A shape reallocated here has changed since it was created, so its new
    /// buffers are allocated with [`BufferUsage::Dynamic`].
    pub fn set_data(&mut self, gl: &Rc<GlContext>, data: ShapeData<'_>) -> Result<(), GlError> {
        if !self.is_allocated() {
            return self.init(gl, data);
        }
        match self.update(data.clone()) {
            Err(GlError::Incompatible { .. }) => {
                self.delete();
                self.init(
                    gl,
                    ShapeData {
                        usage: BufferUsage::Dynamic,
                        ..data
                    },
                )
            }
            other => other,
        }
    }

    /// Issues the draw call for the whole shape.
    pub fn draw(&self) -> Result<(), GlError> {
        let gl = context(&self.gl, "shape")?;
        self.bind(())?;
        for (location, attribute) in &self.attributes {
            if let Attribute::Constant(value) = attribute {
                gl.device().vertex_attrib_constant(*location, *value);
            }
        }
        if self.elements.is_allocated() {
            gl.device()
                .draw_elements(self.primitive.indexed_mode(), self.elements.index_count());
        } else {
            gl.device()
                .draw_arrays(self.primitive.strip_mode(), self.vertex_count as u32);
        }
        Ok(())
    }
}

impl GpuResource for Shape {
    type Data<'a> = ShapeData<'a>;
    type Slot = ();

    fn init(&mut self, gl: &Rc<GlContext>, data: ShapeData<'_>) -> Result<(), GlError> {
        self.delete();
        let vertex_count =
            vertex_count(&data).map_err(|reason| GlError::allocation("shape", reason))?;
        let vertex_array = gl
            .device()
            .create_vertex_array()
            .map_err(|e| GlError::allocation("vertex array", e))?;

        // Owned from here on, so an early return releases everything made so far.
        let mut shape = Shape {
            gl: Some(Rc::clone(gl)),
            vertex_array: Some(vertex_array),
            attributes: Vec::new(),
            elements: ElementBuffer::default(),
            primitive: data.primitive,
            vertex_count,
        };
        gl.bind_vertex_array(Some(vertex_array));
        let built = shape.fill(gl, &data);
        gl.bind_vertex_array(None);
        built?;

        *self = shape;
        Ok(())
    }

    fn update(&mut self, data: ShapeData<'_>) -> Result<(), GlError> {
        if !self.is_allocated() {
            return Err(GlError::Unallocated("shape"));
        }
        if data.primitive != self.primitive {
            return Err(GlError::incompatible("shape", "primitive changed"));
        }
        let same_layout = data.attributes.len() == self.attributes.len()
            && data
                .attributes
                .iter()
                .zip(&self.attributes)
                .all(|((l, source), (location, attribute))| {
                    l == location
                        && matches!(
                            (source, attribute),
                            (AttributeSource::Values { .. }, Attribute::Buffer(_))
                                | (AttributeSource::Constant(_), Attribute::Constant(_))
                        )
                });
        if !same_layout {
            return Err(GlError::incompatible("shape", "attribute layout changed"));
        }
        if data.elements.is_empty() == self.elements.is_allocated() {
            return Err(GlError::incompatible("shape", "indexing changed"));
        }
        let vertex_count =
            vertex_count(&data).map_err(|reason| GlError::incompatible("shape", reason))?;
        if vertex_count != self.vertex_count {
            return Err(GlError::incompatible(
                "shape",
                format!("{} vertices into a shape of {}", vertex_count, self.vertex_count),
            ));
        }

        for ((_, source), (_, attribute)) in data.attributes.iter().zip(&mut self.attributes) {
            match (source, attribute) {
                (AttributeSource::Values { values, components }, Attribute::Buffer(buffer)) => {
                    buffer.update(ArrayData::new(values, *components))?;
                }
                (AttributeSource::Constant(value), Attribute::Constant(current)) => {
                    *current = *value;
                }
                _ => unreachable!("layout checked above"),
            }
        }
        if !data.elements.is_empty() {
            self.elements
                .update(ElementData::new(data.elements, self.primitive.vertices()))?;
        }
        Ok(())
    }

    fn bind(&self, _slot: ()) -> Result<(), GlError> {
        let gl = context(&self.gl, "shape")?;
        let vertex_array = self.vertex_array.ok_or(GlError::Unallocated("shape"))?;
        gl.bind_vertex_array(Some(vertex_array));
        Ok(())
    }

    fn delete(&mut self) {
        let Some(gl) = self.gl.take() else {
            return;
        };
        if let Some(vertex_array) = self.vertex_array.take() {
            gl.delete_vertex_array(vertex_array);
        }
        self.attributes.clear();
        self.elements.delete();
        self.vertex_count = 0;
    }

    fn is_allocated(&self) -> bool {
        self.vertex_array.is_some()
    }
}

impl Shape {
    /// Creates the buffers of `data` into the bound vertex array.
    fn fill(&mut self, gl: &Rc<GlContext>, data: &ShapeData<'_>) -> Result<(), GlError> {
        for (location, source) in &data.attributes {
            match source {
                AttributeSource::Values { values, components } => {
                    let mut buffer = ArrayBuffer::default();
                    buffer.init(
                        gl,
                        ArrayData {
                            usage: data.usage,
                            ..ArrayData::new(values, *components)
                        },
                    )?;
                    buffer.bind(*location)?;
                    self.attributes.push((*location, Attribute::Buffer(buffer)));
                }
                AttributeSource::Constant(value) => {
                    self.attributes.push((*location, Attribute::Constant(*value)));
                }
            }
        }
        if !data.elements.is_empty() {
            self.elements.init(
                gl,
                ElementData {
                    usage: data.usage,
                    ..ElementData::new(data.elements, self.primitive.vertices())
                },
            )?;
            self.elements.bind(())?;
        }
        Ok(())
    }
}

impl Drop for Shape {
    fn drop(&mut self) {
        self.delete();
    }
}

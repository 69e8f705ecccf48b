//! Textured quads: presenting render targets and drawing images in window
//! pixel coordinates.

use std::rc::Rc;

use glam::{UVec2, Vec2};

use super::{QUAD_FRAG, QUAD_VERT};
use crate::abs::{
    ErrorPolicy, GlContext, GlError, GpuResource, Program, ProgramSource, Shape, ShapeData,
    Texture,
};

/// Draws textures on a unit quad.
pub struct ImageDrawer {
    program: Program,
    quad: Shape,
}

impl ImageDrawer {
    pub fn new(gl: &Rc<GlContext>) -> Result<Self, GlError> {
        let mut program = Program::default();
        program.load(
            gl,
            ProgramSource {
                vertex: QUAD_VERT,
                fragment: QUAD_FRAG,
            },
            ErrorPolicy::Strict,
        )?;
        let mut quad = Shape::default();
        quad.init(gl, ShapeData::quad())?;
        Ok(Self { program, quad })
    }

    /// Draws `texture` centered at `center` (window pixels, y down) and
    /// scaled by `scale` from its own size.
    pub fn draw(
        &self,
        texture: &Texture,
        window_size: UVec2,
        center: Vec2,
        scale: f32,
    ) -> Result<(), GlError> {
        self.draw_sized(texture, window_size, texture.desc().size, center, scale)
    }

    /// Stretches `texture` over the whole window.
    pub fn draw_fullscreen(&self, texture: &Texture, window_size: UVec2) -> Result<(), GlError> {
        self.draw_sized(
            texture,
            window_size,
            window_size,
            window_size.as_vec2() / 2.0,
            1.0,
        )
    }

    fn draw_sized(
        &self,
        texture: &Texture,
        window_size: UVec2,
        image_size: UVec2,
        center: Vec2,
        scale: f32,
    ) -> Result<(), GlError> {
        if !texture.is_allocated() {
            return Err(GlError::Unallocated("texture"));
        }
        self.program.set_texture("txt", "txt_on", Some(texture), 0)?;
        self.program.set_uniforms(&[
            ("window_size", window_size.max(UVec2::ONE).as_vec2().into()),
            ("image_size", image_size.as_vec2().into()),
            ("image_center", center.into()),
            ("image_scale", scale.into()),
        ])?;
        self.quad.draw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abs::device::{DrawMode, TextureDesc, TextureFormat};
    use crate::abs::testing::{Call, RecordingDevice};
    use crate::abs::{TextureImage, UniformValue};

    fn texture(gl: &Rc<GlContext>, size: UVec2) -> Texture {
        let mut texture = Texture::default();
        texture
            .init(
                gl,
                TextureImage {
                    desc: TextureDesc::new(size, TextureFormat::Rgba8),
                    pixels: None,
                },
            )
            .unwrap();
        texture
    }

    #[test]
    fn fullscreen_covers_the_window() {
        let device = RecordingDevice::new();
        let gl = Rc::new(GlContext::new(device.clone()));
        let drawer = ImageDrawer::new(&gl).unwrap();
        let texture = texture(&gl, UVec2::new(16, 16));

        drawer
            .draw_fullscreen(&texture, UVec2::new(640, 480))
            .unwrap();
        assert_eq!(
            device.uniform("image_center"),
            Some(UniformValue::Vec2(Vec2::new(320.0, 240.0)))
        );
        assert_eq!(
            device.uniform("image_size"),
            Some(UniformValue::Vec2(Vec2::new(640.0, 480.0)))
        );
        assert_eq!(device.uniform("txt"), Some(UniformValue::Int(0)));
        assert_eq!(
            device.draws(),
            vec![Call::DrawElements {
                mode: DrawMode::Triangles,
                count: 6
            }]
        );
    }

    #[test]
    fn images_keep_their_size() {
        let device = RecordingDevice::new();
        let gl = Rc::new(GlContext::new(device.clone()));
        let drawer = ImageDrawer::new(&gl).unwrap();
        let texture = texture(&gl, UVec2::new(32, 8));
        drawer
            .draw(&texture, UVec2::new(100, 100), Vec2::new(50.0, 50.0), 2.0)
            .unwrap();
        assert_eq!(
            device.uniform("image_size"),
            Some(UniformValue::Vec2(Vec2::new(32.0, 8.0)))
        );
        assert_eq!(device.uniform("image_scale"), Some(UniformValue::Float(2.0)));

        let empty = Texture::default();
        assert!(matches!(
            drawer.draw(&empty, UVec2::ONE, Vec2::ZERO, 1.0),
            Err(GlError::Unallocated(_))
        ));
    }
}

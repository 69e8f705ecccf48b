//! Structs and functions for handling textures.
//!
//! The module provides the [`Texture`] struct which is a CPU representation of a GPU texture.

use std::rc::Rc;

use glam::UVec2;
use image::{DynamicImage, GenericImageView};

use super::context::{GlContext, TEXTURE_UNITS};
use super::device::{Pixels, RawHandle, TextureDesc, TextureFormat};
use super::error::GlError;
use super::resource::{GpuResource, context};

/// Unit textures are bound to while uploading, kept clear of the material units.
const UPLOAD_UNIT: u32 = TEXTURE_UNITS as u32 - 1;

/// An image to upload: its description plus optional pixel data.
#[derive(Clone, Copy, Debug)]
pub struct TextureImage<'a> {
    pub desc: TextureDesc,
    /// `None` allocates uninitialized storage.
    pub pixels: Option<Pixels<'a>>,
}

fn check_pixels(format: TextureFormat, size: UVec2, pixels: &Pixels<'_>) -> Result<(), String> {
    let float = format == TextureFormat::Rgba32F;
    match pixels {
        Pixels::Floats(_) if !float => return Err(format!("float pixels for {:?}", format)),
        Pixels::Bytes(_) if float => return Err("byte pixels for a float texture".to_string()),
        _ => {}
    }
    let expected = size.x as usize * size.y as usize * format.bytes_per_pixel();
    if pixels.byte_len() != expected {
        return Err(format!(
            "{} bytes of pixel data for a {}x{} image, expected {}",
            pixels.byte_len(),
            size.x,
            size.y,
            expected
        ));
    }
    Ok(())
}

/// Represents a texture stored on the GPU side.
#[derive(Default)]
pub struct Texture {
    gl: Option<Rc<GlContext>>,
    handle: Option<RawHandle>,
    desc: TextureDesc,
}

impl Texture {
    /// Creates a texture from the given [`image::DynamicImage`].
    ///
    /// HDR images become float textures. Other images are stored as 8-bit
    /// RGBA, sRGB-encoded when `srgb` is set.
    pub fn from_image(gl: &Rc<GlContext>, image: &DynamicImage, srgb: bool) -> Result<Self, GlError> {
        let (width, height) = image.dimensions();
        let mut desc = TextureDesc::new(UVec2::new(width, height), TextureFormat::Rgba8);
        desc.mipmap = true;
        let mut texture = Self::default();
        match image {
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                desc.format = TextureFormat::Rgba32F;
                let data = image.to_rgba32f().into_raw();
                texture.init(
                    gl,
                    TextureImage {
                        desc,
                        pixels: Some(Pixels::Floats(&data)),
                    },
                )?;
            }
            _ => {
                if srgb {
                    desc.format = TextureFormat::Srgba8;
                }
                let data = image.to_rgba8().into_raw();
                texture.init(
                    gl,
                    TextureImage {
                        desc,
                        pixels: Some(Pixels::Bytes(&data)),
                    },
                )?;
            }
        }
        Ok(texture)
    }

    pub fn desc(&self) -> TextureDesc {
        self.desc
    }

    pub fn handle(&self) -> Option<RawHandle> {
        self.handle
    }

    /// Uploads `image`, allocating only when needed: an empty texture is
    /// initialized, a changed description reallocates, anything else is an
    /// in-place update.
    pub fn set_image(&mut self, gl: &Rc<GlContext>, image: TextureImage<'_>) -> Result<(), GlError> {
        if !self.is_allocated() {
            return self.init(gl, image);
        }
        if self.desc != image.desc {
            self.delete();
            return self.init(gl, image);
        }
        self.update(image)
    }

    /// Overwrites a sub-rectangle. The pixel format must match the texture.
    pub fn update_region(&mut self, offset: UVec2, size: UVec2, pixels: Pixels<'_>) -> Result<(), GlError> {
        let gl = context(&self.gl, "texture")?;
        let handle = self.handle.ok_or(GlError::Unallocated("texture"))?;
        let end = offset + size;
        if end.x > self.desc.size.x || end.y > self.desc.size.y {
            return Err(GlError::incompatible(
                "texture",
                format!("region ends at {} outside {}", end, self.desc.size),
            ));
        }
        check_pixels(self.desc.format, size, &pixels)
            .map_err(|reason| GlError::incompatible("texture", reason))?;
        gl.bind_texture(UPLOAD_UNIT, Some(handle));
        gl.device().tex_sub_image(offset, size, self.desc.format, pixels);
        if self.desc.mipmap {
            gl.device().generate_mipmap();
        }
        Ok(())
    }
}

impl GpuResource for Texture {
    type Data<'a> = TextureImage<'a>;
    type Slot = u32;

    fn init(&mut self, gl: &Rc<GlContext>, image: TextureImage<'_>) -> Result<(), GlError> {
        self.delete();
        let desc = image.desc;
        if desc.size.x == 0 || desc.size.y == 0 {
            return Err(GlError::allocation("texture", format!("empty size {}", desc.size)));
        }
        if let Some(pixels) = &image.pixels {
            check_pixels(desc.format, desc.size, pixels)
                .map_err(|reason| GlError::allocation("texture", reason))?;
        }
        let handle = gl
            .device()
            .create_texture()
            .map_err(|e| GlError::allocation("texture", e))?;
        gl.bind_texture(UPLOAD_UNIT, Some(handle));
        gl.device().tex_image(&desc, image.pixels);
        // Empty storage still needs the full level chain to be sampleable.
        if desc.mipmap {
            gl.device().generate_mipmap();
        }
        self.gl = Some(Rc::clone(gl));
        self.handle = Some(handle);
        self.desc = desc;
        Ok(())
    }

    fn update(&mut self, image: TextureImage<'_>) -> Result<(), GlError> {
        if !self.is_allocated() {
            return Err(GlError::Unallocated("texture"));
        }
        if image.desc != self.desc {
            return Err(GlError::incompatible(
                "texture",
                format!("{:?} differs from {:?}", image.desc, self.desc),
            ));
        }
        match image.pixels {
            Some(pixels) => self.update_region(UVec2::ZERO, self.desc.size, pixels),
            None => Ok(()),
        }
    }

    fn bind(&self, unit: u32) -> Result<(), GlError> {
        let gl = context(&self.gl, "texture")?;
        let handle = self.handle.ok_or(GlError::Unallocated("texture"))?;
        gl.bind_texture(unit, Some(handle));
        Ok(())
    }

    fn delete(&mut self) {
        let Some(gl) = self.gl.take() else {
            return;
        };
        if let Some(handle) = self.handle.take() {
            gl.delete_texture(handle);
        }
        self.desc = TextureDesc::default();
    }

    fn is_allocated(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.delete();
    }
}

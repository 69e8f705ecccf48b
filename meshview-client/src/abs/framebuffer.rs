//! Offscreen render targets.

use std::rc::Rc;

use glam::UVec2;

use super::context::GlContext;
use super::device::{RawHandle, TextureDesc, TextureFormat};
use super::error::GlError;
use super::resource::{GpuResource, context};
use super::texture::{Texture, TextureImage};

/// A framebuffer with a float color texture and a depth buffer.
#[derive(Default)]
pub struct RenderTarget {
    gl: Option<Rc<GlContext>>,
    framebuffer: Option<RawHandle>,
    depth: Option<RawHandle>,
    color: Texture,
}

impl RenderTarget {
    pub fn size(&self) -> UVec2 {
        self.color.desc().size
    }

    /// The color attachment, for presenting the target.
    pub fn color(&self) -> &Texture {
        &self.color
    }

    /// Matches the target to `size`, reallocating only when it changed.
    pub fn resize(&mut self, gl: &Rc<GlContext>, size: UVec2) -> Result<(), GlError> {
        if self.is_allocated() && self.size() == size {
            return Ok(());
        }
        self.init(gl, size)
    }

    /// Returns drawing to the default framebuffer.
    pub fn unbind(&self) {
        if let Some(gl) = &self.gl {
            gl.bind_framebuffer(None);
        }
    }

    fn attach(&mut self, gl: &Rc<GlContext>, size: UVec2) -> Result<(), GlError> {
        self.color.init(
            gl,
            TextureImage {
                desc: TextureDesc::new(size, TextureFormat::Rgba32F),
                pixels: None,
            },
        )?;
        let color = self.color.handle().ok_or(GlError::Unallocated("texture"))?;
        gl.device().attach_color_texture(color);
        self.depth = Some(
            gl.device()
                .create_depth_buffer(size)
                .map_err(|e| GlError::allocation("depth buffer", e))?,
        );
        let status = gl.device().framebuffer_status();
        if status != glow::FRAMEBUFFER_COMPLETE {
            return Err(GlError::FramebufferIncomplete(status));
        }
        Ok(())
    }
}

impl GpuResource for RenderTarget {
    /// Size in pixels.
    type Data<'a> = UVec2;
    type Slot = ();

    fn init(&mut self, gl: &Rc<GlContext>, size: UVec2) -> Result<(), GlError> {
        self.delete();
        if size.x == 0 || size.y == 0 {
            return Err(GlError::allocation("render target", format!("empty size {}", size)));
        }
        let framebuffer = gl
            .device()
            .create_framebuffer()
            .map_err(|e| GlError::allocation("framebuffer", e))?;
        self.gl = Some(Rc::clone(gl));
        self.framebuffer = Some(framebuffer);

        gl.bind_framebuffer(Some(framebuffer));
        let attached = self.attach(gl, size);
        gl.bind_framebuffer(None);
        if attached.is_err() {
            self.delete();
        }
        attached
    }

    /// Render targets have no contents to upload; any size change is
    /// incompatible.
    fn update(&mut self, size: UVec2) -> Result<(), GlError> {
        if !self.is_allocated() {
            return Err(GlError::Unallocated("render target"));
        }
        if size != self.size() {
            return Err(GlError::incompatible(
                "render target",
                format!("{} differs from {}", size, self.size()),
            ));
        }
        Ok(())
    }

    /// Binds the framebuffer and sets the viewport to cover it.
    fn bind(&self, _slot: ()) -> Result<(), GlError> {
        let gl = context(&self.gl, "render target")?;
        let framebuffer = self.framebuffer.ok_or(GlError::Unallocated("render target"))?;
        gl.bind_framebuffer(Some(framebuffer));
        gl.device().viewport(self.size());
        Ok(())
    }

    fn delete(&mut self) {
        let Some(gl) = self.gl.take() else {
            return;
        };
        if let Some(depth) = self.depth.take() {
            gl.device().delete_depth_buffer(depth);
        }
        if let Some(framebuffer) = self.framebuffer.take() {
            gl.delete_framebuffer(framebuffer);
        }
        self.color.delete();
    }

    fn is_allocated(&self) -> bool {
        self.framebuffer.is_some()
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        self.delete();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::abs::testing::{Call, Kind, RecordingDevice};

    fn context() -> (Arc<RecordingDevice>, Rc<GlContext>) {
        let device = RecordingDevice::new();
        let gl = Rc::new(GlContext::new(device.clone()));
        (device, gl)
    }

    #[test]
    fn init_attaches_color_and_depth() {
        let (device, gl) = context();
        let mut target = RenderTarget::default();
        target.init(&gl, UVec2::new(64, 32)).unwrap();
        assert_eq!(target.size(), UVec2::new(64, 32));
        assert_eq!(target.color().desc().format, TextureFormat::Rgba32F);
        assert_eq!(device.live(Kind::Framebuffer), 1);
        assert_eq!(device.live(Kind::Renderbuffer), 1);
        assert!(device
            .calls()
            .iter()
            .any(|c| matches!(c, Call::AttachColor(_))));

        device.clear_calls();
        target.bind(()).unwrap();
        assert!(device.calls().contains(&Call::Viewport(UVec2::new(64, 32))));
    }

    #[test]
    fn incomplete_framebuffer_releases_everything() {
        let (device, gl) = context();
        device.set_framebuffer_status(glow::FRAMEBUFFER_UNSUPPORTED);
        let mut target = RenderTarget::default();
        let err = target.init(&gl, UVec2::new(8, 8)).unwrap_err();
        assert!(matches!(err, GlError::FramebufferIncomplete(_)));
        assert!(!target.is_allocated());
        assert_eq!(device.live(Kind::Framebuffer), 0);
        assert_eq!(device.live(Kind::Renderbuffer), 0);
        assert_eq!(device.live(Kind::Texture), 0);
    }

    #[test]
    fn resize_reallocates_only_on_change() {
        let (device, gl) = context();
        let mut target = RenderTarget::default();
        target.resize(&gl, UVec2::new(16, 16)).unwrap();
        target.resize(&gl, UVec2::new(16, 16)).unwrap();
        assert_eq!(device.created(Kind::Framebuffer), 1);
        target.resize(&gl, UVec2::new(32, 16)).unwrap();
        assert_eq!(device.created(Kind::Framebuffer), 2);
        assert_eq!(device.live(Kind::Framebuffer), 1);
        assert!(matches!(
            target.update(UVec2::new(1, 1)),
            Err(GlError::Incompatible { .. })
        ));
    }

    #[test]
    fn deleting_a_bound_target_clears_the_binding() {
        let (device, gl) = context();
        let mut target = RenderTarget::default();
        target.init(&gl, UVec2::new(4, 4)).unwrap();
        target.bind(()).unwrap();
        target.delete();
        target.delete();
        assert_eq!(
            gl.bind_state().framebuffer,
            crate::abs::context::Binding::Unbound
        );
        assert_eq!(device.invalid_deletes(), 0);
    }
}

//! Camera frames and orbit navigation.
//!
//! A camera is placed by a [`Frame`]: an orthonormal basis plus an origin. The
//! camera looks down the negative `z` axis of its frame and orbits around a
//! point `focus` units in front of it.

use glam::{Mat4, Vec2, Vec3};

use crate::mesh::Bounds;

/// Orthonormal basis plus origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub x: Vec3,
    pub y: Vec3,
    pub z: Vec3,
    pub o: Vec3,
}

impl Default for Frame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Frame {
    pub const IDENTITY: Self = Self {
        x: Vec3::X,
        y: Vec3::Y,
        z: Vec3::Z,
        o: Vec3::ZERO,
    };

    /// Builds a frame at `eye` whose `z` axis points away from `center`.
    pub fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Self {
        let z = (eye - center).normalize();
        let x = up.cross(z).normalize();
        let y = z.cross(x).normalize();
        Self { x, y, z, o: eye }
    }

    /// The frame as a column-major transform.
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_cols(
            self.x.extend(0.0),
            self.y.extend(0.0),
            self.z.extend(0.0),
            self.o.extend(1.0),
        )
    }

    /// Inverse transform, valid because the basis is orthonormal.
    pub fn inverse_mat4(&self) -> Mat4 {
        let rotation = Mat4::from_cols(
            self.x.extend(0.0),
            self.y.extend(0.0),
            self.z.extend(0.0),
            glam::Vec4::W,
        )
        .transpose();
        rotation * Mat4::from_translation(-self.o)
    }
}

/// A perspective camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub frame: Frame,
    /// Distance from the origin to the orbit center.
    pub focus: f32,
    /// Lens focal length in meters.
    pub lens: f32,
    /// Film width in meters.
    pub film: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            frame: Frame::look_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y),
            focus: 3.0,
            lens: 0.050,
            film: 0.036,
        }
    }
}

impl Camera {
    /// Creates a camera at `from` looking at `to`.
    pub fn look_at(from: Vec3, to: Vec3) -> Self {
        Self {
            frame: Frame::look_at(from, to, Vec3::Y),
            focus: from.distance(to),
            ..Default::default()
        }
    }

    /// Creates a camera that frames the given points from above and in front.
    pub fn framing<'a>(positions: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let direction = Vec3::new(0.0, 1.0, 2.0);
        let (center, size) = match Bounds::from_points(positions) {
            Some(bounds) => (bounds.center(), bounds.size().max_element()),
            None => (Vec3::ZERO, 1.0),
        };
        // Flat or single-point meshes still need a non-degenerate distance.
        let size = if size > 0.0 { size } else { 1.0 };
        Self::look_at(direction * size + center, center)
    }

    /// Vertical field of view for the given aspect ratio.
    pub fn yfov(&self, aspect: f32) -> f32 {
        if aspect > 0.0 {
            2.0 * (self.film / (aspect * 2.0 * self.lens)).atan()
        } else {
            2.0 * (self.film / (2.0 * self.lens)).atan()
        }
    }

    /// World to camera transform.
    pub fn view_matrix(&self) -> Mat4 {
        self.frame.inverse_mat4()
    }

    /// OpenGL projection for a viewport of `size` pixels.
    pub fn projection_matrix(&self, size: glam::UVec2, near: f32, far: f32) -> Mat4 {
        let aspect = if size.y > 0 {
            size.x as f32 / size.y as f32
        } else {
            1.0
        };
        Mat4::perspective_rh_gl(self.yfov(aspect), aspect, near, far)
    }

    /// Applies an orbit update around the focus point.
    pub fn orbit(&mut self, input: OrbitInput) {
        update_turntable(&mut self.frame, &mut self.focus, input);
    }
}

/// Mouse-driven navigation amounts for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrbitInput {
    pub rotate: Vec2,
    pub dolly: f32,
    pub pan: Vec2,
}

impl OrbitInput {
    /// Maps a mouse drag to orbit amounts.
    ///
    /// Left drag rotates, shift+left drag pans, right drag dollies and the
    /// wheel dollies in steps.
    pub fn from_mouse(
        delta: Vec2,
        left: bool,
        right: bool,
        shift: bool,
        scroll: f32,
        focus: f32,
    ) -> Self {
        let mut input = Self::default();
        if left && !shift {
            input.rotate = delta / 100.0;
        }
        if right {
            input.dolly = delta.x / 100.0;
        }
        if left && shift {
            input.pan = delta * focus / 200.0;
        }
        input.pan.x = -input.pan.x;
        input.dolly -= scroll * 0.1;
        input
    }

    pub fn is_zero(&self) -> bool {
        self.rotate == Vec2::ZERO && self.dolly == 0.0 && self.pan == Vec2::ZERO
    }
}

/// Turntable navigation: rotation keeps the world up axis, dolly scales the
/// focus distance and pan translates in the image plane.
pub fn update_turntable(frame: &mut Frame, focus: &mut f32, input: OrbitInput) {
    if input.rotate != Vec2::ZERO {
        let phi = frame.z.z.atan2(frame.z.x) + input.rotate.x;
        let theta = frame.z.y.clamp(-1.0, 1.0).acos() + input.rotate.y;
        let theta = theta.clamp(0.001, std::f32::consts::PI - 0.001);
        let new_z = Vec3::new(
            theta.sin() * phi.cos(),
            theta.cos(),
            theta.sin() * phi.sin(),
        );
        let center = frame.o - frame.z * *focus;
        let origin = center + new_z * *focus;
        *frame = Frame::look_at(origin, center, Vec3::Y);
        *focus = origin.distance(center);
    }
    if input.dolly != 0.0 {
        let center = frame.o - frame.z * *focus;
        *focus = (*focus * (1.0 + input.dolly)).max(0.001);
        frame.o = center + frame.z * *focus;
    }
    if input.pan != Vec2::ZERO {
        frame.o += frame.x * input.pan.x + frame.y * input.pan.y;
    }
}

//! Fly-through movement for the camera.

use glam::Vec3;

use crate::camera::Frame;

/// Which movement keys are held this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveKeys {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveKeys {
    pub fn any(&self) -> bool {
        self.forward || self.back || self.left || self.right
    }
}

/// Damped explicit-Euler integrator driving the camera origin.
///
/// The controller owns the camera velocity; nothing else mutates it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlyController {
    velocity: Vec3,
}

impl FlyController {
    /// Velocity gain applied to the accumulated thrust.
    pub const THRUST: f32 = 3000.0;
    /// Exponential decay rate once all keys are released.
    pub const DAMPING: f32 = 3.0;

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Advances the camera by `dt` seconds.
    pub fn step(&mut self, frame: &mut Frame, keys: MoveKeys, dt: f32) {
        let (velocity, origin) = integrate(self.velocity, frame, keys, dt);
        self.velocity = velocity;
        frame.o = origin;
    }

    /// Drops any residual motion, e.g. after the camera is re-framed.
    pub fn stop(&mut self) {
        self.velocity = Vec3::ZERO;
    }
}

/// One integration step. Returns the new velocity and the new origin.
pub fn integrate(velocity: Vec3, frame: &Frame, keys: MoveKeys, dt: f32) -> (Vec3, Vec3) {
    let mut acc = Vec3::ZERO;
    if keys.forward {
        acc += dt * -frame.z;
    }
    if keys.back {
        acc += dt * frame.z;
    }
    if keys.right {
        acc += dt * frame.x;
    }
    if keys.left {
        acc += dt * -frame.x;
    }

    let mut velocity = velocity + FlyController::THRUST * acc * dt;
    if acc == Vec3::ZERO {
        velocity *= (-FlyController::DAMPING * dt).exp();
    }
    (velocity, frame.o + velocity * dt)
}

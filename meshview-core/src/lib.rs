//! The core of the meshview viewer. This crate contains everything that
//! does not need a GPU: mesh data and normal computation, camera frames and
//! navigation, scene descriptors, the dialog/message/log state used by the
//! widget layer, and the viewer configuration.

pub mod camera;
pub mod config;
pub mod controller;
pub mod dialog;
pub mod mesh;
pub mod scene;

pub use camera::{Camera, Frame};
pub use config::ViewerConfig;
pub use controller::{FlyController, MoveKeys};
pub use mesh::MeshData;

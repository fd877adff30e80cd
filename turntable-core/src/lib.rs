//! Core data structures for turntable
//!
//! This crate holds the types shared by the loaders, the GPU backend and the
//! viewer: the static model catalog, the scene graph produced by readers,
//! bounding volumes, the environment lighting probe, the render-surface seam
//! and the configuration/error types.

pub mod point;
pub mod transform;
pub mod bounds;
pub mod scene;
pub mod catalog;
pub mod environment;
pub mod surface;
pub mod config;
pub mod error;

pub use point::*;
pub use transform::*;
pub use bounds::*;
pub use scene::*;
pub use catalog::*;
pub use environment::*;
pub use surface::*;
pub use config::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix4, UnitQuaternion};

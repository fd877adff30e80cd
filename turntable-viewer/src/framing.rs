//! Camera framing: fit an arbitrary object in view
//!
//! The object's world box is reduced to a bounding sphere, the camera is
//! placed along a fixed three-quarter direction far enough back that the
//! sphere fits the vertical field of view with a margin, and the clip planes
//! and zoom limits are rescaled to the object's size.

use crate::camera::CameraRig;
use nalgebra::Vector3;
use tracing::debug;
use turntable_core::{Aabb, Error, FramingConfig, Point3f, Result, SceneNode, Vector3f};

/// Camera solution for one object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub center: Point3f,
    pub radius: f32,
    pub distance: f32,
    pub position: Point3f,
    pub near: f32,
    pub far: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl CameraFrame {
    /// The orbit target, which is the sphere centre
    pub fn target(&self) -> Point3f {
        self.center
    }
}

fn view_direction(config: &FramingConfig) -> Vector3f {
    Vector3::from(config.direction)
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(|| Vector3::new(1.0, 0.6, 1.0).normalize())
}

/// Solve the camera for `bounds` with vertical field of view `fov_y` (radians).
///
/// Fails with `Error::EmptyGeometry` for an empty box.
pub fn compute_frame(bounds: &Aabb, fov_y: f32, config: &FramingConfig) -> Result<CameraFrame> {
    let sphere = bounds.bounding_sphere().ok_or(Error::EmptyGeometry)?;
    let radius = sphere.radius.max(config.min_radius);

    let fit_distance = radius / (fov_y * 0.5).sin();
    let distance = fit_distance * config.margin;
    let position = sphere.center + view_direction(config) * distance;

    Ok(CameraFrame {
        center: sphere.center,
        radius,
        distance,
        position,
        near: (radius / config.near_divisor).max(config.near_min),
        far: (radius * config.far_factor).max(config.far_min),
        min_distance: radius * config.min_zoom_factor,
        max_distance: radius * config.max_zoom_factor,
    })
}

/// Applies framing solutions to a camera rig
#[derive(Debug, Clone, Default)]
pub struct CameraFramer {
    config: FramingConfig,
}

impl CameraFramer {
    pub fn new(config: FramingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FramingConfig {
        &self.config
    }

    /// Frame `node` at its rest placement: clip planes and zoom limits change
    /// immediately, position and target animate.
    ///
    /// Empty geometry leaves the rig untouched and returns `None`.
    pub fn frame(&self, node: &SceneNode, rig: &mut CameraRig) -> Option<CameraFrame> {
        let frame = match compute_frame(&node.bounds(), rig.camera.fov, &self.config) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(node = %node.name, error = %e, "skipping framing");
                return None;
            }
        };

        rig.camera.near = frame.near;
        rig.camera.far = frame.far;
        rig.camera.update_projection_matrix();
        rig.controls.set_distance_limits(frame.min_distance, frame.max_distance);
        rig.start_transition(frame.position, frame.target(), self.config.duration_secs);

        debug!(
            node = %node.name,
            radius = frame.radius,
            distance = frame.distance,
            near = frame.near,
            far = frame.far,
            "framing camera"
        );
        Some(frame)
    }
}

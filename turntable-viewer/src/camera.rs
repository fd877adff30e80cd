//! Camera, orbit controls and the animated rig that ties them together

use crate::animation::Tween;
use nalgebra::{Matrix4, Perspective3, Point3, Vector3};
use std::f32::consts::PI;
use turntable_core::{CameraConfig, ControlsConfig, Point3f};

/// A perspective camera with a cached projection matrix
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
    projection: Matrix4<f32>,
}

impl Camera {
    /// Create a new camera
    pub fn new(
        position: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        fov: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let mut camera = Self {
            position,
            target,
            up,
            fov,
            aspect_ratio,
            near,
            far,
            projection: Matrix4::identity(),
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn from_config(config: &CameraConfig, aspect_ratio: f32) -> Self {
        Self::new(
            Point3::from(config.position),
            Point3::origin(),
            Vector3::y(),
            config.fov_degrees.to_radians(),
            aspect_ratio,
            config.near,
            config.far,
        )
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Projection as of the last `update_projection_matrix` call
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    /// Recompute the projection after changing fov, aspect or clip planes
    pub fn update_projection_matrix(&mut self) {
        let aspect = if self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0 {
            self.aspect_ratio
        } else {
            1.0
        };
        let near = self.near.max(f32::EPSILON);
        let far = self.far.max(near * 1.0001);
        self.projection = Perspective3::new(aspect, self.fov, near, far).into_inner();
    }

    pub fn distance_to_target(&self) -> f32 {
        (self.position - self.target).norm()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), 16.0 / 9.0)
    }
}

const POLAR_EPS: f32 = 1e-6;

/// Spherical orbit around the camera target with damping, dolly and pan
#[derive(Debug, Clone)]
pub struct OrbitControls {
    config: ControlsConfig,
    pub min_distance: f32,
    pub max_distance: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vector3<f32>,
}

impl OrbitControls {
    pub fn new(config: ControlsConfig) -> Self {
        Self {
            config,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vector3::zeros(),
        }
    }

    pub fn set_distance_limits(&mut self, min: f32, max: f32) {
        self.min_distance = min;
        self.max_distance = max.max(min);
    }

    /// Drag by a pixel delta in a viewport `height` pixels tall
    pub fn rotate(&mut self, dx: f32, dy: f32, height: f32) {
        let height = height.max(1.0);
        self.delta_theta -= 2.0 * PI * dx / height * self.config.rotate_speed;
        self.delta_phi -= 2.0 * PI * dy / height * self.config.rotate_speed;
    }

    /// Move the target in the view plane so the scene follows the pointer
    pub fn pan(&mut self, dx: f32, dy: f32, height: f32, camera: &Camera) {
        if !self.config.enable_pan {
            return;
        }
        let height = height.max(1.0);
        let target_distance = camera.distance_to_target() * (camera.fov / 2.0).tan();
        let forward = (camera.target - camera.position)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -Vector3::z());
        let right = forward.cross(&camera.up).try_normalize(f32::EPSILON).unwrap_or_else(Vector3::x);
        let up = right.cross(&forward);

        self.pan_offset -= right * (2.0 * dx * target_distance / height);
        self.pan_offset += up * (2.0 * dy * target_distance / height);
    }

    /// Dolly by wheel steps; positive moves closer
    pub fn zoom(&mut self, steps: f32) {
        self.scale *= 0.95f32.powf(self.config.zoom_speed * steps);
    }

    /// Drop any pending rotation, zoom or pan
    pub fn reset_motion(&mut self) {
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.scale = 1.0;
        self.pan_offset = Vector3::zeros();
    }

    /// Apply pending motion to the camera. Returns true if it moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.position - camera.target;
        let mut radius = offset.norm();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            PI / 2.0
        };

        let factor = if self.config.enable_damping {
            self.config.damping_factor
        } else {
            1.0
        };
        theta += self.delta_theta * factor;
        phi += self.delta_phi * factor;
        phi = phi
            .clamp(self.config.min_polar_angle, self.config.max_polar_angle)
            .clamp(POLAR_EPS, PI - POLAR_EPS);
        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let previous = camera.position;
        camera.target += self.pan_offset * factor;
        camera.position = camera.target
            + Vector3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );

        if self.config.enable_damping {
            self.delta_theta *= 1.0 - factor;
            self.delta_phi *= 1.0 - factor;
            self.pan_offset *= 1.0 - factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vector3::zeros();
        }
        self.scale = 1.0;

        (camera.position - previous).norm_squared() > 1e-12
    }
}

/// Camera plus the controls and transitions that move it
#[derive(Debug, Clone)]
pub struct CameraRig {
    pub camera: Camera,
    pub controls: OrbitControls,
    position_tween: Option<Tween<Point3f>>,
    target_tween: Option<Tween<Point3f>>,
}

impl CameraRig {
    pub fn new(camera: Camera, controls: OrbitControls) -> Self {
        Self {
            camera,
            controls,
            position_tween: None,
            target_tween: None,
        }
    }

    /// Animate position and target from where they are now
    pub fn start_transition(&mut self, position: Point3f, target: Point3f, duration_secs: f32) {
        self.position_tween = Some(Tween::new(self.camera.position, position, duration_secs));
        self.target_tween = Some(Tween::new(self.camera.target, target, duration_secs));
        self.controls.reset_motion();
    }

    pub fn is_transitioning(&self) -> bool {
        self.position_tween.is_some() || self.target_tween.is_some()
    }

    /// Where the current transition will end, if one is running
    pub fn transition_target(&self) -> Option<(Point3f, Point3f)> {
        match (&self.position_tween, &self.target_tween) {
            (Some(p), Some(t)) => Some((*p.target(), *t.target())),
            _ => None,
        }
    }

    /// Advance by `dt` seconds. A running transition owns the camera and
    /// refreshes the projection every tick; otherwise the controls update.
    pub fn update(&mut self, dt: f32) {
        if !self.is_transitioning() {
            self.controls.update(&mut self.camera);
            return;
        }

        if let Some(tween) = self.position_tween.as_mut() {
            self.camera.position = tween.advance(dt);
            if tween.is_finished() {
                self.position_tween = None;
            }
        }
        if let Some(tween) = self.target_tween.as_mut() {
            self.camera.target = tween.advance(dt);
            if tween.is_finished() {
                self.target_tween = None;
            }
        }
        self.controls.reset_motion();
        self.camera.update_projection_matrix();
    }
}

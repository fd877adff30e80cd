//! Viewer configuration
//!
//! Every field has a default matching the portfolio page, so a config file
//! only needs to name what it changes.

use crate::point::Point3f;
use crate::surface::Lighting;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level viewer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub lighting: LightingConfig,
    /// Equirectangular `.hdr` used for image-based lighting
    pub environment: Option<String>,
    pub scheduling: SchedulingConfig,
    pub viewport: ViewportConfig,
    pub framing: FramingConfig,
    pub playback: PlaybackConfig,
    pub materials: MaterialBaseline,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            lighting: LightingConfig::default(),
            environment: Some("hdr/derelict.hdr".to_string()),
            scheduling: SchedulingConfig::default(),
            viewport: ViewportConfig::default(),
            framing: FramingConfig::default(),
            playback: PlaybackConfig::default(),
            materials: MaterialBaseline::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject values the viewer cannot work with
    pub fn validate(&self) -> Result<()> {
        let fov = self.camera.fov_degrees;
        if !(fov > 0.0 && fov < 180.0) {
            return Err(Error::Config(format!("camera.fov_degrees must be in (0, 180), got {}", fov)));
        }
        if self.viewport.mobile_pixel_ratio <= 0.0 || self.viewport.desktop_pixel_ratio <= 0.0 {
            return Err(Error::Config("pixel ratio caps must be positive".to_string()));
        }
        if self.framing.margin < 1.0 {
            return Err(Error::Config(format!("framing.margin must be at least 1.0, got {}", self.framing.margin)));
        }
        let zoom = (self.framing.min_zoom_factor, self.framing.max_zoom_factor);
        if !(zoom.0.is_finite() && zoom.1.is_finite() && zoom.0 > 0.0) {
            return Err(Error::Config("framing zoom factors must be finite and positive".to_string()));
        }
        if zoom.0 > zoom.1 {
            return Err(Error::Config("framing.min_zoom_factor exceeds max_zoom_factor".to_string()));
        }
        if !(self.framing.near_divisor.is_finite() && self.framing.near_divisor > 0.0) {
            return Err(Error::Config(format!(
                "framing.near_divisor must be positive, got {}",
                self.framing.near_divisor
            )));
        }
        let polar = (self.controls.min_polar_angle, self.controls.max_polar_angle);
        if !(polar.0.is_finite() && polar.1.is_finite()) {
            return Err(Error::Config("controls polar angles must be finite".to_string()));
        }
        if polar.0 > polar.1 {
            return Err(Error::Config(format!(
                "controls.min_polar_angle {} exceeds max_polar_angle {}",
                polar.0, polar.1
            )));
        }
        if self.framing.direction.iter().all(|c| *c == 0.0) {
            return Err(Error::Config("framing.direction must be non-zero".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: f64,
    pub height: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Turntable".to_string(),
            width: 1200.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view
    pub fov_degrees: f32,
    pub position: [f32; 3],
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 50.0,
            position: [2.4, 1.6, 3.0],
            near: 0.1,
            far: 200.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub enable_pan: bool,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.085,
            rotate_speed: 0.95,
            zoom_speed: 0.9,
            enable_pan: true,
            min_polar_angle: 0.1,
            max_polar_angle: std::f32::consts::PI - 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    pub key_color: [f32; 3],
    pub key_intensity: f32,
    pub key_position: [f32; 3],
    pub exposure: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        let lighting = Lighting::default();
        Self {
            ambient_color: lighting.ambient_color,
            ambient_intensity: lighting.ambient_intensity,
            key_color: lighting.key_color,
            key_intensity: lighting.key_intensity,
            key_position: lighting.key_position.coords.into(),
            exposure: lighting.exposure,
        }
    }
}

impl LightingConfig {
    pub fn to_lighting(&self) -> Lighting {
        Lighting {
            ambient_color: self.ambient_color,
            ambient_intensity: self.ambient_intensity,
            key_color: self.key_color,
            key_intensity: self.key_intensity,
            key_position: Point3f::from(self.key_position),
            exposure: self.exposure,
        }
    }
}

/// Which idle-time scheduler backs deferred loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdleStrategy {
    /// Wait for the render loop to report spare frame time
    #[default]
    Host,
    /// Fixed timer delays
    Timer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub idle_strategy: IdleStrategy,
    /// Longest wait for idle before the environment load is forced
    pub environment_timeout_ms: u64,
    /// Longest wait for idle before the first background model load
    pub first_background_timeout_ms: u64,
    /// Longest wait for idle between background model loads
    pub between_loads_timeout_ms: u64,
    /// Timer-strategy delays for the same three points
    pub environment_delay_ms: u64,
    pub first_background_delay_ms: u64,
    pub between_loads_delay_ms: u64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            idle_strategy: IdleStrategy::Host,
            environment_timeout_ms: 1500,
            first_background_timeout_ms: 1000,
            between_loads_timeout_ms: 1500,
            environment_delay_ms: 300,
            first_background_delay_ms: 200,
            between_loads_delay_ms: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub resize_debounce_ms: u64,
    pub mobile_pixel_ratio: f64,
    pub desktop_pixel_ratio: f64,
    /// Linear RGBA clear colour
    pub clear_color: [f64; 4],
    pub multisample: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            resize_debounce_ms: 120,
            mobile_pixel_ratio: 1.25,
            desktop_pixel_ratio: 1.75,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            multisample: true,
        }
    }
}

impl ViewportConfig {
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Viewing direction from the object to the camera; normalised on use
    pub direction: [f32; 3],
    pub margin: f32,
    pub duration_secs: f32,
    pub min_radius: f32,
    pub near_divisor: f32,
    pub near_min: f32,
    pub far_factor: f32,
    pub far_min: f32,
    pub min_zoom_factor: f32,
    pub max_zoom_factor: f32,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            direction: [1.0, 0.6, 1.0],
            margin: 1.2,
            duration_secs: 0.6,
            min_radius: 0.001,
            near_divisor: 100.0,
            near_min: 0.01,
            far_factor: 20.0,
            far_min: 100.0,
            min_zoom_factor: 0.6,
            max_zoom_factor: 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Idle turntable speed in radians per second
    pub spin_speed: f32,
    pub bounce_rotation: f32,
    pub bounce_lift: f32,
    pub bounce_duration_secs: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            spin_speed: 0.3,
            bounce_rotation: -0.2,
            bounce_lift: 0.1,
            bounce_duration_secs: 0.6,
        }
    }
}

/// Rendering baseline applied to every freshly loaded model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialBaseline {
    pub env_intensity: f32,
    pub color_textures_srgb: bool,
}

impl Default for MaterialBaseline {
    fn default() -> Self {
        Self {
            env_intensity: 1.15,
            color_textures_srgb: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json_str(
            r#"{"camera": {"fov_degrees": 35.0}, "scheduling": {"idle_strategy": "timer"}}"#,
        )
        .unwrap();
        assert_eq!(config.camera.fov_degrees, 35.0);
        assert_eq!(config.camera.position, [2.4, 1.6, 3.0]);
        assert_eq!(config.scheduling.idle_strategy, IdleStrategy::Timer);
        assert_eq!(config.scheduling.environment_timeout_ms, 1500);
        assert_eq!(config.environment.as_deref(), Some("hdr/derelict.hdr"));
    }

    #[test]
    fn environment_can_be_disabled() {
        let config = ViewerConfig::from_json_str(r#"{"environment": null}"#).unwrap();
        assert!(config.environment.is_none());
    }

    #[test]
    fn rejects_bad_fov() {
        assert!(ViewerConfig::from_json_str(r#"{"camera": {"fov_degrees": 0.0}}"#).is_err());
        assert!(ViewerConfig::from_json_str(r#"{"camera": {"fov_degrees": 180.0}}"#).is_err());
    }

    #[test]
    fn rejects_inverted_zoom_limits() {
        let mut config = ViewerConfig::default();
        config.framing.min_zoom_factor = 10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_polar_limits() {
        let result = ViewerConfig::from_json_str(r#"{"controls": {"min_polar_angle": 2.0, "max_polar_angle": 1.0}}"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn rejects_non_finite_polar_limits() {
        let mut config = ViewerConfig::default();
        config.controls.max_polar_angle = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = ViewerConfig::default();
        config.controls.min_polar_angle = f32::NEG_INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_near_divisor() {
        for divisor in [0.0, -100.0, f32::NAN] {
            let mut config = ViewerConfig::default();
            config.framing.near_divisor = divisor;
            assert!(config.validate().is_err(), "accepted near_divisor {}", divisor);
        }
    }

    #[test]
    fn rejects_non_positive_zoom_factor() {
        let mut config = ViewerConfig::default();
        config.framing.min_zoom_factor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(ViewerConfig::default().validate().is_ok());
    }

    #[test]
    fn lighting_round_trips_through_config() {
        let lighting = LightingConfig::default().to_lighting();
        assert_eq!(lighting, Lighting::default());
    }
}

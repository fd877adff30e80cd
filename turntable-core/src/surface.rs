//! The seam between the viewport and a concrete graphics backend

use crate::environment::EnvironmentMap;
use crate::point::Point3f;
use crate::scene::MeshPrimitive;
use crate::Result;
use nalgebra::Matrix4;

/// Drawable size in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Physical size of a logical size at the given pixel ratio
    pub fn from_logical(width: f64, height: f64, pixel_ratio: f64) -> Self {
        Self {
            width: (width * pixel_ratio).round().max(0.0) as u32,
            height: (height * pixel_ratio).round().max(0.0) as u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height; 1.0 for a collapsed surface
    pub fn aspect(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Ambient plus one directional key light, and output exposure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    pub key_color: [f32; 3],
    pub key_intensity: f32,
    /// The key light shines from this point towards the origin
    pub key_position: Point3f,
    /// Tone-mapping exposure
    pub exposure: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient_color: [1.0, 1.0, 1.0],
            ambient_intensity: 0.4,
            key_color: [1.0, 1.0, 1.0],
            key_intensity: 1.2,
            key_position: Point3f::new(4.0, 6.0, 6.0),
            exposure: 1.1,
        }
    }
}

/// Anything that can enumerate primitives to draw with their world matrices
pub trait DrawList {
    fn for_each_draw(&self, f: &mut dyn FnMut(&MeshPrimitive, &Matrix4<f32>));
}

/// Everything a backend needs for one frame
pub struct FrameDesc<'a> {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub eye: Point3f,
    pub lighting: &'a Lighting,
    pub scene: &'a dyn DrawList,
}

/// A render target owned by the viewport.
///
/// `resize` reallocates backing storage and is expensive; callers coalesce
/// bursts before invoking it. `render` runs once per display refresh.
pub trait RenderSurface {
    fn size(&self) -> SurfaceSize;

    fn resize(&mut self, size: SurfaceSize);

    /// Replace (or with `None`, remove) the image-based lighting source
    fn set_environment(&mut self, environment: Option<&EnvironmentMap>);

    fn render(&mut self, frame: &FrameDesc<'_>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_size_scales_by_pixel_ratio() {
        let size = SurfaceSize::from_logical(800.0, 600.0, 1.75);
        assert_eq!(size, SurfaceSize::new(1400, 1050));
        assert_eq!(size.aspect(), 1400.0 / 1050.0);
    }

    #[test]
    fn collapsed_surface_has_unit_aspect() {
        assert_eq!(SurfaceSize::new(0, 300).aspect(), 1.0);
        assert!(SurfaceSize::default().is_empty());
    }
}

//! Viewport host: render surface, camera, lighting and the resize policy

use crate::camera::{Camera, CameraRig, OrbitControls};
use instant::Instant;
use std::time::Duration;
use tracing::debug;
use turntable_core::{
    DrawList, EnvironmentMap, FrameDesc, Lighting, RenderSurface, Result, SurfaceSize, ViewerConfig, ViewportConfig,
};

/// Coalesces bursts of values: only the last one scheduled within the window
/// is released, once the window has passed without another.
#[derive(Debug, Clone)]
pub struct ResizeDebouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> ResizeDebouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    /// Replace any pending value and restart the window
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.window));
    }

    /// Take the pending value if its window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Broad device class for the pixel-ratio policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    /// Class of the platform this binary was built for
    pub fn detect() -> Self {
        if cfg!(any(target_os = "android", target_os = "ios")) {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }
}

/// Render pixel ratio: fixed on mobile, capped on desktop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRatioPolicy {
    pub mobile: f64,
    pub desktop_cap: f64,
}

impl PixelRatioPolicy {
    pub fn from_config(config: &ViewportConfig) -> Self {
        Self {
            mobile: config.mobile_pixel_ratio,
            desktop_cap: config.desktop_pixel_ratio,
        }
    }

    pub fn pixel_ratio(&self, class: DeviceClass, device_ratio: f64) -> f64 {
        match class {
            DeviceClass::Mobile => self.mobile,
            DeviceClass::Desktop => device_ratio.min(self.desktop_cap),
        }
    }

    /// Physical surface size for a logical container size
    pub fn surface_size(&self, class: DeviceClass, width: f64, height: f64, device_ratio: f64) -> SurfaceSize {
        SurfaceSize::from_logical(width, height, self.pixel_ratio(class, device_ratio))
    }
}

/// Owns the render surface and the camera that looks into it
pub struct Viewport<S: RenderSurface> {
    surface: S,
    rig: CameraRig,
    lighting: Lighting,
    pixel_ratio: PixelRatioPolicy,
    device: DeviceClass,
    debouncer: ResizeDebouncer<SurfaceSize>,
    resizes_applied: usize,
}

impl<S: RenderSurface> Viewport<S> {
    /// Take ownership of a created surface and size it for the container
    pub fn initialize(
        mut surface: S,
        config: &ViewerConfig,
        device: DeviceClass,
        container: (f64, f64),
        device_ratio: f64,
    ) -> Self {
        let pixel_ratio = PixelRatioPolicy::from_config(&config.viewport);
        let size = pixel_ratio.surface_size(device, container.0, container.1, device_ratio);
        if surface.size() != size {
            surface.resize(size);
        }

        let camera = Camera::from_config(&config.camera, size.aspect());
        let controls = OrbitControls::new(config.controls.clone());
        debug!(width = size.width, height = size.height, ?device, "viewport initialized");

        Self {
            surface,
            rig: CameraRig::new(camera, controls),
            lighting: config.lighting.to_lighting(),
            pixel_ratio,
            device,
            debouncer: ResizeDebouncer::new(config.viewport.resize_debounce()),
            resizes_applied: 0,
        }
    }

    /// Queue a resize to a logical container size. Only the last request in
    /// a burst is applied.
    pub fn request_resize(&mut self, width: f64, height: f64, device_ratio: f64, now: Instant) {
        let size = self.pixel_ratio.surface_size(self.device, width, height, device_ratio);
        self.debouncer.schedule(size, now);
    }

    /// Apply a pending resize whose window has passed. Returns true if the
    /// surface was reallocated.
    pub fn poll_resize(&mut self, now: Instant) -> bool {
        let Some(size) = self.debouncer.poll(now) else {
            return false;
        };
        if size == self.surface.size() || size.is_empty() {
            return false;
        }

        self.surface.resize(size);
        self.rig.camera.aspect_ratio = size.aspect();
        self.rig.camera.update_projection_matrix();
        self.resizes_applied += 1;
        debug!(width = size.width, height = size.height, "surface resized");
        true
    }

    pub fn resize_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn resizes_applied(&self) -> usize {
        self.resizes_applied
    }

    pub fn set_environment(&mut self, environment: Option<&EnvironmentMap>) {
        self.surface.set_environment(environment);
    }

    /// Draw one frame of `scene` from the current camera
    pub fn render_frame(&mut self, scene: &dyn DrawList) -> Result<()> {
        if self.surface.size().is_empty() {
            return Ok(());
        }
        let camera = &self.rig.camera;
        let frame = FrameDesc {
            view: camera.view_matrix(),
            projection: camera.projection_matrix(),
            eye: camera.position,
            lighting: &self.lighting,
            scene,
        };
        self.surface.render(&frame)
    }

    pub fn size(&self) -> SurfaceSize {
        self.surface.size()
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut CameraRig {
        &mut self.rig
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debouncer_releases_last_value_after_quiet_window() {
        let start = Instant::now();
        let mut debouncer = ResizeDebouncer::new(Duration::from_millis(120));
        debouncer.schedule(1, start);
        debouncer.schedule(2, start + Duration::from_millis(50));
        debouncer.schedule(3, start + Duration::from_millis(100));

        assert_eq!(debouncer.poll(start + Duration::from_millis(200)), None);
        assert_eq!(debouncer.poll(start + Duration::from_millis(220)), Some(3));
        assert_eq!(debouncer.poll(start + Duration::from_millis(500)), None);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn mobile_ratio_is_fixed_and_desktop_is_capped() {
        let policy = PixelRatioPolicy::from_config(&ViewportConfig::default());
        assert_eq!(policy.pixel_ratio(DeviceClass::Mobile, 3.0), 1.25);
        assert_eq!(policy.pixel_ratio(DeviceClass::Mobile, 1.0), 1.25);
        assert_eq!(policy.pixel_ratio(DeviceClass::Desktop, 3.0), 1.75);
        assert_eq!(policy.pixel_ratio(DeviceClass::Desktop, 1.0), 1.0);
    }

    #[test]
    fn desktop_targets_detect_as_desktop() {
        if cfg!(not(any(target_os = "android", target_os = "ios"))) {
            assert_eq!(DeviceClass::detect(), DeviceClass::Desktop);
        }
    }
}

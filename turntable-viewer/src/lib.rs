//! Turntable viewer for a small catalog of 3D models
//!
//! This crate ties the pieces together:
//! - Staged loading with idle-time scheduling
//! - Camera framing for objects of any size
//! - Selection, idle spin and bounce-in playback
//! - Viewport with debounced resize and a pixel-ratio policy
//! - A winit front end

pub mod animation;
pub mod camera;
pub mod framing;
pub mod scheduler;
pub mod state;
pub mod loader;
pub mod controller;
pub mod presentation;
pub mod viewport;
pub mod viewer;
pub mod interactive_viewer;

pub use animation::{ease_out_quad, Tween};
pub use camera::{Camera, CameraRig, OrbitControls};
pub use controller::Controller;
pub use framing::{compute_frame, CameraFrame, CameraFramer};
pub use interactive_viewer::InteractiveViewer;
pub use loader::{
    load_channel, load_descriptor, AssetSource, CatalogAssetSource, ChannelSink, EnvironmentSource,
    HdrEnvironmentSource, LoadEvent, LoadSink, LoadSummary, StagedLoader,
};
pub use presentation::{ActivationNotice, LogPresenter, Presenter};
pub use scheduler::{scheduler_for, HostIdleScheduler, IdleHandle, IdleScheduler, IdleSlot, TimerIdleScheduler};
pub use state::{LoadedInstance, Pose, ViewerState};
pub use viewer::{Viewer, ViewerInput};
pub use viewport::{DeviceClass, PixelRatioPolicy, ResizeDebouncer, Viewport};

use turntable_core::{Catalog, Result, ViewerConfig};

/// Open a window and show `catalog` until it is closed
pub fn show_catalog(config: ViewerConfig, catalog: Catalog, asset_root: Option<String>) -> Result<()> {
    InteractiveViewer::new(config, catalog).with_asset_root(asset_root).run()
}

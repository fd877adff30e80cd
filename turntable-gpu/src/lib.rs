//! # Turntable GPU
//!
//! wgpu backend for the turntable viewer.
//!
//! [`SceneRenderer`] implements [`turntable_core::RenderSurface`]: it owns the
//! window surface, uploads primitives on first sight and draws them with
//! ambient, key and spherical-harmonic environment lighting, tone mapped with
//! ACES.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use turntable_core::{SurfaceSize, ViewportConfig};
//! use turntable_gpu::SceneRenderer;
//!
//! async fn example(window: Arc<winit::window::Window>) -> turntable_core::Result<()> {
//!     let size = SurfaceSize::new(1280, 720);
//!     let renderer = SceneRenderer::new(window, size, &ViewportConfig::default()).await?;
//!     assert_eq!(renderer.resident_meshes(), 0);
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod renderer;

// Re-export commonly used items
pub use device::GpuContext;
pub use renderer::{build_vertices, MeshVertex, SceneRenderer};

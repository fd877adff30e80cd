//! Windowed front end
//!
//! Opens a winit window with a wgpu renderer, starts the staged loader on a
//! tokio runtime and drives the [`Viewer`] from the event loop.

use std::sync::Arc;
use std::time::Duration;
use instant::Instant;
use tracing::{error, info, warn};
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowBuilder},
};

use turntable_core::{AssetLoadError, Catalog, Error, Result, ViewerConfig};
use turntable_gpu::SceneRenderer;
use turntable_io::FormatRegistry;

use crate::loader::{load_channel, CatalogAssetSource, HdrEnvironmentSource, StagedLoader};
use crate::presentation::{ActivationNotice, LogPresenter, Presenter};
use crate::scheduler::scheduler_for;
use crate::viewer::{Viewer, ViewerInput};
use crate::viewport::{DeviceClass, Viewport};

/// Frames faster than this leave spare time, which is reported as idle
const IDLE_FRAME_BUDGET: Duration = Duration::from_millis(8);

/// Map a pressed key to a viewer input
pub fn map_key(key: &Key) -> Option<ViewerInput> {
    match key {
        Key::Named(NamedKey::ArrowLeft) => Some(ViewerInput::Previous),
        Key::Named(NamedKey::ArrowRight) => Some(ViewerInput::Next),
        Key::Character(c) => match c.as_str() {
            "r" | "R" => Some(ViewerInput::Reframe),
            digit => match digit.parse::<usize>() {
                Ok(n @ 1..=9) => Some(ViewerInput::Select(n - 1)),
                _ => None,
            },
        },
        _ => None,
    }
}

/// Log a fatal error and show it in a native dialog
pub fn report_fatal(error: &Error) {
    error!(error = %error, "viewer cannot continue");
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title("Turntable")
        .set_description(format!("The 3D view could not be started.\n\n{}", error))
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

/// Presenter that mirrors activation into the window title
/// Title bar text: base title, active model, position and one dot per model
fn window_title(base: &str, notice: &ActivationNotice) -> String {
    let dots: String = notice.dots().iter().map(|active| if *active { '●' } else { '○' }).collect();
    format!("{} - {} {}", base, notice.title(), dots)
}

struct WindowPresenter {
    window: Arc<Window>,
    base_title: String,
    log: LogPresenter,
    shown: Option<ActivationNotice>,
}

impl Presenter for WindowPresenter {
    fn first_content_ready(&mut self) {
        self.log.first_content_ready();
    }

    fn activated(&mut self, notice: &ActivationNotice) {
        self.log.activated(notice);
        self.window.set_title(&window_title(&self.base_title, notice));
        self.shown = Some(notice.clone());
    }

    fn instances_changed(&mut self, active_index: usize, count: usize) {
        let Some(shown) = &self.shown else { return };
        let notice = shown.recounted(active_index, count);
        self.window.set_title(&window_title(&self.base_title, &notice));
        self.shown = Some(notice);
    }

    fn nothing_loaded(&mut self) {
        self.log.nothing_loaded();
        self.window
            .set_title(&format!("{} - no models could be loaded", self.base_title));
    }

    fn load_failed(&mut self, error: &AssetLoadError) {
        warn!(asset = %error.asset, "skipping model");
    }
}

#[derive(Debug, Default)]
struct PointerState {
    left: bool,
    right: bool,
    last: Option<PhysicalPosition<f64>>,
}

/// Interactive turntable viewer for a catalog
pub struct InteractiveViewer {
    config: ViewerConfig,
    catalog: Catalog,
    asset_root: Option<String>,
}

impl InteractiveViewer {
    pub fn new(config: ViewerConfig, catalog: Catalog) -> Self {
        Self {
            config,
            catalog,
            asset_root: None,
        }
    }

    /// Resolve relative catalog and environment paths against `root`
    pub fn with_asset_root(mut self, root: Option<String>) -> Self {
        self.asset_root = root;
        self
    }

    /// Run until the window closes. Render surface failures are reported to
    /// the user before returning.
    pub fn run(self) -> Result<()> {
        let result = self.run_inner();
        if let Err(e) = &result {
            if matches!(e, Error::RenderSurface(_)) {
                report_fatal(e);
            }
        }
        result
    }

    fn run_inner(self) -> Result<()> {
        let Self {
            config,
            catalog,
            asset_root,
        } = self;
        config.validate()?;
        info!(models = catalog.len(), "starting turntable viewer");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("turntable-loader")
            .enable_all()
            .build()?;

        let event_loop = EventLoop::new()
            .map_err(|e| Error::RenderSurface(format!("Failed to create event loop: {}", e)))?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(config.window.title.clone())
                .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
                .with_transparent(true)
                .build(&event_loop)
                .map_err(|e| Error::RenderSurface(format!("Failed to create window: {}", e)))?,
        );

        let device = DeviceClass::detect();
        let scale_factor = window.scale_factor();
        let logical: LogicalSize<f64> = window.inner_size().to_logical(scale_factor);
        let pixel_ratio = crate::viewport::PixelRatioPolicy::from_config(&config.viewport);
        let size = pixel_ratio.surface_size(device, logical.width, logical.height, scale_factor);

        let renderer = pollster::block_on(SceneRenderer::new(window.clone(), size, &config.viewport))?;
        let viewport = Viewport::initialize(renderer, &config, device, (logical.width, logical.height), scale_factor);
        let presenter = WindowPresenter {
            window: window.clone(),
            base_title: config.window.title.clone(),
            log: LogPresenter,
            shown: None,
        };
        let mut viewer = Viewer::new(viewport, &config, &catalog, Box::new(presenter));

        let (scheduler, idle) = scheduler_for(&config.scheduling);
        let root = asset_root.as_deref();
        let loader = StagedLoader::new(
            catalog.clone(),
            Arc::new(CatalogAssetSource::new(FormatRegistry::with_default_readers(), asset_root.clone())),
            Arc::new(HdrEnvironmentSource::new(root, config.environment.as_deref())),
            scheduler,
            config.materials.clone(),
        );
        let (sink, events) = load_channel();
        runtime.spawn(async move {
            loader.run(&sink).await;
        });

        let mut pointer = PointerState::default();
        let mut last_frame = Instant::now();
        let mut failure: Option<Error> = None;

        event_loop
            .run(|event, target| {
                target.set_control_flow(ControlFlow::Poll);

                match event {
                    Event::WindowEvent { event, .. } => match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::Resized(new_size) => {
                            let scale_factor = window.scale_factor();
                            let logical: LogicalSize<f64> = new_size.to_logical(scale_factor);
                            viewer.handle_input(
                                ViewerInput::Resize {
                                    width: logical.width,
                                    height: logical.height,
                                    scale_factor,
                                },
                                Instant::now(),
                            );
                        }
                        WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                            let logical: LogicalSize<f64> = window.inner_size().to_logical(scale_factor);
                            viewer.handle_input(
                                ViewerInput::Resize {
                                    width: logical.width,
                                    height: logical.height,
                                    scale_factor,
                                },
                                Instant::now(),
                            );
                        }
                        WindowEvent::MouseInput { state, button, .. } => {
                            let pressed = state == ElementState::Pressed;
                            match button {
                                MouseButton::Left => pointer.left = pressed,
                                MouseButton::Right => pointer.right = pressed,
                                _ => {}
                            }
                        }
                        WindowEvent::CursorMoved { position, .. } => {
                            if let Some(last) = pointer.last {
                                let dx = (position.x - last.x) as f32;
                                let dy = (position.y - last.y) as f32;
                                if pointer.left {
                                    viewer.handle_input(ViewerInput::Orbit { dx, dy }, Instant::now());
                                } else if pointer.right {
                                    viewer.handle_input(ViewerInput::Pan { dx, dy }, Instant::now());
                                }
                            }
                            pointer.last = Some(position);
                        }
                        WindowEvent::CursorLeft { .. } => pointer.last = None,
                        WindowEvent::MouseWheel { delta, .. } => {
                            let steps = match delta {
                                MouseScrollDelta::LineDelta(_, y) => y,
                                MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                            };
                            viewer.handle_input(ViewerInput::Zoom(steps), Instant::now());
                        }
                        WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                            if event.logical_key == Key::Named(NamedKey::Escape) {
                                target.exit();
                            } else if let Some(input) = map_key(&event.logical_key) {
                                viewer.handle_input(input, Instant::now());
                            }
                        }
                        WindowEvent::RedrawRequested => {
                            let start = Instant::now();
                            viewer.drain(&events);

                            let dt = start.duration_since(last_frame).as_secs_f32();
                            last_frame = start;
                            match viewer.frame(dt, start) {
                                Ok(()) => {}
                                Err(e @ Error::RenderSurface(_)) => {
                                    failure = Some(e);
                                    target.exit();
                                }
                                Err(e) => warn!(error = %e, "frame skipped"),
                            }

                            if let Some(idle) = &idle {
                                if start.elapsed() < IDLE_FRAME_BUDGET {
                                    idle.report_idle();
                                }
                            }
                        }
                        _ => {}
                    },
                    Event::AboutToWait => window.request_redraw(),
                    _ => {}
                }
            })
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, format!("Event loop error: {}", e))))?;

        // Loads in flight are abandoned, never cancelled mid-decode
        runtime.shutdown_background();

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

//! The viewer: viewport, controller and presenter wired together
//!
//! Everything here runs on the UI thread. Load results arrive as
//! [`LoadEvent`]s and user input as [`ViewerInput`]s; both are applied
//! between frames, so a frame never sees a half-finished state change.

use crate::controller::Controller;
use crate::framing::CameraFramer;
use crate::loader::{LoadEvent, LoadSummary};
use crate::presentation::Presenter;
use crate::state::ViewerState;
use crate::viewport::Viewport;
use instant::Instant;
use tracing::{debug, info};
use turntable_core::{Catalog, RenderSurface, Result, ViewerConfig};

/// User intents, already mapped from raw device events
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerInput {
    Next,
    Previous,
    /// Indicator-dot selection
    Select(usize),
    Reframe,
    /// Drag delta in physical pixels
    Orbit { dx: f32, dy: f32 },
    Pan { dx: f32, dy: f32 },
    /// Wheel steps, positive towards the object
    Zoom(f32),
    /// New logical container size
    Resize { width: f64, height: f64, scale_factor: f64 },
}

pub struct Viewer<S: RenderSurface> {
    viewport: Viewport<S>,
    controller: Controller,
    presenter: Box<dyn Presenter>,
    first_content: bool,
    summary: Option<LoadSummary>,
}

impl<S: RenderSurface> Viewer<S> {
    pub fn new(viewport: Viewport<S>, config: &ViewerConfig, catalog: &Catalog, presenter: Box<dyn Presenter>) -> Self {
        let state = ViewerState::with_pending(catalog.iter().cloned());
        let controller = Controller::new(state, CameraFramer::new(config.framing.clone()), config.playback.clone());
        Self {
            viewport,
            controller,
            presenter,
            first_content: false,
            summary: None,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn viewport(&self) -> &Viewport<S> {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport<S> {
        &mut self.viewport
    }

    pub fn has_first_content(&self) -> bool {
        self.first_content
    }

    /// Totals from the loader, once it has finished
    pub fn summary(&self) -> Option<LoadSummary> {
        self.summary
    }

    /// Apply every load result waiting on `events`. Returns how many were handled.
    pub fn drain(&mut self, events: &flume::Receiver<LoadEvent>) -> usize {
        let mut handled = 0;
        for event in events.try_iter() {
            self.handle_load_event(event);
            handled += 1;
        }
        handled
    }

    pub fn handle_load_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::FirstReady { instance, shown } => {
                let index = self.controller.insert(instance, self.presenter.as_mut());
                self.activate(index as i64);
                self.first_content = true;
                self.presenter.first_content_ready();
                if shown.send(()).is_err() {
                    debug!("loader stopped waiting for first content");
                }
            }
            LoadEvent::ModelReady(instance) => {
                let index = self.controller.insert(instance, self.presenter.as_mut());
                if !self.first_content {
                    self.activate(index as i64);
                }
            }
            LoadEvent::Failed(error) => {
                self.controller.settle(&error.asset);
                self.presenter.load_failed(&error);
            }
            LoadEvent::EnvironmentReady(environment) => {
                let (width, height) = environment.source_size;
                info!(width, height, "environment applied");
                self.viewport.set_environment(Some(&environment));
            }
            LoadEvent::EnvironmentFailed(error) => {
                debug!(error = %error, "rendering without environment");
            }
            LoadEvent::Finished(summary) => {
                if self.controller.is_empty() {
                    self.presenter.nothing_loaded();
                }
                self.summary = Some(summary);
            }
        }
    }

    fn activate(&mut self, index: i64) -> Option<usize> {
        self.controller
            .set_active(index, self.viewport.rig_mut(), self.presenter.as_mut())
    }

    pub fn handle_input(&mut self, input: ViewerInput, now: Instant) {
        match input {
            ViewerInput::Next => {
                self.controller.next(self.viewport.rig_mut(), self.presenter.as_mut());
            }
            ViewerInput::Previous => {
                self.controller.previous(self.viewport.rig_mut(), self.presenter.as_mut());
            }
            ViewerInput::Select(index) => {
                self.activate(index as i64);
            }
            ViewerInput::Reframe => {
                self.controller.reframe(self.viewport.rig_mut());
            }
            ViewerInput::Orbit { dx, dy } => {
                let height = self.viewport.size().height as f32;
                self.viewport.rig_mut().controls.rotate(dx, dy, height);
            }
            ViewerInput::Pan { dx, dy } => {
                let height = self.viewport.size().height as f32;
                let rig = self.viewport.rig_mut();
                rig.controls.pan(dx, dy, height, &rig.camera);
            }
            ViewerInput::Zoom(steps) => {
                self.viewport.rig_mut().controls.zoom(steps);
            }
            ViewerInput::Resize {
                width,
                height,
                scale_factor,
            } => {
                self.viewport.request_resize(width, height, scale_factor, now);
            }
        }
    }

    /// Advance animation by `dt` seconds and draw
    pub fn frame(&mut self, dt: f32, now: Instant) -> Result<()> {
        self.viewport.poll_resize(now);
        self.controller.tick(dt);
        self.viewport.rig_mut().update(dt);
        self.viewport.render_frame(self.controller.state())
    }
}

//! Selection and playback controller
//!
//! Owns the active index. Every navigation path ends in `set_active`, which
//! swaps visibility, restarts the bounce, frames the camera and notifies the
//! presenter.

use crate::animation::Tween;
use crate::camera::CameraRig;
use crate::framing::CameraFramer;
use crate::presentation::{ActivationNotice, Presenter};
use crate::state::{LoadedInstance, ViewerState};
use tracing::{debug, info};
use turntable_core::PlaybackConfig;

#[derive(Debug)]
pub struct Controller {
    state: ViewerState,
    framer: CameraFramer,
    playback: PlaybackConfig,
    /// Remaining bounce amount, 1 at activation easing to 0
    bounce: Option<Tween<f32>>,
}

impl Controller {
    pub fn new(state: ViewerState, framer: CameraFramer, playback: PlaybackConfig) -> Self {
        Self {
            state,
            framer,
            playback,
            bounce: None,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn active_index(&self) -> usize {
        self.state.active_index()
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn is_bouncing(&self) -> bool {
        self.bounce.is_some()
    }

    /// Add a freshly loaded instance, keeping the active one active
    pub fn insert(&mut self, instance: LoadedInstance, presenter: &mut dyn Presenter) -> usize {
        let index = self.state.insert(instance);
        presenter.instances_changed(self.state.active_index(), self.state.len());
        index
    }

    /// Forget a descriptor that failed to load
    pub fn settle(&mut self, id: &str) {
        self.state.settle(id);
    }

    /// Activate `index` modulo the instance count. Returns the index that
    /// became active, or `None` when nothing is loaded.
    pub fn set_active(&mut self, index: i64, rig: &mut CameraRig, presenter: &mut dyn Presenter) -> Option<usize> {
        let count = self.state.len();
        if count == 0 {
            debug!(index, "ignoring activation with no instances loaded");
            return None;
        }
        let index = index.rem_euclid(count as i64) as usize;

        let instance = self.state.show_only(index)?;
        instance.pose.spin = 0.0;
        instance.pose.yaw_offset = self.playback.bounce_rotation;
        instance.pose.lift = self.playback.bounce_lift;
        self.bounce = Some(Tween::new(1.0, 0.0, self.playback.bounce_duration_secs));

        self.framer.frame(&instance.node, rig);
        info!(asset = %instance.descriptor.id, index, count, "activated");

        if let Some(notice) = ActivationNotice::from_state(&self.state) {
            presenter.activated(&notice);
        }
        Some(index)
    }

    pub fn next(&mut self, rig: &mut CameraRig, presenter: &mut dyn Presenter) -> Option<usize> {
        self.set_active(self.state.active_index() as i64 + 1, rig, presenter)
    }

    pub fn previous(&mut self, rig: &mut CameraRig, presenter: &mut dyn Presenter) -> Option<usize> {
        self.set_active(self.state.active_index() as i64 - 1, rig, presenter)
    }

    /// Frame the active instance again without replaying the activation
    pub fn reframe(&self, rig: &mut CameraRig) -> bool {
        match self.state.active() {
            Some(active) => self.framer.frame(&active.node, rig).is_some(),
            None => false,
        }
    }

    /// Advance the idle spin and the bounce by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let amount = match self.bounce.as_mut() {
            Some(tween) => {
                let amount = tween.advance(dt);
                if tween.is_finished() {
                    self.bounce = None;
                }
                amount
            }
            None => 0.0,
        };

        let playback = &self.playback;
        if let Some(active) = self.state.active_mut() {
            active.pose.spin += playback.spin_speed * dt;
            active.pose.yaw_offset = playback.bounce_rotation * amount;
            active.pose.lift = playback.bounce_lift * amount;
        }
    }
}

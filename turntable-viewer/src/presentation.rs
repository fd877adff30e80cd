//! Notifications for whatever UI surrounds the viewer

use crate::state::ViewerState;
use tracing::{info, warn};
use turntable_core::AssetLoadError;

/// Metadata published on every activation
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationNotice {
    pub name: String,
    pub caption: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub active_index: usize,
    /// Number of navigable instances
    pub count: usize,
}

impl ActivationNotice {
    /// Build the notice for the state's active instance
    pub fn from_state(state: &ViewerState) -> Option<Self> {
        let active = state.active()?;
        Some(Self {
            name: active.descriptor.display_name.clone(),
            caption: active.descriptor.caption.clone(),
            attributes: active.descriptor.attributes.clone(),
            active_index: state.active_index(),
            count: state.len(),
        })
    }

    /// Indicator-dot state, one entry per instance with the active one set
    pub fn dots(&self) -> Vec<bool> {
        (0..self.count).map(|i| i == self.active_index).collect()
    }

    /// The same model after the navigable set grew or shrank around it
    pub fn recounted(&self, active_index: usize, count: usize) -> Self {
        Self {
            active_index,
            count,
            ..self.clone()
        }
    }

    /// One-line summary such as `Ramen Bowl (2/3)`
    pub fn title(&self) -> String {
        format!("{} ({}/{})", self.name, self.active_index + 1, self.count)
    }
}

/// Consumer of viewer notifications
pub trait Presenter {
    /// The first model is on screen; loading indicators can go
    fn first_content_ready(&mut self);

    fn activated(&mut self, notice: &ActivationNotice);

    /// The catalog finished loading without a single usable model
    fn nothing_loaded(&mut self);

    fn load_failed(&mut self, _error: &AssetLoadError) {}

    /// The navigable set grew; `count` is the new size
    fn instances_changed(&mut self, _active_index: usize, _count: usize) {}
}

/// Presenter that only writes to the log
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn first_content_ready(&mut self) {
        info!("first content ready");
    }

    fn activated(&mut self, notice: &ActivationNotice) {
        info!(
            name = %notice.name,
            index = notice.active_index,
            count = notice.count,
            "activated model"
        );
        for (label, value) in &notice.attributes {
            info!("  {}: {}", label, value);
        }
    }

    fn nothing_loaded(&mut self) {
        warn!("no models could be loaded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_mark_active_instance() {
        let notice = ActivationNotice {
            name: "Ramen Bowl".to_string(),
            caption: None,
            attributes: Vec::new(),
            active_index: 1,
            count: 3,
        };
        assert_eq!(notice.dots(), vec![false, true, false]);
        assert_eq!(notice.title(), "Ramen Bowl (2/3)");
    }

    #[test]
    fn recount_keeps_the_model_and_grows_the_dots() {
        let notice = ActivationNotice {
            name: "E11".to_string(),
            caption: Some("Blaster".to_string()),
            attributes: vec![("Polys".to_string(), "12k".to_string())],
            active_index: 0,
            count: 1,
        };
        let grown = notice.recounted(0, 3);
        assert_eq!(grown.name, "E11");
        assert_eq!(grown.caption.as_deref(), Some("Blaster"));
        assert_eq!(grown.dots(), vec![true, false, false]);
        assert_eq!(grown.title(), "E11 (1/3)");
    }

    #[test]
    fn empty_state_has_no_notice() {
        assert!(ActivationNotice::from_state(&ViewerState::new()).is_none());
    }
}

//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use turntable_core::{
    AssetDescriptor, AssetLoadError, Catalog, EnvironmentMap, Error, FrameDesc, MeshPrimitive, Point3f,
    RenderSurface, SceneNode, SurfaceSize,
};
use turntable_viewer::{
    ActivationNotice, AssetSource, EnvironmentSource, LoadSink, LoadSummary, LoadedInstance, Presenter,
};

/// Ordered log shared between fakes
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Position of the first entry equal to `entry`
pub fn position(log: &[String], entry: &str) -> usize {
    log.iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("{} missing from {:?}", entry, log))
}

/// Cube-shaped mesh spanning `center ± half`
pub fn cube_node(name: &str, center: Point3f, half: f32) -> SceneNode {
    let positions = vec![
        Point3f::new(center.x - half, center.y - half, center.z - half),
        Point3f::new(center.x + half, center.y - half, center.z - half),
        Point3f::new(center.x + half, center.y + half, center.z + half),
        Point3f::new(center.x - half, center.y + half, center.z + half),
    ];
    SceneNode::new(name).with_mesh(MeshPrimitive::new(positions, vec![0, 1, 2, 0, 2, 3]))
}

pub fn catalog(ids: &[&str]) -> Catalog {
    let descriptors = ids
        .iter()
        .map(|id| AssetDescriptor::new(*id, id.to_uppercase(), format!("models/{}.glb", id)).with_caption(format!("{} caption", id)))
        .collect();
    Catalog::new(descriptors).unwrap()
}

/// Hidden instance as the loader would produce it
pub fn instance(catalog: &Catalog, index: usize, half: f32) -> LoadedInstance {
    let descriptor = catalog.get(index).unwrap().clone();
    let mut node = cube_node(&descriptor.id, Point3f::origin(), half);
    node.visible = false;
    LoadedInstance::new(descriptor, index, node)
}

/// Model source that fails for a fixed set of ids and logs `start:<id>`
pub struct FakeSource {
    failing: HashSet<String>,
    log: EventLog,
}

impl FakeSource {
    pub fn new(failing: &[&str], log: EventLog) -> Self {
        Self {
            failing: failing.iter().map(|s| s.to_string()).collect(),
            log,
        }
    }
}

#[async_trait]
impl AssetSource for FakeSource {
    async fn fetch_scene(&self, descriptor: &AssetDescriptor) -> turntable_core::Result<SceneNode> {
        self.log.lock().unwrap().push(format!("start:{}", descriptor.id));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        if self.failing.contains(&descriptor.id) {
            return Err(Error::InvalidData("404 Not Found".to_string()));
        }
        Ok(cube_node(&descriptor.id, Point3f::new(0.0, 1.0, 0.0), 0.5))
    }
}

/// Environment source that logs `env:start`
pub struct FakeEnvironment {
    pub fail: bool,
    log: EventLog,
}

impl FakeEnvironment {
    pub fn new(fail: bool, log: EventLog) -> Self {
        Self { fail, log }
    }
}

#[async_trait]
impl EnvironmentSource for FakeEnvironment {
    fn uri(&self) -> Option<String> {
        Some("hdr/derelict.hdr".to_string())
    }

    async fn fetch_environment(&self) -> turntable_core::Result<EnvironmentMap> {
        self.log.lock().unwrap().push("env:start".to_string());
        tokio::time::sleep(std::time::Duration::from_millis(80)).await;
        if self.fail {
            return Err(Error::InvalidData("not a Radiance file".to_string()));
        }
        Ok(EnvironmentMap::uniform([0.5, 0.5, 0.5]))
    }
}

/// Sink that logs every callback
pub struct RecordingSink {
    log: EventLog,
}

impl RecordingSink {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl LoadSink for RecordingSink {
    async fn first_ready(&self, instance: LoadedInstance) {
        self.push(format!("active:{}", instance.descriptor.id));
    }

    async fn model_ready(&self, instance: LoadedInstance) {
        self.push(format!("ready:{}", instance.descriptor.id));
    }

    async fn load_failed(&self, error: AssetLoadError) {
        self.push(format!("failed:{}", error.asset));
    }

    async fn environment_ready(&self, _environment: EnvironmentMap) {
        self.push("env:ready".to_string());
    }

    async fn environment_failed(&self, error: AssetLoadError) {
        self.push(format!("env:failed:{}", error.asset));
    }

    async fn finished(&self, summary: LoadSummary) {
        self.push(format!("finished:{}:{}", summary.loaded, summary.failed));
    }
}

/// Headless surface that records what it was asked to do
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub size: SurfaceSize,
    pub resizes: Vec<SurfaceSize>,
    pub environment: Option<EnvironmentMap>,
    pub frames: usize,
    pub last_draws: usize,
}

impl RenderSurface for RecordingSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        self.resizes.push(size);
    }

    fn set_environment(&mut self, environment: Option<&EnvironmentMap>) {
        self.environment = environment.cloned();
    }

    fn render(&mut self, frame: &FrameDesc<'_>) -> turntable_core::Result<()> {
        let mut draws = 0;
        frame.scene.for_each_draw(&mut |_, _| draws += 1);
        self.frames += 1;
        self.last_draws = draws;
        Ok(())
    }
}

/// Presenter that logs notifications
#[derive(Clone, Default)]
pub struct RecordingPresenter {
    pub notices: Arc<Mutex<Vec<ActivationNotice>>>,
    /// `(active_index, count)` per growth of the navigable set
    pub counts: Arc<Mutex<Vec<(usize, usize)>>>,
    pub log: EventLog,
}

impl Presenter for RecordingPresenter {
    fn first_content_ready(&mut self) {
        self.log.lock().unwrap().push("first-content".to_string());
    }

    fn activated(&mut self, notice: &ActivationNotice) {
        self.notices.lock().unwrap().push(notice.clone());
    }

    fn nothing_loaded(&mut self) {
        self.log.lock().unwrap().push("nothing-loaded".to_string());
    }

    fn load_failed(&mut self, error: &AssetLoadError) {
        self.log.lock().unwrap().push(format!("failed:{}", error.asset));
    }

    fn instances_changed(&mut self, active_index: usize, count: usize) {
        self.counts.lock().unwrap().push((active_index, count));
    }
}

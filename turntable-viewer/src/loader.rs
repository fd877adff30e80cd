//! Staged asset loading
//!
//! The first catalog entry loads on the critical path and must be shown
//! before anything else is requested. After that the environment and the
//! remaining models load independently, each gated on idle time; the models
//! load strictly one after another. Failures are contained per asset.

use crate::scheduler::{IdleScheduler, IdleSlot};
use crate::state::LoadedInstance;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use turntable_core::{
    AssetDescriptor, AssetLoadError, Catalog, EnvironmentMap, Error, MaterialBaseline, SceneNode,
};
use turntable_io::{AssetLocation, FormatRegistry};

/// Where model bytes come from
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch and decode the model behind `descriptor`
    async fn fetch_scene(&self, descriptor: &AssetDescriptor) -> turntable_core::Result<SceneNode>;
}

/// Where the environment map comes from
#[async_trait]
pub trait EnvironmentSource: Send + Sync {
    /// `None` when no environment is configured
    fn uri(&self) -> Option<String>;

    async fn fetch_environment(&self) -> turntable_core::Result<EnvironmentMap>;
}

/// Receives load results as they happen
#[async_trait]
pub trait LoadSink: Send + Sync {
    /// The critical-path model is ready. The loader does not continue until
    /// this returns, so implementations return once it is active.
    async fn first_ready(&self, instance: LoadedInstance);

    async fn model_ready(&self, instance: LoadedInstance);

    async fn load_failed(&self, error: AssetLoadError);

    async fn environment_ready(&self, environment: EnvironmentMap);

    async fn environment_failed(&self, error: AssetLoadError);

    async fn finished(&self, summary: LoadSummary);
}

/// Totals for one run of the loader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub failed: usize,
    pub environment: bool,
}

fn load_error(asset: &str, uri: &str, error: Error) -> AssetLoadError {
    match error {
        Error::AssetLoad(inner) => inner,
        other => AssetLoadError::new(asset, uri, other),
    }
}

/// Load one descriptor into a hidden, normalized instance
pub async fn load_descriptor(
    source: &dyn AssetSource,
    descriptor: &Arc<AssetDescriptor>,
    catalog_index: usize,
    baseline: &MaterialBaseline,
) -> Result<LoadedInstance, AssetLoadError> {
    let mut node = source
        .fetch_scene(descriptor)
        .await
        .map_err(|e| load_error(&descriptor.id, &descriptor.source_uri, e))?;

    let report = turntable_io::normalize_materials(&mut node, baseline);
    node.visible = false;
    debug!(
        asset = %descriptor.id,
        meshes = report.meshes,
        color_textures = report.color_textures,
        env_materials = report.env_materials,
        "normalized materials"
    );
    Ok(LoadedInstance::new(descriptor.clone(), catalog_index, node))
}

/// Runs the staged load for a whole catalog
pub struct StagedLoader {
    catalog: Catalog,
    source: Arc<dyn AssetSource>,
    environment: Arc<dyn EnvironmentSource>,
    scheduler: Arc<dyn IdleScheduler>,
    baseline: MaterialBaseline,
}

impl StagedLoader {
    pub fn new(
        catalog: Catalog,
        source: Arc<dyn AssetSource>,
        environment: Arc<dyn EnvironmentSource>,
        scheduler: Arc<dyn IdleScheduler>,
        baseline: MaterialBaseline,
    ) -> Self {
        Self {
            catalog,
            source,
            environment,
            scheduler,
            baseline,
        }
    }

    /// Load everything, reporting to `sink` as results arrive. Never fails:
    /// each failure is reported and skipped.
    pub async fn run(&self, sink: &dyn LoadSink) -> LoadSummary {
        let mut summary = LoadSummary::default();
        let mut pending = self.catalog.iter().cloned().enumerate();

        // Critical path: the first entry that loads becomes the first content
        let mut first = None;
        for (index, descriptor) in pending.by_ref() {
            match self.load(index, &descriptor).await {
                Ok(instance) => {
                    first = Some(instance);
                    break;
                }
                Err(e) => {
                    summary.failed += 1;
                    sink.load_failed(e).await;
                }
            }
        }

        let Some(first) = first else {
            warn!(failed = summary.failed, "no model in the catalog could be loaded");
            sink.finished(summary).await;
            return summary;
        };
        summary.loaded += 1;
        sink.first_ready(first).await;
        info!("first content visible");

        let rest: Vec<_> = pending.collect();
        let (environment, (loaded, failed)) =
            tokio::join!(self.load_environment(sink), self.load_background(rest, sink));
        summary.environment = environment;
        summary.loaded += loaded;
        summary.failed += failed;

        info!(
            loaded = summary.loaded,
            failed = summary.failed,
            environment = summary.environment,
            "staged load finished"
        );
        sink.finished(summary).await;
        summary
    }

    async fn load(&self, index: usize, descriptor: &Arc<AssetDescriptor>) -> Result<LoadedInstance, AssetLoadError> {
        let result = load_descriptor(self.source.as_ref(), descriptor, index, &self.baseline).await;
        match &result {
            Ok(instance) => info!(
                asset = %descriptor.id,
                index,
                meshes = instance.node.mesh_count(),
                vertices = instance.node.vertex_count(),
                "model loaded"
            ),
            Err(e) => warn!(asset = %descriptor.id, error = %e, "model failed to load"),
        }
        result
    }

    async fn load_environment(&self, sink: &dyn LoadSink) -> bool {
        let Some(uri) = self.environment.uri() else {
            debug!("no environment configured");
            return false;
        };

        self.scheduler.wait(IdleSlot::Environment).await;
        info!(%uri, "loading environment");
        match self.environment.fetch_environment().await {
            Ok(map) => {
                sink.environment_ready(map).await;
                true
            }
            Err(e) => {
                let error = load_error("environment", &uri, e);
                warn!(error = %error, "environment failed to load, keeping direct lighting only");
                sink.environment_failed(error).await;
                false
            }
        }
    }

    async fn load_background(&self, rest: Vec<(usize, Arc<AssetDescriptor>)>, sink: &dyn LoadSink) -> (usize, usize) {
        let (mut loaded, mut failed) = (0, 0);
        for (position, (index, descriptor)) in rest.into_iter().enumerate() {
            let slot = if position == 0 {
                IdleSlot::FirstBackground
            } else {
                IdleSlot::BetweenLoads
            };
            self.scheduler.wait(slot).await;

            match self.load(index, &descriptor).await {
                Ok(instance) => {
                    loaded += 1;
                    sink.model_ready(instance).await;
                }
                Err(e) => {
                    failed += 1;
                    sink.load_failed(e).await;
                }
            }
        }
        (loaded, failed)
    }
}

/// Loads catalog models through the format registry
#[derive(Debug, Clone)]
pub struct CatalogAssetSource {
    registry: FormatRegistry,
    root: Option<String>,
}

impl CatalogAssetSource {
    /// Relative source URIs resolve against `root`
    pub fn new(registry: FormatRegistry, root: Option<String>) -> Self {
        Self { registry, root }
    }
}

#[async_trait]
impl AssetSource for CatalogAssetSource {
    async fn fetch_scene(&self, descriptor: &AssetDescriptor) -> turntable_core::Result<SceneNode> {
        let location = AssetLocation::resolve(self.root.as_deref(), &descriptor.source_uri);
        debug!(asset = %descriptor.id, %location, "fetching model");
        let node = turntable_io::load_scene(&self.registry, &location, &descriptor.display_name).await?;
        Ok(node)
    }
}

/// Loads a Radiance `.hdr` environment, or nothing
#[derive(Debug, Clone, Default)]
pub struct HdrEnvironmentSource {
    location: Option<AssetLocation>,
}

impl HdrEnvironmentSource {
    pub fn new(root: Option<&str>, path: Option<&str>) -> Self {
        Self {
            location: path.map(|p| AssetLocation::resolve(root, p)),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnvironmentSource for HdrEnvironmentSource {
    fn uri(&self) -> Option<String> {
        self.location.as_ref().map(ToString::to_string)
    }

    async fn fetch_environment(&self) -> turntable_core::Result<EnvironmentMap> {
        let location = self
            .location
            .as_ref()
            .ok_or_else(|| Error::Config("no environment configured".to_string()))?;
        let map = turntable_io::load_environment(location).await?;
        Ok(map)
    }
}

/// Load results forwarded to the UI thread
#[derive(Debug)]
pub enum LoadEvent {
    /// Activate this instance, then answer on `shown`
    FirstReady {
        instance: LoadedInstance,
        shown: oneshot::Sender<()>,
    },
    ModelReady(LoadedInstance),
    Failed(AssetLoadError),
    EnvironmentReady(EnvironmentMap),
    EnvironmentFailed(AssetLoadError),
    Finished(LoadSummary),
}

/// A [`LoadSink`] that forwards every result over a channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: flume::Sender<LoadEvent>,
}

/// Create a sink and the receiver the UI thread drains each frame
pub fn load_channel() -> (ChannelSink, flume::Receiver<LoadEvent>) {
    let (tx, rx) = flume::unbounded();
    (ChannelSink { tx }, rx)
}

impl ChannelSink {
    async fn send(&self, event: LoadEvent) {
        if self.tx.send_async(event).await.is_err() {
            debug!("viewer closed, dropping load event");
        }
    }
}

#[async_trait]
impl LoadSink for ChannelSink {
    async fn first_ready(&self, instance: LoadedInstance) {
        let (shown, activated) = oneshot::channel();
        self.send(LoadEvent::FirstReady { instance, shown }).await;
        if activated.await.is_err() {
            debug!("first model was never acknowledged");
        }
    }

    async fn model_ready(&self, instance: LoadedInstance) {
        self.send(LoadEvent::ModelReady(instance)).await;
    }

    async fn load_failed(&self, error: AssetLoadError) {
        self.send(LoadEvent::Failed(error)).await;
    }

    async fn environment_ready(&self, environment: EnvironmentMap) {
        self.send(LoadEvent::EnvironmentReady(environment)).await;
    }

    async fn environment_failed(&self, error: AssetLoadError) {
        self.send(LoadEvent::EnvironmentFailed(error)).await;
    }

    async fn finished(&self, summary: LoadSummary) {
        self.send(LoadEvent::Finished(summary)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turntable_core::{MeshPrimitive, Point3f};

    struct OneTriangle;

    #[async_trait]
    impl AssetSource for OneTriangle {
        async fn fetch_scene(&self, descriptor: &AssetDescriptor) -> turntable_core::Result<SceneNode> {
            if descriptor.id == "broken" {
                return Err(Error::InvalidData("truncated buffer".to_string()));
            }
            let mesh = MeshPrimitive::new(
                vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0), Point3f::new(0.0, 1.0, 0.0)],
                vec![0, 1, 2],
            );
            let mut node = SceneNode::new(descriptor.display_name.clone()).with_mesh(mesh);
            node.transform.translation.x = 5.0;
            Ok(node)
        }
    }

    #[tokio::test]
    async fn loaded_instances_start_hidden_at_origin() {
        let descriptor = Arc::new(AssetDescriptor::new("tri", "Triangle", "tri.obj"));
        let instance = load_descriptor(&OneTriangle, &descriptor, 3, &MaterialBaseline::default())
            .await
            .unwrap();
        assert!(!instance.is_visible());
        assert_eq!(instance.catalog_index, 3);
        assert_eq!(instance.node.transform.translation.x, 0.0);
    }

    #[tokio::test]
    async fn failures_name_the_descriptor() {
        let descriptor = Arc::new(AssetDescriptor::new("broken", "Broken", "models/broken.glb"));
        let err = load_descriptor(&OneTriangle, &descriptor, 0, &MaterialBaseline::default())
            .await
            .unwrap_err();
        assert_eq!(err.asset, "broken");
        assert_eq!(err.uri, "models/broken.glb");
        assert!(err.to_string().contains("truncated buffer"));
    }

    #[tokio::test]
    async fn channel_sink_waits_for_first_acknowledgement() {
        let (sink, rx) = load_channel();
        let descriptor = Arc::new(AssetDescriptor::new("tri", "Triangle", "tri.obj"));
        let instance = LoadedInstance::new(descriptor, 0, SceneNode::new("tri"));

        let ack = tokio::spawn(async move {
            match rx.recv_async().await {
                Ok(LoadEvent::FirstReady { instance, shown }) => {
                    shown.send(()).ok();
                    instance.descriptor.id.clone()
                }
                _ => String::new(),
            }
        });
        sink.first_ready(instance).await;
        assert_eq!(ack.await.unwrap(), "tri");
    }

    #[test]
    fn environment_source_reports_uri() {
        let source = HdrEnvironmentSource::new(Some("assets"), Some("hdr/derelict.hdr"));
        let uri = source.uri().unwrap();
        assert!(uri.ends_with("derelict.hdr"));
        assert!(HdrEnvironmentSource::none().uri().is_none());
    }

    #[test]
    fn catalog_source_debug_lists_formats() {
        let source = CatalogAssetSource::new(FormatRegistry::with_default_readers(), Some("assets".to_string()));
        let text = format!("{:?}", source);
        assert!(text.contains(r#"formats: ["gltf", "obj", "ply"]"#), "{}", text);
        assert!(text.contains("assets"));
    }
}

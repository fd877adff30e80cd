//! Asset I/O for turntable
//!
//! Fetches model and environment files from disk or HTTP and decodes them
//! into the core scene types. glTF/GLB, OBJ and PLY models are supported,
//! environments are Radiance `.hdr` equirectangular images.

pub mod error;
pub mod registry;
pub mod fetch;
pub mod gltf;
pub mod obj;
pub mod ply;
pub mod hdr;
pub mod normalize;

pub use error::*;
pub use fetch::{fetch, AssetLocation};
pub use hdr::read_environment;
pub use normalize::{normalize_materials, NormalizeReport};
pub use registry::{FormatRegistry, ReadContext, SceneReader};

use turntable_core::{EnvironmentMap, SceneNode};

/// Fetch and decode a model.
///
/// Decoding runs on the blocking pool so large files do not stall the
/// async runtime.
pub async fn load_scene(registry: &FormatRegistry, location: &AssetLocation, name: &str) -> Result<SceneNode> {
    let bytes = fetch(location).await?;
    let hint = extension_of(location);
    let mut context = ReadContext::new(name);
    context.base_dir = location.base_dir();

    let registry = registry.clone();
    tokio::task::spawn_blocking(move || registry.read_scene(&bytes, hint.as_deref(), &context))
        .await
        .map_err(|e| IoError::parse(format!("decoder task failed: {}", e)))?
}

/// Fetch and decode an `.hdr` environment
pub async fn load_environment(location: &AssetLocation) -> Result<EnvironmentMap> {
    let bytes = fetch(location).await?;
    tokio::task::spawn_blocking(move || read_environment(&bytes))
        .await
        .map_err(|e| IoError::parse(format!("decoder task failed: {}", e)))?
}

fn extension_of(location: &AssetLocation) -> Option<String> {
    let text = location.to_string();
    let path = text.split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit(['/', '\\']).next()?;
    name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

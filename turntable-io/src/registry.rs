//! Format registry for model readers
//!
//! Readers are looked up by file extension first, then by examining the
//! leading bytes, so a mislabelled file still reaches the right decoder.

use crate::{IoError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use turntable_core::SceneNode;

/// Where a model came from, for readers that resolve sibling resources
#[derive(Debug, Clone, Default)]
pub struct ReadContext {
    /// Name given to the root node
    pub name: String,
    /// Directory for relative buffer/image URIs (local sources only)
    pub base_dir: Option<PathBuf>,
}

impl ReadContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_dir: None,
        }
    }

    pub fn with_base_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.base_dir = Some(dir.as_ref().to_path_buf());
        self
    }
}

/// Decodes one model format into a scene graph
pub trait SceneReader: Send + Sync {
    /// Decode a complete file held in memory
    fn read_scene(&self, bytes: &[u8], context: &ReadContext) -> Result<SceneNode>;

    /// Check if this reader can handle the data by examining its header
    fn can_read(&self, bytes: &[u8]) -> bool;

    /// Get the format name this reader handles
    fn format_name(&self) -> &'static str;

    /// Lowercase file extensions this reader claims
    fn extensions(&self) -> &'static [&'static str];
}

/// Registry that maps extensions to readers
#[derive(Clone)]
pub struct FormatRegistry {
    readers: Vec<Arc<dyn SceneReader>>,
    by_extension: HashMap<String, usize>,
}

impl FormatRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
            by_extension: HashMap::new(),
        }
    }

    /// Registry with the glTF, OBJ and PLY readers
    pub fn with_default_readers() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::gltf::GltfReader));
        registry.register(Arc::new(crate::obj::ObjReader));
        registry.register(Arc::new(crate::ply::PlyReader));
        registry
    }

    /// Register a reader for every extension it claims; later registrations win
    pub fn register(&mut self, reader: Arc<dyn SceneReader>) {
        let index = self.readers.len();
        for ext in reader.extensions() {
            self.by_extension.insert(ext.to_lowercase(), index);
        }
        self.readers.push(reader);
    }

    /// Decode `bytes`, preferring the reader for `extension_hint`
    pub fn read_scene(&self, bytes: &[u8], extension_hint: Option<&str>, context: &ReadContext) -> Result<SceneNode> {
        let hinted = extension_hint
            .and_then(|ext| self.by_extension.get(&ext.to_lowercase()))
            .map(|&i| &self.readers[i]);

        // First try the hint if the header agrees
        if let Some(reader) = hinted {
            if reader.can_read(bytes) {
                return reader.read_scene(bytes, context);
            }
        }

        // Try to detect format by header signature
        if let Some(reader) = self.readers.iter().find(|r| r.can_read(bytes)) {
            return reader.read_scene(bytes, context);
        }

        // Fall back to the hint alone
        if let Some(reader) = hinted {
            return reader.read_scene(bytes, context);
        }

        Err(IoError::InvalidFormat {
            format: extension_hint.unwrap_or("<none>").to_string(),
        })
    }

    pub fn supports_extension(&self, extension: &str) -> bool {
        self.by_extension.contains_key(&extension.to_lowercase())
    }

    /// Names of the registered formats
    pub fn supported_formats(&self) -> Vec<&'static str> {
        self.readers.iter().map(|r| r.format_name()).collect()
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.supported_formats())
            .finish()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_default_readers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockReader;

    impl SceneReader for MockReader {
        fn read_scene(&self, _bytes: &[u8], context: &ReadContext) -> Result<SceneNode> {
            Ok(SceneNode::new(context.name.clone()))
        }

        fn can_read(&self, bytes: &[u8]) -> bool {
            bytes.starts_with(b"MOCK")
        }

        fn format_name(&self) -> &'static str {
            "mock"
        }

        fn extensions(&self) -> &'static [&'static str] {
            &["mock", "mk"]
        }
    }

    #[test]
    fn test_registry_registration() {
        let mut registry = FormatRegistry::new();
        registry.register(Arc::new(MockReader));

        assert!(registry.supports_extension("MOCK"));
        assert!(registry.supports_extension("mk"));
        assert!(!registry.supports_extension("obj"));
        assert_eq!(registry.supported_formats(), vec!["mock"]);
        assert_eq!(format!("{:?}", registry), r#"FormatRegistry { formats: ["mock"] }"#);
    }

    #[test]
    fn test_header_detection_overrides_wrong_extension() {
        let mut registry = FormatRegistry::new();
        registry.register(Arc::new(MockReader));

        let node = registry
            .read_scene(b"MOCK data", Some("bin"), &ReadContext::new("detected"))
            .unwrap();
        assert_eq!(node.name, "detected");
    }

    #[test]
    fn test_unsupported_format() {
        let registry = FormatRegistry::new();
        let result = registry.read_scene(b"????", Some("xyz"), &ReadContext::default());
        assert!(matches!(result, Err(IoError::InvalidFormat { .. })));
    }

    #[test]
    fn test_default_readers_cover_model_formats() {
        let registry = FormatRegistry::with_default_readers();
        for ext in ["glb", "gltf", "obj", "ply"] {
            assert!(registry.supports_extension(ext), "missing {}", ext);
        }
    }
}

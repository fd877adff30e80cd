//! Static model catalog

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Static metadata and source location for one loadable model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Unique id within the catalog
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    /// Path or `http(s)://` URL of the model file
    #[serde(rename = "source")]
    pub source_uri: String,
    #[serde(default)]
    pub caption: Option<String>,
    /// Ordered `(label, value)` pairs shown next to the model
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
}

impl AssetDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, source_uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            source_uri: source_uri.into(),
            caption: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_attribute(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((label.into(), value.into()));
        self
    }
}

/// Ordered, immutable list of descriptors.
///
/// Entry 0 is the model shown first; the rest load in the background in order.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<Arc<AssetDescriptor>>,
}

impl Catalog {
    /// Build a catalog, rejecting empty lists and duplicate ids
    pub fn new(descriptors: Vec<AssetDescriptor>) -> Result<Self> {
        if descriptors.is_empty() {
            return Err(Error::Config("catalog has no entries".to_string()));
        }

        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            if descriptor.id.trim().is_empty() {
                return Err(Error::Config("catalog entry with empty id".to_string()));
            }
            if !seen.insert(descriptor.id.as_str()) {
                return Err(Error::Config(format!("duplicate catalog id '{}'", descriptor.id)));
            }
        }

        Ok(Self {
            entries: descriptors.into_iter().map(Arc::new).collect(),
        })
    }

    /// Parse a JSON array of descriptors
    pub fn from_json_str(json: &str) -> Result<Self> {
        let descriptors: Vec<AssetDescriptor> = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid catalog: {}", e)))?;
        Self::new(descriptors)
    }

    /// Read a JSON catalog file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// The two-model portfolio catalog
    pub fn portfolio() -> Self {
        let descriptors = vec![
            AssetDescriptor::new("e11", "E11 Blaster", "models/E11_Final_squoosh-v1.glb")
                .with_caption("Hard-surface prop. Turntable-ready.")
                .with_attribute("Category", "Prop")
                .with_attribute("Software", "Blender, Substance Painter")
                .with_attribute("Year", "2025")
                .with_attribute("Textures", "Base/Metal-Rough/Normal"),
            AssetDescriptor::new("ramen", "Ramen Bowl", "models/Ramen_squoosh_v1.glb")
                .with_caption("Stylized food model.")
                .with_attribute("Category", "Prop")
                .with_attribute("Software", "Blender"),
        ];
        Self {
            entries: descriptors.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<AssetDescriptor>> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<AssetDescriptor>> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_catalog() {
        let json = r#"[
            {"id": "e11", "name": "E11 Blaster", "source": "/models/e11.glb",
             "caption": "Hard-surface prop.", "attributes": [["Category", "Prop"], ["Year", "2025"]]},
            {"id": "ramen", "name": "Ramen Bowl", "source": "/models/ramen.glb"}
        ]"#;
        let catalog = Catalog::from_json_str(json).unwrap();

        assert_eq!(catalog.len(), 2);
        let first = catalog.get(0).unwrap();
        assert_eq!(first.display_name, "E11 Blaster");
        assert_eq!(first.attributes[1], ("Year".to_string(), "2025".to_string()));
        assert_eq!(catalog.get(1).unwrap().caption, None);
        assert_eq!(catalog.get(1).unwrap().id, "ramen");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = Catalog::new(vec![
            AssetDescriptor::new("a", "A", "a.glb"),
            AssetDescriptor::new("a", "Again", "b.glb"),
        ]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn rejects_empty_catalog() {
        assert!(Catalog::new(Vec::new()).is_err());
    }

    #[test]
    fn portfolio_starts_with_e11() {
        let catalog = Catalog::portfolio();
        assert_eq!(catalog.get(0).unwrap().id, "e11");
        assert_eq!(catalog.get(1).unwrap().id, "ramen");
    }
}

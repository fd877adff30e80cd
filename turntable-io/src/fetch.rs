//! Locating and fetching asset bytes from disk or over HTTP

use crate::{IoError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A resolved asset location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    Local(PathBuf),
    Remote(String),
}

fn is_url(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

impl AssetLocation {
    /// Resolve a catalog URI against an optional asset root.
    ///
    /// Absolute URLs are used as-is. Otherwise the URI is joined onto the
    /// root, with a leading `/` meaning "relative to the root" rather than
    /// the filesystem root.
    pub fn resolve(root: Option<&str>, uri: &str) -> Self {
        if is_url(uri) {
            return Self::Remote(uri.to_string());
        }
        match root {
            Some(root) if is_url(root) => Self::Remote(format!(
                "{}/{}",
                root.trim_end_matches('/'),
                uri.trim_start_matches('/')
            )),
            Some(root) => Self::Local(Path::new(root).join(uri.trim_start_matches('/'))),
            None => Self::Local(PathBuf::from(uri)),
        }
    }

    /// Directory that relative references inside the asset resolve against
    pub fn base_dir(&self) -> Option<PathBuf> {
        match self {
            Self::Local(path) => path.parent().map(Path::to_path_buf),
            Self::Remote(_) => None,
        }
    }
}

impl fmt::Display for AssetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => f.write_str(url),
        }
    }
}

/// Read the whole asset into memory
pub async fn fetch(location: &AssetLocation) -> Result<Vec<u8>> {
    match location {
        AssetLocation::Local(path) => {
            debug!(path = %path.display(), "reading asset from disk");
            tokio::fs::read(path).await.map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => IoError::FileNotFound {
                    path: path.display().to_string(),
                },
                _ => IoError::Io(e),
            })
        }
        AssetLocation::Remote(url) => {
            debug!(%url, "downloading asset");
            let response = reqwest::get(url.as_str()).await?.error_for_status()?;
            let bytes = response.bytes().await?;
            Ok(bytes.to_vec())
        }
    }
}

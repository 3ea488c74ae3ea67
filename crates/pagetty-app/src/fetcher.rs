//! Fetcher that serves files from a local directory.

use std::path::{Component, Path, PathBuf};

use pagetty_terminal::Fetcher;
use pagetty_types::error::{PagettyError, Result};

/// Resolves URLs as paths relative to `root`. Remote URLs and paths that
/// leave the root are refused.
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    /// Serve files below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf> {
        if url.contains("://") {
            return Err(PagettyError::Fetch(format!("{url}: remote fetching is not supported")));
        }
        let rel = Path::new(url.trim_start_matches('/'));
        if rel.components().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir)) {
            return Err(PagettyError::Fetch(format!("{url}: outside the served directory")));
        }
        Ok(self.root.join(rel))
    }
}

impl Fetcher for DirFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let path = self.resolve(url)?;
        log::debug!("fetch {url} -> {}", path.display());
        std::fs::read_to_string(&path).map_err(|e| PagettyError::Fetch(format!("{url}: {e}")))
    }
}

//! Resource fetching collaborator.

use std::collections::HashMap;

use pagetty_types::error::{PagettyError, Result};

/// Loads the text behind a URL. Blocking; commands call it from their
/// handler and report the outcome inline.
pub trait Fetcher {
    /// Body of `url`, or a `Fetch` error.
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Fetcher serving a fixed set of documents from memory.
#[derive(Debug, Default, Clone)]
pub struct MapFetcher {
    resources: HashMap<String, String>,
}

impl MapFetcher {
    /// Create a fetcher that serves nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.insert(url, body);
        self
    }

    /// Serve `body` for `url`, replacing any earlier body.
    pub fn insert(&mut self, url: &str, body: &str) {
        self.resources.insert(url.to_string(), body.to_string());
    }
}

impl Fetcher for MapFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        self.resources
            .get(url)
            .cloned()
            .ok_or_else(|| PagettyError::Fetch(format!("{url}: not found")))
    }
}

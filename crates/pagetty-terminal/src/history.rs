//! Bounded input history with a recall cursor and best-effort persistence.

use pagetty_types::error::{PagettyError, Result};

use crate::store::KvStore;

/// Default number of entries kept.
pub const DEFAULT_LIMIT: usize = 1000;

/// Key written and removed once to check that a store accepts writes.
const PROBE_KEY: &str = "pagetty.probe";

/// Append-only log of submitted lines.
///
/// The cursor ranges over `0..=len`; `len` is the "end" position where no
/// entry is recalled.
pub struct History {
    entries: Vec<String>,
    pointer: usize,
    limit: usize,
    key: String,
    store: Option<Box<dyn KvStore>>,
}

impl History {
    /// Memory-only history.
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            pointer: 0,
            limit: limit.max(1),
            key: String::new(),
            store: None,
        }
    }

    /// History persisted under `key` in `store`.
    ///
    /// A store that rejects the probe write is dropped and the history stays
    /// in memory. Unreadable or corrupt saved data starts an empty history.
    pub fn open(limit: usize, key: &str, mut store: Box<dyn KvStore>) -> Self {
        let mut history = Self::new(limit);
        history.key = key.to_string();

        if let Err(e) = probe(store.as_mut()) {
            log::warn!("history store not writable, keeping history in memory: {e}");
            return history;
        }

        match load(store.as_ref(), key) {
            Ok(mut entries) => {
                let excess = entries.len().saturating_sub(history.limit);
                entries.drain(..excess);
                history.entries = entries;
            },
            Err(e) => log::warn!("discarding saved history: {e}"),
        }
        history.store = Some(store);
        history.to_end();
        history
    }

    /// Whether entries are being written to a durable store.
    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    /// Append an entry, evicting the oldest ones past the limit.
    pub fn add(&mut self, entry: &str) {
        self.entries.push(entry.to_string());
        let excess = self.entries.len().saturating_sub(self.limit);
        if excess > 0 {
            self.entries.drain(..excess);
        }
        self.pointer = self.pointer.min(self.entries.len());
        self.save();
    }

    /// Move the cursor one entry back (clamped at the oldest entry) and
    /// return the entry there.
    pub fn prev(&mut self) -> Option<&str> {
        self.pointer = self.pointer.saturating_sub(1);
        self.get()
    }

    /// Move the cursor one entry forward and return the entry there, or
    /// `None` once the cursor reaches the end.
    ///
    /// Fails with [`PagettyError::HistoryAtEnd`] without moving when the
    /// cursor is already at the end.
    pub fn next(&mut self) -> Result<Option<&str>> {
        if self.pointer >= self.entries.len() {
            return Err(PagettyError::HistoryAtEnd);
        }
        self.pointer += 1;
        Ok(self.get())
    }

    /// Move the cursor past the newest entry, where the free-typed line lives.
    pub fn to_end(&mut self) -> Option<&str> {
        self.pointer = self.entries.len();
        self.get()
    }

    /// Move the cursor to the oldest entry.
    pub fn to_begin(&mut self) -> Option<&str> {
        self.pointer = 0;
        self.get()
    }

    /// The entry under the cursor, `None` at the end.
    pub fn get(&self) -> Option<&str> {
        self.entries.get(self.pointer).map(String::as_str)
    }

    /// Cursor position, `len()` when at the end.
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// True when the cursor is past the newest entry.
    pub fn is_at_end(&self) -> bool {
        self.pointer == self.entries.len()
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries kept.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Drop every entry (and the saved copy).
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pointer = 0;
        self.save();
    }

    fn save(&mut self) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        let result = serde_json::to_string(&self.entries)
            .map_err(PagettyError::from)
            .and_then(|json| store.write(&self.key, &json));
        if let Err(e) = result {
            log::debug!("history save failed: {e}");
        }
    }
}

fn probe(store: &mut dyn KvStore) -> Result<()> {
    store.write(PROBE_KEY, PROBE_KEY)?;
    store.remove(PROBE_KEY)
}

fn load(store: &dyn KvStore, key: &str) -> Result<Vec<String>> {
    match store.read(key)? {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| PagettyError::Storage(format!("corrupt history under {key:?}: {e}"))),
        None => Ok(Vec::new()),
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

//! Error types for pagetty.

use std::io;

/// Errors produced by the pagetty terminal core and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum PagettyError {
    /// A command handler failed while running.
    #[error("command error: {0}")]
    Command(String),

    /// The command registry rejected a registration.
    #[error("registry error: {0}")]
    Registry(String),

    /// History cursor is already past the newest entry.
    #[error("history: already at end")]
    HistoryAtEnd,

    /// Persistent storage is unavailable or holds unreadable data.
    #[error("storage error: {0}")]
    Storage(String),

    /// Input was evaluated while another command was still in flight.
    #[error("terminal busy: a command is still running")]
    Busy,

    /// A fetch collaborator could not deliver a resource.
    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, PagettyError>;

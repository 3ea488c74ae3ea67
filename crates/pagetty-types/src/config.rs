//! Terminal configuration loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid config:
//!
//! ```toml
//! prompt = ">"
//! history_limit = 500
//!
//! [typing]
//! speed_ms = 45
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Top-level terminal configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Prompt text rendered before the input line.
    pub prompt: String,
    /// Maximum number of history entries kept.
    pub history_limit: usize,
    /// Key under which history is persisted.
    pub history_key: String,
    /// Scripted typing timings.
    pub typing: ScriptConfig,
}

/// Timings for scripted typing playback, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Base delay per typed character and between script steps.
    pub speed_ms: u64,
    /// Maximum random deviation from `speed_ms` per character.
    pub variance_ms: u64,
    /// Implicit pause inserted for lines without content.
    pub blank_line_pause_ms: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            prompt: "$".to_string(),
            history_limit: 1000,
            history_key: "terminalHistory".to_string(),
            typing: ScriptConfig::default(),
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            speed_ms: 60,
            variance_ms: 40,
            blank_line_pause_ms: 400,
        }
    }
}

impl TerminalConfig {
    /// Parse a config from a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("loaded terminal config from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            return Err(crate::error::PagettyError::Config(
                "history_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

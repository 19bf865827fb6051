use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::terminal::TerminalConfig;

/// Contents of a `--config` file.
///
/// ```json
/// { "terminal": { "frame_rate": 60 }, "effect": { "typing_speed": 2 } }
/// ```
///
/// `effect` is kept as raw JSON until the effect is known, so each effect
/// deserializes its own config struct from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub terminal: TerminalConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<serde_json::Value>,
}

impl AppConfig {
    /// Read a config file; without a path every setting takes its default.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

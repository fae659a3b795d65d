use crate::SyncError;
use scribe_render::dom::{TagTable, DOM};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "scribe.config.json";

/// Synchronization settings (`scribe.config.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Rendering engine used for the live DOM
    #[serde(default = "default_format")]
    pub format: String,

    /// Formats the engine extends, closest first
    #[serde(default)]
    pub extends: Vec<String>,

    /// Node kind → element tag
    #[serde(default)]
    pub tags: TagTable,

    /// Element wrapping formatted character runs
    #[serde(default = "default_wrapper_tag")]
    pub wrapper_tag: String,
}

fn default_format() -> String {
    DOM.to_string()
}

fn default_wrapper_tag() -> String {
    "span".to_string()
}

impl SyncConfig {
    /// Load config from a directory, falling back to the defaults
    pub fn load(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: SyncConfig = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(SyncConfig::default())
        }
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.format.is_empty() {
            return Err(SyncError::Config("format must not be empty".to_string()));
        }
        if self.wrapper_tag.is_empty() {
            return Err(SyncError::Config("wrapperTag must not be empty".to_string()));
        }
        if self.extends.contains(&self.format) {
            return Err(SyncError::Config(format!(
                "format '{}' cannot extend itself",
                self.format
            )));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            extends: Vec::new(),
            tags: TagTable::default(),
            wrapper_tag: default_wrapper_tag(),
        }
    }
}

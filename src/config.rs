//! Buffer tuning configuration
//!
//! Stores thresholds in `~/.config/layerbuf/config.yaml`

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Copying this many bytes takes microseconds, which is invisible to
/// interactive editing.
pub const DEFAULT_DIRECT_EDIT_LIMIT: usize = 16 * 1024;

/// Average live bytes per layer at or below which the chain is flattened.
pub const DEFAULT_UNIFY_DENSITY: usize = 128 * 1024;

/// Thresholds that decide how the edit engine lays out storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Largest layer tail (in bytes) that may be shifted by an in-place edit
    #[serde(default = "default_direct_edit_limit")]
    pub direct_edit_limit: usize,

    /// Target live bytes per layer before compaction kicks in
    #[serde(default = "default_unify_density")]
    pub unify_density: usize,

    /// Whether edits may compact the buffer on their own
    #[serde(default = "default_auto_unify")]
    pub auto_unify: bool,
}

fn default_direct_edit_limit() -> usize {
    DEFAULT_DIRECT_EDIT_LIMIT
}

fn default_unify_density() -> usize {
    DEFAULT_UNIFY_DENSITY
}

fn default_auto_unify() -> bool {
    true
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            direct_edit_limit: default_direct_edit_limit(),
            unify_density: default_unify_density(),
            auto_unify: default_auto_unify(),
        }
    }
}

impl BufferConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };

        Self::load_from(&path)
    }

    /// Load config from a specific file, falling back to defaults on any failure
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to a specific file
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }
}

// Editor configuration
//
// Crossfade settings, undo depth and progress granularity. The engine takes a
// copy at construction time; actions read it through their EditRun.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Gain curve of a crossfade ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FadeShape {
    #[default]
    Linear,
    /// Linear gains squared
    Parabolic,
}

/// How the edges of an edited region are blended into their surroundings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CrossfadeEdges {
    #[default]
    None,
    /// Blend inside the new selection against the audio that was there before
    Inner,
    /// Blend windows straddling each edge, shortening the sound
    Outer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossfadeConfig {
    /// Global "apply crossfade" toggle
    pub apply: bool,
    pub edges: CrossfadeEdges,
    /// Width of the start edge window in milliseconds
    pub start_ms: f64,
    /// Width of the stop edge window in milliseconds
    pub stop_ms: f64,
    pub shape: FadeShape,
}

impl Default for CrossfadeConfig {
    fn default() -> Self {
        Self {
            apply: true,
            edges: CrossfadeEdges::Inner,
            start_ms: 10.0,
            stop_ms: 10.0,
            shape: FadeShape::Linear,
        }
    }
}

impl CrossfadeConfig {
    /// Mode actually applied, taking the global toggle into account
    pub fn effective_edges(&self) -> CrossfadeEdges {
        if self.apply {
            self.edges
        } else {
            CrossfadeEdges::None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub crossfade: CrossfadeConfig,
    /// Maximum number of actions kept per document; 0 disables undo
    pub undo_limit: usize,
    /// Samples processed between two progress checks
    pub progress_chunk: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            crossfade: CrossfadeConfig::default(),
            undo_limit: 100,
            progress_chunk: 65536,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

impl EditorConfig {
    /// `<config dir>/rewave/config.ron`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rewave").join("config.ron"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(ron::from_str(&text)?)
    }

    /// Load the file if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, text)?;
        Ok(())
    }
}

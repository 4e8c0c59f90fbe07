// Macro persistence (RON, or JSON for interchange)

use crate::action::ActionParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bumped whenever the on-disk layout changes
pub const MACRO_FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum MacroError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    #[error("Invalid macro file: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported macro format version {0}")]
    InvalidVersion(u32),
}

/// One recorded action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroStep {
    /// Factory name in the action registry
    pub action: String,
    pub params: ActionParams,
}

impl MacroStep {
    pub fn new(action: impl Into<String>, params: ActionParams) -> Self {
        Self {
            action: action.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macro {
    pub version: u32,
    pub name: String,
    pub steps: Vec<MacroStep>,
}

impl Macro {
    pub fn new(name: impl Into<String>, steps: Vec<MacroStep>) -> Self {
        Self {
            version: MACRO_FORMAT_VERSION,
            name: name.into(),
            steps,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn to_ron(&self) -> Result<String, MacroError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    pub fn from_ron(text: &str) -> Result<Self, MacroError> {
        let parsed: Self = ron::from_str(text)?;
        parsed.check_version()
    }

    pub fn to_json(&self) -> Result<String, MacroError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, MacroError> {
        let parsed: Self = serde_json::from_str(text)?;
        parsed.check_version()
    }

    fn check_version(self) -> Result<Self, MacroError> {
        if self.version > MACRO_FORMAT_VERSION {
            return Err(MacroError::InvalidVersion(self.version));
        }
        Ok(self)
    }

    /// Save as JSON when the extension is `.json`, RON otherwise
    pub fn save(&self, path: &Path) -> Result<(), MacroError> {
        let text = if is_json(path) { self.to_json()? } else { self.to_ron()? };
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, MacroError> {
        let text = std::fs::read_to_string(path)?;
        if is_json(path) {
            Self::from_json(&text)
        } else {
            Self::from_ron(&text)
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

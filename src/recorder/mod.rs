// Macro recorder - Observer of completed top-level actions
//
// While a recording session is active the engine registers every top-level
// action with the recorder before executing it, and takes the registration
// back if the action fails. Nested actions never reach the recorder.

pub mod macro_file;

pub use macro_file::{MACRO_FORMAT_VERSION, Macro, MacroError, MacroStep};

use crate::action::ActionParams;
use crate::document::Document;

pub trait MacroRecorder: Send {
    fn is_recording(&self) -> bool;

    /// Register an action about to run; false cancels the action
    fn push_action(&mut self, name: &str, params: &ActionParams, document: Option<&Document>) -> bool;

    /// Take back the most recent registration of `name`
    fn pop_action(&mut self, name: &str);
}

/// Recorder collecting steps into a Macro
#[derive(Debug, Default)]
pub struct MacroRecording {
    name: String,
    recording: bool,
    steps: Vec<MacroStep>,
    /// Actions this recording refuses to register
    excluded: Vec<String>,
}

impl MacroRecording {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session, discarding any previous steps
    pub fn start(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.steps.clear();
        self.recording = true;
        log::info!("recording macro '{}'", self.name);
    }

    /// End the session and hand over what was recorded
    pub fn stop(&mut self) -> Macro {
        self.recording = false;
        log::info!("macro '{}' recorded with {} steps", self.name, self.steps.len());
        Macro::new(std::mem::take(&mut self.name), std::mem::take(&mut self.steps))
    }

    /// Refuse to record `name`; the engine then cancels it
    pub fn exclude(&mut self, name: impl Into<String>) {
        self.excluded.push(name.into());
    }

    pub fn steps(&self) -> &[MacroStep] {
        &self.steps
    }
}

impl MacroRecorder for MacroRecording {
    fn is_recording(&self) -> bool {
        self.recording
    }

    fn push_action(&mut self, name: &str, params: &ActionParams, _document: Option<&Document>) -> bool {
        if !self.recording {
            return true;
        }
        if self.excluded.iter().any(|excluded| excluded == name) {
            log::warn!("'{}' cannot be recorded in a macro", name);
            return false;
        }
        self.steps.push(MacroStep::new(name, params.clone()));
        true
    }

    fn pop_action(&mut self, name: &str) {
        if let Some(index) = self.steps.iter().rposition(|step| step.action == name) {
            self.steps.remove(index);
        } else {
            log::debug!("no recorded '{}' to take back", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_session() {
        let mut recording = MacroRecording::new();
        assert!(!recording.is_recording());
        assert!(recording.push_action("Gain", &ActionParams::new(), None));
        assert!(recording.steps().is_empty());

        recording.start("fade out");
        recording.push_action("Gain", &ActionParams::new().with("factor", 0.5), None);
        recording.push_action("Delete", &ActionParams::new(), None);
        assert_eq!(recording.steps().len(), 2);

        let recorded = recording.stop();
        assert_eq!(recorded.name, "fade out");
        assert_eq!(recorded.steps[0].action, "Gain");
        assert!(!recording.is_recording());
        assert!(recording.steps().is_empty());
    }

    #[test]
    fn test_pop_removes_latest_match() {
        let mut recording = MacroRecording::new();
        recording.start("m");
        recording.push_action("Gain", &ActionParams::new().with("factor", 0.5), None);
        recording.push_action("Delete", &ActionParams::new(), None);
        recording.push_action("Gain", &ActionParams::new().with("factor", 2.0), None);

        recording.pop_action("Gain");
        let steps = recording.steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].params.float("factor").unwrap(), 0.5);

        recording.pop_action("Crop");
        assert_eq!(recording.steps().len(), 2);
    }

    #[test]
    fn test_excluded_action_cancels() {
        let mut recording = MacroRecording::new();
        recording.exclude("Resample");
        recording.start("m");
        assert!(!recording.push_action("Resample", &ActionParams::new(), None));
        assert!(recording.steps().is_empty());
    }
}

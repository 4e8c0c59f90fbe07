// Rewave - Library exports for the binary, tests and benchmarks

pub mod action;
pub mod config;
pub mod document;
pub mod edits;
pub mod messaging;
pub mod recorder;
pub mod sound;

// Re-export commonly used types for convenience
pub use action::{
    Action, ActionContext, ActionEngine, ActionError, ActionFactory, ActionParams, ActionRegistry, ActionResult, Edit,
    EditRun, PerformOptions, PerformOutcome, PerformStatus, UndoOutcome, Undoable,
};
pub use config::{CrossfadeConfig, CrossfadeEdges, EditorConfig, FadeShape};
pub use document::Document;
pub use messaging::{Frontend, Notification, NotificationFrontend, create_notification_channel};
pub use recorder::{Macro, MacroRecorder, MacroRecording, MacroStep};
pub use sound::{ChannelMask, MemorySound, SoundBuffer};

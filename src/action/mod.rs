// Action engine
//
// Concrete edits implement the Edit trait. Everything around them (locking,
// backups, crossfades, selection and cue bookkeeping, undo history and the
// perform protocol) lives here.

pub mod context;
pub mod crossfade;
pub mod edit;
pub mod engine;
pub mod error;
pub mod factory;
pub mod history;
pub mod lifecycle;
pub mod params;
pub mod region;

pub use context::ActionContext;
pub use crossfade::{Crossfader, Ramp, UndoneCrossfades, blend, ramp_gains};
pub use edit::{Edit, EditRun, Undoable};
pub use engine::{ActionEngine, PerformOptions, PerformOutcome, PerformStatus, UndoOutcome, perform_nested};
pub use error::{ActionError, ActionResult};
pub use factory::{ActionFactory, ActionRegistry, ParamDialog};
pub use history::{DEFAULT_UNDO_LIMIT, UndoStack};
pub use lifecycle::{Action, ActionState};
pub use params::{ActionParams, ParamValue};
pub use region::{MoveMode, RegionBackup};

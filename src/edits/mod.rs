// Concrete edits
//
// Each edit comes with its factory; `standard()` builds the registry the
// binary and macro playback look actions up in.

pub mod channels;
pub mod delete;
pub mod gain;
pub mod macro_edit;
pub mod rate;
pub mod silence;

pub use channels::{AddChannelsEdit, AddChannelsFactory, RemoveChannelsEdit, RemoveChannelsFactory};
pub use delete::{CropEdit, CropFactory, DeleteEdit, DeleteFactory};
pub use gain::{GainEdit, GainFactory};
pub use macro_edit::{MacroEdit, MacroFactory};
pub use rate::{
    ChangeRateEdit, ChangeRateFactory, MAX_RATE_RATIO, MAX_SAMPLE_RATE, MIN_RATE_RATIO, ResampleEdit, ResampleFactory,
};
pub use silence::{InsertSilenceEdit, InsertSilenceFactory};

use crate::action::{ActionError, ActionRegistry, ActionResult};
use std::sync::Arc;

/// Longest sound an edit may leave behind, per channel
pub const MAX_RESULT_LENGTH: usize = 1 << 28;

/// Refuse edits that would grow a sound past MAX_RESULT_LENGTH
pub(crate) fn check_result_length(length: usize) -> ActionResult<()> {
    if length > MAX_RESULT_LENGTH {
        return Err(ActionError::user(format!(
            "The result would be {} samples long, the limit is {}",
            length, MAX_RESULT_LENGTH
        )));
    }
    Ok(())
}

/// Registry holding every built-in edit
pub fn standard() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(DeleteFactory));
    registry.register(Arc::new(CropFactory));
    registry.register(Arc::new(InsertSilenceFactory));
    registry.register(Arc::new(GainFactory));
    registry.register(Arc::new(ChangeRateFactory));
    registry.register(Arc::new(ResampleFactory));
    registry.register(Arc::new(AddChannelsFactory));
    registry.register(Arc::new(RemoveChannelsFactory));
    registry
}

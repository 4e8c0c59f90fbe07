// ActionFactory - Per-edit-type entry point
//
// A factory validates, collects parameters through optional dialogs and
// manufactures the concrete Edit. The engine drives the rest of the protocol.

use crate::action::context::ActionContext;
use crate::action::edit::Edit;
use crate::action::error::ActionResult;
use crate::action::params::ActionParams;
use crate::document::Document;
use crate::sound::SoundBuffer;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Parameter collection dialog; returning false means the user cancelled
pub trait ParamDialog: Send + Sync {
    fn show(&self, ctx: &mut ActionContext, params: &mut ActionParams) -> bool;
}

impl<F> ParamDialog for F
where
    F: Fn(&mut ActionContext, &mut ActionParams) -> bool + Send + Sync,
{
    fn show(&self, ctx: &mut ActionContext, params: &mut ActionParams) -> bool {
        self(ctx, params)
    }
}

pub trait ActionFactory: Send + Sync {
    /// Registry key and name shown in the undo history
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        self.name()
    }

    /// Refuse to run without a document
    fn requires_buffer(&self) -> bool {
        true
    }

    /// Whether the edit can change the length or channel count of the sound
    fn will_resize(&self) -> bool;

    /// Whether the configured crossfade is applied around this edit
    fn crossfade_applies(&self) -> bool {
        false
    }

    fn channel_dialog(&self) -> Option<&dyn ParamDialog> {
        None
    }

    fn param_dialog(&self) -> Option<&dyn ParamDialog> {
        None
    }

    /// Last chance to prepare the document (e.g. stop playback); false aborts
    fn pre_action_setup(&self, _document: Option<&Document>) -> bool {
        true
    }

    /// Build the edit for this invocation
    ///
    /// `Ok(None)` cancels quietly; user-facing validation failures are
    /// `ActionError::User`.
    fn manufacture(
        &self,
        sound: &dyn SoundBuffer,
        ctx: &ActionContext,
        params: &ActionParams,
    ) -> ActionResult<Option<Box<dyn Edit>>>;
}

/// Factories by name
#[derive(Default, Clone)]
pub struct ActionRegistry {
    factories: BTreeMap<String, Arc<dyn ActionFactory>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory, replacing any previous one with the same name
    pub fn register(&mut self, factory: Arc<dyn ActionFactory>) {
        let name = factory.name().to_string();
        if self.factories.insert(name.clone(), factory).is_some() {
            log::debug!("replaced action factory '{}'", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionFactory>> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

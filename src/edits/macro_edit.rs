// Macro playback - Replay recorded steps as one undoable action
//
// Each step is performed through perform_nested, so the steps never touch
// the undo stack, the recorder or the frontend. The finished steps are kept
// and undone in reverse order, both when a later step fails and when the
// macro itself is undone.

use crate::action::{
    Action, ActionContext, ActionError, ActionFactory, ActionParams, ActionRegistry, ActionResult, Edit, EditRun,
    Undoable, perform_nested,
};
use crate::recorder::{Macro, MacroStep};
use crate::sound::SoundBuffer;
use std::sync::Arc;

pub struct MacroEdit {
    registry: Arc<ActionRegistry>,
    steps: Vec<MacroStep>,
    done: Vec<Action>,
}

impl MacroEdit {
    pub fn new(registry: Arc<ActionRegistry>, steps: Vec<MacroStep>) -> Self {
        Self {
            registry,
            steps,
            done: Vec::new(),
        }
    }

    /// Steps that have run and not been undone
    pub fn completed(&self) -> usize {
        self.done.len()
    }

    /// Undo every completed step, newest first; the first error wins
    fn undo_completed(&mut self, sound: &mut dyn SoundBuffer, run: &mut EditRun<'_>) -> ActionResult<()> {
        let mut first_error = None;
        while let Some(mut action) = self.done.pop() {
            let mut scratch_ctx = ActionContext::whole(sound);
            let mut child = run.nested();
            if let Err(err) = action.undo(sound, &mut scratch_ctx, &mut child) {
                log::error!("could not undo macro step '{}': {}", action.name(), err);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for MacroEdit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacroEdit")
            .field("steps", &self.steps.len())
            .field("done", &self.done)
            .finish()
    }
}

impl Edit for MacroEdit {
    fn apply_forward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        ctx: &mut ActionContext,
        run: &mut EditRun<'_>,
        _prepare_for_undo: bool,
    ) -> ActionResult<()> {
        let original = *ctx;
        let mut failure = None;
        for (index, step) in self.steps.iter().enumerate() {
            let result = match self.registry.get(&step.action) {
                // Steps are always prepared for undo so a failure can roll back
                Some(factory) => perform_nested(factory.as_ref(), sound, ctx, &step.params, run, true),
                None => Err(ActionError::user(format!("Unknown action '{}' in macro", step.action))),
            };
            match result {
                Ok(action) => self.done.push(action),
                Err(err) => {
                    log::info!(
                        "macro step {} ('{}') stopped the macro: {}",
                        index + 1,
                        step.action,
                        err
                    );
                    failure = Some(err);
                    break;
                }
            }
        }

        match failure {
            None => Ok(()),
            Some(err) => {
                self.undo_completed(sound, run)?;
                *ctx = original;
                Err(err)
            }
        }
    }

    fn apply_backward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        _ctx: &mut ActionContext,
        run: &mut EditRun<'_>,
    ) -> ActionResult<()> {
        self.undo_completed(sound, run)
    }

    fn query_undoable(&self, _ctx: &ActionContext) -> Undoable {
        if self.done.iter().any(|action| action.undoable() == Undoable::No) {
            Undoable::No
        } else if !self.done.is_empty() && self.done.iter().all(|action| action.undoable() == Undoable::Yes) {
            Undoable::Yes
        } else {
            Undoable::NotApplicable
        }
    }
}

/// Factory replaying a recorded Macro under its own name
pub struct MacroFactory {
    registry: Arc<ActionRegistry>,
    recorded: Macro,
}

impl MacroFactory {
    pub fn new(registry: Arc<ActionRegistry>, recorded: Macro) -> Self {
        Self { registry, recorded }
    }

    pub fn recorded(&self) -> &Macro {
        &self.recorded
    }
}

impl ActionFactory for MacroFactory {
    fn name(&self) -> &str {
        &self.recorded.name
    }

    fn description(&self) -> &str {
        "Play back a recorded macro"
    }

    fn will_resize(&self) -> bool {
        self.recorded.steps.iter().any(|step| {
            self.registry
                .get(&step.action)
                .is_none_or(|factory| factory.will_resize())
        })
    }

    fn manufacture(
        &self,
        _sound: &dyn SoundBuffer,
        _ctx: &ActionContext,
        _params: &ActionParams,
    ) -> ActionResult<Option<Box<dyn Edit>>> {
        if self.recorded.is_empty() {
            log::info!("macro '{}' has no steps", self.recorded.name);
            return Ok(None);
        }
        if let Some(step) = self
            .recorded
            .steps
            .iter()
            .find(|step| !self.registry.contains(&step.action))
        {
            return Err(ActionError::user(format!(
                "Macro '{}' uses unknown action '{}'",
                self.recorded.name, step.action
            )));
        }
        Ok(Some(Box::new(MacroEdit::new(
            self.registry.clone(),
            self.recorded.steps.clone(),
        ))))
    }
}

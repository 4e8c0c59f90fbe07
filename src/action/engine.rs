// ActionEngine - Perform and undo protocol
//
// perform_action runs a factory against a document in a fixed order:
// setup, context copy, dialogs, manufacture, macro registration, view state,
// execute, undo stack, registration rollback, "document changed". Everything
// an edit can fail with is turned into a PerformStatus here; only programmer
// errors (ActionError::Precondition) reach the caller as Err.

use crate::action::context::ActionContext;
use crate::action::crossfade::Crossfader;
use crate::action::edit::{Edit, EditRun, Undoable};
use crate::action::error::{ActionError, ActionResult};
use crate::action::factory::ActionFactory;
use crate::action::lifecycle::{Action, ActionState};
use crate::action::params::ActionParams;
use crate::config::{CrossfadeEdges, EditorConfig};
use crate::document::Document;
use crate::messaging::{Frontend, Notification, NotificationCategory};
use crate::recorder::MacroRecorder;
use crate::sound::{MemorySound, SoundBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerformOptions {
    /// Show the factory's dialogs when parameters are missing
    pub show_dialogs: bool,
    /// Parameters come from a macro or script; skip the dialogs
    pub params_already_set: bool,
}

impl Default for PerformOptions {
    fn default() -> Self {
        Self {
            show_dialogs: true,
            params_already_set: false,
        }
    }
}

impl PerformOptions {
    /// Options for replaying known parameters
    pub fn with_params() -> Self {
        Self {
            show_dialogs: false,
            params_already_set: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerformStatus {
    Success,
    /// The user (or the factory) backed out; nothing changed
    Cancelled,
    /// Clean failure; an empty reason was not shown to the operator
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformOutcome {
    pub status: PerformStatus,
    pub went_on_undo_stack: bool,
}

impl PerformOutcome {
    fn cancelled() -> Self {
        Self {
            status: PerformStatus::Cancelled,
            went_on_undo_stack: false,
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            status: PerformStatus::Failed(reason),
            went_on_undo_stack: false,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == PerformStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// Name of the action that was undone
    Undone(String),
    NothingToUndo,
    /// The action could not be undone and was dropped from the history
    Failed(String),
}

/// Build the Action wrapper for a freshly manufactured edit
fn wrap(factory: &dyn ActionFactory, config: &EditorConfig, ctx: &ActionContext, edit: Box<dyn Edit>) -> Action {
    let edges = if factory.crossfade_applies() {
        ctx.crossfade
    } else {
        CrossfadeEdges::None
    };
    Action::new(
        factory.name(),
        edit,
        factory.will_resize(),
        Crossfader::new(&config.crossfade, edges),
    )
}

/// Run a factory from inside another action
///
/// Only manufactures and executes: the recorder, the frontend and the undo
/// stack are left alone. The returned action is Done and belongs to the
/// caller, which undoes it as part of its own undo.
pub fn perform_nested(
    factory: &dyn ActionFactory,
    sound: &mut dyn SoundBuffer,
    ctx: &mut ActionContext,
    params: &ActionParams,
    run: &mut EditRun<'_>,
    prepare_for_undo: bool,
) -> ActionResult<Action> {
    let edit = factory
        .manufacture(sound, ctx, params)?
        .ok_or(ActionError::Cancelled)?;
    let mut child = run.nested();
    let mut action = wrap(factory, child.config, ctx, edit);
    action.execute(sound, ctx, &mut child, prepare_for_undo)?;
    Ok(action)
}

pub struct ActionEngine {
    config: EditorConfig,
    frontend: Box<dyn Frontend>,
    recorder: Option<Box<dyn MacroRecorder>>,
}

impl ActionEngine {
    pub fn new(config: EditorConfig, frontend: Box<dyn Frontend>) -> Self {
        Self {
            config,
            frontend,
            recorder: None,
        }
    }

    pub fn with_recorder(mut self, recorder: Box<dyn MacroRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn set_recorder(&mut self, recorder: Option<Box<dyn MacroRecorder>>) -> Option<Box<dyn MacroRecorder>> {
        std::mem::replace(&mut self.recorder, recorder)
    }

    pub fn recorder_mut(&mut self) -> Option<&mut (dyn MacroRecorder + 'static)> {
        self.recorder.as_deref_mut()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EditorConfig) {
        self.config = config;
    }

    pub fn frontend(&self) -> &dyn Frontend {
        self.frontend.as_ref()
    }

    pub fn frontend_mut(&mut self) -> &mut dyn Frontend {
        self.frontend.as_mut()
    }

    /// Run one top-level action against `document`
    pub fn perform_action(
        &mut self,
        factory: &dyn ActionFactory,
        mut document: Option<&mut Document>,
        params: &mut ActionParams,
        options: PerformOptions,
    ) -> ActionResult<PerformOutcome> {
        if factory.requires_buffer() && document.is_none() {
            return Err(ActionError::precondition(format!(
                "'{}' needs an open document",
                factory.name()
            )));
        }

        if !factory.pre_action_setup(document.as_deref()) {
            log::debug!("'{}' aborted by pre-action setup", factory.name());
            return Ok(PerformOutcome::cancelled());
        }

        let edges = self.config.crossfade.effective_edges();
        let mut detached = MemorySound::detached();
        let mut ctx = match document.as_deref() {
            Some(doc) => doc.action_context(edges),
            None => ActionContext::whole(&detached),
        };

        if !options.params_already_set && options.show_dialogs {
            let dialogs = [factory.channel_dialog(), factory.param_dialog()];
            for dialog in dialogs.into_iter().flatten() {
                if !dialog.show(&mut ctx, params) {
                    log::debug!("'{}' cancelled in dialog", factory.name());
                    return Ok(PerformOutcome::cancelled());
                }
            }
        }

        let sound: &dyn SoundBuffer = match document.as_deref() {
            Some(doc) => doc.sound(),
            None => &detached,
        };
        let edit = match factory.manufacture(sound, &ctx, params) {
            Ok(Some(edit)) => edit,
            Ok(None) => {
                log::debug!("'{}' cancelled by its factory", factory.name());
                return Ok(PerformOutcome::cancelled());
            }
            Err(err) => return self.report_failure(factory.name(), err),
        };
        let mut action = wrap(factory, &self.config, &ctx, edit);

        let mut registered = false;
        if let Some(recorder) = self.recorder.as_deref_mut() {
            if recorder.is_recording() {
                if !recorder.push_action(factory.name(), params, document.as_deref()) {
                    log::debug!("'{}' refused by the macro recorder", factory.name());
                    return Ok(PerformOutcome::cancelled());
                }
                registered = true;
            }
        }

        action.set_view_state(self.frontend.view_state(document.as_deref()));

        let prepare_for_undo = self.config.undo_limit > 0;
        let result = {
            let mut progress = self.frontend.begin_progress(factory.name());
            let mut run = EditRun::new(&self.config, progress.as_mut());
            let sound: &mut dyn SoundBuffer = match document.as_deref_mut() {
                Some(doc) => doc.sound_mut(),
                None => &mut detached,
            };
            action.execute(sound, &mut ctx, &mut run, prepare_for_undo)
        };

        let outcome = match result {
            Ok(()) => {
                if let Some(doc) = document.as_deref_mut() {
                    doc.commit_context(&ctx);
                }
                let went_on_undo_stack = self.file_action(action, document.as_deref_mut(), prepare_for_undo);
                Ok(PerformOutcome {
                    status: PerformStatus::Success,
                    went_on_undo_stack,
                })
            }
            Err(err) => {
                if registered {
                    if let Some(recorder) = self.recorder.as_deref_mut() {
                        recorder.pop_action(factory.name());
                    }
                }
                self.report_failure(factory.name(), err)
            }
        };

        self.frontend.document_changed(document.as_deref());
        outcome
    }

    /// Push a completed action to the history or drop it, warning if the
    /// edit cannot be undone
    fn file_action(&mut self, action: Action, document: Option<&mut Document>, prepare_for_undo: bool) -> bool {
        match action.undoable() {
            Undoable::Yes => match document {
                Some(doc) if prepare_for_undo => doc.history_mut().push(action),
                _ => false,
            },
            Undoable::No => {
                self.frontend.notify(Notification::warning(
                    NotificationCategory::Edit,
                    format!("'{}' cannot be undone", action.name()),
                ));
                false
            }
            Undoable::NotApplicable => {
                log::debug!("'{}' has nothing to undo", action.name());
                false
            }
        }
    }

    /// Turn an error into a failed outcome, showing it unless it is silent
    fn report_failure(&mut self, name: &str, err: ActionError) -> ActionResult<PerformOutcome> {
        match err {
            ActionError::Precondition(_) => {
                self.frontend.hide_dialogs();
                Err(err)
            }
            ActionError::Cancelled => Ok(PerformOutcome::cancelled()),
            other => {
                let reason = match other {
                    ActionError::User(message) | ActionError::Unexpected(message) => message,
                    _ => String::new(),
                };
                if !reason.is_empty() {
                    self.frontend.notify(Notification::error(
                        NotificationCategory::Edit,
                        format!("{}: {}", name, reason),
                    ));
                }
                self.frontend.hide_dialogs();
                Ok(PerformOutcome::failed(reason))
            }
        }
    }

    /// Undo the most recent action of `document`
    pub fn undo(&mut self, document: &mut Document) -> ActionResult<UndoOutcome> {
        let Some(mut action) = document.history_mut().pop() else {
            return Ok(UndoOutcome::NothingToUndo);
        };
        let name = action.name().to_string();

        let mut ctx = document.action_context(CrossfadeEdges::None);
        let result = {
            let mut progress = self.frontend.begin_progress(&name);
            let mut run = EditRun::new(&self.config, progress.as_mut());
            action.undo(document.sound_mut(), &mut ctx, &mut run)
        };

        let result = match result {
            Ok(()) => {
                document.commit_context(&ctx);
                Ok(())
            }
            Err(err) => {
                // Still done and still holding its backups, so it can be tried again
                if action.state() == ActionState::Done {
                    document.history_mut().push(action);
                }
                Err(err)
            }
        };

        let outcome = match result {
            Ok(()) => Ok(UndoOutcome::Undone(name)),
            Err(err) if err.is_precondition() => Err(err),
            Err(ActionError::Cancelled) => {
                log::warn!("undo of '{}' cancelled", name);
                Ok(UndoOutcome::Failed(String::new()))
            }
            Err(err) => {
                let reason = err.to_string();
                self.frontend.notify(Notification::error(
                    NotificationCategory::Undo,
                    format!("Cannot undo '{}': {}", name, reason),
                ));
                Ok(UndoOutcome::Failed(reason))
            }
        };

        self.frontend.document_changed(Some(document));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ParamDialog;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use crate::messaging::{NotificationFrontend, NotificationLevel, create_notification_channel};
    use crate::sound::{ChannelMask, MemorySound};
    use ringbuf::traits::Consumer;

    /// Writes a constant over the selection
    struct Fill {
        value: f32,
        undoable: Undoable,
        fail_with: Option<ActionError>,
        fail_undo: Arc<Mutex<bool>>,
        saved: Vec<(usize, Vec<f32>)>,
        start: usize,
    }

    impl Edit for Fill {
        fn apply_forward(
            &mut self,
            sound: &mut dyn SoundBuffer,
            ctx: &mut ActionContext,
            _run: &mut EditRun<'_>,
            _prepare_for_undo: bool,
        ) -> ActionResult<()> {
            if let Some(err) = self.fail_with.clone() {
                return Err(err);
            }
            self.start = ctx.start;
            for channel in ctx.channels.iter() {
                let mut data = vec![0.0; ctx.selection_length()];
                sound.read(channel, ctx.start, &mut data);
                sound.write(channel, ctx.start, &vec![self.value; data.len()]);
                self.saved.push((channel, data));
            }
            Ok(())
        }

        fn apply_backward(
            &mut self,
            sound: &mut dyn SoundBuffer,
            _ctx: &mut ActionContext,
            _run: &mut EditRun<'_>,
        ) -> ActionResult<()> {
            if *self.fail_undo.lock() {
                return Err(ActionError::unexpected("backup lost"));
            }
            for (channel, data) in self.saved.drain(..) {
                sound.write(channel, self.start, &data);
            }
            Ok(())
        }

        fn query_undoable(&self, _ctx: &ActionContext) -> Undoable {
            self.undoable
        }
    }

    struct FillFactory {
        undoable: Undoable,
        fail_with: Option<ActionError>,
        fail_undo: Arc<Mutex<bool>>,
        requires_buffer: bool,
        dialog: Option<Box<dyn ParamDialog>>,
    }

    impl FillFactory {
        fn new() -> Self {
            Self {
                undoable: Undoable::Yes,
                fail_with: None,
                fail_undo: Arc::new(Mutex::new(false)),
                requires_buffer: true,
                dialog: None,
            }
        }
    }

    impl ActionFactory for FillFactory {
        fn name(&self) -> &str {
            "Fill"
        }

        fn requires_buffer(&self) -> bool {
            self.requires_buffer
        }

        fn will_resize(&self) -> bool {
            false
        }

        fn param_dialog(&self) -> Option<&dyn ParamDialog> {
            self.dialog.as_deref()
        }

        fn manufacture(
            &self,
            _sound: &dyn SoundBuffer,
            _ctx: &ActionContext,
            params: &ActionParams,
        ) -> ActionResult<Option<Box<dyn Edit>>> {
            if params.flag("refuse") {
                return Ok(None);
            }
            Ok(Some(Box::new(Fill {
                value: params.float_or("value", 0.5)? as f32,
                undoable: self.undoable,
                fail_with: self.fail_with.clone(),
                fail_undo: Arc::clone(&self.fail_undo),
                saved: Vec::new(),
                start: 0,
            })))
        }
    }

    fn engine() -> (ActionEngine, crate::messaging::NotificationConsumer) {
        let (tx, rx) = create_notification_channel(16);
        let engine = ActionEngine::new(EditorConfig::default(), Box::new(NotificationFrontend::new(tx)));
        (engine, rx)
    }

    fn document() -> Document {
        let mut doc = Document::new("test", Box::new(MemorySound::new(1, 100, 1000)));
        doc.set_selection(10, 19);
        doc
    }

    #[test]
    fn test_perform_and_undo() {
        let (mut engine, mut rx) = engine();
        let mut doc = document();

        let outcome = engine
            .perform_action(&FillFactory::new(), Some(&mut doc), &mut ActionParams::new(), PerformOptions::default())
            .unwrap();
        assert!(outcome.succeeded());
        assert!(outcome.went_on_undo_stack);
        assert_eq!(doc.sound().sample(0, 15), 0.5);
        assert_eq!(doc.history().undo_description(), Some("Fill"));

        assert_eq!(engine.undo(&mut doc).unwrap(), UndoOutcome::Undone("Fill".into()));
        assert_eq!(doc.sound().sample(0, 15), 0.0);
        assert_eq!(engine.undo(&mut doc).unwrap(), UndoOutcome::NothingToUndo);
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_failed_undo_stays_on_history() {
        let (mut engine, mut rx) = engine();
        let mut doc = document();
        let factory = FillFactory::new();

        engine
            .perform_action(&factory, Some(&mut doc), &mut ActionParams::new(), PerformOptions::default())
            .unwrap();
        *factory.fail_undo.lock() = true;
        assert!(matches!(engine.undo(&mut doc).unwrap(), UndoOutcome::Failed(_)));
        assert_eq!(doc.history().len(), 1);
        assert_eq!(doc.sound().sample(0, 15), 0.5);
        assert_eq!(doc.selection(), (10, 19));
        let shown = rx.try_pop().unwrap();
        assert_eq!(shown.category, NotificationCategory::Undo);

        *factory.fail_undo.lock() = false;
        assert_eq!(engine.undo(&mut doc).unwrap(), UndoOutcome::Undone("Fill".into()));
        assert_eq!(doc.sound().sample(0, 15), 0.0);
        assert!(doc.history().is_empty());
    }

    #[test]
    fn test_not_undoable_warns_once() {
        let (mut engine, mut rx) = engine();
        let mut doc = document();
        let mut factory = FillFactory::new();
        factory.undoable = Undoable::No;

        let outcome = engine
            .perform_action(&factory, Some(&mut doc), &mut ActionParams::new(), PerformOptions::default())
            .unwrap();
        assert!(outcome.succeeded());
        assert!(!outcome.went_on_undo_stack);
        assert!(doc.history().is_empty());
        assert_eq!(doc.sound().sample(0, 15), 0.5);

        let warning = rx.try_pop().unwrap();
        assert_eq!(warning.level, NotificationLevel::Warning);
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_missing_document_is_precondition_error() {
        let (mut engine, _rx) = engine();
        let err = engine
            .perform_action(&FillFactory::new(), None, &mut ActionParams::new(), PerformOptions::default())
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn test_no_buffer_needed() {
        let (mut engine, _rx) = engine();
        let mut factory = FillFactory::new();
        factory.requires_buffer = false;
        factory.undoable = Undoable::NotApplicable;

        let outcome = engine
            .perform_action(&factory, None, &mut ActionParams::new(), PerformOptions::default())
            .unwrap();
        assert!(outcome.succeeded());
        assert!(!outcome.went_on_undo_stack);
    }

    #[test]
    fn test_user_error_is_shown_and_contained() {
        let (mut engine, mut rx) = engine();
        let mut doc = document();
        let mut factory = FillFactory::new();
        factory.fail_with = Some(ActionError::user("selection too short"));

        let outcome = engine
            .perform_action(&factory, Some(&mut doc), &mut ActionParams::new(), PerformOptions::default())
            .unwrap();
        assert_eq!(outcome.status, PerformStatus::Failed("selection too short".into()));
        assert_eq!(rx.try_pop().unwrap().level, NotificationLevel::Error);
        assert_eq!(doc.sound().sample(0, 15), 0.0);
        assert!(doc.history().is_empty());
    }

    #[test]
    fn test_empty_message_fails_silently() {
        let (mut engine, mut rx) = engine();
        let mut doc = document();
        let mut factory = FillFactory::new();
        factory.fail_with = Some(ActionError::user(""));

        let outcome = engine
            .perform_action(&factory, Some(&mut doc), &mut ActionParams::new(), PerformOptions::default())
            .unwrap();
        assert_eq!(outcome.status, PerformStatus::Failed(String::new()));
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_dialog_cancel_and_factory_cancel() {
        let (mut engine, _rx) = engine();
        let mut doc = document();
        let mut factory = FillFactory::new();
        factory.dialog = Some(Box::new(|_: &mut ActionContext, _: &mut ActionParams| false));

        let outcome = engine
            .perform_action(&factory, Some(&mut doc), &mut ActionParams::new(), PerformOptions::default())
            .unwrap();
        assert_eq!(outcome.status, PerformStatus::Cancelled);

        // Parameters already supplied: the dialog is skipped
        let outcome = engine
            .perform_action(&factory, Some(&mut doc), &mut ActionParams::new(), PerformOptions::with_params())
            .unwrap();
        assert!(outcome.succeeded());

        let mut params = ActionParams::new().with("refuse", true);
        let outcome = engine
            .perform_action(&FillFactory::new(), Some(&mut doc), &mut params, PerformOptions::with_params())
            .unwrap();
        assert_eq!(outcome.status, PerformStatus::Cancelled);
        assert_eq!(doc.history().len(), 1);
    }

    #[test]
    fn test_dialog_sets_parameters() {
        let (mut engine, _rx) = engine();
        let mut doc = document();
        let mut factory = FillFactory::new();
        factory.dialog = Some(Box::new(|ctx: &mut ActionContext, params: &mut ActionParams| {
            params.set("value", 0.25);
            ctx.set_selection(0, 4);
            true
        }));

        engine
            .perform_action(&factory, Some(&mut doc), &mut ActionParams::new(), PerformOptions::default())
            .unwrap();
        assert_eq!(doc.sound().sample(0, 2), 0.25);
        assert_eq!(doc.sound().sample(0, 15), 0.0);
    }

    /// Recorder logging every call
    struct Spy {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl MacroRecorder for Spy {
        fn is_recording(&self) -> bool {
            true
        }

        fn push_action(&mut self, name: &str, _params: &ActionParams, _document: Option<&Document>) -> bool {
            self.calls.lock().push(format!("push {}", name));
            true
        }

        fn pop_action(&mut self, name: &str) {
            self.calls.lock().push(format!("pop {}", name));
        }
    }

    #[test]
    fn test_recorder_registration_rolled_back_on_failure() {
        let (tx, _rx) = create_notification_channel(16);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut engine = ActionEngine::new(EditorConfig::default(), Box::new(NotificationFrontend::new(tx)))
            .with_recorder(Box::new(Spy { calls: Arc::clone(&calls) }));
        let mut doc = document();

        engine
            .perform_action(&FillFactory::new(), Some(&mut doc), &mut ActionParams::new(), PerformOptions::default())
            .unwrap();
        let mut failing = FillFactory::new();
        failing.fail_with = Some(ActionError::unexpected("disk full"));
        let outcome = engine
            .perform_action(&failing, Some(&mut doc), &mut ActionParams::new(), PerformOptions::default())
            .unwrap();
        assert_eq!(outcome.status, PerformStatus::Failed("disk full".into()));

        assert_eq!(*calls.lock(), vec!["push Fill", "push Fill", "pop Fill"]);
    }

    #[test]
    fn test_undo_disabled() {
        let (tx, _rx) = create_notification_channel(16);
        let config = EditorConfig {
            undo_limit: 0,
            ..EditorConfig::default()
        };
        let mut engine = ActionEngine::new(config, Box::new(NotificationFrontend::new(tx)));
        let mut doc = document();

        let outcome = engine
            .perform_action(&FillFactory::new(), Some(&mut doc), &mut ActionParams::new(), PerformOptions::default())
            .unwrap();
        assert!(outcome.succeeded());
        assert!(!outcome.went_on_undo_stack);
        assert!(doc.history().is_empty());
    }

    #[test]
    fn test_selection_committed() {
        let (mut engine, _rx) = engine();
        let mut doc = document();
        doc.set_active_channels(ChannelMask::single(0));
        engine
            .perform_action(&FillFactory::new(), Some(&mut doc), &mut ActionParams::new(), PerformOptions::default())
            .unwrap();
        assert_eq!(doc.selection(), (10, 19));
    }
}

// Action - One executed (or executable) edit and everything needed to undo it
//
// Wraps an Edit with the bookkeeping every edit needs: the size-aware lock,
// selection/cue/routing snapshots, clamping after each mutation and the
// crossfade passes around the edit.

use crate::action::context::ActionContext;
use crate::action::crossfade::Crossfader;
use crate::action::edit::{Edit, EditRun, Undoable};
use crate::action::error::{ActionError, ActionResult};
use crate::config::CrossfadeEdges;
use crate::messaging::ViewState;
use crate::sound::{CueSnapshot, LockKind, OutputRouting, SizeLock, SoundBuffer};

/// Lifecycle of an Action
///
/// `Fresh -> Done` on a successful execute, `Done -> Undone` on undo, and
/// `Undone -> Done` when the caller runs the forward path again. A failed
/// execute leaves the state unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Fresh,
    Done,
    Undone,
}

/// What the action saw before its last forward pass
struct Snapshot {
    selection: ActionContext,
    channel_count: usize,
    cues: CueSnapshot,
    routing: Option<OutputRouting>,
}

pub struct Action {
    name: String,
    edit: Box<dyn Edit>,
    will_resize: bool,
    crossfader: Crossfader,
    state: ActionState,
    prepared_for_undo: bool,
    snapshot: Option<Snapshot>,
    /// Context as the edit left it, before crossfading moved it
    edited: Option<ActionContext>,
    undoable: Undoable,
    view_state: ViewState,
}

impl Action {
    pub fn new(name: impl Into<String>, edit: Box<dyn Edit>, will_resize: bool, crossfader: Crossfader) -> Self {
        Self {
            name: name.into(),
            edit,
            will_resize,
            crossfader,
            state: ActionState::Fresh,
            prepared_for_undo: false,
            snapshot: None,
            edited: None,
            undoable: Undoable::NotApplicable,
            view_state: ViewState::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn will_resize(&self) -> bool {
        self.will_resize
    }

    pub fn prepared_for_undo(&self) -> bool {
        self.prepared_for_undo
    }

    /// Answer of the edit after the last successful execute
    pub fn undoable(&self) -> Undoable {
        self.undoable
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view_state
    }

    pub fn set_view_state(&mut self, view_state: ViewState) {
        self.view_state = view_state;
    }

    fn lock_kind(&self) -> LockKind {
        if self.will_resize {
            LockKind::Resize
        } else {
            LockKind::InPlace
        }
    }

    /// Only the outermost invocation takes the lock
    fn acquire(&self, sound: &dyn SoundBuffer, run: &EditRun<'_>) -> Option<SizeLock> {
        (!run.is_nested()).then(|| sound.lock(self.lock_kind()))
    }

    /// Run the edit forward
    ///
    /// `ctx` is only written back once everything succeeded. Cancellation and
    /// failures come back as errors with the sound untouched.
    pub fn execute(
        &mut self,
        sound: &mut dyn SoundBuffer,
        ctx: &mut ActionContext,
        run: &mut EditRun<'_>,
        prepare_for_undo: bool,
    ) -> ActionResult<()> {
        if self.state == ActionState::Done {
            return Err(ActionError::precondition(format!(
                "'{}' executed twice without undo",
                self.name
            )));
        }

        let lock = self.acquire(sound, run);
        let mut work = *ctx;
        let snapshot = Snapshot {
            selection: *ctx,
            channel_count: sound.channel_count(),
            cues: CueSnapshot::capture(sound),
            routing: sound.output_routing(),
        };

        if self.crossfader.edges() == CrossfadeEdges::Inner {
            let points = self.edit.resulting_crossfade_points(sound, &work)?;
            self.crossfader.prepare_inner(sound, points)?;
        }

        if let Err(err) = self.edit.apply_forward(sound, &mut work, run, prepare_for_undo) {
            self.crossfader.reset();
            log::debug!("'{}' forward pass failed: {}", self.name, err);
            return Err(err);
        }

        work.clamp(sound.len());
        self.edited = Some(work);
        self.crossfader.apply(sound, &mut work, prepare_for_undo);
        work.clamp(sound.len());

        sound.set_modified(true);
        let first = snapshot.selection.start.min(work.start);
        let last = if self.will_resize {
            sound.len().max(snapshot.selection.stop + 1).saturating_sub(1)
        } else {
            snapshot.selection.stop.max(work.stop)
        };
        sound.invalidate_peaks(first, last);

        self.undoable = self.edit.query_undoable(&work);
        self.prepared_for_undo = prepare_for_undo;
        self.snapshot = Some(snapshot);
        self.state = ActionState::Done;
        *ctx = work;

        drop(lock);
        sound.flush();
        Ok(())
    }

    /// Take the edit back
    ///
    /// Crossfades are removed first, then the edit restores its backup and
    /// the pre-execute selection, cues and routing come back.
    pub fn undo(&mut self, sound: &mut dyn SoundBuffer, ctx: &mut ActionContext, run: &mut EditRun<'_>) -> ActionResult<()> {
        if self.state != ActionState::Done {
            return Err(ActionError::precondition(format!(
                "'{}' undone while {:?}",
                self.name, self.state
            )));
        }
        if !self.prepared_for_undo {
            return Err(ActionError::precondition(format!(
                "'{}' was not prepared for undo",
                self.name
            )));
        }
        let (Some(snapshot), Some(edited)) = (self.snapshot.take(), self.edited.take()) else {
            return Err(ActionError::precondition(format!("'{}' has no saved state", self.name)));
        };

        let lock = self.acquire(sound, run);

        let cues = CueSnapshot::capture(sound);
        let undone = self.crossfader.uncrossfade(sound);
        let mut backward = edited;
        if let Err(err) = self.edit.apply_backward(sound, &mut backward, run) {
            // The edit left its own data alone, so the crossfades go back on
            // top and the action stays Done
            self.crossfader.recrossfade(sound, undone);
            cues.restore(sound);
            self.snapshot = Some(snapshot);
            self.edited = Some(edited);
            log::debug!("'{}' backward pass failed: {}", self.name, err);
            return Err(err);
        }
        drop(undone);

        if sound.channel_count() != snapshot.channel_count {
            log::warn!(
                "'{}' undo left {} channels, expected {}",
                self.name,
                sound.channel_count(),
                snapshot.channel_count
            );
        }
        snapshot.cues.restore(sound);
        if snapshot.routing.is_some() || sound.output_routing().is_some() {
            sound.set_output_routing(snapshot.routing.clone());
        }

        let mut restored = snapshot.selection;
        restored.clamp(sound.len());
        *ctx = restored;

        sound.set_modified(true);
        sound.invalidate_peaks(0, sound.len().saturating_sub(1));
        self.state = ActionState::Undone;

        drop(lock);
        sound.flush();
        Ok(())
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("will_resize", &self.will_resize)
            .field("prepared_for_undo", &self.prepared_for_undo)
            .field("undoable", &self.undoable)
            .finish()
    }
}

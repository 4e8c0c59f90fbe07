// Edit trait definition
//
// The capability every concrete edit implements. The engine (Action) wraps it
// with locking, selection/cue/routing save and restore, clamping and
// crossfading, so an edit only deals with its own samples and backups.

use crate::action::context::ActionContext;
use crate::action::error::ActionResult;
use crate::config::EditorConfig;
use crate::messaging::Progress;
use crate::sound::SoundBuffer;

/// Whether a completed edit can be undone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Undoable {
    Yes,
    /// Undo would make sense but is not implemented; the engine warns and drops
    No,
    /// Undo is meaningless for this edit (e.g. it needs no sound)
    NotApplicable,
}

/// Per-invocation environment shared by an action and its nested actions
pub struct EditRun<'a> {
    pub config: &'a EditorConfig,
    pub progress: &'a mut dyn Progress,
    depth: u32,
}

impl<'a> EditRun<'a> {
    /// Top-level run
    pub fn new(config: &'a EditorConfig, progress: &'a mut dyn Progress) -> Self {
        Self {
            config,
            progress,
            depth: 0,
        }
    }

    /// Run for an action invoked from inside another action
    pub fn nested(&mut self) -> EditRun<'_> {
        EditRun {
            config: self.config,
            progress: &mut *self.progress,
            depth: self.depth + 1,
        }
    }

    /// 0 for a top-level invocation
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_nested(&self) -> bool {
        self.depth > 0
    }

    /// Poll the progress collaborator; true means the user asked to abort
    pub fn should_abort(&mut self, position: u64) -> bool {
        self.progress.check(position)
    }
}

/// A destructive, possibly size-changing operation on a sound
///
/// # Example
/// ```no_run
/// use rewave::action::{ActionContext, ActionResult, Edit, EditRun, Undoable};
/// use rewave::sound::SoundBuffer;
///
/// struct Silence {
///     backup: Vec<(usize, Vec<f32>)>,
/// }
///
/// impl Edit for Silence {
///     fn apply_forward(
///         &mut self,
///         sound: &mut dyn SoundBuffer,
///         ctx: &mut ActionContext,
///         _run: &mut EditRun<'_>,
///         _prepare_for_undo: bool,
///     ) -> ActionResult<()> {
///         for channel in ctx.channels.iter() {
///             let mut data = vec![0.0; ctx.selection_length()];
///             sound.read(channel, ctx.start, &mut data);
///             sound.write(channel, ctx.start, &vec![0.0; data.len()]);
///             self.backup.push((channel, data));
///         }
///         Ok(())
///     }
///
///     fn apply_backward(
///         &mut self,
///         sound: &mut dyn SoundBuffer,
///         ctx: &mut ActionContext,
///         _run: &mut EditRun<'_>,
///     ) -> ActionResult<()> {
///         for (channel, data) in self.backup.drain(..) {
///             sound.write(channel, ctx.start, &data);
///         }
///         Ok(())
///     }
///
///     fn query_undoable(&self, _ctx: &ActionContext) -> Undoable {
///         Undoable::Yes
///     }
/// }
/// ```
pub trait Edit: Send {
    /// Perform the edit
    ///
    /// With `prepare_for_undo`, everything that gets overwritten or removed
    /// must be backed up first. Returning `Err(ActionError::Cancelled)` means
    /// the user aborted; any partial mutation must already be rolled back.
    fn apply_forward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        ctx: &mut ActionContext,
        run: &mut EditRun<'_>,
        prepare_for_undo: bool,
    ) -> ActionResult<()>;

    /// Restore exactly what `apply_forward` changed
    ///
    /// An error must leave the sound as `apply_forward` left it.
    fn apply_backward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        ctx: &mut ActionContext,
        run: &mut EditRun<'_>,
    ) -> ActionResult<()>;

    /// May depend on the final state of `ctx`
    fn query_undoable(&self, ctx: &ActionContext) -> Undoable;

    /// Where the edited data will start and end once the edit has run
    ///
    /// Returns `(start, end)` with `end` exclusive, so an edit that leaves a
    /// bare seam (delete) returns the same position twice. Needed before the
    /// edit for inner crossfades. Edits that cannot know return a user error.
    fn resulting_crossfade_points(
        &self,
        _sound: &dyn SoundBuffer,
        ctx: &ActionContext,
    ) -> ActionResult<(usize, usize)> {
        Ok((ctx.start, ctx.stop + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::NoProgress;

    struct CountingProgress {
        checks: usize,
        abort_at: usize,
    }

    impl Progress for CountingProgress {
        fn check(&mut self, _position: u64) -> bool {
            self.checks += 1;
            self.checks >= self.abort_at
        }
    }

    #[test]
    fn test_nested_depth() {
        let config = EditorConfig::default();
        let mut progress = NoProgress;
        let mut run = EditRun::new(&config, &mut progress);
        assert_eq!(run.depth(), 0);
        assert!(!run.is_nested());

        let mut child = run.nested();
        assert_eq!(child.depth(), 1);
        let grandchild = child.nested();
        assert_eq!(grandchild.depth(), 2);
        assert!(grandchild.is_nested());
    }

    #[test]
    fn test_nested_shares_progress() {
        let config = EditorConfig::default();
        let mut progress = CountingProgress { checks: 0, abort_at: 2 };
        {
            let mut run = EditRun::new(&config, &mut progress);
            assert!(!run.should_abort(0));
            let mut child = run.nested();
            assert!(child.should_abort(1));
        }
        assert_eq!(progress.checks, 2);
    }
}

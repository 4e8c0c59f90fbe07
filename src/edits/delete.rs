// Delete and Crop - Edits that only remove audio

use crate::action::{
    ActionContext, ActionError, ActionFactory, ActionParams, ActionResult, Edit, EditRun, MoveMode, RegionBackup,
    Undoable,
};
use crate::sound::SoundBuffer;

/// Remove the selection; the selection collapses onto the seam
#[derive(Debug, Default)]
pub struct DeleteEdit {
    backup: RegionBackup,
    position: usize,
}

impl DeleteEdit {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Edit for DeleteEdit {
    fn apply_forward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        ctx: &mut ActionContext,
        _run: &mut EditRun<'_>,
        prepare_for_undo: bool,
    ) -> ActionResult<()> {
        if sound.is_empty() {
            return Err(ActionError::user("Nothing to delete"));
        }
        self.position = ctx.start;
        self.backup
            .move_selection_to_scratch(sound, ctx, MoveMode::WholeSelection, 0, 0)?;
        if !prepare_for_undo {
            self.backup.release();
        }
        ctx.stop = ctx.start;
        Ok(())
    }

    fn apply_backward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        _ctx: &mut ActionContext,
        _run: &mut EditRun<'_>,
    ) -> ActionResult<()> {
        self.backup.restore_selection_from_scratch(sound, self.position, 0)
    }

    fn query_undoable(&self, _ctx: &ActionContext) -> Undoable {
        Undoable::Yes
    }

    fn resulting_crossfade_points(&self, _sound: &dyn SoundBuffer, ctx: &ActionContext) -> ActionResult<(usize, usize)> {
        Ok((ctx.start, ctx.start))
    }
}

pub struct DeleteFactory;

impl ActionFactory for DeleteFactory {
    fn name(&self) -> &str {
        "Delete"
    }

    fn will_resize(&self) -> bool {
        true
    }

    fn crossfade_applies(&self) -> bool {
        true
    }

    fn manufacture(
        &self,
        _sound: &dyn SoundBuffer,
        _ctx: &ActionContext,
        _params: &ActionParams,
    ) -> ActionResult<Option<Box<dyn Edit>>> {
        Ok(Some(Box::new(DeleteEdit::new())))
    }
}

/// Keep only the selection
#[derive(Debug, Default)]
pub struct CropEdit {
    backup: RegionBackup,
}

impl CropEdit {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Edit for CropEdit {
    fn apply_forward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        ctx: &mut ActionContext,
        _run: &mut EditRun<'_>,
        prepare_for_undo: bool,
    ) -> ActionResult<()> {
        if sound.is_empty() {
            return Err(ActionError::user("Nothing to crop"));
        }
        let kept = ctx.selection_length().min(sound.len() - ctx.start.min(sound.len()));
        self.backup
            .move_selection_to_scratch(sound, ctx, MoveMode::Complement, 0, 0)?;
        if !prepare_for_undo {
            self.backup.release();
        }
        ctx.set_selection(0, kept.saturating_sub(1));
        Ok(())
    }

    fn apply_backward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        _ctx: &mut ActionContext,
        _run: &mut EditRun<'_>,
    ) -> ActionResult<()> {
        self.backup.restore_selection_from_scratch(sound, 0, 0)
    }

    fn query_undoable(&self, _ctx: &ActionContext) -> Undoable {
        Undoable::Yes
    }
}

pub struct CropFactory;

impl ActionFactory for CropFactory {
    fn name(&self) -> &str {
        "Crop"
    }

    fn will_resize(&self) -> bool {
        true
    }

    fn manufacture(
        &self,
        _sound: &dyn SoundBuffer,
        _ctx: &ActionContext,
        _params: &ActionParams,
    ) -> ActionResult<Option<Box<dyn Edit>>> {
        Ok(Some(Box::new(CropEdit::new())))
    }
}

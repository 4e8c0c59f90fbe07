// Region move helper
//
// The primitive behind every size-changing or destructive edit: move a region
// of the sound into scratch storage, optionally leaving space of another size
// in its place, and put it back exactly on undo.
//
// Channels outside the context's mask keep their data. All channels share one
// length, so every space operation is given the total length the sound must
// end up with; restore passes the original total length back down so that
// silence padding cannot drift between channels.

use crate::action::context::ActionContext;
use crate::action::error::{ActionError, ActionResult};
use crate::sound::{ChannelMask, ScratchHandle, SoundBuffer};

/// Which part of the sound gets moved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMode {
    /// `[start, stop]`
    WholeSelection,
    /// `[0, len)`
    EntireBuffer,
    /// Everything before `start` and after `stop`, as two regions
    Complement,
}

#[derive(Debug, Clone, Copy)]
struct MoveRecord {
    mode: MoveMode,
    channels: ChannelMask,
    /// Where the moved region started
    position: usize,
    /// Samples removed from the sound (primary region)
    length: usize,
    /// Length of the secondary region (Complement only)
    secondary_length: usize,
    /// Space left in place of the moved region
    replacement_length: usize,
    /// Total sound length before the move
    original_length: usize,
    /// True when the mask covered every channel
    covers_all: bool,
}

/// Backup slots owned by one edit
///
/// Holds at most one primary and one secondary capture. The handles release
/// their scratch keys when the backup (and therefore the action) is dropped.
#[derive(Debug, Default)]
pub struct RegionBackup {
    primary: Option<ScratchHandle>,
    secondary: Option<ScratchHandle>,
    record: Option<MoveRecord>,
}

impl RegionBackup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the region described by `mode` to scratch storage
    ///
    /// `fudge` extra samples past the end of the region are copied into the
    /// backup (but not removed) for algorithms that read ahead.
    pub fn move_selection_to_scratch(
        &mut self,
        sound: &mut dyn SoundBuffer,
        ctx: &ActionContext,
        mode: MoveMode,
        replacement_length: usize,
        fudge: usize,
    ) -> ActionResult<()> {
        if self.primary.is_some() || self.secondary.is_some() {
            return Err(ActionError::precondition(
                "scratch slot already holds a backup for this action",
            ));
        }

        let channel_count = sound.channel_count();
        let channels = ctx.channels.limit(channel_count);
        let covers_all = channels.covers(channel_count);
        let total = sound.len();

        match mode {
            MoveMode::WholeSelection | MoveMode::EntireBuffer => {
                let (position, length) = if mode == MoveMode::EntireBuffer {
                    (0, total)
                } else {
                    let position = ctx.start.min(total);
                    (position, ctx.selection_length().min(total - position))
                };
                let fudge = fudge.min(total - position - length);

                let handle = sound.copy_to_scratch(channels, position, length + fudge);

                // Masked channels shrink; the others keep `total` until the
                // final length is known
                let after_remove = if covers_all { total - length } else { total };
                sound.remove_space(channels, position, length, after_remove);

                let shrunk = total - length + replacement_length;
                let final_length = if covers_all { shrunk } else { shrunk.max(total) };
                if replacement_length > 0 || final_length != sound.len() {
                    sound.add_space(channels, position, replacement_length, final_length);
                }

                log::trace!(
                    "moved {} samples at {} to {} ({:?}, replacement {}, fudge {})",
                    length,
                    position,
                    handle.key(),
                    mode,
                    replacement_length,
                    fudge
                );
                self.primary = Some(handle);
                self.record = Some(MoveRecord {
                    mode,
                    channels,
                    position,
                    length,
                    secondary_length: 0,
                    replacement_length,
                    original_length: total,
                    covers_all,
                });
            }
            MoveMode::Complement => {
                if replacement_length != 0 || fudge != 0 {
                    return Err(ActionError::precondition(
                        "complement moves take no replacement length and no fudge",
                    ));
                }
                let start = ctx.start.min(total);
                let after_start = (ctx.stop + 1).min(total);
                let after_length = total - after_start;

                let after = sound.copy_to_scratch(channels, after_start, after_length);
                let keep = if covers_all { total - after_length } else { total };
                sound.remove_space(channels, after_start, after_length, keep);

                let before = sound.copy_to_scratch(channels, 0, start);
                let keep = if covers_all { keep - start } else { total };
                sound.remove_space(channels, 0, start, keep);

                self.primary = Some(after);
                self.secondary = Some(before);
                self.record = Some(MoveRecord {
                    mode,
                    channels,
                    position: after_start,
                    length: after_length,
                    secondary_length: start,
                    replacement_length: 0,
                    original_length: total,
                    covers_all,
                });
            }
        }
        Ok(())
    }

    /// Undo `move_selection_to_scratch`
    ///
    /// `remove_length` samples at `remove_where` (the replacement space, or
    /// whatever the edit wrote there) are removed first, then the backed-up
    /// regions go back to their original positions.
    pub fn restore_selection_from_scratch(
        &mut self,
        sound: &mut dyn SoundBuffer,
        remove_where: usize,
        remove_length: usize,
    ) -> ActionResult<()> {
        let record = self
            .record
            .take()
            .ok_or_else(|| ActionError::precondition("nothing was moved to scratch"))?;
        let primary = self.primary.take();
        let secondary = self.secondary.take();
        let channels = record.channels;
        let original = record.original_length;

        if remove_length > 0 {
            let current = sound.len();
            let keep = if record.covers_all {
                current.saturating_sub(remove_length)
            } else {
                current
            };
            sound.remove_space(channels, remove_where, remove_length, keep);
        }

        match record.mode {
            MoveMode::WholeSelection | MoveMode::EntireBuffer => {
                let handle = primary
                    .ok_or_else(|| ActionError::precondition("primary scratch slot is empty"))?;
                // Truncating to the original length only drops silence padding
                sound.move_from_scratch(&handle, channels, record.position, record.length, original);
            }
            MoveMode::Complement => {
                let before = secondary
                    .ok_or_else(|| ActionError::precondition("secondary scratch slot is empty"))?;
                let after = primary
                    .ok_or_else(|| ActionError::precondition("primary scratch slot is empty"))?;

                let length = if record.covers_all {
                    sound.len() + record.secondary_length
                } else {
                    original
                };
                sound.move_from_scratch(&before, channels, 0, record.secondary_length, length);
                let length = if record.covers_all {
                    sound.len() + record.length
                } else {
                    original
                };
                sound.move_from_scratch(&after, channels, record.position, record.length, length);
            }
        }
        Ok(())
    }

    /// True while a capture is held
    pub fn is_captured(&self) -> bool {
        self.record.is_some()
    }

    pub fn mode(&self) -> Option<MoveMode> {
        self.record.map(|record| record.mode)
    }

    /// Backed-up region (the after-selection part in Complement mode)
    pub fn primary(&self) -> Option<&ScratchHandle> {
        self.primary.as_ref()
    }

    /// Before-selection part in Complement mode
    pub fn secondary(&self) -> Option<&ScratchHandle> {
        self.secondary.as_ref()
    }

    /// Samples removed from the sound by the move (excluding fudge)
    pub fn moved_length(&self) -> usize {
        self.record.map(|record| record.length).unwrap_or(0)
    }

    pub fn replacement_length(&self) -> usize {
        self.record.map(|record| record.replacement_length).unwrap_or(0)
    }

    /// Drop the backup without restoring it
    pub fn release(&mut self) {
        self.primary = None;
        self.secondary = None;
        self.record = None;
    }
}

// Gain - Scale the selected samples by a constant factor

use crate::action::{
    ActionContext, ActionError, ActionFactory, ActionParams, ActionResult, Edit, EditRun, MoveMode, RegionBackup,
    Undoable,
};
use crate::sound::{ChannelMask, MixSample, Sample, ScratchHandle, SoundBuffer, clip_sample};

/// Multiplies the selection by `factor`, clipping to full scale
///
/// The original samples are moved to scratch and the scaled result is
/// written into the space left behind, so undo is an exact restore.
#[derive(Debug)]
pub struct GainEdit {
    factor: f64,
    backup: RegionBackup,
    position: usize,
    length: usize,
}

impl GainEdit {
    pub fn new(factor: f64) -> Self {
        Self {
            factor,
            backup: RegionBackup::new(),
            position: 0,
            length: 0,
        }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Write the scaled backup into the sound; true if aborted
    fn write_scaled(
        &self,
        sound: &mut dyn SoundBuffer,
        source: &ScratchHandle,
        channels: ChannelMask,
        run: &mut EditRun<'_>,
    ) -> bool {
        let chunk = run.config.progress_chunk.max(1);
        let mut buffer: Vec<Sample> = vec![0.0; chunk];
        let mut done = 0;
        while done < self.length {
            if run.should_abort(done as u64) {
                return true;
            }
            let count = chunk.min(self.length - done);
            for channel in channels.iter() {
                let read = source.read(channel, done, &mut buffer[..count]);
                for value in &mut buffer[..read] {
                    *value = clip_sample(*value as MixSample * self.factor);
                }
                sound.write(channel, self.position + done, &buffer[..read]);
            }
            done += count;
        }
        false
    }
}

impl Edit for GainEdit {
    fn apply_forward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        ctx: &mut ActionContext,
        run: &mut EditRun<'_>,
        prepare_for_undo: bool,
    ) -> ActionResult<()> {
        let total = sound.len();
        self.position = ctx.start.min(total);
        self.length = ctx.selection_length().min(total - self.position);
        self.backup
            .move_selection_to_scratch(sound, ctx, MoveMode::WholeSelection, self.length, 0)?;

        let channels = ctx.channels.limit(sound.channel_count());
        let source = self
            .backup
            .primary()
            .ok_or_else(|| ActionError::precondition("gain backup is missing"))?;
        if self.write_scaled(sound, source, channels, run) {
            log::debug!("gain cancelled, restoring {} samples", self.length);
            self.backup
                .restore_selection_from_scratch(sound, self.position, self.length)?;
            return Err(ActionError::Cancelled);
        }

        if !prepare_for_undo {
            self.backup.release();
        }
        Ok(())
    }

    fn apply_backward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        _ctx: &mut ActionContext,
        _run: &mut EditRun<'_>,
    ) -> ActionResult<()> {
        self.backup
            .restore_selection_from_scratch(sound, self.position, self.length)
    }

    fn query_undoable(&self, _ctx: &ActionContext) -> Undoable {
        Undoable::Yes
    }
}

/// Parameters: `factor` (linear) or `db`
pub struct GainFactory;

impl ActionFactory for GainFactory {
    fn name(&self) -> &str {
        "Gain"
    }

    fn description(&self) -> &str {
        "Change the volume of the selection"
    }

    fn will_resize(&self) -> bool {
        false
    }

    fn crossfade_applies(&self) -> bool {
        true
    }

    fn manufacture(
        &self,
        _sound: &dyn SoundBuffer,
        _ctx: &ActionContext,
        params: &ActionParams,
    ) -> ActionResult<Option<Box<dyn Edit>>> {
        let factor = if params.contains("db") {
            10f64.powf(params.float("db")? / 20.0)
        } else {
            params.float("factor")?
        };
        if !factor.is_finite() || factor < 0.0 {
            return Err(ActionError::user(format!("Invalid gain factor {}", factor)));
        }
        Ok(Some(Box::new(GainEdit::new(factor))))
    }
}

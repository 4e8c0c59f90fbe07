// Change Rate and Resample - Edits that stretch audio in time
//
// Both read the original samples back from their scratch backup and write a
// linearly interpolated copy into the replacement space.

use crate::action::{
    ActionContext, ActionError, ActionFactory, ActionParams, ActionResult, Edit, EditRun, MoveMode, RegionBackup,
    Undoable,
};
use crate::edits::check_result_length;
use crate::sound::{ChannelMask, Sample, ScratchHandle, SoundBuffer};

/// Highest sample rate Resample accepts
pub const MAX_SAMPLE_RATE: u32 = 768_000;

/// Change Rate ratio bounds
pub const MIN_RATE_RATIO: f64 = 0.01;
pub const MAX_RATE_RATIO: f64 = 100.0;

/// Output samples produced from `length` input samples at `ratio`
fn stretched_length(length: usize, ratio: f64) -> usize {
    ((length as f64 / ratio).round() as usize).max(1)
}

/// Output samples a full sweep of the input would produce
fn covered_length(length: usize, ratio: f64) -> usize {
    (length as f64 / ratio).ceil() as usize
}

/// Interpolate `output` samples from `source` into the sound at `position`
///
/// Output sample `i` reads the source at `i * ratio`; positions past the
/// last source sample hold it. Returns true if the user aborted.
fn interpolate_into(
    sound: &mut dyn SoundBuffer,
    source: &ScratchHandle,
    channels: ChannelMask,
    position: usize,
    output: usize,
    ratio: f64,
    run: &mut EditRun<'_>,
) -> bool {
    let chunk = run.config.progress_chunk.max(1);
    let available = source.len();
    let mut window: Vec<Sample> = Vec::new();
    let mut out: Vec<Sample> = vec![0.0; chunk];
    let mut done = 0;
    while done < output {
        if run.should_abort(done as u64) {
            return true;
        }
        let count = chunk.min(output - done);
        // Never read past the source, whatever the ratio
        let first = ((done as f64 * ratio).floor() as usize).min(available.saturating_sub(1));
        let last = (((done + count) as f64 * ratio).floor() as usize)
            .saturating_add(2)
            .min(available)
            .max(first + 1);
        window.resize(last - first, 0.0);

        for channel in channels.iter() {
            let read = if available > 0 {
                source.read(channel, first, &mut window)
            } else {
                0
            };
            for (i, slot) in out[..count].iter_mut().enumerate() {
                let at = (done + i) as f64 * ratio;
                let index = at.floor() as usize;
                let frac = (at - at.floor()) as Sample;
                let offset = index.saturating_sub(first);
                *slot = match read {
                    0 => 0.0,
                    _ if offset + 1 < read => window[offset] + (window[offset + 1] - window[offset]) * frac,
                    _ => window[offset.min(read - 1)],
                };
            }
            sound.write(channel, position + done, &out[..count]);
        }
        done += count;
    }
    false
}

/// Speed the selection up (ratio > 1) or slow it down (ratio < 1)
///
/// Pitch changes along with the speed. One sample past the selection is read
/// ahead so the last output samples interpolate against real audio.
#[derive(Debug)]
pub struct ChangeRateEdit {
    ratio: f64,
    backup: RegionBackup,
    position: usize,
    output: usize,
}

impl ChangeRateEdit {
    pub fn new(ratio: f64) -> Self {
        Self {
            ratio,
            backup: RegionBackup::new(),
            position: 0,
            output: 0,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    fn output_length(&self, sound: &dyn SoundBuffer, ctx: &ActionContext) -> usize {
        let position = ctx.start.min(sound.len());
        let length = ctx.selection_length().min(sound.len() - position);
        stretched_length(length, self.ratio)
    }

    /// Length of the whole sound once the selection is stretched
    fn result_length(&self, sound: &dyn SoundBuffer, ctx: &ActionContext) -> usize {
        let position = ctx.start.min(sound.len());
        let length = ctx.selection_length().min(sound.len() - position);
        (sound.len() - length).saturating_add(self.output_length(sound, ctx))
    }
}

impl Edit for ChangeRateEdit {
    fn apply_forward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        ctx: &mut ActionContext,
        run: &mut EditRun<'_>,
        prepare_for_undo: bool,
    ) -> ActionResult<()> {
        if sound.is_empty() {
            return Err(ActionError::user("Nothing to change the rate of"));
        }
        self.position = ctx.start.min(sound.len());
        self.output = self.output_length(sound, ctx);
        check_result_length(self.result_length(sound, ctx))?;
        self.backup
            .move_selection_to_scratch(sound, ctx, MoveMode::WholeSelection, self.output, 1)?;
        let length = self.backup.moved_length();

        // The output length is rounded, so the tail of the source may not be
        // reached by the sweep
        let covered = covered_length(length, self.ratio);
        if covered != self.output {
            log::warn!(
                "rate change by {} would sweep {} samples, writing {}",
                self.ratio,
                covered,
                self.output
            );
        }

        let channels = ctx.channels.limit(sound.channel_count());
        let source = self
            .backup
            .primary()
            .ok_or_else(|| ActionError::precondition("rate change backup is missing"))?;
        if interpolate_into(sound, source, channels, self.position, self.output, self.ratio, run) {
            self.backup
                .restore_selection_from_scratch(sound, self.position, self.output)?;
            return Err(ActionError::Cancelled);
        }

        if !prepare_for_undo {
            self.backup.release();
        }
        ctx.set_selection(self.position, self.position + self.output - 1);
        Ok(())
    }

    fn apply_backward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        _ctx: &mut ActionContext,
        _run: &mut EditRun<'_>,
    ) -> ActionResult<()> {
        self.backup
            .restore_selection_from_scratch(sound, self.position, self.output)
    }

    fn query_undoable(&self, _ctx: &ActionContext) -> Undoable {
        Undoable::Yes
    }

    fn resulting_crossfade_points(&self, sound: &dyn SoundBuffer, ctx: &ActionContext) -> ActionResult<(usize, usize)> {
        let position = ctx.start.min(sound.len());
        Ok((position, position + self.output_length(sound, ctx)))
    }
}

/// Parameters: `ratio` (positive number)
pub struct ChangeRateFactory;

impl ActionFactory for ChangeRateFactory {
    fn name(&self) -> &str {
        "Change Rate"
    }

    fn description(&self) -> &str {
        "Change the speed and pitch of the selection"
    }

    fn will_resize(&self) -> bool {
        true
    }

    fn crossfade_applies(&self) -> bool {
        true
    }

    fn manufacture(
        &self,
        sound: &dyn SoundBuffer,
        ctx: &ActionContext,
        params: &ActionParams,
    ) -> ActionResult<Option<Box<dyn Edit>>> {
        let ratio = params.float("ratio")?;
        if !ratio.is_finite() || !(MIN_RATE_RATIO..=MAX_RATE_RATIO).contains(&ratio) {
            return Err(ActionError::user(format!(
                "Invalid rate ratio {}, expected {} to {}",
                ratio, MIN_RATE_RATIO, MAX_RATE_RATIO
            )));
        }
        let edit = ChangeRateEdit::new(ratio);
        check_result_length(edit.result_length(sound, ctx))?;
        Ok(Some(Box::new(edit)))
    }
}

/// Convert the whole sound to another sample rate
///
/// Every channel is rewritten and cue times are rescaled; the selection is
/// rescaled along with them.
#[derive(Debug)]
pub struct ResampleEdit {
    target_rate: u32,
    original_rate: u32,
    backup: RegionBackup,
    output: usize,
}

impl ResampleEdit {
    pub fn new(target_rate: u32) -> Self {
        Self {
            target_rate,
            original_rate: 0,
            backup: RegionBackup::new(),
            output: 0,
        }
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    fn rescale(&self, time: usize) -> usize {
        (time as f64 * self.target_rate as f64 / self.original_rate as f64).round() as usize
    }
}

impl Edit for ResampleEdit {
    fn apply_forward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        ctx: &mut ActionContext,
        run: &mut EditRun<'_>,
        prepare_for_undo: bool,
    ) -> ActionResult<()> {
        self.original_rate = sound.sample_rate();
        if self.original_rate == self.target_rate {
            return Err(ActionError::user(format!("The sound is already at {} Hz", self.target_rate)));
        }
        if sound.is_empty() {
            return Err(ActionError::user("Nothing to resample"));
        }

        let ratio = self.original_rate as f64 / self.target_rate as f64;
        let cue_times: Vec<usize> = sound.cues().iter().map(|cue| cue.time).collect();
        let whole = ActionContext::whole(sound);
        self.output = stretched_length(sound.len(), ratio);
        check_result_length(self.output)?;
        self.backup
            .move_selection_to_scratch(sound, &whole, MoveMode::EntireBuffer, self.output, 0)?;

        let source = self
            .backup
            .primary()
            .ok_or_else(|| ActionError::precondition("resample backup is missing"))?;
        if interpolate_into(sound, source, whole.channels, 0, self.output, ratio, run) {
            self.backup.restore_selection_from_scratch(sound, 0, self.output)?;
            return Err(ActionError::Cancelled);
        }
        if !prepare_for_undo {
            self.backup.release();
        }

        sound.set_sample_rate(self.target_rate);
        for (index, time) in cue_times.into_iter().enumerate() {
            sound.set_cue_time(index, self.rescale(time).min(self.output - 1));
        }
        let (start, stop) = ctx.selection();
        ctx.set_selection(self.rescale(start), self.rescale(stop));
        ctx.clamp(self.output);
        log::info!(
            "resampled {} Hz -> {} Hz ({} samples)",
            self.original_rate,
            self.target_rate,
            self.output
        );
        Ok(())
    }

    fn apply_backward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        _ctx: &mut ActionContext,
        _run: &mut EditRun<'_>,
    ) -> ActionResult<()> {
        self.backup.restore_selection_from_scratch(sound, 0, self.output)?;
        sound.set_sample_rate(self.original_rate);
        Ok(())
    }

    fn query_undoable(&self, _ctx: &ActionContext) -> Undoable {
        Undoable::Yes
    }
}

/// Parameters: `rate` (Hz)
pub struct ResampleFactory;

impl ActionFactory for ResampleFactory {
    fn name(&self) -> &str {
        "Resample"
    }

    fn description(&self) -> &str {
        "Convert the sound to another sample rate"
    }

    fn will_resize(&self) -> bool {
        true
    }

    fn manufacture(
        &self,
        _sound: &dyn SoundBuffer,
        _ctx: &ActionContext,
        params: &ActionParams,
    ) -> ActionResult<Option<Box<dyn Edit>>> {
        let rate = params.count("rate")?;
        if rate == 0 || rate > MAX_SAMPLE_RATE as usize {
            return Err(ActionError::user(format!("Unsupported sample rate {} Hz", rate)));
        }
        Ok(Some(Box::new(ResampleEdit::new(rate as u32))))
    }
}

// Insert Silence - Open a gap of silence at the selection start

use crate::action::{ActionContext, ActionError, ActionFactory, ActionParams, ActionResult, Edit, EditRun, Undoable};
use crate::edits::check_result_length;
use crate::sound::{ChannelMask, SoundBuffer, ms_to_samples};

#[derive(Debug)]
pub struct InsertSilenceEdit {
    length: usize,
    position: usize,
    channels: ChannelMask,
    original_length: usize,
}

impl InsertSilenceEdit {
    /// # Arguments
    /// * `length` - Samples of silence to insert, must be positive
    pub fn new(length: usize) -> Self {
        Self {
            length,
            position: 0,
            channels: ChannelMask::none(),
            original_length: 0,
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Edit for InsertSilenceEdit {
    fn apply_forward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        ctx: &mut ActionContext,
        _run: &mut EditRun<'_>,
        _prepare_for_undo: bool,
    ) -> ActionResult<()> {
        if self.length == 0 {
            return Err(ActionError::user("Silence length must be positive"));
        }
        check_result_length(sound.len().saturating_add(self.length))?;
        self.original_length = sound.len();
        self.position = ctx.start.min(self.original_length);
        self.channels = ctx.channels.limit(sound.channel_count());
        sound.add_space(self.channels, self.position, self.length, self.original_length + self.length);
        ctx.set_selection(self.position, self.position + self.length - 1);
        Ok(())
    }

    fn apply_backward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        _ctx: &mut ActionContext,
        _run: &mut EditRun<'_>,
    ) -> ActionResult<()> {
        sound.remove_space(self.channels, self.position, self.length, self.original_length);
        Ok(())
    }

    fn query_undoable(&self, _ctx: &ActionContext) -> Undoable {
        Undoable::Yes
    }

    fn resulting_crossfade_points(&self, sound: &dyn SoundBuffer, ctx: &ActionContext) -> ActionResult<(usize, usize)> {
        let position = ctx.start.min(sound.len());
        Ok((position, position + self.length))
    }
}

/// Parameters: `samples` (count) or `seconds` (number)
pub struct InsertSilenceFactory;

impl ActionFactory for InsertSilenceFactory {
    fn name(&self) -> &str {
        "Insert Silence"
    }

    fn description(&self) -> &str {
        "Insert silence at the start of the selection"
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
        _ctx: &ActionContext,
        params: &ActionParams,
    ) -> ActionResult<Option<Box<dyn Edit>>> {
        let length = if params.contains("samples") {
            params.count("samples")?
        } else {
            let seconds = params.float("seconds")?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(ActionError::user("Silence duration must be a positive number of seconds"));
            }
            ms_to_samples(seconds * 1000.0, sound.sample_rate())
        };
        if length == 0 {
            return Err(ActionError::user("Silence length must be positive"));
        }
        check_result_length(sound.len().saturating_add(length))?;
        Ok(Some(Box::new(InsertSilenceEdit::new(length))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrossfadeEdges, EditorConfig};
    use crate::messaging::NoProgress;
    use crate::sound::{Cue, MemorySound, Sample};

    fn ones(length: usize) -> Vec<Sample> {
        vec![1.0; length]
    }

    #[test]
    fn test_insert_and_undo() {
        let config = EditorConfig::default();
        let mut progress = NoProgress;
        let mut run = EditRun::new(&config, &mut progress);
        let mut sound = MemorySound::from_channels(vec![ones(50), ones(50)], 1000);
        sound.add_cue(Cue::new("after", 30, false));
        let mut ctx = ActionContext::new(ChannelMask::all(2), 20, 25, CrossfadeEdges::None);

        let mut edit = InsertSilenceEdit::new(10);
        edit.apply_forward(&mut sound, &mut ctx, &mut run, true).unwrap();
        assert_eq!(sound.len(), 60);
        assert_eq!(ctx.selection(), (20, 29));
        assert_eq!(sound.sample(0, 20), 0.0);
        assert_eq!(sound.sample(1, 29), 0.0);
        assert_eq!(sound.sample(1, 30), 1.0);
        assert_eq!(sound.cues()[0].time, 40);

        edit.apply_backward(&mut sound, &mut ctx, &mut run).unwrap();
        assert_eq!(sound.channel_data(0), ones(50).as_slice());
        assert_eq!(sound.channel_data(1), ones(50).as_slice());
    }

    #[test]
    fn test_partial_mask_pads_other_channels() {
        let config = EditorConfig::default();
        let mut progress = NoProgress;
        let mut run = EditRun::new(&config, &mut progress);
        let mut sound = MemorySound::from_channels(vec![ones(50), ones(50)], 1000);
        let mut ctx = ActionContext::new(ChannelMask::single(1), 10, 10, CrossfadeEdges::None);

        let mut edit = InsertSilenceEdit::new(5);
        edit.apply_forward(&mut sound, &mut ctx, &mut run, true).unwrap();
        assert_eq!(sound.len(), 55);
        assert_eq!(sound.sample(0, 12), 1.0);
        assert_eq!(sound.sample(0, 54), 0.0);
        assert_eq!(sound.sample(1, 12), 0.0);

        edit.apply_backward(&mut sound, &mut ctx, &mut run).unwrap();
        assert_eq!(sound.channel_data(0), ones(50).as_slice());
        assert_eq!(sound.channel_data(1), ones(50).as_slice());
    }

    #[test]
    fn test_factory_reads_seconds() {
        let sound = MemorySound::new(1, 10, 44100);
        let ctx = ActionContext::whole(&sound);
        let params = ActionParams::new().with("seconds", 0.5);
        assert!(InsertSilenceFactory.manufacture(&sound, &ctx, &params).unwrap().is_some());

        let zero = ActionParams::new().with("samples", 0i64);
        assert!(matches!(
            InsertSilenceFactory.manufacture(&sound, &ctx, &zero),
            Err(ActionError::User(_))
        ));

        let huge = ActionParams::new().with("samples", 1i64 << 40);
        assert!(matches!(
            InsertSilenceFactory.manufacture(&sound, &ctx, &huge),
            Err(ActionError::User(_))
        ));
    }
}

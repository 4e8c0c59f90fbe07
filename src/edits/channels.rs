// Add Channels and Remove Channels - Edits that change the channel layout

use crate::action::{ActionContext, ActionError, ActionFactory, ActionParams, ActionResult, Edit, EditRun, Undoable};
use crate::sound::{ChannelMask, MAX_CHANNELS, ScratchHandle, SoundBuffer};

/// Insert silent channels at index `at`
///
/// The new channels become the channel selection. Output routing entries for
/// them start unrouted; undo gets the previous routing back from the action
/// snapshot.
#[derive(Debug)]
pub struct AddChannelsEdit {
    at: usize,
    count: usize,
}

impl AddChannelsEdit {
    /// # Arguments
    /// * `at` - Index of the first new channel (clamped to the channel count)
    /// * `count` - Number of channels to add
    pub fn new(at: usize, count: usize) -> Self {
        Self { at, count }
    }
}

impl Edit for AddChannelsEdit {
    fn apply_forward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        ctx: &mut ActionContext,
        _run: &mut EditRun<'_>,
        _prepare_for_undo: bool,
    ) -> ActionResult<()> {
        let existing = sound.channel_count();
        if self.count == 0 {
            return Err(ActionError::user("No channels to add"));
        }
        if existing + self.count > MAX_CHANNELS {
            return Err(ActionError::user(format!(
                "A sound can have at most {} channels",
                MAX_CHANNELS
            )));
        }
        self.at = self.at.min(existing);
        sound.add_channels(self.at, self.count);
        ctx.channels = ChannelMask::from_channels(self.at..self.at + self.count);
        Ok(())
    }

    fn apply_backward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        _ctx: &mut ActionContext,
        _run: &mut EditRun<'_>,
    ) -> ActionResult<()> {
        sound.remove_channels(self.at, self.count);
        Ok(())
    }

    fn query_undoable(&self, _ctx: &ActionContext) -> Undoable {
        Undoable::Yes
    }
}

/// Parameters: `count` (default 1), `at` (default: after the last channel)
pub struct AddChannelsFactory;

impl ActionFactory for AddChannelsFactory {
    fn name(&self) -> &str {
        "Add Channels"
    }

    fn will_resize(&self) -> bool {
        true
    }

    fn manufacture(
        &self,
        sound: &dyn SoundBuffer,
        _ctx: &ActionContext,
        params: &ActionParams,
    ) -> ActionResult<Option<Box<dyn Edit>>> {
        let count = if params.contains("count") { params.count("count")? } else { 1 };
        let at = if params.contains("at") {
            params.count("at")?
        } else {
            sound.channel_count()
        };
        Ok(Some(Box::new(AddChannelsEdit::new(at, count))))
    }
}

/// Delete the selected channels
///
/// At least one channel must survive. The removed channels are copied to
/// scratch when undo is wanted and put back at their original indices.
#[derive(Debug, Default)]
pub struct RemoveChannelsEdit {
    channels: ChannelMask,
    removed: Option<ScratchHandle>,
    length: usize,
}

impl RemoveChannelsEdit {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Edit for RemoveChannelsEdit {
    fn apply_forward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        ctx: &mut ActionContext,
        _run: &mut EditRun<'_>,
        prepare_for_undo: bool,
    ) -> ActionResult<()> {
        let existing = sound.channel_count();
        let channels = ctx.channels.limit(existing);
        if channels.is_empty() {
            return Err(ActionError::user("No channel selected"));
        }
        if channels.covers(existing) {
            return Err(ActionError::user("Cannot remove every channel"));
        }

        self.channels = channels;
        self.length = sound.len();
        if prepare_for_undo {
            self.removed = Some(sound.copy_to_scratch(channels, 0, self.length));
        }
        let mut indices: Vec<usize> = channels.iter().collect();
        indices.reverse();
        for channel in indices {
            sound.remove_channels(channel, 1);
        }
        ctx.channels = sound.all_channels();
        Ok(())
    }

    fn apply_backward(
        &mut self,
        sound: &mut dyn SoundBuffer,
        _ctx: &mut ActionContext,
        _run: &mut EditRun<'_>,
    ) -> ActionResult<()> {
        let removed = self
            .removed
            .take()
            .ok_or_else(|| ActionError::precondition("removed channels were not backed up"))?;
        for channel in self.channels.iter() {
            sound.add_channels(channel, 1);
        }
        sound.copy_from_scratch(&removed, self.channels, 0, 0, self.length);
        Ok(())
    }

    fn query_undoable(&self, _ctx: &ActionContext) -> Undoable {
        Undoable::Yes
    }
}

pub struct RemoveChannelsFactory;

impl ActionFactory for RemoveChannelsFactory {
    fn name(&self) -> &str {
        "Remove Channels"
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
        Ok(Some(Box::new(RemoveChannelsEdit::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrossfadeEdges, EditorConfig};
    use crate::messaging::NoProgress;
    use crate::sound::{MemorySound, Sample};

    fn constant(value: Sample, length: usize) -> Vec<Sample> {
        vec![value; length]
    }

    fn three_channels() -> MemorySound {
        MemorySound::from_channels(vec![constant(0.1, 8), constant(0.2, 8), constant(0.3, 8)], 1000)
    }

    #[test]
    fn test_add_channels_round_trip() {
        let config = EditorConfig::default();
        let mut progress = NoProgress;
        let mut run = EditRun::new(&config, &mut progress);
        let mut sound = three_channels();
        let mut ctx = ActionContext::whole(&sound);

        let mut edit = AddChannelsEdit::new(1, 2);
        edit.apply_forward(&mut sound, &mut ctx, &mut run, true).unwrap();
        assert_eq!(sound.channel_count(), 5);
        assert_eq!(sound.channel_data(1), constant(0.0, 8).as_slice());
        assert_eq!(sound.channel_data(3), constant(0.2, 8).as_slice());
        assert_eq!(ctx.channels, ChannelMask::from_channels([1, 2]));

        edit.apply_backward(&mut sound, &mut ctx, &mut run).unwrap();
        assert_eq!(sound.channel_count(), 3);
        assert_eq!(sound.channel_data(1), constant(0.2, 8).as_slice());
    }

    #[test]
    fn test_add_channels_limit() {
        let config = EditorConfig::default();
        let mut progress = NoProgress;
        let mut run = EditRun::new(&config, &mut progress);
        let mut sound = MemorySound::new(MAX_CHANNELS, 4, 1000);
        let mut ctx = ActionContext::whole(&sound);
        let err = AddChannelsEdit::new(0, 1)
            .apply_forward(&mut sound, &mut ctx, &mut run, true)
            .unwrap_err();
        assert!(matches!(err, ActionError::User(_)));
    }

    #[test]
    fn test_remove_channels_round_trip() {
        let config = EditorConfig::default();
        let mut progress = NoProgress;
        let mut run = EditRun::new(&config, &mut progress);
        let mut sound = three_channels();
        let mut ctx = ActionContext::new(ChannelMask::from_channels([0, 2]), 0, 7, CrossfadeEdges::None);

        let mut edit = RemoveChannelsEdit::new();
        edit.apply_forward(&mut sound, &mut ctx, &mut run, true).unwrap();
        assert_eq!(sound.channel_count(), 1);
        assert_eq!(sound.channel_data(0), constant(0.2, 8).as_slice());
        assert_eq!(ctx.channels, ChannelMask::all(1));

        edit.apply_backward(&mut sound, &mut ctx, &mut run).unwrap();
        assert_eq!(sound.channel_count(), 3);
        assert_eq!(sound.channel_data(0), constant(0.1, 8).as_slice());
        assert_eq!(sound.channel_data(1), constant(0.2, 8).as_slice());
        assert_eq!(sound.channel_data(2), constant(0.3, 8).as_slice());
    }

    #[test]
    fn test_cannot_remove_every_channel() {
        let config = EditorConfig::default();
        let mut progress = NoProgress;
        let mut run = EditRun::new(&config, &mut progress);
        let mut sound = three_channels();
        let mut ctx = ActionContext::whole(&sound);
        let err = RemoveChannelsEdit::new()
            .apply_forward(&mut sound, &mut ctx, &mut run, true)
            .unwrap_err();
        assert!(matches!(err, ActionError::User(_)));
        assert_eq!(sound.channel_count(), 3);
    }
}

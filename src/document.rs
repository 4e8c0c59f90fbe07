// Document - A sound plus the editor state that travels with it

use crate::action::{ActionContext, UndoStack};
use crate::config::CrossfadeEdges;
use crate::sound::{ChannelMask, SoundBuffer};

pub struct Document {
    name: String,
    sound: Box<dyn SoundBuffer>,
    /// Inclusive selection
    start: usize,
    stop: usize,
    channels: ChannelMask,
    history: UndoStack,
}

impl Document {
    /// Whole sound selected, every channel active
    pub fn new(name: impl Into<String>, sound: Box<dyn SoundBuffer>) -> Self {
        let channels = sound.all_channels();
        let stop = sound.len().saturating_sub(1);
        Self {
            name: name.into(),
            sound,
            start: 0,
            stop,
            channels,
            history: UndoStack::new(),
        }
    }

    pub fn with_undo_limit(mut self, limit: usize) -> Self {
        self.history.set_limit(limit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sound(&self) -> &dyn SoundBuffer {
        self.sound.as_ref()
    }

    pub fn sound_mut(&mut self) -> &mut dyn SoundBuffer {
        self.sound.as_mut()
    }

    pub fn selection(&self) -> (usize, usize) {
        (self.start, self.stop)
    }

    /// Select `[start, stop]`, clamped to the sound
    pub fn set_selection(&mut self, start: usize, stop: usize) {
        let mut ctx = ActionContext::new(self.channels, start.min(stop), start.max(stop), CrossfadeEdges::None);
        ctx.clamp(self.sound.len());
        self.start = ctx.start;
        self.stop = ctx.stop;
    }

    pub fn select_all(&mut self) {
        self.set_selection(0, self.sound.len().saturating_sub(1));
    }

    pub fn active_channels(&self) -> ChannelMask {
        self.channels
    }

    pub fn set_active_channels(&mut self, channels: ChannelMask) {
        self.channels = channels.limit(self.sound.channel_count());
    }

    /// Fresh private context for one invocation
    pub fn action_context(&self, crossfade: CrossfadeEdges) -> ActionContext {
        ActionContext::new(self.channels, self.start, self.stop, crossfade)
    }

    /// Take over the selection an action finished with
    pub fn commit_context(&mut self, ctx: &ActionContext) {
        self.channels = ctx.channels.limit(self.sound.channel_count());
        self.set_selection(ctx.start, ctx.stop);
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut UndoStack {
        &mut self.history
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("length", &self.sound.len())
            .field("channels", &self.sound.channel_count())
            .field("selection", &self.selection())
            .field("history", &self.history)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::MemorySound;

    #[test]
    fn test_new_selects_everything() {
        let doc = Document::new("take 1", Box::new(MemorySound::new(2, 100, 44100)));
        assert_eq!(doc.selection(), (0, 99));
        assert_eq!(doc.active_channels(), ChannelMask::all(2));
        assert!(doc.history().is_empty());
    }

    #[test]
    fn test_selection_is_clamped() {
        let mut doc = Document::new("take 1", Box::new(MemorySound::new(1, 100, 44100)));
        doc.set_selection(90, 500);
        assert_eq!(doc.selection(), (90, 99));

        doc.set_selection(40, 10);
        assert_eq!(doc.selection(), (10, 40));
    }

    #[test]
    fn test_context_round_trip() {
        let mut doc = Document::new("take 1", Box::new(MemorySound::new(2, 100, 44100)));
        doc.set_selection(10, 20);
        doc.set_active_channels(ChannelMask::single(1));

        let mut ctx = doc.action_context(CrossfadeEdges::Outer);
        assert_eq!(ctx.crossfade, CrossfadeEdges::Outer);
        assert_eq!(ctx.channels, ChannelMask::single(1));

        ctx.set_selection(30, 40);
        doc.commit_context(&ctx);
        assert_eq!(doc.selection(), (30, 40));
    }

    #[test]
    fn test_active_channels_limited() {
        let mut doc = Document::new("take 1", Box::new(MemorySound::new(2, 10, 44100)));
        doc.set_active_channels(ChannelMask::from_channels([0, 5]));
        assert_eq!(doc.active_channels(), ChannelMask::single(0));
    }
}

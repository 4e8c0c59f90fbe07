// ActionContext - What an action operates on

use crate::config::CrossfadeEdges;
use crate::sound::{ChannelMask, SoundBuffer};

/// Channels, sample range and crossfade mode targeted by one invocation
///
/// The sound itself is passed next to the context. The engine threads a
/// private copy through the execution and commits it to the document only
/// once the action has succeeded, so edits may rewrite `start`/`stop` freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionContext {
    pub channels: ChannelMask,
    /// First selected sample (inclusive)
    pub start: usize,
    /// Last selected sample (inclusive)
    pub stop: usize,
    pub crossfade: CrossfadeEdges,
}

impl ActionContext {
    pub fn new(channels: ChannelMask, start: usize, stop: usize, crossfade: CrossfadeEdges) -> Self {
        Self {
            channels,
            start,
            stop,
            crossfade,
        }
    }

    /// Whole sound, every channel, no crossfade
    pub fn whole(sound: &dyn SoundBuffer) -> Self {
        Self::new(
            sound.all_channels(),
            0,
            sound.len().saturating_sub(1),
            CrossfadeEdges::None,
        )
    }

    /// Number of samples in `[start, stop]`
    pub fn selection_length(&self) -> usize {
        self.stop.saturating_sub(self.start) + 1
    }

    /// Enforce `start <= stop < length`; an empty sound collapses to 0/0
    pub fn clamp(&mut self, length: usize) {
        if length == 0 {
            self.start = 0;
            self.stop = 0;
            return;
        }
        self.stop = self.stop.min(length - 1);
        self.start = self.start.min(self.stop);
    }

    pub fn is_clamped(&self, length: usize) -> bool {
        self.start <= self.stop && (self.stop < length || (length == 0 && self.stop == 0))
    }

    pub fn selection(&self) -> (usize, usize) {
        (self.start, self.stop)
    }

    pub fn set_selection(&mut self, start: usize, stop: usize) {
        self.start = start;
        self.stop = stop;
    }
}

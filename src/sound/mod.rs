// Sound - The audio document contract consumed by the action engine
//
// The engine never touches sample storage directly. Everything goes through
// the SoundBuffer trait: per-channel sample access, space management, the
// scratch pool used for undo backups, cues, output routing and the
// size-aware lock.
//
// MemorySound is the in-process implementation used by the CLI and tests.
// A paged/disk-backed store only has to implement the required methods; the
// scratch helpers are provided on top of them.

pub mod cue;
pub mod lock;
pub mod memory;
pub mod scratch;
pub mod wav;

pub use cue::{Cue, CueSnapshot};
pub use lock::{LockKind, SizeLock};
pub use memory::MemorySound;
pub use scratch::{ScratchHandle, ScratchKey, ScratchPool, SharedScratchPool};

use serde::{Deserialize, Serialize};

/// Storage type of a single sample
pub type Sample = f32;

/// Intermediate type used for blend arithmetic
pub type MixSample = f64;

/// Largest representable sample magnitude
pub const MAX_SAMPLE: Sample = 1.0;

/// Maximum number of channels a sound (and a channel mask) can address
pub const MAX_CHANNELS: usize = 64;

/// Clip a wide intermediate value back into the valid sample range
#[inline]
pub fn clip_sample(value: MixSample) -> Sample {
    value.clamp(-(MAX_SAMPLE as MixSample), MAX_SAMPLE as MixSample) as Sample
}

/// Convert a duration in milliseconds to a whole number of samples
#[inline]
pub fn ms_to_samples(ms: f64, sample_rate: u32) -> usize {
    if ms <= 0.0 || !ms.is_finite() {
        return 0;
    }
    (ms * sample_rate as f64 / 1000.0) as usize
}

/// Set of channel indices, bounded by MAX_CHANNELS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChannelMask(u64);

impl ChannelMask {
    /// Mask with no channel selected
    pub const fn none() -> Self {
        Self(0)
    }

    /// Mask selecting channels `0..count`
    pub fn all(count: usize) -> Self {
        let count = count.min(MAX_CHANNELS);
        if count == MAX_CHANNELS {
            Self(u64::MAX)
        } else {
            Self((1u64 << count) - 1)
        }
    }

    /// Mask selecting a single channel
    pub fn single(channel: usize) -> Self {
        let mut mask = Self::none();
        mask.insert(channel);
        mask
    }

    pub fn from_channels<I: IntoIterator<Item = usize>>(channels: I) -> Self {
        let mut mask = Self::none();
        for channel in channels {
            mask.insert(channel);
        }
        mask
    }

    pub fn insert(&mut self, channel: usize) {
        if channel < MAX_CHANNELS {
            self.0 |= 1 << channel;
        }
    }

    pub fn remove(&mut self, channel: usize) {
        if channel < MAX_CHANNELS {
            self.0 &= !(1 << channel);
        }
    }

    pub fn contains(&self, channel: usize) -> bool {
        channel < MAX_CHANNELS && self.0 & (1 << channel) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn count(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Restrict the mask to channels that exist in a sound with `count` channels
    pub fn limit(self, count: usize) -> Self {
        Self(self.0 & Self::all(count).0)
    }

    /// True when every channel of a `count`-channel sound is selected
    pub fn covers(&self, count: usize) -> bool {
        self.limit(count) == Self::all(count)
    }

    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Selected channel indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_CHANNELS).filter(move |&channel| self.contains(channel))
    }
}

/// Mapping of sound channels to device outputs, present only while a
/// playback channel is attached to the sound
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRouting {
    /// `routes[channel]` is the device output the channel plays on
    pub routes: Vec<Option<usize>>,
}

impl OutputRouting {
    /// Route channel N to output N
    pub fn identity(channel_count: usize) -> Self {
        Self {
            routes: (0..channel_count).map(Some).collect(),
        }
    }
}

/// Accessor contract of an audio document
///
/// All channels of a sound share one length. Space operations take the
/// resulting total length (`max_length`) so that channels outside the mask
/// can be padded with silence or truncated to stay aligned.
pub trait SoundBuffer: Send {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn channel_count(&self) -> usize;

    fn sample_rate(&self) -> u32;

    fn set_sample_rate(&mut self, sample_rate: u32);

    fn all_channels(&self) -> ChannelMask {
        ChannelMask::all(self.channel_count())
    }

    fn sample(&self, channel: usize, position: usize) -> Sample;

    fn set_sample(&mut self, channel: usize, position: usize, value: Sample);

    /// Read up to `out.len()` samples, returning how many were available
    fn read(&self, channel: usize, position: usize, out: &mut [Sample]) -> usize {
        let available = self.len().saturating_sub(position).min(out.len());
        for (offset, slot) in out[..available].iter_mut().enumerate() {
            *slot = self.sample(channel, position + offset);
        }
        available
    }

    /// Overwrite samples starting at `position`, ignoring anything past the end
    fn write(&mut self, channel: usize, position: usize, data: &[Sample]) {
        let available = self.len().saturating_sub(position).min(data.len());
        for (offset, value) in data[..available].iter().enumerate() {
            self.set_sample(channel, position + offset, *value);
        }
    }

    /// Insert `length` samples of silence at `position` in the masked channels
    fn add_space(&mut self, channels: ChannelMask, position: usize, length: usize, max_length: usize);

    /// Remove `length` samples at `position` from the masked channels
    fn remove_space(&mut self, channels: ChannelMask, position: usize, length: usize, max_length: usize);

    /// Insert `count` silent channels before channel index `at`
    fn add_channels(&mut self, at: usize, count: usize);

    /// Remove `count` channels starting at channel index `at`
    fn remove_channels(&mut self, at: usize, count: usize);

    fn scratch_pool(&self) -> &SharedScratchPool;

    /// Back up a region of the masked channels without changing the sound
    fn copy_to_scratch(&self, channels: ChannelMask, position: usize, length: usize) -> ScratchHandle {
        let channels = channels.limit(self.channel_count());
        let length = length.min(self.len().saturating_sub(position));
        let data = channels
            .iter()
            .map(|channel| {
                let mut buffer = vec![0.0; length];
                self.read(channel, position, &mut buffer);
                (channel, buffer)
            })
            .collect();
        ScratchHandle::store(self.scratch_pool(), channels, length, data)
    }

    /// Back up a region of the masked channels and remove it from the sound
    fn move_to_scratch(
        &mut self,
        channels: ChannelMask,
        position: usize,
        length: usize,
        max_length: usize,
    ) -> ScratchHandle {
        let handle = self.copy_to_scratch(channels, position, length);
        self.remove_space(channels, position, handle.len(), max_length);
        handle
    }

    /// Insert the first `length` samples of a scratch region at `position`
    fn move_from_scratch(
        &mut self,
        handle: &ScratchHandle,
        channels: ChannelMask,
        position: usize,
        length: usize,
        max_length: usize,
    ) {
        let channels = channels.intersection(handle.channels());
        self.add_space(channels, position, length, max_length);
        self.copy_from_scratch(handle, channels, position, 0, length);
    }

    /// Overwrite the sound at `position` with scratch data starting at `offset`
    fn copy_from_scratch(
        &mut self,
        handle: &ScratchHandle,
        channels: ChannelMask,
        position: usize,
        offset: usize,
        length: usize,
    ) {
        let length = length.min(handle.len().saturating_sub(offset));
        let mut buffer = vec![0.0; length];
        for channel in channels.intersection(handle.channels()).iter() {
            let read = handle.read(channel, offset, &mut buffer);
            self.write(channel, position, &buffer[..read]);
        }
    }

    fn cues(&self) -> &[Cue];

    fn set_cues(&mut self, cues: Vec<Cue>);

    fn add_cue(&mut self, cue: Cue);

    fn remove_cue(&mut self, index: usize) -> Option<Cue>;

    fn set_cue_time(&mut self, index: usize, time: usize);

    /// Current routing, `None` when no playback channel is attached
    fn output_routing(&self) -> Option<OutputRouting>;

    fn set_output_routing(&mut self, routing: Option<OutputRouting>);

    /// Acquire the size-aware lock
    fn lock(&self, kind: LockKind) -> SizeLock;

    fn set_modified(&mut self, modified: bool);

    fn is_modified(&self) -> bool;

    /// Drop cached visual peak data for `[start, stop]`
    fn invalidate_peaks(&mut self, start: usize, stop: usize);

    /// Push pending changes to backing storage
    fn flush(&mut self) {}
}

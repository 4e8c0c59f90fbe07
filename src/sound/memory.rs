// MemorySound - SoundBuffer held entirely in memory

use crate::sound::cue::{self, Cue};
use crate::sound::lock::{LockKind, SizeLock};
use crate::sound::scratch::{ScratchPool, SharedScratchPool};
use crate::sound::{ChannelMask, OutputRouting, Sample, SoundBuffer};
use parking_lot::RwLock;
use std::sync::Arc;

/// Non-interleaved in-memory sound
pub struct MemorySound {
    channels: Vec<Vec<Sample>>,
    length: usize,
    sample_rate: u32,
    cues: Vec<Cue>,
    routing: Option<OutputRouting>,
    pool: SharedScratchPool,
    size_lock: Arc<RwLock<()>>,
    modified: bool,
    peak_invalidations: Vec<(usize, usize)>,
    flush_count: usize,
}

impl MemorySound {
    /// Silent sound of the given shape
    pub fn new(channel_count: usize, length: usize, sample_rate: u32) -> Self {
        Self::from_channels(vec![vec![0.0; length]; channel_count], sample_rate)
    }

    /// Build from per-channel data; shorter channels are padded with silence
    pub fn from_channels(mut channels: Vec<Vec<Sample>>, sample_rate: u32) -> Self {
        let length = channels.iter().map(Vec::len).max().unwrap_or(0);
        for channel in &mut channels {
            channel.resize(length, 0.0);
        }
        Self {
            channels,
            length,
            sample_rate,
            cues: Vec::new(),
            routing: None,
            pool: ScratchPool::shared(),
            size_lock: Arc::new(RwLock::new(())),
            modified: false,
            peak_invalidations: Vec::new(),
            flush_count: 0,
        }
    }

    /// Use a pool shared with other sounds instead of a private one
    pub fn with_pool(mut self, pool: SharedScratchPool) -> Self {
        self.pool = pool;
        self
    }

    /// Sound with no channels and no samples
    pub fn detached() -> Self {
        Self::from_channels(Vec::new(), 44100)
    }

    pub fn channel_data(&self, channel: usize) -> &[Sample] {
        self.channels.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Lock handle for readers such as a playback thread
    pub fn size_lock(&self) -> &Arc<RwLock<()>> {
        &self.size_lock
    }

    /// Ranges passed to invalidate_peaks since the last call to this method
    pub fn take_peak_invalidations(&mut self) -> Vec<(usize, usize)> {
        std::mem::take(&mut self.peak_invalidations)
    }

    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    /// Bring every channel to `max_length`
    fn normalize(&mut self, max_length: usize) {
        for channel in &mut self.channels {
            channel.resize(max_length, 0.0);
        }
        self.length = max_length;
    }
}

impl SoundBuffer for MemorySound {
    fn len(&self) -> usize {
        self.length
    }

    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    fn sample(&self, channel: usize, position: usize) -> Sample {
        self.channels
            .get(channel)
            .and_then(|data| data.get(position))
            .copied()
            .unwrap_or(0.0)
    }

    fn set_sample(&mut self, channel: usize, position: usize, value: Sample) {
        if let Some(slot) = self.channels.get_mut(channel).and_then(|data| data.get_mut(position)) {
            *slot = value;
        }
    }

    fn read(&self, channel: usize, position: usize, out: &mut [Sample]) -> usize {
        let data = self.channel_data(channel);
        if position >= data.len() {
            return 0;
        }
        let available = (data.len() - position).min(out.len());
        out[..available].copy_from_slice(&data[position..position + available]);
        available
    }

    fn write(&mut self, channel: usize, position: usize, data: &[Sample]) {
        let Some(target) = self.channels.get_mut(channel) else {
            return;
        };
        if position >= target.len() {
            return;
        }
        let available = (target.len() - position).min(data.len());
        target[position..position + available].copy_from_slice(&data[..available]);
    }

    fn add_space(&mut self, channels: ChannelMask, position: usize, length: usize, max_length: usize) {
        let channels = channels.limit(self.channel_count());
        for index in channels.iter() {
            let data = &mut self.channels[index];
            let at = position.min(data.len());
            data.splice(at..at, std::iter::repeat(0.0).take(length));
        }
        if channels.covers(self.channel_count()) {
            cue::shift_for_insert(&mut self.cues, position, length);
        }
        self.normalize(max_length);
    }

    fn remove_space(&mut self, channels: ChannelMask, position: usize, length: usize, max_length: usize) {
        let channels = channels.limit(self.channel_count());
        for index in channels.iter() {
            let data = &mut self.channels[index];
            let start = position.min(data.len());
            let end = (position + length).min(data.len());
            data.drain(start..end);
        }
        if channels.covers(self.channel_count()) {
            cue::shift_for_remove(&mut self.cues, position, length);
        }
        self.normalize(max_length);
    }

    fn add_channels(&mut self, at: usize, count: usize) {
        let at = at.min(self.channels.len());
        let silent = vec![vec![0.0; self.length]; count];
        self.channels.splice(at..at, silent);
        if let Some(routing) = &mut self.routing {
            let at = at.min(routing.routes.len());
            routing.routes.splice(at..at, std::iter::repeat(None).take(count));
        }
    }

    fn remove_channels(&mut self, at: usize, count: usize) {
        let start = at.min(self.channels.len());
        let end = (at + count).min(self.channels.len());
        self.channels.drain(start..end);
        if let Some(routing) = &mut self.routing {
            let start = start.min(routing.routes.len());
            let end = end.min(routing.routes.len());
            routing.routes.drain(start..end);
        }
        if self.channels.is_empty() {
            self.length = 0;
        }
    }

    fn scratch_pool(&self) -> &SharedScratchPool {
        &self.pool
    }

    fn cues(&self) -> &[Cue] {
        &self.cues
    }

    fn set_cues(&mut self, cues: Vec<Cue>) {
        self.cues = cues;
    }

    fn add_cue(&mut self, cue: Cue) {
        self.cues.push(cue);
    }

    fn remove_cue(&mut self, index: usize) -> Option<Cue> {
        (index < self.cues.len()).then(|| self.cues.remove(index))
    }

    fn set_cue_time(&mut self, index: usize, time: usize) {
        if let Some(cue) = self.cues.get_mut(index) {
            cue.time = time;
        }
    }

    fn output_routing(&self) -> Option<OutputRouting> {
        self.routing.clone()
    }

    fn set_output_routing(&mut self, routing: Option<OutputRouting>) {
        self.routing = routing;
    }

    fn lock(&self, kind: LockKind) -> SizeLock {
        SizeLock::acquire(&self.size_lock, kind)
    }

    fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn invalidate_peaks(&mut self, start: usize, stop: usize) {
        self.peak_invalidations.push((start, stop));
    }

    fn flush(&mut self) {
        self.flush_count += 1;
    }
}

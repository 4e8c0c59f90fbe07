// Crossfade engine
//
// Smooths the two edges of an edited region and keeps enough data around to
// take the smoothing back before the edit itself is undone.
//
// Inner mode blends the freshly written edges against the audio that sat at
// the same positions before the edit. Outer mode blends the windows on both
// sides of a seam into one window and drops the other half, shortening the
// sound at each edge that has room.

use crate::action::context::ActionContext;
use crate::action::error::{ActionError, ActionResult};
use crate::config::{CrossfadeConfig, CrossfadeEdges, FadeShape};
use crate::sound::{ChannelMask, MixSample, Sample, ScratchHandle, SoundBuffer, clip_sample, ms_to_samples};

/// Direction of the destination signal across a blend window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ramp {
    /// Destination rises from 0 to 1, the other signal falls
    FadeIn,
    /// Destination falls from 1 to 0, the other signal rises
    FadeOut,
}

/// Gains `(rise, fall)` at step `t` of an `width`-sample window
#[inline]
pub fn ramp_gains(t: usize, width: usize, shape: FadeShape) -> (MixSample, MixSample) {
    let rise = t as MixSample / (width - 1) as MixSample;
    let fall = 1.0 - rise;
    match shape {
        FadeShape::Linear => (rise, fall),
        FadeShape::Parabolic => (rise * rise, fall * fall),
    }
}

/// Blend `other` into `dest` in place
///
/// Windows of one sample or less are left untouched.
pub fn blend(dest: &mut [Sample], other: &[Sample], ramp: Ramp, shape: FadeShape) {
    let width = dest.len().min(other.len());
    if width <= 1 {
        return;
    }
    for t in 0..width {
        let (rise, fall) = ramp_gains(t, width, shape);
        let (dest_gain, other_gain) = match ramp {
            Ramp::FadeIn => (rise, fall),
            Ramp::FadeOut => (fall, rise),
        };
        let mixed = dest[t] as MixSample * dest_gain + other[t] as MixSample * other_gain;
        dest[t] = clip_sample(mixed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Start,
    Stop,
}

/// Pre-edit audio captured for an inner crossfade
struct PendingWindow {
    edge: Edge,
    position: usize,
    before: ScratchHandle,
}

/// Data needed to take one applied crossfade back
struct EdgeCapture {
    position: usize,
    /// Width of the region the crossfade left in the sound
    width: usize,
    /// Captured length is `width * multiplier`: 1 for inner, 2 for outer
    multiplier: usize,
    handle: ScratchHandle,
}

/// Per-action crossfade state
pub struct Crossfader {
    edges: CrossfadeEdges,
    start_ms: f64,
    stop_ms: f64,
    shape: FadeShape,
    pending: Vec<PendingWindow>,
    applied: Vec<EdgeCapture>,
}

impl Crossfader {
    pub fn new(config: &CrossfadeConfig, edges: CrossfadeEdges) -> Self {
        Self {
            edges,
            start_ms: config.start_ms,
            stop_ms: config.stop_ms,
            shape: config.shape,
            pending: Vec::new(),
            applied: Vec::new(),
        }
    }

    /// Crossfader that never touches the sound
    pub fn disabled() -> Self {
        Self::new(&CrossfadeConfig::default(), CrossfadeEdges::None)
    }

    pub fn edges(&self) -> CrossfadeEdges {
        self.edges
    }

    /// Number of applied crossfades that can be taken back
    pub fn captured_edges(&self) -> usize {
        self.applied.len()
    }

    /// Inner window widths for edited data spanning `[start, end)`
    ///
    /// The start window lies at `[start, start + n1)` and the stop window at
    /// `[end - n2, end)`. A window is empty at the very first or very last
    /// sample; overlapping windows are both cut to half the region.
    pub fn inner_window_widths(&self, sound: &dyn SoundBuffer, start: usize, end: usize) -> (usize, usize) {
        let length = sound.len();
        let rate = sound.sample_rate();
        let start = start.min(length);
        let end = end.clamp(start, length);

        let mut start_width = ms_to_samples(self.start_ms, rate).min(start).min(length - start);
        let mut stop_width = ms_to_samples(self.stop_ms, rate).min(end).min(length - end);

        let span = end - start;
        if span > 0 && start_width + stop_width > span {
            let half = span / 2;
            log::debug!(
                "crossfade windows {}+{} exceed region of {}, using {} each",
                start_width,
                stop_width,
                span,
                half
            );
            start_width = start_width.min(half);
            stop_width = stop_width.min(half);
        }
        (start_width, stop_width)
    }

    /// Capture the audio under the eventual inner windows, before the edit runs
    pub fn prepare_inner(&mut self, sound: &dyn SoundBuffer, points: (usize, usize)) -> ActionResult<()> {
        if !self.pending.is_empty() {
            return Err(ActionError::precondition("inner crossfade already prepared"));
        }
        let start = points.0.min(sound.len());
        let end = points.1.clamp(start, sound.len());
        let (start_width, stop_width) = self.inner_window_widths(sound, start, end);
        let all = sound.all_channels();

        if start_width > 1 {
            self.pending.push(PendingWindow {
                edge: Edge::Start,
                position: start,
                before: sound.copy_to_scratch(all, start, start_width),
            });
        }
        if stop_width > 1 {
            let position = end - stop_width;
            self.pending.push(PendingWindow {
                edge: Edge::Stop,
                position,
                before: sound.copy_to_scratch(all, position, stop_width),
            });
        }
        Ok(())
    }

    /// Drop anything captured by `prepare_inner` without applying it
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    /// Blend the edges of the edited region
    ///
    /// Outer crossfades move the selection in `ctx` along with the data.
    pub fn apply(&mut self, sound: &mut dyn SoundBuffer, ctx: &mut ActionContext, prepare_for_undo: bool) {
        match self.edges {
            CrossfadeEdges::None => {}
            CrossfadeEdges::Inner => self.apply_inner(sound, ctx.channels, prepare_for_undo),
            CrossfadeEdges::Outer => self.apply_outer(sound, ctx, prepare_for_undo),
        }
    }

    fn apply_inner(&mut self, sound: &mut dyn SoundBuffer, channels: ChannelMask, prepare_for_undo: bool) {
        for window in std::mem::take(&mut self.pending) {
            let width = window.before.len().min(sound.len().saturating_sub(window.position));
            if width <= 1 {
                continue;
            }
            if prepare_for_undo {
                // Post-edit, pre-blend values: undo puts these back first
                let handle = sound.copy_to_scratch(sound.all_channels(), window.position, width);
                self.applied.push(EdgeCapture {
                    position: window.position,
                    width,
                    multiplier: 1,
                    handle,
                });
            }
            let ramp = match window.edge {
                Edge::Start => Ramp::FadeIn,
                Edge::Stop => Ramp::FadeOut,
            };
            self.blend_region(sound, channels, window.position, width, &window.before, ramp);
        }
    }

    fn blend_region(
        &self,
        sound: &mut dyn SoundBuffer,
        channels: ChannelMask,
        position: usize,
        width: usize,
        before: &ScratchHandle,
        ramp: Ramp,
    ) {
        let mut dest = vec![0.0; width];
        let mut other = vec![0.0; width];
        for channel in 0..sound.channel_count() {
            if !before.channels().contains(channel) {
                continue;
            }
            sound.read(channel, position, &mut dest);
            before.read(channel, 0, &mut other);
            blend(&mut dest, &other, ramp, self.shape_for(channels, channel));
            sound.write(channel, position, &dest);
        }
    }

    /// Unselected channels are always blended linearly
    fn shape_for(&self, channels: ChannelMask, channel: usize) -> FadeShape {
        if channels.contains(channel) {
            self.shape
        } else {
            FadeShape::Linear
        }
    }

    fn apply_outer(&mut self, sound: &mut dyn SoundBuffer, ctx: &mut ActionContext, prepare_for_undo: bool) {
        let rate = sound.sample_rate();

        let seam = ctx.start;
        let width = ms_to_samples(self.start_ms, rate)
            .min(seam)
            .min(sound.len().saturating_sub(seam));
        if width > 0 {
            self.collapse_seam(sound, ctx.channels, seam, width, prepare_for_undo);
            ctx.start = seam - width;
            ctx.stop = ctx.stop.saturating_sub(width).max(ctx.start);
        } else {
            log::debug!("outer crossfade skipped at start edge {}", seam);
        }

        if ctx.start == ctx.stop {
            log::debug!("outer crossfade skipped at stop edge, nothing left selected");
            return;
        }

        let seam = ctx.stop + 1;
        let width = ms_to_samples(self.stop_ms, rate)
            .min(sound.len().saturating_sub(seam))
            .min(seam - ctx.start);
        if width > 0 {
            self.collapse_seam(sound, ctx.channels, seam, width, prepare_for_undo);
            ctx.stop = (seam - width).saturating_sub(1).max(ctx.start);
        } else {
            log::debug!("outer crossfade skipped at stop edge {}", seam);
        }
    }

    /// Blend `[seam - width, seam)` with `[seam, seam + width)` into the first
    /// half, then remove the second half from every channel
    fn collapse_seam(
        &mut self,
        sound: &mut dyn SoundBuffer,
        channels: ChannelMask,
        seam: usize,
        width: usize,
        prepare_for_undo: bool,
    ) {
        let left_start = seam - width;

        // Cues in the dropped half move along with the blended audio
        let moved: Vec<(usize, usize)> = sound
            .cues()
            .iter()
            .enumerate()
            .filter(|(_, cue)| cue.time >= seam && cue.time < seam + width)
            .map(|(index, cue)| (index, cue.time - width))
            .collect();
        for (index, time) in moved {
            sound.set_cue_time(index, time);
        }

        let all = sound.all_channels();
        let capture = sound.copy_to_scratch(all, left_start, 2 * width);
        let mut left = vec![0.0; width];
        let mut right = vec![0.0; width];
        for channel in all.iter() {
            capture.read(channel, 0, &mut left);
            capture.read(channel, width, &mut right);
            blend(&mut right, &left, Ramp::FadeIn, self.shape_for(channels, channel));
            sound.write(channel, left_start, &right);
        }

        let length = sound.len();
        sound.remove_space(all, seam, width, length - width);
        log::debug!("outer crossfade of {} samples at {}", width, seam);

        if prepare_for_undo {
            self.applied.push(EdgeCapture {
                position: left_start,
                width,
                multiplier: 2,
                handle: capture,
            });
        }
    }

    /// Take back every applied crossfade, most recent first
    ///
    /// The blended samples are saved in the returned value; hand it to
    /// `recrossfade` if the rest of the undo fails, or drop it.
    pub fn uncrossfade(&mut self, sound: &mut dyn SoundBuffer) -> UndoneCrossfades {
        let mut edges = Vec::with_capacity(self.applied.len());
        while let Some(edge) = self.applied.pop() {
            let channels = edge.handle.channels();
            let blended = sound.copy_to_scratch(channels, edge.position, edge.width);
            if edge.multiplier == 1 {
                sound.copy_from_scratch(&edge.handle, channels, edge.position, 0, edge.width);
            } else {
                let restored = edge.width * edge.multiplier;
                let length = sound.len() - edge.width;
                sound.remove_space(channels, edge.position, edge.width, length);
                sound.move_from_scratch(&edge.handle, channels, edge.position, restored, length + restored);
            }
            edges.push((edge, blended));
        }
        UndoneCrossfades { edges }
    }

    /// Put back crossfades taken back by `uncrossfade`, oldest first
    pub fn recrossfade(&mut self, sound: &mut dyn SoundBuffer, undone: UndoneCrossfades) {
        for (edge, blended) in undone.edges.into_iter().rev() {
            let channels = edge.handle.channels();
            if edge.multiplier == 1 {
                sound.copy_from_scratch(&blended, channels, edge.position, 0, edge.width);
            } else {
                let expanded = edge.width * edge.multiplier;
                let length = sound.len().saturating_sub(expanded);
                sound.remove_space(channels, edge.position, expanded, length);
                sound.move_from_scratch(&blended, channels, edge.position, edge.width, length + edge.width);
            }
            self.applied.push(edge);
        }
    }
}

/// Crossfades removed by an undo that has not finished yet
pub struct UndoneCrossfades {
    /// Most recent first, each with the blended samples it replaced
    edges: Vec<(EdgeCapture, ScratchHandle)>,
}

impl UndoneCrossfades {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::{Cue, MemorySound};

    fn config(ms: f64, shape: FadeShape) -> CrossfadeConfig {
        CrossfadeConfig {
            start_ms: ms,
            stop_ms: ms,
            shape,
            ..CrossfadeConfig::default()
        }
    }

    fn ramp_sound(length: usize, sample_rate: u32) -> MemorySound {
        let data = (0..length).map(|i| i as Sample / length as Sample).collect();
        MemorySound::from_channels(vec![data], sample_rate)
    }

    #[test]
    fn test_linear_blend() {
        let mut dest = vec![1.0; 5];
        blend(&mut dest, &[0.0; 5], Ramp::FadeIn, FadeShape::Linear);
        assert_eq!(dest, vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        let mut dest = vec![1.0; 5];
        blend(&mut dest, &[0.0; 5], Ramp::FadeOut, FadeShape::Linear);
        assert_eq!(dest, vec![1.0, 0.75, 0.5, 0.25, 0.0]);
    }

    #[test]
    fn test_parabolic_blend() {
        let mut dest = vec![1.0; 3];
        blend(&mut dest, &[0.0; 3], Ramp::FadeIn, FadeShape::Parabolic);
        assert_eq!(dest, vec![0.0, 0.25, 1.0]);
    }

    #[test]
    fn test_tiny_window_untouched() {
        let mut dest = vec![0.7];
        blend(&mut dest, &[0.1], Ramp::FadeIn, FadeShape::Linear);
        assert_eq!(dest, vec![0.7]);
    }

    #[test]
    fn test_blend_clips() {
        let mut dest = vec![1.0, 1.0, 1.0];
        blend(&mut dest, &[1.0, 1.0, 1.0], Ramp::FadeOut, FadeShape::Parabolic);
        assert!(dest.iter().all(|v| *v <= 1.0));
    }

    #[test]
    fn test_inner_widths_at_boundaries() {
        let sound = ramp_sound(1000, 1000);
        let fader = Crossfader::new(&config(10.0, FadeShape::Linear), CrossfadeEdges::Inner);

        assert_eq!(fader.inner_window_widths(&sound, 0, 500), (0, 10));
        assert_eq!(fader.inner_window_widths(&sound, 500, 1000), (10, 0));
        assert_eq!(fader.inner_window_widths(&sound, 100, 104), (2, 2));
        assert_eq!(fader.inner_window_widths(&sound, 300, 300), (10, 10));
    }

    #[test]
    fn test_inner_blend_and_uncrossfade() {
        let mut sound = ramp_sound(100, 1000);
        let original = sound.channel_data(0).to_vec();
        let mut fader = Crossfader::new(&config(5.0, FadeShape::Linear), CrossfadeEdges::Inner);
        let mut ctx = ActionContext::new(ChannelMask::all(1), 20, 59, CrossfadeEdges::Inner);

        fader.prepare_inner(&sound, (20, 60)).unwrap();
        sound.write(0, 20, &[0.5; 40]);
        let edited = sound.channel_data(0).to_vec();

        fader.apply(&mut sound, &mut ctx, true);
        assert_eq!(fader.captured_edges(), 2);
        assert_eq!(sound.sample(0, 20), original[20]);
        assert_eq!(sound.sample(0, 24), 0.5);
        assert_eq!(sound.sample(0, 55), 0.5);
        assert_eq!(sound.sample(0, 59), original[59]);
        assert!(sound.sample(0, 22) != 0.5);

        fader.uncrossfade(&mut sound);
        assert_eq!(sound.channel_data(0), edited.as_slice());
        assert_eq!(fader.captured_edges(), 0);
    }

    #[test]
    fn test_inner_without_undo_keeps_nothing() {
        let mut sound = ramp_sound(100, 1000);
        let pool = sound.scratch_pool().clone();
        let mut fader = Crossfader::new(&config(5.0, FadeShape::Linear), CrossfadeEdges::Inner);
        let mut ctx = ActionContext::new(ChannelMask::all(1), 20, 59, CrossfadeEdges::Inner);

        fader.prepare_inner(&sound, (20, 60)).unwrap();
        fader.apply(&mut sound, &mut ctx, false);
        assert_eq!(fader.captured_edges(), 0);
        assert!(pool.lock().is_empty());
    }

    #[test]
    fn test_prepare_twice_is_precondition_error() {
        let sound = ramp_sound(100, 1000);
        let mut fader = Crossfader::new(&config(5.0, FadeShape::Linear), CrossfadeEdges::Inner);
        fader.prepare_inner(&sound, (20, 60)).unwrap();
        assert!(fader.prepare_inner(&sound, (20, 60)).unwrap_err().is_precondition());

        fader.reset();
        assert!(fader.prepare_inner(&sound, (20, 60)).is_ok());
    }

    #[test]
    fn test_unselected_channel_blends_linearly() {
        let mut sound = MemorySound::new(2, 50, 1000);
        let mut fader = Crossfader::new(&config(5.0, FadeShape::Parabolic), CrossfadeEdges::Inner);
        let mut ctx = ActionContext::new(ChannelMask::single(0), 10, 29, CrossfadeEdges::Inner);

        fader.prepare_inner(&sound, (10, 30)).unwrap();
        sound.write(0, 10, &[1.0; 20]);
        sound.write(1, 10, &[1.0; 20]);
        fader.apply(&mut sound, &mut ctx, false);

        // Midpoint of the 5-sample start window
        assert_eq!(sound.sample(0, 12), 0.25);
        assert_eq!(sound.sample(1, 12), 0.5);
    }

    #[test]
    fn test_outer_clamped_near_start() {
        let mut sound = MemorySound::new(1, 1000, 1000);
        let mut fader = Crossfader::new(&config(50.0, FadeShape::Linear), CrossfadeEdges::Outer);
        let mut ctx = ActionContext::new(ChannelMask::all(1), 10, 999, CrossfadeEdges::Outer);

        fader.apply(&mut sound, &mut ctx, true);
        assert_eq!(sound.len(), 990);
        assert_eq!(ctx.selection(), (0, 989));
        assert_eq!(fader.captured_edges(), 1);
    }

    #[test]
    fn test_outer_skipped_at_zero() {
        let mut sound = MemorySound::new(1, 100, 1000);
        let mut fader = Crossfader::new(&config(5.0, FadeShape::Linear), CrossfadeEdges::Outer);
        let mut ctx = ActionContext::new(ChannelMask::all(1), 0, 99, CrossfadeEdges::Outer);

        fader.apply(&mut sound, &mut ctx, true);
        assert_eq!(sound.len(), 100);
        assert_eq!(fader.captured_edges(), 0);
    }

    #[test]
    fn test_outer_round_trip() {
        let mut sound = ramp_sound(100, 1000);
        let original = sound.channel_data(0).to_vec();
        let mut fader = Crossfader::new(&config(5.0, FadeShape::Linear), CrossfadeEdges::Outer);
        let mut ctx = ActionContext::new(ChannelMask::all(1), 20, 59, CrossfadeEdges::Outer);

        fader.apply(&mut sound, &mut ctx, true);
        assert_eq!(sound.len(), 90);
        assert_eq!(ctx.selection(), (15, 49));
        // First blended sample is all left half, last is all right half
        assert_eq!(sound.sample(0, 15), original[15]);
        assert_eq!(sound.sample(0, 19), original[24]);

        fader.uncrossfade(&mut sound);
        assert_eq!(sound.channel_data(0), original.as_slice());
    }

    #[test]
    fn test_recrossfade_puts_blend_back() {
        for edges in [CrossfadeEdges::Inner, CrossfadeEdges::Outer] {
            let mut sound = ramp_sound(100, 1000);
            let original = sound.channel_data(0).to_vec();
            let mut fader = Crossfader::new(&config(5.0, FadeShape::Linear), edges);
            let mut ctx = ActionContext::new(ChannelMask::all(1), 20, 59, edges);

            if edges == CrossfadeEdges::Inner {
                fader.prepare_inner(&sound, (20, 60)).unwrap();
                sound.write(0, 20, &[0.5; 40]);
            }
            let edited = sound.channel_data(0).to_vec();
            fader.apply(&mut sound, &mut ctx, true);
            let blended = sound.channel_data(0).to_vec();
            assert_eq!(fader.captured_edges(), 2);

            let undone = fader.uncrossfade(&mut sound);
            assert_eq!(undone.len(), 2);
            assert_eq!(sound.channel_data(0), edited.as_slice());

            fader.recrossfade(&mut sound, undone);
            assert_eq!(sound.channel_data(0), blended.as_slice(), "{:?}", edges);
            assert_eq!(fader.captured_edges(), 2);

            fader.uncrossfade(&mut sound);
            assert_eq!(sound.channel_data(0), edited.as_slice());
            if edges == CrossfadeEdges::Outer {
                assert_eq!(edited, original);
            }
        }
    }

    #[test]
    fn test_outer_moves_cues() {
        let mut sound = ramp_sound(100, 1000);
        sound.add_cue(Cue::new("inside", 22, false));
        sound.add_cue(Cue::new("later", 50, false));
        sound.add_cue(Cue::new("earlier", 10, false));
        let mut fader = Crossfader::new(&config(5.0, FadeShape::Linear), CrossfadeEdges::Outer);
        let mut ctx = ActionContext::new(ChannelMask::all(1), 20, 99, CrossfadeEdges::Outer);

        fader.apply(&mut sound, &mut ctx, false);
        let times: Vec<usize> = sound.cues().iter().map(|cue| cue.time).collect();
        assert_eq!(times, vec![17, 45, 10]);
    }
}

// WAV import/export for MemorySound

use crate::sound::{MAX_CHANNELS, MemorySound, Sample, SoundBuffer};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum WavError {
    #[error("WAV error: {0}")]
    Hound(#[from] hound::Error),

    #[error("Unsupported WAV layout: {0}")]
    Unsupported(String),
}

/// Sample encoding used when writing a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavEncoding {
    Pcm16,
    Float32,
}

/// Channel masks address at most MAX_CHANNELS channels
fn check_channel_count(channels: usize) -> Result<(), WavError> {
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(WavError::Unsupported(format!(
            "{} channels (1 to {} supported)",
            channels, MAX_CHANNELS
        )));
    }
    Ok(())
}

/// Load a WAV file into a new MemorySound
pub fn load_wav(path: &Path) -> Result<MemorySound, WavError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    check_channel_count(spec.channels as usize)?;

    let interleaved: Vec<Sample> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(WavError::Unsupported(format!(
                    "{} bits per sample",
                    spec.bits_per_sample
                )));
            }
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channel_count = spec.channels as usize;
    let mut channels = vec![Vec::with_capacity(interleaved.len() / channel_count); channel_count];
    for frame in interleaved.chunks(channel_count) {
        for (channel, value) in frame.iter().enumerate() {
            channels[channel].push(*value);
        }
    }

    log::debug!(
        "loaded {} ({} channels, {} Hz, {} frames)",
        path.display(),
        channel_count,
        spec.sample_rate,
        channels[0].len()
    );
    Ok(MemorySound::from_channels(channels, spec.sample_rate))
}

/// Write any sound to a WAV file
pub fn save_wav(sound: &dyn SoundBuffer, path: &Path, encoding: WavEncoding) -> Result<(), WavError> {
    if sound.channel_count() == 0 || sound.channel_count() > u16::MAX as usize {
        return Err(WavError::Unsupported(format!(
            "{} channels",
            sound.channel_count()
        )));
    }

    let spec = WavSpec {
        channels: sound.channel_count() as u16,
        sample_rate: sound.sample_rate(),
        bits_per_sample: match encoding {
            WavEncoding::Pcm16 => 16,
            WavEncoding::Float32 => 32,
        },
        sample_format: match encoding {
            WavEncoding::Pcm16 => SampleFormat::Int,
            WavEncoding::Float32 => SampleFormat::Float,
        },
    };

    let mut writer = WavWriter::create(path, spec)?;
    for position in 0..sound.len() {
        for channel in 0..sound.channel_count() {
            let value = sound.sample(channel, position);
            match encoding {
                WavEncoding::Pcm16 => {
                    writer.write_sample((value.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?
                }
                WavEncoding::Float32 => writer.write_sample(value)?,
            }
        }
    }
    writer.finalize()?;
    Ok(())
}

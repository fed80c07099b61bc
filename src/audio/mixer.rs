use super::format::AudioFormat;
use super::stream::{AudioStream, Frame, SILENCE, fill_chunk};
use crate::error::{MixError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CHUNK_FRAMES: usize = 4096;
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(4);

/// How two samples are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MixMode {
    /// Sum and hard-clip to [-1, 1]
    #[default]
    Clip,
    /// Mean of the two samples
    Average,
}

impl MixMode {
    pub fn mix(self, a: Frame, b: Frame) -> Frame {
        [self.mix_sample(a[0], b[0]), self.mix_sample(a[1], b[1])]
    }

    fn mix_sample(self, a: f32, b: f32) -> f32 {
        let s = match self {
            Self::Clip => a + b,
            Self::Average => (a + b) * 0.5,
        };
        if s.is_nan() { 0.0 } else { s.clamp(-1.0, 1.0) }
    }
}

/// What happens when an input ends before the duration cap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ShortStreamPolicy {
    /// Stop at the shorter input
    #[default]
    Truncate,
    /// Always produce the full cap, reading exhausted inputs as silence
    Pad,
}

#[derive(Debug, Clone)]
pub struct MixSettings {
    pub max_duration: Duration,
    pub mode: MixMode,
    pub short_stream: ShortStreamPolicy,
    pub chunk_frames: usize,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            max_duration: DEFAULT_MAX_DURATION,
            mode: MixMode::default(),
            short_stream: ShortStreamPolicy::default(),
            chunk_frames: DEFAULT_CHUNK_FRAMES,
        }
    }
}

/// Fail unless the two formats can be mixed without resampling
pub fn check_compatible(first: AudioFormat, second: AudioFormat) -> Result<()> {
    if first.sample_rate != second.sample_rate {
        return Err(MixError::FormatMismatch {
            first: first.sample_rate,
            second: second.sample_rate,
        });
    }
    Ok(())
}

/// Mixes two inputs as an [`AudioStream`], one fixed-size chunk at a time.
///
/// Each input gets its own buffer, allocated once and reused for every chunk.
pub struct ChunkedMixer<A, B> {
    first: A,
    second: B,
    format: AudioFormat,
    mode: MixMode,
    len: u64,
    position: u64,
    buf_first: Vec<Frame>,
    buf_second: Vec<Frame>,
}

impl<A: AudioStream, B: AudioStream> ChunkedMixer<A, B> {
    /// Take ownership of both inputs and rewind them to their first frame.
    pub fn new(mut first: A, mut second: B, settings: &MixSettings) -> Result<Self> {
        let (f1, f2) = (first.format(), second.format());
        check_compatible(f1, f2)?;

        first.seek(0)?;
        second.seek(0)?;

        let format = AudioFormat::new(f1.sample_rate, f1.channels.max(f2.channels).clamp(1, 2));
        let cap = format.frames_for_duration(settings.max_duration);
        let len = match settings.short_stream {
            ShortStreamPolicy::Truncate => first.len().min(second.len()).min(cap),
            ShortStreamPolicy::Pad => cap,
        };

        let chunk_frames = settings.chunk_frames.max(1);

        tracing::debug!(
            "Mixer: {} Hz, {} channels, {} frames ({:?}, {:?}, chunk {})",
            format.sample_rate,
            format.channels,
            len,
            settings.mode,
            settings.short_stream,
            chunk_frames
        );

        Ok(Self {
            first,
            second,
            format,
            mode: settings.mode,
            len,
            position: 0,
            buf_first: vec![SILENCE; chunk_frames],
            buf_second: vec![SILENCE; chunk_frames],
        })
    }

    pub fn chunk_frames(&self) -> usize {
        self.buf_first.len()
    }

    pub fn into_inner(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: AudioStream, B: AudioStream> AudioStream for ChunkedMixer<A, B> {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        let target = frame.min(self.len);
        self.first.seek(target.min(self.first.len()))?;
        self.second.seek(target.min(self.second.len()))?;
        self.position = target;
        Ok(())
    }

    fn read_frames(&mut self, buf: &mut [Frame]) -> Result<usize> {
        let want = buf.len().min(usize::try_from(self.remaining()).unwrap_or(usize::MAX));
        let mut written = 0;

        while written < want {
            let n = (want - written).min(self.buf_first.len());
            let chunk_first = &mut self.buf_first[..n];
            let chunk_second = &mut self.buf_second[..n];

            fill_chunk(&mut self.first, chunk_first)?;
            fill_chunk(&mut self.second, chunk_second)?;

            for ((out, a), b) in buf[written..written + n]
                .iter_mut()
                .zip(chunk_first.iter())
                .zip(chunk_second.iter())
            {
                *out = self.mode.mix(*a, *b);
            }
            written += n;
        }

        self.position += written as u64;
        Ok(written)
    }
}

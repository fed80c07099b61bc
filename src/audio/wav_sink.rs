use super::format::AudioFormat;
use super::sink::AudioSink;
use super::stream::{AudioStream, Frame, SILENCE};
use crate::error::{MixError, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Sample encoding of the output WAV
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputSampleFormat {
    #[default]
    Int16,
    Float32,
}

impl OutputSampleFormat {
    fn wav_spec(self, format: AudioFormat) -> WavSpec {
        let (bits_per_sample, sample_format) = match self {
            Self::Int16 => (16, SampleFormat::Int),
            Self::Float32 => (32, SampleFormat::Float),
        };
        WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

fn to_i16(sample: f32) -> i16 {
    // float-to-int `as` saturates, so +1.0 lands on i16::MAX
    (sample.clamp(-1.0, 1.0) * 32768.0).round() as i16
}

/// WAV encoder writing straight to disk
pub struct WavSink {
    path: PathBuf,
    writer: Option<WavWriter<BufWriter<File>>>,
    channels: u16,
    sample_format: OutputSampleFormat,
}

impl WavSink {
    pub fn create(path: &Path, format: AudioFormat, sample_format: OutputSampleFormat) -> Result<Self> {
        let writer = WavWriter::create(path, sample_format.wav_spec(format)).map_err(|source| {
            MixError::Encode {
                path: path.to_path_buf(),
                source,
            }
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            channels: format.channels,
            sample_format,
        })
    }

    fn encode_err(&self, source: hound::Error) -> MixError {
        MixError::Encode {
            path: self.path.clone(),
            source,
        }
    }
}

impl AudioSink for WavSink {
    fn write_chunk(&mut self, frames: &[Frame]) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(self.encode_err(hound::Error::Unsupported));
        };

        let channels = self.channels.clamp(1, 2) as usize;
        let result = frames.iter().try_for_each(|frame| {
            frame[..channels]
                .iter()
                .try_for_each(|&sample| match self.sample_format {
                    OutputSampleFormat::Int16 => writer.write_sample(to_i16(sample)),
                    OutputSampleFormat::Float32 => writer.write_sample(sample.clamp(-1.0, 1.0)),
                })
        });

        result.map_err(|e| self.encode_err(e))
    }

    fn finalize(&mut self) -> Result<()> {
        match self.writer.take() {
            Some(writer) => writer.finalize().map_err(|e| self.encode_err(e)),
            None => Ok(()),
        }
    }
}

/// Drain `stream` from its cursor into a new WAV file at `path`.
///
/// Returns the number of frames written.
pub fn encode<S: AudioStream + ?Sized>(
    path: &Path,
    stream: &mut S,
    sample_format: OutputSampleFormat,
    chunk_frames: usize,
) -> Result<u64> {
    let mut sink = WavSink::create(path, stream.format(), sample_format)?;
    let total = drain(&mut sink, stream, chunk_frames)?;
    tracing::debug!("Wrote {} frames to {:?}", total, path);
    Ok(total)
}

/// Copy every remaining frame of `stream` into `sink`, then finalize it.
pub fn drain<S, K>(sink: &mut K, stream: &mut S, chunk_frames: usize) -> Result<u64>
where
    S: AudioStream + ?Sized,
    K: AudioSink + ?Sized,
{
    let mut buf = vec![SILENCE; chunk_frames.max(1)];
    let mut total = 0u64;

    loop {
        let n = stream.read_frames(&mut buf)?;
        if n == 0 {
            break;
        }
        sink.write_chunk(&buf[..n])?;
        total += n as u64;
    }

    sink.finalize()?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::stream::memory::MemoryStream;
    use crate::audio::testing::read_wav_i16;

    #[test]
    fn test_to_i16() {
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(1.0), i16::MAX);
        assert_eq!(to_i16(-1.0), i16::MIN);
        assert_eq!(to_i16(0.5), 16384);
        assert_eq!(to_i16(3.0), i16::MAX);
        assert_eq!(to_i16(-7.5), i16::MIN);
    }

    #[test]
    fn test_encode_stereo_int16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let mut stream = MemoryStream::new(22050, vec![[0.5, -0.25]; 1000]).with_max_read(300);

        let frames = encode(&path, &mut stream, OutputSampleFormat::Int16, 128).unwrap();
        assert_eq!(frames, 1000);

        let (spec, samples) = read_wav_i16(&path);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(samples.len(), 2000);
        assert_eq!(&samples[..4], &[16384, -8192, 16384, -8192]);
    }

    #[test]
    fn test_encode_mono_writes_left_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let mut stream = MemoryStream::mono(8000, &[0.25; 10]);

        encode(&path, &mut stream, OutputSampleFormat::Int16, 4).unwrap();

        let (spec, samples) = read_wav_i16(&path);
        assert_eq!(spec.channels, 1);
        assert_eq!(samples, vec![8192; 10]);
    }

    #[test]
    fn test_encode_float32() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let mut stream = MemoryStream::new(48000, vec![[0.125, 2.0]; 5]);

        encode(&path, &mut stream, OutputSampleFormat::Float32, 64).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_format, SampleFormat::Float);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 10);
        assert_eq!(samples[0], 0.125);
        assert_eq!(samples[1], 1.0);
    }

    #[test]
    fn test_encode_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/out.wav");
        let mut stream = MemoryStream::silence(8000, 10);

        let err = encode(&path, &mut stream, OutputSampleFormat::Int16, 4).unwrap_err();
        assert!(matches!(err, MixError::Encode { .. }));
    }
}

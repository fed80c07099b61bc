use super::format::AudioFormat;
use super::stream::{AudioStream, Frame};
use crate::error::{MixError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Containers we accept, chosen purely by file suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Mp3,
    Wav,
}

impl Container {
    /// Case-sensitive match on the last four characters. A bare `.mp3` with
    /// no stem is not accepted.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.to_string_lossy();
        if name.chars().count() <= 4 {
            return None;
        }

        if name.ends_with(".mp3") {
            Some(Self::Mp3)
        } else if name.ends_with(".wav") {
            Some(Self::Wav)
        } else {
            None
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }
}

/// Open an audio file for streaming.
///
/// The suffix is checked before the filesystem is touched.
pub fn open(path: &Path) -> Result<DecodedStream> {
    let container = Container::from_path(path).ok_or_else(|| MixError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    let file = File::open(path).map_err(|source| MixError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;

    DecodedStream::new(path, file, container)
}

fn is_end_of_stream(err: &SymphoniaError) -> bool {
    matches!(err, SymphoniaError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
}

/// An open, decoding audio file.
///
/// Packets are decoded lazily into a reused sample buffer, so memory use does
/// not grow with file length.
pub struct DecodedStream {
    path: PathBuf,
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    format: AudioFormat,
    total_frames: u64,
    position: u64,
    samples: Option<SampleBuffer<f32>>,
    sample_spec: Option<SignalSpec>,
    sample_capacity: u64,
    packet_channels: usize,
    pending_len: usize,
    pending_frame: usize,
    // frames to discard after a seek landed before the requested frame
    skip: u64,
}

impl DecodedStream {
    fn new(path: &Path, file: File, container: Container) -> Result<Self> {
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(container.extension());

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| MixError::decode(path, format!("failed to probe format: {}", e)))?;

        let mut reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| MixError::decode(path, "no audio track found"))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| MixError::decode(path, "sample rate not found"))?;
        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| MixError::decode(path, "channel count not found"))?;

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| MixError::decode(path, format!("failed to create decoder: {}", e)))?;

        let total_frames = match codec_params.n_frames {
            Some(n) => n,
            None => {
                tracing::debug!("No frame count in header for {:?}, scanning packets", path);
                count_frames(&mut *reader, track_id)
                    .map_err(|e| MixError::decode(path, format!("failed to scan packets: {}", e)))?
            }
        };

        tracing::debug!(
            "Opened {:?}: {:?}, {} Hz, {} channels, {} frames",
            path,
            container,
            sample_rate,
            channels,
            total_frames
        );

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            decoder,
            track_id,
            format: AudioFormat::new(sample_rate, channels),
            total_frames,
            position: 0,
            samples: None,
            sample_spec: None,
            sample_capacity: 0,
            packet_channels: channels.max(1) as usize,
            pending_len: 0,
            pending_frame: 0,
            skip: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn clear_pending(&mut self) {
        self.pending_len = 0;
        self.pending_frame = 0;
    }

    /// Decode the next packet of our track into the sample buffer.
    ///
    /// Returns false at end of stream.
    fn decode_next(&mut self) -> Result<bool> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(e) if is_end_of_stream(&e) => return Ok(false),
                Err(e) => return Err(MixError::decode(&self.path, e)),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!("Skipping corrupt packet in {:?}: {}", self.path, e);
                    continue;
                }
                Err(e) => return Err(MixError::decode(&self.path, e)),
            };

            if decoded.frames() == 0 {
                continue;
            }

            let spec = *decoded.spec();
            let capacity = decoded.capacity() as u64;
            if self.sample_spec != Some(spec) || self.sample_capacity < capacity {
                self.samples = Some(SampleBuffer::new(capacity, spec));
                self.sample_spec = Some(spec);
                self.sample_capacity = capacity;
            }
            if let Some(buf) = self.samples.as_mut() {
                buf.copy_interleaved_ref(decoded);
            }

            self.packet_channels = spec.channels.count().max(1);
            self.pending_len = self
                .samples
                .as_ref()
                .map_or(0, |buf| buf.samples().len() / self.packet_channels);
            self.pending_frame = 0;

            if self.skip > 0 {
                let available = self.pending_len;
                let dropped = (self.skip as usize).min(available);
                self.pending_frame = dropped;
                self.skip -= dropped as u64;
                if dropped == available {
                    continue;
                }
            }

            return Ok(true);
        }
    }
}

impl std::fmt::Debug for DecodedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedStream")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("total_frames", &self.total_frames)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// Sum packet durations for files whose header carries no frame count,
/// then rewind.
fn count_frames(
    reader: &mut dyn FormatReader,
    track_id: u32,
) -> std::result::Result<u64, SymphoniaError> {
    let mut total = 0;
    loop {
        match reader.next_packet() {
            Ok(packet) if packet.track_id() == track_id => total += packet.dur(),
            Ok(_) => {}
            Err(e) if is_end_of_stream(&e) => break,
            Err(e) => return Err(e),
        }
    }

    reader.seek(SeekMode::Accurate, SeekTo::TimeStamp { ts: 0, track_id })?;
    Ok(total)
}

impl AudioStream for DecodedStream {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn len(&self) -> u64 {
        self.total_frames
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        let target = frame.min(self.total_frames);
        if target == self.position {
            return Ok(());
        }

        self.clear_pending();
        self.skip = 0;

        if target < self.total_frames {
            let seeked = self
                .reader
                .seek(
                    SeekMode::Accurate,
                    SeekTo::TimeStamp {
                        ts: target,
                        track_id: self.track_id,
                    },
                )
                .map_err(|e| MixError::decode(&self.path, format!("seek failed: {}", e)))?;
            self.decoder.reset();
            self.skip = seeked.required_ts.saturating_sub(seeked.actual_ts);
        }

        self.position = target;
        Ok(())
    }

    fn read_frames(&mut self, buf: &mut [Frame]) -> Result<usize> {
        let want = buf.len().min(usize::try_from(self.remaining()).unwrap_or(usize::MAX));
        let mut written = 0;

        while written < want {
            if self.pending_frame >= self.pending_len {
                if !self.decode_next()? {
                    break;
                }
                continue;
            }

            let channels = self.packet_channels;
            let n = (self.pending_len - self.pending_frame).min(want - written);
            if let Some(samples) = self.samples.as_ref() {
                let samples = samples.samples();
                for (i, out) in buf[written..written + n].iter_mut().enumerate() {
                    let base = (self.pending_frame + i) * channels;
                    let left = samples[base];
                    // mono is duplicated, anything past stereo is dropped
                    let right = if channels > 1 { samples[base + 1] } else { left };
                    *out = [left, right];
                }
            }

            self.pending_frame += n;
            written += n;
        }

        self.position += written as u64;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::stream::SILENCE;
    use crate::audio::stream::memory::collect;
    use crate::audio::testing::{MP3_FRAME_SAMPLES, silent_mp3, write_wav_i16};

    #[test]
    fn test_container_from_path() {
        assert_eq!(Container::from_path(Path::new("song.mp3")), Some(Container::Mp3));
        assert_eq!(Container::from_path(Path::new("dir/take.wav")), Some(Container::Wav));
        assert_eq!(Container::from_path(Path::new("song.MP3")), None);
        assert_eq!(Container::from_path(Path::new("song.flac")), None);
        assert_eq!(Container::from_path(Path::new(".wav")), None);
        assert_eq!(Container::from_path(Path::new("wav")), None);
    }

    #[test]
    fn test_unsupported_suffix_skips_file_io() {
        // Nonexistent path: we must not get FileOpen back
        let err = open(Path::new("/definitely/not/here.flac")).unwrap_err();
        assert!(matches!(err, MixError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = open(&dir.path().join("missing.wav")).unwrap_err();
        assert!(matches!(err, MixError::FileOpen { .. }));
    }

    #[test]
    fn test_garbage_wav_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.wav");
        std::fs::write(&path, b"this is not a riff file at all").unwrap();

        let err = open(&path).unwrap_err();
        assert!(matches!(err, MixError::Decode { .. }));
    }

    #[test]
    fn test_decode_mono_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.wav");
        let samples: Vec<i16> = (0..5000).map(|i| (i * 3) as i16).collect();
        write_wav_i16(&path, 22050, 1, &samples);

        let mut stream = open(&path).unwrap();
        assert_eq!(stream.format(), AudioFormat::new(22050, 1));
        assert_eq!(stream.len(), 5000);

        let frames = collect(&mut stream);
        assert_eq!(frames.len(), 5000);
        assert_eq!(stream.position(), 5000);
        for (frame, &s) in frames.iter().zip(&samples) {
            let expected = s as f32 / 32768.0;
            assert!((frame[0] - expected).abs() < 1e-6);
            assert_eq!(frame[0], frame[1]);
        }

        let mut buf = [SILENCE; 16];
        assert_eq!(stream.read_frames(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_decode_stereo_wav_keeps_channels_apart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let samples: Vec<i16> = (0..200).flat_map(|_| [16384i16, -16384]).collect();
        write_wav_i16(&path, 8000, 2, &samples);

        let mut stream = open(&path).unwrap();
        assert_eq!(stream.format().channels, 2);
        let frames = collect(&mut stream);
        assert_eq!(frames.len(), 200);
        assert!(frames.iter().all(|f| *f == [0.5, -0.5]));
    }

    #[test]
    fn test_seek_restarts_and_repositions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.wav");
        let samples: Vec<i16> = (0..4000).map(|i| i as i16).collect();
        write_wav_i16(&path, 8000, 1, &samples);

        let mut stream = open(&path).unwrap();
        let first_pass = collect(&mut stream);

        stream.seek(0).unwrap();
        assert_eq!(stream.position(), 0);
        assert_eq!(collect(&mut stream), first_pass);

        stream.seek(1234).unwrap();
        let mut buf = [SILENCE; 4];
        assert_eq!(stream.read_frames(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..], &first_pass[1234..1238]);

        stream.seek(10_000).unwrap();
        assert_eq!(stream.position(), 4000);
        assert_eq!(stream.read_frames(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_decode_mp3_without_info_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.mp3");
        std::fs::write(&path, silent_mp3(40)).unwrap();

        let mut stream = open(&path).unwrap();
        assert_eq!(stream.format(), AudioFormat::new(44100, 1));

        // either scanned from the packets or estimated from the file size
        let expected = 40 * MP3_FRAME_SAMPLES;
        assert!(stream.len().abs_diff(expected) <= MP3_FRAME_SAMPLES);

        let frames = collect(&mut stream);
        assert!(frames.len() as u64 <= stream.len());
        assert!(frames.len() as u64 >= expected - 2 * MP3_FRAME_SAMPLES);
        assert_eq!(stream.position(), frames.len() as u64);
        assert!(frames.iter().all(|f| *f == SILENCE));

        stream.seek(1000).unwrap();
        assert_eq!(stream.position(), 1000);
        let mut buf = [[1.0, 1.0]; 64];
        assert_eq!(stream.read_frames(&mut buf).unwrap(), 64);
        assert_eq!(stream.position(), 1064);
        assert!(buf.iter().all(|f| *f == SILENCE));

        stream.seek(0).unwrap();
        assert_eq!(collect(&mut stream).len(), frames.len());
    }

    #[test]
    fn test_count_frames_sums_packets_and_rewinds() {
        let bytes = silent_mp3(25);
        let mss = MediaSourceStream::new(Box::new(std::io::Cursor::new(bytes)), Default::default());
        let mut hint = Hint::new();
        hint.with_extension("mp3");
        let mut reader = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .unwrap()
            .format;
        let track_id = reader.default_track().unwrap().id;

        assert_eq!(count_frames(&mut *reader, track_id).unwrap(), 25 * MP3_FRAME_SAMPLES);
        assert_eq!(reader.next_packet().unwrap().ts(), 0);
    }
}

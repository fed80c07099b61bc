use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Write interleaved 16-bit samples to a WAV fixture
pub fn write_wav_i16(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

/// Mono sine at `amplitude`, quantised to i16
pub fn tone_i16(sample_rate: u32, hz: f32, seconds: u32, amplitude: f32) -> Vec<i16> {
    let n = sample_rate as usize * seconds as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let s = (2.0 * std::f32::consts::PI * hz * t).sin() * amplitude;
            (s * i16::MAX as f32) as i16
        })
        .collect()
}

pub fn read_wav_i16(path: &Path) -> (WavSpec, Vec<i16>) {
    let mut reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    (spec, samples)
}

/// Bytes in one 128 kbps, 44.1 kHz MPEG-1 Layer III frame without padding
pub const MP3_FRAME_BYTES: usize = 417;

/// PCM frames produced by each MPEG-1 Layer III frame
pub const MP3_FRAME_SAMPLES: u64 = 1152;

/// Silent mono MP3 made of `frames` bare MPEG frames.
///
/// There is no ID3 tag and no Xing/Info frame, so the container carries no
/// frame count of its own. All-zero side info means every granule decodes
/// to silence.
pub fn silent_mp3(frames: usize) -> Vec<u8> {
    // sync, MPEG-1, layer III, no CRC | 128 kbps, 44.1 kHz | mono
    const HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC0];

    let mut bytes = Vec::with_capacity(frames * MP3_FRAME_BYTES);
    for _ in 0..frames {
        bytes.extend_from_slice(&HEADER);
        bytes.resize(bytes.len() + MP3_FRAME_BYTES - HEADER.len(), 0);
    }
    bytes
}

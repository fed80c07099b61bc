use crate::audio::{
    AudioFormat, AudioStream, ChunkedMixer, MixSettings, OutputSampleFormat, WavSink,
};
use crate::audio::{decoder, mixer, wav_sink};
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Everything needed for one merge run
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub first: PathBuf,
    pub second: PathBuf,
    pub output: PathBuf,
    pub settings: MixSettings,
    pub sample_format: OutputSampleFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeSummary {
    pub output: PathBuf,
    pub format: AudioFormat,
    pub frames: u64,
}

/// Decode both inputs, mix them and write the result.
///
/// Inputs are closed on every path out of this function. The output file is
/// only created once both inputs are open and compatible, and is removed
/// again if writing fails after it was created.
pub fn merge_files(request: &MergeRequest) -> Result<MergeSummary> {
    let first = decoder::open(&request.first)?;
    log_loaded("Audio1", &first);

    let second = decoder::open(&request.second)?;
    log_loaded("Audio2", &second);

    mixer::check_compatible(first.format(), second.format())?;

    let mut mixed = ChunkedMixer::new(first, second, &request.settings)?;
    let format = mixed.format();
    let chunk_frames = mixed.chunk_frames();

    tracing::info!(
        "Starting merge: {:.2}s at {} Hz into {:?}",
        format.duration_of(mixed.len()).as_secs_f64(),
        format.sample_rate,
        request.output
    );

    let frames = write_output(&request.output, &mut mixed, request.sample_format, chunk_frames)?;

    Ok(MergeSummary {
        output: request.output.clone(),
        format,
        frames,
    })
}

/// Encode `stream` into `output`.
///
/// A file this call created is removed again if writing fails. When the
/// file cannot be created at all, whatever is already at `output` is left
/// alone.
fn write_output<S: AudioStream + ?Sized>(
    output: &Path,
    stream: &mut S,
    sample_format: OutputSampleFormat,
    chunk_frames: usize,
) -> Result<u64> {
    let mut sink = WavSink::create(output, stream.format(), sample_format)?;

    match wav_sink::drain(&mut sink, stream, chunk_frames) {
        Ok(frames) => Ok(frames),
        Err(e) => {
            drop(sink);
            discard_output(output);
            Err(e)
        }
    }
}

fn log_loaded(label: &str, stream: &decoder::DecodedStream) {
    let format = stream.format();
    tracing::info!(
        "{} loaded successfully: {:?} ({} Hz, {} channels, {:.2}s)",
        label,
        stream.path(),
        format.sample_rate,
        format.channels,
        format.duration_of(stream.len()).as_secs_f64()
    );
}

fn discard_output(path: &Path) {
    if !path.exists() {
        return;
    }
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed partial output {:?}", path),
        Err(e) => tracing::warn!("Failed to remove partial output {:?}: {}", path, e),
    }
}

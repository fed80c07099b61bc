use super::format::AudioFormat;
use crate::error::Result;

/// One stereo sample pair, nominally in [-1.0, 1.0]
pub type Frame = [f32; 2];

pub const SILENCE: Frame = [0.0, 0.0];

/// A finite, seekable sequence of stereo frames.
///
/// Implementations own whatever resource backs them (an open file, a decoder)
/// and release it when dropped.
pub trait AudioStream {
    /// Format of the underlying source
    fn format(&self) -> AudioFormat;

    /// Total number of frames
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current read cursor, in frames
    fn position(&self) -> u64;

    /// Move the read cursor. Positions past the end are clamped to `len()`.
    fn seek(&mut self, frame: u64) -> Result<()>;

    /// Fill a prefix of `buf` and return how many frames were written.
    /// Returns 0 once the stream is exhausted.
    fn read_frames(&mut self, buf: &mut [Frame]) -> Result<usize>;

    fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position())
    }
}

/// Read until `buf` is full or the stream runs dry, zero-filling the rest.
///
/// Returns the number of frames that came from the stream.
pub fn fill_chunk<S: AudioStream + ?Sized>(stream: &mut S, buf: &mut [Frame]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read_frames(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf[filled..].fill(SILENCE);
    Ok(filled)
}

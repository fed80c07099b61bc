use super::stream::Frame;
use crate::error::Result;

/// Trait for streaming audio encoding
///
/// Implementations write frames as they arrive rather than buffering the
/// whole output.
pub trait AudioSink {
    /// Write frames (called repeatedly while a stream is drained)
    fn write_chunk(&mut self, frames: &[Frame]) -> Result<()>;

    /// Finalize and close the sink
    fn finalize(&mut self) -> Result<()>;
}

pub mod decoder;
pub mod format;
pub mod mixer;
pub mod sink;
pub mod stream;
pub mod wav_sink;

#[cfg(test)]
pub(crate) mod testing;

pub use decoder::{Container, DecodedStream};
pub use format::AudioFormat;
pub use mixer::{ChunkedMixer, MixMode, MixSettings, ShortStreamPolicy};
pub use sink::AudioSink;
pub use stream::{AudioStream, Frame, SILENCE};
pub use wav_sink::{OutputSampleFormat, WavSink};

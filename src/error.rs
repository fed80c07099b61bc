use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a merge.
#[derive(Debug, Error)]
pub enum MixError {
    /// Input path does not exist or cannot be read
    #[error("failed to open {}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input suffix is neither `.mp3` nor `.wav`
    #[error("unsupported file format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// Malformed or unreadable codec data
    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// Inputs cannot be mixed without resampling
    #[error("sample rates do not match ({first} Hz vs {second} Hz)")]
    FormatMismatch { first: u32, second: u32 },

    /// Output WAV could not be written
    #[error("failed to write {}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
}

impl MixError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MixError>;

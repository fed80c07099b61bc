pub mod audio;
pub mod config;
pub mod error;
pub mod services;

pub use error::{MixError, Result};

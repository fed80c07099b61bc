use crate::audio::{MixMode, MixSettings, OutputSampleFormat, ShortStreamPolicy};
use crate::audio::mixer::DEFAULT_CHUNK_FRAMES;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_output_path")]
    pub output_path: String,

    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: f64,

    #[serde(default)]
    pub mix_mode: MixMode,

    #[serde(default)]
    pub short_stream: ShortStreamPolicy,

    #[serde(default = "default_chunk_frames")]
    pub chunk_frames: usize,

    #[serde(default)]
    pub sample_format: OutputSampleFormat,
}

fn default_output_path() -> String {
    "output.wav".to_string()
}

fn default_max_duration_secs() -> f64 {
    4.0
}

fn default_chunk_frames() -> usize {
    DEFAULT_CHUNK_FRAMES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            max_duration_secs: default_max_duration_secs(),
            mix_mode: MixMode::default(),
            short_stream: ShortStreamPolicy::default(),
            chunk_frames: default_chunk_frames(),
            sample_format: OutputSampleFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/mixdown/config.json)
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("mixdown").join("config.json"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.output_path.is_empty() {
            return Err(anyhow::anyhow!("output_path cannot be empty"));
        }

        if !self.max_duration_secs.is_finite() || self.max_duration_secs <= 0.0 {
            return Err(anyhow::anyhow!(
                "max_duration_secs must be a positive number of seconds"
            ));
        }

        self.max_duration()?;

        if self.chunk_frames == 0 {
            return Err(anyhow::anyhow!("chunk_frames must be at least 1"));
        }

        Ok(())
    }

    fn max_duration(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.max_duration_secs).with_context(|| {
            format!(
                "max_duration_secs {} is out of range",
                self.max_duration_secs
            )
        })
    }

    pub fn mix_settings(&self) -> Result<MixSettings> {
        Ok(MixSettings {
            max_duration: self.max_duration()?,
            mode: self.mix_mode,
            short_stream: self.short_stream,
            chunk_frames: self.chunk_frames,
        })
    }
}

use mixdown::audio::{MixMode, OutputSampleFormat, ShortStreamPolicy};
use mixdown::config::Config;
use mixdown::services::{MergeRequest, merge_files};

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

/// Mix two audio files into a single WAV
#[derive(Debug, Parser)]
#[command(name = "mixdown", version)]
struct Cli {
    /// First input (.mp3 or .wav)
    audio1: PathBuf,

    /// Second input (.mp3 or .wav)
    audio2: PathBuf,

    /// Output WAV path [default: output.wav]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum length of the mix, in seconds [default: 4]
    #[arg(short = 'd', long)]
    max_duration: Option<f64>,

    /// How overlapping samples are combined
    #[arg(long, value_enum)]
    mix_mode: Option<MixMode>,

    /// What to do when an input is shorter than the maximum length
    #[arg(long, value_enum)]
    short_stream: Option<ShortStreamPolicy>,

    /// Sample encoding of the output WAV
    #[arg(long, value_enum)]
    sample_format: Option<OutputSampleFormat>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output_path = output.to_string_lossy().into_owned();
        }
        if let Some(secs) = self.max_duration {
            config.max_duration_secs = secs;
        }
        if let Some(mode) = self.mix_mode {
            config.mix_mode = mode;
        }
        if let Some(policy) = self.short_stream {
            config.short_stream = policy;
        }
        if let Some(format) = self.sample_format {
            config.sample_format = format;
        }
    }
}

/// Parse the command line. `Ok(None)` means an input path is missing.
fn parse_args<I, T>(args: I) -> Result<Option<Cli>, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(e) if e.kind() == ErrorKind::MissingRequiredArgument => Ok(None),
        Err(e) => Err(e),
    }
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = match parse_args(std::env::args_os()) {
        Ok(Some(cli)) => cli,
        Ok(None) => {
            // Not enough inputs is a usage hint, not a failure
            println!("{}", Cli::command().render_usage());
            return ExitCode::SUCCESS;
        }
        Err(e) => e.exit(),
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let request = MergeRequest {
        first: cli.audio1,
        second: cli.audio2,
        output: PathBuf::from(&config.output_path),
        settings: config.mix_settings()?,
        sample_format: config.sample_format,
    };

    let summary = merge_files(&request)?;

    tracing::info!(
        "Audios merged successfully: {} frames ({:.2}s) written to {:?}",
        summary.frames,
        summary.format.duration_of(summary.frames).as_secs_f64(),
        summary.output
    );
    Ok(())
}

//! cardmerge-cli: merge the two sides of a card from image files.
//!
//! Runs the same compositing as the web app on files from disk, which is
//! handy for checking output dimensions and resampling quality without a
//! browser.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin cardmerge-cli -- [OPTIONS] <FRONT> <BACK>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cardmerge_core::{ComposeConfig, ProfileKind, ResizeFilter, SourceFile};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Merge the front and back images of a card into a single PNG.
#[derive(Parser)]
#[command(name = "cardmerge-cli", version)]
struct Cli {
    /// Path to the front-side image (PNG, JPEG, BMP, WebP).
    front: PathBuf,

    /// Path to the back-side image.
    back: PathBuf,

    /// Output file. Defaults to the configured export file name.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Resolution profile to render with.
    #[arg(long, value_enum, default_value_t = Profile::Export)]
    profile: Profile,

    /// Resampling filter (nearest, triangle, catmull-rom, gaussian, lanczos3).
    #[arg(long, value_enum)]
    filter: Option<Filter>,

    /// Print a `data:image/png;base64,...` URL to stdout instead of writing a file.
    #[arg(long)]
    data_url: bool,

    /// Full configuration as JSON. Overrides `--filter`.
    #[arg(long)]
    config_json: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Profile {
    /// 600 px tall, with a gutter and divider line.
    Preview,
    /// 2400 px tall, sides touching.
    Export,
}

impl From<Profile> for ProfileKind {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Preview => Self::Preview,
            Profile::Export => Self::Export,
        }
    }
}

/// Resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation.
    Triangle,
    /// Bicubic Catmull-Rom.
    CatmullRom,
    /// Gaussian (smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

impl From<Filter> for ResizeFilter {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Nearest => Self::Nearest,
            Filter::Triangle => Self::Triangle,
            Filter::CatmullRom => Self::CatmullRom,
            Filter::Gaussian => Self::Gaussian,
            Filter::Lanczos3 => Self::Lanczos3,
        }
    }
}

/// Build a [`ComposeConfig`] from CLI arguments.
///
/// `--config-json` wins over the individual flags when both are given.
fn config_from_cli(cli: &Cli) -> Result<ComposeConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let mut config = ComposeConfig::default();
    if let Some(filter) = cli.filter {
        config.preview.filter = filter.into();
        config.export.filter = filter.into();
    }
    Ok(config)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Read and pre-check one side so a bad path or format is reported
/// against the right file before any pixels are decoded.
fn read_source(path: &Path, config: &ComposeConfig) -> Result<SourceFile, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    SourceFile::inspect(name, bytes, &config.limits)
        .map_err(|e| format!("Error in {}: {e}", path.display()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let (front, back) = match (read_source(&cli.front, &config), read_source(&cli.back, &config))
    {
        (Ok(front), Ok(back)) => (front, back),
        (Err(msg), _) | (_, Err(msg)) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(
        front = %front.dimensions(),
        back = %back.dimensions(),
        "inputs accepted"
    );

    let profile = config.profile(cli.profile.into());
    let image = match cardmerge_core::compose(front.bytes(), back.bytes(), profile, &config.limits)
    {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error generating image: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.data_url {
        println!("{}", image.to_data_url());
        return ExitCode::SUCCESS;
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.export_file_name));
    let dimensions = image.dimensions();
    if let Err(e) = std::fs::write(&output, image.into_png()) {
        eprintln!("Error writing {}: {e}", output.display());
        return ExitCode::FAILURE;
    }
    println!("{} ({dimensions})", output.display());

    ExitCode::SUCCESS
}

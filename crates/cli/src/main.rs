//! audx command-line entry point
//!
//! Streams a WAV file through a denoise session in caller-sized chunks,
//! the same way a live audio callback would, and writes the cleaned file.

mod run;
mod wav;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use audx_config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(name = "audx", version, about = "Streaming speech denoiser")]
struct Args {
    /// Mono 16-bit PCM WAV to denoise
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the cleaned WAV
    #[arg(short, long)]
    output: PathBuf,

    /// Settings file (TOML, YAML or JSON); AUDX__* environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Samples handed to the session per call
    #[arg(long, default_value_t = 256)]
    chunk: usize,

    /// Resample quality override (0-10)
    #[arg(long)]
    quality: Option<i32>,

    /// VAD threshold override (0.0-1.0)
    #[arg(long)]
    vad_threshold: Option<f32>,

    /// Print the statistics report as JSON
    #[arg(long)]
    stats_json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())
        .with_context(|| match &args.config {
            Some(path) => format!("failed to load settings from {}", path.display()),
            None => "failed to load settings".to_string(),
        })?;

    if let Some(quality) = args.quality {
        settings.session.resample_quality = quality;
    }
    if let Some(threshold) = args.vad_threshold {
        settings.session.denoiser.vad_threshold = threshold;
    }
    settings.validate().context("invalid command-line override")?;

    init_tracing(&settings);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting audx");

    let report = run::denoise_file(&args.input, &args.output, &settings.session, args.chunk)?;

    if args.stats_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }

    Ok(())
}

fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.observability.log_level;
        format!("audx={level},audx_pipeline={level},audx_config={level}").into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };
    subscriber.with(fmt_layer).init();
}

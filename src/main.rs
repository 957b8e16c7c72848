use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use hd_upscaler::config::UpscaleConfig;
use hd_upscaler::util::{format_file_size, read_image_file, write_output};
use hd_upscaler::{EnhancementResult, ScaleFactor};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Upscale an image with an AI service, falling back to local resampling:
/// - waifu2x and DeepAI are tried in order when reachable
/// - otherwise the image is resampled locally and sharpened
#[derive(Parser, Debug)]
#[command(name = "upscale")]
#[command(about = "🖼️  Upscale an image 2x or 4x with remote AI and a local fallback")]
#[command(long_about = "Upscale an image 2x or 4x. Remote AI providers are tried first;
when none of them succeeds the image is upscaled locally with bilinear resampling
and a sharpening pass.")]
struct Args {
    /// Input image path
    #[arg(help = "Image to upscale (PNG, JPEG, GIF, WebP, BMP)")]
    input: PathBuf,

    /// Scale factor
    #[arg(short, long, default_value_t = 2, help = "Scale factor: 2 or 4")]
    scale: u32,

    /// Output path
    #[arg(short, long, help = "Output PNG path (default: enhanced_hd.png or the config value)")]
    output: Option<PathBuf>,

    /// Configuration file
    #[arg(long, help = "TOML configuration file")]
    config: Option<PathBuf>,

    /// Skip remote providers
    #[arg(long, help = "Never contact remote providers; upscale locally")]
    offline: bool,

    /// Disable the sharpening pass
    #[arg(long, help = "Skip the sharpening filter on local output")]
    no_sharpen: bool,

    /// Local resampling engine
    #[arg(long, help = "Local resampler: bilinear (reference) or simd")]
    engine: Option<String>,

    /// Per-provider timeout
    #[arg(long, value_name = "SECS", help = "Seconds to wait for each remote provider")]
    timeout: Option<u64>,

    /// Verbosity
    #[arg(short, long, action = clap::ArgAction::Count,
          help = "Increase log verbosity (-v debug, -vv trace)")]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = match &args.config {
        Some(path) => UpscaleConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => UpscaleConfig::default(),
    };
    if args.no_sharpen {
        config.sharpen = false;
    }
    if let Some(engine) = args.engine {
        config.engine = engine;
    }
    if let Some(secs) = args.timeout {
        config.remote_timeout_secs = secs;
    }
    config.validate().map_err(anyhow::Error::msg)?;

    let scale = ScaleFactor::policy(args.scale)?;
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.output));

    let image = read_image_file(&args.input, config.input_size_limit)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    info!(
        input = %args.input.display(),
        size = %format_file_size(image.len() as u64),
        "loaded image"
    );

    let pipeline = config
        .build_pipeline(args.offline)
        .context("Failed to build enhancement pipeline")?;

    let bytes = match pipeline.enhance(&image, scale).await {
        EnhancementResult::Success { image_bytes, provider } => {
            info!(%provider, "enhanced remotely");
            image_bytes
        }
        EnhancementResult::FallbackSuccess { image_bytes } => {
            warn!("AI enhancement unavailable, basic upscaling was applied");
            image_bytes
        }
        EnhancementResult::Failure { error } => {
            return Err(anyhow!(error).context("Enhancement failed"));
        }
    };

    write_output(&output, &bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "{} -> {} ({}, {})",
        args.input.display(),
        output.display(),
        scale,
        format_file_size(bytes.len() as u64)
    );
    Ok(())
}

/// `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

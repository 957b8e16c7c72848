//! # HD Image Upscaler Library
//!
//! Remote-first image enhancement with a local fallback. An image is offered
//! to AI upscaling services in order; if none of them produces a usable
//! result, it is decoded and upscaled locally with a two-stage bilinear
//! resampler followed by a 3x3 sharpening convolution.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `pipeline`: The enhancement state machine and its builder
//! - `remote`: Remote providers (waifu2x, DeepAI) behind the `RemoteUpscaler` trait
//! - `codec`: Image decode/encode boundary
//! - `factor`: Scale factor validation
//! - `config`: TOML configuration and pipeline construction
//! - `util`: File helpers and size formatting
//!
//! Pixel work (resampling and sharpening) lives in the `hd-scale` crate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use hd_upscaler::{EnhancementPipeline, EnhancementResult, ScaleFactor};
//!
//! # async fn example(image: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = EnhancementPipeline::builder().build()?;
//! match pipeline.enhance(&image, ScaleFactor::policy(2)?).await {
//!     EnhancementResult::Success { provider, .. } => println!("enhanced by {provider}"),
//!     EnhancementResult::FallbackSuccess { .. } => println!("basic upscaling used"),
//!     EnhancementResult::Failure { error } => return Err(error.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod factor;
pub mod pipeline;
pub mod remote;
pub mod util;

/// Re-export error types for convenience
pub use error::{
    ErrorKind, HasRecoverySuggestion, HasSeverity, Recoverable, UpscaleError, UpscaleResult,
};

pub use codec::{ImageCodec, PngCodec};
pub use config::UpscaleConfig;
pub use factor::ScaleFactor;
pub use pipeline::{
    EnhancementPipeline, EnhancementPipelineBuilder, EnhancementReport, EnhancementResult,
    PipelineState,
};
pub use remote::RemoteUpscaler;

/// Re-export the pixel layer
pub use hd_scale::{PixelBuffer, ResampleEngine};

/// Enhance `image` with a pipeline built from `config`.
///
/// Provider credentials are read from the process environment. Pipeline
/// construction errors are returned as a `Failure` result so the caller only
/// has one value to inspect.
pub async fn enhance_image(
    image: &[u8],
    scale: ScaleFactor,
    config: &UpscaleConfig,
) -> EnhancementResult {
    match config.build_pipeline(false) {
        Ok(pipeline) => pipeline.enhance(image, scale).await,
        Err(error) => EnhancementResult::Failure { error },
    }
}

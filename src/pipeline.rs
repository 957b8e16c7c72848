//! # Enhancement Pipeline
//!
//! Orchestrates one enhancement: remote providers first, local fallback after.
//!
//! ## States
//!
//! ```text
//! Idle -> RemoteAttempt -> RemoteSucceeded -> Done
//!                       -> LocalFallback   -> Done
//! Idle -> LocalFallback -> Done            (no providers configured)
//! Idle -> Done                             (rejected input)
//! ```
//!
//! ## Ordering
//!
//! Providers are tried one at a time in registration order. Each attempt is
//! bounded by the remote timeout and fully resolved before the next starts;
//! local work only begins once every provider has failed. Dropping the future
//! returned by [`EnhancementPipeline::enhance`] cancels any in-flight request.
//!
//! ## Failure policy
//!
//! Remote failures and filter failures are absorbed. Empty input, oversized
//! input (when a remote attempt would have been made), decode failures,
//! outputs above the pixel ceiling and encode failures end the run with
//! [`EnhancementResult::Failure`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use hd_scale::resample::check_output_size;
use hd_scale::{
    DEFAULT_MAX_OUTPUT_PIXELS, PixelBuffer, PostFilter, ResampleEngine, Resampler, SharpenFilter,
};
use tracing::{debug, info, warn};

use crate::codec::{ImageCodec, PngCodec};
use crate::error::{UpscaleError, UpscaleResult, classify};
use crate::factor::ScaleFactor;
use crate::remote::RemoteUpscaler;
use crate::util::format_file_size;

/// Largest input offered to remote providers (5 MiB).
pub const DEFAULT_REMOTE_SIZE_LIMIT: u64 = 5 * 1024 * 1024;

/// Upper bound on a single provider attempt.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    RemoteAttempt,
    RemoteSucceeded,
    LocalFallback,
    Done,
}

/// Outcome of one [`EnhancementPipeline::enhance`] call.
#[derive(Debug)]
pub enum EnhancementResult {
    /// Bytes produced by a remote provider
    Success { image_bytes: Vec<u8>, provider: String },
    /// Bytes produced by the local resample + sharpen path
    FallbackSuccess { image_bytes: Vec<u8> },
    Failure { error: UpscaleError },
}

impl EnhancementResult {
    pub fn image_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Success { image_bytes, .. } | Self::FallbackSuccess { image_bytes } => {
                Some(image_bytes)
            }
            Self::Failure { .. } => None,
        }
    }

    pub fn into_image_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Success { image_bytes, .. } | Self::FallbackSuccess { image_bytes } => {
                Some(image_bytes)
            }
            Self::Failure { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::FallbackSuccess { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub fn error(&self) -> Option<&UpscaleError> {
        match self {
            Self::Failure { error } => Some(error),
            _ => None,
        }
    }

    /// Human-readable failure reason.
    pub fn reason(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }
}

/// Result plus a trace of how it was reached.
#[derive(Debug)]
pub struct EnhancementReport {
    pub result: EnhancementResult,
    /// Every state entered, in order, ending with `Done`
    pub states: Vec<PipelineState>,
    /// One entry per failed provider attempt
    pub remote_errors: Vec<UpscaleError>,
    /// Set when the post filter failed and was skipped
    pub filter_error: Option<UpscaleError>,
}

impl EnhancementReport {
    pub fn final_state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Idle)
    }
}

/// Bookkeeping collected while a run is in progress.
struct Trace {
    states: Vec<PipelineState>,
    remote_errors: Vec<UpscaleError>,
    filter_error: Option<UpscaleError>,
}

impl Trace {
    fn new() -> Self {
        Self {
            states: vec![PipelineState::Idle],
            remote_errors: Vec::new(),
            filter_error: None,
        }
    }

    fn enter(&mut self, state: PipelineState) {
        debug!(from = ?self.states.last(), to = ?state, "pipeline transition");
        self.states.push(state);
    }

    fn finish(mut self, result: EnhancementResult) -> EnhancementReport {
        self.enter(PipelineState::Done);
        EnhancementReport {
            result,
            states: self.states,
            remote_errors: self.remote_errors,
            filter_error: self.filter_error,
        }
    }
}

/// Remote-first image enhancer with a local fallback.
pub struct EnhancementPipeline {
    providers: Vec<Box<dyn RemoteUpscaler>>,
    codec: Box<dyn ImageCodec>,
    filter: Option<Box<dyn PostFilter>>,
    resampler: Resampler,
    remote_size_limit: u64,
    remote_timeout: Duration,
    allow_oversized_local: bool,
}

impl EnhancementPipeline {
    pub fn builder() -> EnhancementPipelineBuilder {
        EnhancementPipelineBuilder::new()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Enhance `image` by `scale`.
    pub async fn enhance(&self, image: &[u8], scale: ScaleFactor) -> EnhancementResult {
        self.enhance_with_report(image, scale).await.result
    }

    /// Like [`enhance`](Self::enhance), keeping the state trace and absorbed errors.
    pub async fn enhance_with_report(&self, image: &[u8], scale: ScaleFactor) -> EnhancementReport {
        let mut trace = Trace::new();

        if image.is_empty() {
            let error = UpscaleError::invalid_argument("image", "0 bytes", "image is empty");
            return trace.finish(EnhancementResult::Failure { error });
        }

        let size = image.len() as u64;
        info!(size = %format_file_size(size), %scale, "enhancing image");

        let oversized = size > self.remote_size_limit;
        let wants_remote = !self.providers.is_empty();

        if wants_remote && oversized && !self.allow_oversized_local {
            let error = UpscaleError::too_large(size, self.remote_size_limit)
                .with_recovery_suggestion("use an image under the remote size limit");
            warn!(%error, "rejecting input");
            return trace.finish(EnhancementResult::Failure { error });
        }

        if wants_remote && !oversized {
            trace.enter(PipelineState::RemoteAttempt);
            for provider in &self.providers {
                match self.attempt(provider.as_ref(), image, scale).await {
                    Ok(image_bytes) => {
                        info!(
                            provider = provider.name(),
                            bytes = image_bytes.len(),
                            "remote upscale succeeded"
                        );
                        trace.enter(PipelineState::RemoteSucceeded);
                        return trace.finish(EnhancementResult::Success {
                            image_bytes,
                            provider: provider.name().to_string(),
                        });
                    }
                    Err(error) => {
                        warn!(
                            provider = provider.name(),
                            transient = classify::is_transient(&error),
                            %error,
                            "remote upscale failed"
                        );
                        trace.remote_errors.push(error);
                    }
                }
            }
        } else if oversized {
            info!(
                limit = %format_file_size(self.remote_size_limit),
                "image exceeds remote limit, skipping providers"
            );
        }

        trace.enter(PipelineState::LocalFallback);
        let result = match self.local_fallback(image, scale, &mut trace) {
            Ok(image_bytes) => {
                warn!("using basic local upscaling; remote enhancement was unavailable");
                EnhancementResult::FallbackSuccess { image_bytes }
            }
            Err(error) => {
                warn!(fatal = classify::is_fatal(&error), %error, "local fallback failed");
                EnhancementResult::Failure { error }
            }
        };
        trace.finish(result)
    }

    /// Resample then filter pixels already in memory.
    pub fn upscale_local(
        &self,
        buffer: &PixelBuffer,
        scale: ScaleFactor,
    ) -> UpscaleResult<PixelBuffer> {
        self.run_local(buffer, scale).map(|(out, _)| out)
    }

    async fn attempt(
        &self,
        provider: &dyn RemoteUpscaler,
        image: &[u8],
        scale: ScaleFactor,
    ) -> UpscaleResult<Vec<u8>> {
        match tokio::time::timeout(self.remote_timeout, provider.upscale(image, scale)).await {
            Ok(result) => result,
            Err(_) => Err(UpscaleError::timeout(
                format!("{} request", provider.name()),
                self.remote_timeout.as_millis() as u64,
            )),
        }
    }

    fn local_fallback(
        &self,
        image: &[u8],
        scale: ScaleFactor,
        trace: &mut Trace,
    ) -> UpscaleResult<Vec<u8>> {
        let decoded = self.codec.decode(image)?;
        debug!(width = decoded.width(), height = decoded.height(), "decoded input");

        let (out, filter_error) = self.run_local(&decoded, scale)?;
        trace.filter_error = filter_error;

        self.codec.encode(&out)
    }

    fn run_local(
        &self,
        buffer: &PixelBuffer,
        scale: ScaleFactor,
    ) -> UpscaleResult<(PixelBuffer, Option<UpscaleError>)> {
        let factor = i32::try_from(scale.get()).map_err(|_| {
            UpscaleError::invalid_argument(
                "scale",
                scale.get().to_string(),
                "scale factor too large",
            )
        })?;
        let target = check_output_size(
            buffer.size(),
            scale.get(),
            self.resampler.max_output_pixels,
        )?;
        debug!(width = target.w, height = target.h, "output size within ceiling");

        let upscaled = self.resampler.resample(buffer, factor)?;
        debug!(width = upscaled.width(), height = upscaled.height(), "resampled");

        let Some(filter) = self.filter.as_deref() else {
            return Ok((upscaled, None));
        };

        match apply_filter(filter, &upscaled) {
            Ok(filtered) => Ok((filtered, None)),
            Err(error) => {
                warn!(%error, "post filter failed, keeping unfiltered pixels");
                Ok((upscaled, Some(error)))
            }
        }
    }
}

/// Run a best-effort filter, turning both errors and panics into `Filter` errors.
fn apply_filter(filter: &dyn PostFilter, buffer: &PixelBuffer) -> UpscaleResult<PixelBuffer> {
    match catch_unwind(AssertUnwindSafe(|| filter.apply(buffer))) {
        Ok(Ok(filtered)) => Ok(filtered),
        Ok(Err(e)) => Err(UpscaleError::filter(filter.name(), e.to_string())),
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panicked".to_string());
            Err(UpscaleError::filter(filter.name(), reason))
        }
    }
}

/// Builder for [`EnhancementPipeline`].
pub struct EnhancementPipelineBuilder {
    providers: Vec<Box<dyn RemoteUpscaler>>,
    codec: Option<Box<dyn ImageCodec>>,
    filter: Option<Box<dyn PostFilter>>,
    engine: ResampleEngine,
    max_output_pixels: u64,
    remote_size_limit: u64,
    remote_timeout: Duration,
    allow_oversized_local: bool,
}

impl Default for EnhancementPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EnhancementPipelineBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            codec: None,
            filter: Some(Box::new(SharpenFilter)),
            engine: ResampleEngine::default(),
            max_output_pixels: DEFAULT_MAX_OUTPUT_PIXELS,
            remote_size_limit: DEFAULT_REMOTE_SIZE_LIMIT,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            allow_oversized_local: false,
        }
    }

    /// Append a provider; providers are tried in the order they were added.
    pub fn with_provider<P: RemoteUpscaler + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn with_boxed_provider(mut self, provider: Box<dyn RemoteUpscaler>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_codec<C: ImageCodec + 'static>(mut self, codec: C) -> Self {
        self.codec = Some(Box::new(codec));
        self
    }

    /// Replace the default sharpening stage.
    pub fn with_filter<F: PostFilter + 'static>(mut self, filter: F) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn without_filter(mut self) -> Self {
        self.filter = None;
        self
    }

    pub fn with_engine(mut self, engine: ResampleEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Ceiling on the pixels of the locally upscaled image.
    pub fn with_max_output_pixels(mut self, pixels: u64) -> Self {
        self.max_output_pixels = pixels;
        self
    }

    pub fn with_remote_size_limit(mut self, bytes: u64) -> Self {
        self.remote_size_limit = bytes;
        self
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    /// Let inputs above the remote limit go straight to local fallback instead of failing.
    pub fn allow_oversized_local(mut self, allow: bool) -> Self {
        self.allow_oversized_local = allow;
        self
    }

    pub fn build(self) -> UpscaleResult<EnhancementPipeline> {
        if self.remote_size_limit == 0 {
            return Err(UpscaleError::config(
                "remote_size_limit",
                "0",
                "must be greater than 0",
            ));
        }
        if self.max_output_pixels == 0 {
            return Err(UpscaleError::config(
                "max_output_pixels",
                "0",
                "must be greater than 0",
            ));
        }
        if self.remote_timeout.is_zero() {
            return Err(UpscaleError::config(
                "remote_timeout",
                "0s",
                "must be greater than 0",
            ));
        }

        Ok(EnhancementPipeline {
            providers: self.providers,
            codec: self.codec.unwrap_or_else(|| Box::new(PngCodec)),
            filter: self.filter,
            resampler: Resampler::new(self.engine)
                .with_max_output_pixels(self.max_output_pixels),
            remote_size_limit: self.remote_size_limit,
            remote_timeout: self.remote_timeout,
            allow_oversized_local: self.allow_oversized_local,
        })
    }
}

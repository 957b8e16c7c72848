//! # Error Handling
//!
//! Error type for the enhancement library. Every variant carries an
//! [`ErrorContext`] with a timestamp, optional operation and context strings,
//! a recovery suggestion, a severity and free-form metadata.
//!
//! ## Error Kinds
//!
//! Variants group into the coarse [`ErrorKind`]s the pipeline reasons about:
//!
//! - `InvalidArgument`: bad scale factor or empty input. Surfaced to the caller.
//! - `RemoteUnavailable`: network failure, non-2xx status, malformed payload or
//!   timeout from a remote provider. Always absorbed by falling back locally.
//! - `DecodeFailure`: the input could not be decoded. Fatal, surfaced.
//! - `FilterFailure`: sharpening failed. Absorbed, the unsharpened buffer is used.
//! - `ResampleFailure`: the local resampler itself failed. Surfaced.
//! - `EncodeFailure`, `TooLarge` (input bytes or output pixels), `Config`, `Io`:
//!   surfaced.
//!
//! Absorbed errors are built with `recoverable` set in their context.
//!
//! ## Usage
//!
//! ```rust
//! use hd_upscaler::error::{ErrorKind, Recoverable, UpscaleError};
//!
//! let error = UpscaleError::status("waifu2x", 503)
//!     .with_context("posting 512x512 PNG")
//!     .with_recovery_suggestion("retry later or rely on local fallback");
//!
//! assert_eq!(error.kind(), ErrorKind::RemoteUnavailable);
//! assert!(error.is_recoverable());
//! ```

use std::{collections::HashMap, error::Error as StdError, fmt, time::SystemTime};

use hd_scale::ScaleError;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Debug,
    Info,
    /// Something degraded but the operation still produced a result
    Warning,
    Error,
    /// Nothing usable can be produced
    Fatal,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    pub context: Option<String>,
    pub recovery_suggestion: Option<String>,
    pub severity: ErrorSeverity,
    pub recoverable: bool,
    pub metadata: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
            recoverable: false,
            metadata: HashMap::new(),
        }
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    fn recoverable(mut self) -> Self {
        self.recoverable = true;
        self
    }
}

/// Coarse classification used by the pipeline and in results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    TooLarge,
    RemoteUnavailable,
    ResampleFailure,
    DecodeFailure,
    EncodeFailure,
    FilterFailure,
    Config,
    Io,
}

/// Base error type for the enhancement library
#[derive(Debug)]
pub enum UpscaleError {
    /// Argument outside its domain (scale factor, empty image)
    InvalidArgument {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// Input bytes or output pixels exceed a ceiling
    TooLarge {
        size: u64,
        limit: u64,
        /// What `size` and `limit` count ("bytes" or "pixels")
        unit: &'static str,
        context: ErrorContext,
    },
    /// Request to a remote provider never produced a response
    Network {
        provider: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
        context: ErrorContext,
    },
    /// Remote provider answered with a non-success status
    Status {
        provider: String,
        status: u16,
        context: ErrorContext,
    },
    /// Remote provider answered 2xx but the body is unusable
    MalformedPayload {
        provider: String,
        reason: String,
        context: ErrorContext,
    },
    /// Operation exceeded its time budget
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },
    /// Input bytes could not be decoded into pixels
    Decode {
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
    /// Pixels could not be encoded back into image bytes
    Encode {
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
    /// The local resampler failed
    Resample {
        reason: String,
        context: ErrorContext,
    },
    /// A post-resample filter failed
    Filter {
        filter: String,
        reason: String,
        context: ErrorContext,
    },
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
}

impl UpscaleError {
    pub fn invalid_argument(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn too_large(size: u64, limit: u64) -> Self {
        Self::TooLarge {
            size,
            limit,
            unit: "bytes",
            context: ErrorContext::new(),
        }
    }

    /// An upscaled image would exceed the output pixel ceiling.
    pub fn too_many_pixels(pixels: u64, limit: u64) -> Self {
        Self::TooLarge {
            size: pixels,
            limit,
            unit: "pixels",
            context: ErrorContext::new(),
        }
    }

    pub fn resample(reason: impl Into<String>) -> Self {
        Self::Resample {
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn network(
        provider: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Network {
            provider: provider.into(),
            source: Some(Box::new(source)),
            context: ErrorContext::new()
                .with_severity(ErrorSeverity::Warning)
                .recoverable(),
        }
    }

    pub fn status(provider: impl Into<String>, status: u16) -> Self {
        Self::Status {
            provider: provider.into(),
            status,
            context: ErrorContext::new()
                .with_severity(ErrorSeverity::Warning)
                .recoverable(),
        }
    }

    pub fn malformed(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            provider: provider.into(),
            reason: reason.into(),
            context: ErrorContext::new()
                .with_severity(ErrorSeverity::Warning)
                .recoverable(),
        }
    }

    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms,
            context: ErrorContext::new()
                .with_severity(ErrorSeverity::Warning)
                .recoverable(),
        }
    }

    pub fn decode(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Decode {
            source: Box::new(source),
            context: ErrorContext::new().with_severity(ErrorSeverity::Fatal),
        }
    }

    pub fn encode(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Encode {
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    pub fn filter(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Filter {
            filter: filter.into(),
            reason: reason.into(),
            context: ErrorContext::new()
                .with_severity(ErrorSeverity::Warning)
                .recoverable(),
        }
    }

    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Attach the path an I/O error refers to. No-op for other variants.
    pub fn with_path(mut self, p: impl Into<String>) -> Self {
        if let Self::Io { path, .. } = &mut self {
            *path = Some(p.into());
        }
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::InvalidArgument { context, .. } => context,
            Self::TooLarge { context, .. } => context,
            Self::Network { context, .. } => context,
            Self::Status { context, .. } => context,
            Self::MalformedPayload { context, .. } => context,
            Self::Timeout { context, .. } => context,
            Self::Decode { context, .. } => context,
            Self::Encode { context, .. } => context,
            Self::Resample { context, .. } => context,
            Self::Filter { context, .. } => context,
            Self::Config { context, .. } => context,
            Self::Io { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::InvalidArgument { context, .. } => context,
            Self::TooLarge { context, .. } => context,
            Self::Network { context, .. } => context,
            Self::Status { context, .. } => context,
            Self::MalformedPayload { context, .. } => context,
            Self::Timeout { context, .. } => context,
            Self::Decode { context, .. } => context,
            Self::Encode { context, .. } => context,
            Self::Resample { context, .. } => context,
            Self::Filter { context, .. } => context,
            Self::Config { context, .. } => context,
            Self::Io { context, .. } => context,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::TooLarge { .. } => ErrorKind::TooLarge,
            Self::Network { .. }
            | Self::Status { .. }
            | Self::MalformedPayload { .. }
            | Self::Timeout { .. } => ErrorKind::RemoteUnavailable,
            Self::Decode { .. } => ErrorKind::DecodeFailure,
            Self::Encode { .. } => ErrorKind::EncodeFailure,
            Self::Resample { .. } => ErrorKind::ResampleFailure,
            Self::Filter { .. } => ErrorKind::FilterFailure,
            Self::Config { .. } => ErrorKind::Config,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// True for every failure a remote provider can produce.
    pub fn is_remote_unavailable(&self) -> bool {
        self.kind() == ErrorKind::RemoteUnavailable
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::TooLarge { .. } => "too_large",
            Self::Network { .. } => "network",
            Self::Status { .. } => "status",
            Self::MalformedPayload { .. } => "malformed_payload",
            Self::Timeout { .. } => "timeout",
            Self::Decode { .. } => "decode",
            Self::Encode { .. } => "encode",
            Self::Resample { .. } => "resample",
            Self::Filter { .. } => "filter",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
        }
    }
}

impl fmt::Display for UpscaleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpscaleError::InvalidArgument {
                field,
                value,
                reason,
                ..
            } => write!(f, "Invalid argument '{}': {} (value: {})", field, reason, value),
            UpscaleError::TooLarge {
                size, limit, unit, ..
            } => write!(
                f,
                "Image too large: {} {} exceeds the limit of {} {}",
                size, unit, limit, unit
            ),
            UpscaleError::Network {
                provider, source, ..
            } => match source {
                Some(source) => write!(f, "Network error contacting {}: {}", provider, source),
                None => write!(f, "Network error contacting {}", provider),
            },
            UpscaleError::Status {
                provider, status, ..
            } => write!(f, "{} responded with HTTP {}", provider, status),
            UpscaleError::MalformedPayload {
                provider, reason, ..
            } => write!(f, "{} returned an unusable payload: {}", provider, reason),
            UpscaleError::Timeout {
                operation,
                duration_ms,
                ..
            } => write!(f, "Timeout during {} after {}ms", operation, duration_ms),
            UpscaleError::Decode { source, .. } => write!(f, "Failed to decode image: {}", source),
            UpscaleError::Encode { source, .. } => write!(f, "Failed to encode image: {}", source),
            UpscaleError::Resample { reason, .. } => write!(f, "Resampling failed: {}", reason),
            UpscaleError::Filter { filter, reason, .. } => {
                write!(f, "Filter '{}' failed: {}", filter, reason)
            }
            UpscaleError::Config {
                field,
                value,
                reason,
                ..
            } => write!(
                f,
                "Configuration error in '{}': {} (value: {})",
                field, reason, value
            ),
            UpscaleError::Io {
                operation,
                path,
                source,
                ..
            } => match path {
                Some(path) => write!(f, "I/O error during {} on '{}': {}", operation, path, source),
                None => write!(f, "I/O error during {}: {}", operation, source),
            },
        }
    }
}

impl StdError for UpscaleError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Decode { source, .. } | Self::Encode { source, .. } => Some(source.as_ref()),
            Self::Network {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type UpscaleResult<T> = Result<T, UpscaleError>;

/// Recovery strategies for handling errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Try the next provider, then the local pipeline
    Fallback { description: String },
    /// Skip the failed stage and keep its input
    Skip { reason: String },
}

/// Trait for errors that can be recovered from
pub trait Recoverable {
    fn is_recoverable(&self) -> bool;

    fn recovery_strategies(&self) -> Vec<RecoveryStrategy>;
}

impl Recoverable for UpscaleError {
    fn is_recoverable(&self) -> bool {
        self.context().recoverable
    }

    fn recovery_strategies(&self) -> Vec<RecoveryStrategy> {
        match self.kind() {
            ErrorKind::RemoteUnavailable => vec![RecoveryStrategy::Fallback {
                description: "Try the next provider, then upscale locally".to_string(),
            }],
            ErrorKind::FilterFailure => vec![RecoveryStrategy::Skip {
                reason: "Keep the unsharpened buffer".to_string(),
            }],
            _ => vec![],
        }
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for UpscaleError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for UpscaleError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Errors that may not recur on a later attempt
    pub fn is_transient(error: &UpscaleError) -> bool {
        matches!(
            error,
            UpscaleError::Timeout { .. } | UpscaleError::Network { .. }
        ) || matches!(error, UpscaleError::Status { status, .. } if *status >= 500)
    }

    /// Errors after which no image can be produced
    pub fn is_fatal(error: &UpscaleError) -> bool {
        matches!(
            error.kind(),
            ErrorKind::InvalidArgument | ErrorKind::DecodeFailure | ErrorKind::Config
        ) || error.severity() == ErrorSeverity::Fatal
    }
}

impl From<std::io::Error> for UpscaleError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<ScaleError> for UpscaleError {
    fn from(error: ScaleError) -> Self {
        match error {
            ScaleError::InvalidArgument { name, value } => {
                Self::invalid_argument(name, value, "out of range")
            }
            ScaleError::TooLarge { pixels, limit } => Self::too_many_pixels(pixels, limit),
            other => Self::resample(other.to_string()),
        }
    }
}

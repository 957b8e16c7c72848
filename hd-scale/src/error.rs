// SPDX-License-Identifier: MIT
// Error type shared by every pixel stage.

use fast_image_resize as fir;

#[derive(Debug)]
pub enum ScaleError {
    /// A caller-supplied argument is outside its domain (zero dimensions, factor < 1, overflow).
    InvalidArgument { name: &'static str, value: String },
    /// A resample stage would produce more pixels than the configured ceiling.
    TooLarge { pixels: u64, limit: u64 },
    /// Sample vector length disagrees with `width * height * 4`.
    BufferSize { expected: usize, actual: usize },
    Resize(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl ScaleError {
    pub(crate) fn invalid(name: &'static str, value: impl ToString) -> Self {
        Self::InvalidArgument {
            name,
            value: value.to_string(),
        }
    }
}

impl From<fir::ResizeError> for ScaleError {
    fn from(e: fir::ResizeError) -> Self {
        Self::Resize(e)
    }
}

impl From<fir::ImageBufferError> for ScaleError {
    fn from(e: fir::ImageBufferError) -> Self {
        Self::ImageBuf(e)
    }
}

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::InvalidArgument { name, value } => write!(f, "Invalid {}: {}", name, value),
            ScaleError::TooLarge { pixels, limit } => write!(
                f,
                "Output of {} pixels exceeds the {} pixel limit",
                pixels, limit
            ),
            ScaleError::BufferSize { expected, actual } => {
                write!(f, "Pixel buffer holds {} samples, expected {}", actual, expected)
            }
            ScaleError::Resize(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Resize(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

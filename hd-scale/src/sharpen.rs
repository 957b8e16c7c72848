// SPDX-License-Identifier: MIT
//! # 3x3 Sharpening Filter
//!
//! Applies the fixed kernel
//!
//! ```text
//!  0 -1  0
//! -1  5 -1
//!  0 -1  0
//! ```
//!
//! to the R, G and B channels independently. Alpha is copied unchanged. The
//! outermost one-pixel ring is copied from the input as well, so the kernel
//! never reads outside the buffer. The kernel sums to 1, which leaves flat
//! regions untouched.
//!
//! Sharpening is a best-effort stage: callers that run it through
//! [`PostFilter`] are expected to keep the unfiltered buffer when it fails.

use crate::error::ScaleError;
use crate::pixel::{CHANNELS, PixelBuffer, sample_len};

/// Sharpening kernel, indexed `[ky + 1][kx + 1]`.
pub const SHARPEN_KERNEL: [[i32; 3]; 3] = [[0, -1, 0], [-1, 5, -1], [0, -1, 0]];

/// Colour channels the kernel touches (alpha excluded).
const COLOR_CHANNELS: usize = 3;

/// A best-effort whole-buffer stage run after resampling.
pub trait PostFilter: Send + Sync {
    /// Short name used in logs and error reports.
    fn name(&self) -> &str;

    /// Produce a filtered copy of `buffer`.
    fn apply(&self, buffer: &PixelBuffer) -> Result<PixelBuffer, ScaleError>;
}

/// [`PostFilter`] wrapper around [`sharpen`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SharpenFilter;

impl PostFilter for SharpenFilter {
    fn name(&self) -> &str {
        "sharpen"
    }

    fn apply(&self, buffer: &PixelBuffer) -> Result<PixelBuffer, ScaleError> {
        sharpen(buffer)
    }
}

/// Sharpen a buffer, returning a new one. The input is only read.
pub fn sharpen(buffer: &PixelBuffer) -> Result<PixelBuffer, ScaleError> {
    let (width, height) = (buffer.width(), buffer.height());
    let expected = sample_len(width, height)?;
    let src = buffer.as_raw();
    if src.len() != expected {
        return Err(ScaleError::BufferSize {
            expected,
            actual: src.len(),
        });
    }

    let (w, h) = (width as usize, height as usize);
    let mut out = src.to_vec();

    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let o = (y * w + x) * CHANNELS;
            for c in 0..COLOR_CHANNELS {
                let mut sum = 0i32;
                for (ky, row) in SHARPEN_KERNEL.iter().enumerate() {
                    for (kx, &k) in row.iter().enumerate() {
                        if k == 0 {
                            continue;
                        }
                        let idx = ((y + ky - 1) * w + (x + kx - 1)) * CHANNELS + c;
                        sum += k * i32::from(src[idx]);
                    }
                }
                out[o + c] = sum.clamp(0, 255) as u8;
            }
        }
    }

    PixelBuffer::from_rgba(width, height, out)
}

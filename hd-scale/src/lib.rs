// SPDX-License-Identifier: MIT
//! # hd-scale: Local Upscaling Fallback
//!
//! Pure pixel transforms used when no remote upscaling provider produced a
//! result. Nothing in this crate performs I/O; every operation takes a
//! [`PixelBuffer`](pixel::PixelBuffer) and returns a new one.
//!
//! ## Key Components
//!
//! - [`pixel`]: RGBA8 raster with a length invariant enforced at construction
//! - [`resample`]: integer-factor upscaling with a two-pass cascade above 2x
//! - [`sharpen`]: fixed 3x3 sharpening kernel with an untouched border ring
//! - [`error`]: the crate's error type
//!
//! ## Usage Example
//!
//! ```rust
//! use hd_scale::pixel::PixelBuffer;
//! use hd_scale::resample::resample;
//! use hd_scale::sharpen::sharpen;
//!
//! let src = PixelBuffer::filled(4, 4, [255, 0, 0, 255])?;
//! let up = resample(&src, 2)?;
//! let out = sharpen(&up)?;
//! assert_eq!((out.width(), out.height()), (8, 8));
//! # Ok::<(), hd_scale::error::ScaleError>(())
//! ```

pub mod error;
pub mod pixel;
pub mod resample;
pub mod sharpen;

pub use error::ScaleError;
pub use pixel::{PixelBuffer, Size};
pub use resample::{DEFAULT_MAX_OUTPUT_PIXELS, ResampleEngine, Resampler, resample};
pub use sharpen::{PostFilter, SharpenFilter, sharpen};

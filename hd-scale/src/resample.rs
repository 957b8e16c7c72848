// SPDX-License-Identifier: MIT
//! # Integer-Factor Resampler
//!
//! Upscales a [`PixelBuffer`] by a positive integer factor with smooth
//! (bilinear) interpolation. All four channels, alpha included, are
//! interpolated the same way.
//!
//! ## Cascade
//!
//! Factors of 2 or less are done in one pass. Larger factors go through an
//! exact 2x intermediate first and are then resampled up to the final size:
//!
//! ```text
//! 3x3 --x4--> 6x6 (pass 1) --> 12x12 (pass 2)
//! ```
//!
//! A single large-factor pass comes out visibly softer than two shorter ones.
//!
//! Every pass is sized against [`Resampler::max_output_pixels`] before its
//! buffer is allocated, so an absurd factor fails with
//! [`ScaleError::TooLarge`] instead of exhausting memory.
//!
//! ## Engines
//!
//! - [`ResampleEngine::Bilinear`]: reference four-tap interpolation with
//!   pixel-centre mapping, exact on uniform input
//! - [`ResampleEngine::Simd`]: `fast_image_resize` convolution with a bilinear
//!   filter, faster on large images

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{ResizeOptions, Resizer};

use crate::error::ScaleError;
use crate::pixel::{CHANNELS, PixelBuffer, Size};

/// Interpolation backend used for each pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResampleEngine {
    #[default]
    Bilinear,
    Simd,
}

impl std::str::FromStr for ResampleEngine {
    type Err = ScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bilinear" => Ok(Self::Bilinear),
            "simd" => Ok(Self::Simd),
            _ => Err(ScaleError::invalid("engine", s)),
        }
    }
}

/// Default ceiling on the pixels any single pass may produce (64 Mpx, 256 MiB of RGBA8).
pub const DEFAULT_MAX_OUTPUT_PIXELS: u64 = 64 * 1024 * 1024;

#[derive(Clone, Copy, Debug)]
pub struct Resampler {
    pub engine: ResampleEngine,
    /// Largest pass output, in pixels; larger plans fail before allocating.
    pub max_output_pixels: u64,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new(ResampleEngine::default())
    }
}

impl Resampler {
    pub fn new(engine: ResampleEngine) -> Self {
        Self {
            engine,
            max_output_pixels: DEFAULT_MAX_OUTPUT_PIXELS,
        }
    }

    pub fn with_max_output_pixels(mut self, limit: u64) -> Self {
        self.max_output_pixels = limit;
        self
    }

    /// Upscale `buffer` by `factor`.
    ///
    /// Output is exactly `width * factor` by `height * factor`. A factor of 1
    /// returns an unmodified copy; factors below 1 fail with
    /// [`ScaleError::InvalidArgument`], and plans whose passes exceed
    /// `max_output_pixels` fail with [`ScaleError::TooLarge`] before any
    /// buffer is allocated.
    pub fn resample(&self, buffer: &PixelBuffer, factor: i32) -> Result<PixelBuffer, ScaleError> {
        let factor = checked_factor(factor)?;
        if factor == 1 {
            return Ok(buffer.clone());
        }

        let passes = plan_passes(buffer.size(), factor, self.max_output_pixels)?;
        let mut current = self.pass(buffer, passes[0])?;
        for &dst in &passes[1..] {
            current = self.pass(&current, dst)?;
        }
        Ok(current)
    }

    fn pass(&self, src: &PixelBuffer, dst: Size) -> Result<PixelBuffer, ScaleError> {
        match self.engine {
            ResampleEngine::Bilinear => bilinear(src, dst),
            ResampleEngine::Simd => simd_bilinear(src, dst),
        }
    }
}

/// Resample with the default (reference bilinear) engine and pixel ceiling.
pub fn resample(buffer: &PixelBuffer, factor: i32) -> Result<PixelBuffer, ScaleError> {
    Resampler::default().resample(buffer, factor)
}

/// Final size of upscaling `input` by `factor`, if it stays within `max_pixels`.
pub fn check_output_size(input: Size, factor: u32, max_pixels: u64) -> Result<Size, ScaleError> {
    if factor == 0 {
        return Err(ScaleError::invalid("factor", factor));
    }
    let out = input.times(factor)?;
    within_limit(out, max_pixels)
}

/// Sizes produced by each pass of the cascade for `factor`.
///
/// One entry for factors up to 2, two entries (2x, then final) above that.
/// A factor of 1 yields the input size unchanged. Every pass is checked
/// against `max_pixels`.
pub fn plan_passes(input: Size, factor: u32, max_pixels: u64) -> Result<Vec<Size>, ScaleError> {
    let out = check_output_size(input, factor, max_pixels)?;
    if factor <= 2 {
        Ok(vec![out])
    } else {
        let first = within_limit(input.times(2)?, max_pixels)?;
        Ok(vec![first, out])
    }
}

fn within_limit(size: Size, max_pixels: u64) -> Result<Size, ScaleError> {
    if size.area() > max_pixels {
        return Err(ScaleError::TooLarge {
            pixels: size.area(),
            limit: max_pixels,
        });
    }
    Ok(size)
}

fn checked_factor(factor: i32) -> Result<u32, ScaleError> {
    if factor < 1 {
        return Err(ScaleError::invalid("factor", factor));
    }
    Ok(factor as u32)
}

/// Map a destination pixel centre back onto the source axis.
#[inline]
fn src_coord(dst_i: u32, src_len: u32, dst_len: u32) -> f32 {
    let scale = src_len as f32 / dst_len as f32;
    let max = (src_len - 1) as f32;
    ((dst_i as f32 + 0.5) * scale - 0.5).clamp(0.0, max)
}

/// Four-tap bilinear pass.
fn bilinear(src: &PixelBuffer, dst: Size) -> Result<PixelBuffer, ScaleError> {
    let (sw, sh) = (src.width(), src.height());
    let data = src.as_raw();
    let row = sw as usize * CHANNELS;
    let mut out = PixelBuffer::new(dst.w, dst.h)?.into_raw();

    for dy in 0..dst.h {
        let fy_src = src_coord(dy, sh, dst.h);
        let y0 = fy_src.floor() as usize;
        let y1 = (y0 + 1).min(sh as usize - 1);
        let fy = fy_src - y0 as f32;

        for dx in 0..dst.w {
            let fx_src = src_coord(dx, sw, dst.w);
            let x0 = fx_src.floor() as usize;
            let x1 = (x0 + 1).min(sw as usize - 1);
            let fx = fx_src - x0 as f32;

            let p00 = y0 * row + x0 * CHANNELS;
            let p10 = y0 * row + x1 * CHANNELS;
            let p01 = y1 * row + x0 * CHANNELS;
            let p11 = y1 * row + x1 * CHANNELS;
            let o = (dy as usize * dst.w as usize + dx as usize) * CHANNELS;

            for c in 0..CHANNELS {
                let top = lerp(data[p00 + c], data[p10 + c], fx);
                let bottom = lerp(data[p01 + c], data[p11 + c], fx);
                let v = top + (bottom - top) * fy;
                out[o + c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    PixelBuffer::from_rgba(dst.w, dst.h, out)
}

#[inline]
fn lerp(a: u8, b: u8, t: f32) -> f32 {
    let a = a as f32;
    a + (b as f32 - a) * t
}

/// Bilinear pass through `fast_image_resize`.
fn simd_bilinear(src: &PixelBuffer, dst: Size) -> Result<PixelBuffer, ScaleError> {
    let src_view = TypedImageRef::<U8x4>::from_buffer(src.width(), src.height(), src.as_raw())?;
    let mut out = PixelBuffer::new(dst.w, dst.h)?.into_raw();
    {
        let mut dst_image = TypedImage::<U8x4>::from_buffer(dst.w, dst.h, &mut out)?;
        let opts = ResizeOptions::new()
            .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear))
            .use_alpha(false);
        let mut resizer = Resizer::new();
        resizer.resize_typed::<U8x4>(&src_view, &mut dst_image, &opts)?;
    }
    PixelBuffer::from_rgba(dst.w, dst.h, out)
}

// SPDX-License-Identifier: MIT
//! # RGBA Pixel Buffer
//!
//! A flat, row-major raster of 8-bit samples in R, G, B, A order.
//!
//! The only invariant is `samples.len() == width * height * 4`. It is checked
//! once at construction and kept by every mutator, so downstream stages can
//! index without re-validating. Buffers move between stages by value; a stage
//! that needs the original afterwards borrows instead.

use crate::error::ScaleError;

/// Bytes per pixel (RGBA8).
pub const CHANNELS: usize = 4;

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    /// Scale both sides by an integer factor, failing on overflow.
    pub fn times(self, factor: u32) -> Result<Size, ScaleError> {
        let w = self
            .w
            .checked_mul(factor)
            .ok_or_else(|| ScaleError::invalid("width", self.w))?;
        let h = self
            .h
            .checked_mul(factor)
            .ok_or_else(|| ScaleError::invalid("height", self.h))?;
        Ok(Size { w, h })
    }

    /// Pixel count; cannot overflow for `u32` sides.
    pub fn area(self) -> u64 {
        self.w as u64 * self.h as u64
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl PixelBuffer {
    /// Transparent black buffer of the given size.
    pub fn new(width: u32, height: u32) -> Result<Self, ScaleError> {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// Buffer where every pixel has the same RGBA value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, ScaleError> {
        let len = sample_len(width, height)?;
        let samples = rgba.iter().copied().cycle().take(len).collect();
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Take ownership of an existing RGBA8 sample vector.
    pub fn from_rgba(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, ScaleError> {
        let expected = sample_len(width, height)?;
        if samples.len() != expected {
            return Err(ScaleError::BufferSize {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size {
            w: self.width,
            h: self.height,
        }
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.samples
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.samples
    }

    /// Read one pixel.
    ///
    /// # Panics
    /// If `(x, y)` lies outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [self.samples[i], self.samples[i + 1], self.samples[i + 2], self.samples[i + 3]]
    }

    /// Overwrite one pixel.
    ///
    /// # Panics
    /// If `(x, y)` lies outside the buffer.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.samples[i..i + CHANNELS].copy_from_slice(&rgba);
    }

    /// Iterate pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.samples.chunks_exact(CHANNELS)
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({}, {}) outside {}x{} buffer",
            x,
            y,
            self.width,
            self.height
        );
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }
}

/// `width * height * 4`, rejecting empty or overflowing dimensions.
pub fn sample_len(width: u32, height: u32) -> Result<usize, ScaleError> {
    if width == 0 {
        return Err(ScaleError::invalid("width", width));
    }
    if height == 0 {
        return Err(ScaleError::invalid("height", height));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or_else(|| ScaleError::invalid("dimensions", format!("{}x{}", width, height)))
}

//! # Image Codec Boundary
//!
//! Converts between encoded image bytes and [`PixelBuffer`]s. The pipeline
//! only talks to the [`ImageCodec`] trait; [`PngCodec`] is the stock
//! implementation backed by the `image` crate.

use std::io::Cursor;

use hd_scale::PixelBuffer;
use image::{ImageFormat, RgbaImage};

use crate::error::{UpscaleError, UpscaleResult};

/// Decode/encode capability used by the local fallback.
pub trait ImageCodec: Send + Sync {
    /// Decode bytes of any supported format into RGBA8 pixels.
    fn decode(&self, bytes: &[u8]) -> UpscaleResult<PixelBuffer>;

    /// Encode pixels. Either the whole encoded image is returned or an error.
    fn encode(&self, buffer: &PixelBuffer) -> UpscaleResult<Vec<u8>>;
}

/// Decodes anything the `image` crate recognises, always encodes PNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn decode(&self, bytes: &[u8]) -> UpscaleResult<PixelBuffer> {
        let decoded = image::load_from_memory(bytes).map_err(UpscaleError::decode)?;
        let rgba = decoded.into_rgba8();
        let (width, height) = rgba.dimensions();
        PixelBuffer::from_rgba(width, height, rgba.into_raw()).map_err(UpscaleError::decode)
    }

    fn encode(&self, buffer: &PixelBuffer) -> UpscaleResult<Vec<u8>> {
        let image = RgbaImage::from_raw(buffer.width(), buffer.height(), buffer.as_raw().to_vec())
            .ok_or_else(|| {
                UpscaleError::encode(std::io::Error::other(
                    "pixel buffer does not match its dimensions",
                ))
            })?;

        // Scratch buffer is only handed out once encoding finished.
        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, ImageFormat::Png)
            .map_err(UpscaleError::encode)?;
        Ok(out.into_inner())
    }
}

/// Recognise an image format from its leading bytes.
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

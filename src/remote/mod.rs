//! # Remote Upscaling Providers
//!
//! Network services that may return a higher-resolution copy of an image.
//! Each provider implements [`RemoteUpscaler`]; the pipeline tries them in
//! order and only falls back to local processing once all of them failed.
//!
//! Whatever goes wrong on the wire (connection failure, non-2xx status, a 2xx
//! body that is missing, malformed or not an image) comes back as an
//! [`UpscaleError`] whose kind is `RemoteUnavailable`.

pub mod deepai;
pub mod waifu2x;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::codec::sniff_format;
use crate::error::{UpscaleError, UpscaleResult};
use crate::factor::ScaleFactor;

pub use deepai::DeepAiProvider;
pub use waifu2x::Waifu2xProvider;

/// A remote service that can upscale encoded image bytes.
#[async_trait]
pub trait RemoteUpscaler: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Ask the service for an upscaled copy of `image`.
    async fn upscale(&self, image: &[u8], scale: ScaleFactor) -> UpscaleResult<Vec<u8>>;

    /// Like [`upscale`](Self::upscale), with every failure mapped to `None`.
    async fn try_upscale(&self, image: &[u8], scale: ScaleFactor) -> Option<Vec<u8>> {
        match self.upscale(image, scale).await {
            Ok(bytes) => Some(bytes),
            Err(error) => {
                warn!(provider = self.name(), %error, "remote upscale failed");
                None
            }
        }
    }
}

/// Denoise strength requested from providers (0 = off, 3 = strongest).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub struct Noise(u8);

impl Noise {
    pub const MAX: u8 = 3;

    pub fn new(level: u8) -> UpscaleResult<Self> {
        if level > Self::MAX {
            return Err(UpscaleError::config(
                "noise",
                level.to_string(),
                "noise level must be between 0 and 3",
            ));
        }
        Ok(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Noise {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u8> for Noise {
    type Error = UpscaleError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

/// Content style hint; waifu2x models are trained separately for each.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Art,
    Photo,
}

impl Style {
    pub fn as_str(self) -> &'static str {
        match self {
            Style::Art => "art",
            Style::Photo => "photo",
        }
    }
}

impl std::str::FromStr for Style {
    type Err = UpscaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "art" => Ok(Style::Art),
            "photo" => Ok(Style::Photo),
            _ => Err(UpscaleError::config("style", s, "expected 'art' or 'photo'")),
        }
    }
}

/// Options sent with every provider request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub noise: Noise,
    pub style: Style,
}

/// Accept a payload only if it is a recognisable image.
pub(crate) fn validate_payload(provider: &str, bytes: Vec<u8>) -> UpscaleResult<Vec<u8>> {
    if bytes.is_empty() {
        return Err(UpscaleError::malformed(provider, "empty image payload"));
    }
    if sniff_format(&bytes).is_none() {
        return Err(UpscaleError::malformed(provider, "payload is not a recognised image"));
    }
    Ok(bytes)
}

/// Map a finished response to its body, or to a status error.
pub(crate) async fn read_success_body(
    provider: &str,
    response: reqwest::Response,
) -> UpscaleResult<Vec<u8>> {
    let status = response.status();
    if !status.is_success() {
        return Err(UpscaleError::status(provider, status.as_u16()));
    }
    let body = response
        .bytes()
        .await
        .map_err(|e| UpscaleError::network(provider, e))?;
    Ok(body.to_vec())
}

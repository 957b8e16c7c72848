//! DeepAI waifu2x endpoint.
//!
//! Request: multipart form with `file`, `scale`, `noise` and `style`, plus an
//! `api-key` header. Success: HTTP 2xx with `{"output_url": "..."}`; the
//! image itself is then fetched from that URL.
//!
//! The API key is never compiled in. Configuration names an environment
//! variable to read it from, and without a key the provider is not built.

use std::fmt;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use super::{RemoteUpscaler, RequestOptions, read_success_body, validate_payload};
use crate::error::{UpscaleError, UpscaleResult};
use crate::factor::ScaleFactor;

pub const NAME: &str = "deepai";
pub const DEFAULT_ENDPOINT: &str = "https://api.deepai.org/api/waifu2x";
pub const DEFAULT_API_KEY_ENV: &str = "DEEPAI_API_KEY";

#[derive(Deserialize)]
struct DeepAiResponse {
    output_url: Option<String>,
}

#[derive(Clone)]
pub struct DeepAiProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    options: RequestOptions,
}

impl DeepAiProvider {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        options: RequestOptions,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            options,
        }
    }

    async fn fetch_output(&self, url: &str) -> UpscaleResult<Vec<u8>> {
        debug!(%url, "fetching deepai output");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UpscaleError::network(NAME, e))?;
        let bytes = read_success_body(NAME, response).await?;
        validate_payload(NAME, bytes)
    }
}

impl fmt::Debug for DeepAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepAiProvider")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

#[async_trait]
impl RemoteUpscaler for DeepAiProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn upscale(&self, image: &[u8], scale: ScaleFactor) -> UpscaleResult<Vec<u8>> {
        let form = Form::new()
            .part("file", Part::bytes(image.to_vec()).file_name("image"))
            .text("scale", scale.get().to_string())
            .text("noise", self.options.noise.get().to_string())
            .text("style", self.options.style.as_str());

        debug!(endpoint = %self.endpoint, %scale, bytes = image.len(), "posting to deepai");
        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UpscaleError::network(NAME, e))?;

        let body = read_success_body(NAME, response).await?;
        let url = output_url(&body)?;
        self.fetch_output(&url).await
    }
}

/// Pull `output_url` out of a 2xx response body.
pub fn output_url(body: &[u8]) -> UpscaleResult<String> {
    let parsed: DeepAiResponse = serde_json::from_slice(body)
        .map_err(|e| UpscaleError::malformed(NAME, format!("invalid JSON: {}", e)))?;
    match parsed.output_url {
        Some(url) if !url.trim().is_empty() => Ok(url),
        _ => Err(UpscaleError::malformed(NAME, "response has no output_url")),
    }
}

//! waifu2x JSON endpoint.
//!
//! Request: `POST {"img": <base64>, "scale": n, "noise": 0..3, "style": "art"|"photo"}`.
//! Success: HTTP 2xx with `{"status": "success", "img": <base64 image>}`.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RemoteUpscaler, RequestOptions, read_success_body, validate_payload};
use crate::error::{UpscaleError, UpscaleResult};
use crate::factor::ScaleFactor;

pub const NAME: &str = "waifu2x";
pub const DEFAULT_ENDPOINT: &str = "https://api.waifu2x.udp.jp/api";

#[derive(Serialize)]
struct Waifu2xRequest<'a> {
    img: &'a str,
    scale: u32,
    noise: u8,
    style: &'a str,
}

#[derive(Deserialize)]
struct Waifu2xResponse {
    status: Option<String>,
    img: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Waifu2xProvider {
    client: reqwest::Client,
    endpoint: String,
    options: RequestOptions,
}

impl Waifu2xProvider {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        options: RequestOptions,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            options,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteUpscaler for Waifu2xProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn upscale(&self, image: &[u8], scale: ScaleFactor) -> UpscaleResult<Vec<u8>> {
        let encoded = general_purpose::STANDARD.encode(image);
        let request = Waifu2xRequest {
            img: &encoded,
            scale: scale.get(),
            noise: self.options.noise.get(),
            style: self.options.style.as_str(),
        };

        debug!(endpoint = %self.endpoint, %scale, bytes = image.len(), "posting to waifu2x");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| UpscaleError::network(NAME, e))?;

        let body = read_success_body(NAME, response).await?;
        interpret_response(&body)
    }
}

/// Extract the image from a 2xx response body.
pub fn interpret_response(body: &[u8]) -> UpscaleResult<Vec<u8>> {
    let parsed: Waifu2xResponse = serde_json::from_slice(body)
        .map_err(|e| UpscaleError::malformed(NAME, format!("invalid JSON: {}", e)))?;

    match parsed.status.as_deref() {
        Some("success") => {}
        other => {
            return Err(UpscaleError::malformed(
                NAME,
                format!("status was {:?}", other.unwrap_or("missing")),
            ));
        }
    }

    let img = parsed
        .img
        .ok_or_else(|| UpscaleError::malformed(NAME, "response has no img field"))?;
    let bytes = general_purpose::STANDARD
        .decode(strip_data_url(&img))
        .map_err(|e| UpscaleError::malformed(NAME, format!("img is not base64: {}", e)))?;
    validate_payload(NAME, bytes)
}

/// Accept both bare base64 and `data:image/...;base64,` URLs.
fn strip_data_url(img: &str) -> &str {
    match img.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\nrest";

    fn body(json: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json).unwrap()
    }

    #[test]
    fn success_body_yields_image_bytes() {
        let img = general_purpose::STANDARD.encode(PNG_MAGIC);
        let out = interpret_response(&body(serde_json::json!({"status": "success", "img": img})))
            .unwrap();
        assert_eq!(out, PNG_MAGIC);
    }

    #[test]
    fn data_url_prefix_is_accepted() {
        let img = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(PNG_MAGIC)
        );
        let out = interpret_response(&body(serde_json::json!({"status": "success", "img": img})))
            .unwrap();
        assert_eq!(out, PNG_MAGIC);
    }

    #[test]
    fn malformed_bodies_are_remote_failures() {
        let cases = [
            b"not json".to_vec(),
            body(serde_json::json!({"status": "error", "img": "AAAA"})),
            body(serde_json::json!({"status": "success"})),
            body(serde_json::json!({"status": "success", "img": "***"})),
            body(serde_json::json!({
                "status": "success",
                "img": general_purpose::STANDARD.encode(b"plain text")
            })),
        ];
        for case in cases {
            let err = interpret_response(&case).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::RemoteUnavailable, "{}", err);
        }
    }
}

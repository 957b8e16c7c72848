//! Common test utilities for the upscaler integration tests
//!
//! Mock providers, counting doubles for the local stages, PNG fixtures and a
//! tiny canned-response HTTP server for provider wire tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hd_scale::{PixelBuffer, PostFilter, ScaleError, SharpenFilter};
use hd_upscaler::ScaleFactor;
use hd_upscaler::codec::{ImageCodec, PngCodec};
use hd_upscaler::error::{UpscaleError, UpscaleResult};
use hd_upscaler::remote::RemoteUpscaler;
use image::{ImageFormat, RgbaImage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// PNG fixtures
pub mod fixtures {
    use super::*;

    /// Encode a solid-colour PNG.
    pub fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    /// Encode a PNG whose colour varies per pixel.
    pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x * 16) as u8, (y * 16) as u8, ((x + y) * 8) as u8, 255])
        });
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    pub fn decode(bytes: &[u8]) -> RgbaImage {
        image::load_from_memory(bytes).unwrap().into_rgba8()
    }
}

/// How a [`MockProvider`] answers.
#[derive(Clone, Debug)]
pub enum Behavior {
    Return(Vec<u8>),
    NetworkError,
    Status(u16),
    Malformed,
    /// Never answers
    Hang,
}

/// Provider double that records how often it was called.
pub struct MockProvider {
    name: String,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
    log: Option<Arc<Mutex<Vec<String>>>>,
}

impl MockProvider {
    pub fn new(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
            log: None,
        }
    }

    /// Shared call counter, readable after the provider moved into a pipeline.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Append this provider's name to `log` on every call.
    pub fn logging_to(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.log = Some(log);
        self
    }
}

#[async_trait]
impl RemoteUpscaler for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upscale(&self, _image: &[u8], _scale: ScaleFactor) -> UpscaleResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.lock().unwrap().push(self.name.clone());
        }
        match &self.behavior {
            Behavior::Return(bytes) => Ok(bytes.clone()),
            Behavior::NetworkError => Err(UpscaleError::network(
                &self.name,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            )),
            Behavior::Status(code) => Err(UpscaleError::status(&self.name, *code)),
            Behavior::Malformed => Err(UpscaleError::malformed(
                &self.name,
                "response has no img field",
            )),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(UpscaleError::status(&self.name, 504))
            }
        }
    }
}

/// Shared counters for the local stages.
#[derive(Clone, Default)]
pub struct StageCounters {
    pub decodes: Arc<AtomicUsize>,
    pub encodes: Arc<AtomicUsize>,
    pub filters: Arc<AtomicUsize>,
}

impl StageCounters {
    pub fn total(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
            + self.encodes.load(Ordering::SeqCst)
            + self.filters.load(Ordering::SeqCst)
    }
}

/// PNG codec that counts its calls.
pub struct CountingCodec(pub StageCounters);

impl ImageCodec for CountingCodec {
    fn decode(&self, bytes: &[u8]) -> UpscaleResult<PixelBuffer> {
        self.0.decodes.fetch_add(1, Ordering::SeqCst);
        PngCodec.decode(bytes)
    }

    fn encode(&self, buffer: &PixelBuffer) -> UpscaleResult<Vec<u8>> {
        self.0.encodes.fetch_add(1, Ordering::SeqCst);
        PngCodec.encode(buffer)
    }
}

/// Sharpen filter that counts its calls.
pub struct CountingFilter(pub StageCounters);

impl PostFilter for CountingFilter {
    fn name(&self) -> &str {
        "counting-sharpen"
    }

    fn apply(&self, buffer: &PixelBuffer) -> Result<PixelBuffer, ScaleError> {
        self.0.filters.fetch_add(1, Ordering::SeqCst);
        SharpenFilter.apply(buffer)
    }
}

/// Filter that always panics.
pub struct PanickingFilter;

impl PostFilter for PanickingFilter {
    fn name(&self) -> &str {
        "panicking"
    }

    fn apply(&self, _buffer: &PixelBuffer) -> Result<PixelBuffer, ScaleError> {
        panic!("filter exploded");
    }
}

/// Codec whose encoder always fails.
pub struct BrokenEncoder;

impl ImageCodec for BrokenEncoder {
    fn decode(&self, bytes: &[u8]) -> UpscaleResult<PixelBuffer> {
        PngCodec.decode(bytes)
    }

    fn encode(&self, _buffer: &PixelBuffer) -> UpscaleResult<Vec<u8>> {
        Err(UpscaleError::encode(std::io::Error::other("disk full")))
    }
}

/// One canned HTTP response.
#[derive(Clone, Debug)]
pub struct Canned {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Canned {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
        }
    }

    pub fn bytes(status: u16, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }
}

/// A request as the server saw it.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub head: String,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

/// Minimal HTTP/1.1 server answering one connection per canned response.
pub struct TestServer {
    listener: TcpListener,
    base: String,
}

impl TestServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        Self { listener, base }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Serve `responses` in order, then stop accepting.
    pub fn serve(self, responses: Vec<Canned>) -> (JoinHandle<()>, Arc<Mutex<Vec<Recorded>>>) {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&recorded);
        let handle = tokio::spawn(async move {
            for canned in responses {
                let Ok((mut stream, _)) = self.listener.accept().await else {
                    return;
                };
                let request = read_request(&mut stream).await;
                sink.lock().unwrap().push(request);

                let head = format!(
                    concat!(
                        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\n",
                        "Content-Length: {}\r\nConnection: close\r\n\r\n",
                    ),
                    canned.status,
                    reason_phrase(canned.status),
                    canned.content_type,
                    canned.body.len()
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(&canned.body).await;
                let _ = stream.shutdown().await;
            }
        });
        (handle, recorded)
    }
}

/// A URL nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api", addr)
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> Recorded {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break buf.len(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let recorded = Recorded {
        head,
        body: Vec::new(),
    };
    let content_length = recorded
        .header("content-length")
        .and_then(|v| v.parse::<usize>().ok());
    let chunked = recorded
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));

    loop {
        let body = &buf[header_end..];
        let complete = match content_length {
            Some(len) => body.len() >= len,
            None if chunked => body.ends_with(b"0\r\n\r\n"),
            None => true,
        };
        if complete {
            break;
        }
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    Recorded {
        body: buf[header_end..].to_vec(),
        ..recorded
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

//! Background-image fetching with request-level supersession.
//!
//! DESIGN
//! ======
//! Each document has one background slot. `AssetFetcher::fetch` stamps every
//! request with a fresh, monotonically increasing `FetchToken`, aborts any
//! request still outstanding for the slot, and runs transport + decode on the
//! Tokio runtime. Completions come back over a channel that only the owning
//! document drains, so they are applied on the document's own task one at a
//! time. A completion is accepted only if its token is still the slot's
//! current token; anything else is discarded, even when two requests name the
//! same URL or finish out of order.
//!
//! ERROR HANDLING
//! ==============
//! Transport and decode failures become `FetchError` values delivered like any
//! other completion. They are recoverable: the slot simply has no image.

#[cfg(test)]
#[path = "fetch_test.rs"]
mod fetch_test;

use std::sync::Arc;
use std::time::Duration;

use canvas::camera::Size;
use image::RgbaImage;
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::FetchLimits;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("fetch transport failed: {0}")]
    TransportFailed(String),
    #[error("image decode failed: {0}")]
    DecodeFailed(String),
}

/// A decoded background image, cheap to clone.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<RgbaImage>,
}

impl DecodedImage {
    /// Natural size in pixels, for zoom-to-fit.
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// Identifies one issued request. Later requests always carry larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchToken(u64);

/// Outcome of one request, tagged with the token it was issued under.
#[derive(Debug)]
pub struct FetchCompletion {
    pub token: FetchToken,
    pub url: String,
    pub result: Result<DecodedImage, FetchError>,
}

/// Retrieves raw bytes for a URL.
#[async_trait::async_trait]
pub trait ByteSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

// =============================================================================
// URL SOURCE
// =============================================================================

/// Fetches `http(s)` URLs with `reqwest` and reads `file` URLs from disk.
pub struct UrlByteSource {
    http: reqwest::Client,
    max_bytes: usize,
}

impl UrlByteSource {
    /// Build a source with the given timeouts and size cap.
    ///
    /// # Errors
    ///
    /// Returns `TransportFailed` if the HTTP client cannot be built.
    pub fn new(limits: FetchLimits) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(limits.request_secs))
            .connect_timeout(Duration::from_secs(limits.connect_secs))
            .build()
            .map_err(|e| FetchError::TransportFailed(format!("http client build: {e}")))?;
        Ok(Self { http, max_bytes: limits.max_bytes })
    }

    async fn fetch_http(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::TransportFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::TransportFailed(format!("status {}", status.as_u16())));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::TransportFailed(e.to_string()))?
        {
            body.extend_from_slice(&chunk);
            if body.len() > self.max_bytes {
                return Err(self.too_large());
            }
        }
        Ok(body)
    }

    async fn fetch_file(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let path = url
            .to_file_path()
            .map_err(|()| FetchError::TransportFailed(format!("not a local path: {url}")))?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| FetchError::TransportFailed(format!("{}: {e}", path.display())))?;
        if usize::try_from(meta.len()).map_or(true, |len| len > self.max_bytes) {
            return Err(self.too_large());
        }
        tokio::fs::read(&path)
            .await
            .map_err(|e| FetchError::TransportFailed(format!("{}: {e}", path.display())))
    }

    fn too_large(&self) -> FetchError {
        FetchError::TransportFailed(format!("body exceeds {} bytes", self.max_bytes))
    }
}

#[async_trait::async_trait]
impl ByteSource for UrlByteSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::TransportFailed(format!("bad url {url:?}: {e}")))?;
        match parsed.scheme() {
            "http" | "https" => self.fetch_http(parsed).await,
            "file" => self.fetch_file(&parsed).await,
            other => Err(FetchError::TransportFailed(format!("unsupported scheme: {other}"))),
        }
    }
}

// =============================================================================
// DECODE / URL HELPERS
// =============================================================================

/// Decode encoded image bytes (PNG, JPEG, GIF, WebP) into RGBA pixels.
///
/// # Errors
///
/// Returns `DecodeFailed` if the format is unknown or the data is corrupt.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, FetchError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| FetchError::DecodeFailed(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    Ok(DecodedImage { width: rgba.width(), height: rgba.height(), pixels: Arc::new(rgba) })
}

/// Resolve the image a dropped URL points at.
///
/// Search-result links carry the real image in an `imgurl` query parameter;
/// when present and itself a valid URL it wins. Otherwise the URL is returned
/// without its fragment. Unparseable input is returned trimmed.
#[must_use]
pub fn image_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    let embedded = url
        .query_pairs()
        .find(|(k, _)| k == "imgurl")
        .and_then(|(_, v)| Url::parse(&v).ok());
    if let Some(inner) = embedded {
        return inner.to_string();
    }
    url.set_fragment(None);
    url.to_string()
}

// =============================================================================
// FETCHER
// =============================================================================

struct InFlight {
    token: FetchToken,
    url: String,
    handle: JoinHandle<()>,
}

/// Issues background fetches for one slot and filters their completions.
pub struct AssetFetcher {
    source: Arc<dyn ByteSource>,
    tx: mpsc::UnboundedSender<FetchCompletion>,
    rx: mpsc::UnboundedReceiver<FetchCompletion>,
    last_token: u64,
    in_flight: Option<InFlight>,
}

impl AssetFetcher {
    #[must_use]
    pub fn new(source: Arc<dyn ByteSource>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { source, tx, rx, last_token: 0, in_flight: None }
    }

    /// Start fetching `url`, superseding any outstanding request.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn fetch(&mut self, url: &str) -> FetchToken {
        self.cancel();
        self.last_token += 1;
        let token = FetchToken(self.last_token);

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let task_url = url.to_string();
        let handle = tokio::spawn(async move {
            let result = match source.fetch(&task_url).await {
                Ok(bytes) => tokio::task::spawn_blocking(move || decode_image(&bytes))
                    .await
                    .unwrap_or_else(|e| Err(FetchError::DecodeFailed(format!("decode task failed: {e}")))),
                Err(e) => Err(e),
            };
            if tx.send(FetchCompletion { token, url: task_url, result }).is_err() {
                debug!("fetch completion dropped; document closed");
            }
        });

        debug!(token = token.0, %url, "background fetch issued");
        self.in_flight = Some(InFlight { token, url: url.to_string(), handle });
        token
    }

    /// Abandon the outstanding request, if any. Its completion, should one
    /// still arrive, will be discarded.
    pub fn cancel(&mut self) {
        if let Some(prev) = self.in_flight.take() {
            prev.handle.abort();
            debug!(token = prev.token.0, url = %prev.url, "background fetch superseded");
        }
    }

    /// Token of the request whose completion would currently be accepted.
    #[must_use]
    pub fn current_token(&self) -> Option<FetchToken> {
        self.in_flight.as_ref().map(|f| f.token)
    }

    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Filter a completion against the slot's current token.
    ///
    /// Returns the result if it belongs to the current request (which then
    /// stops being outstanding), `None` if it is stale.
    pub fn accept(&mut self, completion: FetchCompletion) -> Option<Result<DecodedImage, FetchError>> {
        if self.current_token() != Some(completion.token) {
            debug!(token = completion.token.0, url = %completion.url, "discarding stale fetch completion");
            return None;
        }
        self.in_flight = None;
        if let Err(e) = &completion.result {
            warn!(error = %e, url = %completion.url, "background fetch failed");
        }
        Some(completion.result)
    }

    /// Take a completion that has already arrived, without waiting.
    pub fn try_next(&mut self) -> Option<FetchCompletion> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next completion. Returns `None` immediately when nothing
    /// is outstanding.
    pub async fn next(&mut self) -> Option<FetchCompletion> {
        if self.in_flight.is_none() {
            return None;
        }
        self.rx.recv().await
    }
}

impl Drop for AssetFetcher {
    fn drop(&mut self) {
        self.cancel();
    }
}

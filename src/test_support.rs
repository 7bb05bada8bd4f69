//! Fakes shared by the root crate's unit tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageFormat, RgbaImage};
use tokio::sync::Notify;

use crate::fetch::{ByteSource, FetchError};
use crate::kv::{KvStore, StorageError};

/// PNG bytes of a blank `width` x `height` image.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::new(width, height))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Fresh directory under the system temp dir.
pub fn temp_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("emojiart-{tag}-{}", uuid::Uuid::new_v4()))
}

// =============================================================================
// BYTE SOURCES
// =============================================================================

/// Serves fixed responses per URL; unknown URLs are transport failures.
#[derive(Default)]
pub struct StaticSource {
    responses: HashMap<String, Result<Vec<u8>, FetchError>>,
}

impl StaticSource {
    pub fn with(mut self, url: &str, response: Result<Vec<u8>, FetchError>) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }
}

#[async_trait::async_trait]
impl ByteSource for StaticSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::TransportFailed(format!("no route: {url}"))))
    }
}

/// Holds each URL's response until the test opens its gate.
#[derive(Default)]
pub struct GatedSource {
    inner: StaticSource,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl GatedSource {
    pub fn with(mut self, url: &str, response: Result<Vec<u8>, FetchError>) -> Self {
        self.inner = self.inner.with(url, response);
        self
    }

    fn gate(&self, url: &str) -> Arc<Notify> {
        let mut gates = self.gates.lock().unwrap();
        Arc::clone(gates.entry(url.to_string()).or_default())
    }

    /// Let one pending (or the next) request for `url` finish.
    pub fn release(&self, url: &str) {
        self.gate(url).notify_one();
    }
}

#[async_trait::async_trait]
impl ByteSource for GatedSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.gate(url).notified().await;
        self.inner.fetch(url).await
    }
}

// =============================================================================
// STORAGE
// =============================================================================

/// Reads nothing, fails every write.
pub struct FailingKv;

impl KvStore for FailingKv {
    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(None)
    }

    fn set(&self, key: &str, _value: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::other(format!("disk full writing {key}"))))
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::other(format!("disk full deleting {key}"))))
    }
}

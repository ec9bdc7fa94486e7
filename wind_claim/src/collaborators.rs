// THEORY:
// The claim pipeline owns none of its I/O. Getting pixels for a URL and
// asking a vision service what it sees are both external capabilities,
// expressed here as two traits and injected into `ClaimPipeline` at
// construction time:
//
// - `ImageFetcher`: URL -> decoded RGB pixels, or a `FetchError`.
// - `LabelSource`: decoded pixels -> `(name, confidence)` labels, or a
//   `LabelError`.
//
// Implementations are built once per process and shared across claims behind
// an `Arc`; none of them keeps per-claim mutable state.

use crate::core_modules::damage_label::VisionLabel;
use crate::error::{FetchError, LabelError};
use image::RgbImage;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const FILE_SCHEME: &str = "file://";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Source of decoded photo pixels.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<RgbImage, FetchError>> + Send;
}

/// Source of vision labels for a decoded photo.
pub trait LabelSource: Send + Sync {
    fn detect_labels(
        &self,
        source_url: &str,
        image: &RgbImage,
    ) -> impl Future<Output = Result<Vec<VisionLabel>, LabelError>> + Send;
}

fn decode(url: &str, bytes: &[u8]) -> Result<RgbImage, FetchError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
}

/// Fetches photos over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Http {
                url: "client_init".into(),
                source,
            })?;
        Ok(Self { http })
    }

    pub fn with_default_timeout() -> Result<Self, FetchError> {
        Self::new(DEFAULT_HTTP_TIMEOUT)
    }
}

impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<RgbImage, FetchError> {
        let resp = self.http.get(url).send().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let bytes = resp.bytes().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;
        debug!(url, bytes = bytes.len(), "fetched image");
        decode(url, &bytes)
    }
}

/// Reads photos from the local filesystem. Accepts bare paths and `file://`
/// URLs; relative paths resolve against `root` when one is set.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = PathBuf::from(url.strip_prefix(FILE_SCHEME).unwrap_or(url));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}

impl ImageFetcher for FileFetcher {
    async fn fetch(&self, url: &str) -> Result<RgbImage, FetchError> {
        let path = self.resolve(url);
        let bytes = tokio::fs::read(&path).await.map_err(|source| FetchError::Io {
            path: path.display().to_string(),
            source,
        })?;
        decode(url, &bytes)
    }
}

/// Dispatches on the URL scheme: `http`/`https` go over the network, `file`
/// URLs and bare paths go to disk, anything else is rejected.
#[derive(Debug, Clone)]
pub struct RoutingFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl RoutingFetcher {
    pub fn new(http: HttpFetcher, file: FileFetcher) -> Self {
        Self { http, file }
    }
}

impl ImageFetcher for RoutingFetcher {
    async fn fetch(&self, url: &str) -> Result<RgbImage, FetchError> {
        let lower = url.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            self.http.fetch(url).await
        } else if lower.starts_with(FILE_SCHEME) || !url.contains("://") {
            self.file.fetch(url).await
        } else {
            Err(FetchError::UnsupportedLocation(url.to_string()))
        }
    }
}

/// Serves precomputed vision labels keyed by source URL. Deserializes from a
/// `{ "<url>": [{ "name": ..., "confidence": ... }] }` document. URLs without an
/// entry get an empty label list, which reads as "no damage, unknown area".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct StaticLabelSource {
    labels: HashMap<String, Vec<VisionLabel>>,
}

impl StaticLabelSource {
    pub fn insert(&mut self, source_url: impl Into<String>, labels: Vec<VisionLabel>) {
        self.labels.insert(source_url.into(), labels);
    }
}

impl LabelSource for StaticLabelSource {
    async fn detect_labels(&self, source_url: &str, _image: &RgbImage) -> Result<Vec<VisionLabel>, LabelError> {
        Ok(self.labels.get(source_url).cloned().unwrap_or_default())
    }
}

//! Artifact fetching
//!
//! Wheels are fetched from an [`ArtifactStore`] (HTTP(S) or the local
//! filesystem) with checksum verification, bounded parallelism, and retry
//! with exponential backoff.

use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::defaults;
use crate::error::FetchError;
use crate::infra::filesystem;

/// Source of wheel artifacts
#[allow(async_fn_in_trait)]
pub trait ArtifactStore {
    /// Full content of the artifact at `location`
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError>;

    /// Whether `location` exists
    async fn exists(&self, location: &str) -> bool;
}

/// Artifacts served over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .connect_timeout(Duration::from_secs(30))
                .user_agent(concat!("pyodide-lock/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

impl Default for HttpStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactStore for HttpStore {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError> {
        let network = |error: String| FetchError::Network {
            location: location.to_string(),
            error,
        };

        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|e| network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                location: location.to_string(),
            });
        }
        if !status.is_success() {
            return Err(network(format!("HTTP {status}")));
        }

        let capacity = usize::try_from(response.content_length().unwrap_or(0)).unwrap_or(0);
        let mut content = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| network(e.to_string()))?;
            content.extend_from_slice(&chunk);
        }
        Ok(content)
    }

    async fn exists(&self, location: &str) -> bool {
        self.client
            .head(location)
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }
}

/// Artifacts on the local filesystem, as paths or `file://` URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl FileStore {
    /// Filesystem path for a plain path or `file://` URL
    pub fn resolve(location: &str) -> Result<PathBuf, FetchError> {
        if location.starts_with("file:") {
            let url = reqwest::Url::parse(location).map_err(|e| FetchError::Network {
                location: location.to_string(),
                error: e.to_string(),
            })?;
            url.to_file_path().map_err(|()| FetchError::Network {
                location: location.to_string(),
                error: "not a local file URL".to_string(),
            })
        } else {
            Ok(PathBuf::from(location))
        }
    }
}

impl ArtifactStore for FileStore {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError> {
        let path = Self::resolve(location)?;
        match tokio::fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotFound {
                location: location.to_string(),
            }),
            Err(e) => Err(FetchError::Io {
                path,
                error: e.to_string(),
            }),
        }
    }

    async fn exists(&self, location: &str) -> bool {
        match Self::resolve(location) {
            Ok(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// Dispatches to [`HttpStore`] or [`FileStore`] by URL scheme
#[derive(Debug, Clone, Default)]
pub struct DefaultStore {
    http: HttpStore,
    file: FileStore,
}

fn is_http(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

impl ArtifactStore for DefaultStore {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError> {
        if is_http(location) {
            self.http.fetch(location).await
        } else {
            self.file.fetch(location).await
        }
    }

    async fn exists(&self, location: &str) -> bool {
        if is_http(location) {
            self.http.exists(location).await
        } else {
            self.file.exists(location).await
        }
    }
}

/// Download result containing file path and metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Where the artifact came from
    pub location: String,
    /// Path to the downloaded file
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// SHA256 checksum of the downloaded content
    pub checksum: String,
}

/// One artifact to place at `dest`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub location: String,
    pub dest: PathBuf,
    /// Verified when present
    pub expected_sha256: Option<String>,
}

/// Download manager for fetching files with retry and parallel support
#[derive(Debug, Clone)]
pub struct DownloadManager<S = DefaultStore> {
    store: S,
    /// Maximum attempts per artifact
    max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds)
    base_delay_ms: u64,
}

impl DownloadManager<DefaultStore> {
    /// Create a new download manager
    pub fn new() -> Self {
        Self::with_config(defaults::MAX_DOWNLOAD_RETRIES, defaults::RETRY_BASE_DELAY_MS)
    }

    /// Create a download manager with custom settings
    pub fn with_config(max_retries: u32, base_delay_ms: u64) -> Self {
        Self::with_store(DefaultStore::default(), max_retries, base_delay_ms)
    }
}

impl Default for DownloadManager<DefaultStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ArtifactStore> DownloadManager<S> {
    /// Download manager over a custom store
    pub fn with_store(store: S, max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            store,
            max_retries,
            base_delay_ms,
        }
    }

    /// Get max retries
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch with retry logic
    ///
    /// Only transient failures are retried; a missing artifact fails at once.
    pub async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchError> {
        let max_attempts = self.max_retries.max(1);
        let mut attempts = 0;
        let mut delay_ms = self.base_delay_ms;

        loop {
            attempts += 1;

            match self.store.fetch(location).await {
                Ok(content) => return Ok(content),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempts >= max_attempts => {
                    return Err(FetchError::RetriesExhausted {
                        location: location.to_string(),
                        attempts,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::debug!("Attempt {attempts} for {location} failed: {e}");
                    // Exponential backoff with cap at 30 seconds
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * 2).min(30_000);
                }
            }
        }
    }

    /// Fetch `location` and write it to `dest`
    pub async fn download(
        &self,
        location: &str,
        dest: &Path,
    ) -> Result<DownloadResult, FetchError> {
        self.download_checked(location, dest, None).await
    }

    /// Download a file and verify its checksum
    ///
    /// `dest` is only replaced by content that matches `expected_checksum`.
    pub async fn download_verified(
        &self,
        location: &str,
        dest: &Path,
        expected_checksum: &str,
    ) -> Result<DownloadResult, FetchError> {
        self.download_checked(location, dest, Some(expected_checksum))
            .await
    }

    async fn download_checked(
        &self,
        location: &str,
        dest: &Path,
        expected_checksum: Option<&str>,
    ) -> Result<DownloadResult, FetchError> {
        tracing::debug!("Fetching {location} to {}", dest.display());
        let content = self.fetch(location).await?;

        let checksum = compute_checksum(&content);
        if let Some(expected) = expected_checksum {
            if !checksum.eq_ignore_ascii_case(expected) {
                return Err(FetchError::ChecksumMismatch {
                    location: location.to_string(),
                    expected: expected.to_lowercase(),
                    actual: checksum,
                });
            }
        }

        let size = content.len() as u64;
        let io_err = |error: String| FetchError::Io {
            path: dest.to_path_buf(),
            error,
        };
        let path = dest.to_path_buf();
        tokio::task::spawn_blocking(move || filesystem::write_atomic(&path, &content))
            .await
            .map_err(|e| io_err(e.to_string()))?
            .map_err(|e| io_err(e.to_string()))?;

        Ok(DownloadResult {
            location: location.to_string(),
            path: dest.to_path_buf(),
            size,
            checksum,
        })
    }

    async fn download_request(
        &self,
        request: DownloadRequest,
    ) -> Result<DownloadResult, FetchError> {
        let expected = request
            .expected_sha256
            .as_deref()
            .filter(|sha256| !sha256.is_empty());
        let Some(expected) = expected else {
            return self.download(&request.location, &request.dest).await;
        };

        if request.dest.is_file() && verify_checksum(&request.dest, expected)? {
            tracing::debug!("{} is up to date", request.dest.display());
            let size = std::fs::metadata(&request.dest)
                .map(|m| m.len())
                .map_err(|e| FetchError::Io {
                    path: request.dest.clone(),
                    error: e.to_string(),
                })?;
            return Ok(DownloadResult {
                location: request.location.clone(),
                path: request.dest.clone(),
                size,
                checksum: expected.to_lowercase(),
            });
        }

        self.download_verified(&request.location, &request.dest, expected)
            .await
    }

    /// Download several artifacts, at most `max_parallel` at a time
    ///
    /// Results are returned in request order.
    pub async fn download_parallel(
        &self,
        requests: Vec<DownloadRequest>,
        max_parallel: usize,
    ) -> Vec<Result<DownloadResult, FetchError>> {
        futures::stream::iter(requests)
            .map(|request| self.download_request(request))
            .buffered(max_parallel.max(1))
            .collect()
            .await
    }
}

/// Verify SHA256 checksum of a file
pub fn verify_checksum(path: &Path, expected: &str) -> Result<bool, FetchError> {
    let actual = filesystem::sha256_file(path).map_err(|e| FetchError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(actual.eq_ignore_ascii_case(expected))
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

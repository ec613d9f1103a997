//! On-disk cache for network fetches.
//!
//! Cache files live under `<cache-root>/buckets/`, named by escaping the
//! source URL. Freshness is judged purely from the file's modification time;
//! a failed refresh falls back to stale contents when any exist. Concurrent
//! invocations may race on writes, which is acceptable for a best-effort
//! cache.

use log::{info, warn};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Characters kept verbatim when escaping a URL into a file name.
const FILENAME_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Why a network fetch could not produce data.
#[derive(Debug)]
pub enum FetchError {
    /// Request never completed (connect, DNS, timeout, ...).
    Network(reqwest::Error),
    /// The server answered with a non-success status.
    Status(reqwest::StatusCode),
    /// The response could not be written to the cache file.
    Io(std::io::Error),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(err) => write!(f, "request failed: {}", err),
            FetchError::Status(status) => write!(f, "failed to fetch data: {}", status),
            FetchError::Io(err) => write!(f, "couldn't write cache file: {}", err),
        }
    }
}

impl std::error::Error for FetchError {}

/// TTL-based file cache for downloaded buckets.
pub struct CacheStore {
    dir: PathBuf,
    ttl: Duration,
    client: reqwest::Client,
}

impl CacheStore {
    pub fn new(dir: PathBuf, ttl: Duration, client: reqwest::Client) -> Self {
        Self { dir, ttl, client }
    }

    /// Cache file path for `url`, with the given extension (`zip`, `html`).
    pub fn cache_path(&self, url: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", escape_url(url), ext))
    }

    /// Local checkout path for a git repository URL.
    pub fn repo_path(&self, url: &str) -> PathBuf {
        self.dir.join(escape_url(url))
    }

    /// Creates the cache directory if needed.
    pub fn ensure_dir(&self) -> Result<(), FetchError> {
        fs::create_dir_all(&self.dir).map_err(FetchError::Io)
    }

    /// Ensures `cache_path` holds a usable copy of `url`.
    ///
    /// A file younger than the TTL is used as-is with no network call.
    /// Otherwise the URL is fetched and the file overwritten; if the fetch
    /// fails but a stale file exists, the stale file is kept with a warning.
    /// The error is surfaced only when there is nothing to fall back to.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, cache_path: &Path, url: &str) -> Result<(), FetchError> {
        if let Some(age) = file_age(cache_path)
            && age <= self.ttl
        {
            info!(
                "using {} old cache: {}",
                format_age(age),
                cache_path.display()
            );
            return Ok(());
        }

        info!("downloading: {}", url);
        match self.download(url, cache_path).await {
            Ok(()) => Ok(()),
            Err(err) if cache_path.exists() => {
                warn!(
                    "download of {} failed ({}), using stale cache from {} ago",
                    url,
                    err,
                    file_age(cache_path).map(format_age).unwrap_or_default()
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn download(&self, url: &str, cache_path: &Path) -> Result<(), FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await.map_err(FetchError::Network)?;
        self.ensure_dir()?;
        fs::write(cache_path, &body).map_err(FetchError::Io)
    }
}

/// Escapes a URL into a single path component, like `QueryEscape` but with
/// spaces percent-encoded too.
pub fn escape_url(url: &str) -> String {
    utf8_percent_encode(url, FILENAME_SAFE).to_string()
}

fn file_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}

/// Renders an age as the largest sensible unit: `3d`, `7h` or `42m`.
pub fn format_age(age: Duration) -> String {
    let minutes = age.as_secs() / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    if days > 0 {
        format!("{}d", days)
    } else if hours > 0 {
        format!("{}h", hours)
    } else {
        format!("{}m", minutes)
    }
}

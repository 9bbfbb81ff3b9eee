//! HTTP client wrapper for fetching attachments.
//!
//! This module provides the `HttpClient` struct which streams a GET response
//! into a `.part` scratch file and renames it into place once the body is
//! complete, so a final path only ever holds a whole file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, PARTIAL_SUFFIX, REQUEST_TIMEOUT_SECS};
use super::error::FetchError;
use crate::user_agent;

/// HTTP client for streaming attachments to disk.
///
/// This client is designed to be created once and shared by every worker,
/// taking advantage of connection pooling. Cloning is cheap.
///
/// # Example
///
/// ```no_run
/// use harvester_core::download::HttpClient;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::with_timeouts(30, 300)?;
/// let bytes = client
///     .fetch_to_file("https://cdn.discordapp.com/attachments/1/2/cat.png", Path::new("./png/cat.png"))
///     .await?;
/// println!("wrote {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with default timeouts (30 s connect, 300 s request).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static configuration.
    /// This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a client with explicit timeout values in seconds.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    pub fn with_timeouts(
        connect_timeout_secs: u64,
        request_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(request_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()?;
        Ok(Self { client })
    }

    /// Fetches `url` with a plain GET and writes the body to `dest`.
    ///
    /// The body is streamed into `dest` with a `.part` suffix appended, then
    /// renamed onto `dest`. On any failure the scratch file is removed and
    /// `dest` is left untouched. The parent directory must already exist.
    ///
    /// # Returns
    ///
    /// The number of body bytes written.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server returns a non-2xx status
    /// - Writing or renaming on disk fails
    #[instrument(skip(self, dest), fields(url = %url, dest = %dest.display()))]
    pub async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = self.send_request(url).await?;

        let part_path = partial_path(dest);
        let mut file = File::create(&part_path)
            .await
            .map_err(|e| FetchError::io(part_path.clone(), e))?;

        let streamed = stream_to_file(&mut file, response, url, &part_path).await;
        drop(file);

        let bytes_written = match streamed {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %part_path.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&part_path, dest).await {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(FetchError::io(dest, e));
        }

        debug!(bytes = bytes_written, "fetch complete");
        Ok(bytes_written)
    }

    async fn send_request(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

/// Returns the scratch path a body is streamed into before the final rename.
#[must_use]
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Streams response body to file, returning bytes written.
///
/// This is extracted to enable cleanup on error in the caller.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(file_path, e))?;

    Ok(bytes_written)
}

//! WADO-RS frame retrieval over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use tracing::debug;
use url::Url;

use super::multipart::extract_frame;
use super::FrameSource;
use crate::error::TileError;
use crate::index::FrameReference;

/// Media type requested for frames.
pub const FRAME_ACCEPT: &str = "multipart/related; type=\"image/png\"";

/// Default timeout for a single frame request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// DICOMweb (WADO-RS) implementation of FrameSource.
///
/// Frames are retrieved from
/// `{series_url}/instances/{SOPInstanceUID}/frames/{frameNumber}`. The
/// timeout applies to the whole request including the body. Failed requests
/// are not retried.
#[derive(Clone)]
pub struct DicomWebFrameSource {
    client: reqwest::Client,
    series_url: String,
}

impl DicomWebFrameSource {
    /// Create a source for the series at `series_url`.
    ///
    /// Returns an error if the URL is not an absolute http(s) URL or the
    /// HTTP client cannot be created.
    pub fn new(series_url: &str, timeout: Duration) -> Result<Self, TileError> {
        let parsed = Url::parse(series_url).map_err(|e| TileError::InvalidUrl {
            url: series_url.to_string(),
            message: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TileError::InvalidUrl {
                url: series_url.to_string(),
                message: format!("unsupported scheme {:?}", parsed.scheme()),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TileError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            series_url: series_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a source with the default fetch timeout.
    pub fn with_default_timeout(series_url: &str) -> Result<Self, TileError> {
        Self::new(series_url, DEFAULT_FETCH_TIMEOUT)
    }

    /// Series base URL, without trailing slash.
    pub fn series_url(&self) -> &str {
        &self.series_url
    }

    /// Retrieval URL of a frame.
    pub fn frame_url(&self, reference: &FrameReference) -> String {
        format!("{}/instances/{}", self.series_url, reference)
    }
}

fn request_error(url: &str, error: reqwest::Error) -> TileError {
    if error.is_timeout() {
        TileError::Timeout {
            url: url.to_string(),
        }
    } else {
        TileError::Connection(error.to_string())
    }
}

#[async_trait]
impl FrameSource for DicomWebFrameSource {
    async fn fetch_frame(&self, reference: &FrameReference) -> Result<Bytes, TileError> {
        let url = self.frame_url(reference);
        debug!(url = %url, "Fetching frame");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, FRAME_ACCEPT)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TileError::Http {
                url,
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| request_error(&url, e))?;

        debug!(url = %url, bytes = body.len(), "Fetched frame");
        extract_frame(content_type.as_deref(), body)
    }

    fn identifier(&self) -> &str {
        &self.series_url
    }
}

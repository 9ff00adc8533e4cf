//! Transport seam for frame retrieval.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TileError;
use crate::index::FrameReference;

/// Trait for fetching the encoded payload of a single frame.
///
/// This abstraction keeps tile access independent of the transport. The
/// returned bytes are an encoded image (PNG or JPEG), already stripped of
/// any multipart framing. Implementations must be thread-safe so that tile
/// requests can run concurrently.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Fetch the encoded frame addressed by `reference`.
    async fn fetch_frame(&self, reference: &FrameReference) -> Result<Bytes, TileError>;

    /// Get a unique identifier for this source (for logging).
    ///
    /// For DICOMweb, this is the series base URL.
    fn identifier(&self) -> &str;
}

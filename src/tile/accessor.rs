//! Tile accessor resolving tile requests against a pyramid index.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileAccessor                            │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                    get_tile()                           │    │
//! │  │  1. Resolve level     3. Fetch frame                    │    │
//! │  │  2. Look up frame     4. Decode & mask padding          │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌──────────────┐   ┌──────────────┐    ┌──────────────────┐  │
//! │    │ PyramidIndex │   │ FrameSource  │    │  FrameDecoder    │  │
//! │    └──────────────┘   └──────────────┘    └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use image::RgbaImage;
use tracing::debug;

use crate::error::TileError;
use crate::index::{FrameReference, PyramidIndex, PyramidLevel};
use crate::io::FrameSource;

use super::decoder::{mask_padding, FrameDecoder};

// =============================================================================
// Tile Request
// =============================================================================

/// A request for one tile of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    /// Signed zoom: 0 is the base level, `|zoom|` counts levels below it
    pub zoom: i32,

    /// Tile X coordinate (0-indexed from left)
    pub tile_x: u32,

    /// Tile Y coordinate (0-indexed from top)
    pub tile_y: u32,

    /// Channel identifier (optical path identifier, segment number or
    /// mapping number)
    pub channel: String,
}

impl TileRequest {
    pub fn new(zoom: i32, tile_x: u32, tile_y: u32, channel: impl Into<String>) -> Self {
        Self {
            zoom,
            tile_x,
            tile_y,
            channel: channel.into(),
        }
    }
}

// =============================================================================
// Tile Image
// =============================================================================

/// A decoded tile ready for display.
#[derive(Debug, Clone)]
pub struct TileImage {
    /// Index of the level in the pyramid (0 = lowest resolution)
    pub level: usize,

    pub tile_x: u32,
    pub tile_y: u32,
    pub channel: String,

    /// Frame the tile was decoded from
    pub frame: FrameReference,

    /// Width of the region inside the total pixel matrix
    pub visible_width: u32,

    /// Height of the region inside the total pixel matrix
    pub visible_height: u32,

    /// Decoded RGBA pixels, padding painted black
    pub image: RgbaImage,
}

// =============================================================================
// Tile Accessor
// =============================================================================

/// Resolves tile requests to frames and turns them into displayable bitmaps.
///
/// The accessor is cheap to share: the index is behind an [`Arc`] and never
/// mutated, so concurrent `get_tile` calls need no coordination.
pub struct TileAccessor<F> {
    index: Arc<PyramidIndex>,
    source: F,
    decoder: FrameDecoder,
}

impl<F: FrameSource> TileAccessor<F> {
    pub fn new(index: Arc<PyramidIndex>, source: F) -> Self {
        Self {
            index,
            source,
            decoder: FrameDecoder::new(),
        }
    }

    pub fn index(&self) -> &PyramidIndex {
        &self.index
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    /// Resolve the level of a request.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::InvalidLevel`] if `|zoom|` is not smaller than
    /// the number of levels.
    pub fn level(&self, zoom: i32) -> Result<(usize, &PyramidLevel), TileError> {
        self.index
            .level_index_for_zoom(zoom)
            .and_then(|index| self.index.get_level(index).map(|level| (index, level)))
            .ok_or(TileError::InvalidLevel {
                zoom,
                levels: self.index.level_count(),
            })
    }

    /// Resolve the frame of a request without fetching it.
    ///
    /// Returns `Ok(None)` when the level holds no frame for the tile, which
    /// is expected for sparse pyramids.
    pub fn resolve(&self, request: &TileRequest) -> Result<Option<&FrameReference>, TileError> {
        let (_, level) = self.level(request.zoom)?;
        Ok(level.frame_reference(request.tile_x, request.tile_y, &request.channel))
    }

    /// Fetch, decode and mask the tile of a request.
    ///
    /// Returns `Ok(None)` when the level holds no frame for the tile.
    /// Fetch and decode errors are returned as-is; nothing is retried.
    pub async fn get_tile(&self, request: &TileRequest) -> Result<Option<TileImage>, TileError> {
        let (level_index, level) = self.level(request.zoom)?;

        let Some(frame) = level.frame_reference(request.tile_x, request.tile_y, &request.channel)
        else {
            debug!(
                zoom = request.zoom,
                tile_x = request.tile_x,
                tile_y = request.tile_y,
                channel = %request.channel,
                "No frame for tile"
            );
            return Ok(None);
        };

        let data = self.source.fetch_frame(frame).await?;
        let mut image = self.decoder.decode(&data, frame)?;

        let (visible_width, visible_height) = level
            .tile_dimensions(request.tile_x, request.tile_y)
            .unwrap_or((0, 0));
        mask_padding(&mut image, visible_width, visible_height);

        debug!(
            source = self.source.identifier(),
            frame = %frame,
            level = level_index,
            width = image.width(),
            height = image.height(),
            "Decoded tile"
        );

        Ok(Some(TileImage {
            level: level_index,
            tile_x: request.tile_x,
            tile_y: request.tile_y,
            channel: request.channel.clone(),
            frame: frame.clone(),
            visible_width,
            visible_height,
            image,
        }))
    }
}

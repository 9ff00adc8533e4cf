//! Frame decoder.
//!
//! This module decodes fetched frame payloads into RGBA bitmaps and hides
//! the padding of edge tiles.
//!
//! # Design Decisions
//!
//! - **Format sniffing**: the payload format is guessed from its magic bytes,
//!   so PNG and JPEG frames are both accepted whatever was requested.
//!
//! - **No resizing**: tiles are returned at their native size. Edge tiles
//!   keep their padded size; padding is painted black instead of cropped.

use std::io::Cursor;

use image::{ImageReader, Rgba, RgbaImage};

use crate::error::TileError;
use crate::index::FrameReference;

/// Colour painted over pixels outside the total pixel matrix.
pub const PADDING_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

// =============================================================================
// Frame Decoder
// =============================================================================

/// Decoder for encoded frame payloads.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {}
    }

    /// Decode a frame payload to an RGBA bitmap.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::Decode`] if the format cannot be recognized or
    /// the payload is not a valid image.
    pub fn decode(&self, data: &[u8], reference: &FrameReference) -> Result<RgbaImage, TileError> {
        let decode_error = |message: String| TileError::Decode {
            reference: reference.to_string(),
            message,
        };

        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| decode_error(e.to_string()))?;

        if reader.format().is_none() {
            return Err(decode_error("unrecognized image format".to_string()));
        }

        let image = reader.decode().map_err(|e| decode_error(e.to_string()))?;
        Ok(image.to_rgba8())
    }
}

/// Paint every pixel outside the visible region opaque black.
///
/// The visible region is the top-left `visible_width` x `visible_height`
/// rectangle of the tile.
pub fn mask_padding(image: &mut RgbaImage, visible_width: u32, visible_height: u32) {
    if visible_width >= image.width() && visible_height >= image.height() {
        return;
    }

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        if x >= visible_width || y >= visible_height {
            *pixel = PADDING_COLOR;
        }
    }
}

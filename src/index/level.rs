//! Pyramid level geometry.
//!
//! A level is one resolution tier of the slide: the merged metadata and frame
//! mapping of every instance (or concatenation part) sharing the same total
//! pixel matrix size, plus the tiling and physical geometry derived from it.

use serde::Serialize;

use crate::error::IndexError;
use crate::metadata::Instance;

use super::frame_mapping::{FrameMapping, FrameReference};

// =============================================================================
// Geometry Types
// =============================================================================

/// Physical distance between pixel centres, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelSpacing {
    /// Spacing between rows (vertical)
    pub row: f64,

    /// Spacing between columns (horizontal)
    pub column: f64,
}

/// Physical extent of a level's total pixel matrix, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhysicalSize {
    pub width: f64,
    pub height: f64,
}

impl PhysicalSize {
    /// Size rounded to 4 decimals, the precision at which levels are compared.
    pub fn rounded(&self) -> String {
        format!("{:.4}x{:.4}", self.width, self.height)
    }
}

// =============================================================================
// PyramidLevel
// =============================================================================

/// A single level in the image pyramid.
#[derive(Debug, Clone, Serialize)]
pub struct PyramidLevel {
    /// UID identifying this level: the instance UID, or the concatenation
    /// source UID once parts have been merged
    pub sop_instance_uid: String,

    /// UIDs of every instance contributing frames to this level
    pub instance_uids: Vec<String>,

    /// Total pixel matrix width in pixels
    pub width: u32,

    /// Total pixel matrix height in pixels
    pub height: u32,

    /// Tile width in pixels
    pub tile_width: u32,

    /// Tile height in pixels
    pub tile_height: u32,

    /// Number of tiles in X direction
    pub tiles_x: u32,

    /// Number of tiles in Y direction
    pub tiles_y: u32,

    pub pixel_spacing: PixelSpacing,

    pub physical_size: PhysicalSize,

    /// Zoom factor relative to the base level (1.0 for the base)
    pub downsample: f64,

    pub frame_mapping: FrameMapping,

    /// Merged instance metadata
    #[serde(skip)]
    pub metadata: Instance,
}

impl PyramidLevel {
    /// Derive the geometry of a level from its merged metadata.
    pub(crate) fn new(
        metadata: Instance,
        instance_uids: Vec<String>,
        frame_mapping: FrameMapping,
        downsample: f64,
    ) -> Result<Self, IndexError> {
        let (row, column) =
            metadata
                .pixel_spacing()
                .ok_or_else(|| IndexError::MissingPixelSpacing {
                    sop_instance_uid: metadata.sop_instance_uid.clone(),
                })?;

        let width = metadata.total_pixel_matrix_columns;
        let height = metadata.total_pixel_matrix_rows;
        let tile_width = metadata.columns;
        let tile_height = metadata.rows;

        Ok(PyramidLevel {
            sop_instance_uid: metadata.sop_instance_uid.clone(),
            instance_uids,
            width,
            height,
            tile_width,
            tile_height,
            tiles_x: width.div_ceil(tile_width),
            tiles_y: height.div_ceil(tile_height),
            pixel_spacing: PixelSpacing { row, column },
            physical_size: PhysicalSize {
                width: width as f64 * column,
                height: height as f64 * row,
            },
            downsample,
            frame_mapping,
            metadata,
        })
    }

    /// Resolution relative to the base level (1.0 for the base).
    pub fn resolution(&self) -> f64 {
        1.0 / self.downsample
    }

    /// Total number of tile positions in the grid.
    pub fn tile_count(&self) -> u64 {
        u64::from(self.tiles_x) * u64::from(self.tiles_y)
    }

    /// Calculate the visible pixel dimensions of a specific tile.
    ///
    /// Edge tiles are padded to the full tile size; only the returned
    /// region lies inside the total pixel matrix. Returns `None` if the
    /// coordinates are out of bounds.
    pub fn tile_dimensions(&self, tile_x: u32, tile_y: u32) -> Option<(u32, u32)> {
        if tile_x >= self.tiles_x || tile_y >= self.tiles_y {
            return None;
        }

        let w = if tile_x == self.tiles_x - 1 {
            let remainder = self.width % self.tile_width;
            if remainder == 0 {
                self.tile_width
            } else {
                remainder
            }
        } else {
            self.tile_width
        };

        let h = if tile_y == self.tiles_y - 1 {
            let remainder = self.height % self.tile_height;
            if remainder == 0 {
                self.tile_height
            } else {
                remainder
            }
        } else {
            self.tile_height
        };

        Some((w, h))
    }

    /// Frame of a tile given 0-indexed tile coordinates.
    ///
    /// Coordinates with no 1-based counterpart address no tile.
    pub fn frame_reference(&self, tile_x: u32, tile_y: u32, channel: &str) -> Option<&FrameReference> {
        let row = tile_y.checked_add(1)?;
        let column = tile_x.checked_add(1)?;
        self.frame_mapping.get(row, column, channel)
    }
}

// =============================================================================
// Tests
// =============================================================================

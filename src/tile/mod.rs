//! Tile access layer.
//!
//! This module turns tile requests into displayable bitmaps using an
//! assembled [`PyramidIndex`](crate::index::PyramidIndex) and a
//! [`FrameSource`](crate::io::FrameSource).
//!
//! # Components
//!
//! - [`TileAccessor`]: Main entry point, resolves a request to a frame and
//!   runs the fetch, decode and mask pipeline
//! - [`TileRequest`]: Zoom, tile coordinates and channel of a request
//! - [`TileImage`]: Decoded tile with its level and visible region
//! - [`FrameDecoder`]: Decodes PNG or JPEG frame payloads to RGBA
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dicom_wsi_index::index::PyramidIndex;
//! use dicom_wsi_index::io::DicomWebFrameSource;
//! use dicom_wsi_index::tile::{TileAccessor, TileRequest};
//!
//! let index = Arc::new(PyramidIndex::build(instances)?);
//! let source = DicomWebFrameSource::with_default_timeout(series_url)?;
//! let accessor = TileAccessor::new(index, source);
//!
//! if let Some(tile) = accessor.get_tile(&TileRequest::new(0, 3, 2, "1")).await? {
//!     tile.image.save("tile.png")?;
//! }
//! ```

mod accessor;
mod decoder;

pub use accessor::{TileAccessor, TileImage, TileRequest};
pub use decoder::{mask_padding, FrameDecoder, PADDING_COLOR};

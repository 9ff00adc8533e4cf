//! # DICOM WSI Index
//!
//! A multi-resolution tile index for DICOM whole-slide microscopy images.
//!
//! This library reconciles the metadata of every instance of a slide into
//! one addressing scheme: for each pyramid level, a mapping from
//! (tile row, tile column, channel) to the frame holding that tile. Tiles
//! are then fetched from a DICOMweb server, decoded and handed out as RGBA
//! bitmaps.
//!
//! ## Features
//!
//! - **Both tiling conventions**: `TILED_FULL` positional and `TILED_SPARSE`
//!   explicit per-frame positions
//! - **Three channel kinds**: optical paths, segments and parametric map
//!   value mappings
//! - **Concatenations**: levels split over several instances are merged
//! - **DICOMweb retrieval**: frames are requested as `multipart/related`
//!   PNG and unwrapped before decoding
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`metadata`] - Normalized instance metadata model and JSON loading
//! - [`index`] - Channel classification, frame mapping and pyramid assembly
//! - [`io`] - Frame source abstraction and DICOMweb client
//! - [`tile`] - Tile resolution, decoding and padding masks
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dicom_wsi_index::{load_instances_from_path, DicomWebFrameSource, PyramidIndex, TileAccessor, TileRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let instances = load_instances_from_path("slide.json")?;
//!     let index = Arc::new(PyramidIndex::build(instances)?);
//!
//!     let source = DicomWebFrameSource::with_default_timeout(
//!         "https://example.org/dicomweb/studies/1.2.3/series/1.2.3.4",
//!     )?;
//!     let accessor = TileAccessor::new(index, source);
//!
//!     if let Some(tile) = accessor.get_tile(&TileRequest::new(0, 0, 0, "1")).await? {
//!         println!("{}x{} tile from {}", tile.image.width(), tile.image.height(), tile.frame);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod io;
pub mod metadata;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, Command, IndexConfig, TileConfig};
pub use error::{IndexError, MetadataError, TileError};
pub use index::{
    ChannelKind, FrameMapping, FrameReference, PhysicalSize, PixelSpacing, PyramidIndex,
    PyramidLevel,
};
pub use io::{DicomWebFrameSource, FrameSource, DEFAULT_FETCH_TIMEOUT};
pub use metadata::{load_instances_from_path, load_instances_from_slice, Instance};
pub use tile::{FrameDecoder, TileAccessor, TileImage, TileRequest};

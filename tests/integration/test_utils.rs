//! Test utilities for integration tests.
//!
//! This module provides instance metadata builders, a mock frame source and
//! helpers for creating encoded tile payloads.

use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use dicom_wsi_index::error::TileError;
use dicom_wsi_index::index::FrameReference;
use dicom_wsi_index::io::FrameSource;
use dicom_wsi_index::metadata::{
    DimensionOrganizationType, FunctionalGroup, Instance, OpticalPath, PixelMeasures,
    PlanePositionSlide,
};

pub const FRAME_OF_REFERENCE_UID: &str = "1.2.826.0.1.3680043.10.511.3.1";
pub const CONTAINER_IDENTIFIER: &str = "SLIDE-0001";

// =============================================================================
// Instance Builders
// =============================================================================

pub fn optical_paths(identifiers: &[&str]) -> Vec<OpticalPath> {
    identifiers
        .iter()
        .map(|id| OpticalPath {
            optical_path_identifier: id.to_string(),
            optical_path_description: None,
        })
        .collect()
}

pub fn spacing_group(spacing: f64) -> FunctionalGroup {
    FunctionalGroup {
        pixel_measures_sequence: vec![PixelMeasures {
            pixel_spacing: vec![spacing, spacing],
        }],
        ..Default::default()
    }
}

/// A square TILED_FULL level with one frame per tile and optical path.
///
/// The pixel spacing scales with the level size so that every level covers
/// the same physical area as a 1024 pixel base at 0.00025 mm.
pub fn tiled_full_instance(uid: &str, size: u32, tile: u32, paths: &[&str]) -> Instance {
    let tiles = size.div_ceil(tile);
    Instance {
        rows: tile,
        columns: tile,
        total_pixel_matrix_rows: size,
        total_pixel_matrix_columns: size,
        sop_instance_uid: uid.to_string(),
        number_of_frames: tiles * tiles * paths.len() as u32,
        frame_of_reference_uid: FRAME_OF_REFERENCE_UID.to_string(),
        container_identifier: CONTAINER_IDENTIFIER.to_string(),
        dimension_organization_type: DimensionOrganizationType::TiledFull,
        optical_path_sequence: optical_paths(paths),
        shared_functional_groups_sequence: vec![spacing_group(0.256 / size as f64)],
        ..Default::default()
    }
}

/// One concatenation part of a TILED_FULL level.
pub fn concatenation_part(
    uid: &str,
    source_uid: &str,
    size: u32,
    tile: u32,
    offset: u32,
    frames: u32,
) -> Instance {
    Instance {
        number_of_frames: frames,
        concatenation_frame_offset_number: Some(offset),
        sop_instance_uid_of_concatenation_source: Some(source_uid.to_string()),
        ..tiled_full_instance(uid, size, tile, &["1"])
    }
}

/// A TILED_SPARSE level with one optical path and frames at the given
/// 0-based tile positions `(tile_x, tile_y)`.
pub fn sparse_instance(uid: &str, width: u32, height: u32, tile: u32, tiles: &[(u32, u32)]) -> Instance {
    let per_frame = tiles
        .iter()
        .map(|(tile_x, tile_y)| FunctionalGroup {
            plane_position_slide_sequence: vec![PlanePositionSlide {
                row_position_in_total_image_pixel_matrix: tile_y * tile + 1,
                column_position_in_total_image_pixel_matrix: tile_x * tile + 1,
            }],
            ..Default::default()
        })
        .collect::<Vec<_>>();

    Instance {
        rows: tile,
        columns: tile,
        total_pixel_matrix_rows: height,
        total_pixel_matrix_columns: width,
        sop_instance_uid: uid.to_string(),
        number_of_frames: per_frame.len() as u32,
        frame_of_reference_uid: FRAME_OF_REFERENCE_UID.to_string(),
        container_identifier: CONTAINER_IDENTIFIER.to_string(),
        dimension_organization_type: DimensionOrganizationType::TiledSparse,
        optical_path_sequence: optical_paths(&["1"]),
        shared_functional_groups_sequence: vec![spacing_group(0.00025)],
        per_frame_functional_groups_sequence: per_frame,
        ..Default::default()
    }
}

// =============================================================================
// Image Payloads
// =============================================================================

/// Encode a solid-colour PNG tile.
pub fn png_tile(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("Failed to encode PNG");
    buf
}

/// Wrap a payload in a single-part `multipart/related` body.
pub fn multipart_body(boundary: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

// =============================================================================
// Mock Frame Source
// =============================================================================

/// An in-memory frame source that tracks all fetches.
///
/// Unknown frames are answered with an HTTP 404 error.
#[derive(Clone, Default)]
pub struct MockFrameSource {
    frames: Arc<HashMap<String, Bytes>>,
    request_count: Arc<AtomicUsize>,
    requests: Arc<RwLock<Vec<String>>>,
}

impl MockFrameSource {
    pub fn new(frames: HashMap<String, Vec<u8>>) -> Self {
        Self {
            frames: Arc::new(
                frames
                    .into_iter()
                    .map(|(reference, data)| (reference, Bytes::from(data)))
                    .collect(),
            ),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub async fn get_requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl FrameSource for MockFrameSource {
    async fn fetch_frame(&self, reference: &FrameReference) -> Result<Bytes, TileError> {
        let key = reference.to_string();
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.write().await.push(key.clone());

        self.frames.get(&key).cloned().ok_or(TileError::Http {
            url: format!("mock://{}", key),
            status: 404,
        })
    }

    fn identifier(&self) -> &str {
        "mock://series"
    }
}

//! Per-instance frame mapping.
//!
//! A frame mapping addresses every frame of an instance by tile row, tile
//! column and channel. Keys have the form `"{row}-{column}-{channel}"` with
//! 1-based row and column; values are frame references of the form
//! `"{SOPInstanceUID}/frames/{frameNumber}"`.
//!
//! # Dimension Organizations
//!
//! - **TILED_FULL**: frames are implicitly ordered by channel, focal plane,
//!   tile row and tile column. Positions are derived from the frame number
//!   alone.
//! - **TILED_SPARSE**: every frame declares its position in the total pixel
//!   matrix through the `PlanePositionSlideSequence` of its per-frame
//!   functional group.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::IndexError;
use crate::metadata::{DimensionOrganizationType, Instance};

use super::channel::ChannelKind;

/// Number of focal planes a frame mapping can address.
const FOCAL_PLANES: u32 = 1;

// =============================================================================
// FrameReference
// =============================================================================

/// Reference to one frame of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct FrameReference {
    pub sop_instance_uid: String,

    /// 1-based frame number within the instance
    pub frame_number: u32,
}

impl FrameReference {
    pub fn new(sop_instance_uid: impl Into<String>, frame_number: u32) -> Self {
        Self {
            sop_instance_uid: sop_instance_uid.into(),
            frame_number,
        }
    }
}

impl fmt::Display for FrameReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/frames/{}", self.sop_instance_uid, self.frame_number)
    }
}

impl From<FrameReference> for String {
    fn from(reference: FrameReference) -> Self {
        reference.to_string()
    }
}

// =============================================================================
// FrameMapping
// =============================================================================

/// Format the key of a tile: 1-based row and column, then channel.
pub fn tile_key(row: u32, column: u32, channel: &str) -> String {
    format!("{row}-{column}-{channel}")
}

/// Mapping from tile key to frame reference.
///
/// Iteration order is the lexicographic order of keys, so two mappings built
/// from the same input always compare and serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrameMapping {
    entries: BTreeMap<String, FrameReference>,
}

impl FrameMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a frame for a tile, returning the frame it replaced.
    pub fn insert(
        &mut self,
        row: u32,
        column: u32,
        channel: &str,
        reference: FrameReference,
    ) -> Option<FrameReference> {
        self.entries.insert(tile_key(row, column, channel), reference)
    }

    /// Look up the frame of a tile (1-based row and column).
    pub fn get(&self, row: u32, column: u32, channel: &str) -> Option<&FrameReference> {
        self.get_key(&tile_key(row, column, channel))
    }

    /// Look up a frame by its formatted key.
    pub fn get_key(&self, key: &str) -> Option<&FrameReference> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FrameReference> {
        self.entries.iter()
    }

    /// Merge another mapping whose keys must not overlap with this one.
    ///
    /// On overlap, returns the first colliding key.
    pub fn merge_disjoint(mut self, other: FrameMapping) -> Result<Self, String> {
        if let Some(key) = other.keys().find(|key| self.contains_key(key)) {
            return Err(key.to_string());
        }
        self.entries.extend(other.entries);
        Ok(self)
    }
}

impl<'a> IntoIterator for &'a FrameMapping {
    type Item = (&'a String, &'a FrameReference);
    type IntoIter = btree_map::Iter<'a, String, FrameReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Frame mapping of one instance together with its tiling.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceFrames {
    pub frame_mapping: FrameMapping,

    /// Number of channels, for cross-instance validation
    pub number_of_channels: usize,

    /// Number of tile rows of the total pixel matrix
    pub tile_rows: u32,

    /// Number of tile columns of the total pixel matrix
    pub tile_columns: u32,
}

/// Classify the channels of an instance and build its frame mapping.
pub fn map_instance(instance: &Instance) -> Result<InstanceFrames, IndexError> {
    let channels = ChannelKind::classify(instance)?;
    build_frame_mapping(instance, &channels)
}

/// Build the frame mapping of an instance from its channel classification.
///
/// # Errors
///
/// - [`IndexError::MultiFocalPlaneUnsupported`] for more than one focal plane
/// - [`IndexError::InvalidTileSize`] for zero frame or matrix dimensions
/// - [`IndexError::UnresolvedChannelForFrame`] if a frame has no channel
/// - [`IndexError::MissingFramePosition`] if a sparse frame has no position
pub fn build_frame_mapping(
    instance: &Instance,
    channels: &ChannelKind,
) -> Result<InstanceFrames, IndexError> {
    if instance.total_pixel_matrix_focal_planes > FOCAL_PLANES {
        return Err(IndexError::MultiFocalPlaneUnsupported {
            sop_instance_uid: instance.sop_instance_uid.clone(),
            focal_planes: instance.total_pixel_matrix_focal_planes,
        });
    }

    if instance.rows == 0
        || instance.columns == 0
        || instance.total_pixel_matrix_rows == 0
        || instance.total_pixel_matrix_columns == 0
    {
        return Err(IndexError::InvalidTileSize {
            sop_instance_uid: instance.sop_instance_uid.clone(),
        });
    }

    let tile_columns = instance.total_pixel_matrix_columns.div_ceil(instance.columns);
    let tile_rows = instance.total_pixel_matrix_rows.div_ceil(instance.rows);

    let frame_mapping = match instance.dimension_organization_type {
        DimensionOrganizationType::TiledFull => {
            map_tiled_full(instance, channels, tile_rows, tile_columns)?
        }
        DimensionOrganizationType::TiledSparse => map_tiled_sparse(instance, channels)?,
    };

    debug!(
        sop_instance_uid = %instance.sop_instance_uid,
        tile_rows,
        tile_columns,
        frames = frame_mapping.len(),
        "Built frame mapping"
    );

    Ok(InstanceFrames {
        frame_mapping,
        number_of_channels: channels.count(),
        tile_rows,
        tile_columns,
    })
}

/// Assign frames positionally: channel, focal plane, tile row, tile column.
///
/// A concatenation part only holds the positions from its frame offset up to
/// the offset plus its own frame count; its local frame numbers restart at 1.
fn map_tiled_full(
    instance: &Instance,
    channels: &ChannelKind,
    tile_rows: u32,
    tile_columns: u32,
) -> Result<FrameMapping, IndexError> {
    let uid = &instance.sop_instance_uid;
    let offset = instance.concatenation_frame_offset_number;
    let mut mapping = FrameMapping::new();
    let mut position = 0u32;

    for channel_index in 0..channels.count() {
        for _focal_plane in 0..FOCAL_PLANES {
            for row in 1..=tile_rows {
                for column in 1..=tile_columns {
                    position += 1;

                    let frame_number = match offset {
                        Some(offset) => {
                            if position <= offset || position - offset > instance.number_of_frames
                            {
                                continue;
                            }
                            position - offset
                        }
                        None => position,
                    };

                    let channel = channels
                        .identifier_at(channel_index, frame_number)
                        .ok_or_else(|| IndexError::UnresolvedChannelForFrame {
                            sop_instance_uid: uid.clone(),
                            frame_number,
                        })?;

                    mapping.insert(row, column, &channel, FrameReference::new(uid, frame_number));
                }
            }
        }
    }

    Ok(mapping)
}

/// Assign frames from their declared plane positions.
fn map_tiled_sparse(instance: &Instance, channels: &ChannelKind) -> Result<FrameMapping, IndexError> {
    let uid = &instance.sop_instance_uid;
    let mut mapping = FrameMapping::new();

    for frame_number in 1..=instance.number_of_frames {
        let position = instance
            .frame_group(frame_number)
            .and_then(|group| group.plane_position())
            .ok_or_else(|| IndexError::MissingFramePosition {
                sop_instance_uid: uid.clone(),
                frame_number,
            })?;

        let row = position
            .row_position_in_total_image_pixel_matrix
            .div_ceil(instance.rows);
        let column = position
            .column_position_in_total_image_pixel_matrix
            .div_ceil(instance.columns);

        let channel = channels
            .identifier_for_frame(instance, frame_number)
            .ok_or_else(|| IndexError::UnresolvedChannelForFrame {
                sop_instance_uid: uid.clone(),
                frame_number,
            })?;

        let reference = FrameReference::new(uid, frame_number);
        if let Some(previous) = mapping.insert(row, column, &channel, reference) {
            warn!(
                sop_instance_uid = %uid,
                frame_number,
                replaced = previous.frame_number,
                key = %tile_key(row, column, &channel),
                "Frame replaces an earlier frame at the same tile"
            );
        }
    }

    Ok(mapping)
}

// =============================================================================
// Tests
// =============================================================================

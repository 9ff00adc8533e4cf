//! Pyramid assembly from a set of instances.
//!
//! A whole-slide image is stored as one instance per resolution level, where
//! large levels may be split into several concatenation parts. Assembly
//! turns the unordered instance set into one ordered [`PyramidIndex`]:
//!
//! 1. Sort by total pixel matrix width, then by concatenation frame offset
//! 2. Check that every instance belongs to the same slide
//! 3. Build the frame mapping of every instance and check channel counts
//! 4. Merge concatenation parts into the level they belong to
//! 5. Compute level geometry and downsample factors
//! 6. Order levels from lowest to highest resolution
//!
//! Assembly is pure and synchronous. Any failure aborts the whole build.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::IndexError;
use crate::metadata::Instance;

use super::frame_mapping::{map_instance, FrameMapping, InstanceFrames};
use super::level::PyramidLevel;

// =============================================================================
// Level Drafts
// =============================================================================

/// A level under construction, before its geometry is known.
#[derive(Debug, Clone)]
struct LevelDraft {
    metadata: Instance,
    instance_uids: Vec<String>,
    frame_mapping: FrameMapping,
}

impl LevelDraft {
    fn new(instance: Instance, frame_mapping: FrameMapping) -> Self {
        Self {
            instance_uids: vec![instance.sop_instance_uid.clone()],
            metadata: instance,
            frame_mapping,
        }
    }

    fn has_geometry_of(&self, instance: &Instance) -> bool {
        self.metadata.total_pixel_matrix_columns == instance.total_pixel_matrix_columns
            && self.metadata.total_pixel_matrix_rows == instance.total_pixel_matrix_rows
    }

    /// Merge a concatenation part into this level.
    ///
    /// Both the level and the part must name the same concatenation source,
    /// and the part must not address any tile the level already holds. The
    /// merged level takes the source UID as its identity.
    fn absorb(self, part: Instance, frame_mapping: FrameMapping) -> Result<Self, IndexError> {
        let ambiguous = || IndexError::AmbiguousConcatenation {
            sop_instance_uid: part.sop_instance_uid.clone(),
            level_uid: self.metadata.sop_instance_uid.clone(),
        };

        let source_uid = match (
            &self.metadata.sop_instance_uid_of_concatenation_source,
            &part.sop_instance_uid_of_concatenation_source,
        ) {
            (Some(level_source), Some(part_source)) if level_source == part_source => {
                part_source.clone()
            }
            _ => return Err(ambiguous()),
        };

        let frame_mapping = self
            .frame_mapping
            .merge_disjoint(frame_mapping)
            .map_err(|key| IndexError::OverlappingConcatenation {
                sop_instance_uid: part.sop_instance_uid.clone(),
                level_uid: source_uid.clone(),
                key,
            })?;

        debug!(
            part = %part.sop_instance_uid,
            source = %source_uid,
            frames = part.number_of_frames,
            "Merged concatenation part"
        );

        let mut metadata = self.metadata;
        metadata.sop_instance_uid = source_uid;
        metadata.number_of_frames += part.number_of_frames;
        metadata
            .per_frame_functional_groups_sequence
            .extend(part.per_frame_functional_groups_sequence);

        let mut instance_uids = self.instance_uids;
        instance_uids.push(part.sop_instance_uid);

        Ok(LevelDraft {
            metadata,
            instance_uids,
            frame_mapping,
        })
    }
}

/// Add one instance to the level set, returning the new level set.
///
/// The instance joins the level with the same total pixel matrix size as a
/// concatenation part, or starts a new level.
fn add_instance(
    mut levels: Vec<LevelDraft>,
    instance: Instance,
    frame_mapping: FrameMapping,
) -> Result<Vec<LevelDraft>, IndexError> {
    match levels
        .iter()
        .position(|level| level.has_geometry_of(&instance))
    {
        Some(index) => {
            let level = levels.remove(index);
            levels.insert(index, level.absorb(instance, frame_mapping)?);
        }
        None => levels.push(LevelDraft::new(instance, frame_mapping)),
    }
    Ok(levels)
}

// =============================================================================
// Assembly Stages
// =============================================================================

/// Sort by width, keeping concatenation parts in frame offset order.
fn sort_instances(instances: &mut [Instance]) {
    instances.sort_by(|a, b| {
        a.total_pixel_matrix_columns
            .cmp(&b.total_pixel_matrix_columns)
            .then_with(|| {
                a.concatenation_frame_offset_number
                    .cmp(&b.concatenation_frame_offset_number)
            })
    });
}

/// Check that all instances share the first one's frame of reference and
/// container. Returns the shared `(FrameOfReferenceUID, ContainerIdentifier)`.
fn validate_consistency(instances: &[Instance]) -> Result<(String, String), IndexError> {
    let first = instances.first().ok_or(IndexError::EmptyPyramid)?;

    for instance in instances {
        if instance.frame_of_reference_uid != first.frame_of_reference_uid {
            return Err(IndexError::InconsistentPyramid {
                attribute: "FrameOfReferenceUID",
                sop_instance_uid: instance.sop_instance_uid.clone(),
                expected: first.frame_of_reference_uid.clone(),
                found: instance.frame_of_reference_uid.clone(),
            });
        }
        if instance.container_identifier != first.container_identifier {
            return Err(IndexError::InconsistentPyramid {
                attribute: "ContainerIdentifier",
                sop_instance_uid: instance.sop_instance_uid.clone(),
                expected: first.container_identifier.clone(),
                found: instance.container_identifier.clone(),
            });
        }
    }

    Ok((
        first.frame_of_reference_uid.clone(),
        first.container_identifier.clone(),
    ))
}

/// Map every instance and check that all have the same number of channels.
fn map_instances(instances: &[Instance]) -> Result<(Vec<InstanceFrames>, usize), IndexError> {
    let mut mapped: Vec<InstanceFrames> = Vec::with_capacity(instances.len());

    for instance in instances {
        let frames = map_instance(instance)?;
        if let Some(first) = mapped.first() {
            if frames.number_of_channels != first.number_of_channels {
                return Err(IndexError::ChannelCountMismatch {
                    sop_instance_uid: instance.sop_instance_uid.clone(),
                    expected: first.number_of_channels,
                    found: frames.number_of_channels,
                });
            }
        }
        mapped.push(frames);
    }

    let number_of_channels = mapped
        .first()
        .map(|frames| frames.number_of_channels)
        .unwrap_or(0);
    Ok((mapped, number_of_channels))
}

fn two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Downsample factors for level widths ordered from the base down.
///
/// Each factor is rounded to the nearest integer unless that value is already
/// taken by a larger level, in which case it is kept to 2 decimals. A rounded
/// factor can overshoot the next smaller level; such a pair falls back to
/// 2-decimal factors on both sides. On failure the position of the level
/// whose 2-decimal factor equals its neighbour's is returned with that factor.
fn downsample_factors(base_width: u32, widths: &[u32]) -> Result<Vec<f64>, (usize, f64)> {
    let raw: Vec<f64> = widths
        .iter()
        .map(|width| base_width as f64 / *width as f64)
        .collect();

    let mut factors: Vec<f64> = Vec::with_capacity(raw.len());
    for value in &raw {
        let rounded = value.round();
        let factor = if factors.contains(&rounded) {
            two_decimals(*value)
        } else {
            rounded
        };
        factors.push(factor);
    }

    // Every pass moves at least one factor to its 2-decimal value
    loop {
        let Some(index) = (1..factors.len()).find(|&i| factors[i] <= factors[i - 1]) else {
            return Ok(factors);
        };

        let previous = two_decimals(raw[index - 1]);
        let current = two_decimals(raw[index]);
        if factors[index - 1] == previous && factors[index] == current {
            return Err((index, current));
        }
        factors[index - 1] = previous;
        factors[index] = current;
    }
}

/// Compute geometry for drafts sorted by ascending width.
///
/// Factors are assigned from the base (widest) level down, then levels are
/// ordered by width so the base comes last.
fn compute_levels(drafts: Vec<LevelDraft>) -> Result<Vec<PyramidLevel>, IndexError> {
    let drafts: Vec<LevelDraft> = drafts.into_iter().rev().collect();
    let widths: Vec<u32> = drafts
        .iter()
        .map(|draft| draft.metadata.total_pixel_matrix_columns)
        .collect();
    let base_width = widths
        .iter()
        .copied()
        .max()
        .ok_or(IndexError::EmptyPyramid)?;

    let factors = downsample_factors(base_width, &widths).map_err(|(index, downsample)| {
        IndexError::ResolutionCollision {
            sop_instance_uid: drafts[index].metadata.sop_instance_uid.clone(),
            downsample,
        }
    })?;

    let mut levels = drafts
        .into_iter()
        .zip(factors)
        .map(|(draft, downsample)| {
            PyramidLevel::new(
                draft.metadata,
                draft.instance_uids,
                draft.frame_mapping,
                downsample,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    levels.sort_by_key(|level| level.width);
    Ok(levels)
}

/// Describe levels whose physical sizes differ at 4 decimal precision.
fn physical_size_warnings(levels: &[PyramidLevel]) -> Vec<String> {
    let sizes: BTreeSet<String> = levels
        .iter()
        .map(|level| level.physical_size.rounded())
        .collect();

    if sizes.len() <= 1 {
        return Vec::new();
    }

    let sizes: Vec<String> = sizes.into_iter().collect();
    let message = format!(
        "Levels of the image pyramid have different physical sizes (mm): {}",
        sizes.join(", ")
    );
    warn!("{}", message);
    vec![message]
}

// =============================================================================
// PyramidIndex
// =============================================================================

/// Multi-resolution tile index of one slide.
///
/// Levels are ordered from lowest resolution to the base (full resolution)
/// level, which is last. The index is read-only once built.
#[derive(Debug, Clone, Serialize)]
pub struct PyramidIndex {
    levels: Vec<PyramidLevel>,
    extent: [u32; 4],
    number_of_channels: usize,
    frame_of_reference_uid: String,
    container_identifier: String,
    warnings: Vec<String>,
}

impl PyramidIndex {
    /// Build the index from the instances of one slide.
    ///
    /// # Errors
    ///
    /// Returns an [`IndexError`] if the instances are empty, belong to
    /// different slides, disagree on channels, contain ambiguous or
    /// overlapping concatenations, or any single instance cannot be mapped.
    pub fn build(instances: Vec<Instance>) -> Result<Self, IndexError> {
        let mut instances = instances;
        if instances.is_empty() {
            return Err(IndexError::EmptyPyramid);
        }

        sort_instances(&mut instances);
        let (frame_of_reference_uid, container_identifier) = validate_consistency(&instances)?;
        let (mapped, number_of_channels) = map_instances(&instances)?;

        let drafts = instances
            .into_iter()
            .zip(mapped)
            .try_fold(Vec::new(), |levels, (instance, frames)| {
                add_instance(levels, instance, frames.frame_mapping)
            })?;

        let levels = compute_levels(drafts)?;
        let warnings = physical_size_warnings(&levels);

        let base = levels.last().ok_or(IndexError::EmptyPyramid)?;
        let extent = [0, 0, base.width, base.height];

        info!(
            levels = levels.len(),
            channels = number_of_channels,
            width = base.width,
            height = base.height,
            "Built pyramid index"
        );

        Ok(PyramidIndex {
            levels,
            extent,
            number_of_channels,
            frame_of_reference_uid,
            container_identifier,
            warnings,
        })
    }

    /// Levels, lowest resolution first.
    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn get_level(&self, index: usize) -> Option<&PyramidLevel> {
        self.levels.get(index)
    }

    /// The full resolution level.
    pub fn base_level(&self) -> Option<&PyramidLevel> {
        self.levels.last()
    }

    /// Level index for a signed zoom, where 0 is the base and `|zoom|`
    /// counts levels down from it.
    pub fn level_index_for_zoom(&self, zoom: i32) -> Option<usize> {
        let steps = zoom.unsigned_abs() as usize;
        self.levels.len().checked_sub(1)?.checked_sub(steps)
    }

    /// Level for a signed zoom, see [`Self::level_index_for_zoom`].
    pub fn level_for_zoom(&self, zoom: i32) -> Option<&PyramidLevel> {
        self.level_index_for_zoom(zoom)
            .and_then(|index| self.levels.get(index))
    }

    /// Resolutions relative to the base, strictly increasing.
    pub fn resolutions(&self) -> Vec<f64> {
        self.levels.iter().map(PyramidLevel::resolution).collect()
    }

    /// Downsample factors relative to the base, strictly decreasing.
    pub fn downsamples(&self) -> Vec<f64> {
        self.levels.iter().map(|level| level.downsample).collect()
    }

    /// Pixel bounding box of the base level: `[0, 0, width, height]`.
    pub fn extent(&self) -> [u32; 4] {
        self.extent
    }

    /// Dimensions of the base level.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.extent[2], self.extent[3])
    }

    pub fn number_of_channels(&self) -> usize {
        self.number_of_channels
    }

    pub fn frame_of_reference_uid(&self) -> &str {
        &self.frame_of_reference_uid
    }

    pub fn container_identifier(&self) -> &str {
        &self.container_identifier
    }

    /// Non-fatal consistency notes collected during assembly.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

// =============================================================================
// Tests
// =============================================================================

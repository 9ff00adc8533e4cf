//! Channel classification of a single instance.
//!
//! Every tiled instance carries exactly one kind of channel descriptor:
//!
//! - **Optical paths** (`OpticalPathSequence`) for brightfield and
//!   fluorescence images
//! - **Segments** (`SegmentSequence`) for segmentations
//! - **Real world value mappings** for parametric maps, where frames sharing
//!   the same set of LUT labels form one channel
//!
//! The kind is decided once per instance, in that order of precedence.

use tracing::debug;

use crate::error::IndexError;
use crate::metadata::{Instance, RealWorldValueMapping};

// =============================================================================
// Mapping Groups
// =============================================================================

/// Frames of a parametric map that share the same real world value mappings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingGroup {
    /// 1-based mapping number, in order of first appearance
    pub number: u32,

    /// Composite key of the LUT labels of the mappings
    pub key: String,

    /// Frame numbers in this group, ascending
    pub frames: Vec<u32>,
}

impl MappingGroup {
    /// Whether the given 1-based frame number belongs to this group.
    pub fn contains(&self, frame_number: u32) -> bool {
        self.frames.binary_search(&frame_number).is_ok()
    }
}

fn label_key(mappings: &[RealWorldValueMapping]) -> String {
    mappings
        .iter()
        .map(|mapping| mapping.lut_label.as_str())
        .collect::<Vec<_>>()
        .join("-")
}

/// Group frames by the labels of their real world value mappings.
///
/// A mapping in the shared functional group applies to every frame of the
/// instance. Otherwise each per-frame group is scanned and frames with an
/// identical label key are grouped together.
fn mapping_groups(instance: &Instance) -> Vec<MappingGroup> {
    let shared = instance
        .shared_group()
        .map(|group| group.real_world_value_mapping_sequence.as_slice())
        .unwrap_or_default();

    if !shared.is_empty() {
        return vec![MappingGroup {
            number: 1,
            key: label_key(shared),
            frames: (1..=instance.number_of_frames).collect(),
        }];
    }

    let mut groups: Vec<MappingGroup> = Vec::new();
    for (index, group) in instance
        .per_frame_functional_groups_sequence
        .iter()
        .enumerate()
    {
        if group.real_world_value_mapping_sequence.is_empty() {
            continue;
        }

        let key = label_key(&group.real_world_value_mapping_sequence);
        let frame_number = index as u32 + 1;
        match groups.iter_mut().find(|existing| existing.key == key) {
            Some(existing) => existing.frames.push(frame_number),
            None => {
                let number = groups.len() as u32 + 1;
                groups.push(MappingGroup {
                    number,
                    key,
                    frames: vec![frame_number],
                });
            }
        }
    }

    groups
}

// =============================================================================
// ChannelKind
// =============================================================================

/// Channel semantics of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelKind {
    /// Optical path identifiers, in `OpticalPathSequence` order
    OpticalPath(Vec<String>),

    /// Segment numbers, in `SegmentSequence` order
    Segment(Vec<u32>),

    /// Real world value mapping groups of a parametric map
    ParametricMap(Vec<MappingGroup>),
}

impl ChannelKind {
    /// Classify the channels of an instance.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::UnknownChannelCardinality`] if the instance has
    /// no optical paths, no segments and no real world value mappings.
    pub fn classify(instance: &Instance) -> Result<Self, IndexError> {
        let kind = if !instance.optical_path_sequence.is_empty() {
            ChannelKind::OpticalPath(
                instance
                    .optical_path_sequence
                    .iter()
                    .map(|path| path.optical_path_identifier.clone())
                    .collect(),
            )
        } else if !instance.segment_sequence.is_empty() {
            ChannelKind::Segment(
                instance
                    .segment_sequence
                    .iter()
                    .map(|segment| segment.segment_number)
                    .collect(),
            )
        } else {
            let groups = mapping_groups(instance);
            if groups.is_empty() {
                return Err(IndexError::UnknownChannelCardinality {
                    sop_instance_uid: instance.sop_instance_uid.clone(),
                });
            }
            ChannelKind::ParametricMap(groups)
        };

        debug!(
            sop_instance_uid = %instance.sop_instance_uid,
            kind = kind.name(),
            channels = kind.count(),
            "Classified channels"
        );
        Ok(kind)
    }

    /// Human-readable name of the channel kind.
    pub const fn name(&self) -> &'static str {
        match self {
            ChannelKind::OpticalPath(_) => "optical path",
            ChannelKind::Segment(_) => "segment",
            ChannelKind::ParametricMap(_) => "parametric map",
        }
    }

    /// Number of channels.
    pub fn count(&self) -> usize {
        match self {
            ChannelKind::OpticalPath(identifiers) => identifiers.len(),
            ChannelKind::Segment(numbers) => numbers.len(),
            ChannelKind::ParametricMap(groups) => groups.len(),
        }
    }

    /// Identifier of the mapping group a frame belongs to.
    ///
    /// Always `None` for optical paths and segments.
    pub fn mapping_number_for_frame(&self, frame_number: u32) -> Option<String> {
        match self {
            ChannelKind::ParametricMap(groups) => groups
                .iter()
                .find(|group| group.contains(frame_number))
                .map(|group| group.number.to_string()),
            _ => None,
        }
    }

    /// Channel identifier by position, as used by `TILED_FULL` instances.
    ///
    /// Optical paths and segments are addressed by their index in the
    /// descriptor sequence; parametric maps by the frame's mapping group.
    pub fn identifier_at(&self, channel_index: usize, frame_number: u32) -> Option<String> {
        match self {
            ChannelKind::OpticalPath(identifiers) => identifiers.get(channel_index).cloned(),
            ChannelKind::Segment(numbers) => numbers.get(channel_index).map(u32::to_string),
            ChannelKind::ParametricMap(_) => self.mapping_number_for_frame(frame_number),
        }
    }

    /// Channel identifier of a frame from its functional groups, as used by
    /// `TILED_SPARSE` instances.
    ///
    /// A single optical path or segment applies to every frame. With more
    /// than one, the per-frame identification is used, falling back to the
    /// shared functional group.
    pub fn identifier_for_frame(&self, instance: &Instance, frame_number: u32) -> Option<String> {
        let groups = [instance.frame_group(frame_number), instance.shared_group()];
        let groups = groups.iter().flatten();

        match self {
            ChannelKind::OpticalPath(identifiers) if identifiers.len() == 1 => {
                Some(identifiers[0].clone())
            }
            ChannelKind::OpticalPath(_) => groups
                .filter_map(|group| group.optical_path_identifier())
                .next()
                .map(str::to_string),
            ChannelKind::Segment(numbers) if numbers.len() == 1 => Some(numbers[0].to_string()),
            ChannelKind::Segment(_) => groups
                .filter_map(|group| group.referenced_segment_number())
                .next()
                .map(|number| number.to_string()),
            ChannelKind::ParametricMap(_) => self.mapping_number_for_frame(frame_number),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

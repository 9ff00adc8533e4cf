//! Normalized DICOM instance metadata.
//!
//! The structs in this module mirror the normalized ("naturalized") JSON form
//! of a VL Whole Slide Microscopy Image or Segmentation/Parametric Map
//! instance, where every attribute is keyed by its DICOM keyword and
//! sequences are JSON arrays of items. Only the attributes needed to address
//! tiles are modelled; everything else in the input is ignored.

use serde::{Deserialize, Serialize};

// =============================================================================
// Dimension Organization
// =============================================================================

/// How the frames of a tiled instance are laid out over the total pixel matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DimensionOrganizationType {
    /// Frames cover every tile in a fixed channel/plane/row/column order
    TiledFull,

    /// Every frame declares its own position
    #[default]
    TiledSparse,
}

// =============================================================================
// Channel Descriptors
// =============================================================================

/// One item of the `OpticalPathSequence`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OpticalPath {
    pub optical_path_identifier: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optical_path_description: Option<String>,
}

/// One item of the `SegmentSequence`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Segment {
    pub segment_number: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_label: Option<String>,
}

/// One item of a `RealWorldValueMappingSequence`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealWorldValueMapping {
    #[serde(rename = "LUTLabel")]
    pub lut_label: String,

    #[serde(rename = "LUTExplanation", default, skip_serializing_if = "Option::is_none")]
    pub lut_explanation: Option<String>,

    #[serde(rename = "RealWorldValueIntercept", default, skip_serializing_if = "Option::is_none")]
    pub intercept: Option<f64>,

    #[serde(rename = "RealWorldValueSlope", default, skip_serializing_if = "Option::is_none")]
    pub slope: Option<f64>,
}

// =============================================================================
// Functional Group Macros
// =============================================================================

/// Position of a frame's top left pixel within the total pixel matrix (1-based).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlanePositionSlide {
    pub row_position_in_total_image_pixel_matrix: u32,
    pub column_position_in_total_image_pixel_matrix: u32,
}

/// Pixel measures of a frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PixelMeasures {
    /// `[row spacing, column spacing]` in millimetres
    #[serde(default)]
    pub pixel_spacing: Vec<f64>,
}

/// Reference from a frame to one optical path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OpticalPathIdentification {
    pub optical_path_identifier: String,
}

/// Reference from a frame to one segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SegmentIdentification {
    pub referenced_segment_number: u32,
}

/// One item of the shared or per-frame functional groups sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionalGroup {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plane_position_slide_sequence: Vec<PlanePositionSlide>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pixel_measures_sequence: Vec<PixelMeasures>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optical_path_identification_sequence: Vec<OpticalPathIdentification>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segment_identification_sequence: Vec<SegmentIdentification>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub real_world_value_mapping_sequence: Vec<RealWorldValueMapping>,
}

impl FunctionalGroup {
    /// The frame position, if declared.
    pub fn plane_position(&self) -> Option<&PlanePositionSlide> {
        self.plane_position_slide_sequence.first()
    }

    /// The `[row, column]` pixel spacing, if declared with both values.
    pub fn pixel_spacing(&self) -> Option<(f64, f64)> {
        let measures = self.pixel_measures_sequence.first()?;
        match measures.pixel_spacing.as_slice() {
            [row, column, ..] => Some((*row, *column)),
            _ => None,
        }
    }

    /// Identifier of the optical path this group references.
    pub fn optical_path_identifier(&self) -> Option<&str> {
        self.optical_path_identification_sequence
            .first()
            .map(|item| item.optical_path_identifier.as_str())
    }

    /// Number of the segment this group references.
    pub fn referenced_segment_number(&self) -> Option<u32> {
        self.segment_identification_sequence
            .first()
            .map(|item| item.referenced_segment_number)
    }
}

// =============================================================================
// Instance
// =============================================================================

/// Normalized metadata of one tiled DICOM image instance.
///
/// An instance is typically one pyramid level, or one concatenation part of
/// a level. It is immutable input to index construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instance {
    /// Frame height in pixels
    pub rows: u32,

    /// Frame width in pixels
    pub columns: u32,

    /// Height of the total pixel matrix (the mosaic of all frames)
    pub total_pixel_matrix_rows: u32,

    /// Width of the total pixel matrix
    pub total_pixel_matrix_columns: u32,

    #[serde(rename = "SOPInstanceUID")]
    pub sop_instance_uid: String,

    #[serde(default = "default_one")]
    pub number_of_frames: u32,

    #[serde(rename = "FrameOfReferenceUID", default)]
    pub frame_of_reference_uid: String,

    #[serde(default)]
    pub container_identifier: String,

    #[serde(default)]
    pub dimension_organization_type: DimensionOrganizationType,

    #[serde(default = "default_one")]
    pub total_pixel_matrix_focal_planes: u32,

    /// Offset of this part's first frame within the concatenation source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concatenation_frame_offset_number: Option<u32>,

    #[serde(
        rename = "SOPInstanceUIDOfConcatenationSource",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sop_instance_uid_of_concatenation_source: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_functional_groups_sequence: Vec<FunctionalGroup>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub per_frame_functional_groups_sequence: Vec<FunctionalGroup>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optical_path_sequence: Vec<OpticalPath>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segment_sequence: Vec<Segment>,
}

fn default_one() -> u32 {
    1
}

impl Default for Instance {
    fn default() -> Self {
        Self {
            rows: 0,
            columns: 0,
            total_pixel_matrix_rows: 0,
            total_pixel_matrix_columns: 0,
            sop_instance_uid: String::new(),
            number_of_frames: 1,
            frame_of_reference_uid: String::new(),
            container_identifier: String::new(),
            dimension_organization_type: DimensionOrganizationType::default(),
            total_pixel_matrix_focal_planes: 1,
            concatenation_frame_offset_number: None,
            sop_instance_uid_of_concatenation_source: None,
            shared_functional_groups_sequence: Vec::new(),
            per_frame_functional_groups_sequence: Vec::new(),
            optical_path_sequence: Vec::new(),
            segment_sequence: Vec::new(),
        }
    }
}

impl Instance {
    /// The shared functional group, if present.
    pub fn shared_group(&self) -> Option<&FunctionalGroup> {
        self.shared_functional_groups_sequence.first()
    }

    /// The per-frame functional group of a 1-based frame number.
    pub fn frame_group(&self, frame_number: u32) -> Option<&FunctionalGroup> {
        let index = frame_number.checked_sub(1)? as usize;
        self.per_frame_functional_groups_sequence.get(index)
    }

    /// Pixel spacing as `(row, column)` millimetres.
    ///
    /// Read from the shared functional group, falling back to the first
    /// per-frame group.
    pub fn pixel_spacing(&self) -> Option<(f64, f64)> {
        self.shared_group()
            .and_then(FunctionalGroup::pixel_spacing)
            .or_else(|| {
                self.per_frame_functional_groups_sequence
                    .first()
                    .and_then(FunctionalGroup::pixel_spacing)
            })
    }

    /// Whether this instance is one part of a concatenation.
    pub fn is_concatenation_part(&self) -> bool {
        self.sop_instance_uid_of_concatenation_source.is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================

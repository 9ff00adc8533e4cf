//! Error types for metadata loading, index construction and tile access.
//!
//! Each layer has its own enum. Index errors abort the whole build; tile
//! errors affect a single request.

use thiserror::Error;

/// Errors that can occur while loading normalized instance metadata.
#[derive(Debug, Clone, Error)]
pub enum MetadataError {
    /// The metadata file could not be read
    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },

    /// The metadata is not a JSON array of normalized instances
    #[error("Invalid instance metadata: {0}")]
    Json(String),
}

/// Errors that abort construction of a pyramid index.
///
/// Every variant is fatal to the build: no partial index is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    /// No instances were supplied
    #[error("Empty pyramid: no instance metadata was provided")]
    EmptyPyramid,

    /// The instance declares more than one focal plane
    #[error("Instance {sop_instance_uid} has {focal_planes} focal planes; only one is supported")]
    MultiFocalPlaneUnsupported {
        sop_instance_uid: String,
        focal_planes: u32,
    },

    /// Frame or total pixel matrix dimensions are zero
    #[error("Instance {sop_instance_uid} has a zero frame or total pixel matrix dimension")]
    InvalidTileSize { sop_instance_uid: String },

    /// No optical path, segment, or real world value mapping sequence found
    #[error("Could not determine number of channels of instance {sop_instance_uid}")]
    UnknownChannelCardinality { sop_instance_uid: String },

    /// A frame could not be attributed to any channel
    #[error("Could not determine channel of frame {frame_number} of instance {sop_instance_uid}")]
    UnresolvedChannelForFrame {
        sop_instance_uid: String,
        frame_number: u32,
    },

    /// A TILED_SPARSE frame has no plane position
    #[error("Frame {frame_number} of instance {sop_instance_uid} has no plane position")]
    MissingFramePosition {
        sop_instance_uid: String,
        frame_number: u32,
    },

    /// Instances do not belong to the same slide
    #[error("Inconsistent pyramid: {attribute} of instance {sop_instance_uid} is {found:?}, expected {expected:?}")]
    InconsistentPyramid {
        attribute: &'static str,
        sop_instance_uid: String,
        expected: String,
        found: String,
    },

    /// Instances disagree on the number of channels
    #[error("Instance {sop_instance_uid} has {found} channels, expected {expected}")]
    ChannelCountMismatch {
        sop_instance_uid: String,
        expected: usize,
        found: usize,
    },

    /// Two same-size instances are not linked as parts of one concatenation
    #[error("Instance {sop_instance_uid} has the same size as level {level_uid} but is not a part of its concatenation")]
    AmbiguousConcatenation {
        sop_instance_uid: String,
        level_uid: String,
    },

    /// Two concatenation parts address the same tile of the same channel
    #[error("Concatenation part {sop_instance_uid} overlaps tile {key} of level {level_uid}")]
    OverlappingConcatenation {
        sop_instance_uid: String,
        level_uid: String,
        key: String,
    },

    /// The pixel spacing of a level is not declared
    #[error("Instance {sop_instance_uid} does not declare a pixel spacing")]
    MissingPixelSpacing { sop_instance_uid: String },

    /// A level's downsample factor duplicates or undercuts a larger level's
    #[error("Downsample factor {downsample} of level {sop_instance_uid} collides with a higher resolution level")]
    ResolutionCollision {
        sop_instance_uid: String,
        downsample: f64,
    },
}

/// Errors that can occur while serving a single tile.
///
/// Tile errors are reported per request and never affect the index.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// The series URL is not an absolute http(s) URL
    #[error("Invalid series URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// Zoom level outside the pyramid
    #[error("Invalid zoom level {zoom}: pyramid has {levels} levels")]
    InvalidLevel { zoom: i32, levels: usize },

    /// The server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Http { url: String, status: u16 },

    /// The request did not complete within the configured timeout
    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// The multipart response body could not be split
    #[error("Malformed multipart response: {0}")]
    Multipart(String),

    /// The frame payload is not a decodable image
    #[error("Failed to decode frame {reference}: {message}")]
    Decode { reference: String, message: String },
}

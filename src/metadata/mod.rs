//! Normalized instance metadata.
//!
//! Index construction consumes one [`Instance`] per DICOM image object. The
//! raw-to-normalized conversion (DICOM JSON tag keys, Part 10 parsing) happens
//! upstream; this module only models the normalized form and loads it from
//! JSON.

mod instance;
mod load;

pub use instance::{
    DimensionOrganizationType, FunctionalGroup, Instance, OpticalPath, OpticalPathIdentification,
    PixelMeasures, PlanePositionSlide, RealWorldValueMapping, Segment, SegmentIdentification,
};
pub use load::{load_instances_from_path, load_instances_from_slice};

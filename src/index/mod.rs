//! Multi-resolution tile index construction.
//!
//! This module turns normalized instance metadata into a [`PyramidIndex`]
//! that addresses every frame of a slide by level, tile and channel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Vec<Instance> (JSON)           │
//! └────────────────────┬────────────────────┘
//!                      │  per instance
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             ChannelKind                 │
//! │  optical path | segment | parametric    │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             FrameMapping                │
//! │  "{row}-{col}-{channel}" → frame ref    │
//! └────────────────────┬────────────────────┘
//!                      │  all instances
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             PyramidIndex                │
//! │  levels (low → base), extent, channels  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Construction is synchronous and performs no I/O. The resulting index is
//! immutable and can be shared between concurrent tile requests.

mod channel;
mod frame_mapping;
mod level;
mod pyramid;

pub use channel::{ChannelKind, MappingGroup};
pub use frame_mapping::{
    build_frame_mapping, map_instance, tile_key, FrameMapping, FrameReference, InstanceFrames,
};
pub use level::{PhysicalSize, PixelSpacing, PyramidLevel};
pub use pyramid::PyramidIndex;

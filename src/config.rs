//! Configuration management for the DICOM WSI index tool.
//!
//! This module provides the command-line interface, which supports:
//! - Subcommands for index inspection and single tile retrieval
//! - Environment variables with `WSI_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Environment Variables
//!
//! - `WSI_METADATA` - Path to the normalized instance metadata JSON
//! - `WSI_SERIES_URL` - DICOMweb series base URL for tile retrieval
//! - `WSI_FETCH_TIMEOUT` - Frame request timeout in seconds (default: 30)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::io::DEFAULT_FETCH_TIMEOUT;

// =============================================================================
// Default Values
// =============================================================================

/// Default frame request timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = DEFAULT_FETCH_TIMEOUT.as_secs();

/// Default zoom (the base level).
pub const DEFAULT_ZOOM: i32 = 0;

// =============================================================================
// CLI Arguments
// =============================================================================

/// DICOM WSI Index - Tile index for DICOM whole-slide images.
///
/// Builds a multi-resolution tile index from normalized DICOM instance
/// metadata and retrieves individual tiles over DICOMweb.
#[derive(Parser, Debug, Clone)]
#[command(name = "dicom-wsi-index")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build the pyramid index and print it.
    Index(IndexConfig),

    /// Fetch a single tile and write it as PNG.
    Tile(TileConfig),
}

// =============================================================================
// Index Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct IndexConfig {
    /// Path to a JSON array of normalized instance metadata.
    #[arg(long, env = "WSI_METADATA")]
    pub metadata: PathBuf,

    /// Print the full index as JSON instead of a level summary.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl IndexConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        validate_metadata_path(&self.metadata)
    }
}

// =============================================================================
// Tile Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct TileConfig {
    /// Path to a JSON array of normalized instance metadata.
    #[arg(long, env = "WSI_METADATA")]
    pub metadata: PathBuf,

    /// DICOMweb series base URL, e.g. https://host/dicomweb/studies/{study}/series/{series}.
    #[arg(long, env = "WSI_SERIES_URL")]
    pub series_url: String,

    /// Signed zoom: 0 is the base level, |zoom| counts levels below it.
    #[arg(long, default_value_t = DEFAULT_ZOOM, allow_hyphen_values = true)]
    pub zoom: i32,

    /// Tile X coordinate (0-indexed from left).
    #[arg(long)]
    pub x: u32,

    /// Tile Y coordinate (0-indexed from top).
    #[arg(long)]
    pub y: u32,

    /// Channel identifier (optical path identifier, segment or mapping number).
    #[arg(long)]
    pub channel: String,

    /// Output PNG path.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Frame request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS, env = "WSI_FETCH_TIMEOUT")]
    pub timeout: u64,
}

impl TileConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        validate_metadata_path(&self.metadata)?;

        let url = Url::parse(&self.series_url)
            .map_err(|e| format!("Invalid series URL '{}': {}", self.series_url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "Series URL must use http or https, got '{}'",
                url.scheme()
            ));
        }

        if self.timeout == 0 {
            return Err("timeout must be greater than 0".to_string());
        }

        if self.channel.is_empty() {
            return Err("channel must not be empty".to_string());
        }

        Ok(())
    }

    /// Get the frame request timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

fn validate_metadata_path(path: &std::path::Path) -> Result<(), String> {
    if path.as_os_str().is_empty() {
        return Err("Metadata path is required. Set --metadata or WSI_METADATA".to_string());
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

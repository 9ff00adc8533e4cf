//! DICOM WSI Index - command-line front end.
//!
//! Builds the pyramid index of a slide from its instance metadata, and
//! optionally fetches a single tile over DICOMweb.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dicom_wsi_index::{
    config::{Cli, Command, IndexConfig, TileConfig},
    load_instances_from_path, DicomWebFrameSource, PyramidIndex, TileAccessor, TileRequest,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Index(config) => run_index(config),
        Command::Tile(config) => run_tile(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "dicom_wsi_index=debug"
    } else {
        "dicom_wsi_index=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load the metadata and build the index, logging any failure.
fn load_index(metadata: &std::path::Path) -> Option<PyramidIndex> {
    let instances = match load_instances_from_path(metadata) {
        Ok(instances) => instances,
        Err(e) => {
            error!("Failed to load metadata: {}", e);
            return None;
        }
    };

    match PyramidIndex::build(instances) {
        Ok(index) => Some(index),
        Err(e) => {
            error!("Failed to build pyramid index: {}", e);
            None
        }
    }
}

// =============================================================================
// Index Command
// =============================================================================

fn run_index(config: IndexConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let Some(index) = load_index(&config.metadata) else {
        return ExitCode::FAILURE;
    };

    if config.json {
        match serde_json::to_string_pretty(&index) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize index: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    let (width, height) = index.dimensions();
    println!("Slide: {}x{} px", width, height);
    println!("Frame of reference: {}", index.frame_of_reference_uid());
    println!("Container: {}", index.container_identifier());
    println!("Channels: {}", index.number_of_channels());
    println!();
    println!(
        "{:>5}  {:>12}  {:>9}  {:>9}  {:>10}  {:>7}  {:>7}  {}",
        "zoom", "size", "tile", "grid", "downsample", "tiles", "frames", "instance"
    );

    let count = index.level_count();
    for (position, level) in index.levels().iter().enumerate() {
        let zoom = -((count - 1 - position) as i64);
        println!(
            "{:>5}  {:>12}  {:>9}  {:>9}  {:>10}  {:>7}  {:>7}  {}",
            zoom,
            format!("{}x{}", level.width, level.height),
            format!("{}x{}", level.tile_width, level.tile_height),
            format!("{}x{}", level.tiles_x, level.tiles_y),
            level.downsample,
            level.tile_count(),
            level.frame_mapping.len(),
            level.sop_instance_uid
        );
    }

    for warning in index.warnings() {
        println!();
        println!("Warning: {}", warning);
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Tile Command
// =============================================================================

async fn run_tile(config: TileConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let Some(index) = load_index(&config.metadata) else {
        return ExitCode::FAILURE;
    };

    let source = match DicomWebFrameSource::new(&config.series_url, config.fetch_timeout()) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to create DICOMweb client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let accessor = TileAccessor::new(Arc::new(index), source);
    let request = TileRequest::new(config.zoom, config.x, config.y, config.channel.clone());

    let tile = match accessor.get_tile(&request).await {
        Ok(Some(tile)) => tile,
        Ok(None) => {
            error!(
                "No tile at x={} y={} channel={} for zoom {}",
                config.x, config.y, config.channel, config.zoom
            );
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("Failed to fetch tile: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tile.image.save(&config.output) {
        error!("Failed to write {}: {}", config.output.display(), e);
        return ExitCode::FAILURE;
    }

    info!(
        "Wrote {}x{} tile from {} to {}",
        tile.image.width(),
        tile.image.height(),
        tile.frame,
        config.output.display()
    );

    ExitCode::SUCCESS
}

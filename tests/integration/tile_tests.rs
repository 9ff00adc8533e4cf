//! Tile accessor tests.
//!
//! These tests run the resolve, fetch, decode and mask pipeline against an
//! in-memory frame source.

use std::collections::HashMap;
use std::sync::Arc;

use dicom_wsi_index::error::TileError;
use dicom_wsi_index::index::PyramidIndex;
use dicom_wsi_index::tile::{TileAccessor, TileRequest, PADDING_COLOR};
use image::Rgba;

use super::test_utils::{png_tile, sparse_instance, tiled_full_instance, MockFrameSource};

const RED: [u8; 4] = [255, 0, 0, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

fn accessor(
    index: PyramidIndex,
    frames: Vec<(&str, Vec<u8>)>,
) -> TileAccessor<MockFrameSource> {
    let frames: HashMap<String, Vec<u8>> = frames
        .into_iter()
        .map(|(reference, data)| (reference.to_string(), data))
        .collect();
    TileAccessor::new(Arc::new(index), MockFrameSource::new(frames))
}

fn two_level_index() -> PyramidIndex {
    PyramidIndex::build(vec![
        tiled_full_instance("base", 512, 256, &["1"]),
        tiled_full_instance("low", 256, 256, &["1"]),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_get_full_tile() {
    let accessor = accessor(
        two_level_index(),
        vec![("base/frames/4", png_tile(256, 256, RED))],
    );

    let tile = accessor
        .get_tile(&TileRequest::new(0, 1, 1, "1"))
        .await
        .unwrap()
        .expect("tile should exist");

    assert_eq!(tile.level, 1);
    assert_eq!(tile.frame.to_string(), "base/frames/4");
    assert_eq!((tile.visible_width, tile.visible_height), (256, 256));
    assert_eq!(tile.image.dimensions(), (256, 256));
    assert_eq!(tile.image.get_pixel(255, 255), &Rgba(RED));
    assert_eq!(accessor.source().request_count(), 1);
}

#[tokio::test]
async fn test_negative_and_positive_zoom_address_same_level() {
    let accessor = accessor(
        two_level_index(),
        vec![("low/frames/1", png_tile(256, 256, RED))],
    );

    for zoom in [-1, 1] {
        let tile = accessor
            .get_tile(&TileRequest::new(zoom, 0, 0, "1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tile.level, 0);
        assert_eq!(tile.frame.to_string(), "low/frames/1");
    }
}

#[tokio::test]
async fn test_edge_tile_padding_is_masked() {
    // 1000x700 with 256 tiles: 4x3 grid, last tile shows 232x188 pixels
    let mut instance = tiled_full_instance("edge", 1000, 256, &["1"]);
    instance.total_pixel_matrix_rows = 700;
    instance.number_of_frames = 12;
    let index = PyramidIndex::build(vec![instance]).unwrap();

    let accessor = accessor(index, vec![("edge/frames/12", png_tile(256, 256, WHITE))]);
    let tile = accessor
        .get_tile(&TileRequest::new(0, 3, 2, "1"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!((tile.visible_width, tile.visible_height), (232, 188));
    assert_eq!(tile.image.dimensions(), (256, 256));
    assert_eq!(tile.image.get_pixel(231, 187), &Rgba(WHITE));
    assert_eq!(tile.image.get_pixel(232, 0), &PADDING_COLOR);
    assert_eq!(tile.image.get_pixel(0, 188), &PADDING_COLOR);
    assert_eq!(tile.image.get_pixel(255, 255), &PADDING_COLOR);
}

#[tokio::test]
async fn test_missing_sparse_tile_is_not_an_error() {
    let index =
        PyramidIndex::build(vec![sparse_instance("sparse", 512, 512, 256, &[(0, 0), (1, 1)])])
            .unwrap();
    let accessor = accessor(index, vec![("sparse/frames/1", png_tile(256, 256, RED))]);

    let result = accessor
        .get_tile(&TileRequest::new(0, 1, 0, "1"))
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(accessor.source().request_count(), 0);
}

#[tokio::test]
async fn test_unknown_channel_is_not_an_error() {
    let accessor = accessor(two_level_index(), vec![]);

    let result = accessor
        .get_tile(&TileRequest::new(0, 0, 0, "2"))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_tile_coordinates_at_u32_limit_address_no_tile() {
    let accessor = accessor(two_level_index(), vec![]);

    for (x, y) in [(u32::MAX, 0), (0, u32::MAX), (u32::MAX, u32::MAX)] {
        let result = accessor
            .get_tile(&TileRequest::new(0, x, y, "1"))
            .await
            .unwrap();
        assert!(result.is_none());
    }
    assert_eq!(accessor.source().request_count(), 0);
}

#[tokio::test]
async fn test_invalid_zoom() {
    let accessor = accessor(two_level_index(), vec![]);

    let err = accessor
        .get_tile(&TileRequest::new(-2, 0, 0, "1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TileError::InvalidLevel {
            zoom: -2,
            levels: 2
        }
    ));
}

#[tokio::test]
async fn test_fetch_error_propagates() {
    let accessor = accessor(two_level_index(), vec![]);

    let err = accessor
        .get_tile(&TileRequest::new(0, 0, 0, "1"))
        .await
        .unwrap_err();

    assert!(matches!(err, TileError::Http { status: 404, .. }));
    assert_eq!(
        accessor.source().get_requests().await,
        vec!["base/frames/1".to_string()]
    );
}

#[tokio::test]
async fn test_decode_error_propagates() {
    let accessor = accessor(
        two_level_index(),
        vec![("base/frames/1", b"definitely not an image".to_vec())],
    );

    let err = accessor
        .get_tile(&TileRequest::new(0, 0, 0, "1"))
        .await
        .unwrap_err();

    match err {
        TileError::Decode { reference, .. } => assert_eq!(reference, "base/frames/1"),
        e => panic!("Expected Decode error, got {:?}", e),
    }
}

#[tokio::test]
async fn test_resolve_does_not_fetch() {
    let accessor = accessor(two_level_index(), vec![]);

    let frame = accessor
        .resolve(&TileRequest::new(0, 1, 0, "1"))
        .unwrap()
        .unwrap();
    assert_eq!(frame.to_string(), "base/frames/2");
    assert!(accessor
        .resolve(&TileRequest::new(0, 2, 0, "1"))
        .unwrap()
        .is_none());
    assert_eq!(accessor.source().request_count(), 0);
}

#[tokio::test]
async fn test_concurrent_requests() {
    let frames = (1..=4)
        .map(|n| (format!("base/frames/{}", n), png_tile(256, 256, RED)))
        .collect::<Vec<_>>();
    let frames = frames
        .iter()
        .map(|(reference, data)| (reference.as_str(), data.clone()))
        .collect();
    let accessor = Arc::new(accessor(two_level_index(), frames));

    let mut handles = Vec::new();
    for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        let accessor = Arc::clone(&accessor);
        handles.push(tokio::spawn(async move {
            accessor.get_tile(&TileRequest::new(0, x, y, "1")).await
        }));
    }

    for handle in handles {
        let tile = handle.await.unwrap().unwrap();
        assert!(tile.is_some());
    }
    assert_eq!(accessor.source().request_count(), 4);
}

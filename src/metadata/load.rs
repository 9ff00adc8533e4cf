//! Loading normalized instance metadata from JSON.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::MetadataError;

use super::Instance;

/// A metadata document holds either one instance or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum MetadataDocument {
    Many(Vec<Instance>),
    One(Box<Instance>),
}

/// Parse normalized instance metadata from JSON bytes.
///
/// Accepts a JSON array of instances or a single instance object.
pub fn load_instances_from_slice(data: &[u8]) -> Result<Vec<Instance>, MetadataError> {
    let document: MetadataDocument =
        serde_json::from_slice(data).map_err(|e| MetadataError::Json(e.to_string()))?;

    Ok(match document {
        MetadataDocument::Many(instances) => instances,
        MetadataDocument::One(instance) => vec![*instance],
    })
}

/// Read and parse normalized instance metadata from a JSON file.
pub fn load_instances_from_path(path: impl AsRef<Path>) -> Result<Vec<Instance>, MetadataError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| MetadataError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let instances = load_instances_from_slice(&data)?;
    debug!(
        path = %path.display(),
        count = instances.len(),
        "Loaded instance metadata"
    );
    Ok(instances)
}

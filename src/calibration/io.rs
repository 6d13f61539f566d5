//! Dataset file I/O

use std::path::Path;

use super::error::Result;
use super::types::{CoordinateDataset, OverlayDataset};

/// Read a coordinate dataset
pub async fn load_coordinates<P: AsRef<Path>>(path: P) -> Result<CoordinateDataset> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Read an overlay dataset
pub async fn load_overlay<P: AsRef<Path>>(path: P) -> Result<OverlayDataset> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Read an overlay dataset if the file exists
///
/// Used to find the prior output that pass-through entries are copied from.
/// A prior file that cannot be parsed is ignored with a warning.
pub async fn load_overlay_if_exists<P: AsRef<Path>>(path: P) -> Result<Option<OverlayDataset>> {
    let path = path.as_ref();
    if !tokio::fs::try_exists(path).await? {
        return Ok(None);
    }
    match load_overlay(path).await {
        Ok(dataset) => Ok(Some(dataset)),
        Err(e) => {
            tracing::warn!(path = %path.display(), "Ignoring unreadable prior overlay: {}", e);
            Ok(None)
        }
    }
}

/// Write an overlay dataset as pretty JSON
pub async fn write_overlay<P: AsRef<Path>>(path: P, dataset: &OverlayDataset) -> Result<()> {
    let mut json = serde_json::to_vec_pretty(dataset)?;
    json.push(b'\n');
    tokio::fs::write(path.as_ref(), json).await?;
    Ok(())
}

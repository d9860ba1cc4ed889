//! Export per-bin values to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::path::Path;

use crate::error::ModelError;
use crate::models::ModelExport;

/// Write one row per `(x, y)` bin.
pub fn write_bins_csv(path: &Path, export: &ModelExport) -> Result<(), ModelError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| ModelError::Io(format!("failed to create bins CSV '{}': {e}", path.display())))?;
    for bin in &export.bins {
        writer
            .serialize(bin)
            .map_err(|e| ModelError::Io(format!("failed to write bins CSV row ({}, {}): {e}", bin.x, bin.y)))?;
    }
    writer
        .flush()
        .map_err(|e| ModelError::Io(format!("failed to flush bins CSV '{}': {e}", path.display())))
}

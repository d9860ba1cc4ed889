//! Model JSON files.
//!
//! A model JSON is the portable snapshot of a built model (`ModelExport`):
//! the ordered parameter table, the floating fail bins and one record per
//! bin. Reading one back gives a `ParameterStore` for re-seeding a build.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::ModelError;
use crate::models::ModelExport;

/// Write a model JSON file.
pub fn write_model_json(path: &Path, export: &ModelExport) -> Result<(), ModelError> {
    let file = File::create(path)
        .map_err(|e| ModelError::Io(format!("failed to create model JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), export)
        .map_err(|e| ModelError::Io(format!("failed to write model JSON '{}': {e}", path.display())))
}

/// Read a model JSON file.
pub fn read_model_json(path: &Path) -> Result<ModelExport, ModelError> {
    let file = File::open(path)
        .map_err(|e| ModelError::Io(format!("failed to open model JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ModelError::Config(format!("invalid model JSON '{}': {e}", path.display())))
}

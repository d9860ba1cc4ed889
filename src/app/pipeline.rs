//! Shared build pipeline.
//!
//! config JSON -> histograms -> partition + transfer function -> per-bin nodes
//!
//! Each configuration owns its `ParameterStore`, so independent
//! configurations are built in parallel; a single build stays sequential.

use std::path::Path;

use rayon::prelude::*;
use tracing::info;

use crate::domain::ModelConfig;
use crate::error::ModelError;
use crate::io::{load_inputs, read_config_json};
use crate::models::{BuiltModel, ModelInputs};

/// One configuration together with its loaded histograms.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub config: ModelConfig,
    pub inputs: ModelInputs,
}

impl BuildRequest {
    /// Read a configuration file and every histogram it references.
    ///
    /// A non-empty `suffix` replaces the configuration's own `SUFFIX`.
    pub fn load(path: &Path, suffix: Option<&str>) -> Result<Self, ModelError> {
        let mut config = read_config_json(path)?;
        if let Some(s) = suffix.filter(|s| !s.is_empty()) {
            config.suffix = s.to_string();
        }
        let inputs = load_inputs(&config)?;
        Ok(Self { config, inputs })
    }
}

/// Build a single configuration.
pub fn build_model(config: &ModelConfig, inputs: &ModelInputs) -> Result<BuiltModel, ModelError> {
    BuiltModel::build(config, inputs)
}

/// Build independent configurations in parallel.
///
/// Results come back in input order. The first failure, in input order, is
/// returned.
pub fn build_all(requests: &[BuildRequest]) -> Result<Vec<BuiltModel>, ModelError> {
    info!(configs = requests.len(), "building configurations");
    requests
        .par_iter()
        .map(|r| build_model(&r.config, &r.inputs))
        .collect()
}

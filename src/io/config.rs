//! Model configuration files and the histograms they reference.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::ModelConfig;
use crate::error::ModelError;
use crate::io::hist::read_hist_json;
use crate::models::ModelInputs;

/// Read a configuration and resolve its relative `INPUTS` paths against the
/// file's directory.
pub fn read_config_json(path: &Path) -> Result<ModelConfig, ModelError> {
    let file = File::open(path)
        .map_err(|e| ModelError::Io(format!("failed to open config '{}': {e}", path.display())))?;
    let mut config: ModelConfig = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ModelError::Config(format!("invalid config JSON '{}': {e}", path.display())))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let inputs = &mut config.inputs;
    inputs.fail = inputs.fail.take().map(|p| resolve(base, p));
    inputs.minor = std::mem::take(&mut inputs.minor).into_iter().map(|p| resolve(base, p)).collect();
    inputs.ratio = inputs.ratio.take().map(|p| resolve(base, p));

    if config.options.rpf_ratio && config.inputs.ratio.is_none() {
        return Err(ModelError::Config(format!(
            "model '{}': OPTIONS.RPF_RATIO requires INPUTS.RATIO",
            config.name
        )));
    }
    debug!(config = %path.display(), model = %config.name, "loaded configuration");
    Ok(config)
}

/// Load every histogram a configuration references.
pub fn load_inputs(config: &ModelConfig) -> Result<ModelInputs, ModelError> {
    let fail_path = config.inputs.fail.as_ref().ok_or_else(|| {
        ModelError::Config(format!("model '{}': INPUTS.FAIL is required", config.name))
    })?;
    let fail = read_hist_json(fail_path)?;
    let minor = config
        .inputs
        .minor
        .iter()
        .map(|p| read_hist_json(p))
        .collect::<Result<Vec<_>, _>>()?;
    let ratio = config.inputs.ratio.as_deref().map(read_hist_json).transpose()?;
    Ok(ModelInputs { fail, minor, ratio })
}

fn resolve(base: &Path, p: PathBuf) -> PathBuf {
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"{
        "NAME": "SR",
        "BINNING": {
            "X": {"LOW": 0, "HIGH": 10, "NBINS": 10, "BLIND_START": 4, "BLIND_END": 6},
            "Y": {"LOW": 0, "HIGH": 5, "NBINS": 5}
        },
        "FIT": {"POLY": {"XORDER": 1, "YORDER": 1}},
        "OPTIONS": {"RPF_RATIO": false},
        "INPUTS": {"FAIL": "fail.json", "MINOR": ["/abs/ttbar.json"]}
    }"#;

    #[test]
    fn relative_inputs_resolve_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sr.json");
        File::create(&path).unwrap().write_all(CONFIG.as_bytes()).unwrap();

        let cfg = read_config_json(&path).unwrap();
        assert_eq!(cfg.inputs.fail.as_deref(), Some(dir.path().join("fail.json").as_path()));
        assert_eq!(cfg.inputs.minor, vec![PathBuf::from("/abs/ttbar.json")]);
        assert!(cfg.options.blinded);
        assert_eq!(cfg.suffix, "");
    }

    #[test]
    fn ratio_option_requires_ratio_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sr.json");
        let text = CONFIG.replace(r#""RPF_RATIO": false"#, r#""RPF_RATIO": true"#);
        File::create(&path).unwrap().write_all(text.as_bytes()).unwrap();
        assert!(matches!(read_config_json(&path), Err(ModelError::Config(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_config_json(Path::new("/nonexistent/cfg.json")).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }
}

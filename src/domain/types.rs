//! Configuration types.
//!
//! The configuration is a JSON document with upper-case keys. It is read once
//! per named model; nothing here is mutated after load.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A full model configuration as read from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct ModelConfig {
    /// Model name, appended to every bin-scoped node name.
    pub name: String,
    /// Disambiguates parameter names when several configurations share one
    /// parameter namespace. Empty means no suffix.
    #[serde(default)]
    pub suffix: String,
    pub binning: BinningConfig,
    pub fit: FitConfig,
    #[serde(default)]
    pub options: ModelOptions,
    #[serde(default)]
    pub inputs: InputPaths,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct BinningConfig {
    pub x: AxisConfig,
    pub y: AxisConfig,
}

/// One axis of the binning block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AxisConfig {
    #[serde(default)]
    pub title: String,
    pub low: f64,
    pub high: f64,
    pub nbins: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blind_start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blind_end: Option<f64>,
}

impl AxisConfig {
    /// Validated uniform geometry of this axis.
    pub fn spec(&self) -> Result<AxisSpec, ModelError> {
        AxisSpec::new(self.low, self.high, self.nbins)
    }
}

/// Transfer-function block.
///
/// Exactly one of `SPLITPOLY`, `POLY`, `BASIS` or `FORM` must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct FitConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splitpoly: Option<OrderSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poly: Option<OrderSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basis: Option<OrderSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    /// Per-coefficient settings keyed by coefficient index (`X0`, `x1y0`, `3`, ...).
    #[serde(default)]
    pub params: BTreeMap<String, ParamSpec>,
    /// Applied to every coefficient that has no entry in `params`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamSpec>,
}

/// Polynomial / basis order per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct OrderSpec {
    pub xorder: usize,
    pub yorder: usize,
}

/// Declared settings of one coefficient.
///
/// Leaving out both `MIN` and `MAX` makes the coefficient constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct ParamSpec {
    pub nominal: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ModelOptions {
    /// Apply the blind window of the X axis when building nodes.
    #[serde(default = "default_true")]
    pub blinded: bool,
    /// Multiply every pass bin by a constant mc-ratio term.
    #[serde(default)]
    pub rpf_ratio: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            blinded: true,
            rpf_ratio: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Histogram inputs. Relative paths are resolved against the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct InputPaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<PathBuf>,
    #[serde(default)]
    pub minor: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<PathBuf>,
}

/// Uniform axis geometry.
///
/// Bin indices are 1-based, as in the histograms this crate consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSpec {
    pub low: f64,
    pub high: f64,
    pub nbins: usize,
}

impl AxisSpec {
    pub fn new(low: f64, high: f64, nbins: usize) -> Result<Self, ModelError> {
        if !(low.is_finite() && high.is_finite() && high > low) {
            return Err(ModelError::Config(format!(
                "invalid axis range: low={low}, high={high} (must be finite and high>low)"
            )));
        }
        if nbins == 0 {
            return Err(ModelError::Config("axis must have at least one bin".into()));
        }
        Ok(Self { low, high, nbins })
    }

    pub fn width(&self) -> f64 {
        (self.high - self.low) / self.nbins as f64
    }

    /// Lower edge of bin `i` (1-based). `edge(nbins + 1) == high`.
    pub fn edge(&self, i: usize) -> f64 {
        if i == self.nbins + 1 {
            return self.high;
        }
        self.low + (i as f64 - 1.0) * self.width()
    }

    pub fn edges(&self) -> Vec<f64> {
        (1..=self.nbins + 1).map(|i| self.edge(i)).collect()
    }

    pub fn center(&self, i: usize) -> f64 {
        0.5 * (self.edge(i) + self.edge(i + 1))
    }

    /// Map a physical coordinate onto the unit domain of this axis.
    pub fn map(&self, value: f64) -> f64 {
        (value - self.low) / (self.high - self.low)
    }

    /// Bin center of bin `i` mapped onto the unit domain.
    pub fn mapped_center(&self, i: usize) -> f64 {
        self.map(self.center(i))
    }

    /// Tolerance used when comparing edges of this axis.
    pub fn edge_tolerance(&self) -> f64 {
        1e-9 * (self.high - self.low).abs().max(1.0)
    }
}

//! Serializable snapshot of a built model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assemble::BinState;
use crate::error::ModelError;
use crate::models::BuiltModel;
use crate::params::{AsymError, Parameter, ParameterKind, ParameterStore};

/// Parameter declaration as exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub name: String,
    pub kind: ParameterKind,
    pub nominal: f64,
    pub value: f64,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub error: Option<AsymError>,
    pub reportable: bool,
}

impl From<&Parameter> for ParameterRecord {
    fn from(p: &Parameter) -> Self {
        Self {
            name: p.name.clone(),
            kind: p.kind,
            nominal: p.nominal,
            value: p.value,
            low: p.low,
            high: p.high,
            error: p.error,
            reportable: p.reportable(),
        }
    }
}

impl From<ParameterRecord> for Parameter {
    fn from(r: ParameterRecord) -> Self {
        Parameter {
            name: r.name,
            kind: r.kind,
            nominal: r.nominal,
            value: r.value,
            low: r.low,
            high: r.high,
            error: r.error,
        }
    }
}

/// One `(x, y)` bin of the exported model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinRecord {
    pub x: usize,
    pub y: usize,
    pub category: String,
    pub state: BinState,
    pub fail_name: String,
    pub fail_value: f64,
    pub pass_name: String,
    pub pass_value: f64,
    pub transfer_value: f64,
}

/// Morphed value of one bin of a shape systematic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeBinRecord {
    pub x: usize,
    pub y: usize,
    pub node: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub name: String,
    pub nuisance: String,
    pub bins: Vec<ShapeBinRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelExport {
    pub name: String,
    pub generated: DateTime<Utc>,
    pub family: String,
    pub labels: Vec<String>,
    pub parameters: Vec<ParameterRecord>,
    pub floating_fail_bins: Vec<String>,
    pub bins: Vec<BinRecord>,
    #[serde(default)]
    pub shapes: Vec<ShapeRecord>,
}

impl BuiltModel {
    /// Snapshot of parameters and per-bin values at the current store state.
    pub fn export(&self) -> Result<ModelExport, ModelError> {
        let mut bins = Vec::with_capacity(self.n_bins_x() * self.n_bins_y());
        for ((x, y), fail) in self.assembly.fail.iter() {
            let pass = self.pass_node(x, y);
            let (category, _) = self.partition.category_of(x)?;
            bins.push(BinRecord {
                x,
                y,
                category: category.to_string(),
                state: self.state(x, y),
                fail_name: fail.name().to_string(),
                fail_value: fail.value(&self.store)?,
                pass_name: pass.name().to_string(),
                pass_value: pass.value(&self.store)?,
                transfer_value: self.transfer_node(x, y).value(&self.store)?,
            });
        }
        let shapes = self
            .shapes
            .iter()
            .map(|shape| {
                let bins = shape
                    .grid
                    .iter()
                    .map(|((x, y), node)| {
                        Ok(ShapeBinRecord {
                            x,
                            y,
                            node: node.name().to_string(),
                            value: node.value(&self.store)?,
                        })
                    })
                    .collect::<Result<Vec<_>, ModelError>>()?;
                Ok(ShapeRecord {
                    name: shape.name.clone(),
                    nuisance: shape.nuisance.clone(),
                    bins,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        Ok(ModelExport {
            name: self.name.clone(),
            generated: Utc::now(),
            family: self.transfer.family().tag().to_string(),
            labels: self.partition.labels(),
            parameters: self.store.parameters().iter().map(ParameterRecord::from).collect(),
            floating_fail_bins: self.floating_fail_bins().to_vec(),
            bins,
            shapes,
        })
    }
}

impl ModelExport {
    /// Parameter table as a store, for re-seeding a fresh build.
    pub fn to_store(&self) -> Result<ParameterStore, ModelError> {
        ParameterStore::from_parameters(self.parameters.iter().cloned().map(Parameter::from))
    }
}

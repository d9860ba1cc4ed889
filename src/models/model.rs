//! One configuration, built.

use std::sync::Arc;

use tracing::info;

use crate::assemble::{Assembly, AssemblerInputs, BinState, ModelAssembler};
use crate::binning::BinPartition;
use crate::domain::{AxisSpec, Hist2D, Histogram2D, ModelConfig};
use crate::error::ModelError;
use crate::morph::{declare_nuisance, morph_grid_on};
use crate::node::{Node, NodeGrid};
use crate::params::{ConflictPolicy, MergeReport, ParameterStore};
use crate::transfer::TransferFunction;

/// Histograms feeding one configuration.
#[derive(Debug, Clone)]
pub struct ModelInputs {
    pub fail: Hist2D,
    pub minor: Vec<Hist2D>,
    pub ratio: Option<Hist2D>,
}

impl ModelInputs {
    pub fn fail_only(fail: Hist2D) -> Self {
        Self {
            fail,
            minor: Vec::new(),
            ratio: None,
        }
    }
}

/// A per-bin shape systematic attached to a model.
#[derive(Debug, Clone)]
pub struct ShapeSystematic {
    pub name: String,
    pub nuisance: String,
    pub grid: NodeGrid,
}

#[derive(Debug, Clone)]
pub struct BuiltModel {
    pub name: String,
    pub suffix: String,
    pub x_title: String,
    pub y_title: String,
    pub partition: BinPartition,
    pub y_axis: AxisSpec,
    pub transfer: TransferFunction,
    pub store: ParameterStore,
    pub assembly: Assembly,
    pub shapes: Vec<ShapeSystematic>,
    pub blinded: bool,
    pub ratio_mode: bool,
}

impl BuiltModel {
    /// Partition, transfer function and per-bin nodes for `config`.
    ///
    /// Transfer-function coefficients are declared before any fail bin, so
    /// the store lists them first.
    pub fn build(config: &ModelConfig, inputs: &ModelInputs) -> Result<Self, ModelError> {
        info!(model = %config.name, "building model");
        let partition = BinPartition::from_config(&config.binning.x)?;
        let y_axis = config.binning.y.spec()?;

        let mut store = ParameterStore::new();
        let transfer = TransferFunction::build(&config.fit, &config.name, &config.suffix, &mut store)?;

        let minor: Vec<&dyn Histogram2D> = inputs.minor.iter().map(|h| h as &dyn Histogram2D).collect();
        let assembler = ModelAssembler {
            name: &config.name,
            suffix: &config.suffix,
            partition: &partition,
            y_axis: &y_axis,
            transfer: &transfer,
            blinded: config.options.blinded,
            ratio_mode: config.options.rpf_ratio,
        };
        let assembly = assembler.assemble(
            &mut store,
            &AssemblerInputs {
                fail: &inputs.fail,
                minor: &minor,
                ratio: inputs.ratio.as_ref().map(|h| h as &dyn Histogram2D),
            },
        )?;

        info!(
            model = %config.name,
            family = transfer.family().tag(),
            parameters = store.len(),
            floating_fail_bins = assembly.floating_fail_bins.len(),
            "model built"
        );
        Ok(Self {
            name: config.name.clone(),
            suffix: config.suffix.clone(),
            x_title: config.binning.x.title.clone(),
            y_title: config.binning.y.title.clone(),
            partition,
            y_axis,
            transfer,
            store,
            assembly,
            shapes: Vec::new(),
            blinded: config.options.blinded,
            ratio_mode: config.options.rpf_ratio,
        })
    }

    pub fn n_bins_x(&self) -> usize {
        self.partition.n_bins()
    }

    pub fn n_bins_y(&self) -> usize {
        self.y_axis.nbins
    }

    pub fn fail_node(&self, x: usize, y: usize) -> &Arc<Node> {
        self.assembly.fail.get(x, y)
    }

    pub fn pass_node(&self, x: usize, y: usize) -> &Arc<Node> {
        self.assembly.pass.get(x, y)
    }

    pub fn transfer_node(&self, x: usize, y: usize) -> &Arc<Node> {
        self.assembly.transfer.get(x, y)
    }

    pub fn state(&self, x: usize, y: usize) -> BinState {
        self.assembly.state(x, y)
    }

    pub fn floating_fail_bins(&self) -> &[String] {
        &self.assembly.floating_fail_bins
    }

    /// Pass-region prediction at the current parameter values, row-major.
    pub fn pass_values(&self) -> Result<Vec<f64>, ModelError> {
        self.assembly.pass.values(&self.store)
    }

    /// Fold a previous fit's parameters into this model.
    pub fn seed_from(&mut self, other: &ParameterStore, policy: ConflictPolicy) -> Result<MergeReport, ModelError> {
        let report = self.store.merge(other, policy)?;
        info!(
            model = %self.name,
            updated = report.updated.len(),
            added = report.added.len(),
            kept = report.kept.len(),
            "seeded parameters"
        );
        Ok(report)
    }

    /// Attach a shape systematic morphing `nominal` between `up` and `down`.
    ///
    /// The nuisance is declared in this model's store unless already present.
    pub fn add_shape(
        &mut self,
        name: &str,
        nuisance: &str,
        templates: [&dyn Histogram2D; 3],
    ) -> Result<&ShapeSystematic, ModelError> {
        let handle = declare_nuisance(&mut self.store, nuisance)?;
        let grid = morph_grid_on(
            name,
            Arc::new(Node::leaf(handle)),
            self.partition.axis(),
            &self.y_axis,
            templates,
        )?;
        self.shapes.push(ShapeSystematic {
            name: name.to_string(),
            nuisance: nuisance.to_string(),
            grid,
        });
        Ok(&self.shapes[self.shapes.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::BIN_EPSILON;
    use crate::domain::{AxisConfig, BinningConfig, FitConfig, ModelOptions, OrderSpec, ParamSpec};

    fn config() -> ModelConfig {
        ModelConfig {
            name: "SR".into(),
            suffix: String::new(),
            binning: BinningConfig {
                x: AxisConfig {
                    title: "mJ".into(),
                    low: 0.0,
                    high: 4.0,
                    nbins: 4,
                    blind_start: Some(1.0),
                    blind_end: Some(2.0),
                },
                y: AxisConfig {
                    title: "mJJ".into(),
                    low: 0.0,
                    high: 2.0,
                    nbins: 2,
                    blind_start: None,
                    blind_end: None,
                },
            },
            fit: FitConfig {
                poly: Some(OrderSpec { xorder: 0, yorder: 0 }),
                default: Some(ParamSpec {
                    nominal: 0.5,
                    min: Some(0.0),
                    max: Some(2.0),
                    error: None,
                }),
                ..FitConfig::default()
            },
            options: ModelOptions::default(),
            inputs: Default::default(),
        }
    }

    fn inputs(cfg: &ModelConfig) -> ModelInputs {
        let x = cfg.binning.x.spec().unwrap();
        let y = cfg.binning.y.spec().unwrap();
        let mut fail = Hist2D::uniform("fail", &x, &y);
        for by in 1..=2 {
            for bx in 1..=4 {
                fail.set_poisson(bx, by, 40.0);
            }
        }
        ModelInputs::fail_only(fail)
    }

    #[test]
    fn build_orders_transfer_coefficients_first() {
        let cfg = config();
        let model = BuiltModel::build(&cfg, &inputs(&cfg)).unwrap();
        assert_eq!(model.store.parameters()[0].name, "fullPoly_x0y0");
        // bin 2 is blinded on both rows
        assert_eq!(model.floating_fail_bins().len(), 6);
        assert_eq!(model.state(2, 1), BinState::Blinded);
        let pass = model.pass_values().unwrap();
        assert!((pass[0] - 20.0).abs() < 1e-9);
        assert_eq!(pass[1], BIN_EPSILON);
    }

    #[test]
    fn shape_attaches_nuisance() {
        let cfg = config();
        let mut model = BuiltModel::build(&cfg, &inputs(&cfg)).unwrap();
        let nominal = inputs(&cfg).fail;
        let shape = model
            .add_shape("jes", "jesNuisance", [&nominal, &nominal, &nominal])
            .unwrap();
        assert_eq!(shape.grid.get(4, 2).name(), "jes_bin_4-2");
        assert!(model.store.contains("jesNuisance"));
    }
}

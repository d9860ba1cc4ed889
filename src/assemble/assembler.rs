//! Fail/pass node assembly.
//!
//! Every bin is classified, in this priority order, as:
//!
//! 1. `Blinded`: X range overlaps the blind window. Fail and pass become
//!    `Constant(BIN_EPSILON)`; the transfer node is still built.
//! 2. `ZeroOrNegative`: content after subtracting the minor backgrounds is
//!    `<= 0`. Fail and pass become `Constant(BIN_EPSILON)`.
//! 3. `LowStatistics`: content `< 10`. Floating fail bin with a wide window.
//! 4. `Normal`: floating fail bin in `[BIN_EPSILON, 3 × content]` carrying
//!    the propagated asymmetric error.
//!
//! Non-constant pass bins are `fail × transfer` (`× mc-ratio` in ratio mode).
//! Bins are visited row-major (`y` outer, `x` inner); parameter declaration
//! order, and therefore every serialized listing, follows that order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::binning::BinPartition;
use crate::domain::{AxisSpec, Histogram2D, edges_match};
use crate::error::ModelError;
use crate::node::{Node, NodeGrid, Op};
use crate::params::{AsymError, ParameterStore};
use crate::transfer::{TransferFunction, with_suffix};

/// Value of constant placeholder bins and lower bound of floating bins.
pub const BIN_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinState {
    Blinded,
    ZeroOrNegative,
    LowStatistics,
    Normal,
}

/// Fail-region content of one bin after minor-background subtraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinYield {
    pub content: f64,
    pub err_up: f64,
    pub err_down: f64,
}

/// Floating-parameter settings for a fail bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailBinSpec {
    pub nominal: f64,
    pub low: f64,
    pub high: f64,
    pub error: Option<AsymError>,
}

/// Histograms consumed by one assembly run.
#[derive(Clone, Copy)]
pub struct AssemblerInputs<'a> {
    /// Data in the fail region.
    pub fail: &'a dyn Histogram2D,
    /// Minor backgrounds in the fail region, subtracted from `fail`.
    pub minor: &'a [&'a dyn Histogram2D],
    /// Per-bin mc-ratio, required in ratio mode.
    pub ratio: Option<&'a dyn Histogram2D>,
}

/// Output of one assembly run. Grids are indexed like the input histogram.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub fail: NodeGrid,
    pub pass: NodeGrid,
    /// Transfer node of every bin, blinded bins included.
    pub transfer: NodeGrid,
    /// Row-major bin states.
    pub states: Vec<BinState>,
    /// Row-major fail-region yields after subtraction.
    pub yields: Vec<BinYield>,
    /// Names of every floating fail bin, in declaration order.
    pub floating_fail_bins: Vec<String>,
}

impl Assembly {
    pub fn state(&self, x: usize, y: usize) -> BinState {
        self.states[(y - 1) * self.fail.n_bins_x() + (x - 1)]
    }

    pub fn count(&self, state: BinState) -> usize {
        self.states.iter().filter(|&&s| s == state).count()
    }
}

pub struct ModelAssembler<'a> {
    pub name: &'a str,
    pub suffix: &'a str,
    pub partition: &'a BinPartition,
    pub y_axis: &'a AxisSpec,
    pub transfer: &'a TransferFunction,
    /// Apply the partition's blind window.
    pub blinded: bool,
    /// Multiply pass bins by the mc-ratio histogram.
    pub ratio_mode: bool,
}

impl ModelAssembler<'_> {
    /// Build fail and pass nodes for every bin, declaring floating fail bins in `store`.
    pub fn assemble(
        &self,
        store: &mut ParameterStore,
        inputs: &AssemblerInputs<'_>,
    ) -> Result<Assembly, ModelError> {
        let fail = inputs.fail;
        if fail.n_bins_x() == 0 || fail.n_bins_y() == 0 {
            return Err(ModelError::EmptyInput(format!(
                "fail histogram '{}' has {}x{} bins",
                fail.name(),
                fail.n_bins_x(),
                fail.n_bins_y()
            )));
        }
        self.check_axes(fail)?;
        for minor in inputs.minor {
            self.check_axes(*minor)?;
        }
        let ratio = match (self.ratio_mode, inputs.ratio) {
            (true, Some(r)) => {
                self.check_axes(r)?;
                Some(r)
            }
            (true, None) => {
                return Err(ModelError::Config(format!(
                    "model '{}': RPF_RATIO is enabled but no ratio histogram was given",
                    self.name
                )));
            }
            (false, _) => None,
        };

        let x_axis = self.partition.axis();
        let (nx, ny) = (x_axis.nbins, self.y_axis.nbins);
        let n = nx * ny;
        let mut fail_nodes = Vec::with_capacity(n);
        let mut pass_nodes = Vec::with_capacity(n);
        let mut transfer_nodes = Vec::with_capacity(n);
        let mut states = Vec::with_capacity(n);
        let mut yields = Vec::with_capacity(n);
        let mut floating = Vec::new();

        for y in 1..=ny {
            for x in 1..=nx {
                let mx = x_axis.mapped_center(x);
                let my = self.y_axis.mapped_center(y);
                let tf = Arc::new(self.transfer.bin_node(x, y, mx, my));

                let bin = subtract_minor(fail, inputs.minor, x, y);
                let blinded = self.blinded && self.partition.overlaps_blind(x);
                let state = classify(blinded, bin.content);

                let fail_name = with_suffix(&format!("Fail_bin_{x}-{y}_{}", self.name), self.suffix);
                let pass_name = with_suffix(&format!("Pass_bin_{x}-{y}_{}", self.name), self.suffix);

                let (fail_node, pass_node) = match fail_bin_spec(state, bin) {
                    None => (
                        Arc::new(Node::constant(fail_name, BIN_EPSILON)),
                        Arc::new(Node::constant(pass_name, BIN_EPSILON)),
                    ),
                    Some(spec) => {
                        if state == BinState::Normal && spec.error.is_some_and(|e| e.low < bin.err_down) {
                            warn!(
                                bin = %fail_name,
                                content = bin.content,
                                err_down = bin.err_down,
                                "down error exceeds content; clamped"
                            );
                        }
                        let handle = store.declare(
                            &fail_name,
                            spec.nominal,
                            Some(spec.low),
                            Some(spec.high),
                            spec.error,
                        )?;
                        floating.push(fail_name);
                        let fail_node = Arc::new(Node::leaf(handle));
                        let mut factors = vec![Arc::clone(&fail_node), Arc::clone(&tf)];
                        if let Some(r) = ratio {
                            factors.push(Arc::new(self.ratio_node(r, x, y)));
                        }
                        let pass_node = Node::derived(pass_name, Op::Multiply, factors);
                        (fail_node, Arc::new(pass_node))
                    }
                };

                fail_nodes.push(fail_node);
                pass_nodes.push(pass_node);
                transfer_nodes.push(tf);
                states.push(state);
                yields.push(bin);
            }
        }

        let assembly = Assembly {
            fail: NodeGrid::from_row_major(nx, ny, fail_nodes)?,
            pass: NodeGrid::from_row_major(nx, ny, pass_nodes)?,
            transfer: NodeGrid::from_row_major(nx, ny, transfer_nodes)?,
            states,
            yields,
            floating_fail_bins: floating,
        };
        info!(
            model = self.name,
            bins = n,
            blinded = assembly.count(BinState::Blinded),
            zero = assembly.count(BinState::ZeroOrNegative),
            low_stat = assembly.count(BinState::LowStatistics),
            normal = assembly.count(BinState::Normal),
            "assembled fail/pass nodes"
        );
        Ok(assembly)
    }

    fn check_axes(&self, h: &dyn Histogram2D) -> Result<(), ModelError> {
        if !edges_match(h.x_edges(), self.partition.axis()) {
            return Err(ModelError::AxisMismatch(format!(
                "histogram '{}' x edges differ from the configured binning ({} bins in [{}, {}])",
                h.name(),
                self.partition.axis().nbins,
                self.partition.axis().low,
                self.partition.axis().high
            )));
        }
        if !edges_match(h.y_edges(), self.y_axis) {
            return Err(ModelError::AxisMismatch(format!(
                "histogram '{}' y edges differ from the configured binning ({} bins in [{}, {}])",
                h.name(),
                self.y_axis.nbins,
                self.y_axis.low,
                self.y_axis.high
            )));
        }
        Ok(())
    }

    fn ratio_node(&self, ratio: &dyn Histogram2D, x: usize, y: usize) -> Node {
        let name = format!("mcRatio_bin_{x}-{y}_{}", self.name);
        let value = ratio.content(x, y);
        if value <= 0.0 {
            warn!(bin = %name, value, "non-positive mc-ratio; using epsilon");
        }
        Node::constant(name, value.max(BIN_EPSILON))
    }
}

/// Fail content of bin `(x, y)` minus every minor background.
///
/// Errors of the subtracted contributions add in quadrature.
pub fn subtract_minor(
    fail: &dyn Histogram2D,
    minor: &[&dyn Histogram2D],
    x: usize,
    y: usize,
) -> BinYield {
    let mut content = fail.content(x, y);
    let mut up2 = fail.error_up(x, y).powi(2);
    let mut down2 = fail.error_down(x, y).powi(2);
    for m in minor {
        content -= m.content(x, y);
        up2 += m.error_up(x, y).powi(2);
        down2 += m.error_down(x, y).powi(2);
    }
    BinYield {
        content,
        err_up: up2.sqrt(),
        err_down: down2.sqrt(),
    }
}

/// First matching state wins; blinding takes precedence over empty bins.
pub fn classify(blinded: bool, content: f64) -> BinState {
    if blinded {
        BinState::Blinded
    } else if content <= 0.0 {
        BinState::ZeroOrNegative
    } else if content < 10.0 {
        BinState::LowStatistics
    } else {
        BinState::Normal
    }
}

/// Floating settings for a fail bin, `None` for constant states.
pub fn fail_bin_spec(state: BinState, bin: BinYield) -> Option<FailBinSpec> {
    let c = bin.content;
    match state {
        BinState::Blinded | BinState::ZeroOrNegative => None,
        BinState::LowStatistics if c < 1.0 => Some(FailBinSpec {
            nominal: c.max(0.1),
            low: BIN_EPSILON,
            high: 10.0,
            error: None,
        }),
        BinState::LowStatistics => Some(FailBinSpec {
            nominal: c.max(1.0),
            low: BIN_EPSILON,
            high: 50.0,
            error: None,
        }),
        BinState::Normal => {
            let err_down = if c - bin.err_down < 0.0 {
                c - BIN_EPSILON
            } else {
                bin.err_down
            };
            Some(FailBinSpec {
                nominal: c,
                low: BIN_EPSILON,
                high: 3.0 * c,
                error: Some(AsymError {
                    low: err_down,
                    high: bin.err_up,
                }),
            })
        }
    }
}

use std::sync::Arc;

use tracing::debug;

use crate::domain::{AxisSpec, Histogram2D, edges_match};
use crate::error::ModelError;
use crate::node::{Node, NodeGrid, Op};
use crate::params::{ParameterHandle, ParameterStore};

/// Bounds of a shape nuisance, in units of the up/down variation.
pub const NUISANCE_RANGE: (f64, f64) = (-5.0, 5.0);

/// Morph `nominal` towards `up` / `down` as the nuisance moves to `±1`.
///
/// The result is a derived node; it reproduces `nominal` at `0`, `up` at `+1`
/// and `down` at `-1`, and extrapolates linearly beyond.
pub fn interpolate(
    name: impl Into<String>,
    nuisance: Arc<Node>,
    nominal: f64,
    up: f64,
    down: f64,
) -> Result<Node, ModelError> {
    let name = name.into();
    if nominal == 0.0 {
        return Err(ModelError::DivisionByZero(format!(
            "shape morph '{name}' has a zero nominal value"
        )));
    }
    Ok(Node::derived(
        name,
        Op::ShapeMorph { nominal, up, down },
        vec![nuisance],
    ))
}

/// Declare a shape nuisance: floating, nominal `0`, bounds `[-5, 5]`.
///
/// A nuisance already present in the store is reused, so several morphs can
/// share one source of variation.
pub fn declare_nuisance(store: &mut ParameterStore, name: &str) -> Result<ParameterHandle, ModelError> {
    if let Some(h) = store.handle(name) {
        return Ok(h);
    }
    store.declare(
        name,
        0.0,
        Some(NUISANCE_RANGE.0),
        Some(NUISANCE_RANGE.1),
        None,
    )
}

/// Per-bin morph of a nominal template.
///
/// Nodes are named `<name>_bin_<x>-<y>`. All three histograms must share the
/// same edges.
pub fn morph_grid(
    name: &str,
    nuisance: Arc<Node>,
    nominal: &dyn Histogram2D,
    up: &dyn Histogram2D,
    down: &dyn Histogram2D,
) -> Result<NodeGrid, ModelError> {
    let (nx, ny) = (nominal.n_bins_x(), nominal.n_bins_y());
    if nx == 0 || ny == 0 {
        return Err(ModelError::EmptyInput(format!(
            "shape '{name}': nominal histogram '{}' has no bins",
            nominal.name()
        )));
    }
    for h in [up, down] {
        if !same_edges(h.x_edges(), nominal.x_edges()) || !same_edges(h.y_edges(), nominal.y_edges()) {
            return Err(ModelError::AxisMismatch(format!(
                "shape '{name}': histogram '{}' does not share the edges of '{}'",
                h.name(),
                nominal.name()
            )));
        }
    }

    let mut nodes = Vec::with_capacity(nx * ny);
    for y in 1..=ny {
        for x in 1..=nx {
            let node = interpolate(
                format!("{name}_bin_{x}-{y}"),
                Arc::clone(&nuisance),
                nominal.content(x, y),
                up.content(x, y),
                down.content(x, y),
            )?;
            nodes.push(Arc::new(node));
        }
    }
    debug!(shape = name, nuisance = nuisance.name(), bins = nx * ny, "built shape morph");
    NodeGrid::from_row_major(nx, ny, nodes)
}

/// Like `morph_grid`, additionally checking the nominal against a configured binning.
pub fn morph_grid_on(
    name: &str,
    nuisance: Arc<Node>,
    x_axis: &AxisSpec,
    y_axis: &AxisSpec,
    templates: [&dyn Histogram2D; 3],
) -> Result<NodeGrid, ModelError> {
    let [nominal, up, down] = templates;
    if !edges_match(nominal.x_edges(), x_axis) || !edges_match(nominal.y_edges(), y_axis) {
        return Err(ModelError::AxisMismatch(format!(
            "shape '{name}': nominal histogram '{}' does not match the model binning",
            nominal.name()
        )));
    }
    morph_grid(name, nuisance, nominal, up, down)
}

fn same_edges(a: &[f64], b: &[f64]) -> bool {
    let span = match (b.first(), b.last()) {
        (Some(lo), Some(hi)) => (hi - lo).abs().max(1.0),
        _ => 1.0,
    };
    a.len() == b.len() && a.iter().zip(b).all(|(p, q)| (p - q).abs() <= 1e-9 * span)
}

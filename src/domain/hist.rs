//! Dense 2D histograms.
//!
//! The model builder only ever reads histograms, through `Histogram2D`.
//! `Hist2D` is the in-memory implementation used by the file loaders, the
//! synthetic generator and the tests. Storage is `nalgebra::DMatrix` indexed
//! `(x - 1, y - 1)`; the public accessors use 1-based bin indices.

use nalgebra::DMatrix;

use crate::domain::AxisSpec;
use crate::error::ModelError;

/// Read-only view of a binned 2D distribution.
///
/// Bin indices are 1-based on both axes. Out-of-range indices are a caller
/// bug and may panic.
pub trait Histogram2D {
    fn name(&self) -> &str;
    fn n_bins_x(&self) -> usize;
    fn n_bins_y(&self) -> usize;
    /// `n_bins_x() + 1` edges.
    fn x_edges(&self) -> &[f64];
    /// `n_bins_y() + 1` edges.
    fn y_edges(&self) -> &[f64];
    fn content(&self, x: usize, y: usize) -> f64;
    fn error_up(&self, x: usize, y: usize) -> f64;
    fn error_down(&self, x: usize, y: usize) -> f64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hist2D {
    name: String,
    x_edges: Vec<f64>,
    y_edges: Vec<f64>,
    content: DMatrix<f64>,
    err_up: DMatrix<f64>,
    err_down: DMatrix<f64>,
}

impl Hist2D {
    /// Empty histogram with the given edges.
    pub fn new(
        name: impl Into<String>,
        x_edges: Vec<f64>,
        y_edges: Vec<f64>,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        check_edges(&name, "x", &x_edges)?;
        check_edges(&name, "y", &y_edges)?;
        let nx = x_edges.len() - 1;
        let ny = y_edges.len() - 1;
        Ok(Self {
            name,
            x_edges,
            y_edges,
            content: DMatrix::zeros(nx, ny),
            err_up: DMatrix::zeros(nx, ny),
            err_down: DMatrix::zeros(nx, ny),
        })
    }

    /// Empty histogram with uniform binning on both axes.
    pub fn uniform(name: impl Into<String>, x: &AxisSpec, y: &AxisSpec) -> Self {
        let nx = x.nbins;
        let ny = y.nbins;
        Self {
            name: name.into(),
            x_edges: x.edges(),
            y_edges: y.edges(),
            content: DMatrix::zeros(nx, ny),
            err_up: DMatrix::zeros(nx, ny),
            err_down: DMatrix::zeros(nx, ny),
        }
    }

    /// Set content and asymmetric errors of bin `(x, y)` (1-based).
    pub fn set_bin(&mut self, x: usize, y: usize, content: f64, err_up: f64, err_down: f64) {
        self.content[(x - 1, y - 1)] = content;
        self.err_up[(x - 1, y - 1)] = err_up;
        self.err_down[(x - 1, y - 1)] = err_down;
    }

    /// Set content with symmetric Poisson (`sqrt(n)`) errors.
    pub fn set_poisson(&mut self, x: usize, y: usize, content: f64) {
        let err = content.max(0.0).sqrt();
        self.set_bin(x, y, content, err, err);
    }

    pub fn total(&self) -> f64 {
        self.content.sum()
    }

    pub fn content_matrix(&self) -> &DMatrix<f64> {
        &self.content
    }
}

impl Histogram2D for Hist2D {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_bins_x(&self) -> usize {
        self.content.nrows()
    }

    fn n_bins_y(&self) -> usize {
        self.content.ncols()
    }

    fn x_edges(&self) -> &[f64] {
        &self.x_edges
    }

    fn y_edges(&self) -> &[f64] {
        &self.y_edges
    }

    fn content(&self, x: usize, y: usize) -> f64 {
        self.content[(x - 1, y - 1)]
    }

    fn error_up(&self, x: usize, y: usize) -> f64 {
        self.err_up[(x - 1, y - 1)]
    }

    fn error_down(&self, x: usize, y: usize) -> f64 {
        self.err_down[(x - 1, y - 1)]
    }
}

fn check_edges(name: &str, axis: &str, edges: &[f64]) -> Result<(), ModelError> {
    if edges.is_empty() {
        return Err(ModelError::Config(format!(
            "histogram '{name}': {axis} axis has no edges"
        )));
    }
    if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| w[1] <= w[0]) {
        return Err(ModelError::Config(format!(
            "histogram '{name}': {axis} edges must be finite and strictly increasing"
        )));
    }
    Ok(())
}

/// Compare histogram edges against a configured uniform axis.
pub fn edges_match(edges: &[f64], axis: &AxisSpec) -> bool {
    if edges.len() != axis.nbins + 1 {
        return false;
    }
    let tol = axis.edge_tolerance();
    edges
        .iter()
        .enumerate()
        .all(|(i, &e)| (e - axis.edge(i + 1)).abs() <= tol)
}

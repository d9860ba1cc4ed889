//! Histogram JSON files.
//!
//! ```json
//! {
//!   "name": "data_fail",
//!   "x_edges": [0, 1, 2],
//!   "y_edges": [0, 5],
//!   "content": [[10, 12]],
//!   "err_up":  [[3.2, 3.5]]
//! }
//! ```
//!
//! `content[iy][ix]` holds one row per Y bin. `err_up` / `err_down` are
//! optional and default to `sqrt(max(content, 0))`.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Hist2D, Histogram2D};
use crate::error::ModelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistFile {
    pub name: String,
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
    pub content: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err_up: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err_down: Option<Vec<Vec<f64>>>,
}

impl HistFile {
    pub fn from_hist(h: &dyn Histogram2D) -> Self {
        let rows = |f: &dyn Fn(usize, usize) -> f64| -> Vec<Vec<f64>> {
            (1..=h.n_bins_y())
                .map(|y| (1..=h.n_bins_x()).map(|x| f(x, y)).collect())
                .collect()
        };
        Self {
            name: h.name().to_string(),
            x_edges: h.x_edges().to_vec(),
            y_edges: h.y_edges().to_vec(),
            content: rows(&|x, y| h.content(x, y)),
            err_up: Some(rows(&|x, y| h.error_up(x, y))),
            err_down: Some(rows(&|x, y| h.error_down(x, y))),
        }
    }

    pub fn into_hist(self) -> Result<Hist2D, ModelError> {
        let mut h = Hist2D::new(self.name.clone(), self.x_edges, self.y_edges)?;
        let (nx, ny) = (h.n_bins_x(), h.n_bins_y());
        check_shape(&self.name, "content", &self.content, nx, ny)?;
        if let Some(e) = &self.err_up {
            check_shape(&self.name, "err_up", e, nx, ny)?;
        }
        if let Some(e) = &self.err_down {
            check_shape(&self.name, "err_down", e, nx, ny)?;
        }
        for (iy, row) in self.content.iter().enumerate() {
            for (ix, &c) in row.iter().enumerate() {
                let poisson = c.max(0.0).sqrt();
                let up = self.err_up.as_ref().map_or(poisson, |e| e[iy][ix]);
                let down = self.err_down.as_ref().map_or(poisson, |e| e[iy][ix]);
                h.set_bin(ix + 1, iy + 1, c, up, down);
            }
        }
        Ok(h)
    }
}

fn check_shape(name: &str, field: &str, rows: &[Vec<f64>], nx: usize, ny: usize) -> Result<(), ModelError> {
    if rows.len() != ny || rows.iter().any(|r| r.len() != nx) {
        return Err(ModelError::Config(format!(
            "histogram '{name}': {field} must be {ny} rows of {nx} values"
        )));
    }
    Ok(())
}

/// Read a histogram JSON file.
pub fn read_hist_json(path: &Path) -> Result<Hist2D, ModelError> {
    let file = File::open(path)
        .map_err(|e| ModelError::Io(format!("failed to open histogram '{}': {e}", path.display())))?;
    let parsed: HistFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ModelError::Config(format!("invalid histogram JSON '{}': {e}", path.display())))?;
    parsed.into_hist()
}

/// Write a histogram JSON file.
pub fn write_hist_json(path: &Path, h: &dyn Histogram2D) -> Result<(), ModelError> {
    let file = File::create(path)
        .map_err(|e| ModelError::Io(format!("failed to create histogram '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &HistFile::from_hist(h))
        .map_err(|e| ModelError::Io(format!("failed to write histogram '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_errors_default_to_poisson() {
        let file = HistFile {
            name: "h".into(),
            x_edges: vec![0.0, 1.0, 2.0],
            y_edges: vec![0.0, 1.0],
            content: vec![vec![16.0, -1.0]],
            err_up: None,
            err_down: Some(vec![vec![2.0, 0.5]]),
        };
        let h = file.into_hist().unwrap();
        assert_eq!(h.content(1, 1), 16.0);
        assert_eq!(h.error_up(1, 1), 4.0);
        assert_eq!(h.error_down(1, 1), 2.0);
        assert_eq!(h.error_up(2, 1), 0.0);
    }

    #[test]
    fn ragged_content_rejected() {
        let file = HistFile {
            name: "h".into(),
            x_edges: vec![0.0, 1.0, 2.0],
            y_edges: vec![0.0, 1.0],
            content: vec![vec![1.0]],
            err_up: None,
            err_down: None,
        };
        assert!(matches!(file.into_hist(), Err(ModelError::Config(_))));
    }
}

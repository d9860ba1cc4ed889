//! Dense per-bin node grids.

use std::sync::Arc;

use crate::error::ModelError;
use crate::node::Node;
use crate::params::ParameterStore;

/// One node per `(x, y)` bin, stored row-major (`y` outer, `x` inner).
///
/// Indices are 1-based like the histograms the grid was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeGrid {
    nx: usize,
    ny: usize,
    nodes: Vec<Arc<Node>>,
}

impl NodeGrid {
    /// Build from nodes already in row-major order.
    pub fn from_row_major(nx: usize, ny: usize, nodes: Vec<Arc<Node>>) -> Result<Self, ModelError> {
        if nodes.len() != nx * ny {
            return Err(ModelError::Config(format!(
                "node grid {nx}x{ny} needs {} nodes, got {}",
                nx * ny,
                nodes.len()
            )));
        }
        Ok(Self { nx, ny, nodes })
    }

    pub fn n_bins_x(&self) -> usize {
        self.nx
    }

    pub fn n_bins_y(&self) -> usize {
        self.ny
    }

    pub fn get(&self, x: usize, y: usize) -> &Arc<Node> {
        &self.nodes[(y - 1) * self.nx + (x - 1)]
    }

    /// `((x, y), node)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &Arc<Node>)> {
        self.nodes
            .iter()
            .enumerate()
            .map(move |(i, n)| ((i % self.nx + 1, i / self.nx + 1), n))
    }

    /// Evaluate every node against `store`, row-major.
    pub fn values(&self, store: &ParameterStore) -> Result<Vec<f64>, ModelError> {
        self.nodes.iter().map(|n| n.value(store)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_indexing() {
        let nodes = (0..6)
            .map(|i| Arc::new(Node::constant(format!("n{i}"), i as f64)))
            .collect();
        let grid = NodeGrid::from_row_major(3, 2, nodes).unwrap();
        assert_eq!(grid.get(1, 1).name(), "n0");
        assert_eq!(grid.get(3, 1).name(), "n2");
        assert_eq!(grid.get(1, 2).name(), "n3");
        let coords: Vec<(usize, usize)> = grid.iter().map(|(c, _)| c).collect();
        assert_eq!(coords[4], (2, 2));
        let values = grid.values(&ParameterStore::new()).unwrap();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn size_mismatch_rejected() {
        assert!(NodeGrid::from_row_major(2, 2, Vec::new()).is_err());
    }
}

//! Model node graph.
//!
//! Nodes are immutable once built; inputs are shared through `Arc` so a
//! transfer-function coefficient used by every bin is stored once.

pub mod graph;
pub mod grid;

pub use graph::*;
pub use grid::*;

//! Per-bin model assembly: fail-region nodes and the derived pass-region
//! prediction.

pub mod assembler;

pub use assembler::*;

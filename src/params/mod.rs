//! Scalar model parameters, owned by a per-model `ParameterStore`.

pub mod store;

pub use store::*;

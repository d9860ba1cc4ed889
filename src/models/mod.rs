//! Built models.
//!
//! `BuiltModel` owns everything one named configuration produces: the
//! partition, the transfer function, the parameter store and the per-bin node
//! grids. It is the unit the app layer builds, reports and exports.

pub mod export;
pub mod model;

pub use export::*;
pub use model::*;

//! Input/output helpers.
//!
//! - configuration JSON + referenced histograms (`config`)
//! - histogram JSON read/write (`hist`)
//! - model JSON read/write (`model`)
//! - per-bin CSV export (`export`)

pub mod config;
pub mod export;
pub mod hist;
pub mod model;

pub use config::*;
pub use export::*;
pub use hist::*;
pub use model::*;

//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the JSON model configuration (`ModelConfig` and its blocks)
//! - uniform axis geometry (`AxisSpec`)
//! - the read-only 2D histogram interface (`Histogram2D`) and its dense
//!   implementation (`Hist2D`)

pub mod hist;
pub mod types;

pub use hist::*;
pub use types::*;

//! Partition of the X axis into named categories and of the model into
//! pass/fail regions.

pub mod partition;

pub use partition::*;

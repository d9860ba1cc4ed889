//! Transfer function (pass/fail ratio) families.
//!
//! Responsibilities:
//!
//! - pick exactly one family from the `FIT` block
//! - declare the family's coefficients in the model's `ParameterStore`
//! - build the per-bin transfer node, floored at the family epsilon

pub mod formula;
pub mod function;

pub use formula::*;
pub use function::*;

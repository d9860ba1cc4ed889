//! Shape systematics: smooth per-bin interpolation between nominal, up and
//! down templates, driven by one nuisance parameter.

pub mod shape;

pub use shape::*;

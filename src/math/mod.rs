//! Numeric kernels: polynomials, the Chebyshev basis and the smooth
//! shape-morph interpolation.

pub mod basis;
pub mod interp;
pub mod poly;

pub use basis::*;
pub use interp::*;
pub use poly::*;

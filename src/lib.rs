//! `rpf2d` library crate.
//!
//! Builds the pass/fail-ratio background model of a 2D binned search: a
//! transfer function `R_P/F(x, y)` multiplies a floating fail-region
//! template bin by bin to predict the pass region.
//!
//! The binary (`rpf`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the node graph can be handed to any downstream serializer or fitter

pub mod app;
pub mod assemble;
pub mod binning;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod morph;
pub mod node;
pub mod params;
pub mod report;
pub mod transfer;

//! Reporting utilities: per-model summaries and formatted terminal output.

pub mod format;

pub use format::*;

use crate::assemble::BinState;
use crate::error::ModelError;
use crate::models::BuiltModel;

/// Headline numbers of a built model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub name: String,
    pub family: &'static str,
    pub n_parameters: usize,
    pub n_floating: usize,
    pub n_transfer_coeffs: usize,
    pub blinded: usize,
    pub zero_or_negative: usize,
    pub low_statistics: usize,
    pub normal: usize,
    /// Fail-region yield after minor subtraction, unblinded bins only.
    pub fail_total: f64,
    /// Pass-region prediction at the current parameter values, unblinded bins only.
    pub pass_total: f64,
}

/// Summarize `model` at its current parameter values.
pub fn summarize(model: &BuiltModel) -> Result<ModelSummary, ModelError> {
    let assembly = &model.assembly;
    let pass = model.pass_values()?;
    let (mut fail_total, mut pass_total) = (0.0, 0.0);
    for ((state, bin), p) in assembly.states.iter().zip(&assembly.yields).zip(&pass) {
        if *state != BinState::Blinded {
            fail_total += bin.content.max(0.0);
            pass_total += p;
        }
    }
    Ok(ModelSummary {
        name: model.name.clone(),
        family: model.transfer.family().tag(),
        n_parameters: model.store.len(),
        n_floating: model.store.all_floating().len(),
        n_transfer_coeffs: model.transfer.parameters().len(),
        blinded: assembly.count(BinState::Blinded),
        zero_or_negative: assembly.count(BinState::ZeroOrNegative),
        low_statistics: assembly.count(BinState::LowStatistics),
        normal: assembly.count(BinState::Normal),
        fail_total,
        pass_total,
    })
}

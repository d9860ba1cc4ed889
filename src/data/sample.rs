//! Synthetic fail-region histograms.
//!
//! The expected yield falls exponentially along both axes, like a QCD-like
//! invariant-mass spectrum:
//!
//! ```text
//! mu(x, y) = scale · exp(-SLOPE_X · x̂) · exp(-SLOPE_Y · ŷ)
//! ```
//!
//! where `x̂`, `ŷ` are the mapped bin centres. Each bin is then Poisson
//! fluctuated with a seeded `StdRng`, so a given `(config, seed, scale)`
//! always produces the same histogram.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Poisson};
use tracing::debug;

use crate::domain::{AxisSpec, Hist2D, ModelConfig};
use crate::error::ModelError;

const SLOPE_X: f64 = 2.5;
const SLOPE_Y: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSpec {
    pub seed: u64,
    /// Expected yield of the lowest `(x, y)` corner.
    pub scale: f64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            seed: 42,
            scale: 1000.0,
        }
    }
}

/// Expected (unfluctuated) yield of bin `(x, y)`.
pub fn expected_yield(x_axis: &AxisSpec, y_axis: &AxisSpec, x: usize, y: usize, scale: f64) -> f64 {
    scale * (-SLOPE_X * x_axis.mapped_center(x)).exp() * (-SLOPE_Y * y_axis.mapped_center(y)).exp()
}

/// Noise-free spectrum with Poisson errors, useful as a template.
pub fn expected_histogram(name: &str, x_axis: &AxisSpec, y_axis: &AxisSpec, scale: f64) -> Hist2D {
    let mut h = Hist2D::uniform(name, x_axis, y_axis);
    for y in 1..=y_axis.nbins {
        for x in 1..=x_axis.nbins {
            h.set_poisson(x, y, expected_yield(x_axis, y_axis, x, y, scale));
        }
    }
    h
}

/// Poisson-fluctuated fail histogram on the binning of `config`.
pub fn generate_fail(config: &ModelConfig, spec: SampleSpec) -> Result<Hist2D, ModelError> {
    if !(spec.scale.is_finite() && spec.scale > 0.0) {
        return Err(ModelError::Config(format!(
            "sample scale must be finite and > 0, got {}",
            spec.scale
        )));
    }
    let x_axis = config.binning.x.spec()?;
    let y_axis = config.binning.y.spec()?;
    let mut rng = StdRng::seed_from_u64(sample_seed(config, spec));

    let mut h = Hist2D::uniform(format!("{}_fail", config.name), &x_axis, &y_axis);
    for y in 1..=y_axis.nbins {
        for x in 1..=x_axis.nbins {
            let mu = expected_yield(&x_axis, &y_axis, x, y, spec.scale);
            let count = if mu > 0.0 {
                let poisson = Poisson::new(mu)
                    .map_err(|e| ModelError::Config(format!("bin ({x}, {y}): Poisson({mu}) error: {e}")))?;
                poisson.sample(&mut rng)
            } else {
                0.0
            };
            h.set_poisson(x, y, count);
        }
    }
    debug!(model = %config.name, seed = spec.seed, total = h.total(), "generated fail sample");
    Ok(h)
}

fn sample_seed(config: &ModelConfig, spec: SampleSpec) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.name.hash(&mut hasher);
    config.binning.x.nbins.hash(&mut hasher);
    config.binning.y.nbins.hash(&mut hasher);
    spec.seed.hash(&mut hasher);
    spec.scale.to_bits().hash(&mut hasher);
    hasher.finish()
}

//! X-axis categories (`LOW` / `SIG` / `HIGH`, or a single `FULL`).
//!
//! When a blind window is requested the axis is cut at the window edges. Cuts
//! must land exactly on existing bin edges; a boundary in the middle of a bin
//! is rejected instead of being rounded, because the downstream rebinning
//! relies on the same alignment.
//!
//! Global and local bin indices are both 1-based.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{AxisConfig, AxisSpec};
use crate::error::ModelError;

pub const CATEGORY_LOW: &str = "LOW";
pub const CATEGORY_SIG: &str = "SIG";
pub const CATEGORY_HIGH: &str = "HIGH";
pub const CATEGORY_FULL: &str = "FULL";

/// Pass/fail region of the simultaneous model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Pass,
    Fail,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::Pass, Region::Fail];

    pub fn label(self) -> &'static str {
        match self {
            Region::Pass => "pass",
            Region::Fail => "fail",
        }
    }
}

/// A contiguous run of X bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    /// First global bin (inclusive).
    pub first: usize,
    /// Last global bin (inclusive).
    pub last: usize,
    pub low: f64,
    pub high: f64,
}

impl Category {
    pub fn n_bins(&self) -> usize {
        self.last + 1 - self.first
    }

    pub fn contains(&self, global: usize) -> bool {
        (self.first..=self.last).contains(&global)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinPartition {
    axis: AxisSpec,
    blind: Option<(f64, f64)>,
    categories: Vec<Category>,
}

impl BinPartition {
    /// Build the partition of `[low, high]` into `nbins` uniform bins.
    ///
    /// `blind_start` and `blind_end` must be given together.
    pub fn build(
        low: f64,
        high: f64,
        nbins: usize,
        blind_start: Option<f64>,
        blind_end: Option<f64>,
    ) -> Result<Self, ModelError> {
        let axis = AxisSpec::new(low, high, nbins)?;

        let blind = match (blind_start, blind_end) {
            (None, None) => None,
            (Some(start), Some(end)) => {
                if !(start.is_finite() && end.is_finite()) || start >= end {
                    return Err(ModelError::Config(format!(
                        "blind window start={start} must be below end={end}"
                    )));
                }
                if start < low || end > high {
                    return Err(ModelError::Config(format!(
                        "blind window [{start}, {end}] lies outside the axis [{low}, {high}]"
                    )));
                }
                Some((start, end))
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(ModelError::Config(
                    "BLIND_START and BLIND_END must be given together".into(),
                ));
            }
        };

        let categories = match blind {
            None => vec![Category {
                name: CATEGORY_FULL.to_string(),
                first: 1,
                last: nbins,
                low,
                high,
            }],
            Some((start, end)) => {
                let cut_lo = edge_index(&axis, start)?;
                let cut_hi = edge_index(&axis, end)?;
                let mut out = Vec::with_capacity(3);
                // Side categories collapse to nothing when the window touches the axis end.
                if cut_lo > 1 {
                    out.push(Category {
                        name: CATEGORY_LOW.to_string(),
                        first: 1,
                        last: cut_lo - 1,
                        low,
                        high: start,
                    });
                }
                out.push(Category {
                    name: CATEGORY_SIG.to_string(),
                    first: cut_lo,
                    last: cut_hi - 1,
                    low: start,
                    high: end,
                });
                if cut_hi <= nbins {
                    out.push(Category {
                        name: CATEGORY_HIGH.to_string(),
                        first: cut_hi,
                        last: nbins,
                        low: end,
                        high,
                    });
                }
                out
            }
        };

        for c in &categories {
            debug!(
                category = %c.name,
                first = c.first,
                last = c.last,
                low = c.low,
                high = c.high,
                "x category"
            );
        }

        Ok(Self {
            axis,
            blind,
            categories,
        })
    }

    pub fn from_config(axis: &AxisConfig) -> Result<Self, ModelError> {
        Self::build(axis.low, axis.high, axis.nbins, axis.blind_start, axis.blind_end)
    }

    pub fn axis(&self) -> &AxisSpec {
        &self.axis
    }

    pub fn n_bins(&self) -> usize {
        self.axis.nbins
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// The blind window, if one was requested.
    pub fn blind_window(&self) -> Option<(f64, f64)> {
        self.blind
    }

    /// True when global bin `x` overlaps the blind window, even partially.
    pub fn overlaps_blind(&self, x: usize) -> bool {
        match self.blind {
            None => false,
            Some((start, end)) => {
                let lo = self.axis.edge(x);
                let hi = self.axis.edge(x + 1);
                let tol = self.axis.edge_tolerance();
                lo < end - tol && hi > start + tol
            }
        }
    }

    /// Map a global X bin to `(category, local index)`.
    pub fn category_of(&self, global: usize) -> Result<(&str, usize), ModelError> {
        self.categories
            .iter()
            .find(|c| c.contains(global))
            .map(|c| (c.name.as_str(), global - c.first + 1))
            .ok_or_else(|| {
                ModelError::Binning(format!(
                    "global x bin {global} outside 1..={}",
                    self.axis.nbins
                ))
            })
    }

    /// Inverse of [`BinPartition::category_of`].
    pub fn global_index_of(&self, category: &str, local: usize) -> Result<usize, ModelError> {
        let c = self
            .categories
            .iter()
            .find(|c| c.name == category)
            .ok_or_else(|| ModelError::Binning(format!("unknown x category '{category}'")))?;
        if local == 0 || local > c.n_bins() {
            return Err(ModelError::Binning(format!(
                "local bin {local} outside 1..={} of category '{category}'",
                c.n_bins()
            )));
        }
        Ok(c.first + local - 1)
    }

    pub fn regions(&self) -> [Region; 2] {
        Region::ALL
    }

    /// Channel labels `<region>_<CATEGORY>`, regions outer.
    pub fn labels(&self) -> Vec<String> {
        Region::ALL
            .iter()
            .flat_map(|r| {
                self.categories
                    .iter()
                    .map(move |c| format!("{}_{}", r.label(), c.name))
            })
            .collect()
    }
}

/// Index of the bin whose lower edge is `value` (`nbins + 1` for the upper axis end).
fn edge_index(axis: &AxisSpec, value: f64) -> Result<usize, ModelError> {
    let tol = axis.edge_tolerance();
    (1..=axis.nbins + 1)
        .find(|&i| (axis.edge(i) - value).abs() <= tol)
        .ok_or_else(|| {
            ModelError::Binning(format!(
                "category boundary {value} does not coincide with a bin edge (bin width {})",
                axis.width()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blind_window_splits_axis_in_three() {
        let p = BinPartition::build(0.0, 10.0, 10, Some(4.0), Some(6.0)).unwrap();
        let spans: Vec<(&str, usize, usize)> = p
            .categories()
            .iter()
            .map(|c| (c.name.as_str(), c.first, c.last))
            .collect();
        assert_eq!(spans, vec![("LOW", 1, 4), ("SIG", 5, 6), ("HIGH", 7, 10)]);
    }

    #[test]
    fn off_edge_boundary_is_rejected() {
        let err = BinPartition::build(0.0, 10.0, 10, Some(4.5), Some(6.0)).unwrap_err();
        assert!(matches!(err, ModelError::Binning(_)));
    }

    #[test]
    fn blind_bounds_must_come_in_pairs() {
        let err = BinPartition::build(0.0, 10.0, 10, Some(4.0), None).unwrap_err();
        assert!(matches!(err, ModelError::Config(_)));
        let err = BinPartition::build(0.0, 10.0, 10, None, Some(6.0)).unwrap_err();
        assert!(matches!(err, ModelError::Config(_)));
    }

    #[test]
    fn blind_window_must_be_ordered_and_inside() {
        assert!(matches!(
            BinPartition::build(0.0, 10.0, 10, Some(6.0), Some(4.0)),
            Err(ModelError::Config(_))
        ));
        assert!(matches!(
            BinPartition::build(0.0, 10.0, 10, Some(4.0), Some(4.0)),
            Err(ModelError::Config(_))
        ));
        assert!(matches!(
            BinPartition::build(0.0, 10.0, 10, Some(-1.0), Some(4.0)),
            Err(ModelError::Config(_))
        ));
    }

    #[test]
    fn no_blinding_gives_single_category() {
        let p = BinPartition::build(0.0, 10.0, 10, None, None).unwrap();
        assert_eq!(p.categories().len(), 1);
        assert_eq!(p.categories()[0].name, CATEGORY_FULL);
        assert_eq!(p.category_of(7).unwrap(), ("FULL", 7));
        assert!(!p.overlaps_blind(5));
    }

    #[test]
    fn window_at_axis_end_drops_empty_side() {
        let p = BinPartition::build(0.0, 10.0, 10, Some(0.0), Some(3.0)).unwrap();
        let names: Vec<&str> = p.categories().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["SIG", "HIGH"]);
    }

    #[test]
    fn category_lookup_round_trips() {
        let p = BinPartition::build(0.0, 10.0, 10, Some(4.0), Some(6.0)).unwrap();
        assert_eq!(p.category_of(5).unwrap(), ("SIG", 1));
        assert_eq!(p.category_of(10).unwrap(), ("HIGH", 4));
        for g in 1..=10 {
            let (name, local) = p.category_of(g).unwrap();
            assert_eq!(p.global_index_of(name, local).unwrap(), g);
        }
        assert!(p.category_of(0).is_err());
        assert!(p.category_of(11).is_err());
        assert!(p.global_index_of("SIG", 3).is_err());
        assert!(p.global_index_of("MID", 1).is_err());
    }

    #[test]
    fn overlap_is_edge_exclusive() {
        let p = BinPartition::build(0.0, 10.0, 10, Some(4.0), Some(6.0)).unwrap();
        let blinded: Vec<usize> = (1..=10).filter(|&x| p.overlaps_blind(x)).collect();
        assert_eq!(blinded, vec![5, 6]);
    }

    #[test]
    fn labels_cover_regions_and_categories() {
        let p = BinPartition::build(0.0, 10.0, 10, Some(4.0), Some(6.0)).unwrap();
        assert_eq!(
            p.labels(),
            vec!["pass_LOW", "pass_SIG", "pass_HIGH", "fail_LOW", "fail_SIG", "fail_HIGH"]
        );
    }
}

//! Parameter store.
//!
//! Every scalar of a model (transfer-function coefficients, floating fail
//! bins, nuisance parameters) is declared here under a unique name. The store
//! keeps declaration order; `all_floating` and the exported parameter table
//! follow it so that identical configurations serialize identically.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Floating,
    Constant,
}

/// Asymmetric error magnitudes (both non-negative).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsymError {
    pub low: f64,
    pub high: f64,
}

impl AsymError {
    pub fn symmetric(err: f64) -> Self {
        Self {
            low: err,
            high: err,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    /// Value at declaration time.
    pub nominal: f64,
    /// Current value; starts at `nominal`, updated by `set_value`/`merge`.
    pub value: f64,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub error: Option<AsymError>,
}

impl Parameter {
    /// Floating parameters are advertised to the serializer as free model
    /// parameters.
    pub fn reportable(&self) -> bool {
        self.kind == ParameterKind::Floating
    }
}

/// Reference to a declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterHandle {
    index: usize,
    name: String,
}

impl ParameterHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// What `merge` does when both stores declare the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Take value and error from the other store; keep kind and bounds.
    OverwriteValueAndError,
    /// Leave the receiving entry untouched.
    KeepExisting,
    /// Fail with `DuplicateParameter`.
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub updated: Vec<String>,
    pub added: Vec<String>,
    pub kept: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    params: Vec<Parameter>,
    index: HashMap<String, usize>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declare a new parameter.
    ///
    /// With both bounds omitted the parameter is `Constant` at `nominal`.
    /// Callers that reach this path from configuration must warn.
    pub fn declare(
        &mut self,
        name: &str,
        nominal: f64,
        low: Option<f64>,
        high: Option<f64>,
        error: Option<AsymError>,
    ) -> Result<ParameterHandle, ModelError> {
        if self.index.contains_key(name) {
            return Err(ModelError::DuplicateParameter(name.to_string()));
        }
        if !nominal.is_finite() {
            return Err(ModelError::Config(format!(
                "parameter '{name}': nominal {nominal} is not finite"
            )));
        }
        let kind = match (low, high) {
            (None, None) => ParameterKind::Constant,
            (Some(lo), Some(hi)) => {
                if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                    return Err(ModelError::Config(format!(
                        "parameter '{name}': bounds [{lo}, {hi}] must be finite with low<high"
                    )));
                }
                if nominal < lo || nominal > hi {
                    return Err(ModelError::Config(format!(
                        "parameter '{name}': nominal {nominal} outside bounds [{lo}, {hi}]"
                    )));
                }
                ParameterKind::Floating
            }
            _ => {
                return Err(ModelError::Config(format!(
                    "parameter '{name}': give both MIN and MAX or neither"
                )));
            }
        };
        if let Some(err) = error {
            check_error(name, err.low, err.high)?;
        }

        let idx = self.params.len();
        self.params.push(Parameter {
            name: name.to_string(),
            kind,
            nominal,
            value: nominal,
            low,
            high,
            error,
        });
        self.index.insert(name.to_string(), idx);
        Ok(ParameterHandle {
            index: idx,
            name: name.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.index.get(name).map(|&i| &self.params[i])
    }

    pub fn handle(&self, name: &str) -> Option<ParameterHandle> {
        self.index.get(name).map(|&i| ParameterHandle {
            index: i,
            name: name.to_string(),
        })
    }

    /// Current value behind a handle.
    ///
    /// Handles from another store with the same name resolve by name.
    pub fn value(&self, handle: &ParameterHandle) -> Result<f64, ModelError> {
        match self.params.get(handle.index) {
            Some(p) if p.name == handle.name => Ok(p.value),
            _ => self
                .get(&handle.name)
                .map(|p| p.value)
                .ok_or_else(|| ModelError::NotFound(handle.name.clone())),
        }
    }

    pub fn set_value(&mut self, name: &str, value: f64) -> Result<(), ModelError> {
        let p = self.entry_mut(name)?;
        p.value = value;
        Ok(())
    }

    pub fn set_error(&mut self, name: &str, err_low: f64, err_high: f64) -> Result<(), ModelError> {
        check_error(name, err_low, err_high)?;
        let p = self.entry_mut(name)?;
        p.error = Some(AsymError {
            low: err_low,
            high: err_high,
        });
        Ok(())
    }

    /// Every parameter in declaration order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    /// Floating parameters in declaration order.
    pub fn all_floating(&self) -> Vec<ParameterHandle> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind == ParameterKind::Floating)
            .map(|(i, p)| ParameterHandle {
                index: i,
                name: p.name.clone(),
            })
            .collect()
    }

    /// Fold `other` into this store.
    ///
    /// Names unknown here are appended in `other`'s declaration order.
    pub fn merge(
        &mut self,
        other: &ParameterStore,
        on_conflict: ConflictPolicy,
    ) -> Result<MergeReport, ModelError> {
        if on_conflict == ConflictPolicy::Reject {
            if let Some(p) = other.params.iter().find(|p| self.contains(&p.name)) {
                return Err(ModelError::DuplicateParameter(p.name.clone()));
            }
        }

        let mut report = MergeReport::default();
        for theirs in &other.params {
            match self.index.get(&theirs.name) {
                Some(&i) => match on_conflict {
                    ConflictPolicy::OverwriteValueAndError => {
                        let ours = &mut self.params[i];
                        ours.value = theirs.value;
                        ours.error = theirs.error;
                        report.updated.push(theirs.name.clone());
                    }
                    ConflictPolicy::KeepExisting | ConflictPolicy::Reject => {
                        report.kept.push(theirs.name.clone());
                    }
                },
                None => {
                    self.index.insert(theirs.name.clone(), self.params.len());
                    self.params.push(theirs.clone());
                    report.added.push(theirs.name.clone());
                }
            }
        }
        Ok(report)
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut Parameter, ModelError> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.params[i]),
            None => Err(ModelError::NotFound(name.to_string())),
        }
    }
}

impl ParameterStore {
    /// Rebuild a store from an exported parameter table.
    pub fn from_parameters(
        params: impl IntoIterator<Item = Parameter>,
    ) -> Result<Self, ModelError> {
        let mut store = ParameterStore::new();
        for p in params {
            if store.contains(&p.name) {
                return Err(ModelError::DuplicateParameter(p.name));
            }
            store.index.insert(p.name.clone(), store.params.len());
            store.params.push(p);
        }
        Ok(store)
    }
}

fn check_error(name: &str, low: f64, high: f64) -> Result<(), ModelError> {
    if !(low.is_finite() && high.is_finite() && low >= 0.0 && high >= 0.0) {
        return Err(ModelError::Config(format!(
            "parameter '{name}': errors ({low}, {high}) must be finite and non-negative"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_rejects_duplicates() {
        let mut store = ParameterStore::new();
        store.declare("a", 1.0, Some(0.0), Some(2.0), None).unwrap();
        let err = store.declare("a", 1.0, Some(0.0), Some(2.0), None).unwrap_err();
        assert_eq!(err, ModelError::DuplicateParameter("a".into()));
    }

    #[test]
    fn missing_bounds_make_constant() {
        let mut store = ParameterStore::new();
        let h = store.declare("c", 0.5, None, None, None).unwrap();
        assert_eq!(store.get("c").unwrap().kind, ParameterKind::Constant);
        assert!(!store.get("c").unwrap().reportable());
        assert_eq!(store.value(&h).unwrap(), 0.5);
        assert!(store.all_floating().is_empty());
    }

    #[test]
    fn half_open_bounds_rejected() {
        let mut store = ParameterStore::new();
        let err = store.declare("c", 0.5, Some(0.0), None, None).unwrap_err();
        assert!(matches!(err, ModelError::Config(_)));
        let err = store.declare("d", 5.0, Some(0.0), Some(1.0), None).unwrap_err();
        assert!(matches!(err, ModelError::Config(_)));
    }

    #[test]
    fn set_value_and_error() {
        let mut store = ParameterStore::new();
        let h = store.declare("a", 1.0, Some(0.0), Some(2.0), None).unwrap();
        store.set_value("a", 1.5).unwrap();
        store.set_error("a", 0.1, 0.2).unwrap();
        assert_eq!(store.value(&h).unwrap(), 1.5);
        assert_eq!(store.get("a").unwrap().nominal, 1.0);
        assert_eq!(
            store.get("a").unwrap().error,
            Some(AsymError { low: 0.1, high: 0.2 })
        );
        assert_eq!(store.set_value("b", 1.0), Err(ModelError::NotFound("b".into())));
        assert_eq!(
            store.set_error("b", 1.0, 1.0),
            Err(ModelError::NotFound("b".into()))
        );
    }

    #[test]
    fn all_floating_keeps_declaration_order() {
        let mut store = ParameterStore::new();
        store.declare("z", 1.0, Some(0.0), Some(2.0), None).unwrap();
        store.declare("k", 1.0, None, None, None).unwrap();
        store.declare("a", 1.0, Some(0.0), Some(2.0), None).unwrap();
        let floating = store.all_floating();
        let names: Vec<&str> = floating.iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["z", "a"]);
    }

    #[test]
    fn merge_overwrites_value_and_error_and_appends_new() {
        let mut ours = ParameterStore::new();
        ours.declare("a", 1.0, Some(0.0), Some(2.0), None).unwrap();
        let mut theirs = ParameterStore::new();
        theirs.declare("b", 3.0, Some(0.0), Some(5.0), None).unwrap();
        theirs.declare("a", 1.0, Some(-1.0), Some(9.0), None).unwrap();
        theirs.set_value("a", 1.7).unwrap();
        theirs.set_error("a", 0.3, 0.4).unwrap();

        let report = ours
            .merge(&theirs, ConflictPolicy::OverwriteValueAndError)
            .unwrap();
        assert_eq!(report.updated, vec!["a"]);
        assert_eq!(report.added, vec!["b"]);
        let a = ours.get("a").unwrap();
        assert_eq!(a.value, 1.7);
        assert_eq!(a.low, Some(0.0));
        assert_eq!(a.error, Some(AsymError { low: 0.3, high: 0.4 }));
        assert_eq!(ours.parameters()[1].name, "b");
    }

    #[test]
    fn merge_reject_fails_without_side_effects() {
        let mut ours = ParameterStore::new();
        ours.declare("a", 1.0, Some(0.0), Some(2.0), None).unwrap();
        let mut theirs = ParameterStore::new();
        theirs.declare("b", 1.0, None, None, None).unwrap();
        theirs.declare("a", 1.0, None, None, None).unwrap();
        let err = ours.merge(&theirs, ConflictPolicy::Reject).unwrap_err();
        assert_eq!(err, ModelError::DuplicateParameter("a".into()));
        assert_eq!(ours.len(), 1);
    }

    #[test]
    fn merge_keep_existing_leaves_entries_alone() {
        let mut ours = ParameterStore::new();
        ours.declare("a", 1.0, Some(0.0), Some(2.0), Some(AsymError { low: 0.1, high: 0.2 }))
            .unwrap();
        let mut theirs = ParameterStore::new();
        theirs.declare("c", 4.0, None, None, None).unwrap();
        theirs.declare("a", 1.0, Some(0.0), Some(2.0), None).unwrap();
        theirs.declare("b", 3.0, Some(0.0), Some(5.0), None).unwrap();
        theirs.set_value("a", 1.9).unwrap();
        theirs.set_error("a", 0.5, 0.5).unwrap();

        let report = ours.merge(&theirs, ConflictPolicy::KeepExisting).unwrap();
        assert_eq!(report.kept, vec!["a"]);
        assert!(report.updated.is_empty());
        assert_eq!(report.added, vec!["c", "b"]);
        let a = ours.get("a").unwrap();
        assert_eq!(a.value, 1.0);
        assert_eq!(a.error, Some(AsymError { low: 0.1, high: 0.2 }));
        let names: Vec<&str> = ours.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "b"]);
    }

    #[test]
    fn handle_from_other_store_resolves_by_name() {
        let mut a = ParameterStore::new();
        a.declare("x", 1.0, None, None, None).unwrap();
        let h = a.declare("y", 2.0, None, None, None).unwrap();
        let mut b = ParameterStore::new();
        b.declare("y", 5.0, None, None, None).unwrap();
        assert_eq!(b.value(&h).unwrap(), 5.0);
    }
}

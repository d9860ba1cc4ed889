//! Transfer-function construction and per-bin evaluation.
//!
//! Parameter names are part of the interface with the external fit engine
//! and with previously serialized models:
//!
//! - split polynomial: `splitPolyX_<i>`, `splitPolyY_<j>`
//! - full polynomial:  `fullPoly_x<i>y<j>`
//! - basis:            `basis_<k>`
//! - generic formula:  `generic_<n>`
//!
//! each followed by `_<suffix>` when a suffix is configured. Bin-scoped
//! nodes are named `<family>_bin_<x>-<y>_<model>`.

use std::sync::Arc;

use tracing::warn;

use crate::domain::{FitConfig, OrderSpec, ParamSpec};
use crate::error::ModelError;
use crate::math::basis_terms;
use crate::node::{Node, Op};
use crate::params::{AsymError, ParameterHandle, ParameterStore};
use crate::transfer::formula::Formula;

/// Output floor of the polynomial and basis families.
pub const POLY_EPSILON: f64 = 1e-9;
/// Output floor of the generic formula family.
pub const GENERIC_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    SplitPolynomial,
    FullPolynomial,
    Basis,
    Generic,
}

impl Family {
    /// Name prefix used for parameters and nodes.
    pub fn tag(self) -> &'static str {
        match self {
            Family::SplitPolynomial => "splitPoly",
            Family::FullPolynomial => "fullPoly",
            Family::Basis => "basis",
            Family::Generic => "generic",
        }
    }

    /// Configuration key selecting this family.
    pub fn config_key(self) -> &'static str {
        match self {
            Family::SplitPolynomial => "SPLITPOLY",
            Family::FullPolynomial => "POLY",
            Family::Basis => "BASIS",
            Family::Generic => "FORM",
        }
    }

    pub fn epsilon(self) -> f64 {
        match self {
            Family::SplitPolynomial | Family::FullPolynomial | Family::Basis => POLY_EPSILON,
            Family::Generic => GENERIC_EPSILON,
        }
    }
}

/// Family-specific state; each variant owns the leaves of its coefficients.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferFunctionKind {
    SplitPoly {
        x: Vec<Arc<Node>>,
        y: Vec<Arc<Node>>,
    },
    FullPoly {
        x_order: usize,
        y_order: usize,
        coeffs: Vec<Arc<Node>>,
    },
    Basis {
        x_order: usize,
        y_order: usize,
        weights: Vec<Arc<Node>>,
    },
    Generic {
        formula: Arc<Formula>,
        coeffs: Vec<Arc<Node>>,
    },
}

impl TransferFunctionKind {
    pub fn family(&self) -> Family {
        match self {
            TransferFunctionKind::SplitPoly { .. } => Family::SplitPolynomial,
            TransferFunctionKind::FullPoly { .. } => Family::FullPolynomial,
            TransferFunctionKind::Basis { .. } => Family::Basis,
            TransferFunctionKind::Generic { .. } => Family::Generic,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferFunction {
    kind: TransferFunctionKind,
    model: String,
    parameters: Vec<ParameterHandle>,
}

/// Resolve which family the `FIT` block selects.
pub fn select_family(fit: &FitConfig) -> Result<Family, ModelError> {
    let present: Vec<Family> = [
        (Family::SplitPolynomial, fit.splitpoly.is_some()),
        (Family::FullPolynomial, fit.poly.is_some()),
        (Family::Basis, fit.basis.is_some()),
        (Family::Generic, fit.form.is_some()),
    ]
    .into_iter()
    .filter_map(|(f, on)| on.then_some(f))
    .collect();

    match present.as_slice() {
        [] => Err(ModelError::UnknownFitForm),
        [one] => Ok(*one),
        many => Err(ModelError::AmbiguousFitForm(
            many.iter().map(|f| f.config_key().to_string()).collect(),
        )),
    }
}

impl TransferFunction {
    /// Validate the `FIT` block and declare every coefficient in `store`.
    pub fn build(
        fit: &FitConfig,
        model: &str,
        suffix: &str,
        store: &mut ParameterStore,
    ) -> Result<Self, ModelError> {
        let family = select_family(fit)?;
        let tag = family.tag();

        // (config key, parameter name) per coefficient, in declaration order.
        let (keys, formula) = match family {
            Family::SplitPolynomial => {
                let o = order(fit.splitpoly)?;
                let keys: Vec<(String, String)> = (0..=o.xorder)
                    .map(|i| (format!("X{i}"), format!("{tag}X_{i}")))
                    .chain((0..=o.yorder).map(|j| (format!("Y{j}"), format!("{tag}Y_{j}"))))
                    .collect();
                (keys, None)
            }
            Family::FullPolynomial => {
                let o = order(fit.poly)?;
                let keys = (0..=o.yorder)
                    .flat_map(|j| (0..=o.xorder).map(move |i| (i, j)))
                    .map(|(i, j)| (format!("x{i}y{j}"), format!("{tag}_x{i}y{j}")))
                    .collect();
                (keys, None)
            }
            Family::Basis => {
                let o = order(fit.basis)?;
                let n = basis_terms(o.xorder, o.yorder).len();
                if n == 0 {
                    return Err(ModelError::Config(
                        "BASIS needs XORDER or YORDER of at least 1".into(),
                    ));
                }
                let keys = (0..n).map(|k| (k.to_string(), format!("{tag}_{k}"))).collect();
                (keys, None)
            }
            Family::Generic => {
                let source = fit.form.as_deref().unwrap_or_default();
                let formula = Formula::parse(source)?;
                let keys = (0..formula.n_coeffs())
                    .map(|k| (k.to_string(), format!("{tag}_{k}")))
                    .collect();
                (keys, Some(Arc::new(formula)))
            }
        };

        if let Some(unknown) = fit
            .params
            .keys()
            .find(|k| !keys.iter().any(|(key, _)| key == *k))
        {
            return Err(ModelError::Config(format!(
                "FIT.PARAMS key '{unknown}' is not a coefficient of the {} form",
                family.config_key()
            )));
        }

        let mut parameters = Vec::with_capacity(keys.len());
        let mut leaves = Vec::with_capacity(keys.len());
        for (key, base) in &keys {
            let spec = fit.params.get(key).or(fit.default.as_ref()).ok_or_else(|| {
                ModelError::Config(format!(
                    "FIT.PARAMS has no entry for coefficient '{key}' and no DEFAULT is set"
                ))
            })?;
            let name = with_suffix(base, suffix);
            let handle = declare_coefficient(store, &name, spec)?;
            leaves.push(Arc::new(Node::leaf(handle.clone())));
            parameters.push(handle);
        }

        let kind = match family {
            Family::SplitPolynomial => {
                let nx = order(fit.splitpoly)?.xorder + 1;
                let y = leaves.split_off(nx);
                TransferFunctionKind::SplitPoly { x: leaves, y }
            }
            Family::FullPolynomial => {
                let o = order(fit.poly)?;
                TransferFunctionKind::FullPoly {
                    x_order: o.xorder,
                    y_order: o.yorder,
                    coeffs: leaves,
                }
            }
            Family::Basis => {
                let o = order(fit.basis)?;
                TransferFunctionKind::Basis {
                    x_order: o.xorder,
                    y_order: o.yorder,
                    weights: leaves,
                }
            }
            Family::Generic => TransferFunctionKind::Generic {
                formula: formula.ok_or_else(|| ModelError::Config("FIT.FORM missing".into()))?,
                coeffs: leaves,
            },
        };

        Ok(Self {
            kind,
            model: model.to_string(),
            parameters,
        })
    }

    pub fn kind(&self) -> &TransferFunctionKind {
        &self.kind
    }

    pub fn family(&self) -> Family {
        self.kind.family()
    }

    pub fn epsilon(&self) -> f64 {
        self.family().epsilon()
    }

    /// Every coefficient, in naming order.
    pub fn parameters(&self) -> &[ParameterHandle] {
        &self.parameters
    }

    /// The compiled formula of the generic family.
    pub fn formula(&self) -> Option<&Formula> {
        match &self.kind {
            TransferFunctionKind::Generic { formula, .. } => Some(formula),
            _ => None,
        }
    }

    /// Transfer node at the mapped point `(x, y)`.
    pub fn evaluate(&self, x: f64, y: f64) -> Node {
        self.build_node(x, y, "")
    }

    /// Transfer node of bin `(xbin, ybin)`, named `<family>_bin_<x>-<y>_<model>`.
    pub fn bin_node(&self, xbin: usize, ybin: usize, x: f64, y: f64) -> Node {
        self.build_node(x, y, &format!("_bin_{xbin}-{ybin}_{}", self.model))
    }

    fn build_node(&self, x: f64, y: f64, label: &str) -> Node {
        let family = self.family();
        let tag = family.tag();
        let raw = match &self.kind {
            TransferFunctionKind::SplitPoly { x: cx, y: cy } => {
                let px = Node::derived(format!("{tag}X{label}"), Op::Polynomial { t: x }, cx.clone());
                let py = Node::derived(format!("{tag}Y{label}"), Op::Polynomial { t: y }, cy.clone());
                Node::derived(
                    format!("{tag}_prod{label}"),
                    Op::Multiply,
                    vec![Arc::new(px), Arc::new(py)],
                )
            }
            TransferFunctionKind::FullPoly {
                x_order, coeffs, ..
            } => Node::derived(
                format!("{tag}_sum{label}"),
                Op::Polynomial2D {
                    x,
                    y,
                    x_order: *x_order,
                },
                coeffs.clone(),
            ),
            TransferFunctionKind::Basis {
                x_order,
                y_order,
                weights,
            } => Node::derived(
                format!("{tag}_sum{label}"),
                Op::Basis {
                    x,
                    y,
                    x_order: *x_order,
                    y_order: *y_order,
                },
                weights.clone(),
            ),
            TransferFunctionKind::Generic { formula, coeffs } => Node::derived(
                format!("{tag}_raw{label}"),
                Op::Formula {
                    formula: Arc::clone(formula),
                    x,
                    y,
                },
                coeffs.clone(),
            ),
        };
        Node::derived(
            format!("{tag}{label}"),
            Op::Floor {
                epsilon: family.epsilon(),
            },
            vec![Arc::new(raw)],
        )
    }
}

fn order(spec: Option<OrderSpec>) -> Result<OrderSpec, ModelError> {
    spec.ok_or_else(|| ModelError::Config("fit order block missing".into()))
}

/// `base` or `base_suffix`.
pub fn with_suffix(base: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        base.to_string()
    } else {
        format!("{base}_{suffix}")
    }
}

fn declare_coefficient(
    store: &mut ParameterStore,
    name: &str,
    spec: &ParamSpec,
) -> Result<ParameterHandle, ModelError> {
    if spec.min.is_none() && spec.max.is_none() {
        warn!(
            parameter = name,
            nominal = spec.nominal,
            "no MIN/MAX given; coefficient is held constant in the fit"
        );
    }
    store.declare(
        name,
        spec.nominal,
        spec.min,
        spec.max,
        spec.error.map(AsymError::symmetric),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn bounded(nominal: f64) -> ParamSpec {
        ParamSpec {
            nominal,
            min: Some(-10.0),
            max: Some(10.0),
            error: None,
        }
    }

    fn poly_fit(xorder: usize, yorder: usize) -> FitConfig {
        FitConfig {
            poly: Some(OrderSpec { xorder, yorder }),
            default: Some(bounded(0.0)),
            ..FitConfig::default()
        }
    }

    #[test]
    fn full_polynomial_scenario() {
        let mut fit = poly_fit(1, 1);
        fit.params = BTreeMap::from([
            ("x0y0".to_string(), bounded(2.0)),
            ("x1y0".to_string(), bounded(1.0)),
            ("x0y1".to_string(), bounded(1.0)),
            ("x1y1".to_string(), bounded(0.0)),
        ]);
        let mut store = ParameterStore::new();
        let tf = TransferFunction::build(&fit, "SR", "", &mut store).unwrap();
        let names: Vec<&str> = tf.parameters().iter().map(|h| h.name()).collect();
        assert_eq!(
            names,
            vec!["fullPoly_x0y0", "fullPoly_x1y0", "fullPoly_x0y1", "fullPoly_x1y1"]
        );
        let v = tf.evaluate(0.5, 0.5).value(&store).unwrap();
        assert!((v - 3.0).abs() < 1e-12);
    }

    #[test]
    fn split_polynomial_is_product_of_axes() {
        let fit = FitConfig {
            splitpoly: Some(OrderSpec { xorder: 1, yorder: 0 }),
            params: BTreeMap::from([
                ("X0".to_string(), bounded(1.0)),
                ("X1".to_string(), bounded(2.0)),
                ("Y0".to_string(), bounded(0.5)),
            ]),
            ..FitConfig::default()
        };
        let mut store = ParameterStore::new();
        let tf = TransferFunction::build(&fit, "SR", "r2", &mut store).unwrap();
        let names: Vec<&str> = tf.parameters().iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["splitPolyX_0_r2", "splitPolyX_1_r2", "splitPolyY_0_r2"]);
        let v = tf.evaluate(0.25, 0.9).value(&store).unwrap();
        assert!((v - 0.75).abs() < 1e-12);
    }

    #[test]
    fn basis_maps_sum_to_half_plus_half() {
        let fit = FitConfig {
            basis: Some(OrderSpec { xorder: 1, yorder: 1 }),
            default: Some(ParamSpec {
                nominal: 0.0,
                min: Some(-1.0),
                max: Some(1.0),
                error: None,
            }),
            ..FitConfig::default()
        };
        let mut store = ParameterStore::new();
        let tf = TransferFunction::build(&fit, "SR", "", &mut store).unwrap();
        assert_eq!(tf.parameters().len(), 3);
        assert!((tf.evaluate(0.3, 0.8).value(&store).unwrap() - 0.5).abs() < 1e-12);
        // w for T_1(u_x): u_x = 2*1 - 1 = 1
        store.set_value("basis_0", 1.0).unwrap();
        assert!((tf.evaluate(1.0, 0.5).value(&store).unwrap() - 1.0).abs() < 1e-12);
        store.set_value("basis_0", -1.0).unwrap();
        assert_eq!(tf.evaluate(1.0, 0.5).value(&store).unwrap(), POLY_EPSILON);
    }

    #[test]
    fn generic_formula_binds_x_after_coefficients() {
        let fit = FitConfig {
            form: Some("@0 + x*@1".into()),
            params: BTreeMap::from([
                ("0".to_string(), bounded(1.0)),
                ("1".to_string(), bounded(2.0)),
            ]),
            ..FitConfig::default()
        };
        let mut store = ParameterStore::new();
        let tf = TransferFunction::build(&fit, "SR", "", &mut store).unwrap();
        assert_eq!(tf.formula().unwrap().x_slot(), 2);
        assert_eq!(tf.formula().unwrap().substituted(), "@0 + @2*@1");
        let v = tf.evaluate(0.5, 0.0).value(&store).unwrap();
        assert!((v - 2.0).abs() < 1e-12);
        store.set_value("generic_0", -5.0).unwrap();
        assert_eq!(tf.evaluate(0.5, 0.0).value(&store).unwrap(), GENERIC_EPSILON);
    }

    #[test]
    fn family_selection_errors() {
        let mut store = ParameterStore::new();
        let err = TransferFunction::build(&FitConfig::default(), "SR", "", &mut store).unwrap_err();
        assert_eq!(err, ModelError::UnknownFitForm);

        let mut fit = poly_fit(1, 1);
        fit.form = Some("@0*x".into());
        let err = TransferFunction::build(&fit, "SR", "", &mut store).unwrap_err();
        assert_eq!(
            err,
            ModelError::AmbiguousFitForm(vec!["POLY".into(), "FORM".into()])
        );
        assert!(store.is_empty());
    }

    #[test]
    fn invalid_formula_rejected_before_declaring() {
        let fit = FitConfig {
            form: Some("@0 + @2*x".into()),
            default: Some(bounded(1.0)),
            ..FitConfig::default()
        };
        let mut store = ParameterStore::new();
        let err = TransferFunction::build(&fit, "SR", "", &mut store).unwrap_err();
        assert!(matches!(err, ModelError::InvalidFormula { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn missing_coefficient_without_default_is_config_error() {
        let fit = FitConfig {
            poly: Some(OrderSpec { xorder: 0, yorder: 0 }),
            ..FitConfig::default()
        };
        let mut store = ParameterStore::new();
        let err = TransferFunction::build(&fit, "SR", "", &mut store).unwrap_err();
        assert!(matches!(err, ModelError::Config(_)));
    }

    #[test]
    fn unknown_params_key_rejected() {
        let mut fit = poly_fit(1, 0);
        fit.params.insert("x0y1".into(), bounded(1.0));
        let mut store = ParameterStore::new();
        let err = TransferFunction::build(&fit, "SR", "", &mut store).unwrap_err();
        assert!(matches!(err, ModelError::Config(_)));
    }

    #[test]
    fn unbounded_coefficient_is_constant() {
        let mut fit = poly_fit(0, 0);
        fit.params.insert(
            "x0y0".into(),
            ParamSpec {
                nominal: 0.2,
                min: None,
                max: None,
                error: None,
            },
        );
        let mut store = ParameterStore::new();
        TransferFunction::build(&fit, "SR", "", &mut store).unwrap();
        assert!(store.all_floating().is_empty());
        assert!(!store.get("fullPoly_x0y0").unwrap().reportable());
    }

    #[test]
    fn bin_nodes_are_named_and_idempotent() {
        let mut store = ParameterStore::new();
        let tf = TransferFunction::build(&poly_fit(2, 1), "SR", "", &mut store).unwrap();
        let a = tf.bin_node(3, 4, 0.25, 0.75);
        let b = tf.bin_node(3, 4, 0.25, 0.75);
        assert_eq!(a.name(), "fullPoly_bin_3-4_SR");
        assert_eq!(a, b);
        assert_eq!(tf.evaluate(0.1, 0.2), tf.evaluate(0.1, 0.2));
    }
}

//! Leaf, constant and derived nodes.
//!
//! A derived node is an operator over an ordered list of inputs. Evaluation
//! binds every leaf against a `ParameterStore`, so the same graph can be
//! evaluated before and after the store has been updated by a fit.

use std::sync::Arc;

use crate::error::ModelError;
use crate::math::{basis_values, horner, morph_value, poly2d};
use crate::params::{ParameterHandle, ParameterStore};
use crate::transfer::formula::Formula;

/// Operator of a derived node.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Product of all inputs.
    Multiply,
    /// `Σ c_i t^i`; inputs are `c_0 .. c_n`.
    Polynomial { t: f64 },
    /// `Σ c_ij x^i y^j`; inputs row-major, `y` outer, `x` inner.
    Polynomial2D { x: f64, y: f64, x_order: usize },
    /// `(1 + Σ w_k B_k(x, y)) / 2` over the Chebyshev product basis;
    /// inputs are the weights `w_k`.
    Basis {
        x: f64,
        y: f64,
        x_order: usize,
        y_order: usize,
    },
    /// Generic formula; inputs are the explicit coefficients.
    Formula { formula: Arc<Formula>, x: f64, y: f64 },
    /// `max(epsilon, input)`.
    Floor { epsilon: f64 },
    /// Smooth shape morph of `nominal` driven by the single input (the nuisance).
    ShapeMorph { nominal: f64, up: f64, down: f64 },
}

impl Op {
    pub fn label(&self) -> &'static str {
        match self {
            Op::Multiply => "multiply",
            Op::Polynomial { .. } => "polynomial",
            Op::Polynomial2D { .. } => "polynomial2d",
            Op::Basis { .. } => "basis",
            Op::Formula { .. } => "formula",
            Op::Floor { .. } => "floor",
            Op::ShapeMorph { .. } => "shape_morph",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A parameter of the model.
    Leaf(ParameterHandle),
    Constant { name: String, value: f64 },
    Derived {
        name: String,
        op: Op,
        inputs: Vec<Arc<Node>>,
    },
}

impl Node {
    pub fn leaf(handle: ParameterHandle) -> Self {
        Node::Leaf(handle)
    }

    pub fn constant(name: impl Into<String>, value: f64) -> Self {
        Node::Constant {
            name: name.into(),
            value,
        }
    }

    pub fn derived(name: impl Into<String>, op: Op, inputs: Vec<Arc<Node>>) -> Self {
        Node::Derived {
            name: name.into(),
            op,
            inputs,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Leaf(h) => h.name(),
            Node::Constant { name, .. } | Node::Derived { name, .. } => name,
        }
    }

    /// Same node under a different name. Leaves keep their parameter name.
    pub fn named(self, new_name: impl Into<String>) -> Self {
        match self {
            Node::Leaf(h) => Node::Leaf(h),
            Node::Constant { value, .. } => Node::Constant {
                name: new_name.into(),
                value,
            },
            Node::Derived { op, inputs, .. } => Node::Derived {
                name: new_name.into(),
                op,
                inputs,
            },
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Node::Constant { .. })
    }

    /// Numeric value with every leaf bound from `store`.
    pub fn value(&self, store: &ParameterStore) -> Result<f64, ModelError> {
        match self {
            Node::Leaf(h) => store.value(h),
            Node::Constant { value, .. } => Ok(*value),
            Node::Derived { name, op, inputs } => {
                let args = inputs
                    .iter()
                    .map(|n| n.value(store))
                    .collect::<Result<Vec<f64>, ModelError>>()?;
                apply(name, op, &args)
            }
        }
    }

    /// Parameter handles reachable from this node, depth-first, first occurrence only.
    pub fn parameters(&self) -> Vec<ParameterHandle> {
        let mut out = Vec::new();
        self.collect_parameters(&mut out);
        out
    }

    fn collect_parameters(&self, out: &mut Vec<ParameterHandle>) {
        match self {
            Node::Leaf(h) => {
                if !out.contains(h) {
                    out.push(h.clone());
                }
            }
            Node::Constant { .. } => {}
            Node::Derived { inputs, .. } => {
                for n in inputs {
                    n.collect_parameters(out);
                }
            }
        }
    }
}

fn apply(name: &str, op: &Op, args: &[f64]) -> Result<f64, ModelError> {
    let arity = |expected: usize| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(ModelError::Config(format!(
                "node '{name}': {} expects {expected} input(s), got {}",
                op.label(),
                args.len()
            )))
        }
    };
    match op {
        Op::Multiply => Ok(args.iter().product()),
        Op::Polynomial { t } => Ok(horner(args, *t)),
        Op::Polynomial2D { x, y, x_order } => poly2d(args, *x_order, *x, *y).ok_or_else(|| {
            ModelError::Config(format!(
                "node '{name}': {} inputs do not fill rows of {}",
                args.len(),
                x_order + 1
            ))
        }),
        Op::Basis {
            x,
            y,
            x_order,
            y_order,
        } => {
            let basis = basis_values(*x_order, *y_order, *x, *y);
            arity(basis.len())?;
            let sum: f64 = basis.iter().zip(args).map(|(b, w)| b * w).sum();
            Ok(0.5 * (1.0 + sum))
        }
        Op::Formula { formula, x, y } => {
            arity(formula.n_coeffs())?;
            formula.eval(args, *x, *y)
        }
        Op::Floor { epsilon } => {
            arity(1)?;
            // f64::max ignores NaN, so a NaN input also lands on epsilon.
            Ok(epsilon.max(args[0]))
        }
        Op::ShapeMorph { nominal, up, down } => {
            arity(1)?;
            Ok(morph_value(args[0], *nominal, *up, *down))
        }
    }
}

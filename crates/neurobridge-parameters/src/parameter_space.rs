// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Parameter Space
//!
//! Ordered mapping from parameter name to a value descriptor:
//!
//! | Variant     | Homogeneous | Materialised |
//! |-------------|-------------|--------------|
//! | `Scalar`    | yes         | yes          |
//! | `Array`     | no          | yes          |
//! | `Generated` | no          | on evaluate  |
//! | `Lazy`      | if operands are | on evaluate |
//!
//! Setting a shape never materialises anything: one weight shared by a
//! million connections stays a single `f64` until `evaluate(false)` is called.

use crate::error::{ParameterError, ParameterResult};
use crate::expression::{BinaryOp, LazyExpression};
use ahash::AHashMap;
use ndarray::Array1;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Per-index value generator (e.g. a distance-dependent weight)
#[derive(Clone)]
pub struct Generator(Arc<dyn Fn(usize) -> f64 + Send + Sync>);

impl Generator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(usize) -> f64 + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn generate(&self, len: usize) -> Array1<f64> {
        Array1::from_iter((0..len).map(|i| (self.0)(i)))
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Generator(..)")
    }
}

/// A concrete, evaluated value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Array(Array1<f64>),
}

impl Value {
    /// Value at `index`; scalars answer every index
    pub fn at(&self, index: usize) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Array(values) => values.get(index).copied(),
        }
    }

    /// Materialise to an array of `len` entries
    pub fn broadcast(&self, len: usize) -> Array1<f64> {
        match self {
            Value::Scalar(v) => Array1::from_elem(len, *v),
            Value::Array(values) => values.clone(),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array1<f64>> {
        match self {
            Value::Scalar(_) => None,
            Value::Array(values) => Some(values),
        }
    }
}

/// Collapse an array whose entries are all equal to a single scalar
///
/// Returns `None` for empty or non-uniform arrays.
pub fn simplify(values: &Array1<f64>) -> Option<f64> {
    let first = *values.first()?;
    values.iter().all(|&v| v == first).then_some(first)
}

/// A parameter value, possibly not yet evaluated
#[derive(Debug, Clone)]
pub enum ParameterValue {
    Scalar(f64),
    Array(Array1<f64>),
    Generated(Generator),
    Lazy(Arc<LazyExpression>),
}

impl ParameterValue {
    pub fn is_homogeneous(&self) -> bool {
        match self {
            ParameterValue::Scalar(_) => true,
            ParameterValue::Array(_) | ParameterValue::Generated(_) => false,
            ParameterValue::Lazy(expr) => expr.is_homogeneous(),
        }
    }

    pub fn is_evaluated(&self) -> bool {
        matches!(self, ParameterValue::Scalar(_) | ParameterValue::Array(_))
    }

    /// Evaluate without broadcasting or simplifying
    pub fn evaluate(&self, shape: Option<usize>, name: &str) -> ParameterResult<Value> {
        match self {
            ParameterValue::Scalar(v) => Ok(Value::Scalar(*v)),
            ParameterValue::Array(values) => {
                if let Some(expected) = shape {
                    if values.len() != expected {
                        return Err(ParameterError::ShapeMismatch {
                            name: name.to_string(),
                            expected,
                            actual: values.len(),
                        });
                    }
                }
                Ok(Value::Array(values.clone()))
            }
            ParameterValue::Generated(generator) => {
                let len = shape.ok_or_else(|| ParameterError::ShapeRequired(name.to_string()))?;
                Ok(Value::Array(generator.generate(len)))
            }
            ParameterValue::Lazy(expr) => expr.evaluate(shape, name),
        }
    }

    /// Multiply by a constant; eager for materialised values
    pub fn scaled(&self, factor: f64) -> ParameterValue {
        match self {
            ParameterValue::Scalar(v) => ParameterValue::Scalar(v * factor),
            ParameterValue::Array(values) => ParameterValue::Array(values * factor),
            other => lazy_binary(other.clone(), BinaryOp::Mul, factor),
        }
    }

    /// Divide by a constant; the zero check is deferred to evaluation
    pub fn divided(&self, divisor: f64) -> ParameterValue {
        match self {
            ParameterValue::Scalar(v) if divisor != 0.0 => ParameterValue::Scalar(v / divisor),
            ParameterValue::Array(values) if divisor != 0.0 => {
                ParameterValue::Array(values / divisor)
            }
            other => lazy_binary(other.clone(), BinaryOp::Div, divisor),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ParameterValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array1<f64>> {
        match self {
            ParameterValue::Array(values) => Some(values),
            _ => None,
        }
    }
}

fn lazy_binary(operand: ParameterValue, op: BinaryOp, constant: f64) -> ParameterValue {
    ParameterValue::Lazy(Arc::new(LazyExpression::with_constant(operand, op, constant)))
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Scalar(value)
    }
}

impl From<Vec<f64>> for ParameterValue {
    fn from(values: Vec<f64>) -> Self {
        ParameterValue::Array(Array1::from(values))
    }
}

impl From<Array1<f64>> for ParameterValue {
    fn from(values: Array1<f64>) -> Self {
        ParameterValue::Array(values)
    }
}

impl From<Value> for ParameterValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Scalar(v) => ParameterValue::Scalar(v),
            Value::Array(values) => ParameterValue::Array(values),
        }
    }
}

impl From<Generator> for ParameterValue {
    fn from(generator: Generator) -> Self {
        ParameterValue::Generated(generator)
    }
}

/// Ordered name → value mapping with an optional shared shape
#[derive(Debug, Clone, Default)]
pub struct ParameterSpace {
    names: Vec<String>,
    values: AHashMap<String, ParameterValue>,
    shape: Option<usize>,
}

impl ParameterSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shape(shape: usize) -> Self {
        Self {
            shape: Some(shape),
            ..Self::default()
        }
    }

    /// Build from `(name, value)` pairs, keeping their order
    ///
    /// # Example
    /// ```
    /// use neurobridge_parameters::{ParameterSpace, ParameterValue};
    ///
    /// let ps = ParameterSpace::from_pairs([
    ///     ("a", ParameterValue::from(1.0)),
    ///     ("b", ParameterValue::from(vec![1.0, 2.0])),
    /// ]);
    /// assert_eq!(ps.names(), &["a".to_string(), "b".to_string()]);
    /// assert!(ps.is_homogeneous("a"));
    /// assert!(!ps.is_homogeneous("b"));
    /// ```
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, ParameterValue)>,
        S: Into<String>,
    {
        let mut ps = Self::new();
        for (name, value) in pairs {
            ps.insert(name, value);
        }
        ps
    }

    /// Insert or replace; replacing keeps the original position
    pub fn insert<S: Into<String>>(&mut self, name: S, value: ParameterValue) {
        let name = name.into();
        if !self.values.contains_key(&name) {
            self.names.push(name.clone());
        }
        self.values.insert(name, value);
    }

    /// Insert every entry of `other`, overriding existing names
    pub fn update(&mut self, other: &ParameterSpace) {
        for name in &other.names {
            if let Some(value) = other.values.get(name) {
                self.insert(name.clone(), value.clone());
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<ParameterValue> {
        let value = self.values.remove(name)?;
        self.names.retain(|n| n != name);
        Some(value)
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.names
            .iter()
            .filter_map(move |name| self.values.get(name).map(|v| (name.as_str(), v)))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn shape(&self) -> Option<usize> {
        self.shape
    }

    /// Declare the shape; scalars stay scalars until evaluated
    pub fn set_shape(&mut self, shape: usize) {
        self.shape = Some(shape);
    }

    pub fn is_homogeneous(&self, name: &str) -> bool {
        self.values.get(name).map(ParameterValue::is_homogeneous).unwrap_or(false)
    }

    pub fn has_lazy_entries(&self) -> bool {
        self.values.values().any(|v| !v.is_evaluated())
    }

    /// Copy of the listed entries, keeping shape; unknown names are skipped
    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> ParameterSpace {
        let mut subset = ParameterSpace {
            shape: self.shape,
            ..ParameterSpace::default()
        };
        for name in names {
            if let Some(value) = self.values.get(name.as_ref()) {
                subset.insert(name.as_ref(), value.clone());
            }
        }
        subset
    }

    /// Force every entry to a concrete value
    ///
    /// With `simplify`, homogeneous results are stored as scalars (uniform
    /// arrays collapse). Without it, scalars are broadcast to arrays when a
    /// shape is known. Calling this twice yields the same result.
    pub fn evaluate(&mut self, simplify_values: bool) -> ParameterResult<()> {
        let mut evaluated = Vec::with_capacity(self.names.len());
        for name in &self.names {
            let Some(value) = self.values.get(name) else {
                continue;
            };
            let value = value.evaluate(self.shape, name)?;
            let value = match (value, simplify_values, self.shape) {
                (Value::Array(values), true, _) => match simplify(&values) {
                    Some(v) => Value::Scalar(v),
                    None => Value::Array(values),
                },
                (Value::Scalar(v), false, Some(len)) => Value::Array(Array1::from_elem(len, v)),
                (value, _, _) => value,
            };
            evaluated.push((name.clone(), ParameterValue::from(value)));
        }
        for (name, value) in evaluated {
            self.values.insert(name, value);
        }
        Ok(())
    }

    /// Concrete value of an evaluated entry
    pub fn value(&self, name: &str) -> ParameterResult<Value> {
        match self.values.get(name) {
            Some(ParameterValue::Scalar(v)) => Ok(Value::Scalar(*v)),
            Some(ParameterValue::Array(values)) => Ok(Value::Array(values.clone())),
            Some(_) => Err(ParameterError::NotEvaluated(name.to_string())),
            None => Err(ParameterError::UnknownParameter(name.to_string())),
        }
    }

    /// Evaluated entries as a sorted map
    pub fn as_dict(&self) -> ParameterResult<BTreeMap<String, Value>> {
        self.names
            .iter()
            .map(|name| self.value(name).map(|v| (name.clone(), v)))
            .collect()
    }

    /// Apply `f` element-wise to an evaluated entry
    pub fn map_values<F>(&mut self, name: &str, f: F) -> ParameterResult<()>
    where
        F: Fn(f64) -> f64,
    {
        let mapped = match self.values.get(name) {
            Some(ParameterValue::Scalar(v)) => ParameterValue::Scalar(f(*v)),
            Some(ParameterValue::Array(values)) => ParameterValue::Array(values.mapv(&f)),
            Some(_) => return Err(ParameterError::NotEvaluated(name.to_string())),
            None => return Err(ParameterError::UnknownParameter(name.to_string())),
        };
        self.values.insert(name.to_string(), mapped);
        Ok(())
    }
}

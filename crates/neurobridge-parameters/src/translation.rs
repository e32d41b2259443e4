// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Translation Tables
//!
//! A translation table maps each logical (user-facing) parameter name to a
//! rule that converts values to and from the backend's native name and unit.
//!
//! ```text
//! ('a', 'A')                       identity      A = a
//! ('b', 'B', 1000.0)               scale         B = b * 1000    b = B / 1000
//! ('c', 'C', 'c + a', 'C - A')     expression    C = c + a       c = C - A
//! ```
//!
//! Tables are built once per model and never mutated. Forward expressions see
//! the logical namespace, reverse expressions the native one; both see the
//! [`Globals`] (e.g. `dt`).

use crate::error::{TranslationError, TranslationResult};
use crate::expression::Expression;
use crate::parameter_space::{ParameterSpace, ParameterValue};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::trace;

/// Declared value type of a native parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclaredType {
    #[default]
    Real,
    Integer,
    Boolean,
}

/// One direction of a translation rule
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Identity,
    Multiply(f64),
    Divide(f64),
    Expression(Expression),
}

impl Transform {
    fn apply(
        &self,
        value: &ParameterValue,
        namespace: &ParameterSpace,
        globals: &Globals,
    ) -> TranslationResult<ParameterValue> {
        Ok(match self {
            Transform::Identity => value.clone(),
            Transform::Multiply(factor) => value.scaled(*factor),
            Transform::Divide(divisor) => value.divided(*divisor),
            Transform::Expression(expr) => {
                let bound = expr.bind(|name| {
                    namespace
                        .get(name)
                        .cloned()
                        .or_else(|| globals.get(name).map(ParameterValue::Scalar))
                })?;
                ParameterValue::Lazy(Arc::new(bound))
            }
        })
    }

    fn describe(&self, operand: &str) -> String {
        match self {
            Transform::Identity => operand.to_string(),
            Transform::Multiply(factor) => format!("{operand} * {factor}"),
            Transform::Divide(divisor) => format!("{operand} / {divisor}"),
            Transform::Expression(expr) => expr.source().to_string(),
        }
    }
}

/// A single logical ↔ native rule
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRule {
    pub logical_name: String,
    pub native_name: String,
    pub forward: Transform,
    pub reverse: Transform,
    pub declared_type: DeclaredType,
}

/// Builder input for [`build_translations`]
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationSpec {
    logical_name: String,
    native_name: String,
    kind: SpecKind,
    declared_type: DeclaredType,
}

#[derive(Debug, Clone, PartialEq)]
enum SpecKind {
    Identity,
    Scaled(f64),
    ScaledPair { forward: f64, reverse: f64 },
    Expression { forward: String, reverse: String },
}

impl TranslationSpec {
    pub fn identity(logical: impl Into<String>, native: impl Into<String>) -> Self {
        Self::with_kind(logical, native, SpecKind::Identity)
    }

    /// Forward `x * factor`, reverse `X / factor`
    pub fn scaled(logical: impl Into<String>, native: impl Into<String>, factor: f64) -> Self {
        Self::with_kind(logical, native, SpecKind::Scaled(factor))
    }

    /// Forward `x * forward`, reverse `X * reverse`
    pub fn scaled_pair(
        logical: impl Into<String>,
        native: impl Into<String>,
        forward: f64,
        reverse: f64,
    ) -> Self {
        Self::with_kind(logical, native, SpecKind::ScaledPair { forward, reverse })
    }

    pub fn expression(
        logical: impl Into<String>,
        native: impl Into<String>,
        forward: impl Into<String>,
        reverse: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            logical,
            native,
            SpecKind::Expression {
                forward: forward.into(),
                reverse: reverse.into(),
            },
        )
    }

    pub fn with_type(mut self, declared_type: DeclaredType) -> Self {
        self.declared_type = declared_type;
        self
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    fn with_kind(logical: impl Into<String>, native: impl Into<String>, kind: SpecKind) -> Self {
        Self {
            logical_name: logical.into(),
            native_name: native.into(),
            kind,
            declared_type: DeclaredType::Real,
        }
    }

    fn into_rule(self) -> TranslationResult<TranslationRule> {
        let (forward, reverse) = match self.kind {
            SpecKind::Identity => (Transform::Identity, Transform::Identity),
            SpecKind::Scaled(factor) => (Transform::Multiply(factor), Transform::Divide(factor)),
            SpecKind::ScaledPair { forward, reverse } => {
                (Transform::Multiply(forward), Transform::Multiply(reverse))
            }
            SpecKind::Expression { forward, reverse } => (
                Transform::Expression(Expression::parse(&forward)?),
                Transform::Expression(Expression::parse(&reverse)?),
            ),
        };
        Ok(TranslationRule {
            logical_name: self.logical_name,
            native_name: self.native_name,
            forward,
            reverse,
            declared_type: self.declared_type,
        })
    }
}

/// Build a translation table; expression syntax is checked here
///
/// A repeated logical name replaces the earlier rule in place.
///
/// # Example
/// ```
/// use neurobridge_parameters::{build_translations, TranslationSpec};
///
/// let table = build_translations(&[
///     TranslationSpec::identity("a", "A"),
///     TranslationSpec::scaled("b", "B", 1000.0),
///     TranslationSpec::expression("c", "C", "c + a", "C - A"),
/// ])
/// .unwrap();
/// assert_eq!(table.simple_parameters(), vec!["a"]);
/// assert_eq!(table.scaled_parameters(), vec!["b"]);
/// assert_eq!(table.computed_parameters(), vec!["c"]);
/// ```
pub fn build_translations(specs: &[TranslationSpec]) -> TranslationResult<TranslationTable> {
    let mut table = TranslationTable::default();
    for spec in specs {
        table.push(spec.clone().into_rule()?);
    }
    Ok(table)
}

/// Named constants visible to every transform expression
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Globals {
    values: AHashMap<String, f64>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// Immutable logical → rule mapping, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationTable {
    rules: Vec<TranslationRule>,
    index: AHashMap<String, usize>,
}

impl TranslationTable {
    fn push(&mut self, rule: TranslationRule) {
        match self.index.get(&rule.logical_name) {
            Some(&i) => self.rules[i] = rule,
            None => {
                self.index.insert(rule.logical_name.clone(), self.rules.len());
                self.rules.push(rule);
            }
        }
    }

    pub fn rule(&self, logical_name: &str) -> Option<&TranslationRule> {
        self.index.get(logical_name).map(|&i| &self.rules[i])
    }

    pub fn native_name(&self, logical_name: &str) -> Option<&str> {
        self.rule(logical_name).map(|r| r.native_name.as_str())
    }

    pub fn contains(&self, logical_name: &str) -> bool {
        self.index.contains_key(logical_name)
    }

    pub fn rules(&self) -> impl Iterator<Item = &TranslationRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn names_where<F>(&self, predicate: F) -> Vec<&str>
    where
        F: Fn(&Transform) -> bool,
    {
        self.rules
            .iter()
            .filter(|r| predicate(&r.forward))
            .map(|r| r.logical_name.as_str())
            .collect()
    }

    /// Parameters translated by name only
    pub fn simple_parameters(&self) -> Vec<&str> {
        self.names_where(|t| matches!(t, Transform::Identity))
    }

    /// Parameters translated by a constant factor
    pub fn scaled_parameters(&self) -> Vec<&str> {
        self.names_where(|t| matches!(t, Transform::Multiply(_) | Transform::Divide(_)))
    }

    /// Parameters translated by an expression
    pub fn computed_parameters(&self) -> Vec<&str> {
        self.names_where(|t| matches!(t, Transform::Expression(_)))
    }

    /// Forward translation into a new, native-named parameter space
    ///
    /// Fails with `UnknownParameter` for names without a rule and with
    /// `UndefinedName` when an expression references a missing name.
    /// Arithmetic is deferred until the result is evaluated.
    pub fn translate(
        &self,
        parameters: &ParameterSpace,
        globals: &Globals,
    ) -> TranslationResult<ParameterSpace> {
        let mut native = match parameters.shape() {
            Some(shape) => ParameterSpace::with_shape(shape),
            None => ParameterSpace::new(),
        };
        for (name, value) in parameters.iter() {
            let rule = self
                .rule(name)
                .ok_or_else(|| TranslationError::UnknownParameter(name.to_string()))?;
            let translated = rule.forward.apply(value, parameters, globals)?;
            native.insert(rule.native_name.clone(), translated);
        }
        trace!(
            target: "neurobridge-parameters",
            "translated {} parameters",
            native.len()
        );
        Ok(native)
    }

    /// Reverse translation back to logical names
    ///
    /// Only rules whose native name is present in `native` are emitted.
    pub fn reverse_translate(
        &self,
        native: &ParameterSpace,
        globals: &Globals,
    ) -> TranslationResult<ParameterSpace> {
        let mut logical = match native.shape() {
            Some(shape) => ParameterSpace::with_shape(shape),
            None => ParameterSpace::new(),
        };
        for rule in &self.rules {
            let Some(value) = native.get(&rule.native_name) else {
                continue;
            };
            let translated = rule.reverse.apply(value, native, globals)?;
            logical.insert(rule.logical_name.clone(), translated);
        }
        Ok(logical)
    }

    /// Native names the reverse transform of `logical_name` reads
    ///
    /// Names referenced by an expression that are not native names of this
    /// table (globals such as `dt`) are left out.
    pub fn reverse_dependencies(&self, logical_name: &str) -> TranslationResult<Vec<String>> {
        let rule = self
            .rule(logical_name)
            .ok_or_else(|| TranslationError::UnknownParameter(logical_name.to_string()))?;
        Ok(match &rule.reverse {
            Transform::Expression(expr) => expr
                .free_names()
                .into_iter()
                .filter(|name| self.rules.iter().any(|r| &r.native_name == name))
                .collect(),
            _ => vec![rule.native_name.clone()],
        })
    }

    /// Human-readable listing of every rule
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for rule in &self.rules {
            let _ = writeln!(
                out,
                "{} -> {} [{:?}]: {} = {}; {} = {}",
                rule.logical_name,
                rule.native_name,
                rule.declared_type,
                rule.native_name,
                rule.forward.describe(&rule.logical_name),
                rule.logical_name,
                rule.reverse.describe(&rule.native_name),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TranslationTable {
        build_translations(&[
            TranslationSpec::identity("a", "A"),
            TranslationSpec::scaled("b", "B", 1000.0),
            TranslationSpec::expression("c", "C", "c + a", "C - A"),
        ])
        .unwrap()
    }

    #[test]
    fn test_syntax_error_at_build() {
        let err = build_translations(&[TranslationSpec::expression("c", "C", "c +", "C")])
            .unwrap_err();
        assert!(matches!(err, TranslationError::Syntax { .. }));
    }

    #[test]
    fn test_unknown_parameter_on_forward() {
        let ps = ParameterSpace::from_pairs([("z", ParameterValue::Scalar(1.0))]);
        assert_eq!(
            table().translate(&ps, &Globals::new()).unwrap_err(),
            TranslationError::UnknownParameter("z".to_string())
        );
    }

    #[test]
    fn test_reverse_skips_absent_native_names() {
        let native = ParameterSpace::from_pairs([("B", ParameterValue::Scalar(2000.0))]);
        let logical = table().reverse_translate(&native, &Globals::new()).unwrap();
        assert_eq!(logical.names(), &["b".to_string()]);
        assert_eq!(logical.get("b").and_then(ParameterValue::as_scalar), Some(2.0));
    }

    #[test]
    fn test_globals_visible_to_expressions() {
        let table = build_translations(&[TranslationSpec::expression(
            "delay",
            "delay_steps",
            "delay / dt",
            "delay_steps * dt",
        )])
        .unwrap();
        let globals = Globals::new().with("dt", 0.1);
        let mut native = table
            .translate(
                &ParameterSpace::from_pairs([("delay", ParameterValue::Scalar(1.5))]),
                &globals,
            )
            .unwrap();
        native.evaluate(true).unwrap();
        let steps = native.get("delay_steps").and_then(ParameterValue::as_scalar).unwrap();
        assert!((steps - 15.0).abs() < 1e-9);
        assert_eq!(table.reverse_dependencies("delay").unwrap(), vec!["delay_steps"]);
    }

    #[test]
    fn test_reverse_dependencies() {
        let t = table();
        assert_eq!(t.reverse_dependencies("a").unwrap(), vec!["A"]);
        assert_eq!(t.reverse_dependencies("c").unwrap(), vec!["A", "C"]);
        assert!(t.reverse_dependencies("q").is_err());
    }

    #[test]
    fn test_describe_lists_every_rule() {
        let text = table().describe();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("b -> B [Real]: B = b * 1000; b = B / 1000"));
        assert!(text.contains("C = c + a"));
    }

    #[test]
    fn test_scaled_pair_uses_both_factors() {
        let t = build_translations(&[TranslationSpec::scaled_pair("v", "V", 1e-3, 1e3)]).unwrap();
        let native = ParameterSpace::from_pairs([("V", ParameterValue::Scalar(0.002))]);
        let logical = t.reverse_translate(&native, &Globals::new()).unwrap();
        let v = logical.get("v").and_then(ParameterValue::as_scalar).unwrap();
        assert!((v - 2.0).abs() < 1e-12);
        assert_eq!(t.scaled_parameters(), vec!["v"]);
    }

    #[test]
    fn test_repeated_name_replaces_rule() {
        let t = build_translations(&[
            TranslationSpec::identity("a", "A"),
            TranslationSpec::scaled("a", "A2", 2.0).with_type(DeclaredType::Integer),
        ])
        .unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.native_name("a"), Some("A2"));
        assert_eq!(t.rule("a").map(|r| r.declared_type), Some(DeclaredType::Integer));
    }
}

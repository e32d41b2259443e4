// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Synapse Types
//!
//! A synapse type lists its parameters with the physical quantity each one
//! carries. The quantity, the backend's [`UnitSystem`] and the postsynaptic
//! weight dimension together decide every unit conversion, so the whole
//! logical ↔ native mapping of a projection is one [`TranslationTable`]:
//!
//! | Quantity        | Native value                                   |
//! |-----------------|------------------------------------------------|
//! | `Weight`        | scaled to the backend's current/conductance/voltage unit |
//! | `Time`          | scaled to the backend's time unit              |
//! | `Delay`         | time unit, or `round(delay / dt)` steps        |
//! | `Dimensionless` | unchanged                                      |
//!
//! Equation templates use `{syn_var}` for the postsynaptic variable the
//! receptor drives; it is substituted once per connectivity object.

use crate::error::{ProjectionError, ProjectionResult};
use neurobridge_backend::{SynapseEquations, SynapseVariable};
use neurobridge_parameters::{
    build_translations, DeclaredType, DelayEncoding, Dimension, ParameterSpace, ParameterValue,
    TranslationError, TranslationSpec, TranslationTable, Unit, UnitSystem,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Physical quantity of a synapse parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantity {
    Weight,
    Delay,
    Time,
    Dimensionless,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    pub logical_name: String,
    pub native_name: String,
    pub quantity: Quantity,
    pub default: f64,
    /// Explicit (forward, reverse) expressions, replacing the unit conversion
    pub expressions: Option<(String, String)>,
}

impl ParameterDefinition {
    pub fn new(logical: &str, native: &str, quantity: Quantity, default: f64) -> Self {
        Self {
            logical_name: logical.to_string(),
            native_name: native.to_string(),
            quantity,
            default,
            expressions: None,
        }
    }

    pub fn computed(mut self, forward: &str, reverse: &str) -> Self {
        self.expressions = Some((forward.to_string(), reverse.to_string()));
        self
    }

    fn translation(
        &self,
        units: &UnitSystem,
        weight_dimension: Dimension,
        delay_encoding: DelayEncoding,
    ) -> ProjectionResult<TranslationSpec> {
        let (logical, native) = (self.logical_name.as_str(), self.native_name.as_str());
        if let Some((forward, reverse)) = &self.expressions {
            return Ok(TranslationSpec::expression(logical, native, forward, reverse));
        }
        let dimension = match (self.quantity, delay_encoding) {
            (Quantity::Weight, _) => weight_dimension,
            (Quantity::Delay, DelayEncoding::Steps) => {
                return Ok(TranslationSpec::expression(
                    logical,
                    native,
                    format!("round({logical} / dt)"),
                    format!("{native} * dt"),
                )
                .with_type(DeclaredType::Integer))
            }
            (Quantity::Delay, DelayEncoding::Time) | (Quantity::Time, _) => Dimension::Time,
            (Quantity::Dimensionless, _) => Dimension::Dimensionless,
        };
        let factor = UnitSystem::logical()
            .factor_to(units, dimension)
            .map_err(TranslationError::from)?;
        Ok(if factor == 1.0 {
            TranslationSpec::identity(logical, native)
        } else {
            TranslationSpec::scaled(logical, native, factor)
        })
    }
}

/// Equation text with `{syn_var}` placeholders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquationTemplate {
    /// Per-edge state: (native name, quantity)
    pub variables: Vec<(String, Quantity)>,
    pub on_pre: Vec<String>,
    pub on_post: Vec<String>,
}

/// Pair-based STDP timing rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikePairRule {
    pub tau_plus: f64,
    pub tau_minus: f64,
    pub a_plus: f64,
    pub a_minus: f64,
}

impl Default for SpikePairRule {
    fn default() -> Self {
        Self {
            tau_plus: 20.0,
            tau_minus: 20.0,
            a_plus: 0.01,
            a_minus: 0.01,
        }
    }
}

/// Weight changes independent of the current weight, clipped to bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdditiveWeightDependence {
    pub w_min: f64,
    pub w_max: f64,
}

impl Default for AdditiveWeightDependence {
    fn default() -> Self {
        Self {
            w_min: 0.0,
            w_max: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynapseType {
    name: String,
    model_name: String,
    definitions: Vec<ParameterDefinition>,
    parameters: ParameterSpace,
    initial_conditions: BTreeMap<String, f64>,
    template: EquationTemplate,
    /// receptor type → postsynaptic cell parameter copied into `tau_syn`
    tau_syn_sources: BTreeMap<String, String>,
    dendritic_delay_fraction: f64,
}

impl SynapseType {
    /// A synapse type with its defaults as parameter values
    pub fn new(
        name: impl Into<String>,
        model_name: impl Into<String>,
        definitions: Vec<ParameterDefinition>,
        template: EquationTemplate,
    ) -> Self {
        let mut parameters = ParameterSpace::new();
        for def in &definitions {
            parameters.insert(def.logical_name.clone(), ParameterValue::Scalar(def.default));
        }
        Self {
            name: name.into(),
            model_name: model_name.into(),
            definitions,
            parameters,
            initial_conditions: BTreeMap::new(),
            template,
            tau_syn_sources: BTreeMap::new(),
            dendritic_delay_fraction: 1.0,
        }
    }

    pub fn with_initial_condition(mut self, name: &str, value: f64) -> Self {
        self.initial_conditions.insert(name.to_string(), value);
        self
    }

    pub fn with_tau_syn_source(mut self, receptor: &str, cell_parameter: &str) -> Self {
        self.tau_syn_sources
            .insert(receptor.to_string(), cell_parameter.to_string());
        self
    }

    pub fn with_dendritic_delay_fraction(mut self, fraction: f64) -> Self {
        self.dendritic_delay_fraction = fraction;
        self
    }

    /// Override a default; the name must be one of the type's parameters
    pub fn with_parameter(mut self, name: &str, value: ParameterValue) -> ProjectionResult<Self> {
        self.set_parameter(name, value)?;
        Ok(self)
    }

    pub fn set_parameter(&mut self, name: &str, value: ParameterValue) -> ProjectionResult<()> {
        if !self.has_parameter(name) {
            return Err(ProjectionError::UnknownParameter(name.to_string()));
        }
        self.parameters.insert(name, value);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn definitions(&self) -> &[ParameterDefinition] {
        &self.definitions
    }

    pub fn parameter_space(&self) -> &ParameterSpace {
        &self.parameters
    }

    pub fn initial_conditions(&self) -> &BTreeMap<String, f64> {
        &self.initial_conditions
    }

    pub fn tau_syn_source(&self, receptor: &str) -> Option<&str> {
        self.tau_syn_sources.get(receptor).map(String::as_str)
    }

    pub fn has_tau_syn_sources(&self) -> bool {
        !self.tau_syn_sources.is_empty()
    }

    pub fn dendritic_delay_fraction(&self) -> f64 {
        self.dendritic_delay_fraction
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.logical_name == name)
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.logical_name.as_str()).collect()
    }

    /// The translation table for one backend and postsynaptic response type
    pub fn translations(
        &self,
        units: &UnitSystem,
        weight_dimension: Dimension,
        delay_encoding: DelayEncoding,
    ) -> ProjectionResult<TranslationTable> {
        let specs = self
            .definitions
            .iter()
            .map(|d| d.translation(units, weight_dimension, delay_encoding))
            .collect::<ProjectionResult<Vec<_>>>()?;
        Ok(build_translations(&specs)?)
    }

    /// Equations with the postsynaptic variable filled in
    pub fn equations(
        &self,
        syn_var: &str,
        units: &UnitSystem,
        weight_dimension: Dimension,
        delay_encoding: DelayEncoding,
    ) -> SynapseEquations {
        let unit_of = |quantity: Quantity| -> Unit {
            match (quantity, delay_encoding) {
                (Quantity::Weight, _) => units.unit_for(weight_dimension),
                (Quantity::Delay, DelayEncoding::Steps) | (Quantity::Dimensionless, _) => {
                    Unit::DIMENSIONLESS
                }
                (Quantity::Delay, DelayEncoding::Time) | (Quantity::Time, _) => units.time,
            }
        };
        let substitute = |lines: &[String]| -> Vec<String> {
            lines.iter().map(|l| l.replace("{syn_var}", syn_var)).collect()
        };
        SynapseEquations {
            variables: self
                .template
                .variables
                .iter()
                .map(|(name, quantity)| SynapseVariable {
                    name: name.clone(),
                    unit: unit_of(*quantity),
                })
                .collect(),
            on_pre: substitute(&self.template.on_pre),
            on_post: substitute(&self.template.on_post),
        }
    }

    pub fn describe(&self) -> String {
        let mut out = format!("{} (native model '{}')\n", self.name, self.model_name);
        for def in &self.definitions {
            let value = match self.parameters.get(&def.logical_name) {
                Some(ParameterValue::Scalar(v)) => v.to_string(),
                Some(ParameterValue::Array(values)) => format!("array of {}", values.len()),
                Some(_) => "lazy".to_string(),
                None => "unset".to_string(),
            };
            let _ = writeln!(
                out,
                "  {} ({:?}) -> {}: {}",
                def.logical_name, def.quantity, def.native_name, value
            );
        }
        out
    }

    // -----------------------------------------------------------------------
    // Presets
    // -----------------------------------------------------------------------

    /// Fixed weight and delay
    pub fn static_synapse() -> Self {
        Self::new(
            "StaticSynapse",
            "static_synapse",
            vec![
                ParameterDefinition::new("weight", "weight", Quantity::Weight, 0.0),
                ParameterDefinition::new("delay", "delay", Quantity::Delay, 1.0),
            ],
            EquationTemplate {
                variables: vec![("weight".to_string(), Quantity::Weight)],
                on_pre: vec!["{syn_var} += weight".to_string()],
                on_post: Vec::new(),
            },
        )
    }

    /// Short-term depression and facilitation
    pub fn tsodyks_markram() -> Self {
        Self::new(
            "TsodyksMarkramSynapse",
            "tsodyks2_synapse",
            vec![
                ParameterDefinition::new("weight", "weight", Quantity::Weight, 0.0),
                ParameterDefinition::new("delay", "delay", Quantity::Delay, 1.0),
                ParameterDefinition::new("U", "U", Quantity::Dimensionless, 0.5),
                ParameterDefinition::new("tau_rec", "tau_rec", Quantity::Time, 100.0),
                ParameterDefinition::new("tau_facil", "tau_fac", Quantity::Time, 0.0),
            ],
            EquationTemplate {
                variables: vec![
                    ("weight".to_string(), Quantity::Weight),
                    ("U".to_string(), Quantity::Dimensionless),
                    ("tau_rec".to_string(), Quantity::Time),
                    ("tau_fac".to_string(), Quantity::Time),
                    ("tau_syn".to_string(), Quantity::Time),
                    ("u".to_string(), Quantity::Dimensionless),
                    ("x".to_string(), Quantity::Dimensionless),
                ],
                on_pre: vec![
                    "u = U + (u - U) * exp(-(t - lastupdate) / tau_fac)".to_string(),
                    "x = 1 + (x - 1) * exp(-(t - lastupdate) / tau_rec)".to_string(),
                    "{syn_var} += weight * u * x".to_string(),
                    "x -= u * x".to_string(),
                    "u += U * (1 - u)".to_string(),
                ],
                on_post: Vec::new(),
            },
        )
        .with_initial_condition("u", 0.0)
        .with_initial_condition("x", 1.0)
        .with_tau_syn_source("excitatory", "tau_syn_E")
        .with_tau_syn_source("inhibitory", "tau_syn_I")
    }

    /// Pair-based additive STDP
    pub fn stdp(timing: SpikePairRule, weights: AdditiveWeightDependence) -> Self {
        Self::new(
            "STDPMechanism",
            "stdp_synapse",
            vec![
                ParameterDefinition::new("weight", "weight", Quantity::Weight, 0.0),
                ParameterDefinition::new("delay", "delay", Quantity::Delay, 1.0),
                ParameterDefinition::new("tau_plus", "tau_plus", Quantity::Time, timing.tau_plus),
                ParameterDefinition::new("tau_minus", "tau_minus", Quantity::Time, timing.tau_minus),
                ParameterDefinition::new("A_plus", "lambda", Quantity::Dimensionless, timing.a_plus),
                ParameterDefinition::new("A_minus", "alpha", Quantity::Dimensionless, timing.a_minus)
                    .computed("A_minus / A_plus", "alpha * lambda"),
                ParameterDefinition::new("w_min", "Wmin", Quantity::Weight, weights.w_min),
                ParameterDefinition::new("w_max", "Wmax", Quantity::Weight, weights.w_max),
            ],
            EquationTemplate {
                variables: vec![
                    ("weight".to_string(), Quantity::Weight),
                    ("tau_plus".to_string(), Quantity::Time),
                    ("tau_minus".to_string(), Quantity::Time),
                    ("lambda".to_string(), Quantity::Dimensionless),
                    ("alpha".to_string(), Quantity::Dimensionless),
                    ("Wmin".to_string(), Quantity::Weight),
                    ("Wmax".to_string(), Quantity::Weight),
                ],
                on_pre: vec![
                    "{syn_var} += weight".to_string(),
                    "P += lambda".to_string(),
                    "weight = clip(weight - alpha * lambda * M * Wmax, Wmin, Wmax)".to_string(),
                ],
                on_post: vec![
                    "M += 1".to_string(),
                    "weight = clip(weight + lambda * P * Wmax, Wmin, Wmax)".to_string(),
                ],
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurobridge_parameters::{Globals, Value};

    fn forward(table: &TranslationTable, name: &str, value: f64, dt: f64) -> f64 {
        let ps = ParameterSpace::from_pairs([(name, ParameterValue::Scalar(value))]);
        let mut native = table.translate(&ps, &Globals::new().with("dt", dt)).unwrap();
        native.evaluate(true).unwrap();
        let native_name = table.native_name(name).unwrap();
        match native.value(native_name).unwrap() {
            Value::Scalar(v) => v,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_weight_units_follow_response() {
        let syn = SynapseType::static_synapse();
        let si = UnitSystem::si();
        let current = syn.translations(&si, Dimension::Current, DelayEncoding::Time).unwrap();
        assert!((forward(&current, "weight", 2.0, 0.1) - 2e-9).abs() < 1e-21);
        let conductance = syn
            .translations(&si, Dimension::Conductance, DelayEncoding::Time)
            .unwrap();
        assert!((forward(&conductance, "weight", 2.0, 0.1) - 2e-6).abs() < 1e-18);
        let voltage = syn.translations(&si, Dimension::Voltage, DelayEncoding::Time).unwrap();
        assert!((forward(&voltage, "weight", 2.0, 0.1) - 2e-3).abs() < 1e-15);
    }

    #[test]
    fn test_delay_in_steps() {
        let table = SynapseType::static_synapse()
            .translations(&UnitSystem::si(), Dimension::Current, DelayEncoding::Steps)
            .unwrap();
        assert_eq!(forward(&table, "delay", 1.5, 0.1), 15.0);
        assert_eq!(table.rule("delay").map(|r| r.declared_type), Some(DeclaredType::Integer));
    }

    #[test]
    fn test_nest_units_and_identity_rules() {
        let table = SynapseType::tsodyks_markram()
            .translations(&UnitSystem::nest(), Dimension::Current, DelayEncoding::Time)
            .unwrap();
        assert_eq!(table.simple_parameters(), vec!["delay", "U", "tau_rec", "tau_facil"]);
        assert_eq!(table.scaled_parameters(), vec!["weight"]);
        assert_eq!(table.native_name("tau_facil"), Some("tau_fac"));
        assert!((forward(&table, "weight", 0.5, 0.1) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_stdp_computed_alpha() {
        let syn = SynapseType::stdp(
            SpikePairRule {
                a_plus: 0.01,
                a_minus: 0.012,
                ..SpikePairRule::default()
            },
            AdditiveWeightDependence::default(),
        );
        let table = syn
            .translations(&UnitSystem::nest(), Dimension::Conductance, DelayEncoding::Time)
            .unwrap();
        assert_eq!(table.computed_parameters(), vec!["A_minus"]);
        let mut native = table.translate(syn.parameter_space(), &Globals::new()).unwrap();
        native.evaluate(true).unwrap();
        assert!((native.value("alpha").unwrap().at(0).unwrap() - 1.2).abs() < 1e-12);
        assert!((native.value("Wmax").unwrap().at(0).unwrap() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_equations_substitute_and_type_units() {
        let eqs = SynapseType::static_synapse().equations(
            "g_exc",
            &UnitSystem::si(),
            Dimension::Conductance,
            DelayEncoding::Steps,
        );
        assert_eq!(eqs.on_pre, vec!["g_exc += weight"]);
        assert_eq!(eqs.variable("weight").map(|v| v.unit), Some(Unit::SIEMENS));
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let err = SynapseType::static_synapse()
            .with_parameter("tau_rec", ParameterValue::Scalar(1.0))
            .unwrap_err();
        assert_eq!(err, ProjectionError::UnknownParameter("tau_rec".to_string()));
    }

    #[test]
    fn test_describe() {
        let text = SynapseType::static_synapse()
            .with_parameter("weight", ParameterValue::Scalar(0.25))
            .unwrap()
            .describe();
        assert!(text.starts_with("StaticSynapse (native model 'static_synapse')"));
        assert!(text.contains("weight (Weight) -> weight: 0.25"));
    }
}

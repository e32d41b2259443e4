// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Backend adapter traits
//!
//! The translation layer talks to a simulator through two traits:
//! - [`Backend`]: creates connectivity objects, answers model defaults, and
//!   advertises the time step, unit system and delay encoding
//! - [`Connectivity`]: one sub-population pair's edges and per-edge values,
//!   always in the backend's native units and names

use crate::error::BackendResult;
use ndarray::Array1;
use neurobridge_parameters::{DelayEncoding, ParameterSpace, Unit, UnitSystem};
use neurobridge_populations::Population;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

/// A native default value as reported by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NativeValue {
    Real(f64),
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl NativeValue {
    /// Numeric view; booleans map to 0/1, text has none
    pub fn as_real(&self) -> Option<f64> {
        match self {
            NativeValue::Real(v) => Some(*v),
            NativeValue::Integer(v) => Some(*v as f64),
            NativeValue::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            NativeValue::Text(_) => None,
        }
    }
}

/// A per-edge state variable and the unit it is stored in
#[derive(Debug, Clone, PartialEq)]
pub struct SynapseVariable {
    pub name: String,
    pub unit: Unit,
}

/// Typed synapse model description handed to equation-based backends
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynapseEquations {
    pub variables: Vec<SynapseVariable>,
    /// Statements run on a presynaptic spike
    pub on_pre: Vec<String>,
    /// Statements run on a postsynaptic spike
    pub on_post: Vec<String>,
}

impl SynapseEquations {
    pub fn variable(&self, name: &str) -> Option<&SynapseVariable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Everything a backend needs to create one connectivity object
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivitySpec {
    pub model_name: String,
    pub equations: SynapseEquations,
    /// Homogeneous native defaults, used for every new edge
    pub defaults: BTreeMap<String, f64>,
}

/// Edge storage for one (pre leaf, post leaf) pair
pub trait Connectivity {
    /// Add one edge per presynaptic index, all onto `post`
    ///
    /// Returns the rows of the new edges. New edges start at the defaults
    /// the object was created with.
    fn connect(&mut self, pre: &[usize], post: usize) -> BackendResult<Range<usize>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn attribute_names(&self) -> Vec<String>;

    fn get_attribute(&self, name: &str) -> BackendResult<Array1<f64>>;

    /// Replace a whole column; `values` must have one entry per edge
    fn set_attribute(&mut self, name: &str, values: &Array1<f64>) -> BackendResult<()>;

    fn attribute_at(&self, name: &str, edge: usize) -> BackendResult<f64>;

    fn set_attribute_at(&mut self, name: &str, edge: usize, value: f64) -> BackendResult<()>;

    /// (pre, post) base-population indices of one edge
    fn endpoints(&self, edge: usize) -> BackendResult<(usize, usize)>;

    /// Base-population index of each edge's source
    fn presynaptic_indices(&self) -> Vec<usize>;

    /// Base-population index of each edge's target
    fn postsynaptic_indices(&self) -> Vec<usize>;

    fn has_edge(&self, pre: usize, post: usize) -> bool;
}

/// A simulation backend
pub trait Backend {
    type Connectivity: Connectivity;

    fn name(&self) -> &'static str;

    /// Simulation time step in ms
    fn time_step(&self) -> f64;

    fn unit_system(&self) -> UnitSystem;

    fn delay_encoding(&self) -> DelayEncoding;

    fn create_connectivity(
        &mut self,
        pre: &Population,
        post: &Population,
        spec: &ConnectivitySpec,
    ) -> BackendResult<Self::Connectivity>;

    /// Defaults of a native synapse model
    fn model_defaults(&self, model_name: &str) -> BackendResult<BTreeMap<String, NativeValue>>;

    /// Called once per postsynaptic leaf before any edge is created
    fn prepare_post_population(
        &mut self,
        _post: &Population,
        _native_parameters: &ParameterSpace,
    ) -> BackendResult<()> {
        Ok(())
    }
}

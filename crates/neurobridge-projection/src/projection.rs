// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Projection
//!
//! A set of synapses from one cell group onto another, stored in the
//! backend as one connectivity object per (pre leaf, post leaf) pair.
//!
//! ## Writing
//! Connectors hand [`Projection::convergent_connect`] a list of presynaptic
//! logical indices, one postsynaptic logical index and logical parameter
//! values. The builder partitions the sources by leaf, rounds delays to the
//! time step, translates to native names and units, and writes one row per
//! edge.
//!
//! ## Reading
//! [`Projection::get`] reads native columns back, reverse-translates them and
//! returns logical values, either column-wise or as one row per connection.
//! `presynaptic_index` and `postsynaptic_index` are structural pseudo
//! attributes answered in the projection's own logical index space.

use crate::connection::Connection;
use crate::connector::Connector;
use crate::error::{ProjectionError, ProjectionResult};
use crate::synapse_types::SynapseType;
use ndarray::Array1;
use neurobridge_backend::{Backend, BackendError, Connectivity, ConnectivitySpec};
use neurobridge_parameters::{
    Dimension, Globals, ParameterSpace, ParameterValue, Transform, TranslationError,
    TranslationTable, UnitSystem, Value,
};
use neurobridge_populations::{CellGroup, Partition, Population, SynapticResponse};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const PRESYNAPTIC_INDEX: &str = "presynaptic_index";
pub const POSTSYNAPTIC_INDEX: &str = "postsynaptic_index";

/// Whether more than one edge may join the same cell pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultapsePolicy {
    #[default]
    Allow,
    Reject,
}

/// Smallest and largest delay, in ms, the simulation can deliver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayBounds {
    pub min: f64,
    pub max: f64,
}

impl DelayBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Inclusive, with a little slack for delays rounded to the time step
    pub fn contains(&self, delay: f64) -> bool {
        let slack = 1e-9 * self.max.abs().max(1.0);
        delay >= self.min - slack && delay <= self.max + slack
    }

    fn check(&self, delay: f64) -> ProjectionResult<()> {
        if self.contains(delay) {
            Ok(())
        } else {
            Err(ProjectionError::DelayOutOfRange {
                delay,
                min: self.min,
                max: self.max,
            })
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionOptions {
    /// Defaults to `"<pre> → <post>"`
    pub label: Option<String>,
    pub multapses: MultapsePolicy,
    /// Unbounded when `None`
    pub delay_bounds: Option<DelayBounds>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    /// One array per requested name
    Array,
    /// One row per connection, values in request order
    List,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attributes {
    Arrays(Vec<Array1<f64>>),
    List(Vec<Vec<f64>>),
}

/// Round a delay to the nearest multiple of `dt`, ties to even
pub fn round_delay(delay: f64, dt: f64) -> f64 {
    (delay / dt).round_ties_even() * dt
}

pub struct Projection<B: Backend> {
    label: String,
    pre: CellGroup,
    post: CellGroup,
    synapse_type: SynapseType,
    receptor_type: String,
    units: UnitSystem,
    time_step: f64,
    translations: TranslationTable,
    globals: Globals,
    multapses: MultapsePolicy,
    delay_bounds: Option<DelayBounds>,
    /// `[pre leaf][post leaf]`
    connectivity: Vec<Vec<B::Connectivity>>,
    n_connections: usize,
    /// Native names the backend has no column for
    dropped: BTreeSet<String>,
}

impl<B: Backend> Projection<B> {
    /// Create the connectivity objects and let `connector` fill them
    ///
    /// # Errors
    /// - `Unsupported` if the postsynaptic leaves mix synaptic response types
    /// - `UnknownReceptor` if a postsynaptic cell type lacks `receptor_type`
    /// - translation, backend and connector errors as they occur
    pub fn new<C: Connector>(
        backend: &mut B,
        pre: CellGroup,
        post: CellGroup,
        connector: &C,
        synapse_type: SynapseType,
        receptor_type: &str,
        options: ProjectionOptions,
    ) -> ProjectionResult<Self> {
        let pre_leaves = pre.sub_populations();
        let post_leaves = post.sub_populations();
        let response = homogeneous_response(&post_leaves)?;
        let syn_vars = post_leaves
            .iter()
            .map(|leaf| {
                let cell_type = leaf.cell_type();
                cell_type
                    .synaptic_variable(receptor_type)
                    .map(str::to_string)
                    .ok_or_else(|| ProjectionError::UnknownReceptor {
                        receptor: receptor_type.to_string(),
                        cell_type: cell_type.name().to_string(),
                    })
            })
            .collect::<ProjectionResult<Vec<_>>>()?;

        let weight_dimension = response.weight_dimension();
        let units = backend.unit_system();
        let delay_encoding = backend.delay_encoding();
        let time_step = backend.time_step();
        let translations = synapse_type.translations(&units, weight_dimension, delay_encoding)?;
        let globals = Globals::new().with("dt", time_step);

        let native = translations.translate(synapse_type.parameter_space(), &globals)?;
        let defaults = homogeneous_defaults(&native)?;
        for leaf in &post_leaves {
            backend.prepare_post_population(leaf, &native)?;
        }

        let mut connectivity = Vec::with_capacity(pre_leaves.len());
        for pre_leaf in &pre_leaves {
            let mut row = Vec::with_capacity(post_leaves.len());
            for (post_leaf, syn_var) in post_leaves.iter().zip(&syn_vars) {
                let spec = ConnectivitySpec {
                    model_name: synapse_type.model_name().to_string(),
                    equations: synapse_type.equations(
                        syn_var,
                        &units,
                        weight_dimension,
                        delay_encoding,
                    ),
                    defaults: defaults.clone(),
                };
                row.push(backend.create_connectivity(pre_leaf, post_leaf, &spec)?);
            }
            connectivity.push(row);
        }

        let label = options
            .label
            .unwrap_or_else(|| format!("{} → {}", pre.label(), post.label()));
        info!(
            target: "neurobridge-projection",
            "[PROJECTION] '{}' on {}: {} {} x {} connectivity objects, receptor '{}'",
            label,
            backend.name(),
            synapse_type.name(),
            pre_leaves.len(),
            post_leaves.len(),
            receptor_type
        );

        let mut projection = Self {
            label,
            pre,
            post,
            synapse_type,
            receptor_type: receptor_type.to_string(),
            units,
            time_step,
            translations,
            globals,
            multapses: options.multapses,
            delay_bounds: options.delay_bounds,
            connectivity,
            n_connections: 0,
            dropped: BTreeSet::new(),
        };
        connector.connect(&mut projection)?;
        if projection.synapse_type.has_tau_syn_sources() {
            projection.copy_tau_syn_from_post()?;
        }
        debug!(
            target: "neurobridge-projection",
            "[PROJECTION] '{}' holds {} connections",
            projection.label,
            projection.n_connections
        );
        Ok(projection)
    }

    // -----------------------------------------------------------------------
    // Connectivity builder
    // -----------------------------------------------------------------------

    /// Connect every cell in `presynaptic_indices` to `postsynaptic_index`
    ///
    /// `parameters` holds logical values, either one per connection or a
    /// single value for all of them. Values are translated before anything
    /// is connected, so a failing translation leaves the projection as it
    /// was.
    pub fn convergent_connect(
        &mut self,
        presynaptic_indices: &[usize],
        postsynaptic_index: usize,
        mut parameters: ParameterSpace,
    ) -> ProjectionResult<()> {
        parameters.remove("dendritic_delay_fraction");
        let partitions = self.pre.partition(presynaptic_indices)?;
        let (post_leaf, post_local) = self.post.localize(postsynaptic_index)?;
        if self.multapses == MultapsePolicy::Reject {
            self.check_new_pairs(
                &partitions,
                presynaptic_indices,
                post_leaf,
                post_local,
                postsynaptic_index,
            )?;
        }
        let native = self.native_values(parameters, presynaptic_indices.len())?;

        for (pre_leaf, partition) in partitions.iter().enumerate() {
            if partition.is_empty() {
                continue;
            }
            let conn = &mut self.connectivity[pre_leaf][post_leaf];
            let rows = conn.connect(&partition.local, post_local)?;
            self.n_connections += partition.len();
            let columns = conn.attribute_names();
            for (name, value) in &native {
                if !columns.contains(name) {
                    if self.dropped.insert(name.clone()) {
                        warn!(
                            target: "neurobridge-projection",
                            "[PROJECTION] '{}': backend has no attribute '{}', values dropped",
                            self.label,
                            name
                        );
                    }
                    continue;
                }
                for (row, &position) in rows.clone().zip(&partition.positions) {
                    let v = value.at(position).ok_or_else(|| ProjectionError::ShapeMismatch {
                        name: name.clone(),
                        expected: presynaptic_indices.len(),
                        actual: value.as_array().map_or(1, |a| a.len()),
                    })?;
                    conn.set_attribute_at(name, row, v)?;
                }
            }
            for (name, &v) in self.synapse_type.initial_conditions() {
                if columns.contains(name) {
                    for row in rows.clone() {
                        conn.set_attribute_at(name, row, v)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn check_new_pairs(
        &self,
        partitions: &[Partition],
        presynaptic_indices: &[usize],
        post_leaf: usize,
        post_local: usize,
        postsynaptic_index: usize,
    ) -> ProjectionResult<()> {
        for (pre_leaf, partition) in partitions.iter().enumerate() {
            let conn = &self.connectivity[pre_leaf][post_leaf];
            let mut seen = HashSet::with_capacity(partition.len());
            for (&local, &position) in partition.local.iter().zip(&partition.positions) {
                if !seen.insert(local) || conn.has_edge(local, post_local) {
                    return Err(ProjectionError::DuplicateConnection {
                        pre: presynaptic_indices[position],
                        post: postsynaptic_index,
                    });
                }
            }
        }
        Ok(())
    }

    /// Logical values for `n` connections → evaluated native values
    fn native_values(
        &self,
        mut parameters: ParameterSpace,
        n: usize,
    ) -> ProjectionResult<Vec<(String, Value)>> {
        parameters.set_shape(n);
        parameters.evaluate(true)?;
        if parameters.contains("delay") {
            let dt = self.time_step;
            parameters.map_values("delay", |d| round_delay(d, dt))?;
            if let Some(bounds) = self.delay_bounds {
                match parameters.value("delay")? {
                    Value::Scalar(delay) => bounds.check(delay)?,
                    Value::Array(delays) => {
                        for &delay in delays.iter() {
                            bounds.check(delay)?;
                        }
                    }
                }
            }
        }
        let mut native = self.translations.translate(&parameters, &self.globals)?;
        native.evaluate(true)?;
        native
            .names()
            .iter()
            .map(|name| Ok((name.clone(), native.value(name)?)))
            .collect()
    }

    fn copy_tau_syn_from_post(&mut self) -> ProjectionResult<()> {
        self.require_single_pair("copying tau_syn from postsynaptic cells")?;
        let Some(source) = self
            .synapse_type
            .tau_syn_source(&self.receptor_type)
            .map(str::to_string)
        else {
            return Ok(());
        };
        let Some(leaf) = self.post.sub_populations().into_iter().next() else {
            return Ok(());
        };
        let factor = UnitSystem::logical()
            .factor_to(&self.units, Dimension::Time)
            .map_err(TranslationError::from)?;
        let conn = &mut self.connectivity[0][0];
        let values = conn
            .postsynaptic_indices()
            .into_iter()
            .map(|j| leaf.parameter_at(&source, j).map(|v| v * factor))
            .collect::<Result<Vec<_>, _>>()?;
        conn.set_attribute("tau_syn", &Array1::from(values))?;
        debug!(
            target: "neurobridge-projection",
            "[PROJECTION] '{}': tau_syn copied from '{}'",
            self.label,
            source
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Attribute accessor
    // -----------------------------------------------------------------------

    /// Set logical parameters on every connection
    ///
    /// Expression rules that also read other logical parameters are given
    /// their current values.
    pub fn set(&mut self, mut parameters: ParameterSpace) -> ProjectionResult<()> {
        self.require_single_pair("set")?;
        for name in parameters.names().to_vec() {
            if !self.translations.contains(&name) {
                return Err(ProjectionError::UnknownParameter(name));
            }
        }
        for dependency in self.forward_dependencies(&parameters) {
            let current = self.get_as_arrays(&[dependency.as_str()])?;
            if let Some(values) = current.into_iter().next() {
                parameters.insert(dependency, ParameterValue::from(values));
            }
        }
        let n = self.len();
        let native = self.native_values(parameters, n)?;
        let mut space = ParameterSpace::with_shape(n);
        for (name, value) in native {
            space.insert(name, ParameterValue::from(value));
        }
        self.set_attributes(space)
    }

    /// Logical names read by the forward rules of `parameters` but not in it
    fn forward_dependencies(&self, parameters: &ParameterSpace) -> Vec<String> {
        let mut missing = Vec::new();
        for name in parameters.names() {
            let Some(rule) = self.translations.rule(name) else {
                continue;
            };
            if let Transform::Expression(expr) = &rule.forward {
                for free in expr.free_names() {
                    if !parameters.contains(&free)
                        && self.translations.contains(&free)
                        && !missing.contains(&free)
                    {
                        missing.push(free);
                    }
                }
            }
        }
        missing
    }

    /// Write native-named values straight into the backend
    ///
    /// Arrays longer than the number of connections are truncated; shorter
    /// ones fail with `ShapeMismatch`. Every column is checked before any is
    /// written.
    pub fn set_attributes(&mut self, mut native: ParameterSpace) -> ProjectionResult<()> {
        self.require_single_pair("set_attributes")?;
        native.evaluate(true)?;
        let conn = &mut self.connectivity[0][0];
        let n = conn.len();
        let known = conn.attribute_names();
        let mut columns = Vec::with_capacity(native.len());
        for name in native.names() {
            if !known.contains(name) {
                return Err(BackendError::UnknownAttribute(name.clone()).into());
            }
            let values = match native.value(name)? {
                Value::Scalar(v) => Array1::from_elem(n, v),
                Value::Array(values) if values.len() >= n => {
                    Array1::from_iter(values.iter().take(n).copied())
                }
                Value::Array(values) => {
                    return Err(ProjectionError::ShapeMismatch {
                        name: name.clone(),
                        expected: n,
                        actual: values.len(),
                    })
                }
            };
            columns.push((name, values));
        }
        for (name, values) in &columns {
            conn.set_attribute(name, values)?;
        }
        debug!(
            target: "neurobridge-projection",
            "[PROJECTION] '{}': set {} attributes on {} connections",
            self.label,
            columns.len(),
            n
        );
        Ok(())
    }

    /// Logical values of `names`, one array per name
    pub fn get_as_arrays(&self, names: &[&str]) -> ProjectionResult<Vec<Array1<f64>>> {
        self.require_single_pair("get")?;
        let conn = &self.connectivity[0][0];
        names.iter().map(|name| self.read_column(conn, name)).collect()
    }

    /// Logical values of `names`, one row per connection
    pub fn get_as_list(&self, names: &[&str]) -> ProjectionResult<Vec<Vec<f64>>> {
        let columns = self.get_as_arrays(names)?;
        Ok((0..self.len())
            .map(|k| columns.iter().map(|c| c[k]).collect())
            .collect())
    }

    pub fn get(&self, names: &[&str], format: AttributeFormat) -> ProjectionResult<Attributes> {
        Ok(match format {
            AttributeFormat::Array => Attributes::Arrays(self.get_as_arrays(names)?),
            AttributeFormat::List => Attributes::List(self.get_as_list(names)?),
        })
    }

    fn read_column(&self, conn: &B::Connectivity, name: &str) -> ProjectionResult<Array1<f64>> {
        match name {
            PRESYNAPTIC_INDEX => Ok(conn
                .presynaptic_indices()
                .into_iter()
                .map(|base| self.pre.logical_index(0, base).unwrap_or(base) as f64)
                .collect()),
            POSTSYNAPTIC_INDEX => Ok(conn
                .postsynaptic_indices()
                .into_iter()
                .map(|base| self.post.logical_index(0, base).unwrap_or(base) as f64)
                .collect()),
            _ => {
                let n = conn.len();
                let mut native = ParameterSpace::with_shape(n);
                for dependency in self.translations.reverse_dependencies(name)? {
                    let column = conn.get_attribute(&dependency)?;
                    native.insert(dependency, ParameterValue::from(column));
                }
                let mut logical = self.translations.reverse_translate(&native, &self.globals)?;
                logical.evaluate(false)?;
                Ok(logical.value(name)?.broadcast(n))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Single connections
    // -----------------------------------------------------------------------

    /// Every connection, leaf pair by leaf pair
    pub fn connections(&self) -> impl Iterator<Item = Connection> + '_ {
        self.connectivity.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .flat_map(move |(j, conn)| (0..conn.len()).map(move |k| Connection::new(i, j, k)))
        })
    }

    fn edge_store(&self, c: Connection) -> ProjectionResult<&B::Connectivity> {
        self.connectivity
            .get(c.pre_leaf())
            .and_then(|row| row.get(c.post_leaf()))
            .ok_or_else(|| {
                ProjectionError::Unsupported(format!(
                    "connection ({}, {}) is outside '{}'",
                    c.pre_leaf(),
                    c.post_leaf(),
                    self.label
                ))
            })
    }

    pub(crate) fn endpoints(&self, c: Connection) -> ProjectionResult<(usize, usize)> {
        let (pre, post) = self.edge_store(c)?.endpoints(c.index())?;
        Ok((
            self.pre.logical_index(c.pre_leaf(), pre).unwrap_or(pre),
            self.post.logical_index(c.post_leaf(), post).unwrap_or(post),
        ))
    }

    /// Logical value of `name` on one edge
    pub(crate) fn read_edge(&self, c: Connection, name: &str) -> ProjectionResult<f64> {
        let conn = self.edge_store(c)?;
        let mut native = ParameterSpace::new();
        for dependency in self.translations.reverse_dependencies(name)? {
            let v = conn.attribute_at(&dependency, c.index())?;
            native.insert(dependency, ParameterValue::Scalar(v));
        }
        let mut logical = self.translations.reverse_translate(&native, &self.globals)?;
        logical.evaluate(true)?;
        let value = logical.value(name)?;
        value
            .at(0)
            .ok_or_else(|| ProjectionError::UnknownParameter(name.to_string()))
    }

    /// Set the logical value of `name` on one edge
    pub(crate) fn write_edge(&mut self, c: Connection, name: &str, value: f64) -> ProjectionResult<()> {
        let rule = self
            .translations
            .rule(name)
            .ok_or_else(|| ProjectionError::UnknownParameter(name.to_string()))?;
        let native_name = rule.native_name.clone();
        let value = if name == "delay" {
            let delay = round_delay(value, self.time_step);
            if let Some(bounds) = self.delay_bounds {
                bounds.check(delay)?;
            }
            delay
        } else {
            value
        };
        let mut logical = ParameterSpace::from_pairs([(name, ParameterValue::Scalar(value))]);
        for dependency in self.forward_dependencies(&logical) {
            let current = self.read_edge(c, &dependency)?;
            logical.insert(dependency, ParameterValue::Scalar(current));
        }
        let mut native = self.translations.translate(&logical, &self.globals)?;
        native.evaluate(true)?;
        let translated = native
            .value(&native_name)?
            .at(0)
            .ok_or_else(|| ProjectionError::UnknownParameter(name.to_string()))?;
        self.edge_store(c)?;
        self.connectivity[c.pre_leaf()][c.post_leaf()].set_attribute_at(
            &native_name,
            c.index(),
            translated,
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Bulk access needs exactly one connectivity object; a view over an
    /// assembly spans several leaves just like the assembly itself.
    fn require_single_pair(&self, operation: &'static str) -> ProjectionResult<()> {
        if self.pre.leaf_count() > 1 || self.post.leaf_count() > 1 {
            return Err(ProjectionError::NotImplemented(operation));
        }
        Ok(())
    }

    /// Number of connections
    pub fn len(&self) -> usize {
        self.n_connections
    }

    pub fn is_empty(&self) -> bool {
        self.n_connections == 0
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pre(&self) -> &CellGroup {
        &self.pre
    }

    pub fn post(&self) -> &CellGroup {
        &self.post
    }

    pub fn synapse_type(&self) -> &SynapseType {
        &self.synapse_type
    }

    pub fn receptor_type(&self) -> &str {
        &self.receptor_type
    }

    pub fn translations(&self) -> &TranslationTable {
        &self.translations
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn multapses(&self) -> MultapsePolicy {
        self.multapses
    }

    pub fn delay_bounds(&self) -> Option<DelayBounds> {
        self.delay_bounds
    }

    /// Connectivity object between pre leaf `i` and post leaf `j`
    pub fn connectivity(&self, i: usize, j: usize) -> Option<&B::Connectivity> {
        self.connectivity.get(i).and_then(|row| row.get(j))
    }

    pub fn describe(&self) -> String {
        format!(
            "Projection '{}' from {} ({} cells) to {} ({} cells), receptor '{}'\n\
             {} connections\n{}",
            self.label,
            self.pre.label(),
            self.pre.size(),
            self.post.label(),
            self.post.size(),
            self.receptor_type,
            self.n_connections,
            self.synapse_type.describe()
        )
    }
}

fn homogeneous_response(leaves: &[Arc<Population>]) -> ProjectionResult<SynapticResponse> {
    let first = leaves
        .first()
        .ok_or_else(|| ProjectionError::Unsupported("no postsynaptic cells".to_string()))?
        .cell_type()
        .response();
    if leaves.iter().any(|leaf| leaf.cell_type().response() != first) {
        return Err(ProjectionError::Unsupported(
            "postsynaptic cells mix synaptic response types".to_string(),
        ));
    }
    Ok(first)
}

/// Homogeneous native values, used as defaults for new edges
///
/// `tau_minus` belongs to the postsynaptic cells and is left out.
fn homogeneous_defaults(native: &ParameterSpace) -> ProjectionResult<BTreeMap<String, f64>> {
    let mut defaults = BTreeMap::new();
    for (name, value) in native.iter() {
        if name == "tau_minus" || !value.is_homogeneous() {
            continue;
        }
        if let Value::Scalar(v) = value.evaluate(None, name)? {
            defaults.insert(name.to_string(), v);
        }
    }
    Ok(defaults)
}

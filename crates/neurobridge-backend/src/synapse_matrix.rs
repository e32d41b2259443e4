// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Synapse-Matrix Backend
//!
//! Reference adapter for equation-based simulators that keep one sparse
//! synapse matrix per (pre, post) group pair.
//!
//! - Units: coherent SI (s, V, A, S)
//! - Delays: integer numbers of time steps
//! - Columns: the variables declared in the synapse equations, plus `delay`
//!
//! Native synapse models do not exist here; everything is described by
//! equations, so [`Backend::model_defaults`] always fails.

use crate::error::{BackendError, BackendResult};
use crate::storage::EdgeTable;
use crate::traits::{Backend, Connectivity, ConnectivitySpec, NativeValue, SynapseEquations};
use ahash::AHashMap;
use ndarray::Array1;
use neurobridge_parameters::{DelayEncoding, UnitSystem};
use neurobridge_populations::Population;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{debug, trace};

pub struct SynapseMatrixBackend {
    time_step: f64,
    matrices_created: usize,
}

impl SynapseMatrixBackend {
    /// `time_step` in ms
    pub fn new(time_step: f64) -> Self {
        Self {
            time_step,
            matrices_created: 0,
        }
    }

    pub fn matrices_created(&self) -> usize {
        self.matrices_created
    }
}

impl Default for SynapseMatrixBackend {
    fn default() -> Self {
        Self::new(0.1)
    }
}

/// Sparse synapse matrix between two groups
#[derive(Debug, Clone)]
pub struct SynapseMatrix {
    model_name: String,
    equations: SynapseEquations,
    pre_size: usize,
    post_size: usize,
    pre_label: String,
    post_label: String,
    edges: EdgeTable,
    /// (pre, post) → rows, for pair lookups
    pairs: AHashMap<(usize, usize), Vec<usize>>,
}

impl SynapseMatrix {
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn equations(&self) -> &SynapseEquations {
        &self.equations
    }

    /// Rows holding edges from `pre` to `post`, in creation order
    pub fn rows(&self, pre: usize, post: usize) -> &[usize] {
        self.pairs.get(&(pre, post)).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Connectivity for SynapseMatrix {
    fn connect(&mut self, pre: &[usize], post: usize) -> BackendResult<Range<usize>> {
        if post >= self.post_size {
            return Err(BackendError::CellOutOfRange {
                index: post,
                size: self.post_size,
                population: self.post_label.clone(),
            });
        }
        if let Some(&index) = pre.iter().find(|&&i| i >= self.pre_size) {
            return Err(BackendError::CellOutOfRange {
                index,
                size: self.pre_size,
                population: self.pre_label.clone(),
            });
        }
        let rows = self.edges.push_edges(pre, post);
        for (row, &i) in rows.clone().zip(pre) {
            self.pairs.entry((i, post)).or_default().push(row);
        }
        trace!(
            target: "neurobridge-backend",
            "[MATRIX] {} -> {}: +{} synapses onto {}",
            self.pre_label,
            self.post_label,
            pre.len(),
            post
        );
        Ok(rows)
    }

    fn len(&self) -> usize {
        self.edges.len()
    }

    fn attribute_names(&self) -> Vec<String> {
        self.edges.names().to_vec()
    }

    fn get_attribute(&self, name: &str) -> BackendResult<Array1<f64>> {
        self.edges.get(name)
    }

    fn set_attribute(&mut self, name: &str, values: &Array1<f64>) -> BackendResult<()> {
        self.edges.set(name, values)
    }

    fn attribute_at(&self, name: &str, edge: usize) -> BackendResult<f64> {
        self.edges.get_at(name, edge)
    }

    fn set_attribute_at(&mut self, name: &str, edge: usize, value: f64) -> BackendResult<()> {
        self.edges.set_at(name, edge, value)
    }

    fn endpoints(&self, edge: usize) -> BackendResult<(usize, usize)> {
        self.edges.endpoints(edge)
    }

    fn presynaptic_indices(&self) -> Vec<usize> {
        self.edges.sources().to_vec()
    }

    fn postsynaptic_indices(&self) -> Vec<usize> {
        self.edges.targets().to_vec()
    }

    fn has_edge(&self, pre: usize, post: usize) -> bool {
        self.pairs.contains_key(&(pre, post))
    }
}

impl Backend for SynapseMatrixBackend {
    type Connectivity = SynapseMatrix;

    fn name(&self) -> &'static str {
        "synapse-matrix"
    }

    fn time_step(&self) -> f64 {
        self.time_step
    }

    fn unit_system(&self) -> UnitSystem {
        UnitSystem::si()
    }

    fn delay_encoding(&self) -> DelayEncoding {
        DelayEncoding::Steps
    }

    fn create_connectivity(
        &mut self,
        pre: &Population,
        post: &Population,
        spec: &ConnectivitySpec,
    ) -> BackendResult<SynapseMatrix> {
        let columns = spec
            .equations
            .variables
            .iter()
            .map(|v| v.name.clone())
            .chain(std::iter::once("delay".to_string()));
        let defaults = spec.defaults.iter().map(|(k, v)| (k.clone(), *v)).collect();
        self.matrices_created += 1;
        debug!(
            target: "neurobridge-backend",
            "[MATRIX] created '{}' synapses {} -> {} ({} variables)",
            spec.model_name,
            pre.label(),
            post.label(),
            spec.equations.variables.len()
        );
        Ok(SynapseMatrix {
            model_name: spec.model_name.clone(),
            equations: spec.equations.clone(),
            pre_size: pre.size(),
            post_size: post.size(),
            pre_label: pre.label().to_string(),
            post_label: post.label().to_string(),
            edges: EdgeTable::new(columns, defaults),
            pairs: AHashMap::new(),
        })
    }

    fn model_defaults(&self, model_name: &str) -> BackendResult<BTreeMap<String, NativeValue>> {
        Err(BackendError::ModelUnavailable {
            model: model_name.to_string(),
            extensions_loaded: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::SynapseVariable;
    use neurobridge_parameters::Unit;
    use neurobridge_populations::CellType;

    fn spec() -> ConnectivitySpec {
        ConnectivitySpec {
            model_name: "static_synapse".to_string(),
            equations: SynapseEquations {
                variables: vec![SynapseVariable {
                    name: "weight".to_string(),
                    unit: Unit::AMPERE,
                }],
                on_pre: vec!["i_exc += weight".to_string()],
                on_post: Vec::new(),
            },
            defaults: BTreeMap::from([("weight".to_string(), 0.0), ("delay".to_string(), 1.0)]),
        }
    }

    #[test]
    fn test_connect_and_read_indices() {
        let pre = Population::new("pre", 3, CellType::if_curr_exp());
        let post = Population::new("post", 6, CellType::if_curr_exp());
        let mut backend = SynapseMatrixBackend::new(0.1);
        let mut matrix = backend.create_connectivity(&pre, &post, &spec()).unwrap();
        assert_eq!(matrix.connect(&[0, 1, 2], 5).unwrap(), 0..3);
        assert_eq!(matrix.presynaptic_indices(), vec![0, 1, 2]);
        assert_eq!(matrix.postsynaptic_indices(), vec![5, 5, 5]);
        assert_eq!(matrix.attribute_names(), vec!["weight", "delay"]);
        assert_eq!(matrix.get_attribute("delay").unwrap().to_vec(), vec![1.0; 3]);
        assert!(matrix.has_edge(1, 5));
        assert_eq!(backend.matrices_created(), 1);
    }

    #[test]
    fn test_multapses_get_distinct_rows() {
        let pre = Population::new("pre", 2, CellType::if_curr_exp());
        let post = Population::new("post", 2, CellType::if_curr_exp());
        let mut matrix = SynapseMatrixBackend::default()
            .create_connectivity(&pre, &post, &spec())
            .unwrap();
        matrix.connect(&[0], 1).unwrap();
        matrix.connect(&[0], 1).unwrap();
        assert_eq!(matrix.rows(0, 1), &[0, 1]);
    }

    #[test]
    fn test_out_of_range_cells() {
        let pre = Population::new("pre", 2, CellType::if_curr_exp());
        let post = Population::new("post", 2, CellType::if_curr_exp());
        let mut matrix = SynapseMatrixBackend::default()
            .create_connectivity(&pre, &post, &spec())
            .unwrap();
        assert!(matches!(
            matrix.connect(&[0, 2], 0),
            Err(BackendError::CellOutOfRange { index: 2, .. })
        ));
        assert!(matrix.connect(&[0], 2).is_err());
        assert!(matrix.is_empty());
    }

    #[test]
    fn test_no_native_models() {
        assert!(matches!(
            SynapseMatrixBackend::default().model_defaults("stdp_synapse"),
            Err(BackendError::ModelUnavailable { .. })
        ));
    }
}

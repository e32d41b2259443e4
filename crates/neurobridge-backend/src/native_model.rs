// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Native-Model Backend
//!
//! Reference adapter for simulators that ship compiled synapse models with a
//! dictionary of defaults per model.
//!
//! - Units: ms, mV, pA, nS
//! - Delays: ms
//! - Cells carry global node ids; edges are stored as (source id, target id)
//!
//! Creating connectivity copies the model under `<model>_lbl` with the
//! projection's homogeneous defaults, the way a native simulator would before
//! connecting with a customised model.

use crate::error::{BackendError, BackendResult};
use crate::storage::EdgeTable;
use crate::traits::{Backend, Connectivity, ConnectivitySpec, NativeValue};
use ahash::AHashMap;
use ndarray::Array1;
use neurobridge_parameters::{DelayEncoding, ParameterSpace, UnitSystem};
use neurobridge_populations::Population;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{debug, trace};

type ModelDefaults = BTreeMap<String, NativeValue>;

pub struct NativeModelBackend {
    time_step: f64,
    extensions_loaded: bool,
    models: BTreeMap<String, ModelDefaults>,
    extension_models: BTreeMap<String, ModelDefaults>,
    /// `<model>_lbl` → defaults used for the copied model
    registered: BTreeMap<String, BTreeMap<String, f64>>,
    first_ids: AHashMap<String, usize>,
    next_id: usize,
    post_tau_minus: AHashMap<String, f64>,
}

impl NativeModelBackend {
    /// `time_step` in ms; built-in models only
    pub fn new(time_step: f64) -> Self {
        Self {
            time_step,
            extensions_loaded: false,
            models: builtin_models(),
            extension_models: extension_models(),
            registered: BTreeMap::new(),
            first_ids: AHashMap::new(),
            next_id: 1,
            post_tau_minus: AHashMap::new(),
        }
    }

    pub fn with_extensions(mut self, loaded: bool) -> Self {
        self.extensions_loaded = loaded;
        self
    }

    pub fn extensions_loaded(&self) -> bool {
        self.extensions_loaded
    }

    /// Add or replace a model
    pub fn register_model(&mut self, name: impl Into<String>, defaults: ModelDefaults) {
        self.models.insert(name.into(), defaults);
    }

    /// Defaults a copied `<model>_lbl` model was registered with
    pub fn registered_model(&self, label: &str) -> Option<&BTreeMap<String, f64>> {
        self.registered.get(label)
    }

    pub fn post_tau_minus(&self, population: &str) -> Option<f64> {
        self.post_tau_minus.get(population).copied()
    }

    fn lookup(&self, model_name: &str) -> Option<&ModelDefaults> {
        self.models.get(model_name).or_else(|| {
            self.extensions_loaded
                .then(|| self.extension_models.get(model_name))
                .flatten()
        })
    }

    fn first_id(&mut self, population: &Population) -> usize {
        if let Some(&id) = self.first_ids.get(population.label()) {
            return id;
        }
        let id = self.next_id;
        self.next_id += population.size();
        self.first_ids.insert(population.label().to_string(), id);
        id
    }
}

impl Default for NativeModelBackend {
    fn default() -> Self {
        Self::new(0.1)
    }
}

/// Edges of one copied model between two populations
#[derive(Debug, Clone)]
pub struct NativeConnectivity {
    model_label: String,
    pre_first_id: usize,
    post_first_id: usize,
    pre_size: usize,
    post_size: usize,
    edges: EdgeTable,
}

impl NativeConnectivity {
    pub fn model_label(&self) -> &str {
        &self.model_label
    }

    /// (source id, target id) of every edge
    pub fn node_ids(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges
            .sources()
            .iter()
            .copied()
            .zip(self.edges.targets().iter().copied())
    }
}

impl Connectivity for NativeConnectivity {
    fn connect(&mut self, pre: &[usize], post: usize) -> BackendResult<Range<usize>> {
        if post >= self.post_size {
            return Err(BackendError::CellOutOfRange {
                index: post,
                size: self.post_size,
                population: self.model_label.clone(),
            });
        }
        let mut sources = Vec::with_capacity(pre.len());
        for &i in pre {
            if i >= self.pre_size {
                return Err(BackendError::CellOutOfRange {
                    index: i,
                    size: self.pre_size,
                    population: self.model_label.clone(),
                });
            }
            sources.push(self.pre_first_id + i);
        }
        trace!(
            target: "neurobridge-backend",
            "[NATIVE] {}: connect {} sources -> node {}",
            self.model_label,
            sources.len(),
            self.post_first_id + post
        );
        Ok(self.edges.push_edges(&sources, self.post_first_id + post))
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
        let (source, target) = self.edges.endpoints(edge)?;
        Ok((source - self.pre_first_id, target - self.post_first_id))
    }

    fn presynaptic_indices(&self) -> Vec<usize> {
        self.edges.sources().iter().map(|id| id - self.pre_first_id).collect()
    }

    fn postsynaptic_indices(&self) -> Vec<usize> {
        self.edges.targets().iter().map(|id| id - self.post_first_id).collect()
    }

    fn has_edge(&self, pre: usize, post: usize) -> bool {
        self.edges
            .contains_pair(self.pre_first_id + pre, self.post_first_id + post)
    }
}

impl Backend for NativeModelBackend {
    type Connectivity = NativeConnectivity;

    fn name(&self) -> &'static str {
        "native-model"
    }

    fn time_step(&self) -> f64 {
        self.time_step
    }

    fn unit_system(&self) -> UnitSystem {
        UnitSystem::nest()
    }

    fn delay_encoding(&self) -> DelayEncoding {
        DelayEncoding::Time
    }

    fn create_connectivity(
        &mut self,
        pre: &Population,
        post: &Population,
        spec: &ConnectivitySpec,
    ) -> BackendResult<NativeConnectivity> {
        let model = self.lookup(&spec.model_name).ok_or_else(|| BackendError::ModelUnavailable {
            model: spec.model_name.clone(),
            extensions_loaded: self.extensions_loaded,
        })?;

        let mut defaults: BTreeMap<String, f64> = model
            .iter()
            .filter_map(|(k, v)| v.as_real().map(|v| (k.clone(), v)))
            .collect();
        defaults.extend(spec.defaults.iter().map(|(k, v)| (k.clone(), *v)));

        let columns = ["weight", "delay"]
            .into_iter()
            .map(str::to_string)
            .chain(spec.defaults.keys().cloned())
            .chain(spec.equations.variables.iter().map(|v| v.name.clone()));
        let edges = EdgeTable::new(
            columns,
            defaults.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        );

        let model_label = format!("{}_lbl", spec.model_name);
        debug!(
            target: "neurobridge-backend",
            "[NATIVE] registered '{}' for {} -> {} ({} defaults)",
            model_label,
            pre.label(),
            post.label(),
            defaults.len()
        );
        self.registered.insert(model_label.clone(), defaults);

        Ok(NativeConnectivity {
            model_label,
            pre_first_id: self.first_id(pre),
            post_first_id: self.first_id(post),
            pre_size: pre.size(),
            post_size: post.size(),
            edges,
        })
    }

    fn model_defaults(&self, model_name: &str) -> BackendResult<BTreeMap<String, NativeValue>> {
        self.lookup(model_name)
            .cloned()
            .ok_or_else(|| BackendError::ModelUnavailable {
                model: model_name.to_string(),
                extensions_loaded: self.extensions_loaded,
            })
    }

    /// The STDP time constant of the postsynaptic side lives on the cells
    fn prepare_post_population(
        &mut self,
        post: &Population,
        native_parameters: &ParameterSpace,
    ) -> BackendResult<()> {
        let Some(value) = native_parameters.get("tau_minus") else {
            return Ok(());
        };
        if !value.is_homogeneous() {
            return Err(BackendError::InhomogeneousParameter("tau_minus".to_string()));
        }
        let tau_minus = value
            .evaluate(None, "tau_minus")?
            .as_scalar()
            .ok_or_else(|| BackendError::InhomogeneousParameter("tau_minus".to_string()))?;
        self.post_tau_minus.insert(post.label().to_string(), tau_minus);
        Ok(())
    }
}

fn common_defaults(model: &str) -> ModelDefaults {
    BTreeMap::from([
        ("delay".to_string(), NativeValue::Real(1.0)),
        ("weight".to_string(), NativeValue::Real(1.0)),
        ("max_delay".to_string(), NativeValue::Real(f64::NEG_INFINITY)),
        ("min_delay".to_string(), NativeValue::Real(f64::INFINITY)),
        ("num_connections".to_string(), NativeValue::Integer(0)),
        ("receptor_type".to_string(), NativeValue::Integer(0)),
        ("synapse_model".to_string(), NativeValue::Text(model.to_string())),
        ("synapse_modelid".to_string(), NativeValue::Integer(0)),
        ("element_type".to_string(), NativeValue::Text("synapse".to_string())),
        ("has_delay".to_string(), NativeValue::Boolean(true)),
        ("requires_symmetric".to_string(), NativeValue::Boolean(false)),
        ("sizeof".to_string(), NativeValue::Integer(32)),
        ("weight_recorder".to_string(), NativeValue::Integer(-1)),
    ])
}

fn model(name: &str, extra: &[(&str, NativeValue)]) -> (String, ModelDefaults) {
    let mut defaults = common_defaults(name);
    defaults.extend(extra.iter().map(|(k, v)| (k.to_string(), v.clone())));
    (name.to_string(), defaults)
}

fn builtin_models() -> BTreeMap<String, ModelDefaults> {
    BTreeMap::from([
        model("static_synapse", &[]),
        model(
            "stdp_synapse",
            &[
                ("alpha", NativeValue::Real(1.0)),
                ("lambda", NativeValue::Real(0.01)),
                ("mu_minus", NativeValue::Real(1.0)),
                ("mu_plus", NativeValue::Real(1.0)),
                ("tau_plus", NativeValue::Real(20.0)),
                ("Wmax", NativeValue::Real(100.0)),
            ],
        ),
        model(
            "tsodyks2_synapse",
            &[
                ("U", NativeValue::Real(0.5)),
                ("u", NativeValue::Real(0.5)),
                ("x", NativeValue::Real(1.0)),
                ("tau_rec", NativeValue::Real(800.0)),
                ("tau_fac", NativeValue::Real(0.0)),
            ],
        ),
    ])
}

fn extension_models() -> BTreeMap<String, ModelDefaults> {
    BTreeMap::from([model(
        "stdp_dopamine_synapse",
        &[
            ("A_minus", NativeValue::Real(1.5)),
            ("A_plus", NativeValue::Real(1.0)),
            ("b", NativeValue::Real(0.0)),
            ("c", NativeValue::Real(0.0)),
            ("n", NativeValue::Real(0.0)),
            ("tau_c", NativeValue::Real(1000.0)),
            ("tau_n", NativeValue::Real(200.0)),
            ("tau_plus", NativeValue::Real(20.0)),
            ("Wmax", NativeValue::Real(200.0)),
            ("Wmin", NativeValue::Real(0.0)),
            ("vt", NativeValue::Integer(-1)),
        ],
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::SynapseEquations;
    use neurobridge_parameters::ParameterValue;
    use neurobridge_populations::CellType;

    fn spec(model: &str) -> ConnectivitySpec {
        ConnectivitySpec {
            model_name: model.to_string(),
            equations: SynapseEquations::default(),
            defaults: BTreeMap::from([("weight".to_string(), 250.0), ("tau_plus".to_string(), 15.0)]),
        }
    }

    #[test]
    fn test_registers_copied_model() {
        let pre = Population::new("pre", 4, CellType::if_cond_exp());
        let post = Population::new("post", 2, CellType::if_cond_exp());
        let mut backend = NativeModelBackend::new(0.1);
        let mut conn = backend.create_connectivity(&pre, &post, &spec("stdp_synapse")).unwrap();
        let registered = backend.registered_model("stdp_synapse_lbl").unwrap();
        assert_eq!(registered["tau_plus"], 15.0);
        assert_eq!(registered["Wmax"], 100.0);

        conn.connect(&[3, 1], 1).unwrap();
        assert_eq!(conn.presynaptic_indices(), vec![3, 1]);
        assert_eq!(conn.postsynaptic_indices(), vec![1, 1]);
        // pre ids start at 1, post ids follow the 4 pre cells
        assert_eq!(conn.node_ids().collect::<Vec<_>>(), vec![(4, 6), (2, 6)]);
        assert_eq!(conn.get_attribute("weight").unwrap().to_vec(), vec![250.0, 250.0]);
        assert_eq!(conn.get_attribute("delay").unwrap().to_vec(), vec![1.0, 1.0]);
        assert!(conn.has_edge(3, 1));
    }

    #[test]
    fn test_extension_models_need_loading() {
        let backend = NativeModelBackend::new(0.1);
        let err = backend.model_defaults("stdp_dopamine_synapse").unwrap_err();
        assert!(err.to_string().contains("extension modules are not loaded"));

        let backend = backend.with_extensions(true);
        assert!(backend.model_defaults("stdp_dopamine_synapse").is_ok());
        let err = backend.model_defaults("no_such_synapse").unwrap_err();
        assert_eq!(err.to_string(), "synapse model 'no_such_synapse' is not available");
    }

    #[test]
    fn test_tau_minus_must_be_homogeneous() {
        let post = Population::new("post", 2, CellType::if_cond_exp());
        let mut backend = NativeModelBackend::default();

        let mut native = ParameterSpace::with_shape(2);
        native.insert("tau_minus", ParameterValue::from(vec![10.0, 20.0]));
        assert_eq!(
            backend.prepare_post_population(&post, &native),
            Err(BackendError::InhomogeneousParameter("tau_minus".to_string()))
        );

        native.insert("tau_minus", ParameterValue::Scalar(20.0));
        backend.prepare_post_population(&post, &native).unwrap();
        assert_eq!(backend.post_tau_minus("post"), Some(20.0));
    }
}

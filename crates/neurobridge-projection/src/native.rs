// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Native synapse types described from backend defaults.

A native model is used with its own parameter names, so every translation is
an identity rule. Bookkeeping entries the backend reports alongside real
parameters are dropped, as are values that are not numbers.
*/

use crate::synapse_types::{EquationTemplate, ParameterDefinition, Quantity, SynapseType};
use neurobridge_backend::{Backend, BackendResult};
use std::collections::BTreeMap;
use tracing::debug;

/// Default STDP depression time constant, held by the postsynaptic cells
pub const DEFAULT_TAU_MINUS: f64 = 20.0;

/// Backend default keys that are not model parameters
pub const IGNORED_DEFAULTS: &[&str] = &[
    "max_delay",
    "min_delay",
    "num_connections",
    "num_connectors",
    "receptor_type",
    "synapsemodel",
    "property_object",
    "element_type",
    "type",
    "sizeof",
    "has_delay",
    "synapse_model",
    "requires_symmetric",
    "weight_recorder",
    "init_flag",
    "next_readout_time",
    "synapse_id",
    "synapse_modelid",
];

#[derive(Debug, Clone, PartialEq)]
pub struct NativeSynapseDescriptor {
    model_name: String,
    defaults: BTreeMap<String, f64>,
}

impl NativeSynapseDescriptor {
    /// Read and filter the defaults of `model_name`
    ///
    /// Fails with `BackendError::ModelUnavailable` if the backend does not
    /// know the model.
    pub fn from_backend<B: Backend>(backend: &B, model_name: &str) -> BackendResult<Self> {
        let mut defaults: BTreeMap<String, f64> = backend
            .model_defaults(model_name)?
            .into_iter()
            .filter(|(name, _)| !IGNORED_DEFAULTS.contains(&name.as_str()))
            .filter_map(|(name, value)| value.as_real().map(|v| (name, v)))
            .collect();
        defaults.insert("tau_minus".to_string(), DEFAULT_TAU_MINUS);
        debug!(
            target: "neurobridge-projection",
            "native synapse '{}' on {}: {} parameters",
            model_name,
            backend.name(),
            defaults.len()
        );
        Ok(Self {
            model_name: model_name.to_string(),
            defaults,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn defaults(&self) -> &BTreeMap<String, f64> {
        &self.defaults
    }

    /// Synapse type using the model's names and defaults as they are
    pub fn synapse_type(&self) -> SynapseType {
        let definitions = self
            .defaults
            .iter()
            .map(|(name, &default)| {
                ParameterDefinition::new(name, name, Quantity::Dimensionless, default)
            })
            .collect();
        SynapseType::new(
            self.model_name.clone(),
            self.model_name.clone(),
            definitions,
            EquationTemplate::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurobridge_backend::{BackendError, NativeModelBackend, NativeValue};

    #[test]
    fn test_filters_bookkeeping_and_injects_tau_minus() {
        let mut backend = NativeModelBackend::new(0.1);
        backend.register_model(
            "custom_synapse",
            BTreeMap::from([
                ("weight".to_string(), NativeValue::Real(2.0)),
                ("plastic".to_string(), NativeValue::Boolean(true)),
                ("n_steps".to_string(), NativeValue::Integer(3)),
                ("label".to_string(), NativeValue::Text("x".to_string())),
                ("sizeof".to_string(), NativeValue::Integer(48)),
                ("synapse_model".to_string(), NativeValue::Text("custom".to_string())),
            ]),
        );
        let descriptor = NativeSynapseDescriptor::from_backend(&backend, "custom_synapse").unwrap();
        let expected = BTreeMap::from([
            ("n_steps".to_string(), 3.0),
            ("plastic".to_string(), 1.0),
            ("tau_minus".to_string(), 20.0),
            ("weight".to_string(), 2.0),
        ]);
        assert_eq!(descriptor.defaults(), &expected);
    }

    #[test]
    fn test_identity_translations() {
        let backend = NativeModelBackend::new(0.1);
        let syn = NativeSynapseDescriptor::from_backend(&backend, "stdp_synapse")
            .unwrap()
            .synapse_type();
        assert_eq!(syn.model_name(), "stdp_synapse");
        let table = syn
            .translations(
                &backend.unit_system(),
                neurobridge_parameters::Dimension::Current,
                backend.delay_encoding(),
            )
            .unwrap();
        assert_eq!(table.simple_parameters().len(), table.len());
        assert!(table.contains("Wmax"));
        assert!(table.contains("tau_minus"));
        assert!(!table.contains("sizeof"));
    }

    #[test]
    fn test_model_unavailable() {
        let backend = NativeModelBackend::new(0.1);
        let err = NativeSynapseDescriptor::from_backend(&backend, "stdp_dopamine_synapse")
            .unwrap_err();
        assert!(matches!(err, BackendError::ModelUnavailable { extensions_loaded: false, .. }));
    }
}

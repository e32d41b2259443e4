// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Cell type descriptions.

A cell type only carries what the translation layer needs: how synaptic input
reaches the cell (which fixes the weight dimension), which state variable each
receptor drives, and the default parameter values. The equations themselves
live in the backend.
*/

use neurobridge_parameters::{Dimension, ParameterSpace, ParameterValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a synaptic event changes the postsynaptic cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SynapticResponse {
    /// Weight is a current injected into the cell
    CurrentBased,
    /// Weight is a conductance change
    ConductanceBased,
    /// Weight is a direct jump of the membrane potential
    VoltageBased,
}

impl SynapticResponse {
    pub fn weight_dimension(self) -> Dimension {
        match self {
            SynapticResponse::CurrentBased => Dimension::Current,
            SynapticResponse::ConductanceBased => Dimension::Conductance,
            SynapticResponse::VoltageBased => Dimension::Voltage,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CellType {
    name: String,
    response: SynapticResponse,
    synaptic_variables: BTreeMap<String, String>,
    defaults: ParameterSpace,
}

impl CellType {
    pub fn new(name: impl Into<String>, response: SynapticResponse) -> Self {
        Self {
            name: name.into(),
            response,
            synaptic_variables: BTreeMap::new(),
            defaults: ParameterSpace::new(),
        }
    }

    /// Map a receptor type to the state variable it drives
    pub fn with_receptor(mut self, receptor: impl Into<String>, variable: impl Into<String>) -> Self {
        self.synaptic_variables.insert(receptor.into(), variable.into());
        self
    }

    pub fn with_default(mut self, name: &str, value: f64) -> Self {
        self.defaults.insert(name, ParameterValue::Scalar(value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn response(&self) -> SynapticResponse {
        self.response
    }

    pub fn synaptic_variable(&self, receptor: &str) -> Option<&str> {
        self.synaptic_variables.get(receptor).map(String::as_str)
    }

    pub fn receptor_types(&self) -> impl Iterator<Item = &str> {
        self.synaptic_variables.keys().map(String::as_str)
    }

    pub fn default_parameters(&self) -> &ParameterSpace {
        &self.defaults
    }

    /// Leaky integrate-and-fire, exponential current synapses
    pub fn if_curr_exp() -> Self {
        Self::new("IF_curr_exp", SynapticResponse::CurrentBased)
            .with_receptor("excitatory", "i_exc")
            .with_receptor("inhibitory", "i_inh")
            .with_lif_defaults()
    }

    /// Leaky integrate-and-fire, exponential conductance synapses
    pub fn if_cond_exp() -> Self {
        Self::new("IF_cond_exp", SynapticResponse::ConductanceBased)
            .with_receptor("excitatory", "g_exc")
            .with_receptor("inhibitory", "g_inh")
            .with_lif_defaults()
            .with_default("e_rev_E", 0.0)
            .with_default("e_rev_I", -70.0)
    }

    /// Izhikevich model; synaptic events jump the membrane potential
    pub fn izhikevich() -> Self {
        Self::new("Izhikevich", SynapticResponse::VoltageBased)
            .with_receptor("excitatory", "v")
            .with_receptor("inhibitory", "v")
            .with_default("a", 0.02)
            .with_default("b", 0.2)
            .with_default("c", -65.0)
            .with_default("d", 2.0)
            .with_default("i_offset", 0.0)
    }

    fn with_lif_defaults(self) -> Self {
        self.with_default("cm", 1.0)
            .with_default("tau_m", 20.0)
            .with_default("tau_syn_E", 5.0)
            .with_default("tau_syn_I", 5.0)
            .with_default("tau_refrac", 0.1)
            .with_default("v_rest", -65.0)
            .with_default("v_reset", -65.0)
            .with_default("v_thresh", -50.0)
            .with_default("i_offset", 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_dimension_follows_response() {
        assert_eq!(CellType::if_curr_exp().response().weight_dimension(), Dimension::Current);
        assert_eq!(
            CellType::if_cond_exp().response().weight_dimension(),
            Dimension::Conductance
        );
        assert_eq!(CellType::izhikevich().response().weight_dimension(), Dimension::Voltage);
    }

    #[test]
    fn test_receptors() {
        let cell = CellType::if_cond_exp();
        assert_eq!(cell.synaptic_variable("excitatory"), Some("g_exc"));
        assert_eq!(cell.synaptic_variable("modulatory"), None);
        assert_eq!(cell.receptor_types().collect::<Vec<_>>(), vec!["excitatory", "inhibitory"]);
        assert!(cell.default_parameters().contains("e_rev_I"));
    }
}

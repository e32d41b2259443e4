// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Backend chosen at runtime
//!
//! [`DynamicBackend`] wraps either reference adapter so a projection can be
//! built against whichever one the configuration names.

use crate::error::BackendResult;
use crate::native_model::{NativeConnectivity, NativeModelBackend};
use crate::synapse_matrix::{SynapseMatrix, SynapseMatrixBackend};
use crate::traits::{Backend, Connectivity, ConnectivitySpec, NativeValue};
use ndarray::Array1;
use neurobridge_parameters::{DelayEncoding, ParameterSpace, UnitSystem};
use neurobridge_populations::Population;
use std::collections::BTreeMap;
use std::ops::Range;

pub enum DynamicBackend {
    SynapseMatrix(SynapseMatrixBackend),
    NativeModel(NativeModelBackend),
}

pub enum DynamicConnectivity {
    SynapseMatrix(SynapseMatrix),
    NativeModel(NativeConnectivity),
}

macro_rules! dispatch {
    ($self:expr, $method:ident($($args:expr),*)) => {
        match $self {
            DynamicBackend::SynapseMatrix(backend) => backend.$method($($args),*),
            DynamicBackend::NativeModel(backend) => backend.$method($($args),*),
        }
    };
}

macro_rules! dispatch_conn {
    ($self:expr, $method:ident($($args:expr),*)) => {
        match $self {
            DynamicConnectivity::SynapseMatrix(conn) => conn.$method($($args),*),
            DynamicConnectivity::NativeModel(conn) => conn.$method($($args),*),
        }
    };
}

impl From<SynapseMatrixBackend> for DynamicBackend {
    fn from(backend: SynapseMatrixBackend) -> Self {
        DynamicBackend::SynapseMatrix(backend)
    }
}

impl From<NativeModelBackend> for DynamicBackend {
    fn from(backend: NativeModelBackend) -> Self {
        DynamicBackend::NativeModel(backend)
    }
}

impl DynamicBackend {
    pub fn as_synapse_matrix(&self) -> Option<&SynapseMatrixBackend> {
        match self {
            DynamicBackend::SynapseMatrix(backend) => Some(backend),
            DynamicBackend::NativeModel(_) => None,
        }
    }

    pub fn as_native_model(&self) -> Option<&NativeModelBackend> {
        match self {
            DynamicBackend::NativeModel(backend) => Some(backend),
            DynamicBackend::SynapseMatrix(_) => None,
        }
    }
}

impl Connectivity for DynamicConnectivity {
    fn connect(&mut self, pre: &[usize], post: usize) -> BackendResult<Range<usize>> {
        dispatch_conn!(self, connect(pre, post))
    }

    fn len(&self) -> usize {
        dispatch_conn!(self, len())
    }

    fn attribute_names(&self) -> Vec<String> {
        dispatch_conn!(self, attribute_names())
    }

    fn get_attribute(&self, name: &str) -> BackendResult<Array1<f64>> {
        dispatch_conn!(self, get_attribute(name))
    }

    fn set_attribute(&mut self, name: &str, values: &Array1<f64>) -> BackendResult<()> {
        dispatch_conn!(self, set_attribute(name, values))
    }

    fn attribute_at(&self, name: &str, edge: usize) -> BackendResult<f64> {
        dispatch_conn!(self, attribute_at(name, edge))
    }

    fn set_attribute_at(&mut self, name: &str, edge: usize, value: f64) -> BackendResult<()> {
        dispatch_conn!(self, set_attribute_at(name, edge, value))
    }

    fn endpoints(&self, edge: usize) -> BackendResult<(usize, usize)> {
        dispatch_conn!(self, endpoints(edge))
    }

    fn presynaptic_indices(&self) -> Vec<usize> {
        dispatch_conn!(self, presynaptic_indices())
    }

    fn postsynaptic_indices(&self) -> Vec<usize> {
        dispatch_conn!(self, postsynaptic_indices())
    }

    fn has_edge(&self, pre: usize, post: usize) -> bool {
        dispatch_conn!(self, has_edge(pre, post))
    }
}

impl Backend for DynamicBackend {
    type Connectivity = DynamicConnectivity;

    fn name(&self) -> &'static str {
        dispatch!(self, name())
    }

    fn time_step(&self) -> f64 {
        dispatch!(self, time_step())
    }

    fn unit_system(&self) -> UnitSystem {
        dispatch!(self, unit_system())
    }

    fn delay_encoding(&self) -> DelayEncoding {
        dispatch!(self, delay_encoding())
    }

    fn create_connectivity(
        &mut self,
        pre: &Population,
        post: &Population,
        spec: &ConnectivitySpec,
    ) -> BackendResult<DynamicConnectivity> {
        match self {
            DynamicBackend::SynapseMatrix(backend) => backend
                .create_connectivity(pre, post, spec)
                .map(DynamicConnectivity::SynapseMatrix),
            DynamicBackend::NativeModel(backend) => backend
                .create_connectivity(pre, post, spec)
                .map(DynamicConnectivity::NativeModel),
        }
    }

    fn model_defaults(&self, model_name: &str) -> BackendResult<BTreeMap<String, NativeValue>> {
        dispatch!(self, model_defaults(model_name))
    }

    fn prepare_post_population(
        &mut self,
        post: &Population,
        native_parameters: &ParameterSpace,
    ) -> BackendResult<()> {
        dispatch!(self, prepare_post_population(post, native_parameters))
    }
}

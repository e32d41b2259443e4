// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Handle to a single connection of a projection

use crate::error::ProjectionResult;
use crate::projection::{Projection, POSTSYNAPTIC_INDEX, PRESYNAPTIC_INDEX};
use neurobridge_backend::Backend;

/// One edge, addressed by leaf pair and row
///
/// The handle holds no borrow; values are read from and written to the
/// projection it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    pre_leaf: usize,
    post_leaf: usize,
    index: usize,
}

impl Connection {
    pub(crate) fn new(pre_leaf: usize, post_leaf: usize, index: usize) -> Self {
        Self {
            pre_leaf,
            post_leaf,
            index,
        }
    }

    pub fn pre_leaf(&self) -> usize {
        self.pre_leaf
    }

    pub fn post_leaf(&self) -> usize {
        self.post_leaf
    }

    /// Row within the leaf pair's connectivity object
    pub fn index(&self) -> usize {
        self.index
    }

    /// Logical (pre, post) indices
    pub fn endpoints<B: Backend>(&self, projection: &Projection<B>) -> ProjectionResult<(usize, usize)> {
        projection.endpoints(*self)
    }

    /// Logical value of `name`
    pub fn get<B: Backend>(&self, projection: &Projection<B>, name: &str) -> ProjectionResult<f64> {
        match name {
            PRESYNAPTIC_INDEX => Ok(self.endpoints(projection)?.0 as f64),
            POSTSYNAPTIC_INDEX => Ok(self.endpoints(projection)?.1 as f64),
            _ => projection.read_edge(*self, name),
        }
    }

    /// Set the logical value of `name`; delays are rounded to the time step
    pub fn set<B: Backend>(
        &self,
        projection: &mut Projection<B>,
        name: &str,
        value: f64,
    ) -> ProjectionResult<()> {
        projection.write_edge(*self, name, value)
    }

    pub fn weight<B: Backend>(&self, projection: &Projection<B>) -> ProjectionResult<f64> {
        self.get(projection, "weight")
    }

    pub fn set_weight<B: Backend>(&self, projection: &mut Projection<B>, weight: f64) -> ProjectionResult<()> {
        self.set(projection, "weight", weight)
    }

    pub fn delay<B: Backend>(&self, projection: &Projection<B>) -> ProjectionResult<f64> {
        self.get(projection, "delay")
    }

    pub fn set_delay<B: Backend>(&self, projection: &mut Projection<B>, delay: f64) -> ProjectionResult<()> {
        self.set(projection, "delay", delay)
    }

    /// Values of `names`, in order
    pub fn as_tuple<B: Backend>(&self, projection: &Projection<B>, names: &[&str]) -> ProjectionResult<Vec<f64>> {
        names.iter().map(|name| self.get(projection, name)).collect()
    }
}

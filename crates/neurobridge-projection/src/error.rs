// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for projections

use neurobridge_backend::BackendError;
use neurobridge_parameters::{ParameterError, TranslationError};
use neurobridge_populations::PartitionError;

/// Result type for projection operations
pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    /// Operation not available when an endpoint spans several populations
    #[error("{0} is not implemented for assembly endpoints")]
    NotImplemented(&'static str),

    #[error("unsupported projection: {0}")]
    Unsupported(String),

    #[error("cell type '{cell_type}' has no receptor type '{receptor}'")]
    UnknownReceptor { receptor: String, cell_type: String },

    #[error("a connection from {pre} to {post} already exists")]
    DuplicateConnection { pre: usize, post: usize },

    #[error("'{name}' has {actual} values, at least {expected} needed")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("delay {delay} ms is outside [{min}, {max}] ms")]
    DelayOutOfRange { delay: f64, min: f64, max: f64 },

    #[error("synapse type has no parameter '{0}'")]
    UnknownParameter(String),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

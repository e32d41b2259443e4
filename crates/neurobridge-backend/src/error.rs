// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for backend operations

use neurobridge_parameters::ParameterError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// The backend has no synapse model of this name
    #[error("synapse model '{model}' is not available{}", extension_hint(.extensions_loaded))]
    ModelUnavailable {
        model: String,
        extensions_loaded: bool,
    },

    #[error("connectivity object has no attribute '{0}'")]
    UnknownAttribute(String),

    #[error("edge {edge} out of range ({len} edges)")]
    EdgeOutOfRange { edge: usize, len: usize },

    #[error("attribute '{name}' needs {expected} values, got {actual}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("cell index {index} out of range for '{population}' of size {size}")]
    CellOutOfRange {
        index: usize,
        size: usize,
        population: String,
    },

    /// A parameter the backend can only hold as a single value varies across cells
    #[error("parameter '{0}' must be homogeneous for this backend")]
    InhomogeneousParameter(String),

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

fn extension_hint(extensions_loaded: &bool) -> &'static str {
    if *extensions_loaded {
        ""
    } else {
        " (extension modules are not loaded)"
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for cell groups and index partitioning

use neurobridge_parameters::ParameterError;

/// Result type for population operations
pub type PartitionResult<T> = Result<T, PartitionError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PartitionError {
    /// Logical index past the end of the group; never clamped or wrapped
    #[error("index {index} out of bounds for '{group}' of size {size}")]
    IndexOutOfBounds {
        index: usize,
        size: usize,
        group: String,
    },

    #[error("view index {index} out of bounds for parent of size {parent_size}")]
    InvalidView { index: usize, parent_size: usize },

    #[error("an assembly needs at least one member")]
    EmptyAssembly,

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

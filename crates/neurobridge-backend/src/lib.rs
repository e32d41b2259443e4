// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neurobridge Backend Adapters
//!
//! The narrow interface between the translation layer and a simulator:
//! - **Traits**: [`Backend`] and [`Connectivity`]
//! - **Synapse-matrix backend**: equation-based, SI units, delays in steps
//! - **Native-model backend**: compiled models with defaults, delays in ms
//! - **Dynamic backend**: either of the above, chosen at runtime
//!
//! Both backends are in-memory reference adapters: they store edges and
//! per-edge values but never integrate anything.
//!
//! ```
//! use neurobridge_backend::{Backend, NativeModelBackend};
//!
//! let backend = NativeModelBackend::new(0.1);
//! let defaults = backend.model_defaults("static_synapse").unwrap();
//! assert!(defaults.contains_key("weight"));
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod dynamic_backend;
pub mod error;
pub mod native_model;
pub mod storage;
pub mod synapse_matrix;
pub mod traits;

pub use dynamic_backend::{DynamicBackend, DynamicConnectivity};
pub use error::{BackendError, BackendResult};
pub use native_model::{NativeConnectivity, NativeModelBackend};
pub use storage::EdgeTable;
pub use synapse_matrix::{SynapseMatrix, SynapseMatrixBackend};
pub use traits::{
    Backend, Connectivity, ConnectivitySpec, NativeValue, SynapseEquations, SynapseVariable,
};

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neurobridge Populations
//!
//! Cell types and the groups of cells a projection connects:
//! - **Cell types**: synaptic response type, receptor → state variable map, defaults
//! - **Cell groups**: populations, views and assemblies as one closed enum
//! - **Partitioning**: logical indices → per-leaf base-population indices

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cell_types;
pub mod error;
pub mod population;

pub use cell_types::{CellType, SynapticResponse};
pub use error::{PartitionError, PartitionResult};
pub use population::{Assembly, CellGroup, Partition, Population, PopulationView};

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neurobridge
//!
//! Simulator-independent description of synaptic connections for spiking
//! network backends. Users describe synapses with logical parameter names
//! and units; Neurobridge translates them into each backend's native names,
//! units and delay encoding, builds the connectivity and reads values back.
//!
//! ## Quick Start
//!
//! ```rust
//! use neurobridge::prelude::*;
//!
//! let mut backend = NativeModelBackend::new(0.1);
//! let pre = CellGroup::from(Population::new("pre", 3, CellType::if_curr_exp()));
//! let post = CellGroup::from(Population::new("post", 6, CellType::if_curr_exp()));
//! let connector = FromListConnector::with_columns(
//!     &["weight"],
//!     vec![(0, 5, vec![0.5]), (1, 5, vec![0.5]), (2, 5, vec![0.5])],
//! );
//!
//! let projection = Projection::new(
//!     &mut backend,
//!     pre,
//!     post,
//!     &connector,
//!     SynapseType::static_synapse(),
//!     "excitatory",
//!     ProjectionOptions::default(),
//! )
//! .unwrap();
//!
//! let rows = projection
//!     .get_as_list(&[PRESYNAPTIC_INDEX, POSTSYNAPTIC_INDEX])
//!     .unwrap();
//! assert_eq!(rows, vec![vec![0.0, 5.0], vec![1.0, 5.0], vec![2.0, 5.0]]);
//! ```
//!
//! ## Crates
//! - [`parameters`]: units, transform expressions, parameter spaces, translation tables
//! - [`populations`]: cell types, populations, views, assemblies, index partitioning
//! - [`backend`]: backend traits, the two reference adapters and a runtime-chosen wrapper
//! - [`projection`]: synapse types, connectivity builder, attribute accessor
//! - [`config`]: `neurobridge.toml` loading with env/CLI overrides
//! - [`observability`]: logging setup and per-crate debug flags

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use neurobridge_backend as backend;
pub use neurobridge_config as config;
pub use neurobridge_observability as observability;
pub use neurobridge_parameters as parameters;
pub use neurobridge_populations as populations;
pub use neurobridge_projection as projection;

use neurobridge_backend::{DynamicBackend, NativeModelBackend, SynapseMatrixBackend};
use neurobridge_config::{BackendKind, LoggingConfig, MultapseSetting, NeurobridgeConfig};
use neurobridge_observability::{init_logging, parse_debug_flags, CrateDebugFlags};
use neurobridge_projection::{DelayBounds, MultapsePolicy, ProjectionOptions};
use tracing::info;

pub mod prelude {
    pub use neurobridge_backend::{
        Backend, Connectivity, DynamicBackend, NativeModelBackend, SynapseMatrixBackend,
    };
    pub use neurobridge_parameters::{
        build_translations, Globals, ParameterSpace, ParameterValue, TranslationSpec,
        TranslationTable, UnitSystem, Value,
    };
    pub use neurobridge_populations::{CellGroup, CellType, Population};
    pub use neurobridge_projection::{
        AdditiveWeightDependence, AttributeFormat, Attributes, Connection, Connector,
        DelayBounds, FromListConnector, MultapsePolicy, NativeSynapseDescriptor, Projection,
        ProjectionError, ProjectionOptions, SpikePairRule, SynapseType, POSTSYNAPTIC_INDEX,
        PRESYNAPTIC_INDEX,
    };
}

/// Projection options from the `[projection]` section, with delays bounded
/// by `simulation.min_delay` and `simulation.max_delay`
pub fn projection_options(config: &NeurobridgeConfig, label: Option<String>) -> ProjectionOptions {
    ProjectionOptions {
        label,
        multapses: match config.projection.multapses {
            MultapseSetting::Allow => MultapsePolicy::Allow,
            MultapseSetting::Reject => MultapsePolicy::Reject,
        },
        delay_bounds: Some(DelayBounds::new(
            config.simulation.min_delay,
            config.simulation.max_delay,
        )),
    }
}

/// The backend named by `backend.kind`
pub fn configured_backend(config: &NeurobridgeConfig) -> DynamicBackend {
    let backend = match config.backend.kind {
        BackendKind::SynapseMatrix => DynamicBackend::from(synapse_matrix_backend(config)),
        BackendKind::NativeModel => DynamicBackend::from(native_model_backend(config)),
    };
    info!(
        target: "neurobridge",
        "Using the {} backend (dt = {} ms)",
        neurobridge_backend::Backend::name(&backend),
        config.simulation.timestep
    );
    backend
}

pub fn native_model_backend(config: &NeurobridgeConfig) -> NativeModelBackend {
    NativeModelBackend::new(config.simulation.timestep)
        .with_extensions(config.backend.extensions_loaded)
}

pub fn synapse_matrix_backend(config: &NeurobridgeConfig) -> SynapseMatrixBackend {
    SynapseMatrixBackend::new(config.simulation.timestep)
}

/// Debug flags from the config, the command line and `NEUROBRIDGE_DEBUG`
pub fn debug_flags(logging: &LoggingConfig) -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_crates(&logging.debug_crates);
    flags.merge(&parse_debug_flags());
    flags
}

/// Install console logging as configured
pub fn init_logging_from_config(config: &NeurobridgeConfig) -> anyhow::Result<()> {
    let flags = debug_flags(&config.logging);
    init_logging(&flags, &config.logging.level)?;
    info!(
        target: "neurobridge",
        "Neurobridge {} logging at '{}' ({} crates at debug)",
        VERSION,
        config.logging.level,
        flags.enabled_crates.len()
    );
    Ok(())
}

/// Console plus rolling file logging as configured
#[cfg(feature = "file-logging")]
pub fn init_file_logging_from_config(
    config: &NeurobridgeConfig,
    log_dir: Option<std::path::PathBuf>,
) -> anyhow::Result<neurobridge_observability::LoggingGuard> {
    let flags = debug_flags(&config.logging);
    let guard = neurobridge_observability::init_file_logging(&flags, &config.logging.level, log_dir)?;
    info!(
        target: "neurobridge",
        "Neurobridge {} logging to {}",
        VERSION,
        guard.log_dir().display()
    );
    Ok(guard)
}

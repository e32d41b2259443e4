// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Neurobridge Projection

Synapse types, the connectivity builder and the attribute accessor.

A [`Projection`] owns one backend connectivity object per (pre leaf, post
leaf) pair. Connectors fill it through [`Projection::convergent_connect`];
values are read back in logical names and units with [`Projection::get`] or
per connection through [`Connection`].
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod connection;
pub mod connector;
pub mod error;
pub mod native;
pub mod projection;
pub mod synapse_types;

pub use connection::Connection;
pub use connector::{Connector, FromListConnector};
pub use error::{ProjectionError, ProjectionResult};
pub use native::{NativeSynapseDescriptor, DEFAULT_TAU_MINUS, IGNORED_DEFAULTS};
pub use projection::{
    round_delay, AttributeFormat, Attributes, DelayBounds, MultapsePolicy, Projection, ProjectionOptions,
    POSTSYNAPTIC_INDEX, PRESYNAPTIC_INDEX,
};
pub use synapse_types::{
    AdditiveWeightDependence, EquationTemplate, ParameterDefinition, Quantity, SpikePairRule,
    SynapseType,
};

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Each struct maps to one section of `neurobridge.toml`. Every field has a
//! default, so a partial file (or none at all) is valid input.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NeurobridgeConfig {
    pub simulation: SimulationConfig,
    pub backend: BackendConfig,
    pub projection: ProjectionConfig,
    pub logging: LoggingConfig,
}

/// Simulation clock and delay bounds, all in ms
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub timestep: f64,
    pub min_delay: f64,
    pub max_delay: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            timestep: 0.1,
            min_delay: 0.1,
            max_delay: 10.0,
        }
    }
}

/// Which reference backend to drive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    SynapseMatrix,
    #[default]
    NativeModel,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "synapse-matrix" | "matrix" => Ok(Self::SynapseMatrix),
            "native-model" | "native" => Ok(Self::NativeModel),
            other => Err(ConfigError::InvalidValue(format!("unknown backend '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Whether optional native synapse models are available
    pub extensions_loaded: bool,
}

/// Whether repeated connections between one cell pair are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MultapseSetting {
    #[default]
    Allow,
    Reject,
}

impl FromStr for MultapseSetting {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "reject" => Ok(Self::Reject),
            other => Err(ConfigError::InvalidValue(format!(
                "multapses must be 'allow' or 'reject', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub multapses: MultapseSetting,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Crates logged at debug level regardless of `level`
    pub debug_crates: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug_crates: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: NeurobridgeConfig = toml::from_str(
            r#"
            [simulation]
            timestep = 0.05

            [backend]
            kind = "synapse-matrix"
            "#,
        )
        .unwrap();
        assert_eq!(config.simulation.timestep, 0.05);
        assert_eq!(config.simulation.max_delay, 10.0);
        assert_eq!(config.backend.kind, BackendKind::SynapseMatrix);
        assert_eq!(config.projection.multapses, MultapseSetting::Allow);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_enum_wire_names() {
        let json = serde_json::to_value(NeurobridgeConfig::default()).unwrap();
        assert_eq!(json["backend"]["kind"], "native-model");
        assert_eq!(json["projection"]["multapses"], "allow");
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("native".parse::<BackendKind>().unwrap(), BackendKind::NativeModel);
        assert_eq!(
            "SYNAPSE_MATRIX".parse::<BackendKind>().unwrap(),
            BackendKind::SynapseMatrix
        );
        assert!("gpu".parse::<BackendKind>().is_err());
    }
}

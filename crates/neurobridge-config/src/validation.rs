// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation

use crate::{ConfigError, ConfigResult, NeurobridgeConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    NotPositive { field: String, value: f64 },
    DelayBelowBound { field: String, value: f64, bound: String, bound_value: f64 },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotPositive { field, value } => {
                write!(f, "{} = {} must be positive", field, value)
            }
            Self::DelayBelowBound {
                field,
                value,
                bound,
                bound_value,
            } => write!(
                f,
                "{} = {} is below {} = {}",
                field, value, bound, bound_value
            ),
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks that the time step is positive, that
/// `timestep <= min_delay <= max_delay`, and that the log level is known.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &NeurobridgeConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();
    validate_simulation(config, &mut errors);
    validate_logging(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");
        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }
    Ok(())
}

fn validate_simulation(config: &NeurobridgeConfig, errors: &mut Vec<ConfigValidationError>) {
    let sim = &config.simulation;
    if !(sim.timestep > 0.0) {
        errors.push(ConfigValidationError::NotPositive {
            field: "simulation.timestep".to_string(),
            value: sim.timestep,
        });
    }
    if sim.min_delay < sim.timestep {
        errors.push(ConfigValidationError::DelayBelowBound {
            field: "simulation.min_delay".to_string(),
            value: sim.min_delay,
            bound: "simulation.timestep".to_string(),
            bound_value: sim.timestep,
        });
    }
    if sim.max_delay < sim.min_delay {
        errors.push(ConfigValidationError::DelayBelowBound {
            field: "simulation.max_delay".to_string(),
            value: sim.max_delay,
            bound: "simulation.min_delay".to_string(),
            bound_value: sim.min_delay,
        });
    }
}

fn validate_logging(config: &NeurobridgeConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("'{}' is not one of {}", config.logging.level, LOG_LEVELS.join(", ")),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        assert!(validate_config(&NeurobridgeConfig::default()).is_ok());
    }

    #[test]
    fn test_non_positive_timestep() {
        let mut config = NeurobridgeConfig::default();
        config.simulation.timestep = 0.0;
        config.simulation.min_delay = 0.0;
        let mut errors = Vec::new();
        validate_simulation(&config, &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ConfigValidationError::NotPositive { .. }));
    }

    #[test]
    fn test_delay_ordering() {
        let mut config = NeurobridgeConfig::default();
        config.simulation.min_delay = 0.05;
        config.simulation.max_delay = 0.01;
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("simulation.min_delay"));
        assert!(err.contains("simulation.max_delay"));
    }

    #[test]
    fn test_unknown_log_level() {
        let mut config = NeurobridgeConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }
}

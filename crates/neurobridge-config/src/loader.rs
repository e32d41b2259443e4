// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! 1. TOML file (base values)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)
//!
//! Override values that fail to parse are ignored and the lower layer's
//! value is kept.

use crate::{ConfigError, ConfigResult, NeurobridgeConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "neurobridge.toml";

/// Find the configuration file
///
/// Search order:
/// 1. `NEUROBRIDGE_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("NEUROBRIDGE_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by NEUROBRIDGE_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            let Some(parent) = current.parent() else {
                break;
            };
            search_paths.push(parent.join(CONFIG_FILE_NAME));
            current = parent;
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet NEUROBRIDGE_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<NeurobridgeConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    let content = fs::read_to_string(&config_file)?;
    let mut config: NeurobridgeConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }
    Ok(config)
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `NEUROBRIDGE_TIMESTEP` -> `simulation.timestep`
/// - `NEUROBRIDGE_MIN_DELAY` -> `simulation.min_delay`
/// - `NEUROBRIDGE_MAX_DELAY` -> `simulation.max_delay`
/// - `NEUROBRIDGE_BACKEND` -> `backend.kind`
/// - `NEUROBRIDGE_EXTENSIONS_LOADED` -> `backend.extensions_loaded`
/// - `NEUROBRIDGE_MULTAPSES` -> `projection.multapses`
/// - `NEUROBRIDGE_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut NeurobridgeConfig) {
    let overrides: HashMap<String, String> = [
        ("NEUROBRIDGE_TIMESTEP", "timestep"),
        ("NEUROBRIDGE_MIN_DELAY", "min_delay"),
        ("NEUROBRIDGE_MAX_DELAY", "max_delay"),
        ("NEUROBRIDGE_BACKEND", "backend"),
        ("NEUROBRIDGE_EXTENSIONS_LOADED", "extensions_loaded"),
        ("NEUROBRIDGE_MULTAPSES", "multapses"),
        ("NEUROBRIDGE_LOG_LEVEL", "log_level"),
    ]
    .into_iter()
    .filter_map(|(var, key)| env::var(var).ok().map(|value| (key.to_string(), value)))
    .collect();
    apply_cli_overrides(config, &overrides);
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - CLI arguments by key (e.g., `{"timestep": "0.05", "backend": "native"}`);
///   `debug_crates` takes a comma-separated list
pub fn apply_cli_overrides(config: &mut NeurobridgeConfig, cli_args: &HashMap<String, String>) {
    if let Some(Ok(dt)) = cli_args.get("timestep").map(|v| v.parse::<f64>()) {
        config.simulation.timestep = dt;
    }
    if let Some(Ok(delay)) = cli_args.get("min_delay").map(|v| v.parse::<f64>()) {
        config.simulation.min_delay = delay;
    }
    if let Some(Ok(delay)) = cli_args.get("max_delay").map(|v| v.parse::<f64>()) {
        config.simulation.max_delay = delay;
    }

    if let Some(Ok(kind)) = cli_args.get("backend").map(|v| v.parse()) {
        config.backend.kind = kind;
    }
    if let Some(value) = cli_args.get("extensions_loaded") {
        config.backend.extensions_loaded = parse_bool(value);
    }

    if let Some(Ok(policy)) = cli_args.get("multapses").map(|v| v.parse()) {
        config.projection.multapses = policy;
    }

    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.to_lowercase();
    }
    if let Some(value) = cli_args.get("debug_crates") {
        config.logging.debug_crates = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackendKind, MultapseSetting};
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom.toml");
        File::create(&config_path).unwrap();

        env::set_var("NEUROBRIDGE_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("NEUROBRIDGE_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_missing_env_path_is_an_error() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var("NEUROBRIDGE_CONFIG_PATH", "/nonexistent/neurobridge.toml");
        let result = find_config_file();
        env::remove_var("NEUROBRIDGE_CONFIG_PATH");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::remove_var("NEUROBRIDGE_TIMESTEP");
        env::remove_var("NEUROBRIDGE_BACKEND");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[simulation]").unwrap();
        writeln!(file, "timestep = 0.25").unwrap();
        writeln!(file, "[projection]").unwrap();
        writeln!(file, "multapses = \"reject\"").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();
        assert_eq!(config.simulation.timestep, 0.25);
        assert_eq!(config.projection.multapses, MultapseSetting::Reject);
        assert_eq!(config.backend.kind, BackendKind::NativeModel);
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = NeurobridgeConfig::default();

        env::set_var("NEUROBRIDGE_TIMESTEP", "0.01");
        env::set_var("NEUROBRIDGE_BACKEND", "synapse-matrix");
        env::set_var("NEUROBRIDGE_MAX_DELAY", "not-a-number");

        apply_environment_overrides(&mut config);

        env::remove_var("NEUROBRIDGE_TIMESTEP");
        env::remove_var("NEUROBRIDGE_BACKEND");
        env::remove_var("NEUROBRIDGE_MAX_DELAY");

        assert_eq!(config.simulation.timestep, 0.01);
        assert_eq!(config.backend.kind, BackendKind::SynapseMatrix);
        assert_eq!(config.simulation.max_delay, 10.0);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = NeurobridgeConfig::default();
        let cli_args = HashMap::from([
            ("log_level".to_string(), "DEBUG".to_string()),
            (
                "debug_crates".to_string(),
                "neurobridge-projection, neurobridge-backend".to_string(),
            ),
            ("extensions_loaded".to_string(), "yes".to_string()),
        ]);

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.debug_crates,
            vec!["neurobridge-projection", "neurobridge-backend"]
        );
        assert!(config.backend.extensions_loaded);
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[simulation]").unwrap();
        writeln!(file, "timestep = 1.0").unwrap();
        writeln!(file, "min_delay = 1.0").unwrap();

        env::set_var("NEUROBRIDGE_TIMESTEP", "0.5");
        env::set_var("NEUROBRIDGE_MIN_DELAY", "0.5");
        let cli_args = HashMap::from([("timestep".to_string(), "0.2".to_string())]);

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("NEUROBRIDGE_TIMESTEP");
        env::remove_var("NEUROBRIDGE_MIN_DELAY");

        // CLI wins for timestep, env wins for min_delay
        assert_eq!(config.simulation.timestep, 0.2);
        assert_eq!(config.simulation.min_delay, 0.5);
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-neurobridge-projection` and `--debug-all`.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

/// Crates whose logs are raised to debug level
///
/// # Example
/// ```rust
/// use neurobridge_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(["--debug-neurobridge-backend".to_string()]);
/// assert!(flags.is_enabled("neurobridge-backend"));
/// assert_eq!(flags.to_filter_string("warn"), "neurobridge-backend=debug,warn");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Parse debug flags from command-line arguments
    ///
    /// Looks for arguments matching `--debug-{crate-name}`; `--debug-all`
    /// enables every known crate.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = Self::default();
        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
            } else if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enable(crate_name);
            }
        }
        flags
    }

    /// Flags for an explicit list, e.g. `logging.debug_crates` from the config
    pub fn from_crates<I, S>(crates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = Self::default();
        for crate_name in crates {
            match crate_name.as_ref() {
                "all" => flags.enable_all(),
                name => flags.enable(name),
            }
        }
        flags
    }

    pub fn enable(&mut self, crate_name: &str) {
        let crate_name = crate_name.trim();
        if !crate_name.is_empty() {
            self.enabled_crates.insert(crate_name.to_string());
        }
    }

    pub fn enable_all(&mut self) {
        self.enabled_crates
            .extend(KNOWN_CRATES.iter().map(|c| c.to_string()));
    }

    /// Union of two flag sets
    pub fn merge(&mut self, other: &CrateDebugFlags) {
        self.enabled_crates.extend(other.enabled_crates.iter().cloned());
    }

    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// `DEBUG` for enabled crates, `INFO` otherwise
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// `EnvFilter` directive: `"<crate>=debug,...,<base_level>"`
    pub fn to_filter_string(&self, base_level: &str) -> String {
        let mut filters: Vec<String> = self
            .enabled_crates
            .iter()
            .map(|crate_name| format!("{}=debug", crate_name))
            .collect();
        filters.push(base_level.to_string());
        filters.join(",")
    }
}

/// Debug flags from the process arguments and `NEUROBRIDGE_DEBUG`
///
/// The variable holds comma-separated crate names, or `all`.
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(env_var) = env::var("NEUROBRIDGE_DEBUG") {
        flags.merge(&CrateDebugFlags::from_crates(env_var.split(',')));
    }
    flags
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  NEUROBRIDGE_DEBUG={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  NEUROBRIDGE_DEBUG=all                               Enable debug for all crates

Examples:
  --debug-neurobridge-projection
  NEUROBRIDGE_DEBUG=neurobridge-backend,neurobridge-parameters
"#,
        KNOWN_CRATES.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_crate_flag() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-neurobridge-backend".to_string()]);
        assert!(flags.is_enabled("neurobridge-backend"));
        assert!(!flags.is_enabled("neurobridge-projection"));
    }

    #[test]
    fn test_other_arguments_are_ignored() {
        let flags = CrateDebugFlags::from_args(vec![
            "run".to_string(),
            "--verbose".to_string(),
            "--debug-neurobridge-projection".to_string(),
        ]);
        assert_eq!(flags.enabled_crates.len(), 1);
    }

    #[test]
    fn test_debug_all() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);
        for crate_name in KNOWN_CRATES {
            assert!(flags.is_enabled(crate_name), "{} should be enabled", crate_name);
        }
    }

    #[test]
    fn test_from_crates_and_merge() {
        let mut flags = CrateDebugFlags::from_crates([" neurobridge-config ", ""]);
        flags.merge(&CrateDebugFlags::from_crates(["all"]));
        assert_eq!(flags.enabled_crates.len(), KNOWN_CRATES.len());
    }

    #[test]
    fn test_filter_string() {
        assert_eq!(CrateDebugFlags::default().to_filter_string("info"), "info");
        let flags = CrateDebugFlags::from_args(vec![
            "--debug-neurobridge-projection".to_string(),
            "--debug-neurobridge-backend".to_string(),
        ]);
        assert_eq!(
            flags.to_filter_string("warn"),
            "neurobridge-backend=debug,neurobridge-projection=debug,warn"
        );
    }

    #[test]
    fn test_log_level() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-neurobridge-config".to_string()]);
        assert_eq!(flags.log_level("neurobridge-config"), tracing::Level::DEBUG);
        assert_eq!(flags.log_level("neurobridge"), tracing::Level::INFO);
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neurobridge-observability
//!
//! Logging setup shared by every Neurobridge binary and test harness, with
//! per-crate debug flag support.
//!
//! ## Features
//! - `file-logging`: rolling log files under a timestamped run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known Neurobridge crate names for debug flags
///
/// These are also the `target:` names the crates log under.
pub const KNOWN_CRATES: &[&str] = &[
    "neurobridge",
    "neurobridge-parameters",
    "neurobridge-populations",
    "neurobridge-backend",
    "neurobridge-projection",
    "neurobridge-config",
];

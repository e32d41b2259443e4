// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neurobridge Parameters
//!
//! Backend-agnostic parameter handling:
//! - **Units**: typed dimensions, units and per-backend unit systems
//! - **Expressions**: transform expressions bound at translate time, evaluated lazily
//! - **Parameter Space**: ordered name → value mapping with a shared shape
//! - **Translation**: bidirectional logical ↔ native translation tables
//!
//! ```
//! use neurobridge_parameters::{build_translations, Globals, ParameterSpace, ParameterValue, TranslationSpec};
//!
//! let table = build_translations(&[TranslationSpec::scaled("weight", "w", 1000.0)]).unwrap();
//! let logical = ParameterSpace::from_pairs([("weight", ParameterValue::Scalar(0.5))]);
//! let native = table.translate(&logical, &Globals::new()).unwrap();
//! assert_eq!(native.get("w").and_then(ParameterValue::as_scalar), Some(500.0));
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod expression;
pub mod parameter_space;
pub mod translation;
pub mod units;

pub use error::{ParameterError, ParameterResult, TranslationError, TranslationResult, UnitError};
pub use expression::{Expression, LazyExpression};
pub use parameter_space::{simplify, Generator, ParameterSpace, ParameterValue, Value};
pub use translation::{
    build_translations, DeclaredType, Globals, Transform, TranslationRule, TranslationSpec,
    TranslationTable,
};
pub use units::{DelayEncoding, Dimension, Unit, UnitSystem};

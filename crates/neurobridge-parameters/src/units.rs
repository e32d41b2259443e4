// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Physical Units
//!
//! Typed units for the quantities that cross the translation boundary.
//!
//! Every unit carries its dimension and its scale relative to the SI coherent
//! unit, so conversion between two units of the same dimension is a single
//! multiplicative factor:
//!
//! ```text
//! factor(from → to) = from.si_scale / to.si_scale
//!
//! 1 nA → A    : 1e-9 / 1.0   = 1e-9
//! 1 µS → nS   : 1e-6 / 1e-9  = 1000
//! 1 ms → s    : 1e-3 / 1.0   = 1e-3
//! ```
//!
//! A backend advertises the unit it stores for each dimension through a
//! [`UnitSystem`]; synapse models pick their weight dimension once, at
//! projection construction, from the postsynaptic response type.

use crate::error::UnitError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical dimension of a model parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Dimensionless,
    Time,
    Voltage,
    Current,
    Conductance,
}

/// A unit: symbol, dimension and scale relative to SI
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    symbol: &'static str,
    dimension: Dimension,
    si_scale: f64,
}

impl Unit {
    pub const DIMENSIONLESS: Unit = Unit::new("1", Dimension::Dimensionless, 1.0);

    pub const SECOND: Unit = Unit::new("s", Dimension::Time, 1.0);
    pub const MILLISECOND: Unit = Unit::new("ms", Dimension::Time, 1e-3);

    pub const VOLT: Unit = Unit::new("V", Dimension::Voltage, 1.0);
    pub const MILLIVOLT: Unit = Unit::new("mV", Dimension::Voltage, 1e-3);

    pub const AMPERE: Unit = Unit::new("A", Dimension::Current, 1.0);
    pub const NANOAMPERE: Unit = Unit::new("nA", Dimension::Current, 1e-9);
    pub const PICOAMPERE: Unit = Unit::new("pA", Dimension::Current, 1e-12);

    pub const SIEMENS: Unit = Unit::new("S", Dimension::Conductance, 1.0);
    pub const MICROSIEMENS: Unit = Unit::new("uS", Dimension::Conductance, 1e-6);
    pub const NANOSIEMENS: Unit = Unit::new("nS", Dimension::Conductance, 1e-9);

    pub const fn new(symbol: &'static str, dimension: Dimension, si_scale: f64) -> Self {
        Self {
            symbol,
            dimension,
            si_scale,
        }
    }

    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn si_scale(&self) -> f64 {
        self.si_scale
    }

    /// Factor that converts a value expressed in `self` into `target`
    ///
    /// # Example
    /// ```
    /// use neurobridge_parameters::units::Unit;
    ///
    /// let f = Unit::MICROSIEMENS.factor_to(Unit::NANOSIEMENS).unwrap();
    /// assert!((f - 1000.0).abs() < 1e-9);
    /// assert!(Unit::MILLISECOND.factor_to(Unit::NANOAMPERE).is_err());
    /// ```
    pub fn factor_to(&self, target: Unit) -> Result<f64, UnitError> {
        if self.dimension != target.dimension {
            return Err(UnitError::Incompatible {
                from: self.symbol,
                from_dimension: self.dimension,
                to: target.symbol,
                to_dimension: target.dimension,
            });
        }
        Ok(self.si_scale / target.si_scale)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol)
    }
}

/// How a backend stores synaptic delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelayEncoding {
    /// Delay stored in the backend's time unit
    Time,
    /// Delay stored as a whole number of simulation time steps
    Steps,
}

/// The unit a backend uses for each dimension
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitSystem {
    pub time: Unit,
    pub voltage: Unit,
    pub current: Unit,
    pub conductance: Unit,
}

impl UnitSystem {
    /// Units of the user-facing model description (ms, mV, nA, µS)
    pub const fn logical() -> Self {
        Self {
            time: Unit::MILLISECOND,
            voltage: Unit::MILLIVOLT,
            current: Unit::NANOAMPERE,
            conductance: Unit::MICROSIEMENS,
        }
    }

    /// Coherent SI units, as used by equation-based simulators
    pub const fn si() -> Self {
        Self {
            time: Unit::SECOND,
            voltage: Unit::VOLT,
            current: Unit::AMPERE,
            conductance: Unit::SIEMENS,
        }
    }

    /// ms, mV, pA, nS
    pub const fn nest() -> Self {
        Self {
            time: Unit::MILLISECOND,
            voltage: Unit::MILLIVOLT,
            current: Unit::PICOAMPERE,
            conductance: Unit::NANOSIEMENS,
        }
    }

    pub fn unit_for(&self, dimension: Dimension) -> Unit {
        match dimension {
            Dimension::Dimensionless => Unit::DIMENSIONLESS,
            Dimension::Time => self.time,
            Dimension::Voltage => self.voltage,
            Dimension::Current => self.current,
            Dimension::Conductance => self.conductance,
        }
    }

    /// Factor converting a value of `dimension` from `self` into `target`
    pub fn factor_to(&self, target: &UnitSystem, dimension: Dimension) -> Result<f64, UnitError> {
        self.unit_for(dimension).factor_to(target.unit_for(dimension))
    }
}

impl Default for UnitSystem {
    fn default() -> Self {
        Self::logical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_to_si_factors() {
        let logical = UnitSystem::logical();
        let si = UnitSystem::si();
        let weight = logical.factor_to(&si, Dimension::Current).unwrap();
        assert!((weight - 1e-9).abs() < 1e-21);
        let time = logical.factor_to(&si, Dimension::Time).unwrap();
        assert!((time - 1e-3).abs() < 1e-15);
        assert_eq!(logical.factor_to(&si, Dimension::Dimensionless).unwrap(), 1.0);
    }

    #[test]
    fn test_logical_to_nest_factors() {
        let logical = UnitSystem::logical();
        let nest = UnitSystem::nest();
        let current = logical.factor_to(&nest, Dimension::Current).unwrap();
        assert!((current - 1000.0).abs() < 1e-9);
        let conductance = logical.factor_to(&nest, Dimension::Conductance).unwrap();
        assert!((conductance - 1000.0).abs() < 1e-9);
        assert_eq!(logical.factor_to(&nest, Dimension::Time).unwrap(), 1.0);
    }

    #[test]
    fn test_incompatible_dimensions() {
        let err = Unit::MILLIVOLT.factor_to(Unit::SIEMENS).unwrap_err();
        assert!(matches!(err, UnitError::Incompatible { .. }));
    }
}

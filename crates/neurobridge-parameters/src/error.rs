// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for parameter translation and evaluation

use crate::units::Dimension;

/// Errors raised while building, binding or evaluating a translation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslationError {
    /// An expression references a name that is not in its namespace
    #[error("name '{name}' is not defined (in expression '{expression}')")]
    UndefinedName { name: String, expression: String },

    #[error("division by zero while evaluating '{expression}'")]
    DivideByZero { expression: String },

    #[error("math domain error: {function}({value}) in '{expression}'")]
    Domain {
        function: &'static str,
        value: f64,
        expression: String,
    },

    #[error("syntax error in expression '{expression}' at offset {offset}: {message}")]
    Syntax {
        expression: String,
        offset: usize,
        message: String,
    },

    /// Forward translation of a name the table does not know
    #[error("no translation rule for parameter '{0}'")]
    UnknownParameter(String),

    #[error(transparent)]
    Unit(#[from] UnitError),
}

/// Unit conversion errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("cannot convert {from} ({from_dimension:?}) to {to} ({to_dimension:?})")]
    Incompatible {
        from: &'static str,
        from_dimension: Dimension,
        to: &'static str,
        to_dimension: Dimension,
    },
}

/// Errors raised by [`ParameterSpace`](crate::ParameterSpace) operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("parameter '{0}' needs a shape before it can be evaluated")]
    ShapeRequired(String),

    #[error("parameter '{name}' has {actual} values but the shape is {expected}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("parameter '{0}' has not been evaluated")]
    NotEvaluated(String),

    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error(transparent)]
    Translation(#[from] TranslationError),
}

pub type TranslationResult<T> = Result<T, TranslationError>;
pub type ParameterResult<T> = Result<T, ParameterError>;

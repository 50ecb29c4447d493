//! Error Types
//!
//! Two layers of errors live here:
//!
//! - [`ComputeError`] is what a computation function returns when it cannot
//!   produce a value from its arguments (empty data, wrong column type, ...).
//! - [`TallyError`] is what the engine returns. Wiring mistakes
//!   (`UnknownInput`, `DuplicateInput`, `CycleDetected`, ...) surface at
//!   construction time; `Computation` and `Unavailable` surface per node at
//!   evaluation time and never abort a recompute pass.
//!
//! Both are `Clone` so a single outcome can be handed to several sinks.

use serde::Serialize;
use thiserror::Error;

use crate::graph::NodeId;

/// Result alias used throughout the engine.
pub type Result<T, E = TallyError> = std::result::Result<T, E>;

/// Errors raised by the engine.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TallyError {
    #[error("input '{name}' was never declared")]
    UnknownInput { name: String },

    #[error("input '{name}' is already declared")]
    DuplicateInput { name: String },

    #[error("node '{id}' was never declared")]
    UnknownNode { id: NodeId },

    #[error("node '{id}' is already declared")]
    DuplicateNode { id: NodeId },

    #[error("node '{id}' shadows an input with the same name")]
    NameCollision { id: NodeId },

    #[error("adding node '{node}' would create a cycle: {}", .path.join(" -> "))]
    CycleDetected { node: NodeId, path: Vec<String> },

    #[error("node '{node}' failed: {cause}")]
    Computation { node: NodeId, cause: ComputeError },

    #[error("node '{node}' is unavailable because '{upstream}' failed")]
    Unavailable { node: NodeId, upstream: NodeId },

    #[error(transparent)]
    DatasetParse(#[from] DatasetParseError),

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl TallyError {
    /// Whether this is the informational "not enough data" case rather than a
    /// genuine failure.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            TallyError::Computation {
                cause: ComputeError::InsufficientData { .. },
                ..
            }
        )
    }

    /// Whether this error describes a wiring mistake that should abort startup.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            TallyError::UnknownInput { .. }
                | TallyError::DuplicateInput { .. }
                | TallyError::UnknownNode { .. }
                | TallyError::DuplicateNode { .. }
                | TallyError::NameCollision { .. }
                | TallyError::CycleDetected { .. }
        )
    }
}

/// Failure of a single computation function.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComputeError {
    #[error("not enough data to compute {what}")]
    InsufficientData { what: String },

    #[error("column '{column}' is not numeric")]
    NonNumericColumn { column: String },

    #[error("column '{column}' does not exist")]
    UnknownColumn { column: String },

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("argument '{name}' is not a dependency of this node")]
    MissingArgument { name: String },

    #[error("{message}")]
    Failed { message: String },
}

impl ComputeError {
    pub fn insufficient(what: impl Into<String>) -> Self {
        ComputeError::InsufficientData { what: what.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ComputeError::Failed {
            message: message.into(),
        }
    }
}

/// Failure to turn delimited text into a table.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("dataset parse error on line {line}: {reason}")]
pub struct DatasetParseError {
    /// 1-based line number where the problem was found.
    pub line: usize,
    pub reason: String,
}

impl DatasetParseError {
    pub fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

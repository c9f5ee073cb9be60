//! Error types for the association engine.

use thiserror::Error;

use crate::tracker::{ClassId, InstanceId};

/// Errors surfaced to the caller of an association step.
///
/// Recoverable conditions (empty cluster sets, cardinality mismatches,
/// unresolved disappearances) never show up here; they are resolved locally.
#[derive(Debug, Error)]
pub enum AssocError {
    /// A required threshold or foreground class entry is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Input blocks disagree on their dimensions.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// An id would be shared by two owners, or a cluster would carry two ids.
    #[error(
        "invariant violation for class {class_id}, cluster {cluster_id:?}: {reason} (ids {ids:?})"
    )]
    InvariantViolation {
        class_id: ClassId,
        cluster_id: Option<i32>,
        ids: Vec<InstanceId>,
        reason: &'static str,
    },

    /// The assignment solver could not produce a matching.
    #[error("assignment failed: {0}")]
    Assignment(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, AssocError>;

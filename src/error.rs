//! Error types for the irtree object model.
//!
//! Index queries never fail; errors only arise at the entity layer (missing
//! or duplicate children), when reading configuration, and when moving
//! records in and out of JSON.

use thiserror::Error;

use crate::core::id::{NodeId, NodeKind};

/// Main error type for irtree operations.
#[derive(Debug, Error)]
pub enum IrError {
    /// A child was looked up or detached but its owner does not hold it
    #[error("{kind} {id} not found")]
    NotFound { kind: NodeKind, id: NodeId },

    /// A child was attached twice to the same owner
    #[error("{kind} {id} already present")]
    Duplicate { kind: NodeKind, id: NodeId },

    /// Structurally invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IrError {
    pub(crate) fn not_found(kind: NodeKind, id: NodeId) -> Self {
        IrError::NotFound { kind, id }
    }

    pub(crate) fn duplicate(kind: NodeKind, id: NodeId) -> Self {
        IrError::Duplicate { kind, id }
    }
}

impl From<serde_json::Error> for IrError {
    fn from(err: serde_json::Error) -> Self {
        IrError::Serialization(err.to_string())
    }
}

/// Result type alias for irtree operations
pub type Result<T> = std::result::Result<T, IrError>;

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for inventory operations
//!
//! Two layers exist:
//!
//! - [`BackendError`] is what storage engines report through the backend
//!   contract, including the backend-internal [`BackendError::ElementNotFound`]
//! - [`InventoryError`] is what API callers see
//!
//! `From<BackendError> for InventoryError` is the only crossing point; the
//! backend-internal not-found kind is translated there and never escapes.

use thiserror::Error;

use crate::model::ModelError;
use crate::path::{CanonicalPath, PathError};

/// What a not-found lookup was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    Entity,
    Relationship,
}

/// Errors reported by storage engines
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackendError {
    /// Backend-internal lookup failure
    #[error("Element not found: {description}")]
    ElementNotFound {
        kind: NotFoundKind,
        description: String,
    },

    #[error("Element already exists: {0}")]
    AlreadyExists(CanonicalPath),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The transaction was rolled back; nothing it wrote is visible
    #[error("Commit failed: {0}")]
    CommitFailure(String),

    #[error("Transaction is no longer open")]
    TransactionClosed,

    /// Driver or storage level failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BackendError {
    pub fn entity_not_found(path: &CanonicalPath) -> Self {
        BackendError::ElementNotFound {
            kind: NotFoundKind::Entity,
            description: path.to_string(),
        }
    }

    pub fn relationship_not_found(description: impl Into<String>) -> Self {
        BackendError::ElementNotFound {
            kind: NotFoundKind::Relationship,
            description: description.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::ElementNotFound { .. })
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

impl From<PathError> for BackendError {
    fn from(err: PathError) -> Self {
        BackendError::InvalidArgument(err.to_string())
    }
}

impl From<ModelError> for BackendError {
    fn from(err: ModelError) -> Self {
        BackendError::InvalidArgument(err.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Storage(err.to_string())
    }
}

/// Errors visible to API callers
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InventoryError {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Relationship not found: {0}")]
    RelationNotFound(String),

    #[error("Entity already exists: {0}")]
    EntityAlreadyExists(CanonicalPath),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("Commit failed: {0}")]
    CommitFailure(String),

    /// Anything else a backend reported
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for API operations
pub type InventoryResult<T> = Result<T, InventoryError>;

impl From<BackendError> for InventoryError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::ElementNotFound {
                kind: NotFoundKind::Entity,
                description,
            } => InventoryError::EntityNotFound(description),
            BackendError::ElementNotFound {
                kind: NotFoundKind::Relationship,
                description,
            } => InventoryError::RelationNotFound(description),
            BackendError::AlreadyExists(path) => InventoryError::EntityAlreadyExists(path),
            BackendError::InvalidArgument(msg) => InventoryError::InvalidArgument(msg),
            BackendError::CommitFailure(msg) => InventoryError::CommitFailure(msg),
            closed @ BackendError::TransactionClosed => InventoryError::Backend(closed.to_string()),
            BackendError::Storage(msg) => InventoryError::Backend(msg),
        }
    }
}

impl From<ModelError> for InventoryError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Path(path) => InventoryError::InvalidPath(path),
            other => InventoryError::InvalidArgument(other.to_string()),
        }
    }
}

impl InventoryError {
    /// Whether the error is an expected "absent" outcome callers branch on
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            InventoryError::EntityNotFound(_) | InventoryError::RelationNotFound(_)
        )
    }
}

//! Error types for shape-guard

use thiserror::Error;

use crate::graph::ShapeId;
use crate::nullability::NullabilityError;

/// Result type for shape-guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Top-level errors
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Nullability error: {0}")]
    Nullability(#[from] NullabilityError),

    #[error("History error: {0}")]
    History(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
}

/// Errors raised while building or loading a shape graph
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid shape id: {0}")]
    InvalidShapeId(String),

    #[error("Duplicate shape: {0}")]
    DuplicateShape(ShapeId),

    #[error("Shape {from} references missing shape {missing}")]
    DanglingReference { from: ShapeId, missing: ShapeId },

    #[error("Shape {id} is a {kind} and cannot have members")]
    NotAContainer { id: ShapeId, kind: String },

    #[error("Replacement for unknown shape: {0}")]
    UnknownReplacement(ShapeId),

    #[error("Replacement for {id} changes its kind from {old} to {new}")]
    KindChanged { id: ShapeId, old: String, new: String },

    #[error("Invalid model format in {source_name}: {message}")]
    InvalidModel { source_name: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while reading or writing an exception snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot must be a JSON object of service id to shape id arrays: {0}")]
    InvalidFormat(String),

    #[error("Invalid shape id in snapshot for {service}: {value}")]
    InvalidEntry { service: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

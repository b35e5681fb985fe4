//! shape-guard
//!
//! Build-time analyses over a service's shape graph.
//!
//! ## Features
//!
//! - **Validation Requirement Index**: which operations need input validation
//!   and which containers must emit a validation helper, by containment closure
//! - **Nullability Compatibility Engine**: snapshot-governed default backfill
//!   and a cross-version diff of derived nullability properties
//! - **Exception Snapshot**: auditable per-service allow-list of shapes that
//!   keep their historical zero-default behavior
//!
//! ## Architecture
//!
//! ```text
//! graph (shapes, tags, relationships)
//!   ├── resolver      is_required / is_nullable / is_pointer_like / ...
//!   ├── validation    seed + propagate over containment edges
//!   └── nullability
//!         ├── snapshot   service -> allowed shape ids
//!         ├── backfill   snapshot -> new graph with zero defaults
//!         ├── diff       old vs new derived properties -> Diagnostics
//!         ├── audit      snapshot coverage / capture
//!         └── engine     backfill + diff + audit
//! ```
//!
//! Every entry point takes whole immutable graphs and returns fresh values.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod history;
pub mod nullability;
pub mod resolver;
pub mod validation;

pub use config::{GuardConfig, ReportFormat};
pub use diagnostics::{DiagnosticCode, DiagnosticItem, DiagnosticReport, Diagnostics, Severity};
pub use error::{GraphError, GuardError, Result, SnapshotError};
pub use graph::{
    DefaultValue, MemberDef, Relationship, SchemaGraph, SchemaGraphBuilder, Shape, ShapeId,
    ShapeKind, Tag, TagKind, TagSet,
};
pub use nullability::{
    backfill, evaluate, BackfillOutcome, CompatibilityEngine, CompatibilityOutcome,
    ExceptionSnapshot, NullabilityError,
};
pub use resolver::CheckMode;
pub use validation::{ServiceValidation, ValidationIndex, ValidationOptions};

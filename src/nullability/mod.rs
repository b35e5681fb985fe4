//! Nullability Compatibility Engine
//!
//! Keeps the derived nullability of shapes stable across model revisions for
//! services enrolled in an exception snapshot.
//!
//! - [`snapshot`]: the per-service allow-list of shapes that receive a
//!   backfilled zero default
//! - [`backfill`]: applies the snapshot to a graph, then checks that no
//!   untracked member silently depends on a backfilled root
//! - [`diff`]: compares derived properties of two graph versions
//! - [`audit`]: snapshot coverage checks and snapshot capture
//! - [`engine`]: the full run over an old/new pair

pub mod audit;
pub mod backfill;
pub mod diff;
pub mod engine;
pub mod snapshot;

pub use audit::{audit_snapshot, capture_entries};
pub use backfill::{backfill, BackfillOutcome};
pub use diff::{evaluate, DerivedProperties};
pub use engine::{CompatibilityEngine, CompatibilityOutcome};
pub use snapshot::ExceptionSnapshot;

use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::error::GraphError;
use crate::graph::{ShapeId, ShapeKind};

/// Configuration inconsistencies and compatibility failures
#[derive(Error, Debug)]
pub enum NullabilityError {
    #[error("Snapshot member {member} targets {target}, a {kind}; only boolean and numeric targets can be backfilled")]
    UnsupportedTarget {
        member: ShapeId,
        target: ShapeId,
        kind: ShapeKind,
    },

    #[error("Snapshot shape {id} is a {kind}; only boolean and numeric shapes can be backfilled")]
    UnsupportedKind { id: ShapeId, kind: ShapeKind },

    #[error("Snapshot member {0} has no target")]
    MissingTarget(ShapeId),

    #[error(
        "Members of {service} target backfilled shapes but are not in the exception snapshot: {}. Update the snapshot to include them",
        join_ids(.members)
    )]
    UntrackedMembers {
        service: ShapeId,
        members: Vec<ShapeId>,
    },

    #[error("Exception snapshot for {service} is out of date:\n{}", .problems.join("\n"))]
    SnapshotOutOfDate {
        service: ShapeId,
        problems: Vec<String>,
    },

    #[error("{} nullability compatibility violation(s) in {service}:\n{report}", .report.error_count())]
    Violations { service: ShapeId, report: Diagnostics },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

fn join_ids(ids: &[ShapeId]) -> String {
    ids.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
}

impl NullabilityError {
    /// Violation report, when the failure is a compatibility failure
    pub fn report(&self) -> Option<&Diagnostics> {
        match self {
            Self::Violations { report, .. } => Some(report),
            _ => None,
        }
    }
}

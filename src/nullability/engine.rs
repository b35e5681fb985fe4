//! Compatibility run over an old/new graph pair

use super::audit::audit_snapshot;
use super::backfill::backfill;
use super::diff::evaluate;
use super::snapshot::ExceptionSnapshot;
use super::NullabilityError;
use crate::diagnostics::Diagnostics;
use crate::graph::{SchemaGraph, ShapeId};
use crate::resolver::CheckMode;

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct CompatibilityOutcome {
    /// The new graph with snapshot defaults applied
    pub graph: SchemaGraph,
    /// Informational events (stale snapshot entries)
    pub report: Diagnostics,
    /// Shapes of the new graph that received a default
    pub backfilled: Vec<ShapeId>,
    /// False when the service has no snapshot entry and was passed through
    pub enrolled: bool,
}

/// Snapshot-governed nullability compatibility checks
#[derive(Debug, Clone)]
pub struct CompatibilityEngine {
    snapshot: ExceptionSnapshot,
    mode: CheckMode,
}

impl CompatibilityEngine {
    pub fn new(snapshot: ExceptionSnapshot) -> Self {
        Self {
            snapshot,
            mode: CheckMode::default(),
        }
    }

    pub fn with_check_mode(mut self, mode: CheckMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn snapshot(&self) -> &ExceptionSnapshot {
        &self.snapshot
    }

    pub fn check_mode(&self) -> CheckMode {
        self.mode
    }

    /// Backfill both versions, diff them, and audit the snapshot.
    ///
    /// Services without a snapshot entry are returned unchanged. Any
    /// compatibility violation fails the run with the complete report.
    pub fn run(
        &self,
        service: &ShapeId,
        old: &SchemaGraph,
        new: &SchemaGraph,
    ) -> Result<CompatibilityOutcome, NullabilityError> {
        if !self.snapshot.is_enrolled(service) {
            tracing::info!(service = %service, "Service not enrolled in exception snapshot; skipping");
            return Ok(CompatibilityOutcome {
                graph: new.clone(),
                report: Diagnostics::new(),
                backfilled: Vec::new(),
                enrolled: false,
            });
        }

        let old_backfilled = backfill(old, service, &self.snapshot)?;
        let new_backfilled = backfill(new, service, &self.snapshot)?;

        let mut report = evaluate(
            &old_backfilled.graph,
            &new_backfilled.graph,
            service,
            &self.snapshot,
            self.mode,
        );
        for id in &new_backfilled.missing {
            report.stale_snapshot_entry(id, service);
        }

        if report.has_errors() {
            tracing::warn!(service = %service, violations = report.error_count(), "Nullability compatibility check failed");
            return Err(NullabilityError::Violations {
                service: service.clone(),
                report,
            });
        }

        audit_snapshot(&new_backfilled.graph, service, &self.snapshot)?;

        tracing::info!(
            service = %service,
            backfilled = new_backfilled.backfilled.len(),
            stale = report.info_count(),
            "Nullability compatibility check passed"
        );

        Ok(CompatibilityOutcome {
            graph: new_backfilled.graph,
            report,
            backfilled: new_backfilled.backfilled,
            enrolled: true,
        })
    }
}

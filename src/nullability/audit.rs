//! Snapshot coverage audit and capture
//!
//! After a successful diff, the backfilled graph and the snapshot must agree:
//! every defaulted boolean/numeric root in the service namespace is tracked,
//! and every tracked shape carries the zero default of its value kind.

use std::collections::BTreeSet;

use super::snapshot::ExceptionSnapshot;
use super::NullabilityError;
use crate::graph::{DefaultValue, SchemaGraph, Shape, ShapeId, ShapeKind};

/// Boolean/numeric roots in the service's namespace that carry a default
fn defaulted_roots<'g>(graph: &'g SchemaGraph, service: &ShapeId) -> Vec<&'g Shape> {
    let namespace = service.namespace();
    let mut roots: Vec<&Shape> = graph
        .shapes()
        .filter(|s| !s.is_member() && s.kind.has_zero_value())
        .filter(|s| s.id.namespace() == namespace && s.default_value().is_some())
        .collect();
    roots.sort_by(|a, b| a.id.cmp(&b.id));
    roots
}

fn is_zero_for(kind: ShapeKind, value: &DefaultValue) -> bool {
    match value {
        DefaultValue::Boolean(_) => kind.is_boolean() && value.is_zero_value(),
        DefaultValue::Number(_) => kind.is_number() && value.is_zero_value(),
        DefaultValue::String(_) | DefaultValue::Other(_) => false,
    }
}

/// Snapshot entries for a service: every defaulted boolean/numeric root in
/// its namespace.
pub fn capture_entries(graph: &SchemaGraph, service: &ShapeId) -> BTreeSet<ShapeId> {
    defaulted_roots(graph, service)
        .into_iter()
        .map(|s| s.id.clone())
        .collect()
}

/// Check that the backfilled graph and the snapshot agree.
pub fn audit_snapshot(
    graph: &SchemaGraph,
    service: &ShapeId,
    snapshot: &ExceptionSnapshot,
) -> Result<(), NullabilityError> {
    let empty = BTreeSet::new();
    let entries = snapshot.for_service(service).unwrap_or(&empty);
    let mut problems = Vec::new();

    for root in defaulted_roots(graph, service) {
        if !entries.contains(&root.id) {
            problems.push(format!("{} has a default but is not in the snapshot", root.id));
        }
    }

    for id in entries {
        let Some(shape) = graph.get(id) else { continue };

        let value_kind = if shape.is_member() {
            graph.member_target(id).and_then(|t| graph.get(t)).map(|t| t.kind)
        } else {
            Some(shape.kind)
        };

        let ok = match (value_kind, shape.default_value()) {
            (Some(kind), Some(value)) => is_zero_for(kind, value),
            _ => false,
        };
        if !ok {
            let found = shape
                .default_value()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "no default".to_string());
            problems.push(format!("{} should carry a zero default but has {}", id, found));
        }
    }

    if problems.is_empty() {
        tracing::debug!(service = %service, entries = entries.len(), "Snapshot coverage verified");
        Ok(())
    } else {
        Err(NullabilityError::SnapshotOutOfDate {
            service: service.clone(),
            problems,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MemberDef, Tag};

    fn graph() -> SchemaGraph {
        SchemaGraph::builder()
            .shape(Shape::new("ns#Flag", ShapeKind::Boolean).with_tag(Tag::Default(DefaultValue::Boolean(false))))
            .shape(Shape::new("ns#Size", ShapeKind::Integer).with_tag(Tag::Default(DefaultValue::Number(5.into()))))
            .shape(Shape::new("ns#Plain", ShapeKind::Integer))
            .shape(Shape::new("other#Flag", ShapeKind::Boolean).with_tag(Tag::Default(DefaultValue::Boolean(false))))
            .container(
                Shape::new("ns#Foo", ShapeKind::Structure),
                [MemberDef::new("size", "ns#Plain").with_tag(Tag::Default(DefaultValue::Number(0.into())))],
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_capture_is_namespace_scoped() {
        let entries = capture_entries(&graph(), &ShapeId::from("ns#Svc"));
        let ids: Vec<&str> = entries.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["ns#Flag", "ns#Size"]);
    }

    #[test]
    fn test_audit_reports_untracked_and_non_zero() {
        let svc = ShapeId::from("ns#Svc");
        let mut snapshot = ExceptionSnapshot::new();
        snapshot.insert(svc.clone(), ShapeId::from("ns#Flag"));
        snapshot.insert(svc.clone(), ShapeId::from("ns#Plain"));

        match audit_snapshot(&graph(), &svc, &snapshot) {
            Err(NullabilityError::SnapshotOutOfDate { problems, .. }) => {
                assert_eq!(problems.len(), 2);
                assert!(problems[0].starts_with("ns#Size"));
                assert!(problems[1].starts_with("ns#Plain"));
            }
            other => panic!("expected audit failure, got {:?}", other),
        }
    }

    #[test]
    fn test_audit_accepts_zero_defaults() {
        let svc = ShapeId::from("ns#Svc");
        let graph = SchemaGraph::builder()
            .shape(Shape::new("ns#Flag", ShapeKind::Boolean).with_tag(Tag::Default(DefaultValue::Boolean(false))))
            .shape(Shape::new("ns#Plain", ShapeKind::Integer))
            .container(
                Shape::new("ns#Foo", ShapeKind::Structure),
                [MemberDef::new("size", "ns#Plain").with_tag(Tag::Default(DefaultValue::Number(0.into())))],
            )
            .build()
            .unwrap();
        let mut snapshot = ExceptionSnapshot::new();
        snapshot.insert(svc.clone(), ShapeId::from("ns#Flag"));
        snapshot.insert(svc.clone(), ShapeId::from("ns#Foo$size"));
        snapshot.insert(svc.clone(), ShapeId::from("ns#Removed"));

        assert!(audit_snapshot(&graph, &svc, &snapshot).is_ok());
    }
}

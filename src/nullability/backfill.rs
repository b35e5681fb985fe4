//! Snapshot-governed default backfill
//!
//! Every snapshot entry of a service receives the zero default of its value
//! kind (`false` / `0`) unless it already carries a default. Backfilled shapes
//! also lose any `Box` tag. The result is a new graph; the input is untouched.

use std::collections::BTreeSet;

use super::snapshot::ExceptionSnapshot;
use super::NullabilityError;
use crate::graph::{Relationship, SchemaGraph, Shape, ShapeId, Tag, TagKind};

/// Result of backfilling one service
#[derive(Debug, Clone)]
pub struct BackfillOutcome {
    pub graph: SchemaGraph,
    /// Entries that received a default, in id order
    pub backfilled: Vec<ShapeId>,
    /// Entries skipped because they already carry a default
    pub already_defaulted: Vec<ShapeId>,
    /// Entries absent from the graph
    pub missing: Vec<ShapeId>,
}

/// Apply the service's snapshot entries to `graph`.
///
/// Fails fast on entries that cannot carry a zero default and on members that
/// target a root backfilled by this call without being tracked themselves.
pub fn backfill(
    graph: &SchemaGraph,
    service: &ShapeId,
    snapshot: &ExceptionSnapshot,
) -> Result<BackfillOutcome, NullabilityError> {
    let empty = BTreeSet::new();
    let entries = snapshot.for_service(service).unwrap_or(&empty);

    let mut backfilled = Vec::new();
    let mut already_defaulted = Vec::new();
    let mut missing = Vec::new();
    let mut replacements = Vec::new();

    for id in entries {
        let Some(shape) = graph.get(id) else {
            tracing::warn!(service = %service, shape = %id, "Snapshot entry not found in model; skipping");
            missing.push(id.clone());
            continue;
        };
        if shape.has_tag(TagKind::Default) {
            already_defaulted.push(id.clone());
            continue;
        }

        let zero = if shape.is_member() {
            let target_id = graph
                .member_target(id)
                .ok_or_else(|| NullabilityError::MissingTarget(id.clone()))?;
            let target = graph
                .get(target_id)
                .ok_or_else(|| NullabilityError::MissingTarget(id.clone()))?;
            target.kind.zero_value().ok_or_else(|| NullabilityError::UnsupportedTarget {
                member: id.clone(),
                target: target_id.clone(),
                kind: target.kind,
            })?
        } else {
            shape.kind.zero_value().ok_or_else(|| NullabilityError::UnsupportedKind {
                id: id.clone(),
                kind: shape.kind,
            })?
        };

        tracing::debug!(shape = %id, default = %zero, "Backfilling default");
        replacements.push(shape.clone().without_tag(TagKind::Box).with_tag(Tag::Default(zero)));
        backfilled.push(id.clone());
    }

    let next = graph.with_replaced_shapes(replacements)?;
    check_closure(&next, service, entries, &backfilled)?;

    tracing::info!(
        service = %service,
        backfilled = backfilled.len(),
        already_defaulted = already_defaulted.len(),
        missing = missing.len(),
        "Backfilled snapshot defaults"
    );

    Ok(BackfillOutcome {
        graph: next,
        backfilled,
        already_defaulted,
        missing,
    })
}

/// Every structure/union member targeting a freshly backfilled root must
/// itself be tracked or carry a default.
fn check_closure(
    graph: &SchemaGraph,
    service: &ShapeId,
    entries: &BTreeSet<ShapeId>,
    backfilled: &[ShapeId],
) -> Result<(), NullabilityError> {
    let defaulted_roots: BTreeSet<&ShapeId> = backfilled
        .iter()
        .filter(|id| graph.get(id).map(|s| !s.is_member()).unwrap_or(false))
        .collect();

    if defaulted_roots.is_empty() {
        return Ok(());
    }

    let mut untracked: Vec<ShapeId> = graph
        .member_shapes()
        .filter(|member| !entries.contains(&member.id) && !member.has_tag(TagKind::Default))
        .filter(|member| {
            graph
                .member_target(&member.id)
                .map(|target| defaulted_roots.contains(target))
                .unwrap_or(false)
        })
        .filter(|member| is_structural_member(graph, member))
        .map(|member| member.id.clone())
        .collect();

    if untracked.is_empty() {
        return Ok(());
    }

    untracked.sort();
    Err(NullabilityError::UntrackedMembers {
        service: service.clone(),
        members: untracked,
    })
}

/// Collection members take their nullability from sparseness, not defaults
fn is_structural_member(graph: &SchemaGraph, member: &Shape) -> bool {
    matches!(
        graph.member_container(&member.id),
        Some((_, Relationship::StructureMember | Relationship::UnionMember))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DefaultValue, MemberDef, ShapeKind};

    fn snapshot(service: &str, ids: &[&str]) -> ExceptionSnapshot {
        let mut snapshot = ExceptionSnapshot::new();
        for id in ids {
            snapshot.insert(ShapeId::from(service), ShapeId::from(*id));
        }
        snapshot
    }

    #[test]
    fn test_member_gets_target_zero_value() {
        let graph = SchemaGraph::builder()
            .shape(Shape::new("S.Foo#Count", ShapeKind::Integer))
            .container(
                Shape::new("S.Foo#Foo", ShapeKind::Structure),
                [MemberDef::new("bar", "S.Foo#Count").with_tag(Tag::Box)],
            )
            .build()
            .unwrap();
        let svc = ShapeId::from("S.Foo#Svc");
        let outcome = backfill(&graph, &svc, &snapshot("S.Foo#Svc", &["S.Foo#Foo$bar"])).unwrap();

        let member = outcome.graph.get(&ShapeId::from("S.Foo#Foo$bar")).unwrap();
        assert_eq!(member.default_value(), Some(&DefaultValue::Number(0.into())));
        assert!(!member.has_tag(TagKind::Box));
        assert_eq!(outcome.backfilled, vec![ShapeId::from("S.Foo#Foo$bar")]);
        assert!(graph.get(&ShapeId::from("S.Foo#Foo$bar")).unwrap().default_value().is_none());
    }

    #[test]
    fn test_root_boolean_and_missing_entries() {
        let graph = SchemaGraph::builder()
            .shape(Shape::new("ns#Flag", ShapeKind::Boolean))
            .build()
            .unwrap();
        let outcome = backfill(
            &graph,
            &ShapeId::from("ns#Svc"),
            &snapshot("ns#Svc", &["ns#Flag", "ns#Gone"]),
        )
        .unwrap();

        let flag = outcome.graph.get(&ShapeId::from("ns#Flag")).unwrap();
        assert_eq!(flag.default_value(), Some(&DefaultValue::Boolean(false)));
        assert_eq!(outcome.missing, vec![ShapeId::from("ns#Gone")]);
    }

    #[test]
    fn test_idempotent() {
        let graph = SchemaGraph::builder()
            .shape(Shape::new("ns#Count", ShapeKind::Long))
            .build()
            .unwrap();
        let svc = ShapeId::from("ns#Svc");
        let snap = snapshot("ns#Svc", &["ns#Count"]);

        let once = backfill(&graph, &svc, &snap).unwrap();
        let twice = backfill(&once.graph, &svc, &snap).unwrap();
        assert_eq!(once.graph, twice.graph);
        assert!(twice.backfilled.is_empty());
        assert_eq!(twice.already_defaulted, vec![ShapeId::from("ns#Count")]);
    }

    #[test]
    fn test_string_target_is_configuration_error() {
        let graph = SchemaGraph::builder()
            .shape(Shape::new("ns#Name", ShapeKind::String))
            .container(
                Shape::new("ns#Foo", ShapeKind::Structure),
                [MemberDef::new("name", "ns#Name")],
            )
            .build()
            .unwrap();
        let result = backfill(
            &graph,
            &ShapeId::from("ns#Svc"),
            &snapshot("ns#Svc", &["ns#Foo$name"]),
        );
        assert!(matches!(result, Err(NullabilityError::UnsupportedTarget { .. })));

        let root = backfill(&graph, &ShapeId::from("ns#Svc"), &snapshot("ns#Svc", &["ns#Name"]));
        assert!(matches!(root, Err(NullabilityError::UnsupportedKind { .. })));
    }

    #[test]
    fn test_closure_check_names_untracked_members() {
        let graph = SchemaGraph::builder()
            .shape(Shape::new("S.Root#Z", ShapeKind::Integer))
            .container(
                Shape::new("S.X#X", ShapeKind::Structure),
                [MemberDef::new("y", "S.Root#Z")],
            )
            .container(Shape::new("S.X#Zs", ShapeKind::List), [MemberDef::new("member", "S.Root#Z")])
            .build()
            .unwrap();

        let err = backfill(&graph, &ShapeId::from("S.X#Svc"), &snapshot("S.X#Svc", &["S.Root#Z"])).unwrap_err();
        match err {
            NullabilityError::UntrackedMembers { members, .. } => {
                assert_eq!(members, vec![ShapeId::from("S.X#X$y")]);
            }
            other => panic!("expected closure failure, got {:?}", other),
        }
        let tracked = snapshot("S.X#Svc", &["S.Root#Z", "S.X#X$y"]);
        assert!(backfill(&graph, &ShapeId::from("S.X#Svc"), &tracked).is_ok());
    }

    #[test]
    fn test_closure_check_skips_roots_with_existing_default() {
        let graph = SchemaGraph::builder()
            .shape(Shape::new("S.Root#Z", ShapeKind::Integer).with_tag(Tag::Default(DefaultValue::Number(0.into()))))
            .container(
                Shape::new("S.X#X", ShapeKind::Structure),
                [MemberDef::new("y", "S.Root#Z")],
            )
            .build()
            .unwrap();

        let outcome = backfill(&graph, &ShapeId::from("S.X#Svc"), &snapshot("S.X#Svc", &["S.Root#Z"])).unwrap();
        assert!(outcome.backfilled.is_empty());
        assert_eq!(outcome.already_defaulted, vec![ShapeId::from("S.Root#Z")]);
    }
}

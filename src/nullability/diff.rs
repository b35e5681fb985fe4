//! Cross-version diff of derived nullability properties
//!
//! Collects every violation rather than stopping at the first one.

use serde::Serialize;

use super::snapshot::ExceptionSnapshot;
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::graph::{SchemaGraph, Shape, ShapeId, TagKind};
use crate::resolver::{self, CheckMode};

/// Derived properties compared between graph versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedProperties {
    pub is_member: bool,
    /// Nullability from `required`/`default` alone, regardless of input
    /// structures
    pub nullable: bool,
    /// Nullability under the engine's check mode
    pub member_nullable: bool,
    pub nillable: bool,
    pub pointer_like: bool,
    pub dereferenceable: bool,
}

impl DerivedProperties {
    pub fn of(graph: &SchemaGraph, shape: &Shape, mode: CheckMode) -> Self {
        Self {
            is_member: shape.is_member(),
            nullable: resolver::is_nullable(graph, shape, CheckMode::Server),
            member_nullable: resolver::is_member_nullable(graph, shape, mode),
            nillable: resolver::is_nillable(graph, shape),
            pointer_like: resolver::is_pointer_like(graph, shape),
            dereferenceable: resolver::is_dereferenceable(graph, shape),
        }
    }

    fn compared(&self) -> [(DiagnosticCode, bool); 5] {
        [
            (DiagnosticCode::ChangedNullable, self.nullable),
            (DiagnosticCode::ChangedMemberNullable, self.member_nullable),
            (DiagnosticCode::ChangedNillable, self.nillable),
            (DiagnosticCode::ChangedPointerLike, self.pointer_like),
            (DiagnosticCode::ChangedDereferenceable, self.dereferenceable),
        ]
    }
}

/// Root boolean/numeric shape that gained a default between versions
fn is_newly_defaulted(old: Option<&Shape>, new: &Shape) -> bool {
    if new.is_member() || !new.kind.has_zero_value() || !new.has_tag(TagKind::Default) {
        return false;
    }
    match old {
        None => true,
        Some(old) => !old.has_tag(TagKind::Default),
    }
}

/// Compare two versions of a service's graph.
///
/// Both graphs are expected to be backfilled with the same snapshot.
pub fn evaluate(
    old: &SchemaGraph,
    new: &SchemaGraph,
    service: &ShapeId,
    snapshot: &ExceptionSnapshot,
    mode: CheckMode,
) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    let mut ids: Vec<&ShapeId> = new.shapes().map(|s| &s.id).collect();
    ids.sort();

    for id in ids {
        let Some(new_shape) = new.get(id) else { continue };
        let old_shape = old.get(id);

        if is_newly_defaulted(old_shape, new_shape) && !snapshot.contains(service, id) {
            diagnostics.unregistered_default(id, service);
        }

        let Some(old_shape) = old_shape else { continue };

        if old_shape.is_member() != new_shape.is_member() {
            diagnostics.member_ness_changed(id, old_shape.is_member());
            continue;
        }

        let before = DerivedProperties::of(old, old_shape, mode);
        let after = DerivedProperties::of(new, new_shape, mode);
        for ((code, was), (_, now)) in before.compared().into_iter().zip(after.compared()) {
            if was != now {
                tracing::debug!(shape = %id, code = %code, was, now, "Derived property changed");
                diagnostics.property_changed(id, code, was, now);
            }
        }
    }

    tracing::info!(
        service = %service,
        violations = diagnostics.error_count(),
        mode = %mode,
        "Evaluated nullability diff"
    );
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DefaultValue, MemberDef, ShapeKind, Tag};

    fn model(flag_default: bool, bar_required: bool) -> SchemaGraph {
        let mut flag = Shape::new("ns#B", ShapeKind::Boolean);
        if flag_default {
            flag = flag.with_tag(Tag::Default(DefaultValue::Boolean(false)));
        }
        let mut bar = MemberDef::new("bar", "ns#Name");
        if bar_required {
            bar = bar.with_tag(Tag::Required);
        }
        SchemaGraph::builder()
            .shape(flag)
            .shape(Shape::new("ns#Name", ShapeKind::String))
            .container(Shape::new("ns#Foo", ShapeKind::Structure), [bar])
            .build()
            .unwrap()
    }

    fn svc() -> ShapeId {
        ShapeId::from("ns#Svc")
    }

    #[test]
    fn test_identical_graphs_have_no_violations() {
        let graph = model(false, false);
        let diags = evaluate(&graph, &graph, &svc(), &ExceptionSnapshot::new(), CheckMode::default());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_member_becoming_required() {
        let diags = evaluate(
            &model(false, false),
            &model(false, true),
            &svc(),
            &ExceptionSnapshot::new(),
            CheckMode::default(),
        );
        assert_eq!(diags.error_count(), 1);
        let item = &diags.all()[0];
        assert_eq!(item.code, DiagnosticCode::ChangedNullable);
        assert_eq!(item.shape_id.as_str(), "ns#Foo$bar");
    }

    #[test]
    fn test_input_member_becoming_required() {
        let input = |required: bool| {
            let mut name = MemberDef::new("name", "ns#Name");
            if required {
                name = name.with_tag(Tag::Required);
            }
            SchemaGraph::builder()
                .shape(Shape::new("ns#Name", ShapeKind::String))
                .container(Shape::new("ns#PutInput", ShapeKind::Structure).with_tag(Tag::Input), [name])
                .build()
                .unwrap()
        };

        for mode in [CheckMode::default(), CheckMode::Client, CheckMode::ClientZeroValueV1] {
            let diags = evaluate(&input(false), &input(true), &svc(), &ExceptionSnapshot::new(), mode);
            assert_eq!(diags.error_count(), 1, "mode {}", mode);
            assert_eq!(diags.all()[0].code, DiagnosticCode::ChangedNullable);
            assert_eq!(diags.all()[0].shape_id.as_str(), "ns#PutInput$name");
        }
    }

    #[test]
    fn test_unregistered_default() {
        let diags = evaluate(
            &model(false, false),
            &model(true, false),
            &svc(),
            &ExceptionSnapshot::new(),
            CheckMode::default(),
        );
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.all()[0].code, DiagnosticCode::UnregisteredDefault);
        assert_eq!(diags.all()[0].shape_id.as_str(), "ns#B");

        let mut snapshot = ExceptionSnapshot::new();
        snapshot.insert(svc(), ShapeId::from("ns#B"));
        let registered = evaluate(&model(false, false), &model(true, false), &svc(), &snapshot, CheckMode::default());
        assert!(registered.is_empty());
    }

    #[test]
    fn test_added_defaulted_shape() {
        let old = SchemaGraph::builder().build().unwrap();
        let new = model(true, false);
        let diags = evaluate(&old, &new, &svc(), &ExceptionSnapshot::new(), CheckMode::default());
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.all()[0].shape_id.as_str(), "ns#B");
    }

    #[test]
    fn test_member_ness_change() {
        let old = SchemaGraph::builder()
            .shape(Shape::new("ns#Name", ShapeKind::String))
            .container(Shape::new("ns#Foo", ShapeKind::Structure), [MemberDef::new("bar", "ns#Name")])
            .build()
            .unwrap();
        let new = SchemaGraph::builder()
            .shape(Shape::new("ns#Name", ShapeKind::String))
            .shape(Shape::new("ns#Foo", ShapeKind::Structure))
            .shape(Shape::new("ns#Foo$bar", ShapeKind::String))
            .build()
            .unwrap();

        let diags = evaluate(&old, &new, &svc(), &ExceptionSnapshot::new(), CheckMode::default());
        let codes: Vec<DiagnosticCode> = diags.all().iter().map(|i| i.code).collect();
        assert_eq!(codes, vec![DiagnosticCode::NoLongerMember]);
    }

    #[test]
    fn test_pointer_family_changes_reported_separately() {
        let old = SchemaGraph::builder()
            .shape(Shape::new("ns#Count", ShapeKind::Integer))
            .container(
                Shape::new("ns#Foo", ShapeKind::Structure),
                [MemberDef::new("count", "ns#Count").with_tag(Tag::Default(DefaultValue::Number(0.into())))],
            )
            .build()
            .unwrap();
        let new = SchemaGraph::builder()
            .shape(Shape::new("ns#Count", ShapeKind::Integer))
            .container(Shape::new("ns#Foo", ShapeKind::Structure), [MemberDef::new("count", "ns#Count")])
            .build()
            .unwrap();

        let diags = evaluate(&old, &new, &svc(), &ExceptionSnapshot::new(), CheckMode::default());
        let codes: Vec<DiagnosticCode> = diags.all().iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                DiagnosticCode::ChangedNullable,
                DiagnosticCode::ChangedMemberNullable,
                DiagnosticCode::ChangedNillable,
                DiagnosticCode::ChangedPointerLike,
                DiagnosticCode::ChangedDereferenceable,
            ]
        );
    }
}

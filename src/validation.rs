//! Validation Requirement Index
//!
//! Decides which operations of a service need generated input validation and
//! which containers must emit a validation helper.
//!
//! Two phases:
//! 1. Seed: walk the containment closure of every operation input. A required
//!    member marks its operation and its immediate container.
//! 2. Propagate: any container holding a member that targets a marked shape is
//!    marked too, until a fixed point. Runs over a reverse index
//!    (target -> containers) with a worklist, so cycles terminate.
//!
//! Never fails: unknown services and operations without input yield nothing.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::graph::walk::containment_closure;
use crate::graph::{SchemaGraph, ShapeId};
use crate::resolver::is_required;

/// Knobs for index construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// Count path-bound members as requiring validation
    pub validate_http_bindings: bool,
}

/// Validation requirements for one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceValidation {
    pub service: ShapeId,
    /// Operations whose input closure holds at least one required member
    pub operations: BTreeSet<ShapeId>,
    /// Containers that must emit a validation helper
    pub containers: BTreeSet<ShapeId>,
    /// Operation input structure -> operation
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<ShapeId, ShapeId>,
}

impl ServiceValidation {
    pub fn requires_validation(&self, operation: &ShapeId) -> bool {
        self.operations.contains(operation)
    }

    pub fn requires_helper(&self, container: &ShapeId) -> bool {
        self.containers.contains(container)
    }

    /// Operation that owns the given input structure
    pub fn operation_for_input(&self, input: &ShapeId) -> Option<&ShapeId> {
        self.inputs.get(input)
    }

    /// Compute requirements for a single service
    pub fn compute(graph: &SchemaGraph, service: &ShapeId, options: ValidationOptions) -> Self {
        let mut result = ServiceValidation {
            service: service.clone(),
            operations: BTreeSet::new(),
            containers: BTreeSet::new(),
            inputs: BTreeMap::new(),
        };

        // Seed
        let mut scope: BTreeSet<&ShapeId> = BTreeSet::new();
        for op in graph.operations(service) {
            let Some(input) = graph.operation_input(op) else {
                tracing::debug!(operation = %op, "Operation has no input");
                continue;
            };
            result.inputs.insert(input.clone(), op.clone());

            for id in containment_closure(graph, input) {
                let Some(shape) = graph.get(id) else { continue };
                if !shape.is_member() {
                    continue;
                }
                scope.insert(id);

                if is_required(shape, options.validate_http_bindings) {
                    result.operations.insert(op.clone());
                    if let Some((container, _)) = graph.member_container(id) {
                        result.containers.insert(container.clone());
                    }
                }
            }
        }

        // Reverse index: target -> containers of in-scope members pointing at it
        let mut reverse: HashMap<&ShapeId, Vec<&ShapeId>> = HashMap::new();
        for member in &scope {
            let (Some(target), Some((container, rel))) =
                (graph.member_target(member), graph.member_container(member))
            else {
                continue;
            };
            if rel.is_containment() {
                reverse.entry(target).or_default().push(container);
            }
        }

        // Propagate
        let mut worklist: VecDeque<ShapeId> = result.containers.iter().cloned().collect();
        while let Some(marked) = worklist.pop_front() {
            let Some(parents) = reverse.get(&marked) else { continue };
            for parent in parents {
                if result.containers.insert((*parent).clone()) {
                    worklist.push_back((*parent).clone());
                }
            }
        }

        tracing::info!(
            service = %service,
            operations = result.operations.len(),
            containers = result.containers.len(),
            "Computed validation requirements"
        );
        result
    }
}

/// Validation requirements for every service in a graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationIndex {
    services: BTreeMap<ShapeId, ServiceValidation>,
}

impl ValidationIndex {
    pub fn new(graph: &SchemaGraph, options: ValidationOptions) -> Self {
        let services = graph
            .services()
            .into_iter()
            .map(|svc| (svc.clone(), ServiceValidation::compute(graph, svc, options)))
            .collect();
        Self { services }
    }

    /// Requirements for one service, computed on demand
    pub fn for_service(graph: &SchemaGraph, service: &ShapeId, options: ValidationOptions) -> ServiceValidation {
        ServiceValidation::compute(graph, service, options)
    }

    pub fn get(&self, service: &ShapeId) -> Option<&ServiceValidation> {
        self.services.get(service)
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceValidation> {
        self.services.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MemberDef, Shape, ShapeKind, Tag};

    fn ids(set: &BTreeSet<ShapeId>) -> Vec<&str> {
        set.iter().map(|id| id.as_str()).collect()
    }

    #[test]
    fn test_propagates_through_nested_containers() {
        let graph = SchemaGraph::builder()
            .shape(Shape::new("ns#Str", ShapeKind::String))
            .container(
                Shape::new("ns#Leaf", ShapeKind::Structure),
                [MemberDef::new("id", "ns#Str").with_tag(Tag::Required)],
            )
            .container(Shape::new("ns#LeafList", ShapeKind::List), [MemberDef::new("member", "ns#Leaf")])
            .container(
                Shape::new("ns#Input", ShapeKind::Structure),
                [MemberDef::new("leaves", "ns#LeafList"), MemberDef::new("note", "ns#Str")],
            )
            .container(
                Shape::new("ns#OtherInput", ShapeKind::Structure),
                [MemberDef::new("note", "ns#Str")],
            )
            .operation(Shape::new("ns#Put", ShapeKind::Operation), Some("ns#Input"), None)
            .operation(Shape::new("ns#Other", ShapeKind::Operation), Some("ns#OtherInput"), None)
            .operation(Shape::new("ns#Ping", ShapeKind::Operation), None::<&str>, None)
            .service(Shape::new("ns#Svc", ShapeKind::Service), ["ns#Put", "ns#Other", "ns#Ping"])
            .build()
            .unwrap();

        let result = ValidationIndex::for_service(&graph, &ShapeId::from("ns#Svc"), ValidationOptions::default());
        assert_eq!(ids(&result.operations), vec!["ns#Put"]);
        assert_eq!(ids(&result.containers), vec!["ns#Input", "ns#Leaf", "ns#LeafList"]);
        assert_eq!(
            result.operation_for_input(&ShapeId::from("ns#Input")),
            Some(&ShapeId::from("ns#Put"))
        );
        assert!(!result.requires_helper(&ShapeId::from("ns#OtherInput")));
    }

    #[test]
    fn test_http_label_flag() {
        let graph = SchemaGraph::builder()
            .shape(Shape::new("ns#Str", ShapeKind::String))
            .container(
                Shape::new("ns#Input", ShapeKind::Structure),
                [MemberDef::new("bucket", "ns#Str").with_tag(Tag::HttpLabel)],
            )
            .operation(Shape::new("ns#Get", ShapeKind::Operation), Some("ns#Input"), None)
            .service(Shape::new("ns#Svc", ShapeKind::Service), ["ns#Get"])
            .build()
            .unwrap();
        let svc = ShapeId::from("ns#Svc");

        let off = ValidationIndex::for_service(&graph, &svc, ValidationOptions::default());
        assert!(off.operations.is_empty());

        let on = ValidationIndex::for_service(
            &graph,
            &svc,
            ValidationOptions {
                validate_http_bindings: true,
            },
        );
        assert!(on.requires_validation(&ShapeId::from("ns#Get")));
        assert!(on.requires_helper(&ShapeId::from("ns#Input")));
    }

    #[test]
    fn test_recursive_structures_terminate() {
        let graph = SchemaGraph::builder()
            .shape(Shape::new("ns#Str", ShapeKind::String))
            .container(
                Shape::new("ns#Node", ShapeKind::Structure),
                [
                    MemberDef::new("name", "ns#Str").with_tag(Tag::Required),
                    MemberDef::new("child", "ns#Node"),
                    MemberDef::new("peer", "ns#Peer"),
                ],
            )
            .container(Shape::new("ns#Peer", ShapeKind::Structure), [MemberDef::new("node", "ns#Node")])
            .operation(Shape::new("ns#Put", ShapeKind::Operation), Some("ns#Node"), None)
            .service(Shape::new("ns#Svc", ShapeKind::Service), ["ns#Put"])
            .build()
            .unwrap();

        let index = ValidationIndex::new(&graph, ValidationOptions::default());
        let result = index.get(&ShapeId::from("ns#Svc")).unwrap();
        assert_eq!(ids(&result.containers), vec!["ns#Node", "ns#Peer"]);
    }

    #[test]
    fn test_union_members_not_followed() {
        let graph = SchemaGraph::builder()
            .shape(Shape::new("ns#Str", ShapeKind::String))
            .container(
                Shape::new("ns#Inner", ShapeKind::Structure),
                [MemberDef::new("id", "ns#Str").with_tag(Tag::Required)],
            )
            .container(Shape::new("ns#Choice", ShapeKind::Union), [MemberDef::new("inner", "ns#Inner")])
            .container(Shape::new("ns#Input", ShapeKind::Structure), [MemberDef::new("choice", "ns#Choice")])
            .operation(Shape::new("ns#Put", ShapeKind::Operation), Some("ns#Input"), None)
            .service(Shape::new("ns#Svc", ShapeKind::Service), ["ns#Put"])
            .build()
            .unwrap();

        let result = ValidationIndex::for_service(&graph, &ShapeId::from("ns#Svc"), ValidationOptions::default());
        assert!(result.operations.is_empty());
        assert!(result.containers.is_empty());
    }

    #[test]
    fn test_unknown_service_is_empty() {
        let graph = SchemaGraph::builder().build().unwrap();
        let result = ValidationIndex::for_service(&graph, &ShapeId::from("ns#Nope"), ValidationOptions::default());
        assert!(result.operations.is_empty());
        assert!(result.containers.is_empty());
    }
}

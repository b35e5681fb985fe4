//! Worklist traversal over the shape graph
//!
//! Breadth-first with a visited set, so cycles (self-referential or mutually
//! recursive containers) terminate and each shape is yielded once.

use std::collections::{HashSet, VecDeque};

use super::shape::ShapeId;
use super::{Relationship, SchemaGraph};

/// Every shape reachable from `start` along relationships accepted by
/// `follow`, including `start` itself, in visit order.
pub fn walk_shapes<'g, F>(graph: &'g SchemaGraph, start: &ShapeId, follow: F) -> Vec<&'g ShapeId>
where
    F: Fn(Relationship) -> bool,
{
    let Some((start, _)) = graph.shapes.get_key_value(start) else {
        return Vec::new();
    };

    let mut visited: HashSet<&ShapeId> = HashSet::new();
    let mut queue: VecDeque<&ShapeId> = VecDeque::new();
    let mut order = Vec::new();

    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        order.push(current);
        for (next, _) in graph.outgoing(current, &follow) {
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    order
}

/// Containment closure: structure/list/set members, map values, member targets.
///
/// Union members, map keys, and service/operation edges are not followed.
pub fn containment_closure<'g>(graph: &'g SchemaGraph, start: &ShapeId) -> Vec<&'g ShapeId> {
    walk_shapes(graph, start, |r| r.is_containment())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MemberDef, Shape, ShapeKind};

    #[test]
    fn test_closure_terminates_on_cycles() {
        let graph = SchemaGraph::builder()
            .container(
                Shape::new("ns#Node", ShapeKind::Structure),
                [MemberDef::new("next", "ns#Node"), MemberDef::new("peer", "ns#Peer")],
            )
            .container(
                Shape::new("ns#Peer", ShapeKind::Structure),
                [MemberDef::new("back", "ns#Node")],
            )
            .build()
            .unwrap();

        let closure = containment_closure(&graph, &ShapeId::from("ns#Node"));
        assert_eq!(closure.len(), 5);
        let unique: HashSet<_> = closure.iter().collect();
        assert_eq!(unique.len(), closure.len());
    }

    #[test]
    fn test_closure_skips_union_members_and_map_keys() {
        let graph = SchemaGraph::builder()
            .shape(Shape::new("ns#Key", ShapeKind::String))
            .shape(Shape::new("ns#Val", ShapeKind::Integer))
            .shape(Shape::new("ns#Alt", ShapeKind::Boolean))
            .container(
                Shape::new("ns#M", ShapeKind::Map),
                [MemberDef::new("key", "ns#Key"), MemberDef::new("value", "ns#Val")],
            )
            .container(
                Shape::new("ns#U", ShapeKind::Union),
                [MemberDef::new("alt", "ns#Alt")],
            )
            .container(
                Shape::new("ns#Top", ShapeKind::Structure),
                [MemberDef::new("m", "ns#M"), MemberDef::new("u", "ns#U")],
            )
            .build()
            .unwrap();

        let closure = containment_closure(&graph, &ShapeId::from("ns#Top"));
        let ids: Vec<&str> = closure.iter().map(|id| id.as_str()).collect();
        assert!(ids.contains(&"ns#Val"));
        assert!(ids.contains(&"ns#U"));
        assert!(!ids.contains(&"ns#Key"));
        assert!(!ids.contains(&"ns#Alt"));
    }

    #[test]
    fn test_missing_start_yields_nothing() {
        let graph = SchemaGraph::builder().build().unwrap();
        assert!(containment_closure(&graph, &ShapeId::from("ns#Nope")).is_empty());
    }
}

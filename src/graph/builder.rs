//! Schema graph builder
//!
//! Shapes and relationships are accumulated first and resolved in `build()`,
//! so declaration order does not matter. Every edge endpoint must exist by the
//! time `build()` runs.

use petgraph::graph::DiGraph;
use std::collections::HashMap;
use std::sync::Arc;

use super::shape::{Shape, ShapeId, ShapeKind};
use super::tags::{Tag, TagSet};
use super::{Relationship, SchemaGraph};
use crate::error::GraphError;

/// Declaration of a container member: its name, target, and tags
#[derive(Debug, Clone)]
pub struct MemberDef {
    pub name: String,
    pub target: ShapeId,
    pub tags: TagSet,
}

impl MemberDef {
    pub fn new(name: impl Into<String>, target: impl Into<ShapeId>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            tags: TagSet::new(),
        }
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn with_tags(mut self, tags: TagSet) -> Self {
        for tag in tags.iter() {
            self.tags.insert(tag.clone());
        }
        self
    }
}

/// Accumulates shapes and edges, then validates them into a [`SchemaGraph`]
#[derive(Debug, Default)]
pub struct SchemaGraphBuilder {
    shapes: Vec<Shape>,
    edges: Vec<(ShapeId, ShapeId, Relationship)>,
    errors: Vec<GraphError>,
    bundle_hash: Option<String>,
}

impl SchemaGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a standalone shape
    pub fn shape(mut self, shape: Shape) -> Self {
        self.shapes.push(shape);
        self
    }

    /// Add a container and its members.
    ///
    /// Each member becomes a `member` shape `Container$name` with a membership
    /// edge from the container and a `MemberTarget` edge to its target.
    pub fn container<I>(mut self, shape: Shape, members: I) -> Self
    where
        I: IntoIterator<Item = MemberDef>,
    {
        let container_id = shape.id.clone();
        let kind = shape.kind;
        self.shapes.push(shape);

        for member in members {
            let Some(relationship) = Relationship::for_member_of(kind, &member.name) else {
                self.errors.push(GraphError::NotAContainer {
                    id: container_id.clone(),
                    kind: kind.to_string(),
                });
                return self;
            };

            let member_id = container_id.with_member(&member.name);
            self.shapes.push(Shape {
                id: member_id.clone(),
                kind: ShapeKind::Member,
                tags: member.tags,
            });
            self.edges
                .push((container_id.clone(), member_id.clone(), relationship));
            self.edges
                .push((member_id, member.target, Relationship::MemberTarget));
        }
        self
    }

    /// Add a service bound to the given operations
    pub fn service<I, S>(mut self, shape: Shape, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ShapeId>,
    {
        let service_id = shape.id.clone();
        self.shapes.push(shape);
        for op in operations {
            self.edges
                .push((service_id.clone(), op.into(), Relationship::Operation));
        }
        self
    }

    /// Add a resource bound to the given operations and child resources
    pub fn resource<I, J, S, T>(mut self, shape: Shape, operations: I, resources: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<ShapeId>,
        T: Into<ShapeId>,
    {
        let resource_id = shape.id.clone();
        self.shapes.push(shape);
        for op in operations {
            self.edges
                .push((resource_id.clone(), op.into(), Relationship::Operation));
        }
        self.bind_resources(resource_id, resources)
    }

    /// Bind resources to an existing service or resource
    pub fn bind_resources<I, S>(mut self, owner: impl Into<ShapeId>, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ShapeId>,
    {
        let owner = owner.into();
        for resource in resources {
            self.edges
                .push((owner.clone(), resource.into(), Relationship::Resource));
        }
        self
    }

    /// Add an operation with optional input and output structures
    pub fn operation<S: Into<ShapeId>>(
        mut self,
        shape: Shape,
        input: Option<S>,
        output: Option<S>,
    ) -> Self {
        let op_id = shape.id.clone();
        self.shapes.push(shape);
        if let Some(input) = input {
            self.edges.push((op_id.clone(), input.into(), Relationship::Input));
        }
        if let Some(output) = output {
            self.edges.push((op_id, output.into(), Relationship::Output));
        }
        self
    }

    pub fn bundle_hash(mut self, hash: impl Into<String>) -> Self {
        self.bundle_hash = Some(hash.into());
        self
    }

    /// Validate and freeze the graph
    pub fn build(self) -> Result<SchemaGraph, GraphError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        let mut graph = DiGraph::new();
        let mut shapes = HashMap::with_capacity(self.shapes.len());
        let mut node_indices = HashMap::with_capacity(self.shapes.len());

        for shape in self.shapes {
            if shapes.contains_key(&shape.id) {
                return Err(GraphError::DuplicateShape(shape.id));
            }
            let idx = graph.add_node(shape.id.clone());
            node_indices.insert(shape.id.clone(), idx);
            shapes.insert(shape.id.clone(), Arc::new(shape));
        }

        for (from, to, relationship) in self.edges {
            let Some(&from_idx) = node_indices.get(&from) else {
                return Err(GraphError::DanglingReference {
                    from: to,
                    missing: from,
                });
            };
            let Some(&to_idx) = node_indices.get(&to) else {
                return Err(GraphError::DanglingReference { from, missing: to });
            };
            graph.add_edge(from_idx, to_idx, relationship);
        }

        tracing::debug!(
            shapes = shapes.len(),
            edges = graph.edge_count(),
            "Built schema graph"
        );

        Ok(SchemaGraph {
            graph,
            shapes,
            node_indices,
            bundle_hash: self.bundle_hash,
        })
    }
}

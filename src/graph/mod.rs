//! Shape Graph
//!
//! Immutable, versioned graph of shapes and typed relationships, backed by
//! petgraph with a HashMap index from shape id to node.
//!
//! Shared by:
//! - Validation index (containment closure over operation inputs)
//! - Nullability engine (backfill, cross-version diff)
//!
//! Graphs are never mutated after `build()`. Backfill produces a new graph via
//! [`SchemaGraph::with_replaced_shapes`]; untouched shapes are shared through
//! `Arc`.

pub mod builder;
pub mod loader;
pub mod shape;
pub mod tags;
pub mod walk;

pub use builder::{MemberDef, SchemaGraphBuilder};
pub use loader::{load_from_directory, load_from_path, load_from_str, load_model, LoadConfig};
pub use shape::{Shape, ShapeId, ShapeKind};
pub use tags::{DefaultValue, Tag, TagKind, TagSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::GraphError;

/// Typed relationship between two shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    /// structure -> member
    StructureMember,
    /// union -> member
    UnionMember,
    /// list -> member
    ListMember,
    /// set -> member
    SetMember,
    /// map -> key member
    MapKey,
    /// map -> value member
    MapValue,
    /// member -> the shape it targets
    MemberTarget,
    /// service or resource -> bound resource
    Resource,
    /// service or resource -> operation (including lifecycle operations)
    Operation,
    /// operation -> input structure
    Input,
    /// operation -> output structure
    Output,
}

impl Relationship {
    /// Relationships along which "requires validation" and nullability propagate
    pub fn is_containment(&self) -> bool {
        matches!(
            self,
            Self::StructureMember
                | Self::ListMember
                | Self::SetMember
                | Self::MapValue
                | Self::MemberTarget
        )
    }

    /// Relationships from a container to one of its members
    pub fn is_membership(&self) -> bool {
        matches!(
            self,
            Self::StructureMember
                | Self::UnionMember
                | Self::ListMember
                | Self::SetMember
                | Self::MapKey
                | Self::MapValue
        )
    }

    /// Membership relationship used by a container kind for a named member
    pub fn for_member_of(kind: ShapeKind, member_name: &str) -> Option<Self> {
        match kind {
            ShapeKind::Structure => Some(Self::StructureMember),
            ShapeKind::Union => Some(Self::UnionMember),
            ShapeKind::List => Some(Self::ListMember),
            ShapeKind::Set => Some(Self::SetMember),
            ShapeKind::Map if member_name == "key" => Some(Self::MapKey),
            ShapeKind::Map => Some(Self::MapValue),
            _ => None,
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StructureMember => "structure-member",
            Self::UnionMember => "union-member",
            Self::ListMember => "list-member",
            Self::SetMember => "set-member",
            Self::MapKey => "map-key",
            Self::MapValue => "map-value",
            Self::MemberTarget => "member-target",
            Self::Resource => "resource",
            Self::Operation => "operation",
            Self::Input => "input",
            Self::Output => "output",
        };
        f.write_str(name)
    }
}

/// The shape graph
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    /// Relationship structure
    pub(crate) graph: DiGraph<ShapeId, Relationship>,

    /// Shapes indexed by id
    pub(crate) shapes: HashMap<ShapeId, Arc<Shape>>,

    /// Node index lookup: id -> NodeIndex
    pub(crate) node_indices: HashMap<ShapeId, NodeIndex>,

    /// SHA-256 of the model sources this graph was loaded from, if any
    pub bundle_hash: Option<String>,
}

impl SchemaGraph {
    pub fn builder() -> SchemaGraphBuilder {
        SchemaGraphBuilder::new()
    }

    // ========== Lookup ==========

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn get(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.get(id).map(|s| s.as_ref())
    }

    pub fn contains(&self, id: &ShapeId) -> bool {
        self.shapes.contains_key(id)
    }

    /// All shapes, in no particular order
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values().map(|s| s.as_ref())
    }

    /// All member shapes, in no particular order
    pub fn member_shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes().filter(|s| s.is_member())
    }

    /// Ids of every shape of a given kind, sorted
    pub fn ids_of_kind(&self, kind: ShapeKind) -> Vec<&ShapeId> {
        let mut ids: Vec<&ShapeId> = self
            .shapes
            .values()
            .filter(|s| s.kind == kind)
            .map(|s| &s.id)
            .collect();
        ids.sort();
        ids
    }

    /// Ids of every service, sorted
    pub fn services(&self) -> Vec<&ShapeId> {
        self.ids_of_kind(ShapeKind::Service)
    }

    // ========== Edges ==========

    /// Outgoing neighbours reached through relationships accepted by `follow`
    pub fn outgoing<F>(&self, id: &ShapeId, follow: F) -> Vec<(&ShapeId, Relationship)>
    where
        F: Fn(Relationship) -> bool,
    {
        self.neighbours(id, Direction::Outgoing, follow)
    }

    /// Incoming neighbours reached through relationships accepted by `follow`
    pub fn incoming<F>(&self, id: &ShapeId, follow: F) -> Vec<(&ShapeId, Relationship)>
    where
        F: Fn(Relationship) -> bool,
    {
        self.neighbours(id, Direction::Incoming, follow)
    }

    fn neighbours<F>(
        &self,
        id: &ShapeId,
        direction: Direction,
        follow: F,
    ) -> Vec<(&ShapeId, Relationship)>
    where
        F: Fn(Relationship) -> bool,
    {
        let Some(&node_idx) = self.node_indices.get(id) else {
            return Vec::new();
        };

        self.graph
            .edges_directed(node_idx, direction)
            .filter(|e| follow(*e.weight()))
            .filter_map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                self.graph.node_weight(other).map(|id| (id, *e.weight()))
            })
            .collect()
    }

    /// Shape targeted by a member
    pub fn member_target(&self, member: &ShapeId) -> Option<&ShapeId> {
        self.outgoing(member, |r| r == Relationship::MemberTarget)
            .into_iter()
            .map(|(id, _)| id)
            .next()
    }

    /// Container that owns a member, with the membership relationship
    pub fn member_container(&self, member: &ShapeId) -> Option<(&ShapeId, Relationship)> {
        self.incoming(member, |r| r.is_membership()).into_iter().next()
    }

    /// Members of a container, sorted by id
    pub fn members(&self, container: &ShapeId) -> Vec<&ShapeId> {
        let mut members: Vec<&ShapeId> = self
            .outgoing(container, |r| r.is_membership())
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        members.sort();
        members
    }

    /// Operations contained in a service, sorted by id.
    ///
    /// Includes operations bound through (nested) resources.
    pub fn operations(&self, service: &ShapeId) -> Vec<&ShapeId> {
        let mut ops: Vec<&ShapeId> = walk::walk_shapes(self, service, |r| r == Relationship::Resource)
            .into_iter()
            .flat_map(|owner| self.outgoing(owner, |r| r == Relationship::Operation))
            .map(|(id, _)| id)
            .collect();
        ops.sort();
        ops.dedup();
        ops
    }

    /// Resources bound directly to a service or resource, sorted by id
    pub fn resources(&self, owner: &ShapeId) -> Vec<&ShapeId> {
        let mut resources: Vec<&ShapeId> = self
            .outgoing(owner, |r| r == Relationship::Resource)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        resources.sort();
        resources
    }

    pub fn operation_input(&self, operation: &ShapeId) -> Option<&ShapeId> {
        self.outgoing(operation, |r| r == Relationship::Input)
            .into_iter()
            .map(|(id, _)| id)
            .next()
    }

    pub fn operation_output(&self, operation: &ShapeId) -> Option<&ShapeId> {
        self.outgoing(operation, |r| r == Relationship::Output)
            .into_iter()
            .map(|(id, _)| id)
            .next()
    }

    // ========== Derivation ==========

    /// New graph in which the given shapes replace the shapes with the same id.
    ///
    /// Relationships are untouched, so a replacement must keep the shape's kind.
    pub fn with_replaced_shapes<I>(&self, replacements: I) -> Result<SchemaGraph, GraphError>
    where
        I: IntoIterator<Item = Shape>,
    {
        let mut next = self.clone();
        for shape in replacements {
            let Some(existing) = next.shapes.get(&shape.id) else {
                return Err(GraphError::UnknownReplacement(shape.id));
            };
            if existing.kind != shape.kind {
                return Err(GraphError::KindChanged {
                    id: shape.id.clone(),
                    old: existing.kind.to_string(),
                    new: shape.kind.to_string(),
                });
            }
            next.shapes.insert(shape.id.clone(), Arc::new(shape));
        }
        Ok(next)
    }

    /// True when the two graphs hold the very same shape value for `id`
    pub fn shares_shape(&self, other: &SchemaGraph, id: &ShapeId) -> bool {
        match (self.shapes.get(id), other.shapes.get(id)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for SchemaGraph {
    /// Graphs are equal when they hold equal shapes and equal relationships.
    fn eq(&self, other: &Self) -> bool {
        if self.shapes.len() != other.shapes.len() || self.edge_count() != other.edge_count() {
            return false;
        }
        let same_shapes = self
            .shapes
            .iter()
            .all(|(id, shape)| other.shapes.get(id).map(|o| o == shape).unwrap_or(false));
        same_shapes && self.edge_set() == other.edge_set()
    }
}

impl SchemaGraph {
    fn edge_set(&self) -> std::collections::BTreeSet<(&ShapeId, &ShapeId, String)> {
        self.graph
            .edge_references()
            .filter_map(|e| {
                let from = self.graph.node_weight(e.source())?;
                let to = self.graph.node_weight(e.target())?;
                Some((from, to, e.weight().to_string()))
            })
            .collect()
    }
}

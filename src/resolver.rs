//! Attribute Resolver
//!
//! Pure functions deriving requiredness and nullability-family properties from
//! a shape's tags. Member-level questions also look at the member's container
//! and target in the same graph.
//!
//! | property          | root boolean/numeric | other roots        | members                          |
//! |-------------------|----------------------|--------------------|----------------------------------|
//! | nullable          | `Box` tag            | always             | per [`CheckMode`]                |
//! | pointer-like      | nullable             | structure/union    | by target kind + zero-value rule |
//! | nillable          | pointer-like         | + collections/blob | pointer-like or nil-able target  |
//! | dereferenceable   | pointer-like         | scalars only       | pointer-like scalar target       |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::graph::{Relationship, SchemaGraph, Shape, ShapeKind, TagKind};

/// Interpretation used to decide whether a member is nullable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckMode {
    /// `clientOptional` and input structures make members optional;
    /// otherwise `default` or `required` make them non-null.
    Client,
    /// Like `Client`, but `required` alone never makes a member non-null.
    ClientCareful,
    /// `default` or `required` make a member non-null.
    Server,
    /// Legacy zero-value semantics; input structures make members nullable.
    ClientZeroValueV1,
    /// Legacy zero-value semantics, ignoring input structures.
    #[default]
    ClientZeroValueV1NoInput,
}

impl CheckMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::ClientCareful => "client-careful",
            Self::Server => "server",
            Self::ClientZeroValueV1 => "client-zero-value-v1",
            Self::ClientZeroValueV1NoInput => "client-zero-value-v1-no-input",
        }
    }
}

impl fmt::Display for CheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "client-careful" => Ok(Self::ClientCareful),
            "server" => Ok(Self::Server),
            "client-zero-value-v1" => Ok(Self::ClientZeroValueV1),
            "client-zero-value-v1-no-input" => Ok(Self::ClientZeroValueV1NoInput),
            other => Err(format!("unknown check mode: {}", other)),
        }
    }
}

// =============================================================================
// Requiredness
// =============================================================================

/// A member requires validation when it is `required`, or bound to a path
/// segment while HTTP binding validation is on.
pub fn is_required(shape: &Shape, validate_http_bindings: bool) -> bool {
    shape.has_tag(TagKind::Required) || (validate_http_bindings && shape.has_tag(TagKind::HttpLabel))
}

// =============================================================================
// Nullability
// =============================================================================

/// Nullability of any shape. Roots ignore `mode`.
pub fn is_nullable(graph: &SchemaGraph, shape: &Shape, mode: CheckMode) -> bool {
    if shape.is_member() {
        is_member_nullable(graph, shape, mode)
    } else {
        is_root_nullable(shape)
    }
}

fn is_root_nullable(shape: &Shape) -> bool {
    if shape.kind.has_zero_value() {
        shape.has_tag(TagKind::Box)
    } else {
        true
    }
}

/// Nullability of a member under `mode`; `false` for non-members.
pub fn is_member_nullable(graph: &SchemaGraph, member: &Shape, mode: CheckMode) -> bool {
    if !member.is_member() {
        return false;
    }

    let Some((container_id, relationship)) = graph.member_container(&member.id) else {
        return true;
    };
    let container = graph.get(container_id);

    match relationship {
        Relationship::ListMember | Relationship::SetMember | Relationship::MapValue => {
            container.map(|c| c.has_tag(TagKind::Sparse)).unwrap_or(false)
        }
        Relationship::MapKey | Relationship::UnionMember => false,
        _ => {
            let in_input = container.map(|c| c.has_tag(TagKind::Input)).unwrap_or(false);
            structure_member_nullable(graph, member, in_input, mode)
        }
    }
}

fn structure_member_nullable(graph: &SchemaGraph, member: &Shape, in_input: bool, mode: CheckMode) -> bool {
    let has_default = member.has_tag(TagKind::Default);
    let required = member.has_tag(TagKind::Required);
    let client_optional = member.has_tag(TagKind::ClientOptional);

    match mode {
        CheckMode::Client => {
            if client_optional || in_input {
                true
            } else {
                !(has_default || required)
            }
        }
        CheckMode::ClientCareful => client_optional || in_input || !has_default,
        CheckMode::Server => !(has_default || required),
        CheckMode::ClientZeroValueV1 | CheckMode::ClientZeroValueV1NoInput => {
            if mode == CheckMode::ClientZeroValueV1 && in_input {
                return true;
            }
            !is_zero_value_member(graph, member)
        }
    }
}

/// Member whose target is boolean/numeric, not boxed, with a zero default
fn is_zero_value_member(graph: &SchemaGraph, member: &Shape) -> bool {
    if member.has_tag(TagKind::Box) {
        return false;
    }
    let Some(target) = target_of(graph, member) else {
        return false;
    };
    if target.has_tag(TagKind::Box) || !target.kind.has_zero_value() {
        return false;
    }
    member.default_value().map(|v| v.is_zero_value()).unwrap_or(false)
}

fn target_of<'g>(graph: &'g SchemaGraph, member: &Shape) -> Option<&'g Shape> {
    graph.member_target(&member.id).and_then(|id| graph.get(id))
}

/// Kind of the value a shape holds: its own kind, or its target's for members
fn value_kind(graph: &SchemaGraph, shape: &Shape) -> Option<ShapeKind> {
    if shape.is_member() {
        target_of(graph, shape).map(|t| t.kind)
    } else {
        Some(shape.kind)
    }
}

fn is_scalar(kind: ShapeKind) -> bool {
    kind.has_zero_value()
        || matches!(kind, ShapeKind::String | ShapeKind::Enum | ShapeKind::Timestamp)
}

fn is_nil_able_reference(kind: ShapeKind) -> bool {
    kind.is_collection() || matches!(kind, ShapeKind::Blob | ShapeKind::Document)
}

// =============================================================================
// Generated-type representation
// =============================================================================

/// Whether the generated value is held behind a pointer
pub fn is_pointer_like(graph: &SchemaGraph, shape: &Shape) -> bool {
    let Some(kind) = value_kind(graph, shape) else {
        return false;
    };

    if matches!(kind, ShapeKind::Structure | ShapeKind::Union) {
        return true;
    }
    if !is_scalar(kind) {
        return false;
    }
    if shape.is_member() {
        !kind.has_zero_value() || !is_zero_value_member(graph, shape)
    } else {
        is_root_nullable(shape)
    }
}

/// Whether the generated value can be nil
pub fn is_nillable(graph: &SchemaGraph, shape: &Shape) -> bool {
    let nil_able_kind = value_kind(graph, shape).map(is_nil_able_reference).unwrap_or(false);
    nil_able_kind || is_pointer_like(graph, shape)
}

/// Whether the generated value is a pointer to a scalar that callers dereference
pub fn is_dereferenceable(graph: &SchemaGraph, shape: &Shape) -> bool {
    let scalar = value_kind(graph, shape).map(is_scalar).unwrap_or(false);
    scalar && is_pointer_like(graph, shape)
}

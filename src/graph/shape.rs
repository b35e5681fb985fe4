//! Shape identifiers, kinds, and shape values

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use super::tags::{DefaultValue, Tag, TagKind, TagSet};
use crate::error::GraphError;

// =============================================================================
// Shape Id
// =============================================================================

fn shape_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*#[A-Za-z_][A-Za-z0-9_]*(\$[A-Za-z_][A-Za-z0-9_]*)?$",
        )
        .expect("shape id pattern compiles")
    })
}

/// Globally unique, namespaced shape identifier.
///
/// Root shapes are written `namespace#Name`; members of a container are
/// written `namespace#Name$member`. `From<&str>` does not validate; use
/// [`ShapeId::parse`] for untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShapeId(String);

impl ShapeId {
    /// Parse and validate a shape id
    pub fn parse(value: &str) -> Result<Self, GraphError> {
        if shape_id_pattern().is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(GraphError::InvalidShapeId(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespace portion (before `#`)
    pub fn namespace(&self) -> &str {
        self.0.split_once('#').map(|(ns, _)| ns).unwrap_or("")
    }

    /// Shape name portion (between `#` and `$`)
    pub fn name(&self) -> &str {
        let rest = self.0.split_once('#').map(|(_, rest)| rest).unwrap_or(&self.0);
        rest.split_once('$').map(|(name, _)| name).unwrap_or(rest)
    }

    /// Member name, if this id addresses a member
    pub fn member_name(&self) -> Option<&str> {
        self.0.split_once('$').map(|(_, member)| member)
    }

    /// Id of the root shape, with any member suffix removed
    pub fn root(&self) -> ShapeId {
        match self.0.split_once('$') {
            Some((root, _)) => ShapeId(root.to_string()),
            None => self.clone(),
        }
    }

    /// Id of a member of this shape
    pub fn with_member(&self, member: &str) -> ShapeId {
        ShapeId(format!("{}${}", self.root().0, member))
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShapeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl TryFrom<String> for ShapeId {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShapeId> for String {
    fn from(id: ShapeId) -> Self {
        id.0
    }
}

impl AsRef<str> for ShapeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Shape Kind
// =============================================================================

/// Kind of a shape graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKind {
    Service,
    Resource,
    Operation,
    Structure,
    Union,
    List,
    Set,
    Map,
    Member,
    Boolean,
    Byte,
    Short,
    Integer,
    IntEnum,
    Long,
    Float,
    Double,
    BigInteger,
    BigDecimal,
    String,
    Enum,
    Blob,
    Timestamp,
    Document,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Resource => "resource",
            Self::Operation => "operation",
            Self::Structure => "structure",
            Self::Union => "union",
            Self::List => "list",
            Self::Set => "set",
            Self::Map => "map",
            Self::Member => "member",
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Integer => "integer",
            Self::IntEnum => "intEnum",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::BigInteger => "bigInteger",
            Self::BigDecimal => "bigDecimal",
            Self::String => "string",
            Self::Enum => "enum",
            Self::Blob => "blob",
            Self::Timestamp => "timestamp",
            Self::Document => "document",
        }
    }

    /// Parse the model's `type` string
    pub fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name {
            "service" => Self::Service,
            "resource" => Self::Resource,
            "operation" => Self::Operation,
            "structure" => Self::Structure,
            "union" => Self::Union,
            "list" => Self::List,
            "set" => Self::Set,
            "map" => Self::Map,
            "member" => Self::Member,
            "boolean" => Self::Boolean,
            "byte" => Self::Byte,
            "short" => Self::Short,
            "integer" => Self::Integer,
            "intEnum" => Self::IntEnum,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "bigInteger" => Self::BigInteger,
            "bigDecimal" => Self::BigDecimal,
            "string" => Self::String,
            "enum" => Self::Enum,
            "blob" => Self::Blob,
            "timestamp" => Self::Timestamp,
            "document" => Self::Document,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean)
    }

    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Self::Byte
                | Self::Short
                | Self::Integer
                | Self::IntEnum
                | Self::Long
                | Self::Float
                | Self::Double
                | Self::BigInteger
                | Self::BigDecimal
        )
    }

    /// Kinds that have a zero value (`false` / `0`) a default can be backfilled with
    pub fn has_zero_value(&self) -> bool {
        self.is_boolean() || self.is_number()
    }

    pub fn is_member(&self) -> bool {
        matches!(self, Self::Member)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List | Self::Set | Self::Map)
    }

    /// Kinds that own member shapes
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            Self::Structure | Self::Union | Self::List | Self::Set | Self::Map
        )
    }

    /// The zero-value default for this kind, if it has one
    pub fn zero_value(&self) -> Option<DefaultValue> {
        if self.is_boolean() {
            Some(DefaultValue::Boolean(false))
        } else if self.is_number() {
            Some(DefaultValue::Number(0.into()))
        } else {
            None
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Shape
// =============================================================================

/// A node of the shape graph: identity, kind, and attached tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ShapeKind,
    #[serde(default, skip_serializing_if = "TagSet::is_empty")]
    pub tags: TagSet,
}

impl Shape {
    pub fn new(id: impl Into<ShapeId>, kind: ShapeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            tags: TagSet::new(),
        }
    }

    /// Builder-style tag attachment
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.insert(tag);
        self
    }

    /// Builder-style tag removal
    pub fn without_tag(mut self, kind: TagKind) -> Self {
        self.tags.remove(kind);
        self
    }

    pub fn has_tag(&self, kind: TagKind) -> bool {
        self.tags.contains(kind)
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.tags.default_value()
    }

    pub fn is_member(&self) -> bool {
        self.kind.is_member()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_id_parts() {
        let id = ShapeId::parse("com.example#Foo$bar").unwrap();
        assert_eq!(id.namespace(), "com.example");
        assert_eq!(id.name(), "Foo");
        assert_eq!(id.member_name(), Some("bar"));
        assert_eq!(id.root().as_str(), "com.example#Foo");
    }

    #[test]
    fn test_shape_id_rejects_garbage() {
        assert!(ShapeId::parse("no-hash").is_err());
        assert!(ShapeId::parse("ns#").is_err());
        assert!(ShapeId::parse("ns#A$b$c").is_err());
        assert!(ShapeId::parse("S.Foo#bar").is_ok());
    }

    #[test]
    fn test_with_member_replaces_existing_member() {
        let id = ShapeId::from("ns#List$member");
        assert_eq!(id.with_member("other").as_str(), "ns#List$other");
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(ShapeKind::Boolean.zero_value(), Some(DefaultValue::Boolean(false)));
        assert_eq!(ShapeKind::Long.zero_value(), Some(DefaultValue::Number(0.into())));
        assert_eq!(ShapeKind::String.zero_value(), None);
        assert!(ShapeKind::IntEnum.has_zero_value());
        assert!(!ShapeKind::Timestamp.has_zero_value());
    }

    #[test]
    fn test_shape_id_serde_validates() {
        let ok: Result<ShapeId, _> = serde_json::from_str("\"ns#Foo\"");
        assert!(ok.is_ok());
        let bad: Result<ShapeId, _> = serde_json::from_str("\"Foo\"");
        assert!(bad.is_err());
    }
}

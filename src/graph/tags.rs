//! Shape tags
//!
//! Tags are a closed set of attribute markers attached to shapes. Some carry a
//! payload (`Default` carries a literal, `Documentation` carries text); the rest
//! are plain markers. A shape carries at most one tag of each kind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Literal carried by a `Default` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Boolean(bool),
    Number(serde_json::Number),
    String(String),
    /// Empty list/map, `null`, or any other literal
    Other(serde_json::Value),
}

impl DefaultValue {
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => Self::Boolean(*b),
            serde_json::Value::Number(n) => Self::Number(n.clone()),
            serde_json::Value::String(s) => Self::String(s.clone()),
            other => Self::Other(other.clone()),
        }
    }

    /// `false` or numeric zero
    pub fn is_zero_value(&self) -> bool {
        match self {
            Self::Boolean(b) => !*b,
            Self::Number(n) => n.as_f64() == Some(0.0),
            Self::String(_) | Self::Other(_) => false,
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Other(v) => write!(f, "{}", v),
        }
    }
}

/// Attribute markers that can be attached to a shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "value", rename_all = "camelCase")]
pub enum Tag {
    /// Member must be set by the caller
    Required,
    /// Member or root shape has a default value
    Default(DefaultValue),
    /// Clients must treat the member as optional regardless of `Required`/`Default`
    ClientOptional,
    /// Legacy marker: the shape or member is explicitly nullable
    Box,
    /// Member is bound to a request path segment
    HttpLabel,
    /// Structure is dedicated to an operation input
    Input,
    /// Structure is dedicated to an operation output
    Output,
    /// Collection may contain null entries
    Sparse,
    Documentation(String),
}

impl Tag {
    pub fn kind(&self) -> TagKind {
        match self {
            Self::Required => TagKind::Required,
            Self::Default(_) => TagKind::Default,
            Self::ClientOptional => TagKind::ClientOptional,
            Self::Box => TagKind::Box,
            Self::HttpLabel => TagKind::HttpLabel,
            Self::Input => TagKind::Input,
            Self::Output => TagKind::Output,
            Self::Sparse => TagKind::Sparse,
            Self::Documentation(_) => TagKind::Documentation,
        }
    }
}

/// Payload-free discriminant of [`Tag`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagKind {
    Required,
    Default,
    ClientOptional,
    Box,
    HttpLabel,
    Input,
    Output,
    Sparse,
    Documentation,
}

/// Set of tags, keyed by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Tag>", into = "Vec<Tag>")]
pub struct TagSet {
    tags: BTreeMap<TagKind, Tag>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag, replacing any existing tag of the same kind
    pub fn insert(&mut self, tag: Tag) -> Option<Tag> {
        self.tags.insert(tag.kind(), tag)
    }

    pub fn remove(&mut self, kind: TagKind) -> Option<Tag> {
        self.tags.remove(&kind)
    }

    pub fn contains(&self, kind: TagKind) -> bool {
        self.tags.contains_key(&kind)
    }

    pub fn get(&self, kind: TagKind) -> Option<&Tag> {
        self.tags.get(&kind)
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        match self.tags.get(&TagKind::Default) {
            Some(Tag::Default(value)) => Some(value),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl From<Vec<Tag>> for TagSet {
    fn from(tags: Vec<Tag>) -> Self {
        tags.into_iter().collect()
    }
}

impl From<TagSet> for Vec<Tag> {
    fn from(set: TagSet) -> Self {
        set.tags.into_values().collect()
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

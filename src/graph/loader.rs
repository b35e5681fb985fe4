//! Model Loading
//!
//! Ingestion adapter from JSON AST model documents to a [`SchemaGraph`].
//!
//! Document layout:
//! ```json
//! {
//!   "shapes": {
//!     "ns#Foo": {
//!       "type": "structure",
//!       "members": { "bar": { "target": "ns#Count", "traits": { "smithy.api#required": {} } } },
//!       "traits": { "smithy.api#input": {} }
//!     }
//!   }
//! }
//! ```
//!
//! Traits with a [`Tag`] counterpart are mapped; every other trait is ignored.
//! Prelude shapes (`smithy.api#String`, `smithy.api#PrimitiveInteger`, ...)
//! are synthesized when referenced but not declared.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::builder::{MemberDef, SchemaGraphBuilder};
use super::shape::{Shape, ShapeId, ShapeKind};
use super::tags::{DefaultValue, Tag, TagSet};
use super::SchemaGraph;
use crate::error::GraphError;

const PRELUDE_NAMESPACE: &str = "smithy.api";

/// Configuration for model loading
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Skip models matching these path prefixes
    pub skip_prefixes: Vec<String>,
    /// Only load models matching these path prefixes
    pub include_prefixes: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            skip_prefixes: vec![
                "target/".to_string(),
                ".git/".to_string(),
                "node_modules/".to_string(),
                "build/".to_string(),
            ],
            include_prefixes: Vec::new(),
        }
    }
}

// =============================================================================
// JSON AST
// =============================================================================

#[derive(Debug, Deserialize)]
struct ModelDocument {
    #[serde(default)]
    shapes: BTreeMap<String, ShapeDef>,
}

#[derive(Debug, Deserialize)]
struct ShapeDef {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    traits: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    members: BTreeMap<String, MemberRef>,
    member: Option<MemberRef>,
    key: Option<MemberRef>,
    value: Option<MemberRef>,
    #[serde(default)]
    operations: Vec<TargetRef>,
    #[serde(default)]
    resources: Vec<TargetRef>,
    #[serde(default, rename = "collectionOperations")]
    collection_operations: Vec<TargetRef>,
    create: Option<TargetRef>,
    put: Option<TargetRef>,
    read: Option<TargetRef>,
    update: Option<TargetRef>,
    delete: Option<TargetRef>,
    list: Option<TargetRef>,
    input: Option<TargetRef>,
    output: Option<TargetRef>,
}

#[derive(Debug, Deserialize)]
struct MemberRef {
    target: String,
    #[serde(default)]
    traits: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TargetRef {
    target: String,
}

fn map_traits(traits: &BTreeMap<String, serde_json::Value>) -> TagSet {
    traits
        .iter()
        .filter_map(|(name, value)| {
            let tag = match name.strip_prefix("smithy.api#")? {
                "required" => Tag::Required,
                "default" => Tag::Default(DefaultValue::from_json(value)),
                "clientOptional" => Tag::ClientOptional,
                "box" => Tag::Box,
                "httpLabel" => Tag::HttpLabel,
                "input" => Tag::Input,
                "output" => Tag::Output,
                "sparse" => Tag::Sparse,
                "documentation" => Tag::Documentation(value.as_str().unwrap_or_default().to_string()),
                _ => return None,
            };
            Some(tag)
        })
        .collect()
}

// =============================================================================
// Prelude
// =============================================================================

/// Prelude shape for a `smithy.api#` name, if it is one
fn prelude_shape(id: &ShapeId) -> Option<Shape> {
    if id.namespace() != PRELUDE_NAMESPACE || id.member_name().is_some() {
        return None;
    }
    let (kind, primitive) = match id.name() {
        "String" => (ShapeKind::String, false),
        "Blob" => (ShapeKind::Blob, false),
        "Timestamp" => (ShapeKind::Timestamp, false),
        "Document" => (ShapeKind::Document, false),
        "BigInteger" => (ShapeKind::BigInteger, false),
        "BigDecimal" => (ShapeKind::BigDecimal, false),
        "Unit" => (ShapeKind::Structure, false),
        "Boolean" => (ShapeKind::Boolean, false),
        "Byte" => (ShapeKind::Byte, false),
        "Short" => (ShapeKind::Short, false),
        "Integer" => (ShapeKind::Integer, false),
        "Long" => (ShapeKind::Long, false),
        "Float" => (ShapeKind::Float, false),
        "Double" => (ShapeKind::Double, false),
        "PrimitiveBoolean" => (ShapeKind::Boolean, true),
        "PrimitiveByte" => (ShapeKind::Byte, true),
        "PrimitiveShort" => (ShapeKind::Short, true),
        "PrimitiveInteger" => (ShapeKind::Integer, true),
        "PrimitiveLong" => (ShapeKind::Long, true),
        "PrimitiveFloat" => (ShapeKind::Float, true),
        "PrimitiveDouble" => (ShapeKind::Double, true),
        _ => return None,
    };

    let mut shape = Shape::new(id.clone(), kind);
    if primitive {
        if let Some(zero) = kind.zero_value() {
            shape = shape.with_tag(Tag::Default(zero));
        }
    }
    Some(shape)
}

// =============================================================================
// Assembly
// =============================================================================

/// Accumulates shapes from one or more documents into a builder
#[derive(Default)]
struct ModelAssembler {
    builder: SchemaGraphBuilder,
    declared: HashSet<ShapeId>,
    referenced: BTreeSet<ShapeId>,
    hasher: Sha256,
}

impl ModelAssembler {
    fn add_document(&mut self, content: &str, source_name: &str) -> Result<(), GraphError> {
        self.hasher.update(content.as_bytes());

        let document: ModelDocument =
            serde_json::from_str(content).map_err(|e| GraphError::InvalidModel {
                source_name: source_name.to_string(),
                message: e.to_string(),
            })?;

        for (raw_id, def) in document.shapes {
            self.add_shape(&raw_id, def, source_name)?;
        }
        Ok(())
    }

    fn add_shape(&mut self, raw_id: &str, def: ShapeDef, source_name: &str) -> Result<(), GraphError> {
        let id = ShapeId::parse(raw_id)?;
        let Some(kind) = ShapeKind::from_type_name(&def.type_name) else {
            tracing::debug!(shape = %id, type_name = %def.type_name, source = source_name, "Skipping unsupported shape type");
            return Ok(());
        };

        let shape = Shape {
            id: id.clone(),
            kind,
            tags: map_traits(&def.traits),
        };
        self.declared.insert(id.clone());

        let builder = std::mem::take(&mut self.builder);
        self.builder = match kind {
            ShapeKind::Structure | ShapeKind::Union | ShapeKind::List | ShapeKind::Set | ShapeKind::Map => {
                let members = self.collect_members(kind, def)?;
                builder.container(shape, members)
            }
            ShapeKind::Service => {
                let operations = self.references(def.operations.iter())?;
                let resources = self.references(def.resources.iter())?;
                builder.service(shape, operations).bind_resources(id, resources)
            }
            ShapeKind::Resource => {
                let lifecycle = [&def.create, &def.put, &def.read, &def.update, &def.delete, &def.list];
                let bound = def
                    .operations
                    .iter()
                    .chain(def.collection_operations.iter())
                    .chain(lifecycle.into_iter().flatten());
                let operations = self.references(bound)?;
                let resources = self.references(def.resources.iter())?;
                builder.resource(shape, operations, resources)
            }
            ShapeKind::Operation => {
                let input = def.input.as_ref().map(|r| self.reference(&r.target)).transpose()?;
                let output = def.output.as_ref().map(|r| self.reference(&r.target)).transpose()?;
                builder.operation(shape, input, output)
            }
            _ => builder.shape(shape),
        };
        Ok(())
    }

    fn collect_members(&mut self, kind: ShapeKind, def: ShapeDef) -> Result<Vec<MemberDef>, GraphError> {
        let named: Vec<(String, MemberRef)> = match kind {
            ShapeKind::List | ShapeKind::Set => def.member.map(|m| ("member".to_string(), m)).into_iter().collect(),
            ShapeKind::Map => def
                .key
                .map(|k| ("key".to_string(), k))
                .into_iter()
                .chain(def.value.map(|v| ("value".to_string(), v)))
                .collect(),
            _ => def.members.into_iter().collect(),
        };

        named
            .into_iter()
            .map(|(name, member)| {
                let target = self.reference(&member.target)?;
                Ok(MemberDef::new(name, target).with_tags(map_traits(&member.traits)))
            })
            .collect()
    }

    fn references<'a, I>(&mut self, refs: I) -> Result<Vec<ShapeId>, GraphError>
    where
        I: Iterator<Item = &'a TargetRef>,
    {
        refs.map(|r| self.reference(&r.target)).collect()
    }

    fn reference(&mut self, raw: &str) -> Result<ShapeId, GraphError> {
        let id = ShapeId::parse(raw)?;
        self.referenced.insert(id.clone());
        Ok(id)
    }

    fn finish(mut self) -> Result<SchemaGraph, GraphError> {
        let mut builder = self.builder;
        for id in &self.referenced {
            if self.declared.contains(id) {
                continue;
            }
            if let Some(shape) = prelude_shape(id) {
                tracing::debug!(shape = %id, "Synthesized prelude shape");
                self.declared.insert(id.clone());
                builder = builder.shape(shape);
            }
        }
        let hash = format!("{:x}", self.hasher.finalize());
        builder.bundle_hash(hash).build()
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Load a graph from a single JSON model document
pub fn load_from_str(content: &str, source_name: &str) -> Result<SchemaGraph, GraphError> {
    let mut assembler = ModelAssembler::default();
    assembler.add_document(content, source_name)?;
    assembler.finish()
}

/// Load a graph from a single JSON model file
pub fn load_from_path(path: &Path) -> Result<SchemaGraph, GraphError> {
    let content = fs::read_to_string(path)?;
    load_from_str(&content, &path.display().to_string())
}

/// Load and merge every `*.json` model under a directory
pub fn load_from_directory(model_dir: &Path, config: &LoadConfig) -> Result<SchemaGraph, GraphError> {
    let mut paths: Vec<PathBuf> = Vec::new();

    for entry in WalkDir::new(model_dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }

        let relative = path.strip_prefix(model_dir).unwrap_or(path);
        let relative_str = relative.to_string_lossy();

        if !config.include_prefixes.is_empty()
            && !config.include_prefixes.iter().any(|p| relative_str.starts_with(p))
        {
            continue;
        }
        if config.skip_prefixes.iter().any(|p| relative_str.starts_with(p)) {
            continue;
        }
        paths.push(path.to_path_buf());
    }

    // Stable order keeps the bundle hash reproducible
    paths.sort();

    let mut assembler = ModelAssembler::default();
    for path in &paths {
        let content = fs::read_to_string(path)?;
        assembler.add_document(&content, &path.display().to_string())?;
    }

    tracing::info!(dir = %model_dir.display(), files = paths.len(), "Loaded model documents");
    assembler.finish()
}

/// Load a model file, or every model under a directory
pub fn load_model(path: &Path) -> Result<SchemaGraph, GraphError> {
    if path.is_dir() {
        load_from_directory(path, &LoadConfig::default())
    } else {
        load_from_path(path)
    }
}

//! Exception snapshot
//!
//! JSON object mapping service ids to arrays of shape ids:
//! ```json
//! { "com.example#Storage": ["com.example#Count", "com.example#Foo$bar"] }
//! ```
//! Read-only to the engine. Entries are only ever added by hand or by
//! capture for a newly enrolled service.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use super::audit::capture_entries;
use crate::error::SnapshotError;
use crate::graph::{SchemaGraph, ShapeId};

/// Per-service allow-list of shapes that receive a backfilled default
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionSnapshot {
    services: BTreeMap<ShapeId, BTreeSet<ShapeId>>,
}

impl ExceptionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(content: &str) -> Result<Self, SnapshotError> {
        let value: Value = serde_json::from_str(content)?;
        let Value::Object(map) = value else {
            return Err(SnapshotError::InvalidFormat("top level is not an object".to_string()));
        };

        let mut snapshot = Self::new();
        for (service, entries) in map {
            let service_id = ShapeId::parse(&service).map_err(|_| SnapshotError::InvalidEntry {
                service: service.clone(),
                value: service.clone(),
            })?;
            let Value::Array(entries) = entries else {
                return Err(SnapshotError::InvalidFormat(format!(
                    "entry for {} is not an array",
                    service
                )));
            };

            let set = snapshot.services.entry(service_id).or_default();
            for entry in entries {
                let id = entry
                    .as_str()
                    .and_then(|s| ShapeId::parse(s).ok())
                    .ok_or_else(|| SnapshotError::InvalidEntry {
                        service: service.clone(),
                        value: entry.to_string(),
                    })?;
                set.insert(id);
            }
        }
        Ok(snapshot)
    }

    pub fn from_path(path: &Path) -> Result<Self, SnapshotError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Snapshot holding the captured entry for one service
    pub fn capture(graph: &SchemaGraph, service: &ShapeId) -> Self {
        let mut snapshot = Self::new();
        snapshot
            .services
            .insert(service.clone(), capture_entries(graph, service));
        snapshot
    }

    /// Whether the service has an entry, even an empty one
    pub fn is_enrolled(&self, service: &ShapeId) -> bool {
        self.services.contains_key(service)
    }

    pub fn for_service(&self, service: &ShapeId) -> Option<&BTreeSet<ShapeId>> {
        self.services.get(service)
    }

    pub fn contains(&self, service: &ShapeId, id: &ShapeId) -> bool {
        self.services
            .get(service)
            .map(|set| set.contains(id))
            .unwrap_or(false)
    }

    pub fn services(&self) -> impl Iterator<Item = &ShapeId> {
        self.services.keys()
    }

    /// Add an entry; returns false if it was already present
    pub fn insert(&mut self, service: ShapeId, id: ShapeId) -> bool {
        self.services.entry(service).or_default().insert(id)
    }

    /// Fold every entry of another snapshot into this one
    pub fn merge(&mut self, other: ExceptionSnapshot) {
        for (service, ids) in other.services {
            self.services.entry(service).or_default().extend(ids);
        }
    }

    pub fn to_json_value(&self) -> Value {
        let map = self
            .services
            .iter()
            .map(|(service, ids)| {
                let ids = ids.iter().map(|id| Value::String(id.to_string())).collect();
                (service.to_string(), Value::Array(ids))
            })
            .collect();
        Value::Object(map)
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(&self.to_json_value())?)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), SnapshotError> {
        let mut content = self.to_json_pretty()?;
        content.push('\n');
        fs::write(path, content)?;
        Ok(())
    }
}

//! Diagnostics
//!
//! Collects compatibility violations and informational events produced by the
//! nullability engine. Any error-level item fails the build.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::graph::ShapeId;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === Registration ===
    /// Newly defaulted boolean/numeric shape missing from the exception snapshot
    UnregisteredDefault,

    // === Derived properties ===
    ChangedNullable,
    ChangedMemberNullable,
    ChangedNillable,
    ChangedPointerLike,
    ChangedDereferenceable,

    // === Structure ===
    /// Shape was a member in the old graph and is not in the new one
    NoLongerMember,
    /// Shape was not a member in the old graph and is in the new one
    BecameMember,

    // === Snapshot ===
    /// Snapshot entry names a shape absent from the graph
    StaleSnapshotEntry,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnregisteredDefault => "N001",
            Self::ChangedNullable => "N002",
            Self::ChangedMemberNullable => "N003",
            Self::ChangedNillable => "N004",
            Self::ChangedPointerLike => "N005",
            Self::ChangedDereferenceable => "N006",
            Self::NoLongerMember => "N007",
            Self::BecameMember => "N008",
            Self::StaleSnapshotEntry => "I001",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::StaleSnapshotEntry => Severity::Info,
            _ => Severity::Error,
        }
    }

    /// Name of the derived property this code reports on
    pub fn property(&self) -> Option<&'static str> {
        match self {
            Self::ChangedNullable => Some("nullability"),
            Self::ChangedMemberNullable => Some("member nullability"),
            Self::ChangedNillable => Some("nillability"),
            Self::ChangedPointerLike => Some("pointer-likeness"),
            Self::ChangedDereferenceable => Some("dereferenceability"),
            Self::NoLongerMember | Self::BecameMember => Some("member-ness"),
            Self::UnregisteredDefault | Self::StaleSnapshotEntry => None,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Shape that caused this diagnostic
    pub shape_id: ShapeId,
    pub code: DiagnosticCode,
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Additional context (old/new values, remediation hints)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(shape_id: ShapeId, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            shape_id,
            code,
            severity: code.severity(),
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.severity,
            self.message,
            self.shape_id
        )?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from one evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    /// Newly defaulted shape that is not registered in the snapshot
    pub fn unregistered_default(&mut self, shape_id: &ShapeId, service: &ShapeId) {
        self.push(
            DiagnosticItem::new(
                shape_id.clone(),
                DiagnosticCode::UnregisteredDefault,
                format!(
                    "Shape {} gained a default and must be registered in the exception snapshot",
                    shape_id
                ),
            )
            .with_context(format!("Add \"{}\" under \"{}\" in the snapshot", shape_id, service)),
        );
    }

    /// A derived property differs between the two graph versions
    pub fn property_changed(&mut self, shape_id: &ShapeId, code: DiagnosticCode, old: bool, new: bool) {
        let property = code.property().unwrap_or("property");
        self.push(
            DiagnosticItem::new(
                shape_id.clone(),
                code,
                format!("Shape {} changed {}", shape_id, property),
            )
            .with_context(format!("{}: {} -> {}", property, old, new)),
        );
    }

    /// Shape moved between member and non-member
    pub fn member_ness_changed(&mut self, shape_id: &ShapeId, was_member: bool) {
        let code = if was_member {
            DiagnosticCode::NoLongerMember
        } else {
            DiagnosticCode::BecameMember
        };
        let detail = if was_member {
            "is no longer a member"
        } else {
            "became a member"
        };
        self.push(DiagnosticItem::new(
            shape_id.clone(),
            code,
            format!("Shape {} changed member-ness: {}", shape_id, detail),
        ));
    }

    /// Snapshot entry with no shape in the graph
    pub fn stale_snapshot_entry(&mut self, shape_id: &ShapeId, service: &ShapeId) {
        self.push(DiagnosticItem::new(
            shape_id.clone(),
            DiagnosticCode::StaleSnapshotEntry,
            format!(
                "Snapshot entry {} for {} does not exist in the model",
                shape_id, service
            ),
        ));
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.severity() == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Error)
    }

    pub fn infos(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Info)
    }

    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn info_count(&self) -> usize {
        self.infos().count()
    }

    /// Items reported against a given shape
    pub fn for_shape<'a>(&'a self, shape_id: &'a ShapeId) -> impl Iterator<Item = &'a DiagnosticItem> {
        self.items.iter().filter(move |i| &i.shape_id == shape_id)
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Format all diagnostics for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if self.has_errors() {
            output.push_str(&format!(
                "\n{} error(s), {} info\n",
                self.error_count(),
                self.info_count()
            ));
        } else if !self.is_empty() {
            output.push_str(&format!("\n{} info\n", self.info_count()));
        }

        output
    }

    /// Timestamped, serializable report
    pub fn to_report(&self, service: &ShapeId) -> DiagnosticReport {
        DiagnosticReport {
            service: service.clone(),
            generated_at: Utc::now(),
            bundle_hash: None,
            error_count: self.error_count(),
            info_count: self.info_count(),
            items: self.items.clone(),
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl IntoIterator for Diagnostics {
    type Item = DiagnosticItem;
    type IntoIter = std::vec::IntoIter<DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// =============================================================================
// Report
// =============================================================================

/// JSON report written by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub service: ShapeId,
    pub generated_at: DateTime<Utc>,
    /// Hash of the model sources the report was computed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_hash: Option<String>,
    pub error_count: usize,
    pub info_count: usize,
    pub items: Vec<DiagnosticItem>,
}

impl DiagnosticReport {
    pub fn with_bundle_hash(mut self, hash: Option<String>) -> Self {
        self.bundle_hash = hash;
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_severity() {
        assert_eq!(DiagnosticCode::ChangedNullable.severity(), Severity::Error);
        assert_eq!(DiagnosticCode::StaleSnapshotEntry.severity(), Severity::Info);
    }

    #[test]
    fn test_diagnostics_collection() {
        let svc = ShapeId::from("ns#Svc");
        let mut diags = Diagnostics::new();
        diags.unregistered_default(&ShapeId::from("ns#B"), &svc);
        diags.stale_snapshot_entry(&ShapeId::from("ns#Gone"), &svc);

        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.info_count(), 1);
        assert!(diags.has_errors());
        assert!(diags.format_all().contains("must be registered in the exception snapshot"));
    }

    #[test]
    fn test_property_message_names_property() {
        let mut diags = Diagnostics::new();
        let id = ShapeId::from("ns#Foo$bar");
        diags.property_changed(&id, DiagnosticCode::ChangedDereferenceable, true, false);
        diags.member_ness_changed(&id, true);

        let messages: Vec<&str> = diags.all().iter().map(|i| i.message.as_str()).collect();
        assert_eq!(messages[0], "Shape ns#Foo$bar changed dereferenceability");
        assert!(messages[1].contains("member-ness"));
        assert_eq!(diags.for_shape(&id).count(), 2);
    }

    #[test]
    fn test_report_json() {
        let svc = ShapeId::from("ns#Svc");
        let mut diags = Diagnostics::new();
        diags.stale_snapshot_entry(&ShapeId::from("ns#Gone"), &svc);
        let json = diags.to_report(&svc).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["service"], "ns#Svc");
        assert_eq!(value["info_count"], 1);
        assert_eq!(value["items"][0]["code"], "StaleSnapshotEntry");
        assert!(value["generated_at"].is_string());
        assert!(value.get("bundle_hash").is_none());
    }

    #[test]
    fn test_report_items_carry_severity() {
        let svc = ShapeId::from("ns#Svc");
        let mut diags = Diagnostics::new();
        diags.unregistered_default(&ShapeId::from("ns#B"), &svc);
        diags.stale_snapshot_entry(&ShapeId::from("ns#Gone"), &svc);

        let report = diags.to_report(&svc).with_bundle_hash(Some("abc123".to_string()));
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["items"][0]["severity"], "error");
        assert_eq!(value["items"][1]["severity"], "info");
        assert_eq!(value["bundle_hash"], "abc123");
    }
}

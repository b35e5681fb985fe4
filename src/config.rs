//! Configuration management for shape-guard
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (shape-guard.toml)
//! - Environment variables (SHAPE_GUARD__*)
//!
//! ## Example config file (shape-guard.toml):
//! ```toml
//! [snapshot]
//! path = "nullability-exceptions.json"
//!
//! [validation]
//! validate_http_bindings = true
//!
//! [nullability]
//! check_mode = "client-zero-value-v1-no-input"
//! services = ["com.example#Storage"]
//!
//! [report]
//! format = "json"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::resolver::CheckMode;
use crate::validation::ValidationOptions;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub nullability: NullabilityConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Exception snapshot location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Path to the snapshot JSON file
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,
}

/// Validation index settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Treat path-bound members as requiring validation
    #[serde(default)]
    pub validate_http_bindings: bool,
}

/// Nullability engine settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NullabilityConfig {
    #[serde(default)]
    pub check_mode: CheckMode,

    /// Services to check; empty means every service in the snapshot
    #[serde(default)]
    pub services: Vec<String>,
}

/// Report settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: ReportFormat,
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown report format: {}", other)),
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("nullability-exceptions.json")
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: default_snapshot_path(),
        }
    }
}

impl GuardConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["shape-guard.toml", ".shape-guard.toml", "config/shape-guard.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "shape-guard", "shape-guard") {
            let xdg_config = config_dir.config_dir().join("shape-guard.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SHAPE_GUARD__NULLABILITY__CHECK_MODE=server
        builder = builder.add_source(
            Environment::with_prefix("SHAPE_GUARD")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            validate_http_bindings: self.validation.validate_http_bindings,
        }
    }

    /// Snapshot path (resolves relative paths against the current directory)
    pub fn snapshot_path(&self) -> PathBuf {
        if self.snapshot.path.is_absolute() {
            self.snapshot.path.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.snapshot.path)
        }
    }
}

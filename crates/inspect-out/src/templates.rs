//! Template loading for report export.
//!
//! The templates file is YAML with:
//! - Multiple named Handlebars templates
//! - A per-template escape mode (HTML documents escape, plain text does not)
//! - Documentation for the custom helpers

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::RenderError;

/// Templates shipped with the crate.
pub const EMBEDDED_TEMPLATES: &str = include_str!("../templates/report-templates.yaml");

/// Top-level templates file structure
#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesFile {
    pub version: String,
    pub templates: HashMap<String, Template>,
    #[serde(default)]
    pub helpers: HashMap<String, HelperDoc>,
}

/// A single template definition
#[derive(Debug, Clone, Deserialize)]
pub struct Template {
    pub description: String,
    pub template: String,
    #[serde(default)]
    pub escape: EscapeMode,
}

/// How expression output is escaped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeMode {
    #[default]
    Html,
    None,
}

/// Helper documentation
#[derive(Debug, Clone, Deserialize)]
pub struct HelperDoc {
    pub description: String,
    #[serde(default)]
    pub usage: Option<String>,
}

impl TemplatesFile {
    /// Load templates from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RenderError::Template(format!(
                "Failed to read templates file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse templates from YAML content
    pub fn from_yaml(yaml: &str) -> Result<Self, RenderError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| RenderError::Template(format!("Failed to parse templates YAML: {}", e)))
    }

    /// The templates compiled into the crate.
    pub fn embedded() -> Result<Self, RenderError> {
        Self::from_yaml(EMBEDDED_TEMPLATES)
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// List all template names
    pub fn list_templates(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

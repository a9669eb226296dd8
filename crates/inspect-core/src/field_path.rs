//! Dotted field paths for report updates (`sections.GROUND.fuel_tank.status`).
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::InspectError;

/// Fields that identify a report and therefore cannot be rewritten.
const KEY_FIELDS: &[&str] = &["header.serial_number", "header.timestamp"];

/// A validated dotted path naming one leaf of the report template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_key_field(&self) -> bool {
        KEY_FIELDS.contains(&self.to_string().as_str())
    }

    /// Check that the path resolves to a leaf of `template` and is writable.
    pub fn check_against(&self, template: &Value) -> Result<(), InspectError> {
        if self.is_key_field() {
            return Err(InspectError::ImmutableField(self.to_string()));
        }
        let mut node = template;
        for segment in &self.segments {
            node = node.get(segment).ok_or_else(|| InspectError::InvalidPath {
                path: self.to_string(),
                reason: format!("'{}' is not part of the report schema", segment),
            })?;
        }
        if node.is_object() {
            return Err(InspectError::InvalidPath {
                path: self.to_string(),
                reason: "path names a group of fields, not a single field".to_string(),
            });
        }
        Ok(())
    }

    /// Overwrite the leaf this path names. Intermediate mappings must exist.
    pub fn apply(&self, doc: &mut Value, value: Value) -> Result<(), InspectError> {
        let (leaf, parents) = self
            .segments
            .split_last()
            .ok_or_else(|| InspectError::InvalidPath {
                path: String::new(),
                reason: "empty path".to_string(),
            })?;

        let mut node = doc;
        for segment in parents {
            node = node.get_mut(segment).ok_or_else(|| InspectError::InvalidPath {
                path: self.to_string(),
                reason: format!("'{}' does not exist in the stored report", segment),
            })?;
        }
        match node {
            Value::Object(map) => {
                map.insert(leaf.clone(), value);
                Ok(())
            }
            _ => Err(InspectError::InvalidPath {
                path: self.to_string(),
                reason: "parent is not a mapping".to_string(),
            }),
        }
    }
}

impl FromStr for FieldPath {
    type Err = InspectError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| InspectError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        let raw_trimmed = raw.trim();
        if raw_trimmed.is_empty() {
            return Err(invalid("empty path"));
        }

        let mut segments = Vec::new();
        for segment in raw_trimmed.split('.') {
            if segment.is_empty() {
                return Err(invalid("empty path segment"));
            }
            if segment.contains(['*', '[', ']']) {
                return Err(invalid("wildcards and array indices are not supported"));
            }
            if segment.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid("wildcards and array indices are not supported"));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

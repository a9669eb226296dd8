//! Save-time business rules.
//!
//! [`validate_report`] takes a template-shaped document (the output of
//! [`crate::enforce_schema`]) and either produces a typed
//! [`InspectionReport`] or the full list of rule violations, each with a
//! human-readable reason an agent can relay back to the technician.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::data_model::{timestamp_format, InspectionReport, Zone};
use crate::status::Status;

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted path of the offending field
    pub field: String,
    /// Human-readable reason
    pub reason: String,
}

impl Violation {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Every violation found in one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn single(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            violations: vec![Violation::new(field, reason)],
        }
    }

    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reasons: Vec<&str> = self.violations.iter().map(|v| v.reason.as_str()).collect();
        f.write_str(&reasons.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Check every business rule, then convert to the typed report.
pub fn validate_report(doc: &Value) -> Result<InspectionReport, ValidationError> {
    let mut doc = doc.clone();
    normalize_serial(&mut doc);

    let mut violations = Vec::new();

    check_serial_number(&doc, &mut violations);
    check_primary_status(&doc, &mut violations);
    check_general_comments(&doc, &mut violations);
    check_component_statuses(&doc, &mut violations);
    check_header_types(&doc, &mut violations);

    if !violations.is_empty() {
        return Err(ValidationError { violations });
    }

    serde_json::from_value(doc)
        .map_err(|e| ValidationError::single("report", format!("Invalid report: {}", e)))
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn check_serial_number(doc: &Value, out: &mut Vec<Violation>) {
    if non_empty_str(&doc["header"]["serial_number"]).is_none() {
        out.push(Violation::new("header.serial_number", "Missing serial_number"));
    }
}

fn check_primary_status(doc: &Value, out: &mut Vec<Violation>) {
    let primary = &doc["primary_status"];
    match primary {
        Value::Null => out.push(Violation::new("primary_status", "Missing primary_status")),
        Value::String(s) if s.trim().is_empty() => {
            out.push(Violation::new("primary_status", "Missing primary_status"))
        }
        Value::String(s) => {
            if let Err(reason) = s.parse::<Status>() {
                out.push(Violation::new(
                    "primary_status",
                    reason.replace("Invalid status", "Invalid primary_status"),
                ));
            }
        }
        other => out.push(Violation::new(
            "primary_status",
            format!(
                "Invalid primary_status {}: expected GREEN, YELLOW or RED",
                other
            ),
        )),
    }
}

fn check_general_comments(doc: &Value, out: &mut Vec<Violation>) {
    if non_empty_str(&doc["general_comments"]).is_none() {
        out.push(Violation::new("general_comments", "Missing general_comments"));
    }
}

fn check_component_statuses(doc: &Value, out: &mut Vec<Violation>) {
    for zone in Zone::ALL {
        for key in zone.component_keys() {
            let field = format!("sections.{}.{}.status", zone, key);
            let status = &doc["sections"][zone.as_str()][*key]["status"];
            let valid = status
                .as_str()
                .map(|s| s.parse::<Status>().is_ok())
                .unwrap_or(false);
            if !valid {
                let shown = status
                    .as_str()
                    .map(|s| format!("'{}'", s))
                    .unwrap_or_else(|| status.to_string());
                out.push(Violation::new(
                    field.clone(),
                    format!("Invalid status {} at {}", shown, field),
                ));
            }
            if !doc["sections"][zone.as_str()][*key]["comments"].is_string() {
                let field = format!("sections.{}.{}.comments", zone, key);
                out.push(Violation::new(
                    field.clone(),
                    format!("Invalid {}: comments must be text", field),
                ));
            }
        }
    }
}

fn check_header_types(doc: &Value, out: &mut Vec<Violation>) {
    let header = &doc["header"];

    match header["date"].as_str() {
        Some(raw) if chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok() => {}
        _ => out.push(Violation::new(
            "header.date",
            format!("Invalid header.date: {} is not a YYYY-MM-DD date", header["date"]),
        )),
    }

    match header["timestamp"].as_str() {
        Some(raw) if timestamp_format::parse(raw).is_ok() => {}
        _ => out.push(Violation::new(
            "header.timestamp",
            format!(
                "Invalid header.timestamp: {} is not an ISO-8601 instant",
                header["timestamp"]
            ),
        )),
    }

    if header["machine_hours"].as_u64().is_none() {
        out.push(Violation::new(
            "header.machine_hours",
            format!(
                "Invalid header.machine_hours: {} is not a non-negative integer",
                header["machine_hours"]
            ),
        ));
    }

    if !(header["inspector"].is_null() || header["inspector"].is_string()) {
        out.push(Violation::new(
            "header.inspector",
            "Invalid header.inspector: must be text",
        ));
    }
}

/// A serial number dictated as digits arrives as a JSON number; store it as
/// a trimmed string so equality lookups behave.
pub fn normalize_serial(doc: &mut Value) {
    let Some(serial) = doc
        .get_mut("header")
        .and_then(|header| header.get_mut("serial_number"))
    else {
        return;
    };
    let normalized = match &*serial {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if s.trim().len() != s.len() => Some(s.trim().to_string()),
        _ => None,
    };
    if let Some(value) = normalized {
        *serial = Value::String(value);
    }
}

/// Rewrite spoken status phrases ("leaking", "looks good") in component
/// and primary status slots to their canonical value.
///
/// Values that are already canonical, not text, or ambiguous are left alone;
/// validation reports whatever is still wrong at save time.
pub fn normalize_statuses(doc: &mut Value) {
    let mut slots: Vec<&mut Value> = Vec::new();
    if let Some(obj) = doc.as_object_mut() {
        for (key, value) in obj.iter_mut() {
            match key.as_str() {
                "primary_status" => slots.push(value),
                "sections" => {
                    let sections = value
                        .as_object_mut()
                        .into_iter()
                        .flat_map(|zones| zones.values_mut())
                        .filter_map(Value::as_object_mut);
                    for section in sections {
                        slots.extend(
                            section
                                .values_mut()
                                .filter_map(|component| component.get_mut("status")),
                        );
                    }
                }
                _ => {}
            }
        }
    }

    for slot in slots {
        let Some(raw) = slot.as_str() else { continue };
        if raw.parse::<Status>().is_ok() {
            continue;
        }
        if let Some(status) = Status::from_phrase(raw) {
            *slot = Value::String(status.as_str().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::report_template;
    use serde_json::json;

    fn complete() -> Value {
        let mut doc = report_template();
        doc["header"]["serial_number"] = json!("1234");
        doc["primary_status"] = json!("GREEN");
        doc["general_comments"] = json!("ok");
        doc
    }

    #[test]
    fn test_complete_report_validates() {
        let report = validate_report(&complete()).unwrap();
        assert_eq!(report.serial_number(), Some("1234"));
        assert_eq!(report.primary_status, Status::Green);
        assert_eq!(report.components().count(), 38);
    }

    #[test]
    fn test_missing_primary_status() {
        let mut doc = complete();
        doc["primary_status"] = Value::Null;
        let err = validate_report(&doc).unwrap_err();
        assert_eq!(err.fields(), vec!["primary_status"]);
        assert!(err.to_string().contains("primary_status"));
    }

    #[test]
    fn test_primary_status_must_be_in_enum() {
        let mut doc = complete();
        doc["primary_status"] = json!("BLUE");
        let err = validate_report(&doc).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid primary_status 'BLUE': expected GREEN, YELLOW or RED"
        );
    }

    #[test]
    fn test_all_violations_reported() {
        let err = validate_report(&report_template()).unwrap_err();
        assert_eq!(
            err.fields(),
            vec!["header.serial_number", "primary_status", "general_comments"]
        );
    }

    #[test]
    fn test_whitespace_comments_rejected() {
        let mut doc = complete();
        doc["general_comments"] = json!("   ");
        let err = validate_report(&doc).unwrap_err();
        assert!(err.to_string().contains("Missing general_comments"));
    }

    #[test]
    fn test_invalid_component_status() {
        let mut doc = complete();
        doc["sections"]["ENGINE"]["radiator"]["status"] = json!("ORANGE");
        let err = validate_report(&doc).unwrap_err();
        assert_eq!(err.fields(), vec!["sections.ENGINE.radiator.status"]);
        assert!(err.to_string().contains("ORANGE"));
    }

    #[test]
    fn test_invalid_header_types() {
        let mut doc = complete();
        doc["header"]["machine_hours"] = json!(-5);
        doc["header"]["date"] = json!("last tuesday");
        let err = validate_report(&doc).unwrap_err();
        assert_eq!(err.fields(), vec!["header.date", "header.machine_hours"]);
    }

    #[test]
    fn test_numeric_serial_normalized() {
        let mut doc = complete();
        doc["header"]["serial_number"] = json!(5678);
        let report = validate_report(&doc).unwrap();
        assert_eq!(report.serial_number(), Some("5678"));
    }

    #[test]
    fn test_status_phrases_normalized() {
        let mut doc = complete();
        doc["sections"]["ENGINE"]["radiator"]["status"] = json!("leaking");
        doc["sections"]["GROUND"]["fuel_tank"]["status"] = json!("Monitor");
        doc["sections"]["GROUND"]["air_tank"]["status"] = json!("good but leaking");
        doc["primary_status"] = json!("Fail");

        normalize_statuses(&mut doc);
        assert_eq!(doc["sections"]["ENGINE"]["radiator"]["status"], json!("RED"));
        assert_eq!(doc["sections"]["GROUND"]["fuel_tank"]["status"], json!("YELLOW"));
        assert_eq!(doc["sections"]["GROUND"]["air_tank"]["status"], json!("good but leaking"));
        assert_eq!(doc["primary_status"], json!("RED"));
        assert_eq!(doc["general_comments"], json!("ok"));
    }
}

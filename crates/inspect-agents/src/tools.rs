//! Tool calls the model may request inside a reply.
//!
//! ```json
//! {"message": "Saving now.", "tool": {"name": "save_report"}}
//! {"message": "", "tool": {"name": "fetch_history", "serial_number": "1234"}}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    /// Persist the session draft, optionally merging a final payload first.
    SaveReport {
        #[serde(default)]
        report_data: Option<Value>,
    },
    /// Recent reports for one machine.
    FetchHistory { serial_number: String },
    /// Field-level patch of one stored report.
    UpdateReport {
        serial_number: String,
        timestamp: String,
        updates: BTreeMap<String, Value>,
    },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::SaveReport { .. } => "save_report",
            ToolCall::FetchHistory { .. } => "fetch_history",
            ToolCall::UpdateReport { .. } => "update_report",
        }
    }
}

/// A tool request as found in a reply: either a well-formed call or the
/// reason it could not be understood (reported back to the model).
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    Call(ToolCall),
    Invalid { name: String, reason: String },
}

impl ToolRequest {
    pub fn from_value(value: Value) -> Self {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_string();
        match serde_json::from_value::<ToolCall>(value) {
            Ok(call) => ToolRequest::Call(call),
            Err(e) => ToolRequest::Invalid {
                name,
                reason: e.to_string(),
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ToolRequest::Call(call) => call.name(),
            ToolRequest::Invalid { name, .. } => name,
        }
    }
}

/// The turn fed back to the model after a tool ran.
pub fn tool_result_turn(name: &str, result: &Value) -> String {
    format!("TOOL_RESULT {} {}", name, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_update_report() {
        let request = ToolRequest::from_value(json!({
            "name": "update_report",
            "serial_number": "1234",
            "timestamp": "2026-03-01T08:00:00.000000Z",
            "updates": { "sections.GROUND.fuel_tank.status": "RED" }
        }));
        let ToolRequest::Call(ToolCall::UpdateReport { updates, .. }) = request else {
            panic!("expected update_report, got {:?}", request);
        };
        assert_eq!(updates["sections.GROUND.fuel_tank.status"], json!("RED"));
    }

    #[test]
    fn test_save_report_without_args() {
        let request = ToolRequest::from_value(json!({ "name": "save_report" }));
        assert_eq!(
            request,
            ToolRequest::Call(ToolCall::SaveReport { report_data: None })
        );
    }

    #[test]
    fn test_unknown_tool_is_invalid() {
        let request = ToolRequest::from_value(json!({ "name": "locate_zone", "image": "..." }));
        assert_eq!(request.name(), "locate_zone");
        assert!(matches!(request, ToolRequest::Invalid { .. }));
    }

    #[test]
    fn test_missing_argument_is_invalid() {
        let request = ToolRequest::from_value(json!({ "name": "fetch_history" }));
        let ToolRequest::Invalid { reason, .. } = request else {
            panic!("expected invalid");
        };
        assert!(reason.contains("serial_number"));
    }
}

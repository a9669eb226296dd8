//! Parsing model replies and cleaning text for speech.
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::tools::ToolRequest;

/// One parsed model turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentReply {
    pub message: String,
    /// Partial report in template shape
    pub updates: Option<Value>,
    pub tool: Option<ToolRequest>,
}

/// Parse a raw model turn.
///
/// Accepts a bare JSON object, one wrapped in a markdown code fence, or one
/// surrounded by prose. Anything else is treated as a plain message with no
/// updates.
pub fn parse_reply(raw: &str) -> AgentReply {
    let Some(Value::Object(mut object)) = extract_json(raw) else {
        debug!("Model reply is not JSON; treating it as plain text");
        return AgentReply {
            message: raw.trim().to_string(),
            ..Default::default()
        };
    };

    let message = match object.remove("message") {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    let updates = object
        .remove("updates")
        .filter(|u| u.as_object().is_some_and(|m| !m.is_empty()));
    let tool = object
        .remove("tool")
        .filter(|t| !t.is_null())
        .map(ToolRequest::from_value);

    AgentReply {
        message,
        updates,
        tool,
    }
}

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").expect("valid regex"));

fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    let unfenced = CODE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        return Some(value);
    }

    // Prose around the object: take the outermost braces.
    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&unfenced[start..=end]).ok()
}

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.+?)\*").expect("valid regex"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`(.+?)`").expect("valid regex"));
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"#+\s*").expect("valid regex"));
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-•]\s+").expect("valid regex"));

/// Remove markdown emphasis, code ticks, headings and bullets so the text
/// reads cleanly through text-to-speech.
pub fn strip_markdown(text: &str) -> String {
    let text = BOLD.replace_all(text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = BULLET.replace_all(&text, "");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolCall;
    use serde_json::json;

    #[test]
    fn test_plain_json_reply() {
        let reply = parse_reply(
            r#"{"message": "Got it. Fuel tank is RED.", "updates": {"sections": {"GROUND": {"fuel_tank": {"status": "RED", "comments": "leaking at seam"}}}}}"#,
        );
        assert_eq!(reply.message, "Got it. Fuel tank is RED.");
        assert_eq!(
            reply.updates.unwrap()["sections"]["GROUND"]["fuel_tank"]["status"],
            json!("RED")
        );
        assert!(reply.tool.is_none());
    }

    #[test]
    fn test_fenced_reply() {
        let raw = "```json\n{\"message\": \"Saving.\", \"tool\": {\"name\": \"save_report\"}}\n```";
        let reply = parse_reply(raw);
        assert_eq!(reply.message, "Saving.");
        assert_eq!(
            reply.tool,
            Some(ToolRequest::Call(ToolCall::SaveReport { report_data: None }))
        );
    }

    #[test]
    fn test_prose_wrapped_reply() {
        let reply = parse_reply("Sure! {\"message\": \"Next, the engine oil?\"} Thanks.");
        assert_eq!(reply.message, "Next, the engine oil?");
    }

    #[test]
    fn test_non_json_reply_is_plain_message() {
        let reply = parse_reply("  What is the serial number?  ");
        assert_eq!(reply.message, "What is the serial number?");
        assert!(reply.updates.is_none());
        assert!(reply.tool.is_none());
    }

    #[test]
    fn test_empty_updates_dropped() {
        let reply = parse_reply(r#"{"message": "ok", "updates": {}, "tool": null}"#);
        assert!(reply.updates.is_none());
        assert!(reply.tool.is_none());
    }

    #[test]
    fn test_strip_markdown() {
        let spoken = strip_markdown("## Summary\n- **Tires**: *worn*\n- `fuel_tank` ok");
        assert_eq!(spoken, "Summary\nTires: worn\nfuel_tank ok");
    }
}

//! Analysis agent: answers questions about past reports and patches them.

use std::sync::Arc;

use inspect_store::ReportService;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::llm::{LlmClient, Turn};
use crate::prompts::reviewer_prompt;
use crate::reply::parse_reply;
use crate::tools::{tool_result_turn, ToolCall, ToolRequest};
use crate::MAX_TOOL_ROUNDS;

#[derive(Debug, Clone, Serialize)]
pub struct ReviewTurn {
    pub analysis: String,
    /// Names of the tools that ran, in order.
    pub tools_used: Vec<String>,
}

pub struct ReviewSession {
    llm: Arc<dyn LlmClient>,
    reports: ReportService,
    history: Vec<Turn>,
}

impl ReviewSession {
    pub fn new(llm: Arc<dyn LlmClient>, reports: ReportService) -> Self {
        Self {
            llm,
            reports,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub async fn handle(&mut self, text: &str) -> Result<ReviewTurn> {
        self.history.push(Turn::user(text));
        let system = reviewer_prompt();
        let mut analysis = String::new();
        let mut tools_used = Vec::new();

        for round in 0..=MAX_TOOL_ROUNDS {
            let raw = self.llm.generate(&system, &self.history).await?;
            self.history.push(Turn::model(raw.clone()));

            let reply = parse_reply(&raw);
            if reply.updates.is_some() {
                debug!("Reviewer reply carried draft updates; ignored");
            }
            if !reply.message.is_empty() {
                analysis = reply.message;
            }

            let Some(request) = reply.tool else {
                break;
            };
            if round == MAX_TOOL_ROUNDS {
                warn!(tool = request.name(), "Tool round limit reached; ignoring request");
                break;
            }

            let name = request.name().to_string();
            let result = self.run_tool(request);
            tools_used.push(name.clone());
            self.history.push(Turn::user(tool_result_turn(&name, &result)));
        }

        Ok(ReviewTurn {
            analysis,
            tools_used,
        })
    }

    fn run_tool(&self, request: ToolRequest) -> Value {
        let outcome = match request {
            ToolRequest::Call(ToolCall::FetchHistory { serial_number }) => {
                debug!(%serial_number, "Reviewer fetching history");
                serde_json::to_value(self.reports.history(&serial_number))
            }
            ToolRequest::Call(ToolCall::UpdateReport {
                serial_number,
                timestamp,
                updates,
            }) => {
                info!(%serial_number, %timestamp, fields = updates.len(), "Reviewer updating report");
                serde_json::to_value(self.reports.update(&serial_number, &timestamp, &updates))
            }
            ToolRequest::Call(other) => {
                return json!({
                    "success": false,
                    "error": format!("Tool '{}' is not available to the reviewer", other.name()),
                })
            }
            ToolRequest::Invalid { name, reason } => {
                return json!({
                    "success": false,
                    "error": format!("Could not understand tool '{}': {}", name, reason),
                })
            }
        };
        outcome.unwrap_or_else(|e| json!({ "success": false, "error": e.to_string() }))
    }
}

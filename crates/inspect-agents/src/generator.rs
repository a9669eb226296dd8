//! Dictation agent: turns a technician's utterances into a report draft.

use std::sync::Arc;

use inspect_core::{enforce_schema, normalize_statuses, report_template, unknown_keys};
use inspect_store::{Outcome, ReportService, SaveReceipt};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::llm::{LlmClient, Turn};
use crate::prompts::generator_prompt;
use crate::reply::parse_reply;
use crate::tools::{tool_result_turn, ToolCall, ToolRequest};
use crate::MAX_TOOL_ROUNDS;

/// Spoken when the model cannot acknowledge a save that went through.
const SAVED_FALLBACK: &str = "Inspection report saved.";

/// What one user turn produced.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorTurn {
    pub message: String,
    /// Set when the model asked to save during this turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<Outcome<SaveReceipt>>,
}

/// One conversation with the dictation agent.
///
/// Owns the draft report. Model updates are merged into the draft through
/// [`enforce_schema`] with the draft itself as the template, so a reply can
/// only overwrite fields that exist and never removes any.
pub struct InspectionSession {
    llm: Arc<dyn LlmClient>,
    reports: ReportService,
    draft: Value,
    history: Vec<Turn>,
    completed: usize,
}

impl InspectionSession {
    pub fn new(llm: Arc<dyn LlmClient>, reports: ReportService) -> Self {
        Self {
            llm,
            reports,
            draft: report_template(),
            history: Vec::new(),
            completed: 0,
        }
    }

    pub fn draft(&self) -> &Value {
        &self.draft
    }

    /// Reports saved by this session so far.
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Run one user turn, including any tool rounds the model requests.
    pub async fn handle(&mut self, text: &str) -> Result<GeneratorTurn> {
        self.history.push(Turn::user(text));
        let mut saved: Option<Outcome<SaveReceipt>> = None;
        let mut message = String::new();

        for round in 0..=MAX_TOOL_ROUNDS {
            let system = generator_prompt(&self.draft);
            let raw = match self.llm.generate(&system, &self.history).await {
                Ok(raw) => raw,
                // The report is already stored; the turn must still finalize.
                Err(err) if saved.as_ref().is_some_and(Outcome::is_success) => {
                    warn!(error = %err, "Model call failed after the report was saved");
                    message = SAVED_FALLBACK.to_string();
                    break;
                }
                Err(err) => return Err(err),
            };
            self.history.push(Turn::model(raw.clone()));

            let reply = parse_reply(&raw);
            if let Some(updates) = &reply.updates {
                self.merge(updates);
            }
            if !reply.message.is_empty() {
                message = reply.message;
            }

            let Some(request) = reply.tool else {
                break;
            };
            if round == MAX_TOOL_ROUNDS {
                warn!(tool = request.name(), "Tool round limit reached; ignoring request");
                break;
            }

            let name = request.name().to_string();
            let result = match request {
                ToolRequest::Call(ToolCall::SaveReport { .. })
                    if saved.as_ref().is_some_and(Outcome::is_success) =>
                {
                    json!({ "success": false, "error": "Report already saved in this turn" })
                }
                ToolRequest::Call(ToolCall::SaveReport { report_data }) => {
                    if let Some(payload) = &report_data {
                        self.merge(payload);
                    }
                    let outcome = self.reports.save(&self.draft);
                    let result = serde_json::to_value(&outcome).unwrap_or(Value::Null);
                    saved = Some(outcome);
                    result
                }
                ToolRequest::Call(other) => json!({
                    "success": false,
                    "error": format!("Tool '{}' is not available to the inspection assistant", other.name()),
                }),
                ToolRequest::Invalid { reason, .. } => json!({
                    "success": false,
                    "error": format!("Could not understand tool '{}': {}", name, reason),
                }),
            };
            debug!(round, tool = %name, "Feeding tool result back to the model");
            self.history.push(Turn::user(tool_result_turn(&name, &result)));
        }

        if saved.as_ref().is_some_and(Outcome::is_success) {
            self.finalize();
        }

        Ok(GeneratorTurn { message, saved })
    }

    fn merge(&mut self, updates: &Value) {
        let dropped = unknown_keys(updates, &self.draft);
        if !dropped.is_empty() {
            warn!(keys = ?dropped, "Model proposed keys outside the checklist");
        }
        self.draft = enforce_schema(updates, &self.draft);
        normalize_statuses(&mut self.draft);
    }

    /// Start over after a successful save.
    fn finalize(&mut self) {
        self.completed += 1;
        self.draft = report_template();
        self.history.clear();
        info!(completed = self.completed, "Inspection finalized; new draft started");
    }
}

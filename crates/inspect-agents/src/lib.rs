//! Inspection Agents: the two conversational roles around the report store
//!
//! - [`InspectionSession`] (generator) fills a draft report from dictation
//!   and saves it through the `save_report` tool.
//! - [`ReviewSession`] (reviewer) reads history and patches stored reports
//!   through `fetch_history` and `update_report`.
//!
//! Both speak to the model through [`LlmClient`] and expect the JSON reply
//! contract parsed by [`parse_reply`]. Sessions are plain values; whoever
//! serves them decides how they are keyed and shared.

pub mod error;
pub mod generator;
pub mod llm;
pub mod prompts;
pub mod reply;
pub mod reviewer;
pub mod tools;

pub use error::AgentError;
pub use generator::{GeneratorTurn, InspectionSession};
pub use llm::{GeminiClient, LlmClient, Role, Turn, DEFAULT_MODEL};
pub use reply::{parse_reply, strip_markdown, AgentReply};
pub use reviewer::{ReviewSession, ReviewTurn};
pub use tools::{ToolCall, ToolRequest};

/// Tool calls honoured per user turn before the model must answer.
pub const MAX_TOOL_ROUNDS: usize = 3;

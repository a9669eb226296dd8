//! Scripted LLM for Testing
//!
//! Replays canned replies in order and records every request.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use inspect_agents::{AgentError, LlmClient, Turn};

#[derive(Debug, Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    /// Conversation sent with each `generate` call
    pub requests: Mutex<Vec<Vec<Turn>>>,
    /// System prompt sent with each `generate` call
    pub systems: Mutex<Vec<String>>,
    pub transcript: String,
}

impl ScriptedLlm {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn with_transcript(mut self, transcript: &str) -> Self {
        self.transcript = transcript.to_string();
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Vec<Turn> {
        self.requests.lock().unwrap().last().cloned().unwrap_or_default()
    }

    pub fn last_system(&self) -> String {
        self.systems.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, system: &str, turns: &[Turn]) -> Result<String, AgentError> {
        self.systems.lock().unwrap().push(system.to_string());
        self.requests.lock().unwrap().push(turns.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(AgentError::EmptyResponse)
    }

    async fn transcribe(&self, _wav: &[u8]) -> Result<String, AgentError> {
        Ok(self.transcript.clone())
    }
}

//! Voice websockets.
//!
//! `/ws/stt` buffers streamed PCM and returns a transcript when the client
//! stops or the speaker goes quiet. `/ws/inspect` runs one dictation
//! session per connection over text or recorded-audio utterances.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use inspect_agents::{strip_markdown, InspectionSession};
use inspect_store::{Outcome, SaveReceipt};
use serde::{Deserialize, Serialize};

use crate::audio::{pcm_to_wav, SilenceDetector, MAX_UTTERANCE_BYTES, SAMPLE_RATE};
use crate::state::AppState;

type WsSink = SplitSink<WebSocket, Message>;

// ============================================================================
// Wire messages
// ============================================================================

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SttCommand {
    Start,
    Stop,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InspectIncoming {
    Utterance { text: String },
    /// Base64 WAV recorded by the client.
    AudioUtterance { data: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsOutgoing {
    Status {
        status: &'static str,
    },
    Transcript {
        text: String,
        status: &'static str,
    },
    UserTranscript {
        text: String,
    },
    AgentText {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        saved: Option<Outcome<SaveReceipt>>,
    },
    Error {
        message: String,
    },
}

async fn send(sink: &mut WsSink, msg: &WsOutgoing) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode websocket message");
            return true;
        }
    };
    sink.send(Message::Text(json)).await.is_ok()
}

// ============================================================================
// Speech to text
// ============================================================================

/// Recording state of one `/ws/stt` connection.
#[derive(Debug, Default)]
pub(crate) struct SttSession {
    recording: bool,
    buffer: Vec<u8>,
    detector: SilenceDetector,
}

impl SttSession {
    fn start(&mut self) {
        self.recording = true;
        self.buffer.clear();
        self.detector.reset();
    }

    /// Stop recording and hand back whatever was captured.
    fn stop(&mut self) -> Vec<u8> {
        self.recording = false;
        self.detector.reset();
        std::mem::take(&mut self.buffer)
    }

    /// Append audio; returns the utterance once trailing silence ends it
    /// or it reaches [`MAX_UTTERANCE_BYTES`].
    fn push(&mut self, pcm: &[u8]) -> Option<Vec<u8>> {
        if !self.recording {
            return None;
        }
        self.buffer.extend_from_slice(pcm);
        let ended = self.detector.push(pcm);
        if ended || self.buffer.len() >= MAX_UTTERANCE_BYTES {
            if !ended {
                tracing::debug!(bytes = self.buffer.len(), "Utterance length limit reached");
            }
            return Some(self.stop());
        }
        None
    }
}

pub async fn stt(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_stt(socket, state))
}

async fn handle_stt(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let mut session = SttSession::default();
    tracing::info!("STT connection opened");

    while let Some(msg) = stream.next().await {
        let pcm = match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<SttCommand>(&text) {
                Ok(SttCommand::Start) => {
                    session.start();
                    if !send(&mut sink, &WsOutgoing::Status { status: "listening" }).await {
                        break;
                    }
                    continue;
                }
                Ok(SttCommand::Stop) => session.stop(),
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring unknown STT command");
                    continue;
                }
            },
            Ok(Message::Binary(data)) => match session.push(&data) {
                Some(pcm) => pcm,
                None => continue,
            },
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let reply = transcribe_pcm(&state, &pcm).await;
        if !send(&mut sink, &reply).await {
            break;
        }
    }
    tracing::info!("STT connection closed");
}

async fn transcribe_pcm(state: &AppState, pcm: &[u8]) -> WsOutgoing {
    if pcm.is_empty() {
        return WsOutgoing::Transcript {
            text: String::new(),
            status: "idle",
        };
    }
    let wav = pcm_to_wav(pcm, SAMPLE_RATE);
    match transcribe_wav(state, &wav).await {
        Ok(text) => WsOutgoing::Transcript {
            text,
            status: "idle",
        },
        Err(message) => WsOutgoing::Error { message },
    }
}

async fn transcribe_wav(state: &AppState, wav: &[u8]) -> Result<String, String> {
    state.metrics.record_transcription();
    state
        .llm
        .transcribe(wav)
        .await
        .map(|text| text.trim().to_string())
        .map_err(|e| {
            tracing::warn!(error = %e, "Transcription failed");
            e.to_string()
        })
}

// ============================================================================
// Dictation
// ============================================================================

pub async fn inspect(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_inspect(socket, state))
}

async fn handle_inspect(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let mut session = state.new_generator();
    tracing::info!("Inspection connection opened");

    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let utterance = match serde_json::from_str::<InspectIncoming>(&text) {
            Ok(InspectIncoming::Utterance { text }) => text,
            Ok(InspectIncoming::AudioUtterance { data }) => {
                let transcript = match decode_audio(&data) {
                    Ok(wav) => transcribe_wav(&state, &wav).await,
                    Err(e) => Err(e),
                };
                match transcript {
                    Ok(text) => text,
                    Err(message) => {
                        if !send(&mut sink, &WsOutgoing::Error { message }).await {
                            break;
                        }
                        continue;
                    }
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unknown inspection message");
                continue;
            }
        };

        let utterance = utterance.trim().to_string();
        if utterance.is_empty() {
            continue;
        }
        if !send(&mut sink, &WsOutgoing::UserTranscript { text: utterance.clone() }).await {
            break;
        }

        let reply = run_turn(&state, &mut session, &utterance).await;
        if !send(&mut sink, &reply).await {
            break;
        }
    }
    tracing::info!(completed = session.completed(), "Inspection connection closed");
}

fn decode_audio(data: &str) -> Result<Vec<u8>, String> {
    STANDARD
        .decode(data.trim())
        .map_err(|e| format!("Invalid audio payload: {}", e))
}

async fn run_turn(state: &AppState, session: &mut InspectionSession, text: &str) -> WsOutgoing {
    match session.handle(text).await {
        Ok(turn) => {
            state.metrics.record_turn("generator");
            if let Some(saved) = &turn.saved {
                state.metrics.record_save(saved);
            }
            WsOutgoing::AgentText {
                text: strip_markdown(&turn.message),
                saved: turn.saved,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Dictation turn failed");
            WsOutgoing::Error {
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(amplitude: i16, samples: usize) -> Vec<u8> {
        (0..samples)
            .flat_map(|i| {
                let s = if i % 2 == 0 { amplitude } else { -amplitude };
                s.to_le_bytes()
            })
            .collect()
    }

    #[test]
    fn test_audio_ignored_until_start() {
        let mut session = SttSession::default();
        assert!(session.push(&tone(3000, 1600)).is_none());
        assert!(session.stop().is_empty());
    }

    #[test]
    fn test_stop_returns_buffer() {
        let mut session = SttSession::default();
        session.start();
        session.push(&tone(3000, 1600));
        session.push(&tone(3000, 1600));
        assert_eq!(session.stop().len(), 6400);
        assert!(session.push(&tone(3000, 1600)).is_none());
    }

    #[test]
    fn test_silence_flushes_utterance() {
        let mut session = SttSession::default();
        session.start();
        assert!(session.push(&tone(3000, 1600)).is_none());
        let mut flushed = None;
        for _ in 0..8 {
            flushed = session.push(&tone(0, 1600));
            if flushed.is_some() {
                break;
            }
        }
        assert_eq!(flushed.map(|pcm| pcm.len()), Some(9 * 3200));
        assert!(!session.recording);
    }

    #[test]
    fn test_continuous_noise_is_capped() {
        let mut session = SttSession::default();
        session.start();
        let chunk = tone(3000, 1600);
        let mut flushed = None;
        for _ in 0..1000 {
            flushed = session.push(&chunk);
            if flushed.is_some() {
                break;
            }
        }
        assert_eq!(flushed.map(|pcm| pcm.len()), Some(MAX_UTTERANCE_BYTES));
        assert!(!session.recording);
        assert!(session.buffer.is_empty());
    }

    #[test]
    fn test_wire_shapes() {
        assert_eq!(
            serde_json::from_str::<SttCommand>(r#"{"type":"start"}"#).unwrap(),
            SttCommand::Start
        );
        assert_eq!(
            serde_json::from_str::<InspectIncoming>(r#"{"type":"audio_utterance","data":"AAA="}"#)
                .unwrap(),
            InspectIncoming::AudioUtterance {
                data: "AAA=".to_string()
            }
        );

        let msg = WsOutgoing::Transcript {
            text: "hydraulic hose leaking".to_string(),
            status: "idle",
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            serde_json::json!({"type": "transcript", "text": "hydraulic hose leaking", "status": "idle"})
        );

        let msg = WsOutgoing::AgentText {
            text: "Noted".to_string(),
            saved: None,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            serde_json::json!({"type": "agent_text", "text": "Noted"})
        );
    }

    #[test]
    fn test_decode_audio() {
        assert_eq!(decode_audio("UklGRg==").unwrap(), b"RIFF".to_vec());
        assert!(decode_audio("not base64!").is_err());
    }
}

//! `RealtimeSession`: concrete `LlmSession` over a WebSocket to the
//! multimodal model's realtime endpoint (spec §4.7, §6 `LLM_API_KEY`).
//!
//! Wire shape follows the session-oriented realtime protocol the default
//! `config/default.yaml` endpoint targets: a `setup` frame opens the
//! session, `realtimeInput` frames carry 16 kHz PCM16 audio in, and
//! `serverContent` frames carry 24 kHz PCM16 audio and transcripts out. One
//! background task owns the socket; callers talk to it over channels so
//! `send_audio`/`cancel`/`update_system_instruction` never block on network
//! I/O.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;

use crate::error::{LlmError, Result};
use crate::event::LlmEvent;
use crate::session::{LlmSession, VoiceConfig};

enum Cmd {
    Audio(Vec<u8>),
    Text(String),
    SystemInstruction(String),
    Cancel,
    Close,
}

#[derive(Serialize)]
struct SetupFrame<'a> {
    setup: SetupBody<'a>,
}

#[derive(Serialize)]
struct SetupBody<'a> {
    model: &'a str,
    #[serde(rename = "systemInstruction")]
    system_instruction: ContentText<'a>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct ContentText<'a> {
    parts: [PartText<'a>; 1],
}

#[derive(Serialize)]
struct PartText<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig<'a> {
    #[serde(rename = "responseModalities")]
    response_modalities: [&'a str; 1],
    #[serde(rename = "speechConfig")]
    speech_config: SpeechConfigWire<'a>,
}

#[derive(Serialize)]
struct SpeechConfigWire<'a> {
    #[serde(rename = "voiceName")]
    voice_name: &'a str,
    #[serde(rename = "languageCode")]
    language_code: &'a str,
}

#[derive(Deserialize, Debug)]
struct ServerFrame {
    #[serde(rename = "setupComplete")]
    setup_complete: Option<serde_json::Value>,
    #[serde(rename = "serverContent")]
    server_content: Option<ServerContent>,
}

#[derive(Deserialize, Debug)]
struct ServerContent {
    #[serde(rename = "modelTurn")]
    model_turn: Option<ModelTurn>,
    #[serde(rename = "inputTranscription")]
    input_transcription: Option<Transcription>,
    #[serde(rename = "turnComplete")]
    turn_complete: Option<bool>,
    interrupted: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct Transcription {
    text: String,
}

#[derive(Deserialize, Debug)]
struct ModelTurn {
    parts: Vec<Part>,
}

#[derive(Deserialize, Debug)]
struct Part {
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct InlineData {
    data: String,
}

pub struct RealtimeSession {
    cmd_tx: mpsc::UnboundedSender<Cmd>,
    events_rx: Mutex<mpsc::UnboundedReceiver<LlmEvent>>,
    closed: Arc<AtomicBool>,
}

impl RealtimeSession {
    /// Open a session. `connect_timeout` bounds the handshake (spec §5: LLM
    /// connect deadline default 5 s); `dead_session_timeout` is the 15 s
    /// no-audio tolerance from §4.7.
    pub async fn open(
        endpoint: &str,
        api_key: &str,
        model: &str,
        system_instruction: String,
        voice: VoiceConfig,
        connect_timeout: Duration,
        dead_session_timeout: Duration,
    ) -> Result<Self> {
        let mut url = url::Url::parse(endpoint)
            .map_err(|e| LlmError::ConnectFailed(format!("invalid endpoint: {e}")))?;
        url.query_pairs_mut().append_pair("key", api_key);

        let (ws, _) = tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(url.as_str()))
            .await
            .map_err(|_| LlmError::ConnectTimeout)?
            .map_err(|e| LlmError::ConnectFailed(e.to_string()))?;

        let (mut write, mut read) = ws.split();

        let setup = SetupFrame {
            setup: SetupBody {
                model,
                system_instruction: ContentText { parts: [PartText { text: &system_instruction }] },
                generation_config: GenerationConfig {
                    response_modalities: ["AUDIO"],
                    speech_config: SpeechConfigWire {
                        voice_name: &voice.voice_id,
                        language_code: &voice.language_code,
                    },
                },
            },
        };
        let setup_json = serde_json::to_string(&setup)
            .map_err(|e| LlmError::MalformedEvent(e.to_string()))?;
        write
            .send(Message::Text(setup_json))
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Cmd>();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<LlmEvent>();
        let closed = Arc::new(AtomicBool::new(false));
        let closed_task = closed.clone();

        tokio::spawn(async move {
            let mut turn_active = false;
            let mut suppress_current_turn = false;
            let mut pending_system_instruction: Option<String> = None;
            let mut last_audio_at = tokio::time::Instant::now();
            let mut dead_session_check = tokio::time::interval(Duration::from_secs(1));

            loop {
                tokio::select! {
                    cmd = cmd_rx.recv() => {
                        match cmd {
                            Some(Cmd::Audio(pcm)) => {
                                let frame = serde_json::json!({
                                    "realtimeInput": {
                                        "mediaChunks": [{
                                            "mimeType": "audio/pcm;rate=16000",
                                            "data": STANDARD.encode(&pcm),
                                        }]
                                    }
                                });
                                if write.send(Message::Text(frame.to_string())).await.is_err() {
                                    break;
                                }
                            }
                            Some(Cmd::Text(text)) => {
                                let frame = serde_json::json!({
                                    "clientContent": {
                                        "turns": [{"role": "user", "parts": [{"text": text}]}],
                                        "turnComplete": true,
                                    }
                                });
                                if write.send(Message::Text(frame.to_string())).await.is_err() {
                                    break;
                                }
                            }
                            Some(Cmd::SystemInstruction(instruction)) => {
                                if turn_active {
                                    pending_system_instruction = Some(instruction);
                                } else {
                                    let frame = serde_json::json!({
                                        "systemInstructionUpdate": {
                                            "systemInstruction": {"parts": [{"text": instruction}]}
                                        }
                                    });
                                    let _ = write.send(Message::Text(frame.to_string())).await;
                                }
                            }
                            Some(Cmd::Cancel) => {
                                suppress_current_turn = true;
                                let frame = serde_json::json!({"clientContent": {"turnComplete": true, "turns": []}});
                                let _ = write.send(Message::Text(frame.to_string())).await;
                            }
                            Some(Cmd::Close) | None => break,
                        }
                    }
                    msg = read.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let parsed: std::result::Result<ServerFrame, _> = serde_json::from_str(&text);
                                let Ok(frame) = parsed else {
                                    let _ = events_tx.send(LlmEvent::Error(format!("malformed server frame: {text}")));
                                    continue;
                                };

                                if frame.setup_complete.is_some() {
                                    continue;
                                }

                                let Some(content) = frame.server_content else { continue };

                                if content.interrupted == Some(true) {
                                    suppress_current_turn = true;
                                }

                                if let Some(transcription) = content.input_transcription {
                                    let _ = events_tx.send(LlmEvent::TranscriptPartial(transcription.text));
                                }

                                if let Some(model_turn) = content.model_turn {
                                    if !turn_active {
                                        turn_active = true;
                                        suppress_current_turn = false;
                                        let _ = events_tx.send(LlmEvent::ResponseStart);
                                    }
                                    if !suppress_current_turn {
                                        for part in model_turn.parts {
                                            if let Some(inline) = part.inline_data {
                                                if let Ok(bytes) = STANDARD.decode(inline.data) {
                                                    last_audio_at = tokio::time::Instant::now();
                                                    let _ = events_tx.send(LlmEvent::AudioChunk(Arc::from(bytes.into_boxed_slice())));
                                                }
                                            }
                                            if let Some(text) = part.text {
                                                let _ = events_tx.send(LlmEvent::ResponseTextPartial(text));
                                            }
                                        }
                                    }
                                }

                                if content.turn_complete == Some(true) {
                                    turn_active = false;
                                    suppress_current_turn = false;
                                    let _ = events_tx.send(LlmEvent::ResponseComplete);
                                    if let Some(instruction) = pending_system_instruction.take() {
                                        let frame = serde_json::json!({
                                            "systemInstructionUpdate": {
                                                "systemInstruction": {"parts": [{"text": instruction}]}
                                            }
                                        });
                                        let _ = write.send(Message::Text(frame.to_string())).await;
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                let _ = events_tx.send(LlmEvent::Error("session closed by model".into()));
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                let _ = events_tx.send(LlmEvent::Error(e.to_string()));
                                break;
                            }
                        }
                    }
                    _ = dead_session_check.tick() => {
                        if last_audio_at.elapsed() >= dead_session_timeout {
                            let _ = events_tx.send(LlmEvent::Error(format!(
                                "dead session: no audio for {}s",
                                dead_session_timeout.as_secs()
                            )));
                            last_audio_at = tokio::time::Instant::now();
                        }
                    }
                }
            }

            closed_task.store(true, Ordering::SeqCst);
        });

        Ok(Self { cmd_tx, events_rx: Mutex::new(events_rx), closed })
    }
}

#[async_trait]
impl LlmSession for RealtimeSession {
    async fn send_audio(&self, pcm16_16k: &[u8]) -> Result<()> {
        self.cmd_tx
            .send(Cmd::Audio(pcm16_16k.to_vec()))
            .map_err(|_| LlmError::AlreadyClosed)
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.cmd_tx
            .send(Cmd::Text(text.to_string()))
            .map_err(|_| LlmError::AlreadyClosed)
    }

    async fn update_system_instruction(&self, instruction: &str) -> Result<()> {
        self.cmd_tx
            .send(Cmd::SystemInstruction(instruction.to_string()))
            .map_err(|_| LlmError::AlreadyClosed)
    }

    async fn cancel(&self) -> Result<()> {
        self.cmd_tx.send(Cmd::Cancel).map_err(|_| LlmError::AlreadyClosed)
    }

    async fn next_event(&self) -> Option<LlmEvent> {
        self.events_rx.lock().await.recv().await
    }

    async fn close(&self) {
        let _ = self.cmd_tx.send(Cmd::Close);
    }
}

impl RealtimeSession {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_frame_serializes_expected_shape() {
        let setup = SetupFrame {
            setup: SetupBody {
                model: "gemini-2.0-flash-live",
                system_instruction: ContentText { parts: [PartText { text: "be helpful" }] },
                generation_config: GenerationConfig {
                    response_modalities: ["AUDIO"],
                    speech_config: SpeechConfigWire { voice_name: "aoede", language_code: "en" },
                },
            },
        };
        let json = serde_json::to_value(&setup).unwrap();
        assert_eq!(json["setup"]["model"], "gemini-2.0-flash-live");
        assert_eq!(json["setup"]["systemInstruction"]["parts"][0]["text"], "be helpful");
        assert_eq!(json["setup"]["generationConfig"]["speechConfig"]["voiceName"], "aoede");
    }

    #[test]
    fn server_frame_parses_audio_chunk() {
        let wire = serde_json::json!({
            "serverContent": {
                "modelTurn": {"parts": [{"inlineData": {"mimeType": "audio/pcm", "data": "AAAA"}}]},
                "turnComplete": false,
            }
        });
        let frame: ServerFrame = serde_json::from_value(wire).unwrap();
        let content = frame.server_content.unwrap();
        assert_eq!(content.turn_complete, Some(false));
        assert_eq!(content.model_turn.unwrap().parts.len(), 1);
    }
}

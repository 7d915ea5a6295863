//! Client-facing bridge protocol.
//!
//! Messages between the browser and the bridge are JSON objects tagged with a
//! `type` field, except for the untagged `{status, ...}` and `{error, ...}`
//! lifecycle notices which predate the typed protocol and are kept for client
//! compatibility.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Client -> Bridge
// ============================================================================

/// A parsed message from the client WebSocket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// One-time session configuration; opens the upstream connection.
    #[serde(rename = "gemini_config")]
    Config(SessionConfig),

    /// A complete user text turn.
    #[serde(rename = "user_text_input")]
    TextInput {
        #[serde(default)]
        text: String,
    },

    /// One base64 PCM microphone chunk (16kHz mono).
    #[serde(rename = "user_audio_input")]
    AudioInput {
        #[serde(default)]
        data: Option<String>,
    },
}

/// Session configuration carried by the first `gemini_config` message.
///
/// All fields are optional on the wire; server-side defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub gemini_voice: Option<String>,
    pub temperature: Option<f32>,
    pub debug: Option<bool>,
    pub safety_settings: Option<Value>,
}

/// Why a client frame could not be turned into a [`ClientMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientParseError {
    /// Frame was not a JSON object at all.
    InvalidJson,
    /// JSON object whose `type` is missing or not one the bridge handles.
    UnknownType(String),
    /// Recognized `type` but the payload did not match its schema.
    MalformedPayload(String),
}

/// Parse one text frame from the client.
///
/// The frame is parsed to a generic value first so an unrecognized `type` tag
/// can be reported verbatim rather than collapsing into a generic serde error.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, ClientParseError> {
    let value: Value = serde_json::from_str(text).map_err(|_| ClientParseError::InvalidJson)?;
    if !value.is_object() {
        return Err(ClientParseError::InvalidJson);
    }

    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("undefined")
        .to_string();

    match serde_json::from_value(value) {
        Ok(message) => Ok(message),
        Err(_) if matches!(
            tag.as_str(),
            "gemini_config" | "user_text_input" | "user_audio_input"
        ) =>
        {
            Err(ClientParseError::MalformedPayload(tag))
        }
        Err(_) => Err(ClientParseError::UnknownType(tag)),
    }
}

// ============================================================================
// Bridge -> Client
// ============================================================================

/// A typed server-sent event forwarded to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Token usage metadata, informational.
    #[serde(rename = "gemini_usage")]
    Usage { usage: Value },

    /// Finish/stop diagnostics from the model.
    #[serde(rename = "gemini_finish")]
    Finish {
        #[serde(rename = "finishReason", skip_serializing_if = "Option::is_none")]
        finish_reason: Option<Value>,
        #[serde(rename = "stopReason", skip_serializing_if = "Option::is_none")]
        stop_reason: Option<Value>,
    },

    /// Safety ratings attached to the current content.
    #[serde(rename = "gemini_safety")]
    Safety {
        #[serde(rename = "safetyRatings")]
        safety_ratings: Value,
    },

    /// Transcription of the model's audio output.
    #[serde(rename = "gemini_transcription")]
    Transcription { text: String },

    /// A text chunk of the model turn (debug modality).
    #[serde(rename = "gemini_text_chunk")]
    TextChunk { text: String },

    /// One base64 PCM chunk of model speech.
    #[serde(rename = "gemini_audio_chunk")]
    AudioChunk { data: String },

    /// Model output interrupted by user activity.
    #[serde(rename = "gemini_interrupted")]
    Interrupted,

    /// Generation for the current turn finished.
    #[serde(rename = "gemini_generation_complete")]
    GenerationComplete,

    /// The model's turn is complete; mic uplink reopens.
    #[serde(rename = "gemini_turn_complete")]
    TurnComplete,

    /// A mic chunk was discarded instead of being forwarded.
    #[serde(rename = "gemini_uplink_dropped")]
    UplinkDropped { reason: &'static str },

    /// Unrecognized upstream frame forwarded verbatim for inspection.
    #[serde(rename = "google_raw_message")]
    RawMessage { data: Value },
}

impl ServerEvent {
    pub fn uplink_dropped_model_speaking() -> Self {
        ServerEvent::UplinkDropped {
            reason: "model_speaking",
        }
    }
}

/// Routing envelope for frames queued to the client sender task.
#[derive(Debug)]
pub enum ClientRoute {
    /// A typed `{type: ...}` event.
    Event(ServerEvent),
    /// An untagged `{status, ...}` lifecycle notice.
    Status(StatusFrame),
    /// An untagged `{error, ...}` notice.
    Error(ErrorFrame),
    /// Close the client socket after flushing queued frames.
    Close,
}

/// Untagged lifecycle notice: `{status, ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusFrame {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StatusFrame {
    pub fn session_initialized() -> Self {
        Self {
            status: "Gemini session initialized (via direct WebSocket)".to_string(),
            code: None,
            reason: None,
        }
    }

    pub fn upstream_closed(code: Option<u16>, reason: String) -> Self {
        Self {
            status: "Gemini session with Google closed.".to_string(),
            code,
            reason: Some(reason),
        }
    }
}

/// Untagged error notice: `{error, ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorFrame {
    pub error: String,
}

impl ErrorFrame {
    pub fn invalid_json() -> Self {
        Self {
            error: "Invalid message format. Expecting JSON.".to_string(),
        }
    }

    /// Input arrived while the upstream session is still being established.
    pub fn session_not_initialized() -> Self {
        Self {
            error: "Google session not fully initialized yet. Please wait a moment and retry."
                .to_string(),
        }
    }

    /// Non-input message arrived before any configuration was processed.
    pub fn config_not_processed() -> Self {
        Self {
            error: "Gemini session with Google not ready. Initial config not yet processed by server."
                .to_string(),
        }
    }

    pub fn unknown_type(message_type: &str) -> Self {
        Self {
            error: format!("Unknown message type: {message_type} or Google WS not open."),
        }
    }

    pub fn upstream_error(message: &str) -> Self {
        Self {
            error: format!("Google WebSocket error: {message}"),
        }
    }

    /// Setup frame sent but no acknowledgement arrived in time.
    pub fn setup_timeout() -> Self {
        Self {
            error: "Google session setup timed out.".to_string(),
        }
    }

    pub fn idle_timeout() -> Self {
        Self {
            error: "Connection closed due to inactivity.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_config_message() {
        let message = parse_client_message(
            r#"{"type":"gemini_config","model":"m1","systemPrompt":"hello","geminiVoice":"Puck","temperature":0.7,"debug":true}"#,
        )
        .unwrap();

        match message {
            ClientMessage::Config(config) => {
                assert_eq!(config.model.as_deref(), Some("m1"));
                assert_eq!(config.system_prompt.as_deref(), Some("hello"));
                assert_eq!(config.gemini_voice.as_deref(), Some("Puck"));
                assert_eq!(config.temperature, Some(0.7));
                assert_eq!(config.debug, Some(true));
                assert!(config.safety_settings.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_all_fields_optional() {
        let message = parse_client_message(r#"{"type":"gemini_config"}"#).unwrap();
        assert!(matches!(message, ClientMessage::Config(_)));
    }

    #[test]
    fn test_parse_text_input() {
        let message = parse_client_message(r#"{"type":"user_text_input","text":"hi"}"#).unwrap();
        match message {
            ClientMessage::TextInput { text } => assert_eq!(text, "hi"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_audio_input_without_data() {
        let message = parse_client_message(r#"{"type":"user_audio_input"}"#).unwrap();
        match message {
            ClientMessage::AudioInput { data } => assert!(data.is_none()),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_invalid_json() {
        assert_eq!(
            parse_client_message("not json"),
            Err(ClientParseError::InvalidJson)
        );
        assert_eq!(
            parse_client_message("[1,2,3]"),
            Err(ClientParseError::InvalidJson)
        );
    }

    #[test]
    fn test_parse_unknown_type() {
        assert_eq!(
            parse_client_message(r#"{"type":"frobnicate"}"#),
            Err(ClientParseError::UnknownType("frobnicate".to_string()))
        );
        assert_eq!(
            parse_client_message(r#"{"data":"AAAA"}"#),
            Err(ClientParseError::UnknownType("undefined".to_string()))
        );
    }

    #[test]
    fn test_server_event_wire_shapes() {
        let event = ServerEvent::AudioChunk {
            data: "AAAA".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "gemini_audio_chunk", "data": "AAAA"})
        );

        let event = ServerEvent::uplink_dropped_model_speaking();
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "gemini_uplink_dropped", "reason": "model_speaking"})
        );

        let event = ServerEvent::TurnComplete;
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "gemini_turn_complete"})
        );
    }

    #[test]
    fn test_finish_event_skips_absent_fields() {
        let event = ServerEvent::Finish {
            finish_reason: Some(json!("STOP")),
            stop_reason: None,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "gemini_finish", "finishReason": "STOP"})
        );
    }

    #[test]
    fn test_status_frames() {
        assert_eq!(
            serde_json::to_value(StatusFrame::session_initialized()).unwrap(),
            json!({"status": "Gemini session initialized (via direct WebSocket)"})
        );
        assert_eq!(
            serde_json::to_value(StatusFrame::upstream_closed(Some(1006), String::new())).unwrap(),
            json!({"status": "Gemini session with Google closed.", "code": 1006, "reason": ""})
        );
    }

    #[test]
    fn test_error_frames() {
        assert_eq!(
            serde_json::to_value(ErrorFrame::invalid_json()).unwrap(),
            json!({"error": "Invalid message format. Expecting JSON."})
        );
        assert_eq!(
            serde_json::to_value(ErrorFrame::unknown_type("frobnicate")).unwrap(),
            json!({"error": "Unknown message type: frobnicate or Google WS not open."})
        );
    }
}

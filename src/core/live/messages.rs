//! Gemini Live API WebSocket message types.
//!
//! This module defines the JSON frames exchanged with the Bidi streaming
//! service and the translation of downlink content into discrete events.
//!
//! # Protocol Overview
//!
//! Client frames (sent to the service):
//! - `{setup: ...}` - one-time session setup (model, system instruction, generation config)
//! - `{clientContent: ...}` - a complete user text turn
//! - `{realtimeInput: ...}` - a streaming microphone audio chunk
//!
//! Server frames (received from the service) are not tagged by type; the
//! service populates whichever top-level fields apply:
//! - `usageMetadata` - token accounting
//! - `setupComplete` - setup acknowledgment
//! - `serverContent` - the main payload carrier (audio, text, transcription,
//!   safety, finish and turn lifecycle signals - several may appear at once)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::{LIVE_INPUT_MIME_TYPE, LIVE_MAX_OUTPUT_TOKENS, LIVE_OUTPUT_AUDIO_PREFIX, LiveConfig};

// =============================================================================
// Uplink Frames (Bridge -> Live service)
// =============================================================================

/// A JSON frame sent to the Live service.
///
/// External tagging yields the single-key objects the Bidi protocol expects,
/// e.g. `{"setup": {...}}`.
#[derive(Debug, Clone, Serialize)]
pub enum ClientFrame {
    /// Session setup handshake; must be the first frame on any connection.
    #[serde(rename = "setup")]
    Setup(Setup),

    /// A complete user turn carrying text.
    #[serde(rename = "clientContent")]
    ClientContent(ClientContent),

    /// A streaming microphone audio chunk.
    #[serde(rename = "realtimeInput")]
    RealtimeInput(RealtimeInput),
}

/// BidiGenerateContentSetup payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    /// Model identifier
    pub model: String,
    /// System instruction for the persona
    pub system_instruction: Content,
    /// Generation parameters
    pub generation_config: GenerationConfig,
    /// Request transcriptions of audio output; always sent, even when empty
    pub output_audio_transcription: OutputTranscriptionRequest,
    /// Safety settings passthrough
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_settings: Option<Value>,
}

/// Empty object requesting output-audio transcription.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutputTranscriptionRequest {}

/// Generation parameters for the setup payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Response modalities (AUDIO, plus TEXT in debug mode)
    pub response_modalities: Vec<String>,
    /// Fixed response length cap
    pub max_output_tokens: u32,
    /// Temperature, already clamped to [0.0, 2.0]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Voice selection; only present when audio modality is requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

/// Voice selection wrapper.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

/// Prebuilt voice selection.
///
/// The service accepts the snake_case `voice_name` key here, unlike the rest
/// of the protocol.
#[derive(Debug, Clone, Serialize)]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

/// Content block: an ordered list of parts.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

/// A text-only part.
#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    pub text: String,
}

/// BidiGenerateContentClientContent payload: a complete user turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Turn>,
    pub turn_complete: bool,
}

/// One conversational turn.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: String,
    pub parts: Vec<TextPart>,
}

/// BidiGenerateContentRealtimeInput payload: streaming audio.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeInput {
    pub audio: AudioBlob,
}

/// Base64 PCM audio tagged with its mime type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBlob {
    pub mime_type: String,
    pub data: String,
}

impl ClientFrame {
    /// Build the setup frame for a session configuration.
    pub fn setup(config: &LiveConfig) -> Self {
        let modalities: Vec<String> = config
            .response_modalities()
            .into_iter()
            .map(str::to_string)
            .collect();

        // Voice selection only applies when audio output is requested.
        let speech_config = if modalities.iter().any(|m| m == "AUDIO") {
            config.voice.as_ref().map(|voice| SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice.clone(),
                    },
                },
            })
        } else {
            None
        };

        ClientFrame::Setup(Setup {
            model: config.model().to_string(),
            system_instruction: Content {
                parts: vec![TextPart {
                    text: config.system_prompt.clone(),
                }],
            },
            generation_config: GenerationConfig {
                response_modalities: modalities,
                max_output_tokens: LIVE_MAX_OUTPUT_TOKENS,
                temperature: config.clamped_temperature(),
                speech_config,
            },
            output_audio_transcription: OutputTranscriptionRequest::default(),
            safety_settings: config.safety_settings.clone(),
        })
    }

    /// Build a complete-turn text frame.
    pub fn user_text(text: &str) -> Self {
        ClientFrame::ClientContent(ClientContent {
            turns: vec![Turn {
                role: "user".to_string(),
                parts: vec![TextPart {
                    text: text.to_string(),
                }],
            }],
            turn_complete: true,
        })
    }

    /// Build a streaming audio frame from a base64 PCM chunk (16kHz mono).
    pub fn user_audio(base64_data: &str) -> Self {
        ClientFrame::RealtimeInput(RealtimeInput {
            audio: AudioBlob {
                mime_type: LIVE_INPUT_MIME_TYPE.to_string(),
                data: base64_data.to_string(),
            },
        })
    }
}

// =============================================================================
// Downlink Frames (Live service -> Bridge)
// =============================================================================

/// The `serverContent` payload of a downlink frame.
///
/// Every field is optional and several may be populated in a single frame;
/// translation therefore runs independent checks over all of them rather
/// than dispatching on a single discriminant.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    pub finish_reason: Option<Value>,
    pub stop_reason: Option<Value>,
    pub safety_ratings: Option<Value>,
    pub output_transcription: Option<OutputTranscription>,
    pub model_turn: Option<ModelTurn>,
    pub interrupted: Option<Value>,
    pub generation_complete: Option<Value>,
    pub turn_complete: Option<Value>,
}

/// Transcription of the model's audio output.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputTranscription {
    pub text: Option<String>,
}

/// The model's streaming response parts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelTurn {
    pub parts: Vec<ModelPart>,
}

/// One part of a model turn: text and/or inline audio.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelPart {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

/// Inline binary payload (base64) tagged with its mime type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InlineData {
    pub mime_type: Option<String>,
    pub data: Option<String>,
}

impl ModelPart {
    /// Whether this part carries playable PCM audio.
    pub fn is_pcm_audio(&self) -> bool {
        self.inline_data
            .as_ref()
            .and_then(|d| d.mime_type.as_deref())
            .is_some_and(|m| m.starts_with(LIVE_OUTPUT_AUDIO_PREFIX))
    }
}

/// JavaScript-style truthiness for loosely typed signal fields.
///
/// The service sends `interrupted` / `generationComplete` / `turnComplete`
/// as booleans today, but the frames are version-evolving; treat any
/// non-empty, non-zero, non-false value as set.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A discrete event extracted from a `serverContent` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveContentEvent {
    /// Finish/stop diagnostics
    Finish {
        finish_reason: Option<Value>,
        stop_reason: Option<Value>,
    },
    /// Safety ratings for the current content
    Safety(Value),
    /// Transcription of the model's audio output
    Transcription(String),
    /// A text chunk from the model turn
    TextChunk(String),
    /// A base64 PCM audio chunk from the model turn
    AudioChunk(String),
    /// The model's output was interrupted (e.g. by voice activity)
    Interrupted,
    /// Generation for the current turn finished
    GenerationComplete,
    /// The current turn is complete
    TurnComplete,
}

/// Translate a `serverContent` payload into its ordered event sequence.
///
/// The checks are independent and non-exclusive: a single frame may yield
/// several events. Only the first text part and the first PCM audio part of
/// a model turn are surfaced.
pub fn content_events(content: &ServerContent) -> Vec<LiveContentEvent> {
    let mut events = Vec::new();

    if content.finish_reason.is_some() || content.stop_reason.is_some() {
        events.push(LiveContentEvent::Finish {
            finish_reason: content.finish_reason.clone(),
            stop_reason: content.stop_reason.clone(),
        });
    }

    if let Some(ratings) = &content.safety_ratings {
        events.push(LiveContentEvent::Safety(ratings.clone()));
    }

    if let Some(transcription) = &content.output_transcription
        && let Some(text) = &transcription.text
    {
        events.push(LiveContentEvent::Transcription(text.clone()));
    }

    if let Some(turn) = &content.model_turn {
        if let Some(text) = turn.parts.iter().find_map(|p| p.text.clone()) {
            events.push(LiveContentEvent::TextChunk(text));
        }

        if let Some(data) = turn
            .parts
            .iter()
            .find(|p| p.is_pcm_audio())
            .and_then(|p| p.inline_data.as_ref())
            .and_then(|d| d.data.clone())
        {
            events.push(LiveContentEvent::AudioChunk(data));
        }
    }

    if content.interrupted.as_ref().is_some_and(is_truthy) {
        events.push(LiveContentEvent::Interrupted);
    }

    if content.generation_complete.as_ref().is_some_and(is_truthy) {
        events.push(LiveContentEvent::GenerationComplete);
    }

    if content.turn_complete.as_ref().is_some_and(is_truthy) {
        events.push(LiveContentEvent::TurnComplete);
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config() -> LiveConfig {
        LiveConfig {
            api_key: "test_key".to_string(),
            model: "m1".to_string(),
            system_prompt: "hello".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_setup_frame_shape() {
        let frame = ClientFrame::setup(&test_config());
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["setup"]["model"], "m1");
        assert_eq!(json["setup"]["systemInstruction"]["parts"][0]["text"], "hello");
        assert_eq!(
            json["setup"]["generationConfig"]["responseModalities"],
            json!(["AUDIO"])
        );
        assert_eq!(json["setup"]["generationConfig"]["maxOutputTokens"], 4096);
        assert_eq!(json["setup"]["outputAudioTranscription"], json!({}));
        // Optional fields absent entirely, not null
        assert!(json["setup"].get("safetySettings").is_none());
        assert!(json["setup"]["generationConfig"].get("temperature").is_none());
        assert!(json["setup"]["generationConfig"].get("speechConfig").is_none());
    }

    #[test]
    fn test_setup_frame_voice_and_temperature() {
        let config = LiveConfig {
            voice: Some("Aoede".to_string()),
            temperature: Some(3.5),
            ..test_config()
        };
        let json = serde_json::to_value(ClientFrame::setup(&config)).unwrap();

        // Temperature clamped into range
        assert_eq!(json["setup"]["generationConfig"]["temperature"], 2.0);
        // The voice_name key is snake_case on the wire
        assert_eq!(
            json["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voice_name"],
            "Aoede"
        );
    }

    #[test]
    fn test_setup_frame_debug_modalities() {
        let config = LiveConfig {
            debug_text: true,
            ..test_config()
        };
        let json = serde_json::to_value(ClientFrame::setup(&config)).unwrap();
        assert_eq!(
            json["setup"]["generationConfig"]["responseModalities"],
            json!(["AUDIO", "TEXT"])
        );
    }

    #[test]
    fn test_setup_frame_safety_passthrough() {
        let settings = json!([{"category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE"}]);
        let config = LiveConfig {
            safety_settings: Some(settings.clone()),
            ..test_config()
        };
        let json = serde_json::to_value(ClientFrame::setup(&config)).unwrap();
        assert_eq!(json["setup"]["safetySettings"], settings);
    }

    #[test]
    fn test_user_text_frame() {
        let json = serde_json::to_value(ClientFrame::user_text("hi there")).unwrap();
        assert_eq!(json["clientContent"]["turns"][0]["role"], "user");
        assert_eq!(json["clientContent"]["turns"][0]["parts"][0]["text"], "hi there");
        assert_eq!(json["clientContent"]["turnComplete"], true);
    }

    #[test]
    fn test_user_audio_frame() {
        let json = serde_json::to_value(ClientFrame::user_audio("AAAA")).unwrap();
        assert_eq!(json["realtimeInput"]["audio"]["mimeType"], "audio/pcm;rate=16000");
        assert_eq!(json["realtimeInput"]["audio"]["data"], "AAAA");
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("yes")));
        assert!(is_truthy(&json!({})));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
    }

    #[test]
    fn test_content_events_audio_chunk() {
        let content: ServerContent = serde_json::from_value(json!({
            "modelTurn": {
                "parts": [{"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AAAA"}}]
            }
        }))
        .unwrap();

        assert_eq!(
            content_events(&content),
            vec![LiveContentEvent::AudioChunk("AAAA".to_string())]
        );
    }

    #[test]
    fn test_content_events_first_parts_only() {
        let content: ServerContent = serde_json::from_value(json!({
            "modelTurn": {
                "parts": [
                    {"text": "first"},
                    {"text": "second"},
                    {"inlineData": {"mimeType": "image/png", "data": "ZZZZ"}},
                    {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AAAA"}},
                    {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "BBBB"}}
                ]
            }
        }))
        .unwrap();

        assert_eq!(
            content_events(&content),
            vec![
                LiveContentEvent::TextChunk("first".to_string()),
                LiveContentEvent::AudioChunk("AAAA".to_string()),
            ]
        );
    }

    #[test]
    fn test_content_events_multiple_fire_in_order() {
        let content: ServerContent = serde_json::from_value(json!({
            "outputTranscription": {"text": "done now"},
            "turnComplete": true,
            "generationComplete": true
        }))
        .unwrap();

        assert_eq!(
            content_events(&content),
            vec![
                LiveContentEvent::Transcription("done now".to_string()),
                LiveContentEvent::GenerationComplete,
                LiveContentEvent::TurnComplete,
            ]
        );
    }

    #[test]
    fn test_content_events_finish_and_safety() {
        let content: ServerContent = serde_json::from_value(json!({
            "finishReason": "STOP",
            "safetyRatings": [{"category": "X", "probability": "LOW"}]
        }))
        .unwrap();

        let events = content_events(&content);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], LiveContentEvent::Finish { finish_reason, .. }
            if finish_reason == &Some(json!("STOP"))));
        assert!(matches!(&events[1], LiveContentEvent::Safety(_)));
    }

    #[test]
    fn test_content_events_falsy_signals_ignored() {
        let content: ServerContent = serde_json::from_value(json!({
            "interrupted": false,
            "turnComplete": 0
        }))
        .unwrap();

        assert!(content_events(&content).is_empty());
    }

    #[test]
    fn test_content_events_interrupted() {
        let content: ServerContent =
            serde_json::from_value(json!({ "interrupted": true })).unwrap();
        assert_eq!(content_events(&content), vec![LiveContentEvent::Interrupted]);
    }

    #[test]
    fn test_server_content_unknown_fields_tolerated() {
        let content: Result<ServerContent, _> = serde_json::from_value(json!({
            "someFutureField": {"x": 1},
            "turnComplete": true
        }));
        assert!(content.is_ok());
    }
}

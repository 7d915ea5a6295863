//! Gemini Live API configuration types.
//!
//! This module contains configuration types for Google's Live (Bidi streaming)
//! API: endpoint constants, model defaults, and the per-session configuration
//! captured from the client's `gemini_config` message.

use serde::{Deserialize, Serialize};

/// Gemini Live API WebSocket endpoint.
pub const LIVE_API_URL: &str =
    "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Default model when the client does not specify one.
pub const DEFAULT_LIVE_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-09-2025";

/// Sample rate for microphone uplink audio.
pub const LIVE_INPUT_SAMPLE_RATE: u32 = 16000;

/// Mime type tag sent with every uplink audio chunk.
pub const LIVE_INPUT_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Mime type prefix identifying downlink audio parts.
pub const LIVE_OUTPUT_AUDIO_PREFIX: &str = "audio/pcm";

/// Fixed cap on response length sent in the setup payload.
pub const LIVE_MAX_OUTPUT_TOKENS: u32 = 4096;

/// Per-session configuration for one upstream Live connection.
///
/// Built once from the first `gemini_config` message and never mutated; the
/// upstream socket embeds these values at setup time and must not be reused
/// across sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveConfig {
    /// API key for authentication
    pub api_key: String,

    /// WebSocket endpoint (overridable for tests)
    #[serde(default)]
    pub endpoint: String,

    /// Model identifier (e.g. "models/gemini-2.5-flash-native-audio-preview-09-2025")
    #[serde(default)]
    pub model: String,

    /// System instruction text for the persona
    #[serde(default)]
    pub system_prompt: String,

    /// Prebuilt voice name for audio output
    #[serde(default)]
    pub voice: Option<String>,

    /// Temperature for response generation, clamped to [0.0, 2.0] at setup time
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Request TEXT modality alongside AUDIO (debug mode)
    #[serde(default)]
    pub debug_text: bool,

    /// Safety settings passed through to the setup payload verbatim
    #[serde(default)]
    pub safety_settings: Option<serde_json::Value>,
}

impl LiveConfig {
    /// Endpoint to connect to, falling back to the production URL.
    pub fn endpoint(&self) -> &str {
        if self.endpoint.is_empty() {
            LIVE_API_URL
        } else {
            &self.endpoint
        }
    }

    /// Model identifier, falling back to the default native-audio model.
    pub fn model(&self) -> &str {
        if self.model.is_empty() {
            DEFAULT_LIVE_MODEL
        } else {
            &self.model
        }
    }

    /// Response modalities for the setup payload.
    ///
    /// Native audio models are always driven in AUDIO modality; debug mode
    /// additionally requests TEXT so transcript-less models can be inspected.
    pub fn response_modalities(&self) -> Vec<&'static str> {
        if self.debug_text {
            vec!["AUDIO", "TEXT"]
        } else {
            vec!["AUDIO"]
        }
    }

    /// Temperature clamped to the API's accepted range.
    pub fn clamped_temperature(&self) -> Option<f32> {
        self.temperature.map(|t| t.clamp(0.0, 2.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_default() {
        let config = LiveConfig::default();
        assert_eq!(config.endpoint(), LIVE_API_URL);

        let config = LiveConfig {
            endpoint: "ws://127.0.0.1:9999/bidi".to_string(),
            ..Default::default()
        };
        assert_eq!(config.endpoint(), "ws://127.0.0.1:9999/bidi");
    }

    #[test]
    fn test_model_default() {
        let config = LiveConfig::default();
        assert_eq!(config.model(), DEFAULT_LIVE_MODEL);

        let config = LiveConfig {
            model: "m1".to_string(),
            ..Default::default()
        };
        assert_eq!(config.model(), "m1");
    }

    #[test]
    fn test_response_modalities() {
        let config = LiveConfig::default();
        assert_eq!(config.response_modalities(), vec!["AUDIO"]);

        let config = LiveConfig {
            debug_text: true,
            ..Default::default()
        };
        assert_eq!(config.response_modalities(), vec!["AUDIO", "TEXT"]);
    }

    #[test]
    fn test_temperature_clamping() {
        let mut config = LiveConfig {
            temperature: Some(0.7),
            ..Default::default()
        };
        assert_eq!(config.clamped_temperature(), Some(0.7));

        config.temperature = Some(5.0);
        assert_eq!(config.clamped_temperature(), Some(2.0));

        config.temperature = Some(-1.0);
        assert_eq!(config.clamped_temperature(), Some(0.0));

        config.temperature = None;
        assert_eq!(config.clamped_temperature(), None);
    }

    #[test]
    fn test_uplink_mime_type_matches_sample_rate() {
        assert_eq!(
            LIVE_INPUT_MIME_TYPE,
            format!("audio/pcm;rate={LIVE_INPUT_SAMPLE_RATE}")
        );
    }
}

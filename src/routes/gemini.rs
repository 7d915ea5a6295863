//! Gemini bridge WebSocket route configuration
//!
//! This module configures the WebSocket endpoint for the Gemini Live session
//! bridge.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::gemini::gemini_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the Gemini bridge WebSocket router
///
/// # Endpoint
///
/// `GET /ws/gemini` - WebSocket upgrade for the Gemini Live session bridge
///
/// # Protocol
///
/// After the WebSocket upgrade, clients send:
/// 1. A `gemini_config` message (model, system prompt, voice, temperature)
/// 2. `user_text_input` / `user_audio_input` messages once the session is
///    initialized
///
/// The server responds with:
/// - `{status: ...}` once the upstream session is initialized
/// - `gemini_audio_chunk` / `gemini_transcription` for model output
/// - `{error: ...}` on failures
///
/// # Example
///
/// ```json
/// // Client sends config
/// {"type": "gemini_config", "model": "models/gemini-2.5-flash-native-audio-preview-09-2025", "systemPrompt": "...", "geminiVoice": "Puck"}
///
/// // Server responds once Google acknowledges the setup
/// {"status": "Gemini session initialized (via direct WebSocket)"}
///
/// // Client streams mic chunks, server streams model speech back
/// {"type": "user_audio_input", "data": "<base64 pcm>"}
/// {"type": "gemini_audio_chunk", "data": "<base64 pcm>"}
/// ```
pub fn create_gemini_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/gemini", get(gemini_handler))
        .layer(TraceLayer::new_for_http())
}

//! Gemini Live session bridge WebSocket handlers
//!
//! This module bridges a browser WebSocket to Google's Gemini Live (Bidi
//! streaming) API, holding the API key server-side and translating between
//! the two protocols.
//!
//! # Protocol
//!
//! ## Client → Server (JSON text frames)
//!
//! - **gemini_config**: One-time session configuration; opens the upstream
//!   connection (model, systemPrompt, geminiVoice, temperature, debug,
//!   safetySettings)
//! - **user_text_input**: Complete user text turn
//! - **user_audio_input**: One base64 PCM mic chunk (16kHz mono)
//!
//! ## Server → Client
//!
//! - **gemini_audio_chunk**: Base64 PCM model speech
//! - **gemini_transcription**: Transcription of model speech
//! - **gemini_text_chunk**: Model text (debug modality)
//! - **gemini_interrupted** / **gemini_generation_complete** /
//!   **gemini_turn_complete**: Turn lifecycle signals
//! - **gemini_finish** / **gemini_safety** / **gemini_usage**: Diagnostics
//! - **gemini_uplink_dropped**: A mic chunk was discarded while the model
//!   was speaking
//! - **google_raw_message**: Unrecognized upstream frame, forwarded verbatim
//! - Untagged `{status, ...}` and `{error, ...}` lifecycle/error notices

mod handler;
pub mod messages;
pub mod session;

pub use handler::gemini_handler;

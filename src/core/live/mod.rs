//! Gemini Live API connection module.
//!
//! This module implements the upstream half of the session bridge: one
//! WebSocket connection per session to Google's Bidi streaming service,
//! created after the client's configuration arrives and destroyed when the
//! session ends.
//!
//! # Architecture
//!
//! - `config` - endpoint constants and the immutable per-session `LiveConfig`
//! - `messages` - uplink frame builders and downlink content translation
//! - `client` - the `LiveClient` connection task and downlink event stream
//!
//! # Audio Format
//!
//! Uplink: PCM 16-bit signed little-endian at 16kHz, mono, base64 encoded.
//! Downlink: PCM chunks at the model's native rate (typically 24kHz), base64
//! encoded and forwarded without transcoding.

mod client;
mod config;
mod messages;

pub use client::{LiveClient, LiveError, LiveEvent, LiveResult};
pub use config::{
    DEFAULT_LIVE_MODEL, LIVE_API_URL, LIVE_INPUT_MIME_TYPE, LIVE_INPUT_SAMPLE_RATE,
    LIVE_MAX_OUTPUT_TOKENS, LIVE_OUTPUT_AUDIO_PREFIX, LiveConfig,
};
pub use messages::{
    ClientFrame, LiveContentEvent, ModelPart, ModelTurn, OutputTranscription, ServerContent,
    content_events, is_truthy,
};

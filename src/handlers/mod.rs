//! HTTP and WebSocket request handlers
//!
//! This module organizes all handlers into logical groups:
//! - `api` - Health check endpoint
//! - `gemini` - Gemini Live session bridge WebSocket

pub mod api;
pub mod gemini;

// Re-export commonly used handlers for convenient access
pub use gemini::gemini_handler;

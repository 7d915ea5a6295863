//! Route configuration modules

pub mod api;
pub mod gemini;

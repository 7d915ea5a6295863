//! Core protocol modules for the VOX gateway.

pub mod live;

pub use live::*;

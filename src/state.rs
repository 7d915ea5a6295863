//! Shared application state.

use crate::config::ServerConfig;

/// Application state shared across all handlers.
///
/// Wrapped in an `Arc` by the router; holds only immutable configuration.
/// Bridge sessions keep their own per-connection state and never share it.
#[derive(Debug)]
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_holds_config() {
        let mut config = ServerConfig::default();
        config.port = 4000;
        let state = AppState::new(config);
        assert_eq!(state.config.port, 4000);
    }
}

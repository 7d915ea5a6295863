//! Gemini Live API client.
//!
//! This module owns the server-to-Google WebSocket connection for one bridge
//! session. The connection is created lazily once the client's configuration
//! arrives, sends the setup handshake as its very first frame, and is torn
//! down for good on any failure - there is no retry, reconnect, or backoff:
//! a broken upstream connection ends the session.
//!
//! # API Reference
//!
//! - Endpoint: `wss://generativelanguage.googleapis.com/ws/...BidiGenerateContent`
//! - Protocol: WebSocket with JSON frames, authenticated via `x-goog-api-key`
//! - Uplink audio: PCM 16-bit, 16kHz, mono, little-endian, base64 encoded

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};

use super::config::LiveConfig;
use super::messages::{ClientFrame, ServerContent};

/// Channel capacity for uplink frames and downlink events.
///
/// Both channels are bounded and senders await on a full queue, so a slow
/// consumer flow-controls the producer instead of growing memory.
const LIVE_CHANNEL_CAPACITY: usize = 1024;

/// Errors that can occur on the upstream Live connection.
#[derive(Debug, Error)]
pub enum LiveError {
    /// Connection to the service failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for Live operations.
pub type LiveResult<T> = Result<T, LiveError>;

/// A downlink event from the Live service.
///
/// Frames are dispatched by which top-level field is present; unrecognized
/// shapes are surfaced as `Raw` rather than dropped so clients can inspect
/// protocol additions before this bridge learns about them.
#[derive(Debug)]
pub enum LiveEvent {
    /// Token usage accounting (informational)
    Usage(Value),
    /// The service acknowledged the setup handshake
    SetupComplete,
    /// A `serverContent` payload
    Content(ServerContent),
    /// An unrecognized frame, forwarded verbatim
    Raw(Value),
    /// The service closed the connection
    Closed { code: Option<u16>, reason: String },
    /// The connection failed
    TransportError(String),
}

/// One upstream Live connection, exclusively owned by its bridge session.
///
/// The setup frame is written to the socket before the connection task is
/// spawned, so no audio or text can ever precede it. Dropping the client
/// aborts the connection task, which closes the socket.
pub struct LiveClient {
    frame_tx: mpsc::Sender<ClientFrame>,
    task: JoinHandle<()>,
}

impl LiveClient {
    /// Open the upstream connection, send the setup handshake, and start the
    /// connection task.
    ///
    /// Downlink events are delivered on `event_tx`; the stream ends with
    /// either `Closed` or `TransportError`.
    pub async fn connect(
        config: LiveConfig,
        event_tx: mpsc::Sender<LiveEvent>,
    ) -> LiveResult<Self> {
        if config.api_key.is_empty() {
            return Err(LiveError::InvalidConfiguration(
                "API key is required".to_string(),
            ));
        }

        let endpoint = config.endpoint().to_string();
        let uri: http::Uri = endpoint
            .parse()
            .map_err(|e| LiveError::InvalidConfiguration(format!("Invalid endpoint: {e}")))?;
        let host = match (uri.host(), uri.port_u16()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(LiveError::InvalidConfiguration(
                    "Endpoint has no host".to_string(),
                ));
            }
        };

        let request = http::Request::builder()
            .uri(&endpoint)
            .header("x-goog-api-key", &config.api_key)
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", host)
            .body(())
            .map_err(|e| LiveError::ConnectionFailed(e.to_string()))?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| LiveError::ConnectionFailed(e.to_string()))?;

        tracing::info!(model = config.model(), "Connected to Gemini Live API");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        // The setup handshake is the first frame on the wire, written before
        // the connection task can pull anything off the uplink channel.
        let setup = ClientFrame::setup(&config);
        let setup_json = serde_json::to_string(&setup)
            .map_err(|e| LiveError::SerializationError(e.to_string()))?;
        tracing::debug!(payload = %setup_json, "Sending BidiGenerateContentSetup");
        ws_sink
            .send(Message::Text(setup_json.into()))
            .await
            .map_err(|e| LiveError::WebSocketError(e.to_string()))?;

        let (frame_tx, mut frame_rx) = mpsc::channel::<ClientFrame>(LIVE_CHANNEL_CAPACITY);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Uplink frames from the bridge
                    frame = frame_rx.recv() => {
                        let Some(frame) = frame else { break };
                        let json = match serde_json::to_string(&frame) {
                            Ok(json) => json,
                            Err(e) => {
                                tracing::error!("Failed to serialize uplink frame: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send frame to Live API: {}", e);
                            let _ = event_tx
                                .send(LiveEvent::TransportError(e.to_string()))
                                .await;
                            break;
                        }
                    }

                    // Downlink frames from the service
                    msg = ws_stream.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let mut disconnected = false;
                                for event in parse_downlink(&text) {
                                    if event_tx.send(event).await.is_err() {
                                        disconnected = true;
                                        break;
                                    }
                                }
                                if disconnected {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                let (code, reason) = match frame {
                                    Some(f) => (Some(u16::from(f.code)), f.reason.to_string()),
                                    None => (None, String::new()),
                                };
                                tracing::info!(?code, reason = %reason, "Live API closed the connection");
                                let _ = event_tx.send(LiveEvent::Closed { code, reason }).await;
                                break;
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("Failed to send pong to Live API: {}", e);
                                }
                            }
                            Some(Ok(_)) => {}
                            Some(Err(tungstenite::Error::Protocol(
                                tungstenite::error::ProtocolError::ResetWithoutClosingHandshake,
                            ))) => {
                                // Abnormal closure, reported as 1006 like a
                                // browser-side close event would be
                                tracing::warn!("Live API connection reset without close handshake");
                                let _ = event_tx
                                    .send(LiveEvent::Closed {
                                        code: Some(1006),
                                        reason: String::new(),
                                    })
                                    .await;
                                break;
                            }
                            Some(Err(e)) => {
                                tracing::error!("Live API WebSocket error: {}", e);
                                let _ = event_tx
                                    .send(LiveEvent::TransportError(e.to_string()))
                                    .await;
                                break;
                            }
                            None => {
                                tracing::info!("Live API connection ended without close frame");
                                let _ = event_tx
                                    .send(LiveEvent::Closed {
                                        code: Some(1006),
                                        reason: String::new(),
                                    })
                                    .await;
                                break;
                            }
                        }
                    }
                }
            }

            tracing::debug!("Live connection task ended");
        });

        Ok(Self { frame_tx, task })
    }

    /// Send a complete user text turn upstream.
    pub async fn send_text(&self, text: &str) -> LiveResult<()> {
        self.send(ClientFrame::user_text(text)).await
    }

    /// Send a base64 PCM microphone chunk upstream.
    pub async fn send_audio_chunk(&self, base64_data: &str) -> LiveResult<()> {
        self.send(ClientFrame::user_audio(base64_data)).await
    }

    async fn send(&self, frame: ClientFrame) -> LiveResult<()> {
        self.frame_tx
            .send(frame)
            .await
            .map_err(|_| LiveError::NotConnected)
    }
}

impl Drop for LiveClient {
    /// Terminate the connection task (and with it the socket) when the
    /// owning session goes away.
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Parse one downlink frame into its events.
///
/// Dispatch mirrors the untagged protocol: `usageMetadata` is checked
/// independently (it can ride along with other fields), then
/// `setupComplete`, then `serverContent`; a frame with none of the
/// recognized fields is forwarded raw. A malformed frame is logged and
/// swallowed - a single bad frame from a version-evolving service must not
/// tear down the session.
fn parse_downlink(text: &str) -> Vec<LiveEvent> {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Failed to parse Live API frame: {} - {}", e, text);
            return Vec::new();
        }
    };

    let mut events = Vec::new();

    if let Some(usage) = value.get("usageMetadata") {
        tracing::debug!(usage = %usage, "Live API usage metadata");
        events.push(LiveEvent::Usage(usage.clone()));
    }

    if value.get("setupComplete").is_some() {
        events.push(LiveEvent::SetupComplete);
    } else if let Some(content) = value.get("serverContent") {
        match serde_json::from_value::<ServerContent>(content.clone()) {
            Ok(content) => events.push(LiveEvent::Content(content)),
            Err(e) => {
                tracing::warn!("Failed to parse serverContent: {} - {}", e, text);
            }
        }
    } else if events.is_empty() {
        events.push(LiveEvent::Raw(value));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_connect_requires_api_key() {
        let (event_tx, _event_rx) = mpsc::channel(8);
        let config = LiveConfig::default();
        let result = LiveClient::connect(config, event_tx).await;
        assert!(matches!(result, Err(LiveError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_endpoint() {
        let (event_tx, _event_rx) = mpsc::channel(8);
        let config = LiveConfig {
            api_key: "test_key".to_string(),
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        let result = LiveClient::connect(config, event_tx).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_downlink_setup_complete() {
        let events = parse_downlink(r#"{"setupComplete":{}}"#);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LiveEvent::SetupComplete));
    }

    #[test]
    fn test_parse_downlink_usage() {
        let events = parse_downlink(r#"{"usageMetadata":{"responseTokenCount":12}}"#);
        assert_eq!(events.len(), 1);
        match &events[0] {
            LiveEvent::Usage(usage) => assert_eq!(usage["responseTokenCount"], 12),
            other => panic!("Expected Usage, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_downlink_server_content() {
        let events = parse_downlink(r#"{"serverContent":{"turnComplete":true}}"#);
        assert_eq!(events.len(), 1);
        match &events[0] {
            LiveEvent::Content(content) => {
                assert_eq!(content.turn_complete, Some(json!(true)));
            }
            other => panic!("Expected Content, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_downlink_usage_rides_along_with_content() {
        let events = parse_downlink(
            r#"{"usageMetadata":{"responseTokenCount":3},"serverContent":{"turnComplete":true}}"#,
        );
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], LiveEvent::Usage(_)));
        assert!(matches!(events[1], LiveEvent::Content(_)));
    }

    #[test]
    fn test_parse_downlink_raw_fallback() {
        let events = parse_downlink(r#"{"someNewField":{"x":1}}"#);
        assert_eq!(events.len(), 1);
        match &events[0] {
            LiveEvent::Raw(value) => assert_eq!(value["someNewField"]["x"], 1),
            other => panic!("Expected Raw, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_downlink_malformed_swallowed() {
        assert!(parse_downlink("not json at all").is_empty());
    }
}

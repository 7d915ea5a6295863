//! Gemini bridge WebSocket handler.
//!
//! Bridges one browser WebSocket to one upstream Gemini Live connection. The
//! upstream socket is opened lazily when the client's `gemini_config` arrives
//! and both sockets are torn down together: closing either side terminates
//! the other, with no reconnect.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::{select, time::Duration};
use tracing::{debug, error, info, warn};

use crate::core::live::{LiveClient, LiveConfig, LiveContentEvent, LiveEvent, content_events};
use crate::state::AppState;

use super::messages::{
    ClientMessage, ClientParseError, ClientRoute, ErrorFrame, ServerEvent, SessionConfig,
    StatusFrame, parse_client_message,
};
use super::session::{BridgeSession, UplinkGate};

/// Channel buffer size for outgoing client frames
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// How often the loop wakes to check timeouts
const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Maximum idle time before closing the connection
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Gemini bridge WebSocket handler
///
/// Upgrades the HTTP connection to WebSocket and runs the bridge loop. The
/// session's API key never reaches the browser; the bridge holds it and
/// authenticates the upstream connection itself.
pub async fn gemini_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("Gemini bridge WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_gemini_socket(socket, state))
}

/// Handle one bridged client connection.
async fn handle_gemini_socket(mut socket: WebSocket, app_state: Arc<AppState>) {
    if app_state.config.gemini_api_key.is_none() {
        error!("GEMINI_API_KEY is not set, closing WebSocket connection");
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    info!(session_id = %session_id, "Gemini bridge client connected, waiting for initial config");

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<ClientRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing frames. Ends after a Close route so queued
    // frames flush before the socket closes.
    let sender_task = tokio::spawn(async move {
        while let Some(route) = message_rx.recv().await {
            let should_close = matches!(route, ClientRoute::Close);

            let result = match &route {
                ClientRoute::Event(event) => send_json(&mut sender, event).await,
                ClientRoute::Status(status) => send_json(&mut sender, status).await,
                ClientRoute::Error(err) => send_json(&mut sender, err).await,
                ClientRoute::Close => {
                    info!("Closing Gemini bridge WebSocket connection");
                    sender.send(Message::Close(None)).await
                }
            };

            if let Err(e) = result {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }

            if should_close {
                break;
            }
        }
    });

    let mut session = BridgeSession::new();
    let mut live: Option<LiveClient> = None;

    // Downlink event channel. The sender half is handed to the upstream
    // connection once it exists; until then the receiver just stays idle.
    let (live_tx, mut live_rx) = mpsc::channel::<LiveEvent>(CHANNEL_BUFFER_SIZE);

    let setup_timeout = Duration::from_secs(app_state.config.gemini_setup_timeout_secs);
    let mut last_activity = std::time::Instant::now();

    loop {
        select! {
            msg_result = receiver.next() => {
                last_activity = std::time::Instant::now();

                match msg_result {
                    Some(Ok(msg)) => {
                        let continue_processing = process_client_message(
                            msg,
                            &mut session,
                            &mut live,
                            &live_tx,
                            &message_tx,
                            &app_state,
                        ).await;

                        if !continue_processing {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Gemini bridge client WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        info!("Gemini bridge client disconnected");
                        break;
                    }
                }
            }

            event = live_rx.recv() => {
                let Some(event) = event else {
                    warn!("Live event channel closed");
                    break;
                };

                let continue_processing =
                    process_live_event(event, &mut session, &message_tx).await;

                if !continue_processing {
                    break;
                }
            }

            _ = tokio::time::sleep(TICK_INTERVAL) => {
                if session.setup_ack_overdue(setup_timeout) {
                    warn!(
                        timeout_secs = setup_timeout.as_secs(),
                        "Gemini setup acknowledgement overdue, closing session"
                    );
                    let _ = message_tx
                        .send(ClientRoute::Error(ErrorFrame::setup_timeout()))
                        .await;
                    break;
                }

                if last_activity.elapsed() > IDLE_TIMEOUT {
                    warn!(
                        idle_secs = last_activity.elapsed().as_secs(),
                        "Gemini bridge connection idle, closing stale connection"
                    );
                    let _ = message_tx
                        .send(ClientRoute::Error(ErrorFrame::idle_timeout()))
                        .await;
                    break;
                }
            }
        }
    }

    // Teardown: both sockets go down together. Dropping the LiveClient aborts
    // its connection task; the Close route lets queued frames flush first.
    session.close();
    drop(live);

    let _ = message_tx.send(ClientRoute::Close).await;
    drop(message_tx);
    let _ = sender_task.await;

    info!(session_id = %session_id, "Gemini bridge session terminated");
}

/// Serialize a frame and write it to the client sink.
async fn send_json<T: Serialize>(
    sender: &mut SplitSink<WebSocket, Message>,
    payload: &T,
) -> Result<(), axum::Error> {
    match serde_json::to_string(payload) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            error!("Failed to serialize outgoing frame: {}", e);
            Ok(())
        }
    }
}

/// Process one incoming client WebSocket message.
///
/// Returns false when the session should end.
async fn process_client_message(
    msg: Message,
    session: &mut BridgeSession,
    live: &mut Option<LiveClient>,
    live_tx: &mpsc::Sender<LiveEvent>,
    message_tx: &mpsc::Sender<ClientRoute>,
    app_state: &Arc<AppState>,
) -> bool {
    let text = match msg {
        Message::Text(text) => text.to_string(),
        // Binary frames get the same JSON treatment as text
        Message::Binary(data) => String::from_utf8_lossy(&data).into_owned(),
        Message::Ping(_) | Message::Pong(_) => return true,
        Message::Close(_) => {
            info!("Gemini bridge close received from client");
            return false;
        }
    };

    debug!("Received client message: {} bytes", text.len());

    let parsed = match parse_client_message(&text) {
        Ok(parsed) => parsed,
        Err(ClientParseError::InvalidJson) | Err(ClientParseError::MalformedPayload(_)) => {
            warn!("Failed to parse client message, expecting JSON object");
            let _ = message_tx
                .send(ClientRoute::Error(ErrorFrame::invalid_json()))
                .await;
            return true;
        }
        Err(ClientParseError::UnknownType(message_type)) => {
            warn!(message_type = %message_type, "Unknown message type from client");
            let frame = if session.accepts_config() {
                // Nothing has been configured yet, steer the client there
                ErrorFrame::config_not_processed()
            } else {
                ErrorFrame::unknown_type(&message_type)
            };
            let _ = message_tx.send(ClientRoute::Error(frame)).await;
            return true;
        }
    };

    match parsed {
        ClientMessage::Config(config) => {
            handle_config(config, session, live, live_tx, message_tx, app_state).await
        }
        ClientMessage::TextInput { text } => {
            if !session.is_active() {
                let _ = message_tx
                    .send(ClientRoute::Error(ErrorFrame::session_not_initialized()))
                    .await;
                return true;
            }
            let Some(client) = live else {
                let _ = message_tx
                    .send(ClientRoute::Error(ErrorFrame::session_not_initialized()))
                    .await;
                return true;
            };

            debug!("Forwarding user text turn upstream");
            if let Err(e) = client.send_text(&text).await {
                error!("Failed to send text to Live API: {}", e);
                let _ = message_tx
                    .send(ClientRoute::Error(ErrorFrame::upstream_error(
                        &e.to_string(),
                    )))
                    .await;
                return false;
            }
            true
        }
        ClientMessage::AudioInput { data } => {
            // A chunk without data is ignored outright
            let Some(data) = data else { return true };

            match session.gate_audio() {
                UplinkGate::NotReady => {
                    let _ = message_tx
                        .send(ClientRoute::Error(ErrorFrame::session_not_initialized()))
                        .await;
                    true
                }
                UplinkGate::DropWhileSpeaking => {
                    debug!("Dropping mic chunk while model is speaking");
                    let _ = message_tx
                        .send(ClientRoute::Event(
                            ServerEvent::uplink_dropped_model_speaking(),
                        ))
                        .await;
                    true
                }
                UplinkGate::Forward => {
                    let Some(client) = live else {
                        let _ = message_tx
                            .send(ClientRoute::Error(ErrorFrame::session_not_initialized()))
                            .await;
                        return true;
                    };

                    debug!("Forwarding mic chunk upstream: {} base64 bytes", data.len());
                    if let Err(e) = client.send_audio_chunk(&data).await {
                        error!("Failed to send audio to Live API: {}", e);
                        let _ = message_tx
                            .send(ClientRoute::Error(ErrorFrame::upstream_error(
                                &e.to_string(),
                            )))
                            .await;
                        return false;
                    }
                    true
                }
            }
        }
    }
}

/// Handle a `gemini_config` message: open the upstream connection and send
/// the setup handshake. Later configs while a session exists are ignored.
async fn handle_config(
    config: SessionConfig,
    session: &mut BridgeSession,
    live: &mut Option<LiveClient>,
    live_tx: &mpsc::Sender<LiveEvent>,
    message_tx: &mpsc::Sender<ClientRoute>,
    app_state: &Arc<AppState>,
) -> bool {
    if !session.accepts_config() {
        debug!("Ignoring duplicate gemini_config, session already configured");
        return true;
    }

    let live_config = build_live_config(&config, app_state);
    info!(
        model = live_config.model(),
        voice = ?live_config.voice,
        "Connecting to Gemini Live API"
    );

    session.begin_connect();

    match LiveClient::connect(live_config, live_tx.clone()).await {
        Ok(client) => {
            session.setup_sent();
            *live = Some(client);
            info!("Upstream connection established, awaiting setup acknowledgement");
            true
        }
        Err(e) => {
            error!("Failed to connect to Gemini Live API: {}", e);
            let _ = message_tx
                .send(ClientRoute::Error(ErrorFrame::upstream_error(
                    &e.to_string(),
                )))
                .await;
            false
        }
    }
}

/// Process one downlink event from the Live connection.
///
/// Returns false when the session should end.
async fn process_live_event(
    event: LiveEvent,
    session: &mut BridgeSession,
    message_tx: &mpsc::Sender<ClientRoute>,
) -> bool {
    match event {
        LiveEvent::SetupComplete => {
            info!("Gemini Live API setup complete");
            session.setup_complete();
            let _ = message_tx
                .send(ClientRoute::Status(StatusFrame::session_initialized()))
                .await;
            true
        }
        LiveEvent::Usage(usage) => {
            let _ = message_tx
                .send(ClientRoute::Event(ServerEvent::Usage { usage }))
                .await;
            true
        }
        LiveEvent::Content(content) => {
            for event in content_events(&content) {
                let outgoing = match event {
                    LiveContentEvent::Finish {
                        finish_reason,
                        stop_reason,
                    } => ServerEvent::Finish {
                        finish_reason,
                        stop_reason,
                    },
                    LiveContentEvent::Safety(safety_ratings) => {
                        ServerEvent::Safety { safety_ratings }
                    }
                    LiveContentEvent::Transcription(text) => ServerEvent::Transcription { text },
                    LiveContentEvent::TextChunk(text) => ServerEvent::TextChunk { text },
                    LiveContentEvent::AudioChunk(data) => {
                        session.model_turn_started();
                        ServerEvent::AudioChunk { data }
                    }
                    LiveContentEvent::Interrupted => {
                        session.model_turn_ended();
                        ServerEvent::Interrupted
                    }
                    LiveContentEvent::GenerationComplete => {
                        session.model_turn_ended();
                        ServerEvent::GenerationComplete
                    }
                    LiveContentEvent::TurnComplete => {
                        session.model_turn_ended();
                        ServerEvent::TurnComplete
                    }
                };
                let _ = message_tx.send(ClientRoute::Event(outgoing)).await;
            }
            true
        }
        LiveEvent::Raw(data) => {
            debug!("Forwarding unrecognized upstream frame to client");
            let _ = message_tx
                .send(ClientRoute::Event(ServerEvent::RawMessage { data }))
                .await;
            true
        }
        LiveEvent::Closed { code, reason } => {
            info!(?code, reason = %reason, "Gemini Live connection closed");
            let _ = message_tx
                .send(ClientRoute::Status(StatusFrame::upstream_closed(
                    code, reason,
                )))
                .await;
            false
        }
        LiveEvent::TransportError(message) => {
            error!("Gemini Live connection error: {}", message);
            let _ = message_tx
                .send(ClientRoute::Error(ErrorFrame::upstream_error(&message)))
                .await;
            false
        }
    }
}

/// Build the upstream connection config from the client's session config and
/// server-held settings.
fn build_live_config(config: &SessionConfig, app_state: &Arc<AppState>) -> LiveConfig {
    LiveConfig {
        api_key: app_state.config.gemini_api_key.clone().unwrap_or_default(),
        endpoint: app_state.config.gemini_live_url.clone().unwrap_or_default(),
        model: config.model.clone().unwrap_or_default(),
        system_prompt: config.system_prompt.clone().unwrap_or_default(),
        voice: config.gemini_voice.clone(),
        temperature: config.temperature,
        debug_text: app_state.config.gemini_debug || config.debug.unwrap_or(false),
        safety_settings: config.safety_settings.clone(),
    }
}

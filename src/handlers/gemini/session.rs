//! Per-connection bridge session state.
//!
//! Each client WebSocket owns exactly one `BridgeSession`. The session tracks
//! where the upstream connection is in its lifecycle and whether the model is
//! currently speaking, which together decide what to do with each incoming
//! client message.

use std::time::{Duration, Instant};

/// Lifecycle of the upstream Live connection for one client session.
///
/// Transitions only move forward; a session that reaches `Closed` is never
/// reopened, the client must reconnect to start over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Client connected, no configuration received yet. No upstream socket.
    AwaitingConfig,
    /// Configuration accepted, upstream handshake in flight.
    ConnectingUpstream,
    /// Upstream open and setup frame sent, waiting for `setupComplete`.
    AwaitingSetupAck,
    /// Setup acknowledged, full-duplex relay in effect.
    Active,
    /// Session over. Both sockets are torn down together.
    Closed,
}

/// Verdict for an incoming microphone audio chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkGate {
    /// Forward the chunk upstream.
    Forward,
    /// Drop silently and notify the client the model is speaking.
    DropWhileSpeaking,
    /// Session is not active yet, reject with an error.
    NotReady,
}

/// State for one client connection's bridge to the Live API.
#[derive(Debug)]
pub struct BridgeSession {
    state: SessionState,
    /// True between the first audio chunk of a model turn and the matching
    /// `turnComplete` (or an interruption). Text chunks do not set it; only
    /// audible output gates the mic.
    model_speaking: bool,
    /// When the setup frame was written upstream, for ack timeout tracking.
    setup_sent_at: Option<Instant>,
}

impl BridgeSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::AwaitingConfig,
            model_speaking: false,
            setup_sent_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn model_speaking(&self) -> bool {
        self.model_speaking
    }

    /// Whether a `gemini_config` message should open the upstream socket.
    ///
    /// Only the first configuration counts; later ones are ignored without
    /// error so a client retrying its config during a slow handshake does not
    /// get spurious failures.
    pub fn accepts_config(&self) -> bool {
        self.state == SessionState::AwaitingConfig
    }

    /// Configuration accepted, upstream handshake starting.
    pub fn begin_connect(&mut self) {
        debug_assert_eq!(self.state, SessionState::AwaitingConfig);
        self.state = SessionState::ConnectingUpstream;
    }

    /// Upstream open and the setup frame has been written.
    pub fn setup_sent(&mut self) {
        debug_assert_eq!(self.state, SessionState::ConnectingUpstream);
        self.state = SessionState::AwaitingSetupAck;
        self.setup_sent_at = Some(Instant::now());
    }

    /// Google acknowledged the setup frame; the relay is live.
    pub fn setup_complete(&mut self) {
        self.state = SessionState::Active;
        self.setup_sent_at = None;
    }

    /// True when the setup ack has been outstanding longer than `timeout`.
    pub fn setup_ack_overdue(&self, timeout: Duration) -> bool {
        match self.setup_sent_at {
            Some(sent) if self.state == SessionState::AwaitingSetupAck => {
                sent.elapsed() >= timeout
            }
            _ => false,
        }
    }

    /// Terminal transition. Idempotent.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
        self.model_speaking = false;
        self.setup_sent_at = None;
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Model output (audio or text chunk) observed on the downlink.
    pub fn model_turn_started(&mut self) {
        self.model_speaking = true;
    }

    /// Turn finished or the user barged in; mic uplink reopens.
    pub fn model_turn_ended(&mut self) {
        self.model_speaking = false;
    }

    /// Decide what to do with an incoming microphone chunk.
    ///
    /// Half-duplex gating: while the model is speaking the chunk is dropped
    /// rather than queued, stale audio must never arrive after the turn ends.
    pub fn gate_audio(&self) -> UplinkGate {
        if self.state != SessionState::Active {
            return UplinkGate::NotReady;
        }
        if self.model_speaking {
            return UplinkGate::DropWhileSpeaking;
        }
        UplinkGate::Forward
    }
}

impl Default for BridgeSession {
    fn default() -> Self {
        Self::new()
    }
}

//! Connection lifecycle and inbound queueing.
//!
//! The transport lives in whatever feeds events in; this module owns the
//! state machine, the reconnect ladder, and the inbound message queue the
//! pipeline worker drains. The webhook surface pushes onto the same queue.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use {
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use {voicebridge_common::InboundMessage, voicebridge_config::ReconnectConfig};

/// Inbound messages buffered between the transport and the pipeline worker.
const INBOUND_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}

/// Events the transport reports to the manager.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Opened,
    Closed { reason: String },
    /// The platform invalidated the pairing. Terminal until re-paired.
    LoggedOut,
    Inbound(InboundMessage),
}

/// Fixed reconnect ladder. The last delay repeats once exhausted.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    delays: Vec<Duration>,
}

impl ReconnectPolicy {
    pub fn from_config(config: &ReconnectConfig) -> Self {
        if config.delays_secs.is_empty() {
            return Self::default();
        }
        Self {
            delays: config
                .delays_secs
                .iter()
                .map(|&secs| Duration::from_secs(secs))
                .collect(),
        }
    }

    #[must_use]
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let idx = attempt.min(self.delays.len().saturating_sub(1));
        self.delays
            .get(idx)
            .copied()
            .unwrap_or(Duration::from_secs(30))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delays: [3, 3, 6, 12, 30].map(Duration::from_secs).to_vec(),
        }
    }
}

struct Inner {
    state: ConnectionState,
    attempt: usize,
    logged_out: bool,
}

/// Tracks connection state and decides when (and whether) to reconnect.
///
/// Message arrival is queue-shaped: the manager owns the sending half of an
/// mpsc channel and hands the receiving half out exactly once.
pub struct ConnectionManager {
    inner: Mutex<Inner>,
    policy: ReconnectPolicy,
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: Mutex<Option<mpsc::Receiver<InboundMessage>>>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(policy: ReconnectPolicy) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        Self {
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                attempt: 0,
                logged_out: false,
            }),
            policy,
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// The inbound queue's receiving half. `None` after the first call.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<InboundMessage>> {
        self.inbound_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Mark a dial in progress. No-op once logged out.
    pub fn begin_connect(&self) {
        let mut inner = self.lock();
        if inner.logged_out {
            debug!("ignoring connect attempt after logout");
            return;
        }
        inner.state = ConnectionState::Connecting;
        debug!("connecting");
    }

    /// Apply a transport event. Returns the delay to wait before the next
    /// dial when the event calls for a reconnect.
    pub async fn handle_event(&self, event: ConnectionEvent) -> Option<Duration> {
        match event {
            ConnectionEvent::Opened => {
                let mut inner = self.lock();
                inner.state = ConnectionState::Connected;
                inner.attempt = 0;
                info!("connection open");
                None
            },
            ConnectionEvent::Closed { reason } => {
                let mut inner = self.lock();
                if inner.logged_out {
                    debug!(reason, "close after logout, staying down");
                    return None;
                }
                inner.state = ConnectionState::Reconnecting;
                let delay = self.policy.delay_for(inner.attempt);
                inner.attempt += 1;
                warn!(
                    reason,
                    attempt = inner.attempt,
                    delay_secs = delay.as_secs(),
                    "connection closed, reconnect scheduled"
                );
                Some(delay)
            },
            ConnectionEvent::LoggedOut => {
                let mut inner = self.lock();
                inner.state = ConnectionState::Disconnected;
                inner.logged_out = true;
                warn!("logged out by the platform, re-pairing required");
                None
            },
            ConnectionEvent::Inbound(msg) => {
                debug!(sender_id = %msg.sender_id, "inbound message queued");
                if let Err(e) = self.inbound_tx.send(msg).await {
                    warn!(error = %e, "inbound queue closed, dropping message");
                }
                None
            },
        }
    }
}

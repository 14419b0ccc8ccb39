//! Connection state machine and reconnect backoff.
//!
//! The machine is the portable contract between the sync manager and any
//! wire client: `connecting → connected` on subscribe acknowledgment,
//! `connected → reconnecting` on channel loss, exponentially backed-off
//! retries up to a bounded attempt count, then a terminal `failed` state
//! that requires a manual reset. It never retries forever.

use std::sync::mpsc::{self, Receiver, Sender};

/// First retry delay.
pub const INITIAL_BACKOFF_MS: u64 = 1_000;
/// Backoff ceiling.
pub const MAX_BACKOFF_MS: u64 = 30_000;
/// Default bound on consecutive reconnect attempts.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 8;

/// Retry delay for the given attempt (1-based):
/// `min(1000 × 2^(attempt-1), 30000)`.
pub fn backoff_delay_ms(attempt: u32) -> u64 {
    let shift = attempt.saturating_sub(1).min(15);
    (INITIAL_BACKOFF_MS << shift).min(MAX_BACKOFF_MS)
}

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
    Failed,
}

/// Snapshot of the connection, delivered to status subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
    /// Delay before the scheduled retry, when one is pending.
    pub retry_delay_ms: Option<u64>,
}

/// The reconnect/backoff state machine plus its status stream.
pub struct ConnectionMachine {
    status: ConnectionStatus,
    max_attempts: u32,
    next_retry_at_ms: Option<u64>,
    subscribers: Vec<Sender<ConnectionStatus>>,
}

impl ConnectionMachine {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            status: ConnectionStatus {
                state: ConnectionState::Disconnected,
                reconnect_attempts: 0,
                retry_delay_ms: None,
            },
            max_attempts: max_attempts.max(1),
            next_retry_at_ms: None,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.status.state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status.state == ConnectionState::Connected
    }

    /// Subscribe to status updates. The current status is delivered
    /// immediately, then every transition.
    pub fn subscribe(&mut self) -> Receiver<ConnectionStatus> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(self.status);
        self.subscribers.push(tx);
        rx
    }

    fn transition(&mut self, status: ConnectionStatus) {
        if status == self.status {
            return;
        }
        self.status = status;
        // Dead receivers fall out of the list on the next broadcast.
        self.subscribers.retain(|tx| tx.send(status).is_ok());
    }

    /// A connect (or retry) was initiated.
    pub fn connect_started(&mut self) {
        self.next_retry_at_ms = None;
        self.transition(ConnectionStatus {
            state: ConnectionState::Connecting,
            reconnect_attempts: self.status.reconnect_attempts,
            retry_delay_ms: None,
        });
    }

    /// Subscribe acknowledgment arrived; the attempt counter resets.
    pub fn subscribed(&mut self) {
        self.next_retry_at_ms = None;
        self.transition(ConnectionStatus {
            state: ConnectionState::Connected,
            reconnect_attempts: 0,
            retry_delay_ms: None,
        });
    }

    /// Channel error or timeout. Schedules a backed-off retry, or enters the
    /// terminal `Failed` state once the attempt budget is exhausted.
    pub fn channel_lost(&mut self, now_ms: u64) {
        if self.status.state == ConnectionState::Failed {
            return;
        }
        let attempts = self.status.reconnect_attempts + 1;
        if attempts > self.max_attempts {
            self.next_retry_at_ms = None;
            self.transition(ConnectionStatus {
                state: ConnectionState::Failed,
                reconnect_attempts: self.status.reconnect_attempts,
                retry_delay_ms: None,
            });
            return;
        }
        let delay = backoff_delay_ms(attempts);
        self.next_retry_at_ms = Some(now_ms + delay);
        self.transition(ConnectionStatus {
            state: ConnectionState::Reconnecting,
            reconnect_attempts: attempts,
            retry_delay_ms: Some(delay),
        });
    }

    /// True when a scheduled retry is due; the machine moves to
    /// `Connecting` and the caller performs the actual connect.
    pub fn poll_retry(&mut self, now_ms: u64) -> bool {
        if self.status.state != ConnectionState::Reconnecting {
            return false;
        }
        match self.next_retry_at_ms {
            Some(due) if now_ms >= due => {
                self.connect_started();
                true
            }
            _ => false,
        }
    }

    /// Manual reset out of the terminal `Failed` state.
    pub fn reset(&mut self) {
        self.next_retry_at_ms = None;
        self.transition(ConnectionStatus {
            state: ConnectionState::Disconnected,
            reconnect_attempts: 0,
            retry_delay_ms: None,
        });
    }

    /// Cancel any pending retry on teardown.
    pub fn dispose(&mut self) {
        self.next_retry_at_ms = None;
        self.transition(ConnectionStatus {
            state: ConnectionState::Disconnected,
            reconnect_attempts: self.status.reconnect_attempts,
            retry_delay_ms: None,
        });
    }
}

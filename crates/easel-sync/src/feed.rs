//! Change feed seam.
//!
//! Only the observable contract of the wire client matters here: connect,
//! drain pushed events, publish outbound changes, disconnect. The concrete
//! client lives outside this crate; [`MemoryFeed`] is the in-process
//! implementation used by tests and local sessions.

use thiserror::Error;

use crate::protocol::RowChange;

/// Errors surfaced by a change feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed not connected")]
    NotConnected,
    #[error("feed unavailable: {0}")]
    Unavailable(String),
}

/// Events pushed by the feed, drained via [`ChangeFeed::poll`].
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Subscribe acknowledgment; the session's filtered change stream is
    /// live from here on.
    Subscribed,
    Change(RowChange),
    ChannelError(String),
    Closed,
}

/// Contract of the push channel to the durable store.
pub trait ChangeFeed {
    /// Initiate a (re)connect. The subscribe acknowledgment arrives later
    /// as [`FeedEvent::Subscribed`].
    fn connect(&mut self) -> Result<(), FeedError>;

    /// Drain pending events, in delivery order.
    fn poll(&mut self) -> Vec<FeedEvent>;

    /// Publish one outbound change.
    fn publish(&mut self, change: &RowChange) -> Result<(), FeedError>;

    fn disconnect(&mut self);
}

/// In-memory feed for tests and ephemeral use: scripted incoming events,
/// recorded outbound publishes.
#[derive(Debug, Default)]
pub struct MemoryFeed {
    connected: bool,
    ack_on_connect: bool,
    fail_connects: u32,
    incoming: Vec<FeedEvent>,
    published: Vec<RowChange>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self {
            ack_on_connect: true,
            ..Self::default()
        }
    }

    /// Suppress the automatic subscribe acknowledgment on connect.
    pub fn without_ack(mut self) -> Self {
        self.ack_on_connect = false;
        self
    }

    /// Make the next `n` connect calls fail.
    pub fn fail_next_connects(&mut self, n: u32) {
        self.fail_connects = n;
    }

    pub fn push_event(&mut self, event: FeedEvent) {
        self.incoming.push(event);
    }

    pub fn push_change(&mut self, change: RowChange) {
        self.incoming.push(FeedEvent::Change(change));
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Drain the outbound changes recorded so far.
    pub fn take_published(&mut self) -> Vec<RowChange> {
        std::mem::take(&mut self.published)
    }

    pub fn published_count(&self) -> usize {
        self.published.len()
    }
}

impl ChangeFeed for MemoryFeed {
    fn connect(&mut self) -> Result<(), FeedError> {
        if self.fail_connects > 0 {
            self.fail_connects -= 1;
            return Err(FeedError::Unavailable("scripted connect failure".to_string()));
        }
        self.connected = true;
        if self.ack_on_connect {
            self.incoming.push(FeedEvent::Subscribed);
        }
        Ok(())
    }

    fn poll(&mut self) -> Vec<FeedEvent> {
        if !self.connected {
            return Vec::new();
        }
        std::mem::take(&mut self.incoming)
    }

    fn publish(&mut self, change: &RowChange) -> Result<(), FeedError> {
        if !self.connected {
            return Err(FeedError::NotConnected);
        }
        self.published.push(change.clone());
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}

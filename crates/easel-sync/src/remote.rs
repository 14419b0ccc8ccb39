//! Remote change ingestion and outbound publishing.
//!
//! The manager keeps the object store consistent with the durable remote
//! store: it consumes the push feed's row events and applies them with
//! [`Origin::Remote`], an internal mutation path that the outbound encoder
//! ignores, so nothing just received is ever re-sent. Store mutations that
//! originate locally or on the surface are encoded to row changes and
//! queued; the queue drains while the feed is connected and accumulates
//! while it is not (its length feeds the offline status indicator).

use std::collections::VecDeque;

use uuid::Uuid;

use easel_core::store::{CanvasObjectStore, Origin, StoreChange, StoreEvent};

use crate::connection::{
    ConnectionMachine, ConnectionState, ConnectionStatus, DEFAULT_MAX_RECONNECT_ATTEMPTS,
};
use crate::feed::{ChangeFeed, FeedEvent};
use crate::protocol::{decode_row, ChangeKind, RowChange};

/// Tunables for the sync manager.
#[derive(Debug, Clone, Copy)]
pub struct RemoteSyncConfig {
    pub max_reconnect_attempts: u32,
}

impl Default for RemoteSyncConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

/// Bidirectional bridge between the object store and the remote feed.
pub struct RemoteSyncManager<F: ChangeFeed> {
    feed: F,
    connection: ConnectionMachine,
    outbound: VecDeque<RowChange>,
    disposed: bool,
}

impl<F: ChangeFeed> RemoteSyncManager<F> {
    pub fn new(feed: F, config: RemoteSyncConfig) -> Self {
        Self {
            feed,
            connection: ConnectionMachine::new(config.max_reconnect_attempts),
            outbound: VecDeque::new(),
            disposed: false,
        }
    }

    /// Initiate the subscription. A failed connect goes straight into the
    /// backoff machine.
    pub fn connect(&mut self, now_ms: u64) {
        if self.disposed {
            return;
        }
        self.connection.connect_started();
        if let Err(error) = self.feed.connect() {
            log::warn!("feed connect failed: {error}");
            self.connection.channel_lost(now_ms);
        }
    }

    pub fn subscribe_status(&mut self) -> std::sync::mpsc::Receiver<ConnectionStatus> {
        self.connection.subscribe()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Number of outbound changes waiting for a connection.
    pub fn queued_outbound(&self) -> usize {
        self.outbound.len()
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut F {
        &mut self.feed
    }

    /// Encode store mutations into outbound row changes. Remote-origin
    /// events are skipped: they were just received.
    pub fn collect_outbound(&mut self, events: &[StoreEvent], store: &CanvasObjectStore) {
        for event in events {
            if event.origin == Origin::Remote {
                continue;
            }
            match &event.change {
                StoreChange::Added(id) => {
                    if let Some(object) = store.get(*id) {
                        self.outbound.push_back(RowChange::insert(object));
                    }
                }
                StoreChange::Updated(id) => {
                    if let Some(object) = store.get(*id) {
                        self.outbound.push_back(RowChange::update(object));
                    }
                }
                StoreChange::Removed(object) => {
                    self.outbound.push_back(RowChange::delete(object));
                }
                StoreChange::Replaced => {
                    for object in store.objects_ordered() {
                        self.outbound.push_back(RowChange::insert(object));
                    }
                }
                StoreChange::SelectionChanged => {}
            }
        }
    }

    /// One cooperative cycle: drain the feed, run the reconnect schedule,
    /// flush the outbound queue while connected.
    pub fn poll(&mut self, store: &mut CanvasObjectStore, now_ms: u64) {
        if self.disposed {
            return;
        }

        for event in self.feed.poll() {
            match event {
                FeedEvent::Subscribed => {
                    log::info!("remote feed subscribed");
                    self.connection.subscribed();
                }
                FeedEvent::Change(change) => apply_remote(store, change),
                FeedEvent::ChannelError(message) => {
                    log::warn!("remote channel error: {message}");
                    self.connection.channel_lost(now_ms);
                }
                FeedEvent::Closed => {
                    log::info!("remote channel closed");
                    self.connection.channel_lost(now_ms);
                }
            }
        }

        if self.connection.poll_retry(now_ms) {
            log::info!(
                "reconnecting to remote feed (attempt {})",
                self.connection.status().reconnect_attempts
            );
            if let Err(error) = self.feed.connect() {
                log::warn!("reconnect failed: {error}");
                self.connection.channel_lost(now_ms);
            }
        }

        if self.connection.is_connected() {
            self.flush_outbound();
        }
    }

    fn flush_outbound(&mut self) {
        while let Some(change) = self.outbound.front() {
            if self.feed.publish(change).is_err() {
                break;
            }
            self.outbound.pop_front();
        }
    }

    /// Manual recovery from the terminal `Failed` state.
    pub fn reset(&mut self, now_ms: u64) {
        if self.disposed {
            return;
        }
        self.connection.reset();
        self.connect(now_ms);
    }

    /// Tear down: cancels the pending reconnect and closes the feed.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.feed.disconnect();
        self.connection.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// Apply one remote row event. Rows are applied in delivery order per id;
/// the last event wins. Decode failures are logged and the row dropped so
/// one bad row never takes the sync loop down.
fn apply_remote(store: &mut CanvasObjectStore, change: RowChange) {
    match change.event {
        ChangeKind::Insert | ChangeKind::Update => match decode_row(&change.row) {
            Ok(object) => {
                log::debug!("applying remote upsert for {}", object.id);
                store.add(object, Origin::Remote);
            }
            Err(error) => {
                log::warn!("dropping undecodable remote row: {error}");
            }
        },
        ChangeKind::Delete => match Uuid::parse_str(&change.row.id) {
            Ok(id) => {
                log::debug!("applying remote delete for {id}");
                store.remove(id, Origin::Remote);
            }
            Err(_) => {
                log::warn!("dropping remote delete with invalid id {:?}", change.row.id);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::MemoryFeed;
    use easel_core::object::{CanvasObject, RectangleProps, TypeProperties};

    fn rectangle(x: f64, y: f64) -> CanvasObject {
        CanvasObject::new(
            x,
            y,
            10.0,
            10.0,
            TypeProperties::Rectangle(RectangleProps { corner_radius: 0.0 }),
            "tester",
            1_000,
        )
    }

    fn manager() -> RemoteSyncManager<MemoryFeed> {
        RemoteSyncManager::new(MemoryFeed::new(), RemoteSyncConfig::default())
    }

    #[test]
    fn test_connect_and_subscribe_ack() {
        let mut manager = manager();
        let mut store = CanvasObjectStore::new();

        manager.connect(0);
        assert_eq!(manager.state(), ConnectionState::Connecting);

        manager.poll(&mut store, 0);
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_remote_insert_lands_with_remote_origin() {
        let mut manager = manager();
        let mut store = CanvasObjectStore::new();
        manager.connect(0);

        let object = rectangle(5.0, 5.0);
        let id = object.id;
        manager.feed_mut().push_change(RowChange::insert(&object));
        manager.poll(&mut store, 0);

        assert!(store.contains(id));
        let events = store.take_events();
        assert!(events.iter().all(|event| event.origin == Origin::Remote));
    }

    #[test]
    fn test_remote_events_never_echo_outbound() {
        let mut manager = manager();
        let mut store = CanvasObjectStore::new();
        manager.connect(0);

        manager
            .feed_mut()
            .push_change(RowChange::insert(&rectangle(0.0, 0.0)));
        manager.poll(&mut store, 0);

        let events = store.take_events();
        manager.collect_outbound(&events, &store);
        assert_eq!(manager.queued_outbound(), 0);
        manager.poll(&mut store, 0);
        assert_eq!(manager.feed_mut().take_published().len(), 0);
    }

    #[test]
    fn test_local_events_publish_when_connected() {
        let mut manager = manager();
        let mut store = CanvasObjectStore::new();
        manager.connect(0);
        manager.poll(&mut store, 0);

        let object = rectangle(1.0, 1.0);
        store.add(object.clone(), Origin::Local);
        let events = store.take_events();
        manager.collect_outbound(&events, &store);
        assert_eq!(manager.queued_outbound(), 1);

        manager.poll(&mut store, 0);
        let published = manager.feed_mut().take_published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event, ChangeKind::Insert);
        assert_eq!(published[0].row.id, object.id.to_string());
    }

    #[test]
    fn test_outbound_queues_while_disconnected() {
        let mut manager = manager();
        let mut store = CanvasObjectStore::new();
        // Never connected: publishes accumulate.
        store.add(rectangle(0.0, 0.0), Origin::Local);
        let events = store.take_events();
        manager.collect_outbound(&events, &store);
        manager.poll(&mut store, 0);
        assert_eq!(manager.queued_outbound(), 1);

        manager.connect(1_000);
        manager.poll(&mut store, 1_000);
        assert_eq!(manager.queued_outbound(), 0);
        assert_eq!(manager.feed_mut().take_published().len(), 1);
    }

    #[test]
    fn test_undecodable_row_is_dropped_not_fatal() {
        let mut manager = manager();
        let mut store = CanvasObjectStore::new();
        manager.connect(0);

        let mut row = crate::protocol::encode_object(&rectangle(0.0, 0.0));
        row.kind = "hexagon".to_string();
        manager.feed_mut().push_change(RowChange {
            event: ChangeKind::Insert,
            row,
        });
        let good = rectangle(2.0, 2.0);
        let good_id = good.id;
        manager.feed_mut().push_change(RowChange::insert(&good));

        manager.poll(&mut store, 0);
        // The bad row vanished, the good one landed, the loop survived.
        assert_eq!(store.len(), 1);
        assert!(store.contains(good_id));
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_reconnect_backoff_then_failed() {
        let mut manager = RemoteSyncManager::new(
            MemoryFeed::new(),
            RemoteSyncConfig {
                max_reconnect_attempts: 2,
            },
        );
        let mut store = CanvasObjectStore::new();
        manager.feed_mut().fail_next_connects(10);

        manager.connect(0);
        assert_eq!(manager.state(), ConnectionState::Reconnecting);
        assert_eq!(manager.status().retry_delay_ms, Some(1_000));

        // Too early: nothing happens.
        manager.poll(&mut store, 500);
        assert_eq!(manager.state(), ConnectionState::Reconnecting);

        // First retry fires and fails: second backoff doubles.
        manager.poll(&mut store, 1_000);
        assert_eq!(manager.status().retry_delay_ms, Some(2_000));

        // Second retry fails too: attempt budget exhausted.
        manager.poll(&mut store, 3_000);
        assert_eq!(manager.state(), ConnectionState::Failed);

        // No retries from the terminal state.
        manager.poll(&mut store, u64::MAX);
        assert_eq!(manager.state(), ConnectionState::Failed);

        // Manual reset brings it back.
        manager.feed_mut().fail_next_connects(0);
        manager.reset(10_000);
        manager.poll(&mut store, 10_000);
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_remote_delete_wins_over_local_update() {
        let mut manager = manager();
        let mut store = CanvasObjectStore::new();
        manager.connect(0);
        manager.poll(&mut store, 0);

        let object = rectangle(0.0, 0.0);
        let id = object.id;
        store.add(object.clone(), Origin::Local);
        manager.collect_outbound(&store.take_events(), &store);

        // Local optimistic update, still queued outbound.
        store.update(
            id,
            &easel_core::object::ObjectPatch::position(9.0, 9.0),
            Origin::Local,
            2_000,
        );
        manager.collect_outbound(&store.take_events(), &store);

        // Remote delete arrives and is applied last: it wins.
        manager.feed_mut().push_change(RowChange::delete(&object));
        manager.poll(&mut store, 3_000);

        assert!(!store.contains(id));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_dispose_stops_everything() {
        let mut manager = manager();
        let mut store = CanvasObjectStore::new();
        manager.connect(0);
        manager.dispose();
        assert!(manager.is_disposed());
        assert!(!manager.feed().is_connected());

        // Polling after teardown is inert.
        manager.poll(&mut store, 1_000);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }
}

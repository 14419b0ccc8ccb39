//! Easel Sync Library
//!
//! Keeps the in-memory object store consistent with two external
//! collaborators: the durable remote store (via a push change feed) and the
//! mutable rendering surface. Ships the wire codec, the reconnect state
//! machine, the loop-safe render coordinator and the session that wires it
//! all together.

pub mod connection;
pub mod coordinator;
pub mod feed;
pub mod protocol;
pub mod remote;
pub mod session;
pub mod surface;

pub use connection::{backoff_delay_ms, ConnectionMachine, ConnectionState, ConnectionStatus};
pub use coordinator::RenderSyncCoordinator;
pub use feed::{ChangeFeed, FeedError, FeedEvent, MemoryFeed};
pub use protocol::{decode_row, encode_object, ChangeKind, DecodeError, ObjectRow, RowChange};
pub use remote::{RemoteSyncConfig, RemoteSyncManager};
pub use session::{CanvasSession, SessionConfig};
pub use surface::{MemorySurface, RenderSurface, SurfaceEvent};

//! Easel Core Library
//!
//! Object store, command engine, viewport and coordinate math for the Easel
//! collaborative canvas. Networking and rendering live behind seams in the
//! `easel-sync` crate.

pub mod command;
pub mod coords;
pub mod object;
pub mod shortcuts;
pub mod store;
pub mod time;
pub mod viewport;

pub use command::{Command, CommandEngine, CommandError, CommandKind, CommandMetadata};
pub use object::{CanvasObject, Color, ObjectId, ObjectKind, ObjectPatch, TypeProperties};
pub use shortcuts::ShortcutRegistry;
pub use store::{CanvasObjectStore, Origin, StoreChange, StoreEvent};
pub use viewport::{ViewportAction, ViewportController, ViewportState};

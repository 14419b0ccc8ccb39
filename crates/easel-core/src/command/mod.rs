//! Command-based mutation layer.
//!
//! Every mutation of the object store flows through a [`Command`]: a
//! reversible unit constructed from intent parameters, which captures the
//! before-state it needs at `execute` time. The [`CommandEngine`] owns the
//! bounded undo/redo stacks.

mod arrange;
mod composite;
mod create;
mod style;
mod transform;

pub use arrange::{AlignCommand, Alignment, DistributeAxis, DistributeCommand, DistributeMode};
pub use composite::CompositeCommand;
pub use create::{CreateObjectCommand, DeleteObjectsCommand};
pub use style::{StyleChange, StyleCommand};
pub use transform::{BatchTransformCommand, MoveCommand, MoveMode, ResizeCommand, ResizeMode, RotateCommand, RotateMode};

use std::any::Any;

use serde::Serialize;
use thiserror::Error;

use crate::object::ObjectId;
use crate::store::CanvasObjectStore;

/// Maximum number of undo entries kept by default.
pub const DEFAULT_UNDO_CAPACITY: usize = 50;

/// Discriminator for every command the engine knows how to describe. Drives
/// the undo-history UI and lets an external dispatcher construct and replay
/// commands generically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    CreateRectangle,
    CreateCircle,
    CreateText,
    DeleteObjects,
    MoveAbsolute,
    MoveRelative,
    ResizeAbsolute,
    ResizeScale,
    ResizeAspect,
    RotateAbsolute,
    RotateRelative,
    SetFill,
    SetStroke,
    SetStrokeWidth,
    SetOpacity,
    AlignLeft,
    AlignCenter,
    AlignRight,
    AlignTop,
    AlignMiddle,
    AlignBottom,
    DistributeEven,
    DistributeSpaced,
    BatchTransform,
    Composite,
}

/// Machine-readable description of a command instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandMetadata {
    pub kind: CommandKind,
    pub object_ids: Vec<ObjectId>,
    pub parameters: serde_json::Value,
    pub timestamp_ms: u64,
}

/// Errors thrown synchronously by command execution and undo.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),
    #[error("invalid command parameters: {0}")]
    InvalidParameters(String),
    #[error("command has not been executed")]
    NotExecuted,
    #[error("{operation} requires at least {required} objects, got {actual}")]
    TooFewObjects {
        operation: &'static str,
        required: usize,
        actual: usize,
    },
}

/// A reversible mutation of the object store.
///
/// Lifecycle: `constructed → executed → (undone ⇄ executed)`. `execute`
/// computes and caches whatever before-state `undo` needs; undoing a command
/// that never executed is a [`CommandError::NotExecuted`].
pub trait Command {
    fn execute(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError>;

    fn undo(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError>;

    /// Redo defaults to re-execution.
    fn redo(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        self.execute(store)
    }

    /// Try to absorb `other` into this command (coalescing, e.g. consecutive
    /// relative moves of the same objects). Returns `true` when merged.
    fn merge(&mut self, _other: &dyn Command) -> bool {
        false
    }

    fn description(&self) -> String;

    fn metadata(&self) -> CommandMetadata;

    fn as_any(&self) -> &dyn Any;
}

/// Undo/redo engine: two bounded stacks of executed commands.
pub struct CommandEngine {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    capacity: usize,
}

impl Default for CommandEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandEngine {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_UNDO_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Execute a command and push it onto the undo stack. Any redo history
    /// is invalidated; the oldest entry is evicted past the capacity.
    pub fn execute(
        &mut self,
        mut command: Box<dyn Command>,
        store: &mut CanvasObjectStore,
    ) -> Result<(), CommandError> {
        command.execute(store)?;
        self.redo_stack.clear();

        if let Some(last) = self.undo_stack.last_mut() {
            if last.merge(command.as_ref()) {
                return Ok(());
            }
        }

        self.undo_stack.push(command);
        if self.undo_stack.len() > self.capacity {
            self.undo_stack.remove(0);
        }
        Ok(())
    }

    /// Undo the most recent command. `Ok(false)` when there is nothing to
    /// undo. A command whose undo fails is dropped from the history: its
    /// targets are gone (typically deleted remotely) and it can never
    /// succeed again.
    pub fn undo(&mut self, store: &mut CanvasObjectStore) -> Result<bool, CommandError> {
        let Some(mut command) = self.undo_stack.pop() else {
            return Ok(false);
        };
        command.undo(store)?;
        self.redo_stack.push(command);
        Ok(true)
    }

    /// Redo the most recently undone command. `Ok(false)` when the redo
    /// stack is empty.
    pub fn redo(&mut self, store: &mut CanvasObjectStore) -> Result<bool, CommandError> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        command.redo(store)?;
        self.undo_stack.push(command);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Metadata of the undo history, oldest first. Feeds the history UI.
    pub fn history(&self) -> Vec<CommandMetadata> {
        self.undo_stack.iter().map(|command| command.metadata()).collect()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

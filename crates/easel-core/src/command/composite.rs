//! Composite command: an ordered sequence executed as one history entry.

use std::any::Any;

use serde_json::json;

use crate::store::CanvasObjectStore;
use crate::time;

use super::{Command, CommandError, CommandKind, CommandMetadata};

/// Runs sub-commands in order; undo reverses them back-to-front.
///
/// Execution is all-or-nothing: when a sub-command fails, the ones already
/// executed are rolled back in reverse order and the original error is
/// returned, so the store never holds a half-applied composite.
pub struct CompositeCommand {
    label: String,
    commands: Vec<Box<dyn Command>>,
    executed: bool,
    timestamp_ms: u64,
}

impl CompositeCommand {
    pub fn new(label: impl Into<String>, commands: Vec<Box<dyn Command>>) -> Self {
        Self {
            label: label.into(),
            commands,
            executed: false,
            timestamp_ms: time::now_ms(),
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Command for CompositeCommand {
    fn execute(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        for index in 0..self.commands.len() {
            if let Err(error) = self.commands[index].execute(store) {
                // Roll back what already ran, newest first.
                for done in self.commands[..index].iter_mut().rev() {
                    if let Err(rollback_error) = done.undo(store) {
                        log::warn!(
                            "composite rollback failed for {:?}: {rollback_error}",
                            done.description()
                        );
                    }
                }
                return Err(error);
            }
        }
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        if !self.executed {
            return Err(CommandError::NotExecuted);
        }
        for command in self.commands.iter_mut().rev() {
            command.undo(store)?;
        }
        self.executed = false;
        Ok(())
    }

    fn description(&self) -> String {
        self.label.clone()
    }

    fn metadata(&self) -> CommandMetadata {
        let mut object_ids = Vec::new();
        for command in &self.commands {
            for id in command.metadata().object_ids {
                if !object_ids.contains(&id) {
                    object_ids.push(id);
                }
            }
        }
        let children: Vec<CommandMetadata> =
            self.commands.iter().map(|command| command.metadata()).collect();
        CommandMetadata {
            kind: CommandKind::Composite,
            object_ids,
            parameters: json!({ "label": self.label, "commands": children }),
            timestamp_ms: self.timestamp_ms,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

//! Object creation and deletion commands.

use std::any::Any;

use serde_json::json;

use crate::object::{CanvasObject, ObjectId, ObjectKind};
use crate::store::{CanvasObjectStore, Origin};
use crate::time;

use super::{Command, CommandError, CommandKind, CommandMetadata};

/// Create a single object. The object (including its id) is built from the
/// intent parameters at construction time so redo restores the same id.
pub struct CreateObjectCommand {
    object: CanvasObject,
    executed: bool,
    timestamp_ms: u64,
}

impl CreateObjectCommand {
    pub fn new(object: CanvasObject) -> Self {
        Self {
            object,
            executed: false,
            timestamp_ms: time::now_ms(),
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.object.id
    }
}

impl Command for CreateObjectCommand {
    fn execute(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        store.add(self.object.clone(), Origin::Local);
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        if !self.executed {
            return Err(CommandError::NotExecuted);
        }
        store
            .remove(self.object.id, Origin::Local)
            .ok_or(CommandError::ObjectNotFound(self.object.id))?;
        self.executed = false;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Create {}", self.object.kind())
    }

    fn metadata(&self) -> CommandMetadata {
        let kind = match self.object.kind() {
            ObjectKind::Rectangle => CommandKind::CreateRectangle,
            ObjectKind::Circle => CommandKind::CreateCircle,
            ObjectKind::Text => CommandKind::CreateText,
        };
        CommandMetadata {
            kind,
            object_ids: vec![self.object.id],
            parameters: json!({
                "x": self.object.x,
                "y": self.object.y,
                "width": self.object.width,
                "height": self.object.height,
                "fill": self.object.fill,
            }),
            timestamp_ms: self.timestamp_ms,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Delete one or more objects, caching them for undo.
pub struct DeleteObjectsCommand {
    ids: Vec<ObjectId>,
    removed: Vec<CanvasObject>,
    executed: bool,
    timestamp_ms: u64,
}

impl DeleteObjectsCommand {
    pub fn new(ids: Vec<ObjectId>) -> Self {
        Self {
            ids,
            removed: Vec::new(),
            executed: false,
            timestamp_ms: time::now_ms(),
        }
    }
}

impl Command for DeleteObjectsCommand {
    fn execute(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        for id in &self.ids {
            if !store.contains(*id) {
                return Err(CommandError::ObjectNotFound(*id));
            }
        }
        self.removed = store.remove_many(&self.ids, Origin::Local);
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        if !self.executed {
            return Err(CommandError::NotExecuted);
        }
        for object in self.removed.drain(..) {
            store.add(object, Origin::Local);
        }
        self.executed = false;
        Ok(())
    }

    fn description(&self) -> String {
        if self.ids.len() == 1 {
            "Delete object".to_string()
        } else {
            format!("Delete {} objects", self.ids.len())
        }
    }

    fn metadata(&self) -> CommandMetadata {
        CommandMetadata {
            kind: CommandKind::DeleteObjects,
            object_ids: self.ids.clone(),
            parameters: json!({ "count": self.ids.len() }),
            timestamp_ms: self.timestamp_ms,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

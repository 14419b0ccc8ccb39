//! Appearance commands.

use std::any::Any;

use serde_json::json;

use crate::object::{CanvasObject, Color, ObjectId, ObjectPatch};
use crate::store::{CanvasObjectStore, Origin};
use crate::time;

use super::{Command, CommandError, CommandKind, CommandMetadata};

/// One appearance property change, applied to every target.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleChange {
    Fill(Color),
    Stroke(Option<Color>),
    StrokeWidth(Option<f64>),
    Opacity(f64),
}

impl StyleChange {
    fn validate(&self) -> Result<(), CommandError> {
        match self {
            StyleChange::Opacity(opacity) => {
                if !(0.0..=1.0).contains(opacity) {
                    return Err(CommandError::InvalidParameters(
                        "opacity must be within [0, 1]".to_string(),
                    ));
                }
            }
            StyleChange::StrokeWidth(Some(width)) if *width < 0.0 => {
                return Err(CommandError::InvalidParameters(
                    "stroke width must be non-negative".to_string(),
                ));
            }
            _ => {}
        }
        Ok(())
    }

    fn as_patch(&self) -> ObjectPatch {
        match self {
            StyleChange::Fill(color) => ObjectPatch {
                fill: Some(*color),
                ..ObjectPatch::default()
            },
            StyleChange::Stroke(stroke) => ObjectPatch {
                stroke: Some(*stroke),
                ..ObjectPatch::default()
            },
            StyleChange::StrokeWidth(width) => ObjectPatch {
                stroke_width: Some(*width),
                ..ObjectPatch::default()
            },
            StyleChange::Opacity(opacity) => ObjectPatch {
                opacity: Some(*opacity),
                ..ObjectPatch::default()
            },
        }
    }

    fn kind(&self) -> CommandKind {
        match self {
            StyleChange::Fill(_) => CommandKind::SetFill,
            StyleChange::Stroke(_) => CommandKind::SetStroke,
            StyleChange::StrokeWidth(_) => CommandKind::SetStrokeWidth,
            StyleChange::Opacity(_) => CommandKind::SetOpacity,
        }
    }
}

/// Change fill, stroke, stroke width or opacity on one or more objects.
pub struct StyleCommand {
    ids: Vec<ObjectId>,
    change: StyleChange,
    before: Vec<CanvasObject>,
    executed: bool,
    timestamp_ms: u64,
}

impl StyleCommand {
    pub fn new(ids: Vec<ObjectId>, change: StyleChange) -> Self {
        Self {
            ids,
            change,
            before: Vec::new(),
            executed: false,
            timestamp_ms: time::now_ms(),
        }
    }
}

impl Command for StyleCommand {
    fn execute(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        self.change.validate()?;
        self.before = self
            .ids
            .iter()
            .map(|id| {
                store
                    .get(*id)
                    .cloned()
                    .ok_or(CommandError::ObjectNotFound(*id))
            })
            .collect::<Result<_, _>>()?;
        let patch = self.change.as_patch();
        let now = time::now_ms();
        for id in &self.ids {
            store.update(*id, &patch, Origin::Local, now);
        }
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        if !self.executed {
            return Err(CommandError::NotExecuted);
        }
        for object in &self.before {
            store.add(object.clone(), Origin::Local);
        }
        self.executed = false;
        Ok(())
    }

    fn description(&self) -> String {
        match &self.change {
            StyleChange::Fill(_) => "Set fill".to_string(),
            StyleChange::Stroke(_) => "Set stroke".to_string(),
            StyleChange::StrokeWidth(_) => "Set stroke width".to_string(),
            StyleChange::Opacity(_) => "Set opacity".to_string(),
        }
    }

    fn metadata(&self) -> CommandMetadata {
        let parameters = match &self.change {
            StyleChange::Fill(color) => json!({ "fill": color }),
            StyleChange::Stroke(stroke) => json!({ "stroke": stroke }),
            StyleChange::StrokeWidth(width) => json!({ "stroke_width": width }),
            StyleChange::Opacity(opacity) => json!({ "opacity": opacity }),
        };
        CommandMetadata {
            kind: self.change.kind(),
            object_ids: self.ids.clone(),
            parameters,
            timestamp_ms: self.timestamp_ms,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

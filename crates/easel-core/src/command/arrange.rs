//! Multi-object arrangement commands: align and distribute.

use std::any::Any;

use kurbo::Rect;
use serde_json::json;

use crate::object::{CanvasObject, ObjectId, ObjectPatch};
use crate::store::{CanvasObjectStore, Origin};
use crate::time;

use super::{Command, CommandError, CommandKind, CommandMetadata};

fn union_bounds(objects: &[CanvasObject]) -> Rect {
    objects
        .iter()
        .map(CanvasObject::bounds)
        .reduce(|acc, bounds| acc.union(bounds))
        .unwrap_or(Rect::ZERO)
}

/// Alignment edge or axis, anchored on the union of the targets' bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Top,
    Middle,
    Bottom,
}

impl Alignment {
    fn kind(&self) -> CommandKind {
        match self {
            Alignment::Left => CommandKind::AlignLeft,
            Alignment::Center => CommandKind::AlignCenter,
            Alignment::Right => CommandKind::AlignRight,
            Alignment::Top => CommandKind::AlignTop,
            Alignment::Middle => CommandKind::AlignMiddle,
            Alignment::Bottom => CommandKind::AlignBottom,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Top => "top",
            Alignment::Middle => "middle",
            Alignment::Bottom => "bottom",
        }
    }

    /// New center position for `object` against the union `anchor` box.
    fn target_center(&self, object: &CanvasObject, anchor: Rect) -> (f64, f64) {
        match self {
            Alignment::Left => (anchor.x0 + object.width / 2.0, object.y),
            Alignment::Center => (anchor.center().x, object.y),
            Alignment::Right => (anchor.x1 - object.width / 2.0, object.y),
            Alignment::Top => (object.x, anchor.y0 + object.height / 2.0),
            Alignment::Middle => (object.x, anchor.center().y),
            Alignment::Bottom => (object.x, anchor.y1 - object.height / 2.0),
        }
    }
}

/// Align two or more objects along an edge or axis of their union box.
pub struct AlignCommand {
    ids: Vec<ObjectId>,
    alignment: Alignment,
    before: Vec<CanvasObject>,
    executed: bool,
    timestamp_ms: u64,
}

impl AlignCommand {
    pub fn new(ids: Vec<ObjectId>, alignment: Alignment) -> Self {
        Self {
            ids,
            alignment,
            before: Vec::new(),
            executed: false,
            timestamp_ms: time::now_ms(),
        }
    }
}

impl Command for AlignCommand {
    fn execute(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        if self.ids.len() < 2 {
            return Err(CommandError::TooFewObjects {
                operation: "align",
                required: 2,
                actual: self.ids.len(),
            });
        }
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

        let anchor = union_bounds(&self.before);
        let now = time::now_ms();
        for object in &self.before {
            let (x, y) = self.alignment.target_center(object, anchor);
            store.update(object.id, &ObjectPatch::position(x, y), Origin::Local, now);
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
        format!("Align {}", self.alignment.name())
    }

    fn metadata(&self) -> CommandMetadata {
        CommandMetadata {
            kind: self.alignment.kind(),
            object_ids: self.ids.clone(),
            parameters: json!({ "alignment": self.alignment.name() }),
            timestamp_ms: self.timestamp_ms,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Axis along which objects are distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributeAxis {
    Horizontal,
    Vertical,
}

impl DistributeAxis {
    fn name(&self) -> &'static str {
        match self {
            DistributeAxis::Horizontal => "horizontal",
            DistributeAxis::Vertical => "vertical",
        }
    }
}

/// Spacing strategy for distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistributeMode {
    /// Centers spaced evenly between the first and last object, which stay
    /// where they are.
    Even,
    /// Fixed gap between consecutive bounding boxes, walking from the first
    /// object.
    Spaced(f64),
}

/// Distribute three or more objects along an axis.
pub struct DistributeCommand {
    ids: Vec<ObjectId>,
    axis: DistributeAxis,
    mode: DistributeMode,
    before: Vec<CanvasObject>,
    executed: bool,
    timestamp_ms: u64,
}

impl DistributeCommand {
    pub fn new(ids: Vec<ObjectId>, axis: DistributeAxis, mode: DistributeMode) -> Self {
        Self {
            ids,
            axis,
            mode,
            before: Vec::new(),
            executed: false,
            timestamp_ms: time::now_ms(),
        }
    }

    fn center_of(&self, object: &CanvasObject) -> f64 {
        match self.axis {
            DistributeAxis::Horizontal => object.x,
            DistributeAxis::Vertical => object.y,
        }
    }

    fn extent_of(&self, object: &CanvasObject) -> f64 {
        match self.axis {
            DistributeAxis::Horizontal => object.width,
            DistributeAxis::Vertical => object.height,
        }
    }

    fn position_patch(&self, object: &CanvasObject, center: f64) -> ObjectPatch {
        match self.axis {
            DistributeAxis::Horizontal => ObjectPatch::position(center, object.y),
            DistributeAxis::Vertical => ObjectPatch::position(object.x, center),
        }
    }
}

impl Command for DistributeCommand {
    fn execute(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        if self.ids.len() < 3 {
            return Err(CommandError::TooFewObjects {
                operation: "distribute",
                required: 3,
                actual: self.ids.len(),
            });
        }
        if let DistributeMode::Spaced(gap) = self.mode {
            if gap < 0.0 || !gap.is_finite() {
                return Err(CommandError::InvalidParameters(
                    "distribution spacing must be non-negative".to_string(),
                ));
            }
        }
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

        // Work on the targets sorted along the distribution axis.
        let mut sorted: Vec<&CanvasObject> = self.before.iter().collect();
        sorted.sort_by(|a, b| self.center_of(a).total_cmp(&self.center_of(b)));

        let now = time::now_ms();
        match self.mode {
            DistributeMode::Even => {
                let first = self.center_of(sorted[0]);
                let last = self.center_of(sorted[sorted.len() - 1]);
                let step = (last - first) / (sorted.len() - 1) as f64;
                // Endpoints hold their positions; only the middle moves.
                for (index, object) in sorted.iter().enumerate().skip(1) {
                    if index == sorted.len() - 1 {
                        break;
                    }
                    let center = first + step * index as f64;
                    store.update(
                        object.id,
                        &self.position_patch(object, center),
                        Origin::Local,
                        now,
                    );
                }
            }
            DistributeMode::Spaced(gap) => {
                let mut cursor = self.center_of(sorted[0]) + self.extent_of(sorted[0]) / 2.0;
                for object in sorted.iter().skip(1) {
                    let half = self.extent_of(object) / 2.0;
                    let center = cursor + gap + half;
                    store.update(
                        object.id,
                        &self.position_patch(object, center),
                        Origin::Local,
                        now,
                    );
                    cursor = center + half;
                }
            }
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
        format!("Distribute {}", self.axis.name())
    }

    fn metadata(&self) -> CommandMetadata {
        let (kind, parameters) = match self.mode {
            DistributeMode::Even => (
                CommandKind::DistributeEven,
                json!({ "axis": self.axis.name() }),
            ),
            DistributeMode::Spaced(gap) => (
                CommandKind::DistributeSpaced,
                json!({ "axis": self.axis.name(), "spacing": gap }),
            ),
        };
        CommandMetadata {
            kind,
            object_ids: self.ids.clone(),
            parameters,
            timestamp_ms: self.timestamp_ms,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

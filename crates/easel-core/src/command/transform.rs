//! Geometry commands: move, resize, rotate, batch transform.

use std::any::Any;

use kurbo::Vec2;
use serde_json::json;

use crate::object::{CanvasObject, CircleProps, ObjectId, ObjectPatch, TypeProperties};
use crate::store::{CanvasObjectStore, Origin};
use crate::time;

use super::{Command, CommandError, CommandKind, CommandMetadata};

fn cache_targets(
    ids: &[ObjectId],
    store: &CanvasObjectStore,
) -> Result<Vec<CanvasObject>, CommandError> {
    ids.iter()
        .map(|id| {
            store
                .get(*id)
                .cloned()
                .ok_or(CommandError::ObjectNotFound(*id))
        })
        .collect()
}

fn restore_targets(before: &[CanvasObject], store: &mut CanvasObjectStore) {
    for object in before {
        store.add(object.clone(), Origin::Local);
    }
}

/// How a move positions its targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveMode {
    Absolute { x: f64, y: f64 },
    Relative { delta: Vec2 },
}

/// Move one or more objects, absolutely or by a delta.
pub struct MoveCommand {
    ids: Vec<ObjectId>,
    mode: MoveMode,
    before: Vec<CanvasObject>,
    executed: bool,
    timestamp_ms: u64,
}

impl MoveCommand {
    pub fn absolute(ids: Vec<ObjectId>, x: f64, y: f64) -> Self {
        Self::new(ids, MoveMode::Absolute { x, y })
    }

    pub fn relative(ids: Vec<ObjectId>, delta: Vec2) -> Self {
        Self::new(ids, MoveMode::Relative { delta })
    }

    fn new(ids: Vec<ObjectId>, mode: MoveMode) -> Self {
        Self {
            ids,
            mode,
            before: Vec::new(),
            executed: false,
            timestamp_ms: time::now_ms(),
        }
    }
}

impl Command for MoveCommand {
    fn execute(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        self.before = cache_targets(&self.ids, store)?;
        let now = time::now_ms();
        for object in &self.before {
            let patch = match self.mode {
                MoveMode::Absolute { x, y } => ObjectPatch::position(x, y),
                MoveMode::Relative { delta } => {
                    ObjectPatch::position(object.x + delta.x, object.y + delta.y)
                }
            };
            store.update(object.id, &patch, Origin::Local, now);
        }
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        if !self.executed {
            return Err(CommandError::NotExecuted);
        }
        restore_targets(&self.before, store);
        self.executed = false;
        Ok(())
    }

    fn merge(&mut self, other: &dyn Command) -> bool {
        let Some(other) = other.as_any().downcast_ref::<MoveCommand>() else {
            return false;
        };
        let (MoveMode::Relative { delta }, MoveMode::Relative { delta: other_delta }) =
            (&mut self.mode, &other.mode)
        else {
            return false;
        };
        if self.ids != other.ids || !self.executed {
            return false;
        }
        // The accumulated delta keeps undo anchored at the original state.
        *delta += *other_delta;
        true
    }

    fn description(&self) -> String {
        match self.mode {
            MoveMode::Absolute { .. } => "Move to position".to_string(),
            MoveMode::Relative { .. } => "Move".to_string(),
        }
    }

    fn metadata(&self) -> CommandMetadata {
        let (kind, parameters) = match self.mode {
            MoveMode::Absolute { x, y } => (CommandKind::MoveAbsolute, json!({ "x": x, "y": y })),
            MoveMode::Relative { delta } => (
                CommandKind::MoveRelative,
                json!({ "dx": delta.x, "dy": delta.y }),
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

/// How a resize determines the new dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeMode {
    Absolute { width: f64, height: f64 },
    Scale { factor: f64 },
    /// Exactly one of `width`/`height`; the other follows the object's
    /// aspect ratio.
    Aspect { width: Option<f64>, height: Option<f64> },
}

impl ResizeMode {
    fn validate(&self) -> Result<(), CommandError> {
        match self {
            ResizeMode::Absolute { width, height } => {
                if *width < 0.0 || *height < 0.0 {
                    return Err(CommandError::InvalidParameters(
                        "resize dimensions must be non-negative".to_string(),
                    ));
                }
            }
            ResizeMode::Scale { factor } => {
                if *factor <= 0.0 || !factor.is_finite() {
                    return Err(CommandError::InvalidParameters(
                        "scale factor must be positive".to_string(),
                    ));
                }
            }
            ResizeMode::Aspect { width, height } => match (width, height) {
                (Some(value), None) | (None, Some(value)) => {
                    if *value < 0.0 {
                        return Err(CommandError::InvalidParameters(
                            "resize dimensions must be non-negative".to_string(),
                        ));
                    }
                }
                (None, None) => {
                    return Err(CommandError::InvalidParameters(
                        "resize requires a width, a height, or a scale factor".to_string(),
                    ));
                }
                (Some(_), Some(_)) => {
                    return Err(CommandError::InvalidParameters(
                        "aspect resize takes exactly one dimension".to_string(),
                    ));
                }
            },
        }
        Ok(())
    }

    fn target_size(&self, object: &CanvasObject) -> (f64, f64) {
        match self {
            ResizeMode::Absolute { width, height } => (*width, *height),
            ResizeMode::Scale { factor } => (object.width * factor, object.height * factor),
            ResizeMode::Aspect { width: Some(width), .. } => {
                if object.width > 0.0 {
                    (*width, width * object.height / object.width)
                } else {
                    (*width, object.height)
                }
            }
            ResizeMode::Aspect { height: Some(height), .. } => {
                if object.height > 0.0 {
                    (height * object.width / object.height, *height)
                } else {
                    (object.width, *height)
                }
            }
            // Ruled out by validate().
            ResizeMode::Aspect { .. } => (object.width, object.height),
        }
    }
}

/// Resize one or more objects around their centers.
pub struct ResizeCommand {
    ids: Vec<ObjectId>,
    mode: ResizeMode,
    before: Vec<CanvasObject>,
    executed: bool,
    timestamp_ms: u64,
}

impl ResizeCommand {
    pub fn new(ids: Vec<ObjectId>, mode: ResizeMode) -> Self {
        Self {
            ids,
            mode,
            before: Vec::new(),
            executed: false,
            timestamp_ms: time::now_ms(),
        }
    }
}

impl Command for ResizeCommand {
    fn execute(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        self.mode.validate()?;
        self.before = cache_targets(&self.ids, store)?;
        let now = time::now_ms();
        for object in &self.before {
            let (width, height) = self.mode.target_size(object);
            // Circles stay uniform: the radius is the source of truth.
            let patch = if let TypeProperties::Circle(_) = object.props {
                ObjectPatch {
                    props: Some(TypeProperties::Circle(CircleProps {
                        radius: width.min(height) / 2.0,
                    })),
                    ..ObjectPatch::default()
                }
            } else {
                ObjectPatch::size(width, height)
            };
            store.update(object.id, &patch, Origin::Local, now);
        }
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        if !self.executed {
            return Err(CommandError::NotExecuted);
        }
        restore_targets(&self.before, store);
        self.executed = false;
        Ok(())
    }

    fn description(&self) -> String {
        "Resize".to_string()
    }

    fn metadata(&self) -> CommandMetadata {
        let (kind, parameters) = match self.mode {
            ResizeMode::Absolute { width, height } => (
                CommandKind::ResizeAbsolute,
                json!({ "width": width, "height": height }),
            ),
            ResizeMode::Scale { factor } => (CommandKind::ResizeScale, json!({ "factor": factor })),
            ResizeMode::Aspect { width, height } => (
                CommandKind::ResizeAspect,
                json!({ "width": width, "height": height }),
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

/// How a rotation determines the new angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotateMode {
    Absolute { degrees: f64 },
    Relative { degrees: f64 },
}

/// Rotate one or more objects; the stored angle is always normalized to
/// `[0, 360)`.
pub struct RotateCommand {
    ids: Vec<ObjectId>,
    mode: RotateMode,
    before: Vec<CanvasObject>,
    executed: bool,
    timestamp_ms: u64,
}

impl RotateCommand {
    pub fn absolute(ids: Vec<ObjectId>, degrees: f64) -> Self {
        Self::new(ids, RotateMode::Absolute { degrees })
    }

    pub fn relative(ids: Vec<ObjectId>, degrees: f64) -> Self {
        Self::new(ids, RotateMode::Relative { degrees })
    }

    fn new(ids: Vec<ObjectId>, mode: RotateMode) -> Self {
        Self {
            ids,
            mode,
            before: Vec::new(),
            executed: false,
            timestamp_ms: time::now_ms(),
        }
    }
}

impl Command for RotateCommand {
    fn execute(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        self.before = cache_targets(&self.ids, store)?;
        let now = time::now_ms();
        for object in &self.before {
            let degrees = match self.mode {
                RotateMode::Absolute { degrees } => degrees,
                RotateMode::Relative { degrees } => object.rotation + degrees,
            };
            store.update(object.id, &ObjectPatch::rotation(degrees), Origin::Local, now);
        }
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        if !self.executed {
            return Err(CommandError::NotExecuted);
        }
        restore_targets(&self.before, store);
        self.executed = false;
        Ok(())
    }

    fn description(&self) -> String {
        "Rotate".to_string()
    }

    fn metadata(&self) -> CommandMetadata {
        let (kind, parameters) = match self.mode {
            RotateMode::Absolute { degrees } => {
                (CommandKind::RotateAbsolute, json!({ "degrees": degrees }))
            }
            RotateMode::Relative { degrees } => {
                (CommandKind::RotateRelative, json!({ "degrees": degrees }))
            }
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

/// One combined update across many objects, so a multi-object drag produces
/// a single mutation instead of N.
pub struct BatchTransformCommand {
    updates: Vec<(ObjectId, ObjectPatch)>,
    before: Vec<CanvasObject>,
    executed: bool,
    timestamp_ms: u64,
}

impl BatchTransformCommand {
    pub fn new(updates: Vec<(ObjectId, ObjectPatch)>) -> Self {
        Self {
            updates,
            before: Vec::new(),
            executed: false,
            timestamp_ms: time::now_ms(),
        }
    }
}

impl Command for BatchTransformCommand {
    fn execute(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        let ids: Vec<ObjectId> = self.updates.iter().map(|(id, _)| *id).collect();
        self.before = cache_targets(&ids, store)?;
        store.update_many(&self.updates, Origin::Local, time::now_ms());
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, store: &mut CanvasObjectStore) -> Result<(), CommandError> {
        if !self.executed {
            return Err(CommandError::NotExecuted);
        }
        restore_targets(&self.before, store);
        self.executed = false;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Transform {} objects", self.updates.len())
    }

    fn metadata(&self) -> CommandMetadata {
        CommandMetadata {
            kind: CommandKind::BatchTransform,
            object_ids: self.updates.iter().map(|(id, _)| *id).collect(),
            parameters: json!({ "count": self.updates.len() }),
            timestamp_ms: self.timestamp_ms,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::RectangleProps;

    fn rectangle(x: f64, y: f64, w: f64, h: f64) -> CanvasObject {
        CanvasObject::new(
            x,
            y,
            w,
            h,
            TypeProperties::Rectangle(RectangleProps { corner_radius: 0.0 }),
            "tester",
            1_000,
        )
    }

    fn circle(x: f64, y: f64, radius: f64) -> CanvasObject {
        CanvasObject::new(
            x,
            y,
            radius * 2.0,
            radius * 2.0,
            TypeProperties::Circle(CircleProps { radius }),
            "tester",
            1_000,
        )
    }

    fn seeded(objects: &[CanvasObject]) -> CanvasObjectStore {
        let mut store = CanvasObjectStore::new();
        for object in objects {
            store.add(object.clone(), Origin::Local);
        }
        store.take_events();
        store
    }

    #[test]
    fn test_relative_move_then_undo() {
        let object = rectangle(10.0, 10.0, 50.0, 50.0);
        let id = object.id;
        let mut store = seeded(std::slice::from_ref(&object));

        let mut command = MoveCommand::relative(vec![id], Vec2::new(5.0, -5.0));
        command.execute(&mut store).unwrap();
        assert!((store.get(id).unwrap().x - 15.0).abs() < f64::EPSILON);
        assert!((store.get(id).unwrap().y - 5.0).abs() < f64::EPSILON);

        command.undo(&mut store).unwrap();
        assert_eq!(store.get(id).unwrap().x, object.x);
        assert_eq!(store.get(id).unwrap().y, object.y);
    }

    #[test]
    fn test_move_missing_object() {
        let mut store = CanvasObjectStore::new();
        let mut command = MoveCommand::absolute(vec![uuid::Uuid::new_v4()], 0.0, 0.0);
        assert!(matches!(
            command.execute(&mut store),
            Err(CommandError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn test_resize_scale_factor() {
        let object = rectangle(0.0, 0.0, 100.0, 40.0);
        let id = object.id;
        let mut store = seeded(&[object]);

        let mut command = ResizeCommand::new(vec![id], ResizeMode::Scale { factor: 2.0 });
        command.execute(&mut store).unwrap();
        let resized = store.get(id).unwrap();
        assert!((resized.width - 200.0).abs() < f64::EPSILON);
        assert!((resized.height - 80.0).abs() < f64::EPSILON);

        command.undo(&mut store).unwrap();
        let restored = store.get(id).unwrap();
        assert!((restored.width - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resize_aspect_preserving() {
        let object = rectangle(0.0, 0.0, 100.0, 40.0);
        let id = object.id;
        let mut store = seeded(&[object]);

        let mut command = ResizeCommand::new(
            vec![id],
            ResizeMode::Aspect {
                width: Some(50.0),
                height: None,
            },
        );
        command.execute(&mut store).unwrap();
        let resized = store.get(id).unwrap();
        assert!((resized.width - 50.0).abs() < f64::EPSILON);
        assert!((resized.height - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resize_without_dimensions_is_invalid() {
        let object = rectangle(0.0, 0.0, 10.0, 10.0);
        let id = object.id;
        let mut store = seeded(&[object]);

        let mut command = ResizeCommand::new(
            vec![id],
            ResizeMode::Aspect {
                width: None,
                height: None,
            },
        );
        assert!(matches!(
            command.execute(&mut store),
            Err(CommandError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_resize_circle_keeps_uniform_size() {
        let object = circle(0.0, 0.0, 10.0);
        let id = object.id;
        let mut store = seeded(&[object]);

        let mut command = ResizeCommand::new(
            vec![id],
            ResizeMode::Absolute {
                width: 60.0,
                height: 80.0,
            },
        );
        command.execute(&mut store).unwrap();
        let resized = store.get(id).unwrap();
        assert!((resized.width - 60.0).abs() < f64::EPSILON);
        assert!((resized.height - 60.0).abs() < f64::EPSILON);
        match &resized.props {
            TypeProperties::Circle(props) => assert!((props.radius - 30.0).abs() < f64::EPSILON),
            other => panic!("unexpected props: {other:?}"),
        }
    }

    #[test]
    fn test_rotate_normalizes() {
        let object = rectangle(0.0, 0.0, 10.0, 10.0);
        let id = object.id;
        let mut store = seeded(&[object]);

        let mut command = RotateCommand::relative(vec![id], -90.0);
        command.execute(&mut store).unwrap();
        assert!((store.get(id).unwrap().rotation - 270.0).abs() < f64::EPSILON);

        let mut absolute = RotateCommand::absolute(vec![id], 725.0);
        absolute.execute(&mut store).unwrap();
        assert!((store.get(id).unwrap().rotation - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_batch_transform_roundtrip() {
        let a = rectangle(0.0, 0.0, 10.0, 10.0);
        let b = rectangle(50.0, 0.0, 10.0, 10.0);
        let (id_a, id_b) = (a.id, b.id);
        let mut store = seeded(&[a, b]);

        let mut command = BatchTransformCommand::new(vec![
            (id_a, ObjectPatch::position(1.0, 1.0)),
            (id_b, ObjectPatch::rotation(45.0)),
        ]);
        command.execute(&mut store).unwrap();
        assert!((store.get(id_a).unwrap().x - 1.0).abs() < f64::EPSILON);
        assert!((store.get(id_b).unwrap().rotation - 45.0).abs() < f64::EPSILON);

        command.undo(&mut store).unwrap();
        assert!((store.get(id_a).unwrap().x).abs() < f64::EPSILON);
        assert!((store.get(id_b).unwrap().rotation).abs() < f64::EPSILON);
    }
}

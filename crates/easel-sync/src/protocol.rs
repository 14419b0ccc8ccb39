//! Wire protocol for the remote change feed.
//!
//! The durable store pushes row-level events whose `row` mirrors
//! [`CanvasObject`] in primitive, non-discriminated form plus a `type`
//! string. Decoding dispatches on that string; an unknown type is a hard
//! [`DecodeError`], never a silent drop; the caller decides what to do
//! with the failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use easel_core::object::{
    CanvasObject, CircleProps, Color, ColorParseError, RectangleProps, TextProps, TypeProperties,
};

// Object type discriminators on the wire.
pub const TYPE_RECTANGLE: &str = "rectangle";
pub const TYPE_CIRCLE: &str = "circle";
pub const TYPE_TEXT: &str = "text";

/// Row-level event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Primitive mirror of [`CanvasObject`] as stored remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRow {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub fill: String,
    pub stroke: Option<String>,
    pub stroke_width: Option<f64>,
    pub opacity: f64,
    pub z_index: i64,
    pub group_id: Option<String>,
    pub type_properties: Value,
    pub locked_by: Option<String>,
    pub lock_acquired_at: Option<u64>,
    pub created_by: String,
    pub created_at: u64,
    pub updated_at: u64,
}

/// One push event from the remote change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChange {
    pub event: ChangeKind,
    pub row: ObjectRow,
}

impl RowChange {
    pub fn insert(object: &CanvasObject) -> Self {
        Self {
            event: ChangeKind::Insert,
            row: encode_object(object),
        }
    }

    pub fn update(object: &CanvasObject) -> Self {
        Self {
            event: ChangeKind::Update,
            row: encode_object(object),
        }
    }

    pub fn delete(object: &CanvasObject) -> Self {
        Self {
            event: ChangeKind::Delete,
            row: encode_object(object),
        }
    }
}

/// Errors turning a wire row into a [`CanvasObject`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown object type: {0:?}")]
    UnknownType(String),
    #[error("invalid object id: {0:?}")]
    InvalidId(String),
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: &'static str,
        source: serde_json::Error,
    },
    #[error(transparent)]
    InvalidColor(#[from] ColorParseError),
}

/// Decode a wire row, dispatching on its `type` discriminator.
pub fn decode_row(row: &ObjectRow) -> Result<CanvasObject, DecodeError> {
    let id = Uuid::parse_str(&row.id).map_err(|_| DecodeError::InvalidId(row.id.clone()))?;

    let props = match row.kind.as_str() {
        TYPE_RECTANGLE => {
            let payload: RectangleProps = serde_json::from_value(row.type_properties.clone())
                .map_err(|source| DecodeError::InvalidPayload {
                    kind: TYPE_RECTANGLE,
                    source,
                })?;
            TypeProperties::Rectangle(payload)
        }
        TYPE_CIRCLE => {
            let payload: CircleProps = serde_json::from_value(row.type_properties.clone())
                .map_err(|source| DecodeError::InvalidPayload {
                    kind: TYPE_CIRCLE,
                    source,
                })?;
            TypeProperties::Circle(payload)
        }
        TYPE_TEXT => {
            let payload: TextProps = serde_json::from_value(row.type_properties.clone())
                .map_err(|source| DecodeError::InvalidPayload {
                    kind: TYPE_TEXT,
                    source,
                })?;
            TypeProperties::Text(payload)
        }
        other => return Err(DecodeError::UnknownType(other.to_string())),
    };

    let fill = Color::from_hex(&row.fill)?;
    let stroke = row
        .stroke
        .as_deref()
        .map(Color::from_hex)
        .transpose()?;

    let mut object = CanvasObject {
        id,
        x: row.x,
        y: row.y,
        width: row.width,
        height: row.height,
        rotation: row.rotation,
        fill,
        stroke,
        stroke_width: row.stroke_width,
        opacity: row.opacity,
        z_index: row.z_index,
        group_id: row.group_id.clone(),
        props,
        locked_by: row.locked_by.clone(),
        lock_acquired_at: row.lock_acquired_at,
        created_by: row.created_by.clone(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    };
    object.normalize();
    Ok(object)
}

/// Encode an object into its primitive wire form.
pub fn encode_object(object: &CanvasObject) -> ObjectRow {
    let type_properties = match &object.props {
        TypeProperties::Rectangle(payload) => serde_json::to_value(payload),
        TypeProperties::Circle(payload) => serde_json::to_value(payload),
        TypeProperties::Text(payload) => serde_json::to_value(payload),
    }
    .unwrap_or(Value::Null);

    ObjectRow {
        id: object.id.to_string(),
        kind: object.kind().as_str().to_string(),
        x: object.x,
        y: object.y,
        width: object.width,
        height: object.height,
        rotation: object.rotation,
        fill: object.fill.to_hex(),
        stroke: object.stroke.map(|color| color.to_hex()),
        stroke_width: object.stroke_width,
        opacity: object.opacity,
        z_index: object.z_index,
        group_id: object.group_id.clone(),
        type_properties,
        locked_by: object.locked_by.clone(),
        lock_acquired_at: object.lock_acquired_at,
        created_by: object.created_by.clone(),
        created_at: object.created_at,
        updated_at: object.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_core::object::{FontFamily, FontWeight, TextAlign};

    fn sample(props: TypeProperties) -> CanvasObject {
        let mut object = CanvasObject::new(10.0, -20.0, 100.0, 60.0, props, "alice", 1_234);
        object.stroke = Some(Color::opaque(1, 2, 3));
        object.stroke_width = Some(2.5);
        object.opacity = 0.75;
        object.z_index = 7;
        object.rotation = 45.0;
        object.locked_by = Some("bob".to_string());
        object.lock_acquired_at = Some(999);
        object
    }

    #[test]
    fn test_roundtrip_rectangle() {
        let object = sample(TypeProperties::Rectangle(RectangleProps { corner_radius: 4.0 }));
        let decoded = decode_row(&encode_object(&object)).unwrap();
        assert_eq!(decoded, object);
    }

    #[test]
    fn test_roundtrip_circle() {
        let object = sample(TypeProperties::Circle(CircleProps { radius: 30.0 }));
        let decoded = decode_row(&encode_object(&object)).unwrap();
        assert_eq!(decoded, object);
        assert!((decoded.width - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_roundtrip_text() {
        let object = sample(TypeProperties::Text(TextProps {
            text_content: "hello".to_string(),
            font_size: 18.0,
            font_family: FontFamily::Mono,
            font_weight: FontWeight::Bold,
            text_align: TextAlign::Center,
        }));
        let decoded = decode_row(&encode_object(&object)).unwrap();
        assert_eq!(decoded, object);
    }

    #[test]
    fn test_unknown_type_is_hard_error() {
        let mut row = encode_object(&sample(TypeProperties::Rectangle(RectangleProps {
            corner_radius: 0.0,
        })));
        row.kind = "triangle".to_string();
        assert!(matches!(
            decode_row(&row),
            Err(DecodeError::UnknownType(kind)) if kind == "triangle"
        ));
    }

    #[test]
    fn test_bad_id_rejected() {
        let mut row = encode_object(&sample(TypeProperties::Rectangle(RectangleProps {
            corner_radius: 0.0,
        })));
        row.id = "not-a-uuid".to_string();
        assert!(matches!(decode_row(&row), Err(DecodeError::InvalidId(_))));
    }

    #[test]
    fn test_bad_payload_rejected() {
        let mut row = encode_object(&sample(TypeProperties::Circle(CircleProps { radius: 1.0 })));
        row.type_properties = serde_json::json!({ "corner_radius": 1.0 });
        assert!(matches!(
            decode_row(&row),
            Err(DecodeError::InvalidPayload { kind: TYPE_CIRCLE, .. })
        ));
    }

    #[test]
    fn test_bad_color_rejected() {
        let mut row = encode_object(&sample(TypeProperties::Rectangle(RectangleProps {
            corner_radius: 0.0,
        })));
        row.fill = "red".to_string();
        assert!(matches!(decode_row(&row), Err(DecodeError::InvalidColor(_))));
    }

    #[test]
    fn test_decode_normalizes_rotation() {
        let mut row = encode_object(&sample(TypeProperties::Rectangle(RectangleProps {
            corner_radius: 0.0,
        })));
        row.rotation = -90.0;
        let decoded = decode_row(&row).unwrap();
        assert!((decoded.rotation - 270.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_change_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&ChangeKind::Insert).unwrap(),
            "\"INSERT\""
        );
        assert_eq!(
            serde_json::to_string(&ChangeKind::Delete).unwrap(),
            "\"DELETE\""
        );
    }
}

//! Canvas object model.
//!
//! A [`CanvasObject`] is the unit of the shared document: common geometry,
//! appearance, ordering and audit fields, plus a per-type payload in
//! [`TypeProperties`]. Positions are centers in the logical coordinate space
//! (see [`crate::coords`]); rotation is stored in degrees, normalized to
//! `[0, 360)`.

use kurbo::{Point, Rect};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::coords;

/// Unique identifier for canvas objects.
pub type ObjectId = Uuid;

/// Error parsing a color literal.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid color literal: {0:?}")]
pub struct ColorParseError(pub String);

/// RGBA color, serialized as a `#rrggbb` / `#rrggbbaa` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn black() -> Self {
        Self::opaque(0, 0, 0)
    }

    pub fn white() -> Self {
        Self::opaque(255, 255, 255)
    }

    /// Parse a `#rgb`, `#rrggbb` or `#rrggbbaa` hex literal.
    pub fn from_hex(input: &str) -> Result<Self, ColorParseError> {
        let err = || ColorParseError(input.to_string());
        let hex = input.trim().strip_prefix('#').ok_or_else(err)?;
        let byte = |range: &str| u8::from_str_radix(range, 16).map_err(|_| err());
        match hex.len() {
            3 => {
                // #rgb -> #rrggbb
                let r = byte(&hex[0..1])? * 17;
                let g = byte(&hex[1..2])? * 17;
                let b = byte(&hex[2..3])? * 17;
                Ok(Self::opaque(r, g, b))
            }
            6 => Ok(Self::opaque(
                byte(&hex[0..2])?,
                byte(&hex[2..4])?,
                byte(&hex[4..6])?,
            )),
            8 => Ok(Self::new(
                byte(&hex[0..2])?,
                byte(&hex[2..4])?,
                byte(&hex[4..6])?,
                byte(&hex[6..8])?,
            )),
            _ => Err(err()),
        }
    }

    /// Format as a hex literal; alpha is included only when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexVisitor;

        impl Visitor<'_> for HexVisitor {
            type Value = Color;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a hex color string like \"#ff0000\"")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Color, E> {
                Color::from_hex(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}

/// Object type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Rectangle,
    Circle,
    Text,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Rectangle => "rectangle",
            ObjectKind::Circle => "circle",
            ObjectKind::Text => "text",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Font family options for text objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFamily {
    #[default]
    Sans,
    Serif,
    Mono,
}

/// Font weight options for text objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    Light,
    #[default]
    Regular,
    Bold,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Payload for rectangle objects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectangleProps {
    pub corner_radius: f64,
}

/// Payload for circle objects. The radius is the source of truth for size;
/// `width`/`height` on the owning object are kept at `2 × radius`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleProps {
    pub radius: f64,
}

/// Payload for text objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextProps {
    pub text_content: String,
    pub font_size: f64,
    pub font_family: FontFamily,
    pub font_weight: FontWeight,
    pub text_align: TextAlign,
}

/// Per-type payload, discriminated by the `type` field on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeProperties {
    Rectangle(RectangleProps),
    Circle(CircleProps),
    Text(TextProps),
}

impl TypeProperties {
    pub fn kind(&self) -> ObjectKind {
        match self {
            TypeProperties::Rectangle(_) => ObjectKind::Rectangle,
            TypeProperties::Circle(_) => ObjectKind::Circle,
            TypeProperties::Text(_) => ObjectKind::Text,
        }
    }
}

/// Normalize an angle in degrees to `[0, 360)`.
pub fn normalize_rotation(degrees: f64) -> f64 {
    let wrapped = degrees % 360.0;
    if wrapped < 0.0 { wrapped + 360.0 } else { wrapped }
}

/// A single object on the shared canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasObject {
    pub id: ObjectId,
    /// Center position in logical coordinates.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees, normalized to `[0, 360)`.
    pub rotation: f64,
    pub fill: Color,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f64>,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Render order; higher values draw on top.
    pub z_index: i64,
    pub group_id: Option<String>,
    #[serde(flatten)]
    pub props: TypeProperties,
    /// Advisory lock holder; editing a locked object is discouraged, not
    /// prevented.
    pub locked_by: Option<String>,
    pub lock_acquired_at: Option<u64>,
    pub created_by: String,
    pub created_at: u64,
    pub updated_at: u64,
}

impl CanvasObject {
    /// Create a new object with a fresh id. Geometry and rotation are
    /// normalized on the way in.
    pub fn new(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        props: TypeProperties,
        created_by: impl Into<String>,
        now_ms: u64,
    ) -> Self {
        let mut object = Self {
            id: Uuid::new_v4(),
            x,
            y,
            width,
            height,
            rotation: 0.0,
            fill: Color::black(),
            stroke: None,
            stroke_width: None,
            opacity: 1.0,
            z_index: 0,
            group_id: None,
            props,
            locked_by: None,
            lock_acquired_at: None,
            created_by: created_by.into(),
            created_at: now_ms,
            updated_at: now_ms,
        };
        object.normalize();
        object
    }

    pub fn kind(&self) -> ObjectKind {
        self.props.kind()
    }

    /// Center position as a point.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Axis-aligned bounding box in logical coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.x - self.width / 2.0,
            self.y - self.height / 2.0,
            self.x + self.width / 2.0,
            self.y + self.height / 2.0,
        )
    }

    pub fn is_locked(&self) -> bool {
        self.locked_by.is_some()
    }

    /// True when another user currently holds the advisory lock.
    pub fn is_locked_by_other(&self, user_id: &str) -> bool {
        self.locked_by.as_deref().is_some_and(|holder| holder != user_id)
    }

    /// Re-establish the model invariants after a mutation: position inside
    /// the logical bounds, non-negative dimensions, rotation in `[0, 360)`,
    /// opacity in `[0, 1]`, and circle `width == height == 2 × radius`.
    pub fn normalize(&mut self) {
        let clamped = coords::clamp_logical(self.position());
        self.x = clamped.x;
        self.y = clamped.y;
        self.width = self.width.max(0.0);
        self.height = self.height.max(0.0);
        self.rotation = normalize_rotation(self.rotation);
        self.opacity = self.opacity.clamp(0.0, 1.0);
        if let TypeProperties::Circle(circle) = &mut self.props {
            circle.radius = circle.radius.max(0.0);
            self.width = circle.radius * 2.0;
            self.height = circle.radius * 2.0;
        }
    }

    /// Shallow-merge a patch into this object, bumping `updated_at`.
    pub fn apply_patch(&mut self, patch: &ObjectPatch, now_ms: u64) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        if let Some(fill) = patch.fill {
            self.fill = fill;
        }
        if let Some(stroke) = patch.stroke {
            self.stroke = stroke;
        }
        if let Some(stroke_width) = patch.stroke_width {
            self.stroke_width = stroke_width;
        }
        if let Some(opacity) = patch.opacity {
            self.opacity = opacity;
        }
        if let Some(z_index) = patch.z_index {
            self.z_index = z_index;
        }
        if let Some(group_id) = &patch.group_id {
            self.group_id = group_id.clone();
        }
        if let Some(props) = &patch.props {
            self.props = props.clone();
        }
        if let Some(locked_by) = &patch.locked_by {
            self.locked_by = locked_by.clone();
        }
        if let Some(lock_acquired_at) = patch.lock_acquired_at {
            self.lock_acquired_at = lock_acquired_at;
        }
        self.updated_at = now_ms;
        self.normalize();
    }
}

/// Partial update for [`CanvasObject`]. `None` leaves the field untouched;
/// nullable fields use a nested `Option` so "set to null" and "leave alone"
/// stay distinguishable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    pub fill: Option<Color>,
    pub stroke: Option<Option<Color>>,
    pub stroke_width: Option<Option<f64>>,
    pub opacity: Option<f64>,
    pub z_index: Option<i64>,
    pub group_id: Option<Option<String>>,
    pub props: Option<TypeProperties>,
    pub locked_by: Option<Option<String>>,
    pub lock_acquired_at: Option<Option<u64>>,
}

impl ObjectPatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn size(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn rotation(degrees: f64) -> Self {
        Self {
            rotation: Some(degrees),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

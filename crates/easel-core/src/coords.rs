//! Coordinate translation between logical and surface space.
//!
//! The system-of-record coordinate space is center-origin: both axes run
//! `[-4000, 4000]` with `(0, 0)` at the middle of the canvas. The rendering
//! surface uses a top-left origin, so positions are shifted by a fixed
//! offset in both directions. Dimensions are invariant under the transform.

use kurbo::{Point, Rect};

/// Lower bound of the logical coordinate space on both axes.
pub const LOGICAL_MIN: f64 = -4000.0;
/// Upper bound of the logical coordinate space on both axes.
pub const LOGICAL_MAX: f64 = 4000.0;
/// Offset applied when translating logical coordinates to surface space.
pub const SURFACE_OFFSET: f64 = 4000.0;

/// Convert a logical (center-origin) point to surface (top-left origin) space.
pub fn to_surface(point: Point) -> Point {
    Point::new(point.x + SURFACE_OFFSET, point.y + SURFACE_OFFSET)
}

/// Convert a surface (top-left origin) point to logical (center-origin) space.
pub fn to_logical(point: Point) -> Point {
    Point::new(point.x - SURFACE_OFFSET, point.y - SURFACE_OFFSET)
}

/// Convert a logical-space rectangle to surface space.
pub fn rect_to_surface(rect: Rect) -> Rect {
    Rect::new(
        rect.x0 + SURFACE_OFFSET,
        rect.y0 + SURFACE_OFFSET,
        rect.x1 + SURFACE_OFFSET,
        rect.y1 + SURFACE_OFFSET,
    )
}

/// Check whether a logical point lies inside the canvas bounds.
pub fn in_bounds(point: Point) -> bool {
    (LOGICAL_MIN..=LOGICAL_MAX).contains(&point.x) && (LOGICAL_MIN..=LOGICAL_MAX).contains(&point.y)
}

/// Clamp a logical point to the canvas bounds on both axes.
pub fn clamp_logical(point: Point) -> Point {
    Point::new(
        point.x.clamp(LOGICAL_MIN, LOGICAL_MAX),
        point.y.clamp(LOGICAL_MIN, LOGICAL_MAX),
    )
}

//! Viewport state: zoom, pan, and frame-throttled outward publishing.
//!
//! The controller owns the rendering surface's view transform. Zoom is
//! always applied anchored at the cursor, pan is clamped to a zoom-scaled
//! boundary, and outward publishes are coalesced to at most one per display
//! frame, always carrying the latest state.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

use crate::coords;

/// Minimum allowed zoom level.
pub const MIN_ZOOM: f64 = 0.01;
/// Maximum allowed zoom level.
pub const MAX_ZOOM: f64 = 20.0;
/// Per-unit wheel zoom base: `zoom × 0.999^delta_y`.
pub const ZOOM_WHEEL_BASE: f64 = 0.999;
/// Pan boundary in logical units; the translate components are clamped to
/// `±boundary × zoom`.
pub const PAN_BOUNDARY: f64 = 50_000.0;
/// Fraction of the viewport reserved as padding by zoom-to-selection.
pub const FIT_PADDING_RATIO: f64 = 0.2;

/// Persisted viewport state, written on every throttled publish and read
/// once at session start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

/// Named viewport shortcuts (see [`crate::shortcuts`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportAction {
    Reset,
    ZoomTo100,
    ZoomTo200,
    ZoomToSelection,
}

/// Owns zoom/pan state and the publish throttle.
#[derive(Debug, Clone)]
pub struct ViewportController {
    zoom: f64,
    pan: Vec2,
    viewport_size: Size,
    publish_scheduled: bool,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(Size::new(800.0, 600.0))
    }
}

impl ViewportController {
    pub fn new(viewport_size: Size) -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
            viewport_size,
            publish_scheduled: false,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    pub fn state(&self) -> ViewportState {
        ViewportState {
            zoom: self.zoom,
            pan_x: self.pan.x,
            pan_y: self.pan.y,
        }
    }

    /// View transform as an affine. Uniform scale only; the skew
    /// coefficients are always zero.
    pub fn transform(&self) -> Affine {
        Affine::new([self.zoom, 0.0, 0.0, self.zoom, self.pan.x, self.pan.y])
    }

    /// The `[scale_x, skew_y, skew_x, scale_y, translate_x, translate_y]`
    /// coefficient array.
    pub fn coefficients(&self) -> [f64; 6] {
        self.transform().as_coeffs()
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport_size = Size::new(width, height);
    }

    /// Convert a screen point to surface-content coordinates.
    pub fn screen_to_content(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    /// Convert a surface-content point to screen coordinates.
    pub fn content_to_screen(&self, content: Point) -> Point {
        Point::new(
            content.x * self.zoom + self.pan.x,
            content.y * self.zoom + self.pan.y,
        )
    }

    /// Wheel zoom, anchored at the cursor so the content under it stays put.
    pub fn zoom_by_wheel(&mut self, delta_y: f64, cursor: Point) {
        let factor = ZOOM_WHEEL_BASE.powf(delta_y);
        self.zoom_at(cursor, self.zoom * factor);
    }

    /// Set an absolute zoom level anchored at a screen point.
    pub fn zoom_at(&mut self, anchor: Point, new_zoom: f64) {
        let new_zoom = new_zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }
        let content = self.screen_to_content(anchor);
        self.zoom = new_zoom;
        let moved = self.content_to_screen(content);
        self.pan += Vec2::new(anchor.x - moved.x, anchor.y - moved.y);
        self.clamp_pan();
        self.request_sync();
    }

    /// Pan by a screen-space delta.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
        self.clamp_pan();
        self.request_sync();
    }

    fn clamp_pan(&mut self) {
        let limit = PAN_BOUNDARY * self.zoom;
        self.pan.x = self.pan.x.clamp(-limit, limit);
        self.pan.y = self.pan.y.clamp(-limit, limit);
    }

    /// Reset to zoom 1 at the origin.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan = Vec2::ZERO;
        self.request_sync();
    }

    /// Set an absolute zoom level, preserving the pan.
    pub fn set_zoom_preserving_pan(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.clamp_pan();
        self.request_sync();
    }

    /// Fit the union bounding box of the selection (logical coordinates)
    /// into the viewport with padding, centered. No-op when the selection is
    /// empty.
    pub fn zoom_to_selection(&mut self, selection_bounds: Option<Rect>) {
        let Some(bounds) = selection_bounds else {
            return;
        };
        let bounds = coords::rect_to_surface(bounds);
        let padded = Size::new(
            (self.viewport_size.width * (1.0 - FIT_PADDING_RATIO)).max(1.0),
            (self.viewport_size.height * (1.0 - FIT_PADDING_RATIO)).max(1.0),
        );
        if bounds.width() > 0.0 && bounds.height() > 0.0 {
            let scale = (padded.width / bounds.width()).min(padded.height / bounds.height());
            self.zoom = scale.clamp(MIN_ZOOM, MAX_ZOOM);
        }
        let center = bounds.center();
        self.pan = Vec2::new(
            self.viewport_size.width / 2.0 - center.x * self.zoom,
            self.viewport_size.height / 2.0 - center.y * self.zoom,
        );
        self.clamp_pan();
        self.request_sync();
    }

    /// Apply a named shortcut action.
    pub fn apply(&mut self, action: ViewportAction, selection_bounds: Option<Rect>) {
        match action {
            ViewportAction::Reset => self.reset(),
            ViewportAction::ZoomTo100 => self.set_zoom_preserving_pan(1.0),
            ViewportAction::ZoomTo200 => self.set_zoom_preserving_pan(2.0),
            ViewportAction::ZoomToSelection => self.zoom_to_selection(selection_bounds),
        }
    }

    /// Apply persisted state, clamped through the usual invariants. Does
    /// not schedule a publish: restoring is not a new edit.
    pub fn restore(&mut self, state: ViewportState) {
        self.zoom = state.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = Vec2::new(state.pan_x, state.pan_y);
        self.clamp_pan();
    }

    // --- Publish throttling ---

    /// Mark the viewport dirty for the next display frame. Multiple requests
    /// inside one frame coalesce into a single publish.
    pub fn request_sync(&mut self) {
        self.publish_scheduled = true;
    }

    /// Display-frame tick: emits at most one publish, carrying the state as
    /// of the latest mutation in the frame.
    pub fn on_frame(&mut self) -> Option<ViewportState> {
        if self.publish_scheduled {
            self.publish_scheduled = false;
            Some(self.state())
        } else {
            None
        }
    }

    /// Cancel a scheduled publish (teardown path).
    pub fn cancel_pending(&mut self) {
        self.publish_scheduled = false;
    }

    pub fn has_pending_publish(&self) -> bool {
        self.publish_scheduled
    }
}

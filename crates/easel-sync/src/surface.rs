//! Rendering surface seam.
//!
//! The surface is the mutable canvas the user directly manipulates. Only
//! its observable contract lives here: objects are created and removed in
//! surface coordinates, and user edits come back as serialized objects via
//! a drained event queue. [`MemorySurface`] is the in-process
//! implementation used by tests.

use std::collections::HashMap;

use easel_core::object::{CanvasObject, ObjectId};

/// Events originating on the rendering surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// A user edit (drag, resize, rotate) finished; the surface object
    /// serialized back into a [`CanvasObject`], in surface coordinates.
    ObjectModified(CanvasObject),
    SelectionCreated(Vec<ObjectId>),
    SelectionUpdated(Vec<ObjectId>),
    SelectionCleared,
}

/// Contract of the rendering surface.
pub trait RenderSurface {
    /// Create a rendered object. `object` carries surface coordinates.
    fn add_object(&mut self, object: &CanvasObject);

    fn remove_object(&mut self, id: ObjectId);

    /// Drain user-driven events, in occurrence order.
    fn take_events(&mut self) -> Vec<SurfaceEvent>;
}

/// In-memory surface double: keeps the rendered objects and counts
/// create/remove calls so tests can assert on sync traffic.
#[derive(Debug, Default)]
pub struct MemorySurface {
    objects: HashMap<ObjectId, CanvasObject>,
    pending: Vec<SurfaceEvent>,
    add_count: usize,
    remove_count: usize,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, id: ObjectId) -> Option<&CanvasObject> {
        self.objects.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn add_count(&self) -> usize {
        self.add_count
    }

    pub fn remove_count(&self) -> usize {
        self.remove_count
    }

    pub fn reset_counters(&mut self) {
        self.add_count = 0;
        self.remove_count = 0;
    }

    // --- Test drivers: simulate user interaction ---

    /// Simulate a finished user edit of `object` (surface coordinates).
    pub fn emit_object_modified(&mut self, object: CanvasObject) {
        self.objects.insert(object.id, object.clone());
        self.pending.push(SurfaceEvent::ObjectModified(object));
    }

    pub fn emit_selection_created(&mut self, ids: Vec<ObjectId>) {
        self.pending.push(SurfaceEvent::SelectionCreated(ids));
    }

    pub fn emit_selection_updated(&mut self, ids: Vec<ObjectId>) {
        self.pending.push(SurfaceEvent::SelectionUpdated(ids));
    }

    pub fn emit_selection_cleared(&mut self) {
        self.pending.push(SurfaceEvent::SelectionCleared);
    }
}

impl RenderSurface for MemorySurface {
    fn add_object(&mut self, object: &CanvasObject) {
        self.objects.insert(object.id, object.clone());
        self.add_count += 1;
    }

    fn remove_object(&mut self, id: ObjectId) {
        self.objects.remove(&id);
        self.remove_count += 1;
    }

    fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.pending)
    }
}

//! Bidirectional bridge between the object store and the rendering surface.
//!
//! Two mutable representations of the same objects must stay equal without
//! ping-pong. Every store mutation carries a provenance [`Origin`]; the
//! store → surface direction ignores `Surface`-origin events (the change
//! came *from* the surface) and the outbound encoder ignores
//! `Remote`-origin events, so a propagated mutation can never bounce back
//! to its source as if newly originated. Provenance survives handlers that
//! defer across a frame boundary, which a pair of re-entrancy flags would
//! not.

use std::collections::HashMap;

use kurbo::Point;

use easel_core::coords;
use easel_core::object::{CanvasObject, ObjectId};
use easel_core::store::{CanvasObjectStore, Origin, StoreChange, StoreEvent};
use easel_core::viewport::ViewportState;

use crate::surface::{RenderSurface, SurfaceEvent};

/// Compare the synced field set. Anything outside it (audit fields, z-index)
/// does not warrant a surface rebuild.
fn needs_refresh(previous: &CanvasObject, current: &CanvasObject) -> bool {
    previous.x != current.x
        || previous.y != current.y
        || previous.width != current.width
        || previous.height != current.height
        || previous.rotation != current.rotation
        || previous.opacity != current.opacity
        || previous.fill != current.fill
        || previous.locked_by != current.locked_by
        || previous.props != current.props
}

fn to_surface_object(object: &CanvasObject) -> CanvasObject {
    let mut copy = object.clone();
    let position = coords::to_surface(Point::new(copy.x, copy.y));
    copy.x = position.x;
    copy.y = position.y;
    copy
}

/// Keeps store and surface equal, and forwards throttled viewport publishes.
#[derive(Debug, Default)]
pub struct RenderSyncCoordinator {
    /// Last object state pushed to (or confirmed from) the surface, in
    /// logical coordinates. Its key set is the previous-ids side of the
    /// diff.
    mirror: HashMap<ObjectId, CanvasObject>,
    viewport_outbox: Vec<ViewportState>,
}

impl RenderSyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently mirrored on the surface.
    pub fn mirrored_len(&self) -> usize {
        self.mirror.len()
    }

    // --- Surface → store ---

    /// Convert user-driven surface events into store mutations, tagged with
    /// [`Origin::Surface`]. Surface edits for objects the store no longer
    /// knows (deleted concurrently) are dropped, matching the store's
    /// no-op-on-absent update contract.
    pub fn apply_surface_events(
        &mut self,
        events: Vec<SurfaceEvent>,
        store: &mut CanvasObjectStore,
        now_ms: u64,
    ) {
        for event in events {
            match event {
                SurfaceEvent::ObjectModified(surface_object) => {
                    let mut object = surface_object;
                    let logical = coords::to_logical(Point::new(object.x, object.y));
                    object.x = logical.x;
                    object.y = logical.y;
                    object.updated_at = now_ms;
                    object.normalize();
                    if store.contains(object.id) {
                        self.mirror.insert(object.id, object.clone());
                        store.add(object, Origin::Surface);
                    } else {
                        log::debug!("dropping surface edit for unknown object {}", object.id);
                    }
                }
                SurfaceEvent::SelectionCreated(ids) | SurfaceEvent::SelectionUpdated(ids) => {
                    store.select_only(ids, Origin::Surface);
                }
                SurfaceEvent::SelectionCleared => {
                    store.clear_selection(Origin::Surface);
                }
            }
        }
    }

    // --- Store → surface ---

    /// React to store mutations. `Surface`-origin events only refresh the
    /// mirror; everything else triggers a diff of current ids against the
    /// mirrored ids: create what is new, remove what is gone, and
    /// remove-then-recreate any object whose synced fields differ (full
    /// property sync at the cost of surface-local transient state).
    pub fn apply_store_events<S: RenderSurface>(
        &mut self,
        events: &[StoreEvent],
        store: &CanvasObjectStore,
        surface: &mut S,
    ) {
        let mut needs_diff = false;
        for event in events {
            if event.origin == Origin::Surface {
                match &event.change {
                    StoreChange::Added(id) | StoreChange::Updated(id) => {
                        if let Some(object) = store.get(*id) {
                            self.mirror.insert(*id, object.clone());
                        }
                    }
                    StoreChange::Removed(object) => {
                        self.mirror.remove(&object.id);
                    }
                    StoreChange::Replaced => needs_diff = true,
                    StoreChange::SelectionChanged => {}
                }
            } else if !matches!(event.change, StoreChange::SelectionChanged) {
                needs_diff = true;
            }
        }
        if needs_diff {
            self.diff_to_surface(store, surface);
        }
    }

    fn diff_to_surface<S: RenderSurface>(&mut self, store: &CanvasObjectStore, surface: &mut S) {
        let stale: Vec<ObjectId> = self
            .mirror
            .keys()
            .filter(|id| !store.contains(**id))
            .copied()
            .collect();
        for id in stale {
            self.mirror.remove(&id);
            surface.remove_object(id);
        }

        for (id, object) in store.objects() {
            match self.mirror.get(id) {
                None => {
                    surface.add_object(&to_surface_object(object));
                    self.mirror.insert(*id, object.clone());
                }
                Some(previous) if needs_refresh(previous, object) => {
                    surface.remove_object(*id);
                    surface.add_object(&to_surface_object(object));
                    self.mirror.insert(*id, object.clone());
                }
                Some(_) => {}
            }
        }
    }

    // --- Viewport outward ---

    /// Forward one throttled viewport publish for persistence.
    pub fn publish_viewport(&mut self, state: ViewportState) {
        self.viewport_outbox.push(state);
    }

    /// Drain the viewport states awaiting persistence.
    pub fn take_viewport_publishes(&mut self) -> Vec<ViewportState> {
        std::mem::take(&mut self.viewport_outbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;
    use easel_core::object::{Color, ObjectPatch, RectangleProps, TypeProperties};

    fn rectangle(x: f64, y: f64) -> CanvasObject {
        CanvasObject::new(
            x,
            y,
            10.0,
            10.0,
            TypeProperties::Rectangle(RectangleProps { corner_radius: 0.0 }),
            "tester",
            1_000,
        )
    }

    fn pump(
        coordinator: &mut RenderSyncCoordinator,
        store: &mut CanvasObjectStore,
        surface: &mut MemorySurface,
    ) {
        let events = store.take_events();
        coordinator.apply_store_events(&events, store, surface);
    }

    #[test]
    fn test_store_add_creates_on_surface_in_surface_coords() {
        let mut coordinator = RenderSyncCoordinator::new();
        let mut store = CanvasObjectStore::new();
        let mut surface = MemorySurface::new();

        let object = rectangle(100.0, -100.0);
        let id = object.id;
        store.add(object, Origin::Local);
        pump(&mut coordinator, &mut store, &mut surface);

        assert_eq!(surface.len(), 1);
        let rendered = surface.object(id).unwrap();
        assert!((rendered.x - 4100.0).abs() < f64::EPSILON);
        assert!((rendered.y - 3900.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_store_remove_removes_from_surface() {
        let mut coordinator = RenderSyncCoordinator::new();
        let mut store = CanvasObjectStore::new();
        let mut surface = MemorySurface::new();

        let object = rectangle(0.0, 0.0);
        let id = object.id;
        store.add(object, Origin::Local);
        pump(&mut coordinator, &mut store, &mut surface);

        store.remove(id, Origin::Remote);
        pump(&mut coordinator, &mut store, &mut surface);
        assert!(surface.is_empty());
        assert_eq!(coordinator.mirrored_len(), 0);
    }

    #[test]
    fn test_changed_field_recreates_surface_object() {
        let mut coordinator = RenderSyncCoordinator::new();
        let mut store = CanvasObjectStore::new();
        let mut surface = MemorySurface::new();

        let object = rectangle(0.0, 0.0);
        let id = object.id;
        store.add(object, Origin::Local);
        pump(&mut coordinator, &mut store, &mut surface);
        surface.reset_counters();

        store.update(
            id,
            &ObjectPatch {
                fill: Some(Color::opaque(255, 0, 0)),
                ..ObjectPatch::default()
            },
            Origin::Remote,
            2_000,
        );
        pump(&mut coordinator, &mut store, &mut surface);

        // Remove-then-recreate, not an in-place tweak.
        assert_eq!(surface.remove_count(), 1);
        assert_eq!(surface.add_count(), 1);
        assert_eq!(surface.object(id).unwrap().fill, Color::opaque(255, 0, 0));
    }

    #[test]
    fn test_audit_only_change_does_not_touch_surface() {
        let mut coordinator = RenderSyncCoordinator::new();
        let mut store = CanvasObjectStore::new();
        let mut surface = MemorySurface::new();

        let object = rectangle(0.0, 0.0);
        let id = object.id;
        store.add(object, Origin::Local);
        pump(&mut coordinator, &mut store, &mut surface);
        surface.reset_counters();

        // z_index is outside the synced field set.
        store.update(
            id,
            &ObjectPatch {
                z_index: Some(42),
                ..ObjectPatch::default()
            },
            Origin::Remote,
            2_000,
        );
        pump(&mut coordinator, &mut store, &mut surface);
        assert_eq!(surface.add_count(), 0);
        assert_eq!(surface.remove_count(), 0);
    }

    #[test]
    fn test_surface_edit_does_not_bounce_back() {
        let mut coordinator = RenderSyncCoordinator::new();
        let mut store = CanvasObjectStore::new();
        let mut surface = MemorySurface::new();

        let object = rectangle(10.0, 10.0);
        let id = object.id;
        store.add(object, Origin::Local);
        pump(&mut coordinator, &mut store, &mut surface);
        surface.reset_counters();

        // The user drags the object on the surface.
        let mut dragged = surface.object(id).unwrap().clone();
        dragged.x += 25.0;
        surface.emit_object_modified(dragged);

        let events = surface.take_events();
        coordinator.apply_surface_events(events, &mut store, 2_000);
        // The store took the edit...
        assert!((store.get(id).unwrap().x - 35.0).abs() < f64::EPSILON);

        // ...and the resulting store events trigger zero surface mutations.
        let store_events = store.take_events();
        coordinator.apply_store_events(&store_events, &store, &mut surface);
        assert_eq!(surface.add_count(), 0);
        assert_eq!(surface.remove_count(), 0);
    }

    #[test]
    fn test_surface_edit_for_deleted_object_is_dropped() {
        let mut coordinator = RenderSyncCoordinator::new();
        let mut store = CanvasObjectStore::new();

        let ghost = to_surface_object(&rectangle(0.0, 0.0));
        coordinator.apply_surface_events(
            vec![SurfaceEvent::ObjectModified(ghost)],
            &mut store,
            1_000,
        );
        assert!(store.is_empty());
        assert!(store.take_events().is_empty());
    }

    #[test]
    fn test_surface_selection_maps_to_store() {
        let mut coordinator = RenderSyncCoordinator::new();
        let mut store = CanvasObjectStore::new();

        let object = rectangle(0.0, 0.0);
        let id = object.id;
        store.add(object, Origin::Local);
        store.take_events();

        coordinator.apply_surface_events(
            vec![SurfaceEvent::SelectionCreated(vec![id])],
            &mut store,
            1_000,
        );
        assert!(store.is_selected(id));

        coordinator.apply_surface_events(vec![SurfaceEvent::SelectionCleared], &mut store, 1_000);
        assert!(store.selected_ids().is_empty());
    }

    #[test]
    fn test_viewport_publish_forwarding() {
        let mut coordinator = RenderSyncCoordinator::new();
        coordinator.publish_viewport(ViewportState {
            zoom: 2.0,
            pan_x: 1.0,
            pan_y: -1.0,
        });
        let publishes = coordinator.take_viewport_publishes();
        assert_eq!(publishes.len(), 1);
        assert!((publishes[0].zoom - 2.0).abs() < f64::EPSILON);
        assert!(coordinator.take_viewport_publishes().is_empty());
    }
}

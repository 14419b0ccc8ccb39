//! Authoritative in-memory object store.
//!
//! The store is a plain id → object map plus selection state. Mutations are
//! synchronous, never cascade, and know nothing about rendering or the
//! network; every mutation is tagged with its [`Origin`] and recorded as a
//! [`StoreEvent`] so downstream consumers can react without re-triggering
//! their own cause.

use std::collections::HashMap;

use kurbo::Rect;

use crate::object::{CanvasObject, ObjectId, ObjectPatch};

/// Provenance of a store mutation. Handlers ignore mutations whose origin
/// matches their own output channel, which is what prevents feedback loops
/// between the store, the rendering surface and the remote feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Application logic: commands, undo/redo.
    Local,
    /// Applied from the remote change feed.
    Remote,
    /// Converted from a rendering-surface edit (drag, resize, rotate).
    Surface,
}

/// What changed in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    Added(ObjectId),
    Updated(ObjectId),
    /// Carries the removed object so consumers can still address it.
    Removed(CanvasObject),
    /// The whole map was swapped via `replace_all`.
    Replaced,
    SelectionChanged,
}

/// A recorded mutation, drained by the session pump via [`CanvasObjectStore::take_events`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEvent {
    pub origin: Origin,
    pub change: StoreChange,
}

/// Authoritative map of object id → object, plus selection state.
#[derive(Debug, Default)]
pub struct CanvasObjectStore {
    objects: HashMap<ObjectId, CanvasObject>,
    selection: Vec<ObjectId>,
    events: Vec<StoreEvent>,
}

impl CanvasObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object, replacing any existing object with the same id.
    /// Emits `Added` for a new id, `Updated` for a replacement.
    pub fn add(&mut self, object: CanvasObject, origin: Origin) {
        let id = object.id;
        let replaced = self.objects.insert(id, object).is_some();
        let change = if replaced {
            StoreChange::Updated(id)
        } else {
            StoreChange::Added(id)
        };
        self.events.push(StoreEvent { origin, change });
    }

    /// Shallow-merge a patch into the object. No-op (returning `false`) when
    /// the id is absent.
    pub fn update(
        &mut self,
        id: ObjectId,
        patch: &ObjectPatch,
        origin: Origin,
        now_ms: u64,
    ) -> bool {
        let Some(object) = self.objects.get_mut(&id) else {
            return false;
        };
        object.apply_patch(patch, now_ms);
        self.events.push(StoreEvent {
            origin,
            change: StoreChange::Updated(id),
        });
        true
    }

    /// Apply several patches as one combined mutation. Absent ids are
    /// skipped; returns the number of objects actually updated.
    pub fn update_many(
        &mut self,
        updates: &[(ObjectId, ObjectPatch)],
        origin: Origin,
        now_ms: u64,
    ) -> usize {
        let mut applied = 0;
        for (id, patch) in updates {
            if self.update(*id, patch, origin, now_ms) {
                applied += 1;
            }
        }
        applied
    }

    /// Remove an object by id, dropping it from the selection as well.
    pub fn remove(&mut self, id: ObjectId, origin: Origin) -> Option<CanvasObject> {
        let removed = self.objects.remove(&id)?;
        self.selection.retain(|selected| *selected != id);
        self.events.push(StoreEvent {
            origin,
            change: StoreChange::Removed(removed.clone()),
        });
        Some(removed)
    }

    pub fn remove_many(&mut self, ids: &[ObjectId], origin: Origin) -> Vec<CanvasObject> {
        ids.iter().filter_map(|id| self.remove(*id, origin)).collect()
    }

    /// Replace the whole map (bulk load). Clears the selection.
    pub fn replace_all(&mut self, objects: HashMap<ObjectId, CanvasObject>, origin: Origin) {
        self.objects = objects;
        self.selection.clear();
        self.events.push(StoreEvent {
            origin,
            change: StoreChange::Replaced,
        });
    }

    pub fn get(&self, id: ObjectId) -> Option<&CanvasObject> {
        self.objects.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn objects(&self) -> &HashMap<ObjectId, CanvasObject> {
        &self.objects
    }

    /// Objects in render order (ascending `z_index`).
    pub fn objects_ordered(&self) -> Vec<&CanvasObject> {
        let mut ordered: Vec<&CanvasObject> = self.objects.values().collect();
        ordered.sort_by_key(|object| object.z_index);
        ordered
    }

    /// One above the current topmost `z_index` (0 for an empty store).
    pub fn next_z_index(&self) -> i64 {
        self.objects
            .values()
            .map(|object| object.z_index)
            .max()
            .map_or(0, |top| top + 1)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // --- Selection ---

    /// Replace the selection. Unknown ids are dropped.
    pub fn select_only(&mut self, ids: Vec<ObjectId>, origin: Origin) {
        let mut selection: Vec<ObjectId> = ids
            .into_iter()
            .filter(|id| self.objects.contains_key(id))
            .collect();
        selection.dedup();
        if selection != self.selection {
            self.selection = selection;
            self.events.push(StoreEvent {
                origin,
                change: StoreChange::SelectionChanged,
            });
        }
    }

    pub fn add_to_selection(&mut self, id: ObjectId, origin: Origin) {
        if self.objects.contains_key(&id) && !self.selection.contains(&id) {
            self.selection.push(id);
            self.events.push(StoreEvent {
                origin,
                change: StoreChange::SelectionChanged,
            });
        }
    }

    pub fn clear_selection(&mut self, origin: Origin) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.events.push(StoreEvent {
                origin,
                change: StoreChange::SelectionChanged,
            });
        }
    }

    pub fn selected_ids(&self) -> &[ObjectId] {
        &self.selection
    }

    pub fn is_selected(&self, id: ObjectId) -> bool {
        self.selection.contains(&id)
    }

    /// Union bounding box of the selected objects, in logical coordinates.
    pub fn selection_bounds(&self) -> Option<Rect> {
        let mut result: Option<Rect> = None;
        for id in &self.selection {
            if let Some(object) = self.objects.get(id) {
                let bounds = object.bounds();
                result = Some(match result {
                    Some(acc) => acc.union(bounds),
                    None => bounds,
                });
            }
        }
        result
    }

    // --- Events ---

    /// Drain the pending mutation events.
    pub fn take_events(&mut self) -> Vec<StoreEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{RectangleProps, TypeProperties};

    fn rectangle(x: f64, y: f64) -> CanvasObject {
        CanvasObject::new(
            x,
            y,
            100.0,
            50.0,
            TypeProperties::Rectangle(RectangleProps { corner_radius: 0.0 }),
            "tester",
            1_000,
        )
    }

    #[test]
    fn test_add_and_get() {
        let mut store = CanvasObjectStore::new();
        let object = rectangle(0.0, 0.0);
        let id = object.id;

        store.add(object, Origin::Local);
        assert_eq!(store.len(), 1);
        assert!(store.get(id).is_some());

        let events = store.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].change, StoreChange::Added(id));
        assert_eq!(events[0].origin, Origin::Local);
    }

    #[test]
    fn test_add_existing_id_is_update() {
        let mut store = CanvasObjectStore::new();
        let object = rectangle(0.0, 0.0);
        let id = object.id;
        store.add(object.clone(), Origin::Local);
        store.take_events();

        let mut newer = object;
        newer.x = 42.0;
        store.add(newer, Origin::Remote);

        assert_eq!(store.len(), 1);
        assert!((store.get(id).unwrap().x - 42.0).abs() < f64::EPSILON);
        let events = store.take_events();
        assert_eq!(events[0].change, StoreChange::Updated(id));
    }

    #[test]
    fn test_update_absent_id_is_noop() {
        let mut store = CanvasObjectStore::new();
        let applied = store.update(
            uuid::Uuid::new_v4(),
            &ObjectPatch::position(1.0, 2.0),
            Origin::Local,
            2_000,
        );
        assert!(!applied);
        assert!(store.take_events().is_empty());
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut store = CanvasObjectStore::new();
        let object = rectangle(0.0, 0.0);
        let id = object.id;
        store.add(object, Origin::Local);
        store.select_only(vec![id], Origin::Local);

        let removed = store.remove(id, Origin::Local);
        assert!(removed.is_some());
        assert!(store.selected_ids().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_removed_event_carries_object() {
        let mut store = CanvasObjectStore::new();
        let object = rectangle(7.0, 8.0);
        let id = object.id;
        store.add(object, Origin::Local);
        store.take_events();

        store.remove(id, Origin::Remote);
        let events = store.take_events();
        match &events[0].change {
            StoreChange::Removed(removed) => assert_eq!(removed.id, id),
            other => panic!("unexpected change: {other:?}"),
        }
    }

    #[test]
    fn test_selection_ignores_unknown_ids() {
        let mut store = CanvasObjectStore::new();
        let object = rectangle(0.0, 0.0);
        let id = object.id;
        store.add(object, Origin::Local);

        store.select_only(vec![id, uuid::Uuid::new_v4()], Origin::Surface);
        assert_eq!(store.selected_ids(), &[id]);
    }

    #[test]
    fn test_selection_bounds_union() {
        let mut store = CanvasObjectStore::new();
        let a = rectangle(0.0, 0.0);
        let b = rectangle(200.0, 0.0);
        let ids = vec![a.id, b.id];
        store.add(a, Origin::Local);
        store.add(b, Origin::Local);
        store.select_only(ids, Origin::Local);

        let bounds = store.selection_bounds().unwrap();
        assert!((bounds.x0 + 50.0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_next_z_index() {
        let mut store = CanvasObjectStore::new();
        assert_eq!(store.next_z_index(), 0);

        let mut object = rectangle(0.0, 0.0);
        object.z_index = 5;
        store.add(object, Origin::Local);
        assert_eq!(store.next_z_index(), 6);
    }

    #[test]
    fn test_replace_all() {
        let mut store = CanvasObjectStore::new();
        store.add(rectangle(0.0, 0.0), Origin::Local);
        store.take_events();

        let object = rectangle(1.0, 1.0);
        let id = object.id;
        let mut map = HashMap::new();
        map.insert(id, object);
        store.replace_all(map, Origin::Remote);

        assert_eq!(store.len(), 1);
        assert!(store.contains(id));
        let events = store.take_events();
        assert_eq!(events[0].change, StoreChange::Replaced);
    }
}

//! Top-level session: owns every collaborator and runs the cooperative
//! pump.
//!
//! All state is explicitly constructed and injected here, with no
//! module-level singletons. The session restores the persisted viewport before the
//! first pump, drives one cycle of event routing per tick, and tears
//! everything down (pending reconnect, scheduled viewport publish) on
//! dispose.

use std::sync::mpsc::Receiver;

use kurbo::Size;

use easel_core::command::{Command, CommandEngine, CommandError, CommandMetadata};
use easel_core::object::ObjectId;
use easel_core::shortcuts::ShortcutRegistry;
use easel_core::store::{CanvasObjectStore, Origin};
use easel_core::viewport::{ViewportAction, ViewportController, ViewportState};

use crate::connection::{ConnectionStatus, DEFAULT_MAX_RECONNECT_ATTEMPTS};
use crate::coordinator::RenderSyncCoordinator;
use crate::feed::ChangeFeed;
use crate::remote::{RemoteSyncConfig, RemoteSyncManager};
use crate::surface::RenderSurface;

/// Session construction parameters.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub user_id: String,
    pub undo_capacity: usize,
    pub max_reconnect_attempts: u32,
    pub viewport_size: Size,
    /// Persisted viewport state, applied before the first render.
    pub initial_viewport: Option<ViewportState>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            undo_capacity: easel_core::command::DEFAULT_UNDO_CAPACITY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            viewport_size: Size::new(800.0, 600.0),
            initial_viewport: None,
        }
    }
}

/// One user's live canvas session.
pub struct CanvasSession<F: ChangeFeed, S: RenderSurface> {
    store: CanvasObjectStore,
    engine: CommandEngine,
    viewport: ViewportController,
    coordinator: RenderSyncCoordinator,
    remote: RemoteSyncManager<F>,
    surface: S,
    user_id: String,
    disposed: bool,
}

impl<F: ChangeFeed, S: RenderSurface> CanvasSession<F, S> {
    pub fn new(feed: F, surface: S, config: SessionConfig) -> Self {
        let mut viewport = ViewportController::new(config.viewport_size);
        if let Some(state) = config.initial_viewport {
            viewport.restore(state);
        }
        Self {
            store: CanvasObjectStore::new(),
            engine: CommandEngine::with_capacity(config.undo_capacity),
            viewport,
            coordinator: RenderSyncCoordinator::new(),
            remote: RemoteSyncManager::new(
                feed,
                RemoteSyncConfig {
                    max_reconnect_attempts: config.max_reconnect_attempts,
                },
            ),
            surface,
            user_id: config.user_id,
            disposed: false,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Open the remote subscription.
    pub fn connect(&mut self, now_ms: u64) {
        self.remote.connect(now_ms);
    }

    // --- Mutations (all flow through commands) ---

    pub fn execute(&mut self, command: Box<dyn Command>) -> Result<(), CommandError> {
        self.engine.execute(command, &mut self.store)
    }

    pub fn undo(&mut self) -> Result<bool, CommandError> {
        self.engine.undo(&mut self.store)
    }

    pub fn redo(&mut self) -> Result<bool, CommandError> {
        self.engine.redo(&mut self.store)
    }

    pub fn can_undo(&self) -> bool {
        self.engine.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.engine.can_redo()
    }

    pub fn history(&self) -> Vec<CommandMetadata> {
        self.engine.history()
    }

    // --- Selection ---

    pub fn select_only(&mut self, ids: Vec<ObjectId>) {
        self.store.select_only(ids, Origin::Local);
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection(Origin::Local);
    }

    // --- Accessors ---

    pub fn store(&self) -> &CanvasObjectStore {
        &self.store
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportController {
        &mut self.viewport
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn remote(&self) -> &RemoteSyncManager<F> {
        &self.remote
    }

    pub fn remote_mut(&mut self) -> &mut RemoteSyncManager<F> {
        &mut self.remote
    }

    pub fn subscribe_status(&mut self) -> Receiver<ConnectionStatus> {
        self.remote.subscribe_status()
    }

    // --- Viewport shortcuts ---

    /// Resolve and apply a keyboard shortcut. Returns whether the key was
    /// handled.
    pub fn handle_shortcut(&mut self, key: &str, ctrl: bool, meta: bool) -> bool {
        match ShortcutRegistry::resolve(key, ctrl, meta) {
            Some(action) => {
                self.apply_viewport_action(action);
                true
            }
            None => false,
        }
    }

    pub fn apply_viewport_action(&mut self, action: ViewportAction) {
        let selection_bounds = self.store.selection_bounds();
        self.viewport.apply(action, selection_bounds);
    }

    // --- The pump ---

    /// One cooperative cycle: surface events in, store events out to the
    /// surface and the outbound queue, remote ingestion, then the display
    /// frame tick for the viewport publish.
    pub fn pump(&mut self, now_ms: u64) {
        if self.disposed {
            return;
        }

        let surface_events = self.surface.take_events();
        self.coordinator
            .apply_surface_events(surface_events, &mut self.store, now_ms);
        self.route_store_events();

        self.remote.poll(&mut self.store, now_ms);
        self.route_store_events();

        if let Some(state) = self.viewport.on_frame() {
            self.coordinator.publish_viewport(state);
        }
    }

    fn route_store_events(&mut self) {
        let events = self.store.take_events();
        if events.is_empty() {
            return;
        }
        self.coordinator
            .apply_store_events(&events, &self.store, &mut self.surface);
        self.remote.collect_outbound(&events, &self.store);
    }

    /// Drain the viewport states awaiting persistence.
    pub fn take_viewport_publishes(&mut self) -> Vec<ViewportState> {
        self.coordinator.take_viewport_publishes()
    }

    /// Tear down: cancels the scheduled viewport publish and the pending
    /// reconnect so no callback fires after this returns.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.viewport.cancel_pending();
        self.remote.dispose();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

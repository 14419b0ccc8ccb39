//! Keyboard shortcut registry for viewport actions.
//!
//! Every action is reachable with the primary modifier (Ctrl) and the
//! secondary one (Cmd), so the bindings work across platforms.

use crate::viewport::ViewportAction;

/// A viewport shortcut definition.
#[derive(Debug, Clone, Copy)]
pub struct Shortcut {
    pub key: &'static str,
    pub action: ViewportAction,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(key: &'static str, action: ViewportAction, description: &'static str) -> Self {
        Self {
            key,
            action,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+0").
    pub fn format(&self) -> String {
        format!("Ctrl+{}", self.key)
    }
}

/// Registry of the viewport shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("0", ViewportAction::Reset, "Reset view"),
            Shortcut::new("1", ViewportAction::ZoomTo100, "Zoom to 100%"),
            Shortcut::new("2", ViewportAction::ZoomTo200, "Zoom to 200%"),
            Shortcut::new("3", ViewportAction::ZoomToSelection, "Zoom to selection"),
        ]
    }

    /// Resolve a key press to an action. Either the primary (Ctrl) or the
    /// secondary (Cmd) modifier must be held.
    pub fn resolve(key: &str, ctrl: bool, meta: bool) -> Option<ViewportAction> {
        if !ctrl && !meta {
            return None;
        }
        Self::all()
            .into_iter()
            .find(|shortcut| shortcut.key == key)
            .map(|shortcut| shortcut.action)
    }
}

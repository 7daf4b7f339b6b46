//! Pass-through host callbacks.
//!
//! The effect decorates a terminal that may already have its own
//! "decorated" and "cursor moved" handlers. Those are kept here and always
//! run first, before the effect does anything.

use std::fmt;

use crate::host::CursorFrame;

/// Callback for the host's own "decorated" notification.
pub type DecoratedHook = Box<dyn FnMut()>;

/// Callback for the host's own cursor-move handler.
pub type CursorMoveHook = Box<dyn FnMut(&CursorFrame)>;

/// The host's own callbacks, wrapped by the controller.
#[derive(Default)]
pub struct HostHooks {
    on_decorated: Option<DecoratedHook>,
    on_cursor_move: Option<CursorMoveHook>,
}

impl HostHooks {
    /// No callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the host's "decorated" callback.
    #[must_use]
    pub fn on_decorated(mut self, hook: impl FnMut() + 'static) -> Self {
        self.on_decorated = Some(Box::new(hook));
        self
    }

    /// Wraps the host's cursor-move callback.
    #[must_use]
    pub fn on_cursor_move(mut self, hook: impl FnMut(&CursorFrame) + 'static) -> Self {
        self.on_cursor_move = Some(Box::new(hook));
        self
    }

    pub(crate) fn decorated(&mut self) {
        if let Some(hook) = self.on_decorated.as_mut() {
            hook();
        }
    }

    pub(crate) fn cursor_moved(&mut self, frame: &CursorFrame) {
        if let Some(hook) = self.on_cursor_move.as_mut() {
            hook(frame);
        }
    }
}

impl fmt::Debug for HostHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostHooks")
            .field("on_decorated", &self.on_decorated.is_some())
            .field("on_cursor_move", &self.on_cursor_move.is_some())
            .finish()
    }
}

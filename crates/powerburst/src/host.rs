//! # Terminal Host Interface
//!
//! Everything the effect needs from the terminal it decorates, and nothing
//! more. A host is also the frame scheduler: it owns the display refresh.
//!
//! ```text
//! ┌──────────────────────── TerminalHost ────────────────────────┐
//! │ clock        now()                                           │
//! │ geometry     viewport(), container_origin()                  │
//! │ shake        translate_container(Some(offset) | None)        │
//! │ overlay      create_surface(spec) / remove_surface(surface)  │
//! │ resize       watch_resize() / unwatch_resize(id)             │
//! │ frames       request_frame() / cancel_frame(request)         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use powerburst_core::Vec2;
use powerburst_render::{FrameScheduler, Surface, SurfaceResult, SurfaceSpec};

/// Viewport size in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl Viewport {
    /// Creates a viewport.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if either side is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Handle to a registered resize listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// A cursor-movement event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CursorFrame {
    /// Horizontal offset inside the terminal container.
    pub x: f64,
    /// Vertical offset inside the terminal container.
    pub y: f64,
    /// The cursor's current CSS color, if the host knows it.
    pub cursor_color: Option<String>,
}

impl CursorFrame {
    /// A cursor position with no color information.
    #[must_use]
    pub const fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            cursor_color: None,
        }
    }

    /// Attaches the cursor color.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.cursor_color = Some(color.into());
        self
    }
}

/// The terminal the effect is attached to.
pub trait TerminalHost: FrameScheduler {
    /// The overlay type this host hands out.
    type Surface: Surface;

    /// Monotonic time. Drives the spawn and shake windows.
    fn now(&self) -> Duration;

    /// Current viewport size.
    fn viewport(&self) -> Viewport;

    /// On-screen origin of the terminal container.
    fn container_origin(&self) -> Vec2;

    /// Translates the terminal container by `offset`, or resets it.
    fn translate_container(&mut self, offset: Option<Vec2>);

    /// Creates the overlay and attaches it above the terminal.
    ///
    /// # Errors
    ///
    /// Any [`powerburst_render::SurfaceError`]. The effect stays inactive.
    fn create_surface(&mut self, spec: &SurfaceSpec) -> SurfaceResult<Self::Surface>;

    /// Detaches and destroys the overlay.
    fn remove_surface(&mut self, surface: Self::Surface);

    /// Starts delivering viewport resizes to the effect.
    fn watch_resize(&mut self) -> ListenerId;

    /// Stops delivering viewport resizes.
    fn unwatch_resize(&mut self, id: ListenerId);
}

//! # Headless Host
//!
//! A [`TerminalHost`] with no window. Time is virtual and only moves when
//! told to; frames fire only when stepped. Every side effect the controller
//! has on a host is recorded so it can be inspected afterwards.

use std::collections::VecDeque;
use std::time::Duration;

use powerburst_core::Vec2;
use powerburst_render::{
    FrameRequest, FrameScheduler, PixelCanvas, SurfaceError, SurfaceResult, SurfaceSpec,
};

use crate::controller::{EffectController, FrameReport};
use crate::error::EffectResult;
use crate::host::{ListenerId, TerminalHost, Viewport};

/// Virtual time between two frames (60 Hz).
pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// In-memory terminal host with a virtual clock.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    clock: Duration,
    viewport: Viewport,
    origin: Vec2,
    translations: Vec<Option<Vec2>>,
    next_frame: u64,
    frames: VecDeque<FrameRequest>,
    frames_cancelled: u64,
    next_listener: u64,
    resize_listeners: Vec<ListenerId>,
    live_surfaces: usize,
    surface_failure: Option<SurfaceError>,
}

impl HeadlessHost {
    /// Creates a host with a `width`x`height` viewport and the container at
    /// the top-left corner.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            ..Self::default()
        }
    }

    /// Places the terminal container at `(x, y)` on screen.
    #[must_use]
    pub fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.origin = Vec2::new(x, y);
        self
    }

    /// Moves the virtual clock forward.
    pub fn advance(&mut self, by: Duration) {
        self.clock += by;
    }

    /// Makes the next `create_surface` call fail with `error`.
    pub fn fail_next_surface(&mut self, error: SurfaceError) {
        self.surface_failure = Some(error);
    }

    /// Changes the viewport and notifies `controller` if it watches resizes.
    pub fn resize(&mut self, controller: &mut EffectController<Self>, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height);
        if !self.resize_listeners.is_empty() {
            controller.on_resize(self);
        }
    }

    /// Fires the oldest pending frame, one frame interval later.
    ///
    /// Returns `None` when no frame is pending.
    pub fn step(
        &mut self,
        controller: &mut EffectController<Self>,
    ) -> Option<EffectResult<Option<FrameReport>>> {
        self.frames.pop_front()?;
        self.clock += FRAME_INTERVAL;
        Some(controller.on_frame(self))
    }

    /// Steps until no frame is pending or `max_frames` have run.
    ///
    /// # Errors
    ///
    /// Stops at the first frame that reports an error.
    pub fn run_until_idle(
        &mut self,
        controller: &mut EffectController<Self>,
        max_frames: u32,
    ) -> EffectResult<u32> {
        let mut frames = 0;
        while frames < max_frames {
            match self.step(controller) {
                Some(result) => {
                    result?;
                    frames += 1;
                }
                None => break,
            }
        }
        Ok(frames)
    }

    /// Frame requests not yet fired or cancelled.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Frame requests issued so far.
    #[must_use]
    pub const fn frames_requested(&self) -> u64 {
        self.next_frame
    }

    /// Frame requests cancelled so far.
    #[must_use]
    pub const fn frames_cancelled(&self) -> u64 {
        self.frames_cancelled
    }

    /// The container's current translation.
    #[must_use]
    pub fn translation(&self) -> Option<Vec2> {
        self.translations.last().copied().flatten()
    }

    /// Every translation applied, in order. `None` entries are resets.
    #[must_use]
    pub fn translations(&self) -> &[Option<Vec2>] {
        &self.translations
    }

    /// Overlays currently attached.
    #[must_use]
    pub const fn live_surfaces(&self) -> usize {
        self.live_surfaces
    }

    /// Resize listeners currently registered.
    #[must_use]
    pub fn resize_listeners(&self) -> usize {
        self.resize_listeners.len()
    }
}

impl FrameScheduler for HeadlessHost {
    fn request_frame(&mut self) -> FrameRequest {
        self.next_frame += 1;
        let request = FrameRequest(self.next_frame);
        self.frames.push_back(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        let before = self.frames.len();
        self.frames.retain(|r| *r != request);
        self.frames_cancelled += (before - self.frames.len()) as u64;
    }
}

impl TerminalHost for HeadlessHost {
    type Surface = PixelCanvas;

    fn now(&self) -> Duration {
        self.clock
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn container_origin(&self) -> Vec2 {
        self.origin
    }

    fn translate_container(&mut self, offset: Option<Vec2>) {
        self.translations.push(offset);
    }

    fn create_surface(&mut self, spec: &SurfaceSpec) -> SurfaceResult<PixelCanvas> {
        if let Some(error) = self.surface_failure.take() {
            return Err(error);
        }
        self.live_surfaces += 1;
        Ok(PixelCanvas::new(spec.width, spec.height))
    }

    fn remove_surface(&mut self, _surface: PixelCanvas) {
        self.live_surfaces = self.live_surfaces.saturating_sub(1);
    }

    fn watch_resize(&mut self) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.resize_listeners.push(id);
        id
    }

    fn unwatch_resize(&mut self, id: ListenerId) {
        self.resize_listeners.retain(|l| *l != id);
    }
}

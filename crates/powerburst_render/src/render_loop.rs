//! # Render Loop
//!
//! A self-idling frame driver. It asks the host for a frame only while there
//! is something to animate:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     FRAME STATE MACHINE                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │   Idle ──── arm / request_redraw ────► Scheduled            │
//! │    ▲                                      │                 │
//! │    │                              begin_frame (callback)    │
//! │    │                                      │                 │
//! │    │                                  render()              │
//! │    │                                      │                 │
//! │    └──── end_frame(inactive) ◄────────────┤                 │
//! │                                           │                 │
//! │              Scheduled ◄── end_frame(active / redraw)       │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! One frame request is in flight at most. The next one is requested from
//! inside the current frame, never re-entered.

use powerburst_core::ParticleSystem;
use rand::Rng;

use crate::schedule::{FrameRequest, FrameScheduler};
use crate::surface::{PixelRect, Rgba, Surface};

/// Whether a frame callback is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    /// Nothing pending. The loop costs nothing.
    #[default]
    Idle,
    /// A frame callback has been requested and not yet run.
    Scheduled(FrameRequest),
}

/// Outcome of one [`RenderLoop::render`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameResult {
    /// Frame number, starting at 1.
    pub frame_number: u64,
    /// The surface was cleared before drawing.
    pub cleared: bool,
    /// Squares drawn.
    pub drawn: u32,
    /// Particles alive after the tick.
    pub remaining: u32,
    /// A redraw request was consumed by this frame.
    pub redraw: bool,
}

/// Counters across the loop's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderLoopStats {
    /// Frames rendered.
    pub frames: u64,
    /// Frames that cleared the surface.
    pub clears: u64,
    /// Squares drawn.
    pub squares: u64,
    /// Frame requests issued.
    pub requests: u64,
    /// Scheduled → Idle transitions.
    pub idle_transitions: u64,
    /// Frame callbacks that arrived while idle and were ignored.
    pub spurious_frames: u64,
}

/// The per-frame draw cycle.
#[derive(Debug, Default)]
pub struct RenderLoop {
    state: FrameState,
    needs_redraw: bool,
    redraw_in_frame: bool,
    frame_count: u64,
    stats: RenderLoopStats,
}

impl RenderLoop {
    /// Creates an idle loop.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> FrameState {
        self.state
    }

    /// True if a frame callback is pending.
    #[must_use]
    pub const fn is_scheduled(&self) -> bool {
        matches!(self.state, FrameState::Scheduled(_))
    }

    /// The pending request, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<FrameRequest> {
        match self.state {
            FrameState::Scheduled(request) => Some(request),
            FrameState::Idle => None,
        }
    }

    /// True if a redraw was requested and no frame has consumed it yet.
    #[must_use]
    pub const fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> RenderLoopStats {
        self.stats
    }

    /// Frames rendered so far.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Schedules a frame if none is pending. Returns `true` if a new request
    /// was issued.
    pub fn arm<F: FrameScheduler + ?Sized>(&mut self, scheduler: &mut F) -> bool {
        if self.is_scheduled() {
            return false;
        }
        let request = scheduler.request_frame();
        self.stats.requests += 1;
        self.state = FrameState::Scheduled(request);
        tracing::trace!("render loop armed ({})", request);
        true
    }

    /// Marks the surface as needing a repaint and makes sure a frame runs.
    pub fn request_redraw<F: FrameScheduler + ?Sized>(&mut self, scheduler: &mut F) {
        self.needs_redraw = true;
        self.arm(scheduler);
    }

    /// Enters a frame callback.
    ///
    /// Returns `false` if the loop was idle: the callback is stale (for
    /// example it fired after a cancel) and the frame must be skipped.
    pub fn begin_frame(&mut self) -> bool {
        match self.state {
            FrameState::Scheduled(_) => {
                self.state = FrameState::Idle;
                self.redraw_in_frame = std::mem::take(&mut self.needs_redraw);
                true
            }
            FrameState::Idle => {
                self.stats.spurious_frames += 1;
                false
            }
        }
    }

    /// Clears, ticks and draws one frame.
    ///
    /// The surface is cleared only when particles exist going in. Each
    /// survivor is drawn as a `particle_size` square at its rounded position,
    /// shifted up and left by half the size.
    #[allow(clippy::cast_possible_truncation)]
    pub fn render<S, R>(
        &mut self,
        surface: &mut S,
        particles: &mut ParticleSystem<R>,
        particle_size: u32,
    ) -> FrameResult
    where
        S: Surface + ?Sized,
        R: Rng,
    {
        self.frame_count += 1;
        self.stats.frames += 1;

        let cleared = !particles.is_empty();
        if cleared {
            surface.clear();
            self.stats.clears += 1;
        }

        particles.tick();

        let half = f64::from(particle_size / 2);
        let mut drawn = 0u32;
        for particle in particles.particles() {
            let x = (particle.position.x - half).round() as i32;
            let y = (particle.position.y - half).round() as i32;
            surface.fill_rect(
                PixelRect::square(x, y, particle_size),
                Rgba::new(particle.color, particle.alpha),
            );
            drawn += 1;
        }
        self.stats.squares += u64::from(drawn);

        FrameResult {
            frame_number: self.frame_count,
            cleared,
            drawn,
            remaining: u32::try_from(particles.len()).unwrap_or(u32::MAX),
            redraw: self.redraw_in_frame,
        }
    }

    /// Leaves a frame callback.
    ///
    /// Requests the next frame if `active` (particles remain or the caller has
    /// other frame-driven work) or a redraw arrived during this frame.
    /// Otherwise the loop goes idle until the next [`RenderLoop::arm`].
    pub fn end_frame<F: FrameScheduler + ?Sized>(
        &mut self,
        active: bool,
        scheduler: &mut F,
    ) -> FrameState {
        self.redraw_in_frame = false;
        if active || self.needs_redraw {
            self.arm(scheduler);
        } else if !self.is_scheduled() {
            self.stats.idle_transitions += 1;
            tracing::trace!("render loop idle after frame {}", self.frame_count);
        }
        self.state
    }

    /// Cancels any pending frame and drops redraw requests.
    pub fn halt<F: FrameScheduler + ?Sized>(&mut self, scheduler: &mut F) {
        if let FrameState::Scheduled(request) = self.state {
            scheduler.cancel_frame(request);
            tracing::trace!("render loop halted ({} cancelled)", request);
        }
        self.state = FrameState::Idle;
        self.needs_redraw = false;
        self.redraw_in_frame = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{CommandSurface, DrawCommand, PixelCanvas};
    use powerburst_core::{ParticleLimits, Palette, Rgb, Vec2};

    #[derive(Default)]
    struct Frames {
        next: u64,
        pending: Vec<FrameRequest>,
    }

    impl FrameScheduler for Frames {
        fn request_frame(&mut self) -> FrameRequest {
            self.next += 1;
            let request = FrameRequest(self.next);
            self.pending.push(request);
            request
        }

        fn cancel_frame(&mut self, request: FrameRequest) {
            self.pending.retain(|r| *r != request);
        }
    }

    fn system(count: u32) -> ParticleSystem {
        ParticleSystem::with_seed(ParticleLimits::fixed(count, 500), 7)
    }

    fn red() -> Palette {
        Palette::new(vec![Rgb::new(255, 0, 0)])
    }

    #[test]
    fn test_arm_is_idempotent() {
        let mut frames = Frames::default();
        let mut render_loop = RenderLoop::new();
        assert!(render_loop.arm(&mut frames));
        assert!(!render_loop.arm(&mut frames));
        assert_eq!(frames.pending.len(), 1);
        assert_eq!(render_loop.pending(), Some(FrameRequest(1)));
    }

    #[test]
    fn test_empty_frame_does_not_clear() {
        let mut surface = CommandSurface::new(50, 50);
        let mut particles = system(3);
        let mut render_loop = RenderLoop::new();

        let result = render_loop.render(&mut surface, &mut particles, 3);
        assert!(!result.cleared);
        assert_eq!(result.drawn, 0);
        assert!(surface.commands().is_empty());
    }

    #[test]
    fn test_frame_clears_then_draws_offset_squares() {
        let mut surface = CommandSurface::new(200, 200);
        let mut particles = system(2);
        particles.spawn(Vec2::new(100.0, 100.0), &red()).unwrap();
        let expected: Vec<_> = {
            let mut preview = system(2);
            preview.spawn(Vec2::new(100.0, 100.0), &red()).unwrap();
            preview.tick();
            preview
                .particles()
                .map(|p| (p.position.x - 1.0).round() as i32)
                .collect()
        };

        let mut render_loop = RenderLoop::new();
        let result = render_loop.render(&mut surface, &mut particles, 3);
        assert!(result.cleared);
        assert_eq!(result.drawn, 2);

        let commands = surface.commands();
        assert_eq!(commands[0], DrawCommand::Clear);
        let xs: Vec<_> = commands[1..]
            .iter()
            .map(|c| match c {
                DrawCommand::FillRect { rect, color } => {
                    assert_eq!(rect.width, 3);
                    assert!((color.alpha - 0.96).abs() < 1e-12);
                    rect.x
                }
                DrawCommand::Clear => panic!("unexpected clear"),
            })
            .collect();
        assert_eq!(xs, expected);
    }

    #[test]
    fn test_loop_idles_when_particles_fade() {
        let mut frames = Frames::default();
        let mut canvas = PixelCanvas::new(64, 64);
        let mut particles = system(4);
        let mut render_loop = RenderLoop::new();

        particles.spawn(Vec2::new(32.0, 60.0), &red()).unwrap();
        render_loop.arm(&mut frames);

        let mut frames_run = 0;
        while let Some(request) = frames.pending.pop() {
            assert_eq!(render_loop.pending(), Some(request));
            assert!(render_loop.begin_frame());
            let result = render_loop.render(&mut canvas, &mut particles, 3);
            render_loop.end_frame(result.remaining > 0, &mut frames);
            frames_run += 1;
            assert!(frames_run < 100);
        }

        assert_eq!(render_loop.state(), FrameState::Idle);
        assert_eq!(frames_run, 57);
        assert!(particles.is_empty());
        assert!(canvas.is_blank());
        assert_eq!(render_loop.stats().idle_transitions, 1);
    }

    #[test]
    fn test_redraw_keeps_empty_loop_alive_once() {
        let mut frames = Frames::default();
        let mut surface = CommandSurface::new(10, 10);
        let mut particles = system(1);
        let mut render_loop = RenderLoop::new();

        render_loop.request_redraw(&mut frames);
        assert!(render_loop.needs_redraw());
        assert!(render_loop.begin_frame());
        assert!(!render_loop.needs_redraw());
        let result = render_loop.render(&mut surface, &mut particles, 3);
        assert!(result.redraw);
        assert_eq!(
            render_loop.end_frame(false, &mut frames),
            FrameState::Idle
        );
    }

    #[test]
    fn test_redraw_during_frame_reschedules() {
        let mut frames = Frames::default();
        let mut render_loop = RenderLoop::new();
        render_loop.arm(&mut frames);
        assert!(render_loop.begin_frame());
        render_loop.request_redraw(&mut frames);
        assert!(render_loop.is_scheduled());
        assert!(matches!(
            render_loop.end_frame(false, &mut frames),
            FrameState::Scheduled(_)
        ));
        assert_eq!(frames.pending.len(), 2);
        assert_eq!(render_loop.stats().requests, 2);
    }

    #[test]
    fn test_stale_callback_is_skipped() {
        let mut render_loop = RenderLoop::new();
        assert!(!render_loop.begin_frame());
        assert_eq!(render_loop.stats().spurious_frames, 1);
    }

    #[test]
    fn test_halt_cancels_pending() {
        let mut frames = Frames::default();
        let mut render_loop = RenderLoop::new();
        render_loop.request_redraw(&mut frames);
        render_loop.halt(&mut frames);
        assert!(frames.pending.is_empty());
        assert_eq!(render_loop.state(), FrameState::Idle);
        assert!(!render_loop.needs_redraw());
    }
}

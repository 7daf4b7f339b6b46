//! # Effect Controller
//!
//! Wires cursor events, settings, the particle system and the frame loop
//! together and owns the overlay's lifecycle.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         EVENT TIMELINE                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  cursor_moved(frame)                                             │
//! │    ├── host hook                                                 │
//! │    ├── shake        (≤ 1 per 100 ms, reverted after 75 ms)       │
//! │    ├── origin = frame offset + container origin                  │
//! │    └── hold spawn (first since last frame), arm loop             │
//! │                                                                  │
//! │  on_frame()                                                      │
//! │    ├── clear? ─ tick ─ draw                                      │
//! │    ├── take held spawn (≤ 1 burst per 25 ms)                     │
//! │    ├── revert shake if due                                       │
//! │    └── re-arm while particles or a shake remain                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Settings are read through a [`SettingsHandle`] that a configuration
//! subscription replaces wholesale on every change.

use std::sync::Arc;
use std::time::Duration;

use powerburst_core::{
    resolve, ConfigProvider, EffectSettings, ParticleLimits, ParticleStats, ParticleSystem,
    SettingsHandle, SettingsStore, SpawnError, Subscription, Throttle, Vec2,
};
use powerburst_render::{
    FrameResult, FrameState, RenderLoop, RenderLoopStats, Surface, SurfaceError, SurfaceSpec,
};
use rand_chacha::ChaCha8Rng;

use crate::error::{EffectError, EffectResult};
use crate::hooks::HostHooks;
use crate::host::{CursorFrame, ListenerId, TerminalHost, Viewport};
use crate::shake::ShakeEffect;

/// Minimum time between two bursts.
pub const SPAWN_INTERVAL: Duration = Duration::from_millis(25);

/// A spawn waiting for the next frame boundary.
#[derive(Debug, Clone)]
struct PendingSpawn {
    origin: Vec2,
    cursor_color: Option<String>,
}

/// What one [`EffectController::on_frame`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    /// The draw pass.
    pub frame: FrameResult,
    /// Bursts spawned after drawing.
    pub bursts: u32,
    /// Particles created by those bursts.
    pub spawned: u32,
    /// Spawns dropped by the spawn window or superseded before the frame.
    pub spawns_dropped: u32,
    /// The container translation was reset.
    pub shake_reverted: bool,
    /// Loop state after the frame.
    pub state: FrameState,
}

/// Counters across the controller's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EffectStats {
    /// Particle system counters.
    pub particles: ParticleStats,
    /// Frame loop counters.
    pub render: RenderLoopStats,
    /// Shakes started.
    pub shakes: u64,
    /// Shakes dropped by the shake window.
    pub shakes_dropped: u64,
    /// Spawns admitted by the spawn window.
    pub spawns_admitted: u64,
    /// Spawns dropped by the spawn window or superseded before a frame.
    pub spawns_dropped: u64,
    /// Settings reloads seen.
    pub settings_version: u64,
}

/// The cursor particle effect attached to one terminal.
pub struct EffectController<H: TerminalHost> {
    settings: SettingsHandle,
    _subscription: Subscription,
    particles: ParticleSystem<ChaCha8Rng>,
    render_loop: RenderLoop,
    spawn_throttle: Throttle,
    shake: ShakeEffect,
    pending: Option<PendingSpawn>,
    superseded: u32,
    superseded_total: u64,
    surface: Option<H::Surface>,
    resize_listener: Option<ListenerId>,
    hooks: HostHooks,
}

impl<H: TerminalHost> EffectController<H> {
    /// Creates a detached controller reading settings from `config`.
    ///
    /// Randomness is seeded from OS entropy.
    pub fn new<P: ConfigProvider + ?Sized>(config: &P) -> Self {
        Self::with_particles(config, ParticleSystem::new)
    }

    /// Creates a detached controller with reproducible randomness.
    pub fn with_seed<P: ConfigProvider + ?Sized>(config: &P, seed: u64) -> Self {
        Self::with_particles(config, |limits| ParticleSystem::with_seed(limits, seed))
    }

    fn with_particles<P: ConfigProvider + ?Sized>(
        config: &P,
        build: impl FnOnce(ParticleLimits) -> ParticleSystem<ChaCha8Rng>,
    ) -> Self {
        let initial = SettingsStore::load_root(&config.current());
        let limits = ParticleLimits::from(&initial);
        let settings = SettingsHandle::new(initial);

        let listener = settings.clone();
        let subscription = config.on_change(Box::new(move |document| {
            listener.reload(document);
        }));

        Self {
            settings,
            _subscription: subscription,
            particles: build(limits),
            render_loop: RenderLoop::new(),
            spawn_throttle: Throttle::new(SPAWN_INTERVAL),
            shake: ShakeEffect::new(),
            pending: None,
            superseded: 0,
            superseded_total: 0,
            surface: None,
            resize_listener: None,
            hooks: HostHooks::new(),
        }
    }

    /// Wraps the host's own callbacks. They run before the effect's handling.
    #[must_use]
    pub fn with_hooks(mut self, hooks: HostHooks) -> Self {
        self.hooks = hooks;
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Host "decorated" notification: runs the host hook, then attaches.
    ///
    /// Attach failures are logged and leave the effect inactive. The host is
    /// never affected. Returns whether the effect is attached.
    pub fn decorated(&mut self, host: &mut H) -> bool {
        self.hooks.decorated();
        if let Err(error) = self.attach(host) {
            tracing::warn!("cursor effect disabled: {}", error);
        }
        self.is_attached()
    }

    /// Creates the overlay, watches resizes and arms the loop.
    ///
    /// Attaching twice is a no-op.
    ///
    /// # Errors
    ///
    /// [`EffectError::Surface`] if the viewport is empty or the host cannot
    /// create the overlay. Nothing is left registered in that case.
    pub fn attach(&mut self, host: &mut H) -> EffectResult<()> {
        if self.surface.is_some() {
            return Ok(());
        }

        let Viewport { width, height } = host.viewport();
        if width == 0 || height == 0 {
            return Err(SurfaceError::ZeroSized { width, height }.into());
        }

        let surface = host.create_surface(&SurfaceSpec::overlay(width, height))?;
        self.surface = Some(surface);
        self.resize_listener = Some(host.watch_resize());
        self.render_loop.arm(host);

        tracing::info!("cursor effect attached ({}x{})", width, height);
        Ok(())
    }

    /// Tears everything down: pending frame, overlay, resize listener,
    /// container translation, particles and the held spawn.
    pub fn detach(&mut self, host: &mut H) {
        self.render_loop.halt(host);

        if let Some(id) = self.resize_listener.take() {
            host.unwatch_resize(id);
        }
        if self.shake.cancel() {
            host.translate_container(None);
        }

        self.particles.clear();
        self.pending = None;
        self.superseded = 0;
        self.spawn_throttle.reset();

        if let Some(surface) = self.surface.take() {
            host.remove_surface(surface);
            tracing::info!("cursor effect detached");
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Host cursor-move event.
    ///
    /// Runs the host hook, then shakes (if enabled) and holds a burst at the
    /// cursor's surface position. The burst is spawned on the next frame.
    /// Only the first event between two frames is held. Later ones are
    /// counted as dropped.
    pub fn cursor_moved(&mut self, host: &mut H, frame: &CursorFrame) {
        self.hooks.cursor_moved(frame);
        if self.surface.is_none() {
            return;
        }

        let now = host.now();
        if self.settings.snapshot().shake {
            if let Some(offset) = self.shake.trigger(now, self.particles.rng_mut()) {
                host.translate_container(Some(offset));
            }
        }

        if self.pending.is_some() {
            self.superseded += 1;
            self.superseded_total += 1;
        } else {
            let origin = host.container_origin();
            self.pending = Some(PendingSpawn {
                origin: Vec2::new(frame.x + origin.x, frame.y + origin.y),
                cursor_color: frame.cursor_color.clone(),
            });
        }
        self.render_loop.arm(host);
    }

    /// Host resize notification. The overlay takes the new viewport size and
    /// surviving particles are redrawn.
    pub fn on_resize(&mut self, host: &mut H) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let Viewport { width, height } = host.viewport();
        surface.resize(width, height);
        self.render_loop.request_redraw(host);
        tracing::debug!("overlay resized to {}x{}", width, height);
    }

    /// Asks for a repaint on the next frame.
    pub fn request_redraw(&mut self, host: &mut H) {
        if self.surface.is_some() {
            self.render_loop.request_redraw(host);
        }
    }

    /// Host frame callback.
    ///
    /// Returns `Ok(None)` for a stale callback (the loop was not scheduled).
    ///
    /// # Errors
    ///
    /// [`EffectError::Spawn`] if the held burst could not be colored. The
    /// frame itself still completes and the loop keeps its schedule.
    /// [`EffectError::NotAttached`] if a frame arrives with no overlay.
    pub fn on_frame(&mut self, host: &mut H) -> EffectResult<Option<FrameReport>> {
        if !self.render_loop.begin_frame() {
            return Ok(None);
        }
        let Some(surface) = self.surface.as_mut() else {
            return Err(EffectError::NotAttached);
        };

        let settings = self.settings.snapshot();
        self.particles.set_limits(ParticleLimits::from(&*settings));
        let frame = self
            .render_loop
            .render(surface, &mut self.particles, settings.particle_size);

        let now = host.now();
        let mut report = FrameReport {
            frame,
            spawns_dropped: std::mem::take(&mut self.superseded),
            ..FrameReport::default()
        };
        let mut failure = None;
        if let Some(pending) = self.pending.take() {
            if self.spawn_throttle.try_admit(now) {
                match spawn_burst(&mut self.particles, &settings, &pending) {
                    Ok(count) => {
                        report.bursts += 1;
                        report.spawned += count;
                    }
                    Err(error) => {
                        tracing::warn!("dropping burst at {:?}: {}", pending.origin, error);
                        failure = Some(error);
                    }
                }
            } else {
                report.spawns_dropped += 1;
            }
        }

        report.shake_reverted = self.shake.revert_if_due(now);
        if report.shake_reverted {
            host.translate_container(None);
        }

        let active = !self.particles.is_empty() || self.shake.is_pending();
        report.state = self.render_loop.end_frame(active, host);

        match failure {
            Some(error) => Err(error.into()),
            None => Ok(Some(report)),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// True while the overlay exists.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    /// The overlay, if attached.
    #[must_use]
    pub fn surface(&self) -> Option<&H::Surface> {
        self.surface.as_ref()
    }

    /// The current settings snapshot.
    #[must_use]
    pub fn settings(&self) -> Arc<EffectSettings> {
        self.settings.snapshot()
    }

    /// The live particle set.
    #[must_use]
    pub fn particles(&self) -> &ParticleSystem<ChaCha8Rng> {
        &self.particles
    }

    /// The frame loop.
    #[must_use]
    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    /// The shake state.
    #[must_use]
    pub fn shake(&self) -> &ShakeEffect {
        &self.shake
    }

    /// Spawns held for the next frame: zero or one.
    #[must_use]
    pub fn pending_spawns(&self) -> usize {
        usize::from(self.pending.is_some())
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> EffectStats {
        EffectStats {
            particles: self.particles.stats(),
            render: self.render_loop.stats(),
            shakes: self.shake.shakes(),
            shakes_dropped: self.shake.dropped(),
            spawns_admitted: self.spawn_throttle.admitted(),
            spawns_dropped: self.spawn_throttle.dropped() + self.superseded_total,
            settings_version: self.settings.version(),
        }
    }
}

/// Resolves the palette fresh for this burst and spawns it.
fn spawn_burst(
    particles: &mut ParticleSystem<ChaCha8Rng>,
    settings: &EffectSettings,
    pending: &PendingSpawn,
) -> Result<u32, SpawnError> {
    let palette = resolve(
        settings.color_mode,
        settings.colors.as_slice(),
        pending.cursor_color.as_deref(),
    )?;
    particles.spawn(pending.origin, &palette)
}

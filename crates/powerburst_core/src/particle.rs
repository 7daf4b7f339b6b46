//! # Particle System
//!
//! Owns the live particle set for one surface.
//!
//! ```text
//! spawn(origin, palette)          tick()
//! ──────────────────────          ──────────────────────────────────
//! count ∈ [min, max]              vy += GRAVITY
//! color = palette[i % len]        x  += vx, y += vy
//! vx ∈ [-1, 1), vy ∈ [-3.5, -1.5) alpha *= FADE        (exponential)
//! alpha = 1                       evict alpha <= FADE_THRESHOLD
//! push back, evict front > cap    evict front while len > cap
//! ```
//!
//! Particles are kept in spawn order, so the front of the deque is always
//! the oldest and overflow eviction is a plain `pop_front`.
//!
//! Randomness comes from the injected generator. Seed it for reproducible
//! bursts; production builds seed from OS entropy.

use std::collections::VecDeque;
use std::ops::Range;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::color::{Palette, Rgb};
use crate::error::{SpawnError, SpawnResult};
use crate::settings::EffectSettings;

/// Downward acceleration added to vertical velocity every tick.
pub const GRAVITY: f64 = 0.075;
/// Multiplier applied to alpha every tick.
pub const FADE: f64 = 0.96;
/// Particles at or below this alpha are evicted.
pub const FADE_THRESHOLD: f64 = 0.1;
/// Initial horizontal velocity range.
pub const VELOCITY_X: Range<f64> = -1.0..1.0;
/// Initial vertical velocity range. Negative is up.
pub const VELOCITY_Y: Range<f64> = -3.5..-1.5;
/// Upper bound on the storage reserved up front. Larger caps grow on demand.
const INITIAL_CAPACITY: u32 = 1024;

/// A 2D vector in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component, growing downwards.
    pub y: f64,
}

impl Vec2 {
    /// Creates a vector.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A single particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Position in surface pixels.
    pub position: Vec2,
    /// Velocity in pixels per tick.
    pub velocity: Vec2,
    /// Opacity in `(0, 1]`.
    pub alpha: f64,
    /// Fill color, fixed for the particle's lifetime.
    pub color: Rgb,
}

impl Particle {
    /// Advances one tick: gravity, integration, fade.
    #[inline]
    pub fn step(&mut self) {
        self.velocity.y += GRAVITY;
        self.position.x += self.velocity.x;
        self.position.y += self.velocity.y;
        self.alpha *= FADE;
    }

    /// True while the particle is visible enough to keep.
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alpha > FADE_THRESHOLD
    }
}

/// Number of ticks a fresh particle survives before fading out.
///
/// This is `ceil(ln(FADE_THRESHOLD) / ln(FADE))`: the tick on which alpha
/// first reaches the threshold, and the particle is evicted.
#[must_use]
pub fn ticks_to_fade() -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let ticks = (FADE_THRESHOLD.ln() / FADE.ln()).ceil() as u32;
    ticks
}

/// The part of [`EffectSettings`] the simulation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleLimits {
    /// Fewest particles per burst.
    pub min_spawn: u32,
    /// Most particles per burst.
    pub max_spawn: u32,
    /// Cap on the live set.
    pub max_particles: u32,
}

impl ParticleLimits {
    /// Limits for a fixed burst size.
    #[must_use]
    pub const fn fixed(count: u32, max_particles: u32) -> Self {
        Self {
            min_spawn: count,
            max_spawn: count,
            max_particles,
        }
    }
}

impl From<&EffectSettings> for ParticleLimits {
    fn from(settings: &EffectSettings) -> Self {
        Self {
            min_spawn: settings.min_spawn_count,
            max_spawn: settings.max_spawn_count.max(settings.min_spawn_count),
            max_particles: settings.maximum_particles,
        }
    }
}

impl Default for ParticleLimits {
    fn default() -> Self {
        Self::from(&EffectSettings::default())
    }
}

/// Counters for the particle system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParticleStats {
    /// Particles currently alive.
    pub alive: u32,
    /// Particles spawned since creation.
    pub spawned_total: u64,
    /// Particles removed because they faded out.
    pub faded_total: u64,
    /// Particles removed because the live set was over the cap.
    pub overflow_total: u64,
    /// Bursts spawned since creation.
    pub bursts: u64,
}

/// The live particle set plus its random source.
pub struct ParticleSystem<R = ChaCha8Rng> {
    particles: VecDeque<Particle>,
    limits: ParticleLimits,
    rng: R,
    stats: ParticleStats,
}

impl ParticleSystem<ChaCha8Rng> {
    /// Creates a system seeded from OS entropy.
    #[must_use]
    pub fn new(limits: ParticleLimits) -> Self {
        Self::with_rng(limits, ChaCha8Rng::from_entropy())
    }

    /// Creates a system with a reproducible seed.
    #[must_use]
    pub fn with_seed(limits: ParticleLimits, seed: u64) -> Self {
        Self::with_rng(limits, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> ParticleSystem<R> {
    /// Creates a system drawing randomness from `rng`.
    pub fn with_rng(limits: ParticleLimits, rng: R) -> Self {
        let capacity = limits.max_particles.min(INITIAL_CAPACITY) as usize;
        Self {
            particles: VecDeque::with_capacity(capacity),
            limits,
            rng,
            stats: ParticleStats::default(),
        }
    }

    /// Replaces the limits. Takes effect on the next spawn or tick.
    pub fn set_limits(&mut self, limits: ParticleLimits) {
        self.limits = limits;
    }

    /// The current limits.
    #[must_use]
    pub fn limits(&self) -> ParticleLimits {
        self.limits
    }

    /// Spawns one burst at `origin`. Returns the number of particles created.
    ///
    /// # Errors
    ///
    /// [`SpawnError::EmptyPalette`] if `palette` has no colors. Nothing is
    /// spawned in that case.
    pub fn spawn(&mut self, origin: Vec2, palette: &Palette) -> SpawnResult<u32> {
        if palette.is_empty() {
            return Err(SpawnError::EmptyPalette);
        }

        let ParticleLimits {
            min_spawn,
            max_spawn,
            ..
        } = self.limits;
        let count = if min_spawn >= max_spawn {
            min_spawn
        } else {
            self.rng.gen_range(min_spawn..=max_spawn)
        };

        // Only the newest `cap` particles of a burst can survive. The rest
        // still draw their velocities so the random sequence is unchanged.
        let cap = self.limits.max_particles as usize;
        let skipped = (count as usize).saturating_sub(cap);
        self.stats.overflow_total += skipped as u64;

        for i in 0..count as usize {
            let Some(color) = palette.cycle(i) else {
                return Err(SpawnError::EmptyPalette);
            };
            let velocity = Vec2::new(
                self.rng.gen_range(VELOCITY_X),
                self.rng.gen_range(VELOCITY_Y),
            );
            if i < skipped {
                continue;
            }
            if self.particles.len() >= cap {
                self.particles.pop_front();
                self.stats.overflow_total += 1;
            }
            self.particles.push_back(Particle {
                position: origin,
                velocity,
                alpha: 1.0,
                color,
            });
        }

        self.stats.spawned_total += u64::from(count);
        self.stats.bursts += 1;
        self.enforce_cap();
        Ok(count)
    }

    /// Advances every particle one tick and evicts the dead.
    ///
    /// Returns `true` if any particles remain. On an empty set this does
    /// nothing and returns `false`.
    pub fn tick(&mut self) -> bool {
        if self.particles.is_empty() {
            return false;
        }

        for particle in &mut self.particles {
            particle.step();
        }

        let before = self.particles.len();
        self.particles.retain(Particle::is_alive);
        self.stats.faded_total += (before - self.particles.len()) as u64;

        self.enforce_cap();
        !self.particles.is_empty()
    }

    fn enforce_cap(&mut self) {
        let cap = self.limits.max_particles as usize;
        let excess = self.particles.len().saturating_sub(cap);
        if excess > 0 {
            self.particles.drain(..excess);
            self.stats.overflow_total += excess as u64;
        }
        self.stats.alive = u32::try_from(self.particles.len()).unwrap_or(u32::MAX);
    }

    /// The live particles, oldest first.
    pub fn particles(&self) -> impl ExactSizeIterator<Item = &Particle> + '_ {
        self.particles.iter()
    }

    /// Number of live particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// True if no particles are alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Removes every particle.
    pub fn clear(&mut self) {
        self.particles.clear();
        self.stats.alive = 0;
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> ParticleStats {
        self.stats
    }

    /// Mutable access to the random source, for effects that share it.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}

impl Default for ParticleSystem<ChaCha8Rng> {
    fn default() -> Self {
        Self::new(ParticleLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Palette {
        Palette::new(vec![Rgb::new(255, 0, 0), Rgb::new(0, 255, 0), Rgb::new(0, 0, 255)])
    }

    fn system(limits: ParticleLimits) -> ParticleSystem {
        ParticleSystem::with_seed(limits, 7)
    }

    #[test]
    fn test_fixed_count_spawn() {
        for n in [0, 1, 10, 37] {
            let mut sys = system(ParticleLimits::fixed(n, 1000));
            assert_eq!(sys.spawn(Vec2::new(5.0, 5.0), &palette()).unwrap(), n);
            assert_eq!(sys.len(), n as usize);
        }
    }

    #[test]
    fn test_count_within_range() {
        let mut sys = system(ParticleLimits {
            min_spawn: 10,
            max_spawn: 12,
            max_particles: 100_000,
        });
        for _ in 0..200 {
            let n = sys.spawn(Vec2::default(), &palette()).unwrap();
            assert!((10..=12).contains(&n));
        }
    }

    #[test]
    fn test_colors_cycle_palette() {
        let mut sys = system(ParticleLimits::fixed(7, 100));
        sys.spawn(Vec2::default(), &palette()).unwrap();
        let colors: Vec<Rgb> = sys.particles().map(|p| p.color).collect();
        let expected: Vec<Rgb> = (0..7).map(|i| palette().as_slice()[i % 3]).collect();
        assert_eq!(colors, expected);
    }

    #[test]
    fn test_initial_state() {
        let mut sys = system(ParticleLimits::fixed(200, 1000));
        sys.spawn(Vec2::new(10.0, 20.0), &palette()).unwrap();
        for p in sys.particles() {
            assert_eq!(p.position, Vec2::new(10.0, 20.0));
            assert!((p.alpha - 1.0).abs() < f64::EPSILON);
            assert!(VELOCITY_X.contains(&p.velocity.x));
            assert!(VELOCITY_Y.contains(&p.velocity.y));
        }
    }

    #[test]
    fn test_empty_palette_rejected() {
        let mut sys = system(ParticleLimits::fixed(3, 100));
        assert_eq!(
            sys.spawn(Vec2::default(), &Palette::default()),
            Err(SpawnError::EmptyPalette)
        );
        assert!(sys.is_empty());
    }

    #[test]
    fn test_physics_step() {
        let mut p = Particle {
            position: Vec2::new(0.0, 0.0),
            velocity: Vec2::new(1.0, -2.0),
            alpha: 1.0,
            color: Rgb::default(),
        };
        p.step();
        assert!((p.velocity.y - (-2.0 + GRAVITY)).abs() < 1e-12);
        assert!((p.position.x - 1.0).abs() < 1e-12);
        assert!((p.position.y - (-2.0 + GRAVITY)).abs() < 1e-12);
        assert!((p.alpha - FADE).abs() < 1e-12);
    }

    #[test]
    fn test_fade_out_tick_count() {
        assert_eq!(ticks_to_fade(), 57);

        let mut sys = system(ParticleLimits::fixed(1, 10));
        sys.spawn(Vec2::default(), &palette()).unwrap();
        for _ in 0..ticks_to_fade() - 1 {
            assert!(sys.tick());
        }
        assert!(!sys.tick());
        assert!(sys.is_empty());
        assert_eq!(sys.stats().faded_total, 1);
    }

    #[test]
    fn test_overflow_keeps_newest() {
        let mut sys = system(ParticleLimits::fixed(4, 10));
        for burst in 0..5u8 {
            let color = Palette::new(vec![Rgb::new(burst, 0, 0)]);
            sys.spawn(Vec2::default(), &color).unwrap();
        }
        assert_eq!(sys.len(), 10);
        let reds: Vec<u8> = sys.particles().map(|p| p.color.r).collect();
        assert_eq!(reds, vec![2, 2, 3, 3, 3, 3, 4, 4, 4, 4]);
        assert_eq!(sys.stats().overflow_total, 10);
    }

    #[test]
    fn test_burst_larger_than_cap_stays_within_cap() {
        let mut sys = system(ParticleLimits::fixed(100_000, 50));
        assert_eq!(sys.spawn(Vec2::default(), &palette()).unwrap(), 100_000);
        assert_eq!(sys.len(), 50);
        assert!(sys.particles.capacity() < 1024);
        assert_eq!(sys.stats().overflow_total, 99_950);
        assert_eq!(sys.stats().spawned_total, 100_000);

        // The survivors are the burst's tail, still colored by their index.
        let colors: Vec<Rgb> = sys.particles().map(|p| p.color).collect();
        let expected: Vec<Rgb> = (99_950..100_000).map(|i| palette().as_slice()[i % 3]).collect();
        assert_eq!(colors, expected);
    }

    #[test]
    fn test_burst_evicts_oldest_while_pushing() {
        let mut sys = system(ParticleLimits::fixed(3, 4));
        sys.spawn(Vec2::new(1.0, 0.0), &palette()).unwrap();
        sys.spawn(Vec2::new(2.0, 0.0), &palette()).unwrap();
        let xs: Vec<f64> = sys.particles().map(|p| p.position.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 2.0, 2.0]);
        assert_eq!(sys.stats().overflow_total, 2);
    }

    #[test]
    fn test_huge_cap_reserves_bounded_storage() {
        let sys = system(ParticleLimits::fixed(10, u32::MAX));
        assert!(sys.particles.capacity() <= INITIAL_CAPACITY as usize * 2);
        assert!(sys.is_empty());
    }

    #[test]
    fn test_cap_applied_on_tick_after_limit_change() {
        let mut sys = system(ParticleLimits::fixed(20, 100));
        sys.spawn(Vec2::default(), &palette()).unwrap();
        sys.set_limits(ParticleLimits::fixed(20, 5));
        assert!(sys.tick());
        assert_eq!(sys.len(), 5);
    }

    #[test]
    fn test_tick_on_empty_is_noop() {
        let mut sys = system(ParticleLimits::default());
        assert!(!sys.tick());
        assert!(!sys.tick());
        assert_eq!(sys.stats(), ParticleStats::default());
    }

    #[test]
    fn test_same_seed_same_burst() {
        let limits = ParticleLimits::default();
        let mut a = ParticleSystem::with_seed(limits, 99);
        let mut b = ParticleSystem::with_seed(limits, 99);
        a.spawn(Vec2::default(), &palette()).unwrap();
        b.spawn(Vec2::default(), &palette()).unwrap();
        assert!(a.particles().eq(b.particles()));
    }

    #[test]
    fn test_limits_from_settings() {
        let settings = EffectSettings {
            min_spawn_count: 3,
            max_spawn_count: 9,
            maximum_particles: 42,
            ..EffectSettings::default()
        };
        assert_eq!(
            ParticleLimits::from(&settings),
            ParticleLimits {
                min_spawn: 3,
                max_spawn: 9,
                max_particles: 42
            }
        );
    }
}

//! Screen shake.
//!
//! A short random translation of the terminal container, reverted 75 ms
//! later. At most one shake starts per 100 ms; calls inside the window are
//! dropped.

use std::time::Duration;

use powerburst_core::{Throttle, Vec2};
use rand::Rng;

/// Minimum shake window.
pub const SHAKE_INTERVAL: Duration = Duration::from_millis(100);

/// How long the container stays translated.
pub const SHAKE_DURATION: Duration = Duration::from_millis(75);

/// Throttled shake with a pending revert.
#[derive(Debug, Clone)]
pub struct ShakeEffect {
    throttle: Throttle,
    revert_at: Option<Duration>,
    offset: Option<Vec2>,
}

impl ShakeEffect {
    /// Creates an idle shake.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            throttle: Throttle::new(SHAKE_INTERVAL),
            revert_at: None,
            offset: None,
        }
    }

    /// Starts a shake at `now` if the window allows it.
    ///
    /// Returns the translation to apply. Magnitude is uniform in `[1, 3)`
    /// pixels, the sign is picked per axis.
    pub fn trigger<R: Rng>(&mut self, now: Duration, rng: &mut R) -> Option<Vec2> {
        if !self.throttle.try_admit(now) {
            return None;
        }
        let intensity = 1.0 + 2.0 * rng.gen::<f64>();
        let sign = |negative: bool| if negative { -1.0 } else { 1.0 };
        let offset = Vec2::new(
            intensity * sign(rng.gen_bool(0.5)),
            intensity * sign(rng.gen_bool(0.5)),
        );
        self.revert_at = Some(now + SHAKE_DURATION);
        self.offset = Some(offset);
        Some(offset)
    }

    /// True while a translation is applied and not yet reverted.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.revert_at.is_some()
    }

    /// The translation currently applied.
    #[must_use]
    pub const fn offset(&self) -> Option<Vec2> {
        self.offset
    }

    /// Clears the pending revert if it is due at `now`. Returns `true` if the
    /// caller must reset the container.
    pub fn revert_if_due(&mut self, now: Duration) -> bool {
        match self.revert_at {
            Some(at) if now >= at => self.cancel(),
            _ => false,
        }
    }

    /// Clears any pending revert immediately. Returns `true` if one was
    /// pending.
    pub fn cancel(&mut self) -> bool {
        self.offset = None;
        self.revert_at.take().is_some()
    }

    /// Shakes started so far.
    #[must_use]
    pub const fn shakes(&self) -> u64 {
        self.throttle.admitted()
    }

    /// Shake requests dropped by the window.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.throttle.dropped()
    }
}

impl Default for ShakeEffect {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_magnitude_and_axes() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for i in 0..200 {
            let mut shake = ShakeEffect::new();
            let offset = shake.trigger(ms(i), &mut rng).unwrap();
            assert!((1.0..3.0).contains(&offset.x.abs()));
            assert!((offset.x.abs() - offset.y.abs()).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_window_drops_trailing_calls() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut shake = ShakeEffect::new();
        assert!(shake.trigger(ms(0), &mut rng).is_some());
        assert!(shake.trigger(ms(50), &mut rng).is_none());
        assert!(shake.trigger(ms(99), &mut rng).is_none());
        assert!(shake.trigger(ms(100), &mut rng).is_some());
        assert_eq!(shake.shakes(), 2);
        assert_eq!(shake.dropped(), 2);
    }

    #[test]
    fn test_revert_after_duration() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut shake = ShakeEffect::new();
        shake.trigger(ms(10), &mut rng);
        assert!(shake.is_pending());
        assert!(!shake.revert_if_due(ms(84)));
        assert!(shake.revert_if_due(ms(85)));
        assert!(!shake.is_pending());
        assert!(shake.offset().is_none());
        assert!(!shake.revert_if_due(ms(200)));
    }

    #[test]
    fn test_cancel() {
        let mut shake = ShakeEffect::new();
        assert!(!shake.cancel());
        shake.trigger(ms(0), &mut ChaCha8Rng::seed_from_u64(4));
        assert!(shake.cancel());
    }
}

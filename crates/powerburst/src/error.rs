//! Controller error type.
//!
//! Spawn and surface errors funnel into [`EffectError`]. Configuration
//! errors stay with whoever loads the configuration. None of them is fatal
//! to the host: a surface failure leaves the controller detached, a spawn
//! failure drops that one burst.

use powerburst_core::SpawnError;
use powerburst_render::SurfaceError;
use thiserror::Error;

/// Errors surfaced by [`crate::EffectController`].
#[derive(Error, Debug)]
pub enum EffectError {
    /// A burst could not be spawned, usually a color typo in the settings.
    #[error("spawn failed: {0}")]
    Spawn(#[from] SpawnError),

    /// The drawing surface could not be created or attached.
    #[error("surface unavailable: {0}")]
    Surface(#[from] SurfaceError),

    /// A frame ran with no surface to draw on.
    #[error("effect is not attached to a surface")]
    NotAttached,
}

/// Result type for controller operations.
pub type EffectResult<T> = Result<T, EffectError>;

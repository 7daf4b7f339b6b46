//! # POWERBURST Core
//!
//! The simulation half of the cursor particle effect:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          CORE PIPELINE                        │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ConfigProvider ──► SettingsStore ──► EffectSettings snapshot │
//! │                                          │          │         │
//! │                                   ColorResolver  ParticleLimits│
//! │                                          │          │         │
//! │  spawn request ──► Throttle ──► ParticleSystem.spawn(palette) │
//! │                                          │                    │
//! │                       frame ──► ParticleSystem.tick()         │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here knows about surfaces, hosts or frames. The render crate
//! drives [`ParticleSystem::tick`]; the controller crate feeds spawns.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod color;
pub mod config;
mod css_names;
pub mod error;
pub mod particle;
pub mod settings;
pub mod throttle;

pub use color::{resolve, ColorMode, Palette, Rgb, RAINBOW};
pub use config::{ConfigListener, ConfigProvider, ConfigStore, Subscription};
pub use error::{ColorError, ConfigError, SpawnError};
pub use particle::{Particle, ParticleLimits, ParticleStats, ParticleSystem, Vec2};
pub use settings::{EffectSettings, SettingsHandle, SettingsStore, SETTINGS_SECTION};
pub use throttle::Throttle;

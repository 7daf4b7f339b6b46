//! # POWERBURST
//!
//! Particle bursts that follow the cursor of a terminal, plus an optional
//! screen shake.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         ARCHITECTURE                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │   TerminalHost ──cursor──► EffectController ◄──ConfigProvider│
//! │        ▲                        │                            │
//! │        │ frames                 ├── ShakeEffect              │
//! │        │ overlay                ├── ParticleSystem  (core)   │
//! │        └────────────────────────┴── RenderLoop      (render) │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use powerburst::{ConfigStore, CursorFrame, EffectController, HeadlessHost};
//!
//! let config = ConfigStore::from_toml_str("[powerburst]\ncolorMode = \"rainbow\"")?;
//! let mut host = HeadlessHost::new(800, 600);
//! let mut effect = EffectController::new(&config);
//! effect.decorated(&mut host);
//! effect.cursor_moved(&mut host, &CursorFrame::at(40.0, 20.0));
//! host.run_until_idle(&mut effect, 600)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod controller;
pub mod error;
pub mod headless;
pub mod hooks;
pub mod host;
pub mod shake;

pub use controller::{EffectController, EffectStats, FrameReport, SPAWN_INTERVAL};
pub use error::{EffectError, EffectResult};
pub use headless::{HeadlessHost, FRAME_INTERVAL};
pub use hooks::HostHooks;
pub use host::{CursorFrame, ListenerId, TerminalHost, Viewport};
pub use shake::{ShakeEffect, SHAKE_DURATION, SHAKE_INTERVAL};

pub use powerburst_core::{ColorMode, ConfigProvider, ConfigStore, EffectSettings};
pub use powerburst_render::{PixelCanvas, Surface, SurfaceError};

//! # POWERBURST Render
//!
//! Surfaces and the frame loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      RENDER PIPELINE                     │
//! ├──────────────────────────────────────────────────────────┤
//! │  FrameScheduler ──► RenderLoop.begin_frame()             │
//! │                          │                               │
//! │                     render(surface, particles, size)     │
//! │                          │  clear? ─ tick ─ fill_rect×N  │
//! │                          ▼                               │
//! │                     end_frame(active) ──► re-arm | idle  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop is host-agnostic: anything implementing [`Surface`] can be
//! painted, anything implementing [`FrameScheduler`] can drive it.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod render_loop;
pub mod schedule;
pub mod surface;

pub use render_loop::{FrameResult, FrameState, RenderLoop, RenderLoopStats};
pub use schedule::{FrameRequest, FrameScheduler};
pub use surface::{
    CommandSurface, DrawCommand, Pixel, PixelCanvas, PixelRect, QuadInstance, Rgba, Surface,
    SurfaceError, SurfaceResult, SurfaceSpec,
};

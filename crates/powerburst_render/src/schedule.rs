//! Frame scheduling primitive.
//!
//! The host owns the display refresh. It hands out "run this before the next
//! repaint" requests and lets pending ones be cancelled. The render loop never
//! holds more than one.

use std::fmt;

/// Handle to one pending frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequest(pub u64);

impl fmt::Display for FrameRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// The host's animation-frame scheduler.
pub trait FrameScheduler {
    /// Asks for one callback before the next repaint.
    fn request_frame(&mut self) -> FrameRequest;

    /// Withdraws a pending request. Unknown or already-fired requests are
    /// ignored.
    fn cancel_frame(&mut self, request: FrameRequest);
}

//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified events per second
pub fn create_limiter(per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Default cap on hand frames accepted from the local tracker
pub const DEFAULT_FRAME_RATE: u32 = 60;

/// Caps how many hand frames per second reach the classifier.
///
/// Frames over the cap are dropped, never buffered.
#[derive(Clone)]
pub struct FrameRateLimiter {
    limiter: Arc<Limiter>,
}

impl FrameRateLimiter {
    pub fn new(frames_per_second: u32) -> Self {
        Self {
            limiter: create_limiter(frames_per_second),
        }
    }

    /// Check if a frame is allowed (returns true if allowed)
    pub fn check_frame(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for FrameRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_RATE)
    }
}

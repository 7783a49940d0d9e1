//! Application state shared across routes

use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::Config;
use crate::game::SessionHandle;
use crate::util::rate_limit::FrameRateLimiter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: SessionHandle,
    pub frame_limiter: FrameRateLimiter,
    /// The one peer link allowed at a time
    peer_slot: Arc<Mutex<Option<Uuid>>>,
}

impl AppState {
    pub fn new(config: Config, session: SessionHandle) -> Self {
        let frame_limiter = FrameRateLimiter::new(config.max_frame_rate);
        Self {
            config: Arc::new(config),
            session,
            frame_limiter,
            peer_slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn peer_connected(&self) -> bool {
        self.peer_slot.lock().is_some()
    }

    /// Take the peer slot; false when another link holds it
    pub fn claim_peer(&self, link_id: Uuid) -> bool {
        let mut slot = self.peer_slot.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(link_id);
        true
    }

    pub fn release_peer(&self, link_id: Uuid) {
        let mut slot = self.peer_slot.lock();
        if *slot == Some(link_id) {
            *slot = None;
        }
    }
}

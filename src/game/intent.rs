//! Turning classified gestures into match intents
//!
//! Two paths with different re-entrancy rules: block is a level signal
//! sampled every frame, casts and punches are edge-triggered behind a lock.

use crate::gesture::{Action, GestureResult};
use crate::util::time::Millis;
use crate::ws::protocol::NetworkMessage;

use super::combat::{Spell, ACTION_CONFIDENCE_MIN, ACTION_LOCK_MS, BLOCK_CONFIDENCE_MIN};
use super::r#match::{ActionError, MatchPhase, MatchState};

/// A local action that went through
#[derive(Debug, Clone, PartialEq)]
pub struct Fired {
    pub action: Action,
    /// Event to relay to the peer, if the action is visible to them
    pub outbound: Option<NetworkMessage>,
}

#[derive(Debug, Default)]
pub struct IntentDispatcher {
    action_lock_until: Millis,
    /// Block button on the touch controls
    touch_hold: bool,
}

impl IntentDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self, now: Millis) -> bool {
        now < self.action_lock_until
    }

    pub fn reset(&mut self) {
        self.action_lock_until = 0;
        self.touch_hold = false;
    }

    /// Held path. Runs every frame, exempt from the action lock.
    /// Either the gesture or the touch button keeps the block up.
    pub fn update_blocking(&self, state: &mut MatchState, result: &GestureResult) {
        let holding = result.action == Action::Block && result.confidence >= BLOCK_CONFIDENCE_MIN;
        state.set_blocking(holding || self.touch_hold);
    }

    /// Touch block button pressed or released. A held block gesture outlives the release.
    pub fn set_touch_hold(&mut self, state: &mut MatchState, last: &GestureResult, active: bool) {
        self.touch_hold = active;
        self.update_blocking(state, last);
    }

    /// Edge path for a classified frame
    pub fn on_gesture(
        &mut self,
        state: &mut MatchState,
        result: &GestureResult,
        now: Millis,
    ) -> Option<Fired> {
        if result.confidence < ACTION_CONFIDENCE_MIN {
            return None;
        }
        match self.trigger(state, result.action, now) {
            Ok(fired) => fired,
            Err(e) => {
                tracing::debug!(action = result.action.as_str(), error = %e, "Gesture ignored");
                None
            }
        }
    }

    /// Edge path shared by gestures and touch taps.
    ///
    /// `None` and `Block` are not edge actions and yield `Ok(None)`.
    pub fn trigger(
        &mut self,
        state: &mut MatchState,
        action: Action,
        now: Millis,
    ) -> Result<Option<Fired>, ActionError> {
        if matches!(action, Action::None | Action::Block) {
            return Ok(None);
        }
        if state.phase != MatchPhase::Playing {
            return Err(ActionError::NotPlaying);
        }
        if self.is_locked(now) {
            return Err(ActionError::Locked {
                until: self.action_lock_until,
            });
        }

        let outbound = match action {
            Action::Firebreath => {
                state.attempt_cast(Spell::Firebreath, now)?;
                Some(NetworkMessage::SpellCast {
                    spell: Spell::Firebreath,
                })
            }
            Action::Shield => {
                state.attempt_cast(Spell::Shield, now)?;
                None
            }
            Action::Punch => {
                state.attempt_punch(now)?;
                Some(NetworkMessage::Punch)
            }
            Action::None | Action::Block => return Ok(None),
        };

        self.action_lock_until = now + ACTION_LOCK_MS;
        Ok(Some(Fired { action, outbound }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::r#match::fixtures::playing;

    fn seen(action: Action, confidence: f32) -> GestureResult {
        GestureResult { action, confidence }
    }

    #[test]
    fn test_firebreath_relays_cast() {
        let mut state = playing(true);
        let mut intents = IntentDispatcher::new();
        let fired = intents
            .on_gesture(&mut state, &seen(Action::Firebreath, 0.85), 1_000)
            .unwrap();
        assert_eq!(
            fired.outbound,
            Some(NetworkMessage::SpellCast {
                spell: Spell::Firebreath
            })
        );
        assert_eq!(state.spell_cooldown_ready_at, 9_000);
    }

    #[test]
    fn test_shield_is_never_sent() {
        let mut state = playing(true);
        let mut intents = IntentDispatcher::new();
        let fired = intents
            .on_gesture(&mut state, &seen(Action::Shield, 0.88), 0)
            .unwrap();
        assert_eq!(fired.action, Action::Shield);
        assert_eq!(fired.outbound, None);
        assert!(state.is_shielded(100));
    }

    #[test]
    fn test_action_lock_suppresses_repeat_frames() {
        let mut state = playing(true);
        let mut intents = IntentDispatcher::new();
        let punch = seen(Action::Punch, 0.90);

        assert!(intents.on_gesture(&mut state, &punch, 0).is_some());
        // Punch cooldown (800ms) outlasts the lock, so use a spell to probe it
        assert_eq!(
            intents.trigger(&mut state, Action::Firebreath, 599),
            Err(ActionError::Locked { until: 600 })
        );
        assert!(intents
            .on_gesture(&mut state, &seen(Action::Firebreath, 0.85), 600)
            .is_some());
    }

    #[test]
    fn test_low_confidence_ignored() {
        let mut state = playing(true);
        let mut intents = IntentDispatcher::new();
        assert!(intents
            .on_gesture(&mut state, &seen(Action::Punch, 0.54), 0)
            .is_none());
        assert_eq!(state.punch_cooldown_ready_at, 0);
        assert!(!intents.is_locked(0));
    }

    #[test]
    fn test_failed_action_does_not_lock() {
        let mut state = playing(true);
        let mut intents = IntentDispatcher::new();
        state.spell_cooldown_ready_at = 5_000;
        assert!(intents
            .on_gesture(&mut state, &seen(Action::Firebreath, 0.85), 0)
            .is_none());
        assert!(!intents.is_locked(0));
        assert!(intents.on_gesture(&mut state, &seen(Action::Punch, 0.9), 0).is_some());
    }

    #[test]
    fn test_nothing_fires_outside_playing() {
        let mut state = MatchState::new();
        let mut intents = IntentDispatcher::new();
        assert_eq!(
            intents.trigger(&mut state, Action::Punch, 0),
            Err(ActionError::NotPlaying)
        );
    }

    #[test]
    fn test_block_needs_strict_confidence() {
        let mut state = playing(true);
        let intents = IntentDispatcher::new();

        intents.update_blocking(&mut state, &seen(Action::Block, 0.71));
        assert!(!state.is_blocking);
        intents.update_blocking(&mut state, &seen(Action::Block, 0.72));
        assert!(state.is_blocking);
        intents.update_blocking(&mut state, &seen(Action::None, 0.0));
        assert!(!state.is_blocking);
    }

    #[test]
    fn test_block_ignores_action_lock() {
        let mut state = playing(true);
        let mut intents = IntentDispatcher::new();
        intents.trigger(&mut state, Action::Punch, 0).unwrap();
        assert!(intents.is_locked(100));
        intents.update_blocking(&mut state, &seen(Action::Block, 0.9));
        assert!(state.is_blocking);
        // Block is not an edge action
        assert_eq!(intents.trigger(&mut state, Action::Block, 100), Ok(None));
    }

    #[test]
    fn test_touch_hold_survives_idle_frames() {
        let mut state = playing(true);
        let mut intents = IntentDispatcher::new();
        let idle = seen(Action::None, 0.0);
        intents.set_touch_hold(&mut state, &idle, true);
        intents.update_blocking(&mut state, &idle);
        assert!(state.is_blocking);
        intents.set_touch_hold(&mut state, &idle, false);
        assert!(!state.is_blocking);
    }

    #[test]
    fn test_touch_release_keeps_gesture_block() {
        let mut state = playing(true);
        let mut intents = IntentDispatcher::new();
        let guard = seen(Action::Block, 0.8);
        intents.update_blocking(&mut state, &guard);
        intents.set_touch_hold(&mut state, &guard, true);
        intents.set_touch_hold(&mut state, &guard, false);
        assert!(state.is_blocking);

        // Below the block threshold the release drops it
        let weak = seen(Action::Block, 0.7);
        intents.set_touch_hold(&mut state, &weak, true);
        intents.set_touch_hold(&mut state, &weak, false);
        assert!(!state.is_blocking);
    }
}

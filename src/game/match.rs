//! Match state and the combat state machine
//!
//! One `MatchState` per side. The two sides never share it; they converge only
//! through authoritative health reports from the side that resolved the damage.

use serde::{Deserialize, Serialize};

use crate::util::time::{secs_until, Millis};

use super::combat::{
    CombatSystem, Spell, SpellStats, GLOBAL_SPELL_COOLDOWN_MS, MAX_HEALTH, PUNCH_COOLDOWN_MS,
    PUNCH_DAMAGE,
};

/// Seconds counted down before the round starts
pub const COUNTDOWN_SECS: u32 = 3;
/// Round length in seconds
pub const ROUND_DURATION_SECS: u32 = 90;

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// No match running
    #[default]
    Idle,
    /// Countdown before start
    Countdown,
    /// Round in progress
    Playing,
    /// Opponent reached 0, or forfeited by disconnecting mid-round
    Victory,
    /// Own health reached 0
    Defeat,
    /// Round timer ran out with equal health
    Draw,
    /// Opponent left before the round started
    Disconnected,
}

impl MatchPhase {
    /// Terminal until a new match is started
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Victory | Self::Defeat | Self::Draw | Self::Disconnected
        )
    }

    /// Countdown or playing
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Countdown | Self::Playing)
    }
}

/// Why a local action was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("match is not in progress")]
    NotPlaying,

    #[error("on cooldown until {ready_at}ms")]
    OnCooldown { ready_at: Millis },

    #[error("action lock held until {until}ms")]
    Locked { until: Millis },
}

/// Per-side combat state (owned by the session task)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchState {
    pub phase: MatchPhase,

    pub my_health: u32,
    pub opponent_health: u32,

    // Cooldowns: action permitted once now >= ready_at
    pub spell_cooldown_ready_at: Millis,
    pub punch_cooldown_ready_at: Millis,

    // Own defence
    pub my_spell_shield_until: Millis,
    pub is_blocking: bool,

    // Predicted opponent defence, consulted only when damage is computed locally
    pub opponent_spell_shield_until: Millis,
    pub opponent_punch_block_until: Millis,

    // Presentation counters
    pub countdown: u32,
    pub round_time_left: u32,

    /// With a peer attached, opponent health only changes via reports
    pub networked: bool,
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchState {
    pub fn new() -> Self {
        Self {
            phase: MatchPhase::Idle,
            my_health: MAX_HEALTH,
            opponent_health: MAX_HEALTH,
            spell_cooldown_ready_at: 0,
            punch_cooldown_ready_at: 0,
            my_spell_shield_until: 0,
            is_blocking: false,
            opponent_spell_shield_until: 0,
            opponent_punch_block_until: 0,
            countdown: COUNTDOWN_SECS,
            round_time_left: ROUND_DURATION_SECS,
            networked: false,
        }
    }

    pub fn networked() -> Self {
        Self {
            networked: true,
            ..Self::new()
        }
    }

    // ── Phase flow ─────────────────────────────────────────

    /// Enter countdown with a fresh board. Refused while a match is live.
    pub fn start_match(&mut self) -> bool {
        if self.phase.is_live() {
            return false;
        }
        *self = Self {
            phase: MatchPhase::Countdown,
            networked: self.networked,
            ..Self::new()
        };
        true
    }

    /// Advance the 1s presentation timer
    pub fn on_second(&mut self) {
        match self.phase {
            MatchPhase::Countdown => {
                self.countdown = self.countdown.saturating_sub(1);
                if self.countdown == 0 {
                    self.set_phase(MatchPhase::Playing);
                }
            }
            MatchPhase::Playing => {
                self.round_time_left = self.round_time_left.saturating_sub(1);
                if self.round_time_left == 0 {
                    self.resolve_timeout();
                }
            }
            _ => {}
        }
    }

    /// Remote peer went away: forfeit win mid-round, abandoned before it
    pub fn on_peer_disconnected(&mut self) {
        match self.phase {
            MatchPhase::Playing => self.set_phase(MatchPhase::Victory),
            MatchPhase::Countdown => self.set_phase(MatchPhase::Disconnected),
            _ => {}
        }
    }

    /// Stop the match and return to idle
    pub fn exit(&mut self) {
        self.set_phase(MatchPhase::Idle);
    }

    fn resolve_timeout(&mut self) {
        let outcome = match self.my_health.cmp(&self.opponent_health) {
            std::cmp::Ordering::Greater => MatchPhase::Victory,
            std::cmp::Ordering::Less => MatchPhase::Defeat,
            std::cmp::Ordering::Equal => MatchPhase::Draw,
        };
        self.set_phase(outcome);
    }

    /// Runs after every health mutation. Defeat is checked first.
    fn check_round_end(&mut self) {
        if self.phase != MatchPhase::Playing {
            return;
        }
        if self.my_health == 0 {
            self.set_phase(MatchPhase::Defeat);
        } else if self.opponent_health == 0 {
            self.set_phase(MatchPhase::Victory);
        }
    }

    fn set_phase(&mut self, phase: MatchPhase) {
        self.phase = phase;
        if phase != MatchPhase::Playing {
            self.is_blocking = false;
        }
        if phase == MatchPhase::Playing {
            self.countdown = 0;
        }
    }

    // ── Local intents ──────────────────────────────────────

    /// Cast a spell. One shared cooldown covers every spell type.
    pub fn attempt_cast(&mut self, spell: Spell, now: Millis) -> Result<(), ActionError> {
        if self.phase != MatchPhase::Playing {
            return Err(ActionError::NotPlaying);
        }
        if !CombatSystem::is_ready(self.spell_cooldown_ready_at, now) {
            return Err(ActionError::OnCooldown {
                ready_at: self.spell_cooldown_ready_at,
            });
        }

        let stats = SpellStats::for_spell(spell);
        self.spell_cooldown_ready_at = now + GLOBAL_SPELL_COOLDOWN_MS;
        if stats.shield_ms > 0 {
            self.my_spell_shield_until = now + stats.shield_ms;
        }
        if stats.damage > 0 {
            self.damage_opponent(stats.damage, true, now);
        }
        Ok(())
    }

    /// Punch. Independent of the spell cooldown.
    pub fn attempt_punch(&mut self, now: Millis) -> Result<(), ActionError> {
        if self.phase != MatchPhase::Playing {
            return Err(ActionError::NotPlaying);
        }
        if !CombatSystem::is_ready(self.punch_cooldown_ready_at, now) {
            return Err(ActionError::OnCooldown {
                ready_at: self.punch_cooldown_ready_at,
            });
        }

        self.punch_cooldown_ready_at = now + PUNCH_COOLDOWN_MS;
        self.damage_opponent(PUNCH_DAMAGE, false, now);
        Ok(())
    }

    /// Held block. Only ever true while playing.
    pub fn set_blocking(&mut self, active: bool) {
        self.is_blocking = active && self.phase == MatchPhase::Playing;
    }

    /// Locally computed damage to the opponent; a no-op when networked,
    /// where the opponent reports its own post-damage health instead.
    fn damage_opponent(&mut self, damage: u32, is_spell: bool, now: Millis) {
        if self.networked {
            return;
        }

        let shielded = CombatSystem::is_active(self.opponent_spell_shield_until, now);
        let blocked =
            !is_spell && CombatSystem::is_active(self.opponent_punch_block_until, now);
        if blocked {
            self.opponent_punch_block_until = 0;
        }
        if shielded || blocked {
            return;
        }

        let (health, _) = CombatSystem::apply_damage(self.opponent_health, damage);
        self.opponent_health = health;
        self.check_round_end();
    }

    // ── Inbound facts ──────────────────────────────────────

    /// Resolve incoming damage against the current state and return the
    /// resulting health for reporting to the peer.
    pub fn apply_damage_to_self(&mut self, amount: u32, is_spell: bool, now: Millis) -> u32 {
        if CombatSystem::is_active(self.my_spell_shield_until, now) {
            return self.my_health;
        }
        // Held block is not consumed
        if !is_spell && self.is_blocking {
            return self.my_health;
        }

        let (health, _) = CombatSystem::apply_damage(self.my_health, amount);
        self.my_health = health;
        self.check_round_end();
        self.my_health
    }

    /// Authoritative overwrite from the peer
    pub fn record_opponent_health(&mut self, reported: i64) {
        self.opponent_health = CombatSystem::clamp_health(reported);
        self.check_round_end();
    }

    // ── Read-outs ──────────────────────────────────────────

    pub fn is_shielded(&self, now: Millis) -> bool {
        CombatSystem::is_active(self.my_spell_shield_until, now)
    }

    pub fn spell_cooldown_secs(&self, now: Millis) -> u32 {
        secs_until(self.spell_cooldown_ready_at, now)
    }

    pub fn punch_cooldown_secs(&self, now: Millis) -> u32 {
        secs_until(self.punch_cooldown_ready_at, now)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::playing;
    use super::*;

    #[test]
    fn test_new_state() {
        let state = MatchState::new();
        assert_eq!(state.phase, MatchPhase::Idle);
        assert_eq!(state.my_health, 100);
        assert_eq!(state.opponent_health, 100);
        assert!(!state.is_blocking);
    }

    #[test]
    fn test_start_match_resets_board() {
        let mut state = playing(false);
        state.my_health = 10;
        state.spell_cooldown_ready_at = 50_000;
        state.set_phase(MatchPhase::Defeat);

        assert!(state.start_match());
        assert_eq!(state.phase, MatchPhase::Countdown);
        assert_eq!(state.my_health, 100);
        assert_eq!(state.spell_cooldown_ready_at, 0);
        assert_eq!(state.countdown, 3);
        assert_eq!(state.round_time_left, 90);
    }

    #[test]
    fn test_start_refused_while_live() {
        let mut state = playing(false);
        assert!(!state.start_match());
        assert_eq!(state.phase, MatchPhase::Playing);
    }

    #[test]
    fn test_countdown_reaches_playing() {
        let mut state = MatchState::new();
        state.start_match();
        state.on_second();
        state.on_second();
        assert_eq!(state.phase, MatchPhase::Countdown);
        assert_eq!(state.countdown, 1);
        state.on_second();
        assert_eq!(state.phase, MatchPhase::Playing);
        assert_eq!(state.round_time_left, 90);
    }

    #[test]
    fn test_local_firebreath_damages_opponent() {
        let mut state = playing(false);
        let now = 10_000;

        assert_eq!(state.attempt_cast(Spell::Firebreath, now), Ok(()));
        assert_eq!(state.opponent_health, 88);
        assert_eq!(state.spell_cooldown_ready_at, now + 8_000);

        assert_eq!(
            state.attempt_cast(Spell::Firebreath, now),
            Err(ActionError::OnCooldown { ready_at: now + 8_000 })
        );
        assert_eq!(state.opponent_health, 88);
    }

    #[test]
    fn test_networked_cast_leaves_opponent_health_alone() {
        let mut state = playing(true);
        state.attempt_cast(Spell::Firebreath, 1_000).unwrap();
        state.attempt_punch(1_000).unwrap();
        assert_eq!(state.opponent_health, 100);
    }

    #[test]
    fn test_spell_cooldown_is_shared() {
        let mut state = playing(false);
        state.attempt_cast(Spell::Shield, 1_000).unwrap();
        assert!(state.attempt_cast(Spell::Firebreath, 8_999).is_err());
        assert!(state.attempt_cast(Spell::Firebreath, 9_000).is_ok());
    }

    #[test]
    fn test_shield_cast_opens_window() {
        let mut state = playing(false);
        state.attempt_cast(Spell::Shield, 2_000).unwrap();
        assert_eq!(state.my_spell_shield_until, 5_000);
        assert_eq!(state.opponent_health, 100);
        assert!(state.is_shielded(4_999));
        assert!(!state.is_shielded(5_000));
    }

    #[test]
    fn test_punch_cooldown_independent_of_spells() {
        let mut state = playing(false);
        state.attempt_cast(Spell::Firebreath, 1_000).unwrap();
        assert_eq!(state.attempt_punch(1_000), Ok(()));
        assert_eq!(state.punch_cooldown_ready_at, 1_800);
        assert!(state.attempt_punch(1_799).is_err());
        assert!(state.attempt_punch(1_800).is_ok());
        assert_eq!(state.opponent_health, 100 - 12 - 5 - 5);
    }

    #[test]
    fn test_actions_refused_outside_playing() {
        let mut state = MatchState::new();
        assert_eq!(state.attempt_punch(0), Err(ActionError::NotPlaying));
        state.start_match();
        assert_eq!(
            state.attempt_cast(Spell::Firebreath, 0),
            Err(ActionError::NotPlaying)
        );
    }

    #[test]
    fn test_cooldown_advances_by_fixed_constant() {
        let mut state = playing(false);
        let mut now = 0;
        for _ in 0..5 {
            let before = state.punch_cooldown_ready_at;
            state.attempt_punch(now).unwrap();
            assert_eq!(state.punch_cooldown_ready_at, now + PUNCH_COOLDOWN_MS);
            assert!(state.punch_cooldown_ready_at > before);
            now = state.punch_cooldown_ready_at;
        }
    }

    #[test]
    fn test_shield_blocks_everything() {
        let mut state = playing(true);
        state.my_spell_shield_until = 5_000;
        assert_eq!(state.apply_damage_to_self(12, true, 4_000), 100);
        assert_eq!(state.apply_damage_to_self(5, false, 4_000), 100);
        assert_eq!(state.apply_damage_to_self(1_000, false, 4_999), 100);
        assert_eq!(state.apply_damage_to_self(5, false, 5_000), 95);
    }

    #[test]
    fn test_block_is_not_consumed() {
        let mut state = playing(true);
        state.set_blocking(true);
        for i in 0..10 {
            assert_eq!(state.apply_damage_to_self(5, false, i * 100), 100);
            assert!(state.is_blocking);
        }
        // Block never stops spells
        assert_eq!(state.apply_damage_to_self(12, true, 2_000), 88);
    }

    #[test]
    fn test_blocking_only_while_playing() {
        let mut state = MatchState::new();
        state.set_blocking(true);
        assert!(!state.is_blocking);

        let mut state = playing(true);
        state.set_blocking(true);
        state.set_blocking(true);
        assert!(state.is_blocking);
        state.on_peer_disconnected();
        assert_eq!(state.phase, MatchPhase::Victory);
        assert!(!state.is_blocking);
    }

    #[test]
    fn test_own_health_zero_is_defeat() {
        let mut state = playing(true);
        state.my_health = 4;
        assert_eq!(state.apply_damage_to_self(5, false, 0), 0);
        assert_eq!(state.phase, MatchPhase::Defeat);
    }

    #[test]
    fn test_defeat_checked_before_victory() {
        let mut state = playing(true);
        state.opponent_health = 0;
        state.my_health = 0;
        state.check_round_end();
        assert_eq!(state.phase, MatchPhase::Defeat);
    }

    #[test]
    fn test_opponent_report_can_end_round() {
        let mut state = playing(true);
        state.record_opponent_health(30);
        assert_eq!(state.opponent_health, 30);
        assert_eq!(state.phase, MatchPhase::Playing);
        state.record_opponent_health(-4);
        assert_eq!(state.opponent_health, 0);
        assert_eq!(state.phase, MatchPhase::Victory);
    }

    #[test]
    fn test_health_bounds_hold() {
        let mut state = playing(true);
        let reports = [150, -10, 42, 100, 0, 101, -1];
        for (i, report) in reports.into_iter().enumerate() {
            state.record_opponent_health(report);
            state.apply_damage_to_self(37, i % 2 == 0, i as u64);
            assert!(state.my_health <= 100);
            assert!(state.opponent_health <= 100);
        }
        assert_eq!(state.my_health, 0);
    }

    #[test]
    fn test_disconnect_during_countdown() {
        let mut state = MatchState::networked();
        state.start_match();
        state.on_peer_disconnected();
        assert_eq!(state.phase, MatchPhase::Disconnected);
    }

    #[test]
    fn test_disconnect_during_play_is_forfeit_win() {
        let mut state = playing(true);
        state.on_peer_disconnected();
        assert_eq!(state.phase, MatchPhase::Victory);
    }

    #[test]
    fn test_disconnect_after_round_changes_nothing() {
        let mut state = playing(true);
        state.my_health = 0;
        state.check_round_end();
        state.on_peer_disconnected();
        assert_eq!(state.phase, MatchPhase::Defeat);
    }

    #[test]
    fn test_round_timeout_outcomes() {
        let mut state = playing(true);
        state.opponent_health = 40;
        for _ in 0..ROUND_DURATION_SECS {
            state.on_second();
        }
        assert_eq!(state.phase, MatchPhase::Victory);

        let mut state = playing(true);
        for _ in 0..ROUND_DURATION_SECS {
            state.on_second();
        }
        assert_eq!(state.phase, MatchPhase::Draw);
    }

    #[test]
    fn test_opponent_immunity_windows_in_local_play() {
        let mut state = playing(false);

        state.opponent_punch_block_until = 2_200;
        state.attempt_punch(100).unwrap();
        assert_eq!(state.opponent_health, 100);
        assert_eq!(state.opponent_punch_block_until, 0);
        state.attempt_punch(1_000).unwrap();
        assert_eq!(state.opponent_health, 95);

        state.opponent_spell_shield_until = 5_000;
        state.attempt_cast(Spell::Firebreath, 2_500).unwrap();
        state.attempt_punch(2_500).unwrap();
        assert_eq!(state.opponent_health, 95);
    }

    #[test]
    fn test_cooldown_readouts() {
        let mut state = playing(false);
        state.attempt_cast(Spell::Shield, 1_000).unwrap();
        state.attempt_punch(1_000).unwrap();
        assert_eq!(state.spell_cooldown_secs(1_000), 8);
        assert_eq!(state.spell_cooldown_secs(8_500), 1);
        assert_eq!(state.punch_cooldown_secs(1_000), 1);
        assert_eq!(state.punch_cooldown_secs(1_800), 0);
    }
}

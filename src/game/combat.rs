//! Combat rules - spells, punches, damage, immunity windows

use serde::{Deserialize, Serialize};

use crate::util::time::Millis;

/// Health every fighter starts with; also the ceiling
pub const MAX_HEALTH: u32 = 100;

/// One spell every 8s, shared by every spell type
pub const GLOBAL_SPELL_COOLDOWN_MS: Millis = 8_000;

pub const PUNCH_DAMAGE: u32 = 5;
pub const PUNCH_COOLDOWN_MS: Millis = 800;

/// Self-cast shield: immune to spells and punches for this long
pub const SPELL_SHIELD_DURATION_MS: Millis = 3_000;

/// Delay between an attack's announcement and its effect
pub const TELEGRAPH_MS: Millis = 1_800;

/// Debounce after any successful local cast or punch
pub const ACTION_LOCK_MS: Millis = 600;
/// Minimum confidence for any edge-triggered action
pub const ACTION_CONFIDENCE_MIN: f32 = 0.55;
/// Minimum confidence for the held block gesture
pub const BLOCK_CONFIDENCE_MIN: f32 = 0.72;

/// Castable spells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spell {
    /// Ranged damage, telegraphed to the opponent
    Firebreath,
    /// Self-only immunity window, never sent over the wire
    Shield,
}

/// Spell stats per spell type
#[derive(Debug, Clone, Copy)]
pub struct SpellStats {
    /// Damage dealt to the opponent
    pub damage: u32,
    /// Self-immunity window opened on cast (0 = none)
    pub shield_ms: Millis,
}

impl SpellStats {
    pub fn for_spell(spell: Spell) -> Self {
        match spell {
            Spell::Firebreath => Self {
                damage: 12,
                shield_ms: 0,
            },
            Spell::Shield => Self {
                damage: 0,
                shield_ms: SPELL_SHIELD_DURATION_MS,
            },
        }
    }
}

/// Attacks that travel to the opponent and can land
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Firebreath,
    Punch,
}

impl AttackKind {
    pub fn damage(&self) -> u32 {
        match self {
            Self::Firebreath => SpellStats::for_spell(Spell::Firebreath).damage,
            Self::Punch => PUNCH_DAMAGE,
        }
    }

    /// Spells ignore block; punches don't
    pub fn is_spell(&self) -> bool {
        matches!(self, Self::Firebreath)
    }
}

/// Pure combat arithmetic
pub struct CombatSystem;

impl CombatSystem {
    /// An action is permitted once `now` reaches its ready time
    pub fn is_ready(ready_at: Millis, now: Millis) -> bool {
        now >= ready_at
    }

    /// True while `now` is inside a window ending at `until`
    pub fn is_active(until: Millis, now: Millis) -> bool {
        now < until
    }

    /// Apply damage to health, returns (new_health, is_dead)
    pub fn apply_damage(current_health: u32, damage: u32) -> (u32, bool) {
        let new_health = current_health.saturating_sub(damage);
        (new_health, new_health == 0)
    }

    /// Clamp a reported health value into [0, MAX_HEALTH]
    pub fn clamp_health(reported: i64) -> u32 {
        reported.clamp(0, MAX_HEALTH as i64) as u32
    }
}

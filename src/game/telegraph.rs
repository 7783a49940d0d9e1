//! Telegraph scheduler
//!
//! Turns an inbound attack announcement into a delayed, visible threat and
//! resolves it against the local state once its delay has elapsed.

use serde::Serialize;

use crate::util::time::Millis;
use crate::ws::protocol::NetworkMessage;

use super::combat::{AttackKind, Spell, TELEGRAPH_MS};
use super::r#match::MatchState;

/// An announced attack waiting to land
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingAttack {
    pub id: u64,
    pub kind: AttackKind,
    pub lands_at: Millis,
}

impl PendingAttack {
    pub fn remaining_ms(&self, now: Millis) -> Millis {
        self.lands_at.saturating_sub(now)
    }

    /// 1.0 at announcement, 0.0 on landing
    pub fn progress(&self, now: Millis) -> f32 {
        (self.remaining_ms(now) as f32 / TELEGRAPH_MS as f32).clamp(0.0, 1.0)
    }
}

/// A landed attack and the health it left behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub attack: PendingAttack,
    pub health: u32,
}

impl Resolution {
    /// Report for the attacker
    pub fn report(&self) -> NetworkMessage {
        NetworkMessage::HealthUpdate {
            health: self.health as i64,
        }
    }
}

/// Which inbound messages are telegraphed, and as what
pub fn incoming_attack(msg: &NetworkMessage) -> Option<AttackKind> {
    match msg {
        NetworkMessage::SpellCast {
            spell: Spell::Firebreath,
        } => Some(AttackKind::Firebreath),
        NetworkMessage::Punch => Some(AttackKind::Punch),
        NetworkMessage::SpellCast {
            spell: Spell::Shield,
        }
        | NetworkMessage::HealthUpdate { .. } => None,
    }
}

#[derive(Debug, Default)]
pub struct TelegraphScheduler {
    pending: Vec<PendingAttack>,
    next_id: u64,
}

impl TelegraphScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an attack landing one telegraph window from now
    pub fn enqueue(&mut self, kind: AttackKind, now: Millis) -> u64 {
        self.next_id += 1;
        let attack = PendingAttack {
            id: self.next_id,
            kind,
            lands_at: now + TELEGRAPH_MS,
        };
        self.pending.push(attack);
        attack.id
    }

    /// Resolve every due attack, in arrival order, before returning.
    /// Entries not yet due stay queued in their original order.
    pub fn tick(&mut self, state: &mut MatchState, now: Millis) -> Vec<Resolution> {
        let mut resolved = Vec::new();
        self.pending.retain(|attack| {
            if now < attack.lands_at {
                return true;
            }
            let health = state.apply_damage_to_self(attack.kind.damage(), attack.kind.is_spell(), now);
            resolved.push(Resolution {
                attack: *attack,
                health,
            });
            false
        });
        resolved
    }

    pub fn pending(&self) -> &[PendingAttack] {
        &self.pending
    }

    /// Soonest landing attack
    pub fn next_due(&self) -> Option<&PendingAttack> {
        self.pending.iter().min_by_key(|a| a.lands_at)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

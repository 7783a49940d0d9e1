//! Match view building for the local UI

use std::collections::VecDeque;

use serde::Serialize;

use crate::gesture::{Action, GestureResult};
use crate::util::time::Millis;

use super::combat::AttackKind;
use super::r#match::{MatchPhase, MatchState};
use super::telegraph::TelegraphScheduler;

/// Entries kept in the recent-cast feed
pub const RECENT_CAST_LIMIT: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Me,
    Opponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CastRecord {
    pub action: Action,
    pub side: Side,
    pub at: Millis,
}

/// Newest-first feed of recent actions on both sides
#[derive(Debug, Default)]
pub struct RecentCasts {
    entries: VecDeque<CastRecord>,
}

impl RecentCasts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: Action, side: Side, at: Millis) {
        self.entries.push_front(CastRecord { action, side, at });
        self.entries.truncate(RECENT_CAST_LIMIT);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &CastRecord> {
        self.entries.iter()
    }
}

/// One incoming-attack arrow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomingView {
    pub id: u64,
    pub kind: AttackKind,
    pub remaining_ms: Millis,
    pub progress: f32,
}

/// Everything the UI draws
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchView {
    pub phase: MatchPhase,
    pub my_health: u32,
    pub opponent_health: u32,
    pub countdown: u32,
    pub round_time_left: u32,
    pub spell_cooldown_secs: u32,
    pub punch_cooldown_secs: u32,
    pub shielded: bool,
    pub blocking: bool,
    pub gesture: GestureResult,
    pub incoming: Vec<IncomingView>,
    pub recent: Vec<CastRecord>,
    pub peer_connected: bool,
}

/// Builds views from the session's parts
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn build(
        state: &MatchState,
        telegraph: &TelegraphScheduler,
        recent: &RecentCasts,
        gesture: GestureResult,
        peer_connected: bool,
        now: Millis,
    ) -> MatchView {
        MatchView {
            phase: state.phase,
            my_health: state.my_health,
            opponent_health: state.opponent_health,
            countdown: state.countdown,
            round_time_left: state.round_time_left,
            spell_cooldown_secs: state.spell_cooldown_secs(now),
            punch_cooldown_secs: state.punch_cooldown_secs(now),
            shielded: state.is_shielded(now),
            blocking: state.is_blocking,
            gesture,
            incoming: telegraph
                .pending()
                .iter()
                .map(|a| IncomingView {
                    id: a.id,
                    kind: a.kind,
                    remaining_ms: a.remaining_ms(now),
                    progress: a.progress(now),
                })
                .collect(),
            recent: recent.iter().copied().collect(),
            peer_connected,
        }
    }
}

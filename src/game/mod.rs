//! Duel simulation modules

pub mod combat;
pub mod intent;
pub mod r#match;
pub mod session;
pub mod snapshot;
pub mod telegraph;

pub use combat::{AttackKind, Spell};
pub use r#match::{ActionError, MatchPhase, MatchState};
pub use session::{MatchSession, SessionEvent, SessionHandle};
pub use snapshot::MatchView;
pub use telegraph::{PendingAttack, TelegraphScheduler};

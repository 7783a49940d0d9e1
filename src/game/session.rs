//! Duel session task
//!
//! Owns one side's match and is the only place it is mutated. Frames, touch
//! controls, peer traffic and both timers are serialized through `run`.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::gesture::{Action, ClassifierConfig, GestureClassifier, GestureResult, Hand};
use crate::util::time::{presentation_tick, telegraph_tick, Clock, Millis};
use crate::ws::protocol::NetworkMessage;
use crate::ws::transport::{send_best_effort, Transport};

use super::combat::AttackKind;
use super::intent::{Fired, IntentDispatcher};
use super::r#match::{MatchPhase, MatchState};
use super::snapshot::{MatchView, RecentCasts, Side, SnapshotBuilder};
use super::telegraph::{incoming_attack, TelegraphScheduler};

/// Buffered session events before senders wait
const EVENT_BUFFER: usize = 256;

/// Everything that reaches the session besides frames
pub enum SessionEvent {
    Start,
    Exit,
    Tap(Action),
    Hold(bool),
    /// Raw text frame from the peer
    Remote(String),
    PeerOpened {
        link_id: Uuid,
        transport: Box<dyn Transport>,
    },
    PeerClosed {
        link_id: Uuid,
    },
}

/// Cheap to clone; the session ends once every handle is gone
#[derive(Clone)]
pub struct SessionHandle {
    events_tx: mpsc::Sender<SessionEvent>,
    frames_tx: Arc<watch::Sender<Vec<Hand>>>,
    view_rx: watch::Receiver<MatchView>,
}

impl SessionHandle {
    /// Returns false once the session has stopped
    pub async fn send(&self, event: SessionEvent) -> bool {
        self.events_tx.send(event).await.is_ok()
    }

    pub async fn start(&self) -> bool {
        self.send(SessionEvent::Start).await
    }

    pub async fn exit(&self) -> bool {
        self.send(SessionEvent::Exit).await
    }

    /// Replace the pending frame. Unread frames are overwritten, never queued.
    pub fn submit_frame(&self, hands: Vec<Hand>) {
        self.frames_tx.send_replace(hands);
    }

    pub fn subscribe(&self) -> watch::Receiver<MatchView> {
        self.view_rx.clone()
    }

    pub fn view(&self) -> MatchView {
        self.view_rx.borrow().clone()
    }
}

struct Peer {
    id: Uuid,
    transport: Box<dyn Transport>,
}

pub struct MatchSession {
    match_id: Uuid,
    clock: Arc<dyn Clock>,
    state: MatchState,
    telegraph: TelegraphScheduler,
    intents: IntentDispatcher,
    classifier: GestureClassifier,
    recent: RecentCasts,
    gesture: GestureResult,
    peer: Option<Peer>,
    events_rx: mpsc::Receiver<SessionEvent>,
    frames_rx: watch::Receiver<Vec<Hand>>,
    view_tx: watch::Sender<MatchView>,
}

impl MatchSession {
    pub fn new(clock: Arc<dyn Clock>, config: ClassifierConfig) -> (Self, SessionHandle) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (frames_tx, frames_rx) = watch::channel(Vec::new());
        let (view_tx, view_rx) = watch::channel(MatchView::default());

        let handle = SessionHandle {
            events_tx,
            frames_tx: Arc::new(frames_tx),
            view_rx,
        };

        let session = Self {
            match_id: Uuid::new_v4(),
            clock,
            state: MatchState::new(),
            telegraph: TelegraphScheduler::new(),
            intents: IntentDispatcher::new(),
            classifier: GestureClassifier::new(config),
            recent: RecentCasts::new(),
            gesture: GestureResult::default(),
            peer: None,
            events_rx,
            frames_rx,
            view_tx,
        };
        // Subscribers see the real idle board, not a zeroed view
        session.publish();

        (session, handle)
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Run until every handle is dropped
    pub async fn run(mut self) {
        info!("Duel session started");
        self.publish();

        let mut presentation: Option<Interval> = None;
        let mut telegraph: Option<Interval> = None;
        let mut frames_open = true;

        loop {
            sync_timer(&mut presentation, self.state.phase.is_live(), presentation_tick());
            sync_timer(
                &mut telegraph,
                self.state.phase == MatchPhase::Playing,
                telegraph_tick(),
            );

            tokio::select! {
                event = self.events_rx.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                changed = self.frames_rx.changed(), if frames_open => {
                    if changed.is_err() {
                        frames_open = false;
                        continue;
                    }
                    let hands = self.frames_rx.borrow_and_update().clone();
                    self.handle_frame(&hands);
                }
                _ = next_tick(&mut presentation) => self.on_presentation_tick(),
                _ = next_tick(&mut telegraph) => self.on_telegraph_tick(),
            }

            self.publish();
        }

        info!(match_id = %self.match_id, "Duel session stopped");
    }

    // ── Steps ──────────────────────────────────────────────

    pub fn handle_event(&mut self, event: SessionEvent) {
        let before = self.state.phase;
        match event {
            SessionEvent::Start => self.start(),
            SessionEvent::Exit => self.exit(),
            SessionEvent::Tap(action) => {
                let now = self.clock.now_ms();
                match self.intents.trigger(&mut self.state, action, now) {
                    Ok(Some(fired)) => self.on_fired(fired, now),
                    Ok(None) => {}
                    Err(e) => debug!(action = action.as_str(), error = %e, "Tap ignored"),
                }
            }
            SessionEvent::Hold(active) => {
                self.intents
                    .set_touch_hold(&mut self.state, &self.gesture, active)
            }
            SessionEvent::Remote(text) => self.handle_remote(&text),
            SessionEvent::PeerOpened { link_id, transport } => {
                info!(match_id = %self.match_id, link_id = %link_id, "Peer link opened");
                self.peer = Some(Peer {
                    id: link_id,
                    transport,
                });
                self.state.networked = true;
            }
            SessionEvent::PeerClosed { link_id } => self.peer_closed(link_id),
        }
        self.after_step(before);
    }

    /// Classify a frame and feed both intent paths
    pub fn handle_frame(&mut self, hands: &[Hand]) {
        if self.state.phase == MatchPhase::Idle {
            return;
        }
        let before = self.state.phase;
        let now = self.clock.now_ms();

        self.gesture = self.classifier.classify(hands);
        self.intents.update_blocking(&mut self.state, &self.gesture);
        if let Some(fired) = self.intents.on_gesture(&mut self.state, &self.gesture, now) {
            self.on_fired(fired, now);
        }
        self.after_step(before);
    }

    pub fn on_presentation_tick(&mut self) {
        let before = self.state.phase;
        self.state.on_second();
        self.after_step(before);
    }

    pub fn on_telegraph_tick(&mut self) {
        let before = self.state.phase;
        let now = self.clock.now_ms();
        for resolution in self.telegraph.tick(&mut self.state, now) {
            debug!(
                match_id = %self.match_id,
                attack_id = resolution.attack.id,
                health = resolution.health,
                "Incoming attack landed"
            );
            self.recent
                .record(attack_action(resolution.attack.kind), Side::Opponent, now);
            self.send_peer(&resolution.report());
        }
        self.after_step(before);
    }

    /// Push the current view to subscribers if it changed
    pub fn publish(&self) {
        let view = self.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }

    pub fn view(&self) -> MatchView {
        SnapshotBuilder::build(
            &self.state,
            &self.telegraph,
            &self.recent,
            self.gesture,
            self.peer.is_some(),
            self.clock.now_ms(),
        )
    }

    // ── Handlers ───────────────────────────────────────────

    fn start(&mut self) {
        if !self.state.start_match() {
            debug!(match_id = %self.match_id, phase = ?self.state.phase, "Start ignored");
            return;
        }
        self.match_id = Uuid::new_v4();
        self.telegraph.clear();
        self.intents.reset();
        self.recent.clear();
        self.gesture = GestureResult::default();
        info!(match_id = %self.match_id, networked = self.state.networked, "Match starting");
    }

    fn exit(&mut self) {
        self.state.exit();
        self.telegraph.clear();
        self.intents.reset();
        self.gesture = GestureResult::default();
    }

    fn handle_remote(&mut self, text: &str) {
        let msg = match NetworkMessage::decode(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(error = %e, "Dropped peer payload");
                return;
            }
        };

        if let NetworkMessage::HealthUpdate { health } = msg {
            self.state.record_opponent_health(health);
            return;
        }

        let Some(kind) = incoming_attack(&msg) else {
            return;
        };
        if !self.state.phase.is_live() {
            debug!(?kind, phase = ?self.state.phase, "Dropped attack outside a live match");
            return;
        }
        let now = self.clock.now_ms();
        let id = self.telegraph.enqueue(kind, now);
        debug!(match_id = %self.match_id, attack_id = id, ?kind, "Incoming attack telegraphed");
    }

    fn peer_closed(&mut self, link_id: Uuid) {
        match &self.peer {
            Some(peer) if peer.id == link_id => self.peer = None,
            _ => return,
        }
        info!(match_id = %self.match_id, link_id = %link_id, "Peer link closed");
        self.state.on_peer_disconnected();
        self.state.networked = false;
    }

    fn on_fired(&mut self, fired: Fired, now: Millis) {
        self.recent.record(fired.action, Side::Me, now);
        if let Some(msg) = fired.outbound {
            self.send_peer(&msg);
        }
    }

    fn send_peer(&self, msg: &NetworkMessage) {
        send_best_effort(self.peer.as_ref().map(|p| p.transport.as_ref()), msg);
    }

    fn after_step(&mut self, before: MatchPhase) {
        let phase = self.state.phase;
        if phase == before {
            return;
        }
        info!(match_id = %self.match_id, from = ?before, to = ?phase, "Phase changed");
        if !phase.is_live() {
            self.telegraph.clear();
        }
    }
}

fn attack_action(kind: AttackKind) -> Action {
    match kind {
        AttackKind::Firebreath => Action::Firebreath,
        AttackKind::Punch => Action::Punch,
    }
}

/// Create or drop a periodic timer so it exists exactly while `wanted`
fn sync_timer(timer: &mut Option<Interval>, wanted: bool, period: std::time::Duration) {
    match (timer.is_some(), wanted) {
        (false, true) => {
            let mut t = interval_at(Instant::now() + period, period);
            t.set_missed_tick_behavior(MissedTickBehavior::Skip);
            *timer = Some(t);
        }
        (true, false) => *timer = None,
        _ => {}
    }
}

/// Pending forever when the timer does not exist
async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

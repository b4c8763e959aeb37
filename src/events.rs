//! Session events and the broadcast bus that carries them.
//!
//! The engine never blocks on subscribers: a slow receiver lags and is told
//! how many events it missed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, instrument, trace};

use crate::games::ludo::{
    ForfeitReason, MoveDelta, ScoreDelta, Seat, SessionId, SettlementResult,
};

/// Something observable that happened in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A seat confirmed its presence.
    PlayerJoined {
        /// Session.
        session_id: SessionId,
        /// Seat that joined.
        seat: Seat,
    },
    /// Every seat joined; the first turn began.
    SessionStarted {
        /// Session.
        session_id: SessionId,
    },
    /// The active seat rolled.
    DiceRolled {
        /// Session.
        session_id: SessionId,
        /// Seat that rolled.
        seat: Seat,
        /// Value rolled.
        value: u8,
        /// Pieces that may legally move with this value.
        movable: Vec<u8>,
    },
    /// A move was committed.
    MoveApplied {
        /// Session.
        session_id: SessionId,
        /// The committed move.
        delta: MoveDelta,
        /// Score changes it caused.
        score: ScoreDelta,
    },
    /// The roll allowed no legal move.
    TurnPassed {
        /// Session.
        session_id: SessionId,
        /// Seat that passed.
        seat: Seat,
        /// Value rolled.
        roll: u8,
    },
    /// The turn timer expired.
    TurnTimedOut {
        /// Session.
        session_id: SessionId,
        /// Seat that ran out of time.
        seat: Seat,
    },
    /// A turn was skipped for a reason other than the timer.
    TurnForfeited {
        /// Session.
        session_id: SessionId,
        /// Seat whose turn was skipped.
        seat: Seat,
        /// Why.
        reason: ForfeitReason,
    },
    /// A KILL player ran out of lives.
    PlayerEliminated {
        /// Session.
        session_id: SessionId,
        /// Eliminated seat.
        seat: Seat,
    },
    /// Transport reported a seat gone.
    PlayerDisconnected {
        /// Session.
        session_id: SessionId,
        /// Seat that dropped.
        seat: Seat,
    },
    /// A disconnected seat came back.
    PlayerReconnected {
        /// Session.
        session_id: SessionId,
        /// Seat that returned.
        seat: Seat,
    },
    /// The session ended and was settled.
    SessionCompleted {
        /// Session.
        session_id: SessionId,
        /// Payouts and leaderboard deltas.
        result: SettlementResult,
    },
}

impl EngineEvent {
    /// Session the event belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            EngineEvent::PlayerJoined { session_id, .. }
            | EngineEvent::SessionStarted { session_id }
            | EngineEvent::DiceRolled { session_id, .. }
            | EngineEvent::MoveApplied { session_id, .. }
            | EngineEvent::TurnPassed { session_id, .. }
            | EngineEvent::TurnTimedOut { session_id, .. }
            | EngineEvent::TurnForfeited { session_id, .. }
            | EngineEvent::PlayerEliminated { session_id, .. }
            | EngineEvent::PlayerDisconnected { session_id, .. }
            | EngineEvent::PlayerReconnected { session_id, .. }
            | EngineEvent::SessionCompleted { session_id, .. } => session_id,
        }
    }

    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::PlayerJoined { .. } => "player_joined",
            EngineEvent::SessionStarted { .. } => "session_started",
            EngineEvent::DiceRolled { .. } => "dice_rolled",
            EngineEvent::MoveApplied { .. } => "move_applied",
            EngineEvent::TurnPassed { .. } => "turn_passed",
            EngineEvent::TurnTimedOut { .. } => "turn_timed_out",
            EngineEvent::TurnForfeited { .. } => "turn_forfeited",
            EngineEvent::PlayerEliminated { .. } => "player_eliminated",
            EngineEvent::PlayerDisconnected { .. } => "player_disconnected",
            EngineEvent::PlayerReconnected { .. } => "player_reconnected",
            EngineEvent::SessionCompleted { .. } => "session_completed",
        }
    }
}

/// Fan-out channel for [`EngineEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    #[instrument]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        debug!("Event bus created");
        Self { sender }
    }

    /// Publishes an event. Having no subscribers is not an error.
    pub fn publish(&self, event: EngineEvent) {
        trace!(session_id = %event.session_id(), event = event.name(), "Publishing event");
        let _ = self.sender.send(event);
    }

    /// Publishes events in order.
    pub fn publish_all(&self, events: impl IntoIterator<Item = EngineEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Subscribes to every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Current number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

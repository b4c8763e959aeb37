//! Session lifecycle states and turn phases.

use serde::{Deserialize, Serialize};

use super::types::Seat;

/// Lifecycle status of a session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Roster formed, waiting for every seat to join.
    WaitingForPlayers,
    /// Turns are being played.
    InProgress,
    /// Finished normally (win, cap, timer or disconnect timeout).
    Completed,
    /// Forcibly terminated; stakes are refunded.
    Aborted,
}

impl SessionStatus {
    /// True for `Completed` and `Aborted`.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Aborted)
    }
}

/// Sub-phase of the active seat's turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TurnPhase {
    /// The seat must roll.
    AwaitingRoll,
    /// The seat rolled and must pick a piece.
    AwaitingMoveChoice {
        /// Value rolled.
        roll: u8,
    },
}

/// Why a turn was given up without a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ForfeitReason {
    /// The turn timer expired.
    TurnTimeout,
    /// The seat is disconnected.
    Disconnected,
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EndReason {
    /// A player reached `points_to_win`.
    #[display("points reached")]
    PointsReached,
    /// A player brought every piece home.
    #[display("all pieces home")]
    AllPiecesHome,
    /// Every other player was eliminated.
    #[display("last survivor")]
    LastSurvivor,
    /// The session clock ran out.
    #[display("session time expired")]
    SessionTimeExpired,
    /// The move cap was reached.
    #[display("move cap reached")]
    MoveCapReached,
    /// A disconnected seat never came back.
    #[display("disconnect timeout for {}", seat)]
    DisconnectTimeout {
        /// Seat that timed out.
        seat: Seat,
    },
    /// Administrative or transport cancellation.
    #[display("cancelled: {}", message)]
    Cancelled {
        /// Caller-supplied reason.
        message: String,
    },
}

/// Final result of a terminal session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Terminal status.
    pub status: SessionStatus,
    /// Why the session ended.
    pub reason: EndReason,
    /// Winning seat (absent for aborted sessions).
    pub winner: Option<Seat>,
    /// Every seat, best first.
    pub standings: Vec<Seat>,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.winner {
            Some(seat) => write!(f, "{} wins ({})", seat, self.reason),
            None => write!(f, "{} ({})", self.status, self.reason),
        }
    }
}

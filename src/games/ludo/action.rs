//! First-class move types.
//!
//! A validated move is a [`MoveDelta`]: a proposed change computed from the
//! current state without touching it. The turn state machine commits deltas.

use serde::{Deserialize, Serialize};

use super::board::SquareKind;
use super::types::{Seat, TrackPosition};

/// A piece sent back to its yard by a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capture {
    /// Owner of the captured piece.
    pub seat: Seat,
    /// Index of the captured piece.
    pub piece: u8,
    /// Ring cell where the capture happened.
    pub cell: u16,
}

/// Proposed result of moving one piece.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDelta {
    /// Seat making the move.
    pub seat: Seat,
    /// Piece being moved.
    pub piece: u8,
    /// Die value used.
    pub roll: u8,
    /// Position before the move.
    pub from: TrackPosition,
    /// Position after the move.
    pub to: TrackPosition,
    /// Ring cell landed on, if the destination is on the shared ring.
    pub cell: Option<u16>,
    /// Special square at the destination, if any.
    pub square: Option<SquareKind>,
    /// Opposing pieces sent back to the yard.
    pub captures: Vec<Capture>,
    /// Kill-square bonus owed to the mover.
    pub square_bonus: u32,
}

impl MoveDelta {
    /// True if this move brings the piece home.
    pub fn reaches_home(&self) -> bool {
        self.to.is_home()
    }

    /// Distinct seats that lost at least one piece.
    pub fn victims(&self) -> Vec<Seat> {
        let mut seats: Vec<Seat> = self.captures.iter().map(|c| c.seat).collect();
        seats.sort();
        seats.dedup();
        seats
    }
}

impl std::fmt::Display for MoveDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} piece {} rolls {}: {:?} -> {:?}",
            self.seat, self.piece, self.roll, self.from, self.to
        )?;
        if !self.captures.is_empty() {
            write!(f, " capturing {}", self.captures.len())?;
        }
        Ok(())
    }
}

/// A request from a seat, or from the host, to the turn state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlayerAction {
    /// Confirm presence before the session starts.
    Join {
        /// Seat joining.
        seat: Seat,
    },
    /// Roll the die for the current turn.
    Roll {
        /// Seat rolling.
        seat: Seat,
    },
    /// Move a piece by the pending roll.
    Move {
        /// Seat moving.
        seat: Seat,
        /// Piece index.
        piece: u8,
    },
    /// Transport lost the seat.
    Disconnect {
        /// Seat that dropped.
        seat: Seat,
    },
    /// Transport regained the seat.
    Reconnect {
        /// Seat that returned.
        seat: Seat,
    },
    /// Host cancellation; stakes are refunded.
    Cancel {
        /// Reason recorded on the outcome.
        reason: String,
    },
}

/// Why a move request is illegal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum IllegalReason {
    /// Another seat is due to act.
    #[display("it is not this seat's turn")]
    NotYourTurn,
    /// Seat is not part of the session.
    #[display("unknown seat")]
    UnknownSeat,
    /// Seat was eliminated.
    #[display("seat has been eliminated")]
    Eliminated,
    /// Piece index out of range for the player.
    #[display("piece index out of range")]
    PieceOutOfRange,
    /// Piece already reached home.
    #[display("piece is already home")]
    PieceAlreadyHome,
    /// Destination holds one of the mover's own pieces on a non-safe cell.
    #[display("destination is blocked by an own piece")]
    BlockedByOwnPiece,
    /// The seat must roll before choosing a piece.
    #[display("no roll pending")]
    NoRollPending,
    /// The seat already rolled and must choose a piece.
    #[display("a move choice is pending")]
    MoveChoicePending,
    /// The session is not accepting game actions.
    #[display("session is not in progress")]
    NotInProgress,
    /// Join after the session started, or twice.
    #[display("seat cannot join now")]
    CannotJoin,
}

/// Error validating or applying a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveError {
    /// The request breaks a turn or board rule.
    #[display("Illegal move: {}", reason)]
    IllegalMove {
        /// What rule was broken.
        reason: IllegalReason,
    },
    /// A yard piece needs the entry roll.
    #[display("Rolled {} but a piece leaves the yard only on {}", roll, required)]
    NoEntryRoll {
        /// Value rolled.
        roll: u8,
        /// Entry value.
        required: u8,
    },
    /// The roll would carry the piece past home.
    #[display("Moving {} from {} overshoots home at {}", roll, from, path_length)]
    Overshoot {
        /// Progress before the move.
        from: u16,
        /// Value rolled.
        roll: u8,
        /// Progress value of home.
        path_length: u16,
    },
}

impl MoveError {
    /// Shorthand for [`MoveError::IllegalMove`].
    pub fn illegal(reason: IllegalReason) -> Self {
        MoveError::IllegalMove { reason }
    }

    /// Taxonomy name of the error.
    pub fn kind(&self) -> &'static str {
        match self {
            MoveError::IllegalMove { .. } => "IllegalMove",
            MoveError::NoEntryRoll { .. } => "NoEntryRoll",
            MoveError::Overshoot { .. } => "Overshoot",
        }
    }
}

impl std::error::Error for MoveError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn victims_are_deduplicated() {
        let delta = MoveDelta {
            seat: Seat(0),
            piece: 0,
            roll: 3,
            from: TrackPosition::Path(2),
            to: TrackPosition::Path(5),
            cell: Some(5),
            square: None,
            captures: vec![
                Capture { seat: Seat(2), piece: 1, cell: 5 },
                Capture { seat: Seat(1), piece: 0, cell: 5 },
                Capture { seat: Seat(2), piece: 3, cell: 5 },
            ],
            square_bonus: 0,
        };
        assert_eq!(delta.victims(), vec![Seat(1), Seat(2)]);
    }

    #[test]
    fn error_kinds_follow_taxonomy() {
        assert_eq!(MoveError::illegal(IllegalReason::NotYourTurn).kind(), "IllegalMove");
        assert_eq!(MoveError::NoEntryRoll { roll: 3, required: 6 }.kind(), "NoEntryRoll");
        let overshoot = MoveError::Overshoot { from: 55, roll: 4, path_length: 57 };
        assert_eq!(overshoot.kind(), "Overshoot");
        assert!(overshoot.to_string().contains("overshoots"));
    }
}

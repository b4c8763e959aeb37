//! Core domain types for the race game.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Unique identifier for a game session.
pub type SessionId = String;

/// Unique identifier for a player.
pub type PlayerId = String;

/// Seat at the table (0-based).
///
/// The seat fixes both turn order and the player's path offset on the board.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[display("seat {}", _0)]
#[serde(transparent)]
pub struct Seat(pub u8);

impl Seat {
    /// Returns the seat as an index into the player list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Rule variant of a game type.
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
pub enum Variant {
    /// Pure race: first player with every piece home wins. No points.
    Quick,
    /// Points for captures, penalties for being captured.
    Classic,
    /// Classic scoring plus kill squares and lives.
    Kill,
}

/// Logical position of a piece along its owner's path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackPosition {
    /// Waiting in the home yard.
    Yard,
    /// On the path, counted in cells from the seat's start cell.
    Path(u16),
    /// Reached the final cell.
    Home,
}

impl TrackPosition {
    /// Returns the position in the `-1 / 0..path_length / path_length` encoding.
    pub fn logical(self, path_length: u16) -> i32 {
        match self {
            TrackPosition::Yard => -1,
            TrackPosition::Path(progress) => i32::from(progress),
            TrackPosition::Home => i32::from(path_length),
        }
    }

    /// Returns true if the piece sits in the yard.
    pub fn is_yard(self) -> bool {
        matches!(self, TrackPosition::Yard)
    }

    /// Returns true if the piece reached home.
    pub fn is_home(self) -> bool {
        matches!(self, TrackPosition::Home)
    }
}

/// A single piece.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Piece {
    /// Seat that owns the piece.
    owner: Seat,
    /// Index of the piece within its owner's set.
    index: u8,
    /// Current position.
    pub(crate) position: TrackPosition,
}

impl Piece {
    /// Creates a piece waiting in the yard.
    pub fn in_yard(owner: Seat, index: u8) -> Self {
        Self {
            owner,
            index,
            position: TrackPosition::Yard,
        }
    }
}

/// A player seated in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Player {
    /// Player identity supplied by the roster.
    id: PlayerId,
    /// Seat assigned from roster order.
    seat: Seat,
    /// Pieces in index order.
    pub(crate) pieces: Vec<Piece>,
    /// Current score.
    pub(crate) score: u32,
    /// Lives remaining (KILL only).
    pub(crate) lives: Option<u8>,
    /// Out of the game (KILL only).
    pub(crate) eliminated: bool,
    /// Confirmed presence before the session starts.
    pub(crate) joined: bool,
    /// Transport reported the player gone.
    pub(crate) disconnected: bool,
    /// Captures landed by this player.
    pub(crate) kills: u32,
}

impl Player {
    /// Creates a player with every piece in the yard.
    pub fn new(id: PlayerId, seat: Seat, piece_count: u8, lives: Option<u8>) -> Self {
        Self {
            id,
            seat,
            pieces: (0..piece_count).map(|i| Piece::in_yard(seat, i)).collect(),
            score: 0,
            lives,
            eliminated: false,
            joined: false,
            disconnected: false,
            kills: 0,
        }
    }

    /// Number of pieces that reached home.
    pub fn pieces_home(&self) -> usize {
        self.pieces.iter().filter(|p| p.position.is_home()).count()
    }

    /// True once every piece is home.
    pub fn all_home(&self) -> bool {
        !self.pieces.is_empty() && self.pieces.iter().all(|p| p.position.is_home())
    }

    /// True if the player still takes turns.
    pub fn is_active(&self) -> bool {
        !self.eliminated
    }
}

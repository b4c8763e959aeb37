//! Move validation against board topology and special squares.
//!
//! Validation is a pure function of session state: it returns a proposed
//! [`MoveDelta`] and never mutates the session.

use tracing::{debug, instrument};

use super::action::{Capture, IllegalReason, MoveDelta, MoveError};
use super::board::SquareKind;
use super::engine::Match;
use super::phases::SessionStatus;
use super::types::{Piece, Player, Seat, TrackPosition, Variant};

// ─────────────────────────────────────────────────────────────
//  Preconditions
// ─────────────────────────────────────────────────────────────

/// Precondition: the session is running and `seat` is the active, eligible seat.
pub struct PlayersTurn;

impl PlayersTurn {
    /// Returns the acting player if the seat may act now.
    pub fn check(game: &Match, seat: Seat) -> Result<&Player, MoveError> {
        if *game.status() != SessionStatus::InProgress {
            return Err(MoveError::illegal(IllegalReason::NotInProgress));
        }
        let player = game
            .players()
            .get(seat.index())
            .ok_or(MoveError::illegal(IllegalReason::UnknownSeat))?;
        if player.eliminated {
            return Err(MoveError::illegal(IllegalReason::Eliminated));
        }
        if game.current_seat() != seat {
            return Err(MoveError::illegal(IllegalReason::NotYourTurn));
        }
        Ok(player)
    }
}

/// Precondition: the piece exists and is still in play.
pub struct PieceInPlay;

impl PieceInPlay {
    /// Returns the piece if it can still move.
    pub fn check(player: &Player, piece: u8) -> Result<&Piece, MoveError> {
        let found = player
            .pieces
            .get(usize::from(piece))
            .ok_or(MoveError::illegal(IllegalReason::PieceOutOfRange))?;
        if found.position.is_home() {
            return Err(MoveError::illegal(IllegalReason::PieceAlreadyHome));
        }
        Ok(found)
    }
}

/// Computes where a roll takes a piece along its own path.
pub struct Advance;

impl Advance {
    /// Resolves the destination, enforcing the entry roll and the no-overshoot rule.
    pub fn resolve(
        from: TrackPosition,
        roll: u8,
        entry_value: u8,
        path_length: u16,
    ) -> Result<TrackPosition, MoveError> {
        match from {
            TrackPosition::Yard if roll == entry_value => Ok(TrackPosition::Path(0)),
            TrackPosition::Yard => Err(MoveError::NoEntryRoll {
                roll,
                required: entry_value,
            }),
            TrackPosition::Path(progress) => {
                match progress.checked_add(u16::from(roll)) {
                    Some(target) if target == path_length => Ok(TrackPosition::Home),
                    Some(target) if target < path_length => Ok(TrackPosition::Path(target)),
                    _ => Err(MoveError::Overshoot {
                        from: progress,
                        roll,
                        path_length,
                    }),
                }
            }
            TrackPosition::Home => Err(MoveError::illegal(IllegalReason::PieceAlreadyHome)),
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Validator
// ─────────────────────────────────────────────────────────────

/// Decides move legality and computes the resulting delta.
pub struct MoveValidator;

impl MoveValidator {
    /// Validates moving `piece` of `seat` by `roll`.
    ///
    /// # Errors
    ///
    /// - [`MoveError::IllegalMove`] when it is not the seat's turn, the piece
    ///   index is out of range, the piece is home, or an own piece blocks the
    ///   destination.
    /// - [`MoveError::NoEntryRoll`] when a yard piece is moved without the entry roll.
    /// - [`MoveError::Overshoot`] when the roll would pass home.
    #[instrument(skip(game), fields(session_id = %game.id()))]
    pub fn validate(game: &Match, seat: Seat, piece: u8, roll: u8) -> Result<MoveDelta, MoveError> {
        let player = PlayersTurn::check(game, seat)?;
        let moving = PieceInPlay::check(player, piece)?;
        let rules = game.rules();
        let board = game.board();

        let from = moving.position;
        let to = Advance::resolve(from, roll, *rules.entry_value(), board.path_length())?;

        let cell = match to {
            TrackPosition::Path(progress) => board.absolute_cell(seat, progress),
            _ => None,
        };

        let mut delta = MoveDelta {
            seat,
            piece,
            roll,
            from,
            to,
            cell,
            square: None,
            captures: Vec::new(),
            square_bonus: 0,
        };

        let Some(cell) = cell else {
            debug!(%delta, "Move ends off the shared ring");
            return Ok(delta);
        };

        let square = board.square(cell);
        delta.square = square.map(|s| *s.kind());
        let safe = delta.square == Some(SquareKind::Safe);

        let blocked = player.pieces.iter().any(|other| {
            *other.index() != piece && Self::cell_of(game, other) == Some(cell)
        });
        if blocked && !safe {
            return Err(MoveError::illegal(IllegalReason::BlockedByOwnPiece));
        }

        if !safe {
            delta.captures = game
                .players()
                .iter()
                .filter(|p| *p.seat() != seat && p.is_active())
                .flat_map(|p| p.pieces.iter())
                .filter(|p| Self::cell_of(game, p) == Some(cell))
                .map(|p| Capture {
                    seat: *p.owner(),
                    piece: *p.index(),
                    cell,
                })
                .collect();
        }

        if delta.square == Some(SquareKind::Kill)
            && *rules.variant() == Variant::Kill
            && !delta.captures.is_empty()
        {
            delta.square_bonus = square
                .and_then(|s| *s.points())
                .unwrap_or(*rules.kill_mode_bonus());
        }

        debug!(%delta, captures = delta.captures.len(), "Move validated");
        Ok(delta)
    }

    /// Lists every legal move for `seat` with `roll`, in piece order.
    #[instrument(skip(game), fields(session_id = %game.id()))]
    pub fn legal_moves(game: &Match, seat: Seat, roll: u8) -> Vec<MoveDelta> {
        let Some(player) = game.players().get(seat.index()) else {
            return Vec::new();
        };
        (0..player.pieces.len())
            .filter_map(|i| u8::try_from(i).ok())
            .filter_map(|i| Self::validate(game, seat, i, roll).ok())
            .collect()
    }

    /// Ring cell a piece currently occupies.
    fn cell_of(game: &Match, piece: &Piece) -> Option<u16> {
        match piece.position {
            TrackPosition::Path(progress) => game.board().absolute_cell(*piece.owner(), progress),
            _ => None,
        }
    }
}

//! Capture exclusivity: opposing pieces never share a non-safe cell.

use std::collections::HashMap;

use super::super::engine::Match;
use super::super::types::TrackPosition;
use super::Invariant;

/// Invariant: outside safe squares, every occupied ring cell belongs to a
/// single seat.
pub struct CaptureExclusiveInvariant;

impl Invariant<Match> for CaptureExclusiveInvariant {
    fn holds(game: &Match) -> bool {
        let board = game.board();
        let mut owners = HashMap::new();
        for player in game.players().iter().filter(|p| p.is_active()) {
            for piece in player.pieces() {
                let TrackPosition::Path(progress) = *piece.position() else {
                    continue;
                };
                let Some(cell) = board.absolute_cell(*player.seat(), progress) else {
                    continue;
                };
                if board.is_safe(cell) {
                    continue;
                }
                if *owners.entry(cell).or_insert(*player.seat()) != *player.seat() {
                    return false;
                }
            }
        }
        true
    }

    fn description() -> &'static str {
        "No two opposing pieces share a non-safe cell"
    }
}

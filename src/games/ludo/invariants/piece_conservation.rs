//! Piece conservation: yard + path + home is constant per player.

use super::super::engine::Match;
use super::Invariant;

/// Invariant: every player owns exactly `pieces_per_player` pieces, indexed
/// in order, and none has wandered past home.
pub struct PieceConservationInvariant;

impl Invariant<Match> for PieceConservationInvariant {
    fn holds(game: &Match) -> bool {
        let expected = usize::from(*game.board().pieces_per_player());
        let path_length = game.board().path_length();
        game.players().iter().all(|player| {
            player.pieces().len() == expected
                && player.pieces().iter().enumerate().all(|(i, piece)| {
                    usize::from(*piece.index()) == i
                        && piece.owner() == player.seat()
                        && piece.position().logical(path_length) <= i32::from(path_length)
                })
        })
    }

    fn description() -> &'static str {
        "Each player keeps a fixed set of pieces between yard, path and home"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::ludo::invariants::fixtures::started_match;

    #[test]
    fn holds_for_a_fresh_session() {
        assert!(PieceConservationInvariant::holds(&started_match()));
    }

    #[test]
    fn snapshot_of_pieces_counts_match() {
        let game = started_match();
        let snapshot = game.snapshot();
        let total: usize = snapshot.players().iter().map(|p| p.pieces().len()).sum();
        assert_eq!(total, 4);
    }
}

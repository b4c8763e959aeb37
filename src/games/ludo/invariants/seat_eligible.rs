//! The seat to act is never an eliminated player.

use super::super::engine::Match;
use super::super::phases::SessionStatus;
use super::Invariant;

/// Invariant: while the session runs, the current seat is still in the game.
pub struct SeatEligibleInvariant;

impl Invariant<Match> for SeatEligibleInvariant {
    fn holds(game: &Match) -> bool {
        if *game.status() != SessionStatus::InProgress {
            return true;
        }
        game.player(game.current_seat())
            .is_some_and(|player| player.is_active())
    }

    fn description() -> &'static str {
        "The current seat belongs to a player who has not been eliminated"
    }
}

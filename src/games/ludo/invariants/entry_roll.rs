//! Pieces leave the yard only on the entry roll.

use super::super::engine::{Match, TurnRecord};
use super::super::types::TrackPosition;
use super::Invariant;

/// Invariant: every recorded move out of the yard used the entry value and
/// landed on the start cell.
pub struct EntryRollInvariant;

impl Invariant<Match> for EntryRollInvariant {
    fn holds(game: &Match) -> bool {
        let entry = *game.rules().entry_value();
        game.history().iter().all(|step| match &step.record {
            TurnRecord::Moved { delta, .. } if delta.from.is_yard() => {
                delta.roll == entry && delta.to == TrackPosition::Path(0)
            }
            _ => true,
        })
    }

    fn description() -> &'static str {
        "Yard pieces only leave on the entry value"
    }
}

//! Variant-specific scoring.
//!
//! One strategy is selected from the rule set when a session is created; the
//! turn state machine only ever talks to [`ScoringStrategy`].

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::action::MoveDelta;
use super::rules::RuleSet;
use super::types::{Player, Seat, Variant};

/// Point and life changes caused by one committed move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    /// Seat that moved.
    pub mover: Seat,
    /// Points awarded to the mover.
    pub awarded: u32,
    /// Points deducted per victim seat (before flooring at zero).
    pub penalties: Vec<(Seat, u32)>,
    /// Seats losing one life.
    pub lives_lost: Vec<Seat>,
    /// Pieces captured by the mover.
    pub kills: u32,
}

impl ScoreDelta {
    /// A delta that changes nothing.
    pub fn none(mover: Seat) -> Self {
        Self {
            mover,
            awarded: 0,
            penalties: Vec::new(),
            lives_lost: Vec::new(),
            kills: 0,
        }
    }
}

/// Scoring contract shared by every variant.
pub trait ScoringStrategy {
    /// Variant this strategy implements.
    fn variant(&self) -> Variant;

    /// Computes score changes for a validated move.
    fn score(&self, delta: &MoveDelta) -> ScoreDelta;

    /// True if `player` has met the variant's win condition.
    fn is_winner(&self, player: &Player) -> bool;
}

/// QUICK: positional only, first all-home wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickScoring;

impl ScoringStrategy for QuickScoring {
    fn variant(&self) -> Variant {
        Variant::Quick
    }

    fn score(&self, delta: &MoveDelta) -> ScoreDelta {
        ScoreDelta {
            kills: u32::try_from(delta.captures.len()).unwrap_or(u32::MAX),
            ..ScoreDelta::none(delta.seat)
        }
    }

    fn is_winner(&self, player: &Player) -> bool {
        player.all_home()
    }
}

/// CLASSIC: bonus per capture, penalty per piece lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassicScoring {
    bonus: u32,
    penalty: u32,
    points_to_win: u32,
}

impl ClassicScoring {
    /// Creates classic scoring constants.
    pub fn new(bonus: u32, penalty: u32, points_to_win: u32) -> Self {
        Self {
            bonus,
            penalty,
            points_to_win,
        }
    }
}

impl ScoringStrategy for ClassicScoring {
    fn variant(&self) -> Variant {
        Variant::Classic
    }

    fn score(&self, delta: &MoveDelta) -> ScoreDelta {
        let kills = u32::try_from(delta.captures.len()).unwrap_or(u32::MAX);
        let penalties = delta
            .victims()
            .into_iter()
            .map(|victim| {
                let lost = delta.captures.iter().filter(|c| c.seat == victim).count();
                let lost = u32::try_from(lost).unwrap_or(u32::MAX);
                (victim, lost.saturating_mul(self.penalty))
            })
            .collect();
        ScoreDelta {
            mover: delta.seat,
            awarded: kills.saturating_mul(self.bonus),
            penalties,
            lives_lost: Vec::new(),
            kills,
        }
    }

    fn is_winner(&self, player: &Player) -> bool {
        player.score >= self.points_to_win
    }
}

/// KILL: classic scoring, kill-square bonus, lives and elimination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillScoring {
    classic: ClassicScoring,
}

impl KillScoring {
    /// Creates kill scoring on top of classic constants.
    pub fn new(classic: ClassicScoring) -> Self {
        Self { classic }
    }
}

impl ScoringStrategy for KillScoring {
    fn variant(&self) -> Variant {
        Variant::Kill
    }

    fn score(&self, delta: &MoveDelta) -> ScoreDelta {
        let mut scored = self.classic.score(delta);
        scored.awarded = scored.awarded.saturating_add(delta.square_bonus);
        scored.lives_lost = delta.victims();
        scored
    }

    fn is_winner(&self, player: &Player) -> bool {
        self.classic.is_winner(player)
    }
}

/// Scoring strategy chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoring {
    /// QUICK rules.
    Quick(QuickScoring),
    /// CLASSIC rules.
    Classic(ClassicScoring),
    /// KILL rules.
    Kill(KillScoring),
}

impl Scoring {
    /// Selects the strategy for a rule set.
    #[instrument(skip(rules), fields(variant = %rules.variant()))]
    pub fn for_rules(rules: &RuleSet) -> Self {
        let classic = ClassicScoring::new(
            *rules.classic_bonus_points(),
            *rules.classic_penalty_points(),
            *rules.points_to_win(),
        );
        match rules.variant() {
            Variant::Quick => Scoring::Quick(QuickScoring),
            Variant::Classic => Scoring::Classic(classic),
            Variant::Kill => Scoring::Kill(KillScoring::new(classic)),
        }
    }

    fn strategy(&self) -> &dyn ScoringStrategy {
        match self {
            Scoring::Quick(s) => s,
            Scoring::Classic(s) => s,
            Scoring::Kill(s) => s,
        }
    }
}

impl ScoringStrategy for Scoring {
    fn variant(&self) -> Variant {
        self.strategy().variant()
    }

    fn score(&self, delta: &MoveDelta) -> ScoreDelta {
        self.strategy().score(delta)
    }

    fn is_winner(&self, player: &Player) -> bool {
        self.strategy().is_winner(player)
    }
}

/// Orders seats best first.
///
/// Survivors rank before eliminated players, then score descending, pieces
/// home descending, and finally the lower seat wins a tie. The order is total
/// and deterministic; it decides who gets paid on forced completion.
pub fn rank(players: &[Player]) -> Vec<Seat> {
    let mut ranked: Vec<&Player> = players.iter().collect();
    ranked.sort_by_key(|p| (p.eliminated, Reverse(p.score), Reverse(p.pieces_home()), *p.seat()));
    ranked.into_iter().map(|p| *p.seat()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::ludo::action::Capture;
    use crate::games::ludo::board::SquareKind;
    use crate::games::ludo::types::TrackPosition;

    fn capture_move(captures: Vec<Capture>, square_bonus: u32) -> MoveDelta {
        MoveDelta {
            seat: Seat(0),
            piece: 0,
            roll: 4,
            from: TrackPosition::Path(3),
            to: TrackPosition::Path(7),
            cell: Some(7),
            square: (square_bonus > 0).then_some(SquareKind::Kill),
            captures,
            square_bonus,
        }
    }

    fn victim(seat: u8, piece: u8) -> Capture {
        Capture { seat: Seat(seat), piece, cell: 7 }
    }

    #[test]
    fn quick_awards_nothing() {
        let delta = capture_move(vec![victim(1, 0)], 0);
        let scored = QuickScoring.score(&delta);
        assert_eq!(scored.awarded, 0);
        assert!(scored.penalties.is_empty());
        assert_eq!(scored.kills, 1);
    }

    #[test]
    fn classic_bonus_and_penalty_per_piece() {
        let delta = capture_move(vec![victim(1, 0), victim(1, 2)], 0);
        let scored = ClassicScoring::new(10, 5, 30).score(&delta);
        assert_eq!(scored.awarded, 20);
        assert_eq!(scored.penalties, vec![(Seat(1), 10)]);
        assert!(scored.lives_lost.is_empty());
    }

    #[test]
    fn kill_adds_square_bonus_and_costs_lives() {
        let delta = capture_move(vec![victim(1, 0), victim(2, 1)], 25);
        let scored = KillScoring::new(ClassicScoring::new(10, 5, 30)).score(&delta);
        assert_eq!(scored.awarded, 45);
        assert_eq!(scored.lives_lost, vec![Seat(1), Seat(2)]);
    }

    #[test]
    fn ranking_breaks_ties_by_home_then_seat() {
        let mut players: Vec<Player> = (0..4)
            .map(|i| Player::new(format!("p{i}"), Seat(i), 2, None))
            .collect();
        players[0].score = 10;
        players[1].score = 20;
        players[2].score = 10;
        players[2].pieces[0].position = TrackPosition::Home;
        players[3].score = 10;
        assert_eq!(rank(&players), vec![Seat(1), Seat(2), Seat(0), Seat(3)]);
    }

    #[test]
    fn eliminated_players_rank_last() {
        let mut players: Vec<Player> = (0..3)
            .map(|i| Player::new(format!("p{i}"), Seat(i), 1, Some(2)))
            .collect();
        players[0].score = 50;
        players[0].eliminated = true;
        assert_eq!(rank(&players), vec![Seat(1), Seat(2), Seat(0)]);
    }
}

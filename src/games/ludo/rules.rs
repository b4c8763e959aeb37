//! Resolved, immutable rule set for one game type.

use std::sync::Arc;
use std::time::Duration;

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::board::BoardTopology;
use super::types::Variant;

/// Rule violations found while resolving a rule set.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum RuleError {
    /// Player bounds outside 2..=4 or inverted.
    #[display("Player bounds {}..={} must satisfy 2 <= min <= max <= 4", _0, _1)]
    PlayerBounds(u8, u8),
    /// `points_to_win` is zero.
    #[display("points_to_win must be at least 1")]
    PointsToWin,
    /// KILL games need 1..=4 lives.
    #[display("lives_per_player must be between 1 and 4 for KILL, got {}", _0)]
    Lives(u8),
    /// Dice faces or entry value nonsensical.
    #[display("entry value {} must be a face of a {}-sided die", entry_value, dice_faces)]
    Dice {
        /// Faces on the die.
        dice_faces: u8,
        /// Roll required to leave the yard.
        entry_value: u8,
    },
    /// The board has fewer start cells than the largest roster.
    #[display("Board has {} seats but rules allow {} players", seats, max_players)]
    NotEnoughSeats {
        /// Start cells on the board.
        seats: usize,
        /// Largest roster.
        max_players: u8,
    },
}

impl std::error::Error for RuleError {}

/// Immutable rules for a session.
///
/// Built once from a game-type configuration and shared by every session of
/// that type. Durations of zero mean "unlimited", as does a `max_moves` of 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct RuleSet {
    /// Game-type identifier this rule set was resolved from.
    id: String,
    /// Rule variant.
    variant: Variant,
    /// Smallest roster allowed.
    min_players: u8,
    /// Largest roster allowed.
    max_players: u8,
    /// Stake each player pays in, in minor currency units.
    entry_fee: u64,
    /// Score that wins CLASSIC and KILL games.
    points_to_win: u32,
    /// Overall session wall-clock limit.
    time_limit: Duration,
    /// Limit on a single turn (roll plus move choice).
    turn_time_limit: Duration,
    /// Cap on committed moves across all players.
    max_moves: u32,
    /// Lives each player starts with in KILL games.
    lives_per_player: u8,
    /// Points for each piece captured (CLASSIC and KILL).
    classic_bonus_points: u32,
    /// Points lost for each piece captured (CLASSIC and KILL).
    classic_penalty_points: u32,
    /// Default kill-square bonus; also the side-pot accrual per kill.
    kill_mode_bonus: u32,
    /// Faces on the die.
    dice_faces: u8,
    /// Roll that lets a piece leave the yard.
    entry_value: u8,
}

impl RuleSet {
    /// Resolves and validates a rule set.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if any bound is violated.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        variant: Variant,
        min_players: u8,
        max_players: u8,
        entry_fee: u64,
        points_to_win: u32,
        time_limit: Duration,
        turn_time_limit: Duration,
        max_moves: u32,
        lives_per_player: u8,
        classic_bonus_points: u32,
        classic_penalty_points: u32,
        kill_mode_bonus: u32,
        dice_faces: u8,
        entry_value: u8,
    ) -> Result<Self, RuleError> {
        if min_players < 2 || max_players > 4 || min_players > max_players {
            return Err(RuleError::PlayerBounds(min_players, max_players));
        }
        if points_to_win == 0 {
            return Err(RuleError::PointsToWin);
        }
        if variant == Variant::Kill && !(1..=4).contains(&lives_per_player) {
            return Err(RuleError::Lives(lives_per_player));
        }
        if dice_faces == 0 || entry_value == 0 || entry_value > dice_faces {
            return Err(RuleError::Dice {
                dice_faces,
                entry_value,
            });
        }
        Ok(Self {
            id,
            variant,
            min_players,
            max_players,
            entry_fee,
            points_to_win,
            time_limit,
            turn_time_limit,
            max_moves,
            lives_per_player,
            classic_bonus_points,
            classic_penalty_points,
            kill_mode_bonus,
            dice_faces,
            entry_value,
        })
    }

    /// Lives a player starts with, `None` outside KILL.
    pub fn starting_lives(&self) -> Option<u8> {
        (self.variant == Variant::Kill).then_some(self.lives_per_player)
    }

    /// Session time limit, `None` if unlimited.
    pub fn session_limit(&self) -> Option<Duration> {
        (!self.time_limit.is_zero()).then_some(self.time_limit)
    }

    /// Turn time limit, `None` if unlimited.
    pub fn turn_limit(&self) -> Option<Duration> {
        (!self.turn_time_limit.is_zero()).then_some(self.turn_time_limit)
    }

    /// Move cap, `None` if unlimited.
    pub fn move_cap(&self) -> Option<u32> {
        (self.max_moves != 0).then_some(self.max_moves)
    }
}

/// A playable game type: rules plus the board they are played on.
///
/// Both halves are read-only and shared between every session of the type.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct GameType {
    /// Resolved rules.
    rules: Arc<RuleSet>,
    /// Board topology.
    board: Arc<BoardTopology>,
}

impl GameType {
    /// Pairs a rule set with a board.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::NotEnoughSeats`] if the board cannot seat `max_players`.
    #[instrument(skip(rules, board), fields(game_type = %rules.id()))]
    pub fn new(rules: RuleSet, board: BoardTopology) -> Result<Self, RuleError> {
        if board.seats() < usize::from(rules.max_players) {
            return Err(RuleError::NotEnoughSeats {
                seats: board.seats(),
                max_players: rules.max_players,
            });
        }
        info!(variant = %rules.variant, path_length = board.path_length(), "Game type resolved");
        Ok(Self {
            rules: Arc::new(rules),
            board: Arc::new(board),
        })
    }

    /// Identifier of the game type.
    pub fn id(&self) -> &str {
        &self.rules.id
    }
}

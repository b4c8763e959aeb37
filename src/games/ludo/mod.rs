//! Ludo-family race game: board, rules, validation, turns, scoring and settlement.

mod action;
mod board;
mod contracts;
mod dice;
mod engine;
mod invariants;
mod phases;
mod rules;
mod scoring;
mod settlement;
mod types;
mod validator;

pub use action::{Capture, IllegalReason, MoveDelta, MoveError, PlayerAction};
pub use board::{BoardError, BoardTopology, SpecialSquare, SquareKind};
pub use contracts::{CommitContract, Contract, ContractViolation};
pub use dice::{Dice, DiceFactory, RandomDice, RandomDiceFactory, ScriptedDice};
pub use engine::{HistoryEntry, Match, MatchSnapshot, TurnRecord};
pub use invariants::{
    CaptureExclusiveInvariant, EntryRollInvariant, Invariant, InvariantSet, InvariantViolation,
    LudoInvariants, PieceConservationInvariant, SeatEligibleInvariant,
};
pub use phases::{EndReason, ForfeitReason, Outcome, SessionStatus, TurnPhase};
pub use rules::{GameType, RuleError, RuleSet};
pub use scoring::{
    ClassicScoring, KillScoring, QuickScoring, ScoreDelta, Scoring, ScoringStrategy, rank,
};
pub use settlement::{LeaderboardDelta, Payout, RakePolicy, SettlementResult, SettlementService};
pub use types::{Piece, Player, PlayerId, Seat, SessionId, TrackPosition, Variant};
pub use validator::{Advance, MoveValidator, PieceInPlay, PlayersTurn};

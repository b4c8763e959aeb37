//! Strictly Ludo library - match engine for Ludo-family race games
//!
//! Runs live sessions of a race board game in three rule variants (QUICK,
//! CLASSIC, KILL) from join through move resolution to stake settlement.
//!
//! # Architecture
//!
//! - **Games**: board topology, rule sets, move validation, turn state
//!   machine, scoring and settlement
//! - **Session**: manager routing inbound actions, timers, event bus
//! - **Store**: session records in memory or SQLite
//! - **Server**: HTTP/JSON front end
//!
//! # Example
//!
//! ```no_run
//! use strictly_ludo::{EngineConfig, GameTypeCatalog, SessionManager};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = EngineConfig::from_file("config/engine.toml")?;
//! let catalog = GameTypeCatalog::from_configs(config.game_types())?;
//! let manager = SessionManager::builder(catalog)
//!     .settings(config.settings().clone())
//!     .build();
//!
//! let session = manager.create_session("classic", vec!["ana".into(), "ben".into()])?;
//! manager.join(session.session_id(), strictly_ludo::Seat(0))?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod bot;
mod catalog;
mod config;
mod db;
mod error;
mod events;
mod games;
mod server;
mod session;
mod simulation;
mod store;
mod timers;

// Crate-level exports - Configuration
pub use catalog::GameTypeCatalog;
pub use config::{BoardConfig, ConfigError, EngineConfig, EngineSettings, GameTypeConfig};

// Crate-level exports - Errors and events
pub use error::EngineError;
pub use events::{EngineEvent, EventBus};

// Crate-level exports - Session management
pub use session::{SessionManager, SessionManagerBuilder};
pub use timers::{TimerArena, TimerKind};

// Crate-level exports - Persistence
pub use db::{SqliteSessionStore, StoreError};
pub use store::{MemorySessionStore, SessionRecord, SessionStore};

// Crate-level exports - HTTP front end
pub use server::{
    ApiError, CancelRequest, CreateSessionRequest, MoveRequest, RollResponse, SeatRequest, router,
    serve,
};

// Crate-level exports - Simulation
pub use bot::{Bot, Fish, Greedy};
pub use simulation::{Simulation, SimulationReport};

// Crate-level exports - Game types
pub use games::ludo::{
    Advance, BoardError, BoardTopology, Capture, CaptureExclusiveInvariant, ClassicScoring,
    CommitContract, Contract, ContractViolation, Dice, DiceFactory, EndReason,
    EntryRollInvariant, ForfeitReason, GameType, HistoryEntry, IllegalReason, Invariant,
    InvariantSet, InvariantViolation, KillScoring, LeaderboardDelta, LudoInvariants, Match,
    MatchSnapshot, MoveDelta, MoveError, MoveValidator, Outcome, Payout, Piece, PieceInPlay,
    PieceConservationInvariant, Player, PlayerAction, PlayerId, PlayersTurn, QuickScoring,
    RakePolicy, RandomDice, RandomDiceFactory, RuleError, RuleSet, ScoreDelta, Scoring,
    ScoringStrategy, ScriptedDice, Seat, SeatEligibleInvariant, SessionId, SessionStatus,
    SettlementResult, SettlementService, SpecialSquare, SquareKind, TrackPosition, TurnPhase,
    TurnRecord, Variant, rank,
};

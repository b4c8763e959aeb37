//! Engine configuration loaded from TOML.

use std::path::Path;
use std::time::Duration;

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::games::ludo::{BoardTopology, GameType, RuleSet, SpecialSquare, Variant};

/// Host-wide engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct EngineSettings {
    /// Share of each completed pool kept by the host.
    rake_basis_points: u16,
    /// Grace period before a disconnected seat ends the session.
    disconnect_timeout_secs: u64,
    /// Events buffered per subscriber before it lags.
    event_capacity: usize,
    /// SQLite database for session records; in-memory store when absent.
    #[setters(strip_option)]
    db_path: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            rake_basis_points: 500,
            disconnect_timeout_secs: 60,
            event_capacity: 256,
            db_path: None,
        }
    }
}

impl EngineSettings {
    /// Disconnect grace period.
    pub fn disconnect_timeout(&self) -> Duration {
        Duration::from_secs(self.disconnect_timeout_secs)
    }
}

/// Board section of a game type. Omit it for the standard board.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Cells on the shared ring.
    track_cells: u16,
    /// Private home cells per seat.
    home_column: u16,
    /// Pieces each player owns.
    #[serde(default = "default_pieces")]
    pieces_per_player: u8,
    /// Start cell per seat.
    seat_offsets: Vec<u16>,
    /// Safe and kill squares.
    #[serde(default)]
    special_squares: Vec<SpecialSquare>,
}

fn default_pieces() -> u8 {
    4
}

impl BoardConfig {
    fn resolve(&self) -> Result<BoardTopology, ConfigError> {
        BoardTopology::new(
            self.track_cells,
            self.home_column,
            self.pieces_per_player,
            self.seat_offsets.clone(),
            self.special_squares.clone(),
        )
        .map_err(|e| ConfigError::new(format!("Invalid board: {}", e)))
    }
}

/// One `[[game_types]]` entry, or one file in a game-type directory.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct GameTypeConfig {
    /// Identifier sessions are created with.
    id: String,
    /// Rule variant.
    variant: Variant,
    #[serde(default = "default_min_players")]
    min_players: u8,
    #[serde(default = "default_max_players")]
    max_players: u8,
    #[serde(default)]
    entry_fee: u64,
    #[serde(default = "default_points_to_win")]
    points_to_win: u32,
    /// Zero disables the session clock.
    #[serde(default)]
    time_limit_secs: u64,
    /// Zero disables the turn clock.
    #[serde(default = "default_turn_secs")]
    turn_time_limit_secs: u64,
    /// Zero means no move cap.
    #[serde(default)]
    max_moves: u32,
    #[serde(default = "default_lives")]
    lives_per_player: u8,
    #[serde(default = "default_bonus")]
    classic_bonus_points: u32,
    #[serde(default = "default_penalty")]
    classic_penalty_points: u32,
    #[serde(default = "default_kill_bonus")]
    kill_mode_bonus: u32,
    #[serde(default = "default_faces")]
    dice_faces: u8,
    #[serde(default = "default_faces")]
    entry_value: u8,
    /// Custom board; the standard board when absent.
    #[serde(default)]
    board: Option<BoardConfig>,
}

fn default_min_players() -> u8 {
    2
}

fn default_max_players() -> u8 {
    4
}

fn default_points_to_win() -> u32 {
    50
}

fn default_turn_secs() -> u64 {
    30
}

fn default_lives() -> u8 {
    3
}

fn default_bonus() -> u32 {
    10
}

fn default_penalty() -> u32 {
    5
}

fn default_kill_bonus() -> u32 {
    20
}

fn default_faces() -> u8 {
    6
}

impl GameTypeConfig {
    /// Loads a single game type from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading game type from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read game type file: {}", e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse game type: {}", e)))?;
        info!(game_type = %config.id, variant = %config.variant, "Game type loaded");
        Ok(config)
    }

    /// Validates the entry and builds the shared rules and board.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the game type if any rule or board
    /// constraint is violated.
    #[instrument(skip(self), fields(game_type = %self.id))]
    pub fn resolve(&self) -> Result<GameType, ConfigError> {
        let rules = RuleSet::new(
            self.id.clone(),
            self.variant,
            self.min_players,
            self.max_players,
            self.entry_fee,
            self.points_to_win,
            Duration::from_secs(self.time_limit_secs),
            Duration::from_secs(self.turn_time_limit_secs),
            self.max_moves,
            self.lives_per_player,
            self.classic_bonus_points,
            self.classic_penalty_points,
            self.kill_mode_bonus,
            self.dice_faces,
            self.entry_value,
        )
        .map_err(|e| ConfigError::new(format!("Game type {}: {}", self.id, e)))?;

        let board = match &self.board {
            Some(board) => board.resolve()?,
            None => BoardTopology::standard(),
        };

        GameType::new(rules, board)
            .map_err(|e| ConfigError::new(format!("Game type {}: {}", self.id, e)))
    }
}

/// Top-level engine configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Getters, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Host settings.
    #[serde(default)]
    settings: EngineSettings,
    /// Inline game types.
    #[serde(default)]
    game_types: Vec<GameTypeConfig>,
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::parse(&content)?;
        info!(game_types = config.game_types.len(), "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    #[instrument(skip(content))]
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }

    /// Replaces the settings section.
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

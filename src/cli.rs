//! Command-line interface for strictly_ludo.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Strictly Ludo - match engine for Ludo-family race games
#[derive(Parser, Debug)]
#[command(name = "strictly_ludo")]
#[command(about = "Match engine for Ludo-family race games", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Seat-filling strategy for simulations.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotKind {
    /// Captures first, then progress
    Greedy,
    /// Uniformly random legal moves
    Fish,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP engine
    Serve {
        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Engine config file
        #[arg(short, long, default_value = "config/engine.toml")]
        config: PathBuf,

        /// Directory of extra game-type .toml files
        #[arg(long)]
        game_types_dir: Option<PathBuf>,

        /// SQLite database for session records (overrides the config)
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Validate configuration and list the game types it defines
    CheckConfig {
        /// Engine config file
        #[arg(short, long, default_value = "config/engine.toml")]
        config: PathBuf,

        /// Directory of extra game-type .toml files
        #[arg(long)]
        game_types_dir: Option<PathBuf>,
    },

    /// Play a session locally with bots and print the settlement
    Simulate {
        /// Game type to play
        #[arg(short, long, default_value = "classic")]
        game_type: String,

        /// Number of seats
        #[arg(short = 'n', long, default_value = "4")]
        players: u8,

        /// Dice and bot seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Strategy for every seat
        #[arg(long, value_enum, default_value = "greedy")]
        bot: BotKind,

        /// Cancel the session after this many actions
        #[arg(long, default_value = "10000")]
        max_actions: usize,

        /// Engine config file
        #[arg(short, long, default_value = "config/engine.toml")]
        config: PathBuf,
    },
}

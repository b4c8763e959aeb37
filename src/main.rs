//! Strictly Ludo - Unified CLI
//!
//! Hosts the match engine over HTTP, validates configuration, or plays
//! local simulations.

#![warn(missing_docs)]

mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{BotKind, Cli, Command};
use strictly_ludo::{
    Bot, Dice, EngineConfig, Fish, GameTypeCatalog, Greedy, RandomDice, SessionManager,
    Simulation, SqliteSessionStore,
};
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,strictly_ludo=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            host,
            config,
            game_types_dir,
            db_path,
        } => run_server(host, port, config, game_types_dir, db_path).await,
        Command::CheckConfig {
            config,
            game_types_dir,
        } => check_config(config, game_types_dir),
        Command::Simulate {
            game_type,
            players,
            seed,
            bot,
            max_actions,
            config,
        } => run_simulation(config, game_type, players, seed, bot, max_actions),
    }
}

/// Loads the engine config and every game type it and `game_types_dir` define.
#[instrument(fields(config = %config.display()))]
fn load(config: &Path, game_types_dir: Option<&PathBuf>) -> Result<(EngineConfig, GameTypeCatalog)> {
    let engine = if config.exists() {
        EngineConfig::from_file(config)?
    } else {
        warn!("Config file not found, using defaults");
        EngineConfig::default()
    };

    let mut catalog = GameTypeCatalog::from_configs(engine.game_types())?;
    if let Some(dir) = game_types_dir {
        catalog.merge(GameTypeCatalog::scan(dir)?)?;
    }
    if catalog.is_empty() {
        bail!("No game types configured");
    }
    Ok((engine, catalog))
}

/// Run the HTTP engine
async fn run_server(
    host: String,
    port: u16,
    config: PathBuf,
    game_types_dir: Option<PathBuf>,
    db_path: Option<String>,
) -> Result<()> {
    let (engine, catalog) = load(&config, game_types_dir.as_ref())?;
    let settings = engine.settings().clone();

    let mut builder = SessionManager::builder(catalog);
    if let Some(db_path) = db_path.or_else(|| settings.db_path().clone()) {
        info!(%db_path, "Persisting session records to SQLite");
        let store = SqliteSessionStore::open(db_path).context("Failed to open session store")?;
        builder = builder.store(Arc::new(store));
    }
    let manager = builder.settings(settings).build();

    info!(game_types = ?manager.catalog().ids().collect::<Vec<_>>(), "Starting Strictly Ludo engine");
    strictly_ludo::serve(manager, host, port).await?;
    Ok(())
}

/// Validate configuration
fn check_config(config: PathBuf, game_types_dir: Option<PathBuf>) -> Result<()> {
    let (engine, catalog) = load(&config, game_types_dir.as_ref())?;
    println!(
        "rake: {} bps, disconnect timeout: {}s",
        engine.settings().rake_basis_points(),
        engine.settings().disconnect_timeout_secs()
    );
    for game_type in catalog.game_types() {
        let rules = game_type.rules();
        println!(
            "{:<16} {:<8} {}-{} players, fee {}, path {}",
            game_type.id(),
            rules.variant(),
            rules.min_players(),
            rules.max_players(),
            rules.entry_fee(),
            game_type.board().path_length()
        );
    }
    Ok(())
}

/// Play one session with bots
fn run_simulation(
    config: PathBuf,
    game_type: String,
    players: u8,
    seed: u64,
    bot: BotKind,
    max_actions: usize,
) -> Result<()> {
    let (engine, catalog) = load(&config, None)?;
    let manager = SessionManager::builder(catalog)
        .settings(engine.settings().clone())
        .dice(move |_: &str| Box::new(RandomDice::seeded(seed)) as Box<dyn Dice>)
        .build();

    let roster = (0..players).map(|i| format!("bot-{}", i)).collect();
    let bots = (0..players)
        .map(|i| match bot {
            BotKind::Greedy => Box::new(Greedy) as Box<dyn Bot>,
            BotKind::Fish => Box::new(Fish::seeded(seed.wrapping_add(u64::from(i)))) as Box<dyn Bot>,
        })
        .collect();

    let report = Simulation::new(manager, bots, max_actions).run(&game_type, roster)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

//! Game-type catalog: the resolved rule sets sessions are created from.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::config::{ConfigError, GameTypeConfig};
use crate::games::ludo::GameType;

/// Resolved game types keyed by id.
#[derive(Debug, Clone, Default)]
pub struct GameTypeCatalog {
    types: BTreeMap<String, GameType>,
}

impl GameTypeCatalog {
    /// Resolves every config entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an entry is invalid or an id repeats.
    #[instrument(skip(configs))]
    pub fn from_configs<'a>(
        configs: impl IntoIterator<Item = &'a GameTypeConfig>,
    ) -> Result<Self, ConfigError> {
        let mut catalog = Self::default();
        for config in configs {
            catalog.insert(config.resolve()?)?;
        }
        info!(count = catalog.len(), "Game type catalog built");
        Ok(catalog)
    }

    /// Scans `dir_path` for `*.toml` files, one game type per file.
    ///
    /// Invalid files are skipped with a warning. Fails only if the directory
    /// cannot be read or yields no valid game types.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the path does not exist, is not a directory,
    /// cannot be read, or contains no valid game types.
    #[instrument(skip(dir_path), fields(path = %dir_path.as_ref().display()))]
    pub fn scan(dir_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir_path.as_ref();
        info!(path = %path.display(), "Scanning directory for game types");

        if !path.is_dir() {
            return Err(ConfigError::new(format!(
                "Game type directory not found: {}",
                path.display()
            )));
        }

        let entries = std::fs::read_dir(path).map_err(|e| {
            ConfigError::new(format!("Failed to read directory {}: {}", path.display(), e))
        })?;

        let mut catalog = Self::default();
        for entry_result in entries {
            let entry = entry_result
                .map_err(|e| ConfigError::new(format!("Failed to read directory entry: {}", e)))?;
            let entry_path = entry.path();

            if !entry_path.is_file()
                || entry_path.extension().and_then(|s| s.to_str()) != Some("toml")
            {
                debug!(path = %entry_path.display(), "Skipping non-TOML entry");
                continue;
            }

            let loaded = GameTypeConfig::from_file(&entry_path)
                .and_then(|config| config.resolve())
                .and_then(|game_type| catalog.insert(game_type));
            if let Err(e) = loaded {
                warn!(path = %entry_path.display(), error = %e, "Skipping invalid game type");
            }
        }

        if catalog.is_empty() {
            return Err(ConfigError::new(format!(
                "No valid game types found in: {}",
                path.display()
            )));
        }

        info!(count = catalog.len(), "Game types loaded");
        Ok(catalog)
    }

    /// Adds a game type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the id is already present.
    pub fn insert(&mut self, game_type: GameType) -> Result<(), ConfigError> {
        let id = game_type.id().to_string();
        if self.types.contains_key(&id) {
            return Err(ConfigError::new(format!("Duplicate game type id: {}", id)));
        }
        debug!(game_type = %id, "Game type registered");
        self.types.insert(id, game_type);
        Ok(())
    }

    /// Merges another catalog, rejecting id clashes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on the first duplicate id.
    pub fn merge(&mut self, other: GameTypeCatalog) -> Result<(), ConfigError> {
        other.types.into_values().try_for_each(|game_type| self.insert(game_type))
    }

    /// Looks up a game type.
    pub fn get(&self, id: &str) -> Option<&GameType> {
        self.types.get(id)
    }

    /// Game-type ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// All game types in id order.
    pub fn game_types(&self) -> impl Iterator<Item = &GameType> {
        self.types.values()
    }

    /// Number of game types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if no game types are loaded.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

//! Tests for loading game types from config files and directories.

use std::fs;

use tempfile::TempDir;

use strictly_ludo::{EngineConfig, GameTypeCatalog, GameTypeConfig, Variant};

fn write(dir: &TempDir, name: &str, content: &str) {
    fs::write(dir.path().join(name), content).expect("Failed to write file");
}

#[test]
fn test_scan_loads_one_game_type_per_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(&dir, "quick.toml", "id = \"quick\"\nvariant = \"QUICK\"\n");
    write(
        &dir,
        "kill.toml",
        "id = \"kill\"\nvariant = \"KILL\"\nlives_per_player = 2\n",
    );
    write(&dir, "notes.txt", "not a game type");

    let catalog = GameTypeCatalog::scan(dir.path()).expect("Scan failed");
    assert_eq!(catalog.ids().collect::<Vec<_>>(), vec!["kill", "quick"]);
    let kill = catalog.get("kill").expect("kill missing");
    assert_eq!(*kill.rules().variant(), Variant::Kill);
    assert_eq!(*kill.rules().lives_per_player(), 2);
}

#[test]
fn test_scan_skips_invalid_files() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(&dir, "good.toml", "id = \"good\"\nvariant = \"CLASSIC\"\n");
    write(&dir, "broken.toml", "id = \"broken\"\nvariant = \"CHESS\"\n");
    write(
        &dir,
        "bounds.toml",
        "id = \"bounds\"\nvariant = \"CLASSIC\"\nmin_players = 5\n",
    );

    let catalog = GameTypeCatalog::scan(dir.path()).expect("Scan failed");
    assert_eq!(catalog.len(), 1);
    assert!(catalog.get("good").is_some());
}

#[test]
fn test_scan_fails_without_valid_game_types() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(&dir, "broken.toml", "this is = = not toml");
    assert!(GameTypeCatalog::scan(dir.path()).is_err());
    assert!(GameTypeCatalog::scan(dir.path().join("missing")).is_err());
}

#[test]
fn test_merge_rejects_duplicate_ids() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(&dir, "classic.toml", "id = \"classic\"\nvariant = \"CLASSIC\"\n");

    let config = EngineConfig::parse(
        r#"
        [[game_types]]
        id = "classic"
        variant = "CLASSIC"
        "#,
    )
    .expect("Config should parse");
    let mut catalog = GameTypeCatalog::from_configs(config.game_types()).expect("Catalog failed");
    let scanned = GameTypeCatalog::scan(dir.path()).expect("Scan failed");
    let err = catalog.merge(scanned).expect_err("Duplicate id accepted");
    assert!(err.message.contains("classic"));
}

#[test]
fn test_single_file_round_trips_through_resolve() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(
        &dir,
        "duel.toml",
        r#"
        id = "duel"
        variant = "CLASSIC"
        max_players = 2
        entry_fee = 500

        [board]
        track_cells = 20
        home_column = 3
        pieces_per_player = 2
        seat_offsets = [0, 10]

        [[board.special_squares]]
        cell = 5
        kind = "safe"
        "#,
    );

    let config = GameTypeConfig::from_file(dir.path().join("duel.toml")).expect("Load failed");
    assert_eq!(config.id(), "duel");
    let game_type = config.resolve().expect("Resolve failed");
    assert_eq!(game_type.board().path_length(), 22);
    assert!(game_type.board().is_safe(5));
    assert_eq!(*game_type.rules().entry_fee(), 500);
}

#[test]
fn test_board_with_too_few_seats_is_rejected() {
    let config = EngineConfig::parse(
        r#"
        [[game_types]]
        id = "cramped"
        variant = "QUICK"
        max_players = 4

        [game_types.board]
        track_cells = 16
        home_column = 2
        seat_offsets = [0, 8]
        "#,
    )
    .expect("Config should parse");
    assert!(GameTypeCatalog::from_configs(config.game_types()).is_err());
}

#[test]
fn test_shipped_config_is_valid() {
    let config = EngineConfig::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config/engine.toml"))
        .expect("Shipped config should load");
    let mut catalog = GameTypeCatalog::from_configs(config.game_types()).expect("Catalog failed");
    let extra = GameTypeCatalog::scan(concat!(env!("CARGO_MANIFEST_DIR"), "/config/game_types"))
        .expect("Shipped game types should load");
    catalog.merge(extra).expect("Shipped ids should be unique");
    assert_eq!(
        catalog.ids().collect::<Vec<_>>(),
        vec!["classic", "classic-duel", "kill", "quick"]
    );
}

#[test]
fn test_board_whose_path_overflows_is_rejected() {
    let config = EngineConfig::parse(
        r#"
        [[game_types]]
        id = "endless"
        variant = "QUICK"
        max_players = 2

        [game_types.board]
        track_cells = 65535
        home_column = 6
        seat_offsets = [0, 8]
        "#,
    )
    .expect("Config should parse");
    let err = GameTypeCatalog::from_configs(config.game_types()).expect_err("Board accepted");
    assert!(err.message.contains("too long"), "unexpected error: {}", err.message);
}

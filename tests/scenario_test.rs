//! End-to-end match scenarios driven through the session manager.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use strictly_ludo::{
    Bot, BoardTopology, Dice, EndReason, EngineConfig, EngineError, EngineEvent, Fish,
    GameTypeCatalog, Greedy, RandomDice, ScriptedDice, Seat, SessionManager, SessionRecord,
    SessionStatus, SessionStore, SettlementService, Simulation, SquareKind, StoreError,
    TrackPosition, TurnRecord,
};

const GAME_TYPES: &str = r#"
    [settings]
    rake_basis_points = 1000

    [[game_types]]
    id = "classic-duel"
    variant = "CLASSIC"
    max_players = 2
    entry_fee = 100
    points_to_win = 30
    classic_bonus_points = 10
    classic_penalty_points = 5
    turn_time_limit_secs = 0

    [game_types.board]
    track_cells = 16
    home_column = 2
    pieces_per_player = 1
    seat_offsets = [0, 8]

    [[game_types]]
    id = "kill-four"
    variant = "KILL"
    min_players = 4
    max_players = 4
    entry_fee = 100
    points_to_win = 1000
    lives_per_player = 2
    kill_mode_bonus = 20
    turn_time_limit_secs = 0

    [game_types.board]
    track_cells = 16
    home_column = 2
    pieces_per_player = 1
    seat_offsets = [0, 4, 8, 12]

    [[game_types]]
    id = "classic"
    variant = "CLASSIC"
    entry_fee = 250
    points_to_win = 40
    max_moves = 300
    turn_time_limit_secs = 0
"#;

/// Builds a manager whose sessions all replay `script`.
fn scripted_manager(script: Vec<u8>) -> SessionManager {
    let config = EngineConfig::parse(GAME_TYPES).expect("Config should parse");
    let catalog = GameTypeCatalog::from_configs(config.game_types()).expect("Catalog failed");
    SessionManager::builder(catalog)
        .settings(config.settings().clone())
        .dice(move |_: &str| Box::new(ScriptedDice::new(script.clone())) as Box<dyn Dice>)
        .build()
}

fn seeded_manager(seed: u64) -> SessionManager {
    let config = EngineConfig::parse(GAME_TYPES).expect("Config should parse");
    let catalog = GameTypeCatalog::from_configs(config.game_types()).expect("Catalog failed");
    SessionManager::builder(catalog)
        .settings(config.settings().clone())
        .dice(move |_: &str| Box::new(RandomDice::seeded(seed)) as Box<dyn Dice>)
        .build()
}

fn greedy_bots(count: usize) -> Vec<Box<dyn Bot>> {
    (0..count).map(|_| Box::new(Greedy) as Box<dyn Bot>).collect()
}

fn roster(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_classic_three_captures_win_the_pool() {
    let manager = scripted_manager(vec![6, 6, 6, 1, 3, 6, 1, 4, 2, 6, 6, 5, 1]);
    let report = Simulation::new(manager.clone(), greedy_bots(2), 100)
        .run("classic-duel", roster(&["ana", "ben"]))
        .expect("Simulation failed");

    let snapshot = report.snapshot();
    assert_eq!(*snapshot.status(), SessionStatus::Completed);
    let outcome = snapshot.outcome().as_ref().expect("Outcome missing");
    assert_eq!(outcome.reason, EndReason::PointsReached);
    assert_eq!(outcome.winner, Some(Seat(0)));
    assert_eq!(*snapshot.players()[0].score(), 30);
    assert_eq!(*snapshot.players()[0].kills(), 3);
    assert_eq!(*snapshot.players()[1].score(), 0);

    let settlement = report.settlement().as_ref().expect("Settlement missing");
    assert_eq!(*settlement.pool(), 200);
    assert_eq!(*settlement.rake(), 20);
    assert_eq!(settlement.payout_for(Seat(0)), 180);
    assert_eq!(settlement.payout_for(Seat(1)), 0);
    assert_eq!(settlement.paid_out(), settlement.pool() - settlement.rake());
    assert_eq!(settlement.leaderboard_deltas()[0].delta, 60);
    assert_eq!(settlement.leaderboard_deltas()[1].delta, 0);

    let record = manager.record(snapshot.session_id()).expect("Record missing");
    assert_eq!(record.settlement().as_ref(), Some(settlement));
    assert_eq!(record.history().len(), snapshot.history().len());
}

#[test]
fn test_kill_last_survivor_wins_and_eliminated_seats_are_skipped() {
    let script = vec![
        4, 6, 6, 4, 4, 4, 6, 2, 6, 2, 6, 6, 1, 6, 6, 5, 6, 6, 3, 6, 2,
    ];
    let manager = scripted_manager(script);
    let report = Simulation::new(manager, greedy_bots(4), 200)
        .run("kill-four", roster(&["ana", "ben", "cy", "dee"]))
        .expect("Simulation failed");

    let snapshot = report.snapshot();
    let outcome = snapshot.outcome().as_ref().expect("Outcome missing");
    assert_eq!(*snapshot.status(), SessionStatus::Completed);
    assert_eq!(outcome.reason, EndReason::LastSurvivor);
    assert_eq!(outcome.winner, Some(Seat(3)));
    assert_eq!(outcome.standings.first(), Some(&Seat(3)));

    for seat in 0..3 {
        let player = &snapshot.players()[seat];
        assert!(*player.eliminated(), "seat {} should be eliminated", seat);
        assert_eq!(*player.lives(), Some(0));
        assert!(player.pieces().iter().all(|p| *p.position() == TrackPosition::Yard));
    }
    assert!(!*snapshot.players()[3].eliminated());

    // Once a seat has been captured twice it never appears in the history again.
    for seat in 0..3u8 {
        let mut captured = 0;
        let mut eliminated_at = None;
        for entry in snapshot.history() {
            if let Some(at) = eliminated_at {
                assert_ne!(entry.seat, Seat(seat), "seat {} acted after entry {}", seat, at);
                continue;
            }
            if let TurnRecord::Moved { delta, .. } = &entry.record {
                captured += delta.captures.iter().filter(|c| c.seat == Seat(seat)).count();
                if captured >= 2 {
                    eliminated_at = Some(entry.sequence);
                }
            }
        }
        assert!(eliminated_at.is_some(), "seat {} never eliminated", seat);
    }

    let settlement = report.settlement().as_ref().expect("Settlement missing");
    assert_eq!(*settlement.pool(), 400);
    assert_eq!(*settlement.rake(), 40);
    assert_eq!(settlement.payout_for(Seat(0)), 0);
    assert_eq!(settlement.payout_for(Seat(1)), 20);
    assert_eq!(settlement.payout_for(Seat(2)), 40);
    assert_eq!(settlement.payout_for(Seat(3)), 300);
    assert_eq!(settlement.paid_out(), 360);
}

#[test]
fn test_aborted_before_any_move_refunds_every_stake() {
    let manager = scripted_manager(Vec::new());
    let created = manager
        .create_session("classic-duel", roster(&["ana", "ben"]))
        .expect("Create failed");
    let id = created.session_id().clone();
    let mut events = manager.subscribe();

    manager.join(&id, Seat(0)).expect("Join failed");
    manager.join(&id, Seat(1)).expect("Join failed");
    manager.cancel_session(&id, "table closed").expect("Cancel failed");

    let record = manager.record(&id).expect("Record missing");
    assert_eq!(*record.status(), SessionStatus::Aborted);
    let settlement = record.settlement().as_ref().expect("Settlement missing");
    assert!(*settlement.refunded());
    assert_eq!(*settlement.rake(), 0);
    assert_eq!(settlement.payout_for(Seat(0)), 100);
    assert_eq!(settlement.payout_for(Seat(1)), 100);
    assert!(settlement.leaderboard_deltas().iter().all(|d| d.delta == 0));

    let mut names = Vec::new();
    while let Ok(event) = events.try_recv() {
        names.push(event.name());
    }
    assert_eq!(
        names,
        vec!["player_joined", "player_joined", "session_started", "session_completed"]
    );

    assert_eq!(
        manager.submit_roll(&id, Seat(0)),
        Err(EngineError::SessionTerminal(id.clone()))
    );
    assert_eq!(
        manager.cancel_session(&id, "again"),
        Err(EngineError::SessionTerminal(id.clone()))
    );
    assert!(manager.active_sessions().is_empty());
    assert!(manager.retired_sessions().contains(&id));
}

#[test]
fn test_second_settlement_is_rejected() {
    let manager = scripted_manager(Vec::new());
    let created = manager
        .create_session("classic-duel", roster(&["ana", "ben"]))
        .expect("Create failed");
    let id = created.session_id().clone();
    manager.cancel_session(&id, "no show").expect("Cancel failed");
    let snapshot = manager.snapshot(&id).expect("Snapshot missing");

    let service = SettlementService::new(strictly_ludo::RakePolicy::new(500));
    let first = service.settle(&snapshot).expect("First settlement failed");
    assert_eq!(first.paid_out(), 200);
    assert_eq!(
        service.settle(&snapshot),
        Err(EngineError::DuplicateSettlement(id.clone()))
    );
    assert!(service.is_settled(&id));
}

#[test]
fn test_rejected_moves_leave_state_untouched() {
    let manager = scripted_manager(vec![3, 6]);
    let id = manager
        .create_session("classic-duel", roster(&["ana", "ben"]))
        .expect("Create failed")
        .session_id()
        .clone();
    manager.join(&id, Seat(0)).expect("Join failed");
    manager.join(&id, Seat(1)).expect("Join failed");

    let err = manager.submit_roll(&id, Seat(1)).expect_err("Out of turn roll accepted");
    assert_eq!(err.kind(), "IllegalMove");
    let before = manager.snapshot(&id).expect("Snapshot missing");

    // 3 cannot bring a piece out of the yard, so the turn passes.
    assert_eq!(manager.submit_roll(&id, Seat(0)), Ok(3));
    let after_pass = manager.snapshot(&id).expect("Snapshot missing");
    assert_eq!(*after_pass.current_seat(), Seat(1));
    assert_eq!(after_pass.players(), before.players());

    assert_eq!(manager.submit_roll(&id, Seat(1)), Ok(6));
    let err = manager.submit_move(&id, Seat(1), 4).expect_err("Missing piece accepted");
    assert_eq!(err.kind(), "IllegalMove");
    let unchanged = manager.snapshot(&id).expect("Snapshot missing");
    assert_eq!(unchanged.players(), after_pass.players());
    assert_eq!(unchanged.history(), after_pass.history());

    assert_eq!(
        manager.join("missing", Seat(0)),
        Err(EngineError::SessionNotFound("missing".into()))
    );
}

#[test]
fn test_roster_and_game_type_are_validated() {
    let manager = scripted_manager(Vec::new());
    assert!(matches!(
        manager.create_session("classic-duel", roster(&["solo"])),
        Err(EngineError::InvalidRoster(_))
    ));
    assert!(matches!(
        manager.create_session("classic-duel", roster(&["ana", "ana"])),
        Err(EngineError::InvalidRoster(_))
    ));
    assert!(matches!(
        manager.create_session("kill-four", roster(&["a", "b", ""])),
        Err(EngineError::InvalidRoster(_))
    ));
    assert_eq!(
        manager.create_session("checkers", roster(&["a", "b"])),
        Err(EngineError::UnknownGameType("checkers".into()))
    );
    assert!(manager.active_sessions().is_empty());
}

#[test]
fn test_random_sessions_keep_board_invariants() {
    let board = BoardTopology::standard();
    for seed in 0..8u64 {
        let manager = seeded_manager(seed);
        let bots: Vec<Box<dyn Bot>> = (0..4u64)
            .map(|i| Box::new(Fish::seeded(seed * 10 + i)) as Box<dyn Bot>)
            .collect();
        let report = Simulation::new(manager, bots, 5_000)
            .run("classic", roster(&["a", "b", "c", "d"]))
            .expect("Simulation failed");
        let snapshot = report.snapshot();
        assert!(snapshot.status().is_terminal(), "seed {} did not finish", seed);

        for player in snapshot.players() {
            assert_eq!(player.pieces().len(), 4, "seed {} lost a piece", seed);
        }

        let mut occupied = std::collections::HashMap::new();
        for player in snapshot.players() {
            for piece in player.pieces() {
                if let TrackPosition::Path(progress) = piece.position() {
                    if let Some(cell) = board.absolute_cell(*player.seat(), *progress) {
                        let safe = board.square(cell).map(|s| *s.kind()) == Some(SquareKind::Safe);
                        if let Some(owner) = occupied.insert(cell, *player.seat()) {
                            assert!(
                                safe || owner == *player.seat(),
                                "seed {}: seats {} and {} share cell {}",
                                seed,
                                owner,
                                player.seat(),
                                cell
                            );
                        }
                    }
                }
            }
        }

        for entry in snapshot.history() {
            if let TurnRecord::Moved { delta, .. } = &entry.record {
                if delta.from == TrackPosition::Yard {
                    assert_eq!(delta.roll, 6, "seed {}: left the yard on {}", seed, delta.roll);
                }
            }
        }

        let settlement = report.settlement().as_ref().expect("Settlement missing");
        if *snapshot.status() == SessionStatus::Completed {
            assert_eq!(settlement.paid_out(), settlement.pool() - settlement.rake());
        }
    }
}

#[test]
fn test_session_completed_event_carries_the_settlement() {
    let manager = scripted_manager(vec![6, 6, 6, 1, 3, 6, 1, 4, 2, 6, 6, 5, 1]);
    let mut events = manager.subscribe();
    let report = Simulation::new(manager, greedy_bots(2), 100)
        .run("classic-duel", roster(&["ana", "ben"]))
        .expect("Simulation failed");

    let mut completed = None;
    let mut captures = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            EngineEvent::MoveApplied { delta, .. } => captures += delta.captures.len(),
            EngineEvent::SessionCompleted { result, .. } => completed = Some(result),
            _ => {}
        }
    }
    assert_eq!(captures, 3);
    assert_eq!(completed.as_ref(), report.settlement().as_ref());
}

/// Drops a session's record as soon as it ends.
#[derive(Debug, Default)]
struct LiveRecordsOnly {
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl SessionStore for LiveRecordsOnly {
    fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().expect("Store lock poisoned");
        if record.status().is_terminal() {
            records.remove(record.session_id());
        } else {
            records.insert(record.session_id().clone(), record.clone());
        }
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.records.lock().expect("Store lock poisoned").get(session_id).cloned())
    }

    fn list(&self) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.records.lock().expect("Store lock poisoned").values().cloned().collect())
    }
}

#[test]
fn test_finished_snapshot_comes_from_the_store() {
    let manager = scripted_manager(Vec::new());
    let id = manager
        .create_session("classic-duel", roster(&["ana", "ben"]))
        .expect("Create failed")
        .session_id()
        .clone();
    manager.cancel_session(&id, "no show").expect("Cancel failed");

    let snapshot = manager.snapshot(&id).expect("Snapshot missing");
    assert_eq!(*snapshot.status(), SessionStatus::Aborted);
    let record = manager.record(&id).expect("Record missing");
    assert_eq!(record.snapshot(), &snapshot);
}

#[test]
fn test_finished_sessions_are_not_kept_in_memory() {
    let config = EngineConfig::parse(GAME_TYPES).expect("Config should parse");
    let catalog = GameTypeCatalog::from_configs(config.game_types()).expect("Catalog failed");
    let manager = SessionManager::builder(catalog)
        .store(Arc::new(LiveRecordsOnly::default()))
        .build();
    let id = manager
        .create_session("classic-duel", roster(&["ana", "ben"]))
        .expect("Create failed")
        .session_id()
        .clone();
    assert!(manager.snapshot(&id).is_ok());
    manager.cancel_session(&id, "no show").expect("Cancel failed");

    assert_eq!(
        manager.submit_roll(&id, Seat(0)),
        Err(EngineError::SessionTerminal(id.clone()))
    );
    assert_eq!(
        manager.snapshot(&id),
        Err(EngineError::SessionNotFound(id.clone()))
    );
    assert!(manager.retired_sessions().contains(&id));
}

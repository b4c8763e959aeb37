//! HTTP router tests using `tower::ServiceExt::oneshot`.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use strictly_ludo::{Dice, EngineConfig, GameTypeCatalog, ScriptedDice, SessionManager, router};

const CONFIG: &str = r#"
    [settings]
    rake_basis_points = 1000

    [[game_types]]
    id = "classic-duel"
    variant = "CLASSIC"
    max_players = 2
    entry_fee = 100
    points_to_win = 30
    turn_time_limit_secs = 0

    [game_types.board]
    track_cells = 16
    home_column = 2
    pieces_per_player = 1
    seat_offsets = [0, 8]
"#;

fn app() -> Router {
    let config = EngineConfig::parse(CONFIG).expect("Config should parse");
    let catalog = GameTypeCatalog::from_configs(config.game_types()).expect("Catalog failed");
    let manager = SessionManager::builder(catalog)
        .settings(config.settings().clone())
        .dice(|_: &str| {
            Box::new(ScriptedDice::new([6, 6, 6, 1, 3, 6, 1, 4, 2, 6, 6, 5, 1])) as Box<dyn Dice>
        })
        .build();
    router(manager)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app.clone().oneshot(request).await.expect("Request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

async fn create(app: &Router) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/sessions",
        Some(json!({ "game_type": "classic-duel", "roster": ["ana", "ben"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "WAITING_FOR_PLAYERS");
    body["session_id"].as_str().expect("session_id missing").to_string()
}

#[tokio::test]
async fn test_health_and_game_types() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));

    let (status, body) = send(&app, "GET", "/game-types", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["classic-duel"]));
}

#[tokio::test]
async fn test_full_match_over_http() {
    let app = app();
    let id = create(&app).await;

    for seat in 0..2 {
        let (status, _) = send(
            &app,
            "POST",
            &format!("/sessions/{}/join", id),
            Some(json!({ "seat": seat })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, "GET", "/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([id]));

    let mut seat = 0;
    let mut rolls = 0;
    loop {
        let (_, snapshot) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
        if snapshot["status"] != "IN_PROGRESS" {
            break;
        }
        let (status, roll) = send(
            &app,
            "POST",
            &format!("/sessions/{}/roll", id),
            Some(json!({ "seat": seat })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "roll rejected: {}", roll);
        rolls += 1;
        if let Some(first) = roll["legal_moves"].as_array().and_then(|moves| moves.first()) {
            let (status, delta) = send(
                &app,
                "POST",
                &format!("/sessions/{}/move", id),
                Some(json!({ "seat": seat, "piece": first["piece"] })),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "move rejected: {}", delta);
        }
        seat = 1 - seat;
        assert!(rolls <= 13, "script should finish the match");
    }

    let (status, snapshot) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["status"], "COMPLETED");
    assert_eq!(snapshot["outcome"]["winner"], 0);

    let (status, record) = send(&app, "GET", &format!("/sessions/{}/record", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["settlement"]["rake"], 20);
    assert_eq!(record["settlement"]["payouts"][0]["amount"], 180);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/sessions/{}/roll", id),
        Some(json!({ "seat": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "SessionTerminal");
}

#[tokio::test]
async fn test_errors_map_to_status_codes() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/sessions",
        Some(json!({ "game_type": "classic-duel", "roster": ["solo"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRoster");

    let (status, body) = send(
        &app,
        "POST",
        "/sessions",
        Some(json!({ "game_type": "snakes", "roster": ["a", "b"] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "UnknownGameType");

    let (status, body) = send(&app, "GET", "/sessions/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "SessionNotFound");

    let id = create(&app).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/sessions/{}/move", id),
        Some(json!({ "seat": 0, "piece": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "IllegalMove");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/sessions/{}/cancel", id),
        Some(json!({ "reason": "test over" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, record) = send(&app, "GET", &format!("/sessions/{}/record", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "ABORTED");
    assert_eq!(record["settlement"]["refunded"], true);
}

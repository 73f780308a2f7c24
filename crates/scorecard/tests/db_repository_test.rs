//! Tests for database repository operations.

use chrono::{TimeZone, Utc};
use diesel::Connection;
use diesel::SqliteConnection;
use diesel::prelude::*;
use diesel_migrations::MigrationHarness;
use tempfile::NamedTempFile;

use scorecard::{MIGRATIONS, PlayRepository, PlayStore, SqliteStore};
use scorecard_engine::{
    Analytics, BaseState, ClientKey, EventId, EventType, FieldZone, Half, HitLocation, PlayEvent,
    RosterId,
};

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready repository.
fn setup_test_db() -> (NamedTempFile, PlayRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let mut conn = SqliteConnection::establish(&db_path).expect("Failed to connect");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Migrations failed");

    let repo = PlayRepository::new(db_path).expect("Failed to create repository");
    (db_file, repo)
}

fn play(game_id: &str, seq: i64, event_type: EventType) -> PlayEvent {
    PlayEvent {
        id: None,
        client_key: ClientKey::generate(),
        game_id: game_id.to_string(),
        recorded_at: Utc.timestamp_opt(1_750_000_000 + seq, 0).unwrap(),
        inning: 1,
        half: Half::Top,
        batter_id: RosterId::from("ana"),
        event_type,
        rbi: 0,
        runs: None,
        outs_on_play: 0,
        base_state_after: BaseState::new(),
        analytics: Analytics::default(),
        description: format!("play {}", seq),
    }
}

#[test]
fn test_new_rejects_empty_path() {
    assert!(PlayRepository::new("  ".to_string()).is_err());
}

#[test]
fn test_insert_assigns_id() {
    let (_db, repo) = setup_test_db();
    let stored = repo
        .insert_play(&play("g1", 1, EventType::Single))
        .expect("Insert failed");
    assert!(stored.is_confirmed());
    assert!(stored.id.unwrap().get() > 0);
}

#[test]
fn test_insert_same_client_key_is_idempotent() {
    let (_db, repo) = setup_test_db();
    let event = play("g1", 1, EventType::Walk);
    let first = repo.insert_play(&event).expect("First insert failed");
    let second = repo.insert_play(&event).expect("Second insert failed");
    assert_eq!(first.id, second.id);
    assert_eq!(repo.list_plays("g1").expect("List failed").len(), 1);
}

#[test]
fn test_list_is_scoped_and_ordered() {
    let (_db, repo) = setup_test_db();
    repo.insert_play(&play("g1", 3, EventType::Strikeout)).expect("Insert failed");
    repo.insert_play(&play("g1", 1, EventType::Single)).expect("Insert failed");
    repo.insert_play(&play("g2", 2, EventType::Walk)).expect("Insert failed");

    let plays = repo.list_plays("g1").expect("List failed");
    let types: Vec<&EventType> = plays.iter().map(|p| &p.event_type).collect();
    assert_eq!(types, vec![&EventType::Single, &EventType::Strikeout]);
}

#[test]
fn test_play_fields_survive_storage() {
    let (_db, repo) = setup_test_db();
    let mut event = play("g1", 1, EventType::Double);
    event.inning = 4;
    event.half = Half::Bottom;
    event.rbi = 1;
    event.runs = Some(2);
    event.outs_on_play = 1;
    event.base_state_after = BaseState {
        first: None,
        second: Some(RosterId::from("ana")),
        third: Some(RosterId::from("ben")),
    };
    event.analytics = Analytics {
        zone: Some(FieldZone::LeftField),
        location: Some(HitLocation::new(35.0, 20.0)),
        batting_side: None,
    };

    let stored = repo.insert_play(&event).expect("Insert failed");
    let loaded = repo.list_plays("g1").expect("List failed").remove(0);

    assert_eq!(loaded, stored);
    assert_eq!(loaded.client_key, event.client_key);
    assert_eq!(loaded.recorded_at, event.recorded_at);
    assert_eq!(loaded.half_inning(), event.half_inning());
    assert_eq!(loaded.runs, Some(2));
    assert_eq!(loaded.base_state_after, event.base_state_after);
    assert_eq!(loaded.analytics, event.analytics);
}

#[test]
fn test_unknown_event_type_loads_as_unrecognized() {
    let (db, repo) = setup_test_db();
    repo.insert_play(&play("g1", 1, EventType::Single)).expect("Insert failed");

    let mut conn = SqliteConnection::establish(db.path().to_str().unwrap()).expect("Failed to connect");
    diesel::sql_query("UPDATE plays SET event_type = 'infield-fly'")
        .execute(&mut conn)
        .expect("Update failed");

    let plays = repo.list_plays("g1").expect("List failed");
    assert_eq!(plays[0].event_type, EventType::Unrecognized("infield-fly".to_string()));
}

#[test]
fn test_delete_play() {
    let (_db, repo) = setup_test_db();
    let stored = repo
        .insert_play(&play("g1", 1, EventType::Single))
        .expect("Insert failed");
    let id = stored.id.unwrap();

    assert!(!repo.delete_play("g2", id).expect("Delete failed"), "wrong game");
    assert!(repo.delete_play("g1", id).expect("Delete failed"));
    assert!(!repo.delete_play("g1", id).expect("Delete failed"), "already gone");
    assert!(!repo.delete_play("g1", EventId::from(999)).expect("Delete failed"));
    assert!(repo.list_plays("g1").expect("List failed").is_empty());
}

#[test]
fn test_opponent_score_upsert() {
    let (_db, repo) = setup_test_db();
    assert_eq!(repo.opponent_score("g1").expect("Query failed"), 0);

    repo.set_opponent_score("g1", 3).expect("Set failed");
    repo.set_opponent_score("g1", 5).expect("Set failed");
    repo.set_opponent_score("g2", 1).expect("Set failed");

    assert_eq!(repo.opponent_score("g1").expect("Query failed"), 5);
    assert_eq!(repo.opponent_score("g2").expect("Query failed"), 1);
}

#[tokio::test]
async fn test_sqlite_store_delete_unknown_is_not_found() {
    let (db, _repo) = setup_test_db();
    let store = SqliteStore::open(db.path().to_str().unwrap().to_string()).expect("Open failed");

    let stored = store
        .append_event(&play("g1", 1, EventType::Walk))
        .await
        .expect("Append failed");
    assert_eq!(store.list_events("g1").await.expect("List failed"), vec![stored.clone()]);

    let id = stored.id.unwrap();
    store.delete_event("g1", id).await.expect("Delete failed");
    let again = store.delete_event("g1", id).await;
    assert!(matches!(again, Err(scorecard::StoreError::NotFound(missing)) if missing == id));
}

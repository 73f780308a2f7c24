//! Tests for the live game adapter against in-memory collaborators.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use scorecard::{
    FeedItem, FixedLineup, LiveGame, LiveGameError, MemoryStore, PlayInput, PlayStore, Publishing,
    PushFeed, PushHub, PushSubscription, StoreError,
};
use scorecard_engine::{
    Analytics, Base, BaseState, ClientKey, ConnectionState, ContractError, Disposition,
    Dispositions, EntryStatus, EventType, FieldZone, GameSetup, Half, HitLocation, PlayEvent,
    RbiPolicy, RosterId, TeamSide, UndoError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const GAME: &str = "g";

fn lineup() -> FixedLineup {
    FixedLineup::from_names(["ana", "ben", "cho"])
}

async fn load(store: Arc<dyn PlayStore>, side: TeamSide) -> LiveGame {
    LiveGame::load(
        GameSetup::new(GAME.to_string(), side),
        store,
        &lineup(),
        RbiPolicy::default(),
    )
    .await
    .expect("Load failed")
}

fn remote_walk() -> PlayEvent {
    PlayEvent {
        id: None,
        client_key: ClientKey::generate(),
        game_id: GAME.to_string(),
        recorded_at: Utc.timestamp_opt(1_750_000_000, 0).unwrap(),
        inning: 1,
        half: Half::Top,
        batter_id: RosterId::from("ana"),
        event_type: EventType::Walk,
        rbi: 0,
        runs: None,
        outs_on_play: 0,
        base_state_after: BaseState {
            first: Some(RosterId::from("ana")),
            second: None,
            third: None,
        },
        analytics: Analytics::default(),
        description: "ana: walk".to_string(),
    }
}

#[tokio::test]
async fn test_submit_confirms_play() {
    let memory = MemoryStore::new();
    let mut game = load(Arc::new(memory.clone()), TeamSide::Away).await;

    let stored = game
        .submit_play(EventType::Walk, PlayInput::default())
        .await
        .expect("Submit failed");

    assert!(stored.is_confirmed());
    assert_eq!(memory.len(), 1);
    assert_eq!(game.log().len(), 1);
    assert_eq!(game.log().entries()[0].status(), &EntryStatus::Confirmed);

    let state = game.current_state();
    assert_eq!(state.runners.first, Some(RosterId::from("ana")));
    assert_eq!(state.current_batter, Some(RosterId::from("ben")));
}

#[tokio::test]
async fn test_failed_submission_is_kept_and_retried() {
    let memory = MemoryStore::new();
    let mut game = load(Arc::new(memory.clone()), TeamSide::Away).await;

    memory.set_offline(true);
    let result = game.submit_play(EventType::Single, PlayInput::default()).await;
    assert!(matches!(result, Err(LiveGameError::Store(StoreError::Unavailable(_)))));
    assert_eq!(game.log().len(), 1);
    assert_eq!(game.log().failed().count(), 1);
    assert_eq!(game.current_state().runners.first, Some(RosterId::from("ana")));

    memory.set_offline(false);
    assert_eq!(game.retry_failed().await.expect("Retry failed"), 1);
    assert_eq!(game.log().failed().count(), 0);
    assert_eq!(game.log().entries()[0].status(), &EntryStatus::Confirmed);
    assert_eq!(memory.len(), 1);
}

#[tokio::test]
async fn test_review_play_needs_dispositions() {
    let mut game = load(Arc::new(MemoryStore::new()), TeamSide::Away).await;
    game.submit_play(EventType::Walk, PlayInput::default())
        .await
        .expect("Submit failed");

    let result = game.submit_play(EventType::Single, PlayInput::default()).await;
    assert!(matches!(result, Err(LiveGameError::DispositionsRequired(EventType::Single))));
    assert_eq!(game.log().len(), 1);

    let mut dispositions = Dispositions::new();
    dispositions.insert(Base::First, Disposition::Advance(Base::Second));
    game.submit_play(EventType::Single, PlayInput::with_dispositions(dispositions))
        .await
        .expect("Submit failed");

    let state = game.current_state();
    assert_eq!(state.runners.first, Some(RosterId::from("ben")));
    assert_eq!(state.runners.second, Some(RosterId::from("ana")));
}

#[tokio::test]
async fn test_contract_rejects_impossible_sacrifice_fly() {
    let memory = MemoryStore::new();
    let mut game = load(Arc::new(memory.clone()), TeamSide::Away).await;

    let result = game.submit_play(EventType::SacrificeFly, PlayInput::default()).await;
    assert!(matches!(
        result,
        Err(LiveGameError::Contract(ContractError::NoRunnerOnThird))
    ));
    assert!(game.log().is_empty());
    assert!(memory.is_empty());
}

#[tokio::test]
async fn test_contact_location_sets_zone() {
    let mut game = load(Arc::new(MemoryStore::new()), TeamSide::Away).await;
    let input = PlayInput::new(None, Some(HitLocation::new(50.0, 10.0)), None);

    let stored = game
        .submit_play(EventType::FlyOut, input)
        .await
        .expect("Submit failed");

    assert_eq!(stored.analytics.location, Some(HitLocation::new(50.0, 10.0)));
    assert_eq!(
        stored.analytics.zone,
        game.classify_contact(50.0, 10.0, &EventType::FlyOut).attribution()
    );
    assert_ne!(stored.analytics.zone, Some(FieldZone::Foul));
}

#[tokio::test]
async fn test_undo_removes_last_play() {
    let memory = MemoryStore::new();
    let mut game = load(Arc::new(memory.clone()), TeamSide::Away).await;

    assert!(matches!(
        game.request_undo().await,
        Err(LiveGameError::Undo(UndoError::EmptyLog))
    ));

    let stored = game
        .submit_play(EventType::Walk, PlayInput::default())
        .await
        .expect("Submit failed");
    let undone = game.request_undo().await.expect("Undo failed");

    assert_eq!(Some(undone), stored.id);
    assert!(game.log().is_empty());
    assert!(memory.is_empty());
    assert_eq!(game.current_state().current_batter, Some(RosterId::from("ana")));
}

#[tokio::test]
async fn test_undo_blocked_by_unconfirmed_play() {
    let memory = MemoryStore::new();
    let mut game = load(Arc::new(memory.clone()), TeamSide::Away).await;
    game.submit_play(EventType::Walk, PlayInput::default())
        .await
        .expect("Submit failed");

    memory.set_offline(true);
    let _ = game.submit_play(EventType::Strikeout, PlayInput::default()).await;

    assert!(matches!(
        game.request_undo().await,
        Err(LiveGameError::Undo(UndoError::Unconfirmed(_)))
    ));
    assert_eq!(game.log().len(), 2);
}

#[tokio::test]
async fn test_failed_undo_leaves_log_unchanged() {
    let memory = MemoryStore::new();
    let mut game = load(Arc::new(memory.clone()), TeamSide::Away).await;
    game.submit_play(EventType::Walk, PlayInput::default())
        .await
        .expect("Submit failed");

    memory.set_offline(true);
    assert!(matches!(
        game.request_undo().await,
        Err(LiveGameError::Store(StoreError::Unavailable(_)))
    ));
    assert_eq!(game.log().len(), 1);
    assert_eq!(memory.len(), 1);
}

#[tokio::test]
async fn test_two_clients_converge_through_hub() {
    let hub = PushHub::new();
    let store: Arc<dyn PlayStore> = Arc::new(Publishing::new(MemoryStore::new(), hub.clone()));
    let mut scorer = load(store.clone(), TeamSide::Away).await;
    let mut viewer = load(store, TeamSide::Away).await;
    scorer.connect(&hub).await.expect("Connect failed");
    viewer.connect(&hub).await.expect("Connect failed");

    scorer
        .submit_play(EventType::Walk, PlayInput::default())
        .await
        .expect("Submit failed");
    scorer.drain_feed().await.expect("Drain failed");
    viewer.drain_feed().await.expect("Drain failed");

    assert_eq!(viewer.connection_state(), ConnectionState::Connected);
    assert_eq!(scorer.log().len(), 1);
    assert_eq!(viewer.current_state(), scorer.current_state());

    viewer.request_undo().await.expect("Undo failed");
    scorer.drain_feed().await.expect("Drain failed");

    assert!(scorer.log().is_empty());
    assert_eq!(viewer.current_state(), scorer.current_state());
}

#[tokio::test]
async fn test_reconnect_resyncs_missed_changes() {
    let hub = PushHub::new();
    let memory = MemoryStore::new();
    let mut game = load(
        Arc::new(Publishing::new(memory.clone(), hub.clone())),
        TeamSide::Away,
    )
    .await;
    game.connect(&hub).await.expect("Connect failed");
    game.drain_feed().await.expect("Drain failed");

    // Written behind the hub's back, so no push message is sent.
    memory.append_event(&remote_walk()).await.expect("Append failed");
    assert!(game.log().is_empty());

    hub.set_connection(GAME, ConnectionState::Error);
    hub.set_connection(GAME, ConnectionState::Connected);
    assert_eq!(game.drain_feed().await.expect("Drain failed"), 2);

    assert_eq!(game.connection_state(), ConnectionState::Connected);
    assert_eq!(game.log().len(), 1);
    assert_eq!(game.current_state().runners.first, Some(RosterId::from("ana")));
}

/// Push feed whose first subscription attempt fails.
struct FlakyFeed {
    hub: PushHub,
    failed: AtomicBool,
}

#[async_trait]
impl PushFeed for FlakyFeed {
    async fn subscribe(&self, game_id: &str) -> Result<PushSubscription, StoreError> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("push channel down".to_string()));
        }
        self.hub.subscribe(game_id).await
    }
}

#[tokio::test]
async fn test_connect_after_failed_subscribe_catches_up() {
    let hub = PushHub::new();
    let flaky = FlakyFeed {
        hub: hub.clone(),
        failed: AtomicBool::new(false),
    };
    let store: Arc<dyn PlayStore> = Arc::new(Publishing::new(MemoryStore::new(), hub.clone()));
    let mut scorer = load(store.clone(), TeamSide::Away).await;
    let mut viewer = load(store, TeamSide::Away).await;
    scorer.connect(&hub).await.expect("Connect failed");

    assert!(viewer.connect(&flaky).await.is_err());
    assert_eq!(viewer.connection_state(), ConnectionState::Error);

    scorer
        .submit_play(EventType::Walk, PlayInput::default())
        .await
        .expect("Submit failed");

    viewer.connect(&flaky).await.expect("Connect failed");
    viewer.drain_feed().await.expect("Drain failed");

    assert_eq!(viewer.connection_state(), ConnectionState::Connected);
    assert_eq!(viewer.log().len(), 1);
    assert_eq!(viewer.current_state(), scorer.current_state());
}

#[tokio::test]
async fn test_connect_after_disconnect_catches_up() {
    let hub = PushHub::new();
    let store: Arc<dyn PlayStore> = Arc::new(Publishing::new(MemoryStore::new(), hub.clone()));
    let mut scorer = load(store.clone(), TeamSide::Away).await;
    let mut viewer = load(store, TeamSide::Away).await;
    viewer.connect(&hub).await.expect("Connect failed");
    viewer.disconnect();

    scorer
        .submit_play(EventType::Walk, PlayInput::default())
        .await
        .expect("Submit failed");
    scorer
        .record_opponent_runs(2)
        .await
        .expect("Opponent runs failed");
    assert!(viewer.log().is_empty());

    viewer.connect(&hub).await.expect("Connect failed");
    viewer.drain_feed().await.expect("Drain failed");

    assert_eq!(viewer.connection_state(), ConnectionState::Connected);
    assert_eq!(viewer.log().len(), 1);
    assert_eq!(viewer.current_state().opponent_score, 2);
    assert_eq!(viewer.current_state(), scorer.current_state());
}

#[tokio::test]
async fn test_connection_error_keeps_local_scoring() {
    let hub = PushHub::new();
    let mut game = load(
        Arc::new(Publishing::new(MemoryStore::new(), hub.clone())),
        TeamSide::Away,
    )
    .await;
    game.connect(&hub).await.expect("Connect failed");
    game.apply_feed_item(FeedItem::Connection(ConnectionState::Error))
        .await
        .expect("Apply failed");

    assert_eq!(game.connection_state(), ConnectionState::Error);
    game.submit_play(EventType::Walk, PlayInput::default())
        .await
        .expect("Submit failed");
    assert_eq!(game.log().len(), 1);

    game.disconnect();
    assert_eq!(game.connection_state(), ConnectionState::Idle);
}

#[tokio::test]
async fn test_defensive_outs_end_opponent_half() {
    let mut game = load(Arc::new(MemoryStore::new()), TeamSide::Home).await;
    assert!(!game.current_state().offense);

    let state = game.record_defensive_out().expect("Out failed");
    assert_eq!(state.outs, 1);
    game.record_defensive_out().expect("Out failed");
    let state = game.record_defensive_out().expect("Out failed");

    assert!(state.offense);
    assert_eq!(state.half, Half::Bottom);
    assert_eq!(state.outs, 0);
    assert!(matches!(
        game.record_defensive_out(),
        Err(LiveGameError::NotOnDefense)
    ));
}

#[tokio::test]
async fn test_opponent_score_is_stored() {
    let memory = MemoryStore::new();
    let mut game = load(Arc::new(memory.clone()), TeamSide::Away).await;

    assert_eq!(game.record_opponent_runs(2).await.expect("Runs failed"), 2);
    assert_eq!(game.record_opponent_runs(1).await.expect("Runs failed"), 3);
    assert_eq!(memory.opponent_score(GAME).await.expect("Query failed"), 3);

    game.set_opponent_score(5).await.expect("Set failed");
    let reloaded = load(Arc::new(memory.clone()), TeamSide::Away).await;
    assert_eq!(reloaded.current_state().opponent_score, 5);
}

#[tokio::test]
async fn test_opponent_runs_kept_locally_when_offline() {
    let memory = MemoryStore::new();
    let mut game = load(Arc::new(memory.clone()), TeamSide::Away).await;

    memory.set_offline(true);
    assert!(game.record_opponent_runs(4).await.is_err());
    assert_eq!(game.ephemeral().opponent_score, 4);
    assert_eq!(game.current_state().opponent_score, 4);
}

#[tokio::test]
async fn test_score_override_leaves_log_alone() {
    let mut game = load(Arc::new(MemoryStore::new()), TeamSide::Away).await;
    game.submit_play(EventType::Walk, PlayInput::default())
        .await
        .expect("Submit failed");

    let state = game.update_score(4);

    assert_eq!(state.score, 4);
    assert_eq!(game.log().len(), 1);
    assert_eq!(game.ephemeral().score_adjustment, 4);
}

#[tokio::test]
async fn test_watchers_see_every_change() {
    let mut game = load(Arc::new(MemoryStore::new()), TeamSide::Away).await;
    let mut watcher = game.watch_state();

    game.submit_play(EventType::Walk, PlayInput::default())
        .await
        .expect("Submit failed");

    assert!(watcher.has_changed().expect("Sender dropped"));
    let state = watcher.borrow_and_update().clone();
    assert_eq!(state.runners.first, Some(RosterId::from("ana")));
    assert_eq!(state.plate_appearances, 1);
}

#[tokio::test]
async fn test_preview_shows_review_choices() {
    let mut game = load(Arc::new(MemoryStore::new()), TeamSide::Away).await;
    game.submit_play(EventType::Walk, PlayInput::default())
        .await
        .expect("Submit failed");

    let advancement = game.preview(&EventType::Double).expect("Preview failed");
    let scorecard_engine::Advancement::Review(review) = advancement else {
        panic!("Expected a review");
    };
    assert_eq!(review.runners().len(), 1);
    assert_eq!(review.runners()[0].base, Base::First);
    assert_eq!(game.log().len(), 1, "preview records nothing");
}

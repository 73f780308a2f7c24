//! Tests for folding the play log into derived game state.

use chrono::{TimeZone, Utc};
use scorecard_engine::{
    Analytics, BaseState, ClientKey, EphemeralState, EventId, EventType, GameSetup, Half,
    HalfInning, PlayEvent, RosterId, TeamSide, check_game_state, logged_runs, reduce,
};

fn event(seq: i64, inning: u32, half: Half, event_type: EventType, outs: u8, rbi: u32) -> PlayEvent {
    PlayEvent {
        id: Some(EventId::from(seq)),
        client_key: ClientKey::generate(),
        game_id: "g".to_string(),
        recorded_at: Utc.timestamp_opt(1_750_000_000 + seq, 0).unwrap(),
        inning,
        half,
        batter_id: RosterId::from(format!("p{}", seq)),
        event_type,
        rbi,
        runs: None,
        outs_on_play: outs,
        base_state_after: BaseState::new(),
        analytics: Analytics::default(),
        description: String::new(),
    }
}

fn strikeout(seq: i64, inning: u32, half: Half) -> PlayEvent {
    event(seq, inning, half, EventType::Strikeout, 1, 0)
}

fn lineup(n: usize) -> Vec<RosterId> {
    (0..n).map(|i| RosterId::from(format!("p{}", i))).collect()
}

fn away() -> GameSetup {
    GameSetup::new("g".to_string(), TeamSide::Away)
}

#[test]
fn test_outs_flip_exactly_at_three() {
    let events: Vec<PlayEvent> = (1..=3).map(|i| strikeout(i, 1, Half::Top)).collect();
    let lineup = lineup(9);

    for count in 0..=2 {
        let state = reduce(&events[..count], &lineup, &away(), &EphemeralState::default());
        assert_eq!(state.outs as usize, count);
        assert_eq!(state.half, Half::Top);
        assert!(state.offense);
    }

    let state = reduce(&events, &lineup, &away(), &EphemeralState::default());
    assert_eq!(state.outs, 0);
    assert_eq!(state.half_inning(), HalfInning::new(1, Half::Bottom));
    assert!(!state.offense);
    assert!(check_game_state(&state).is_ok());
}

#[test]
fn test_reduce_is_idempotent() {
    let mut walk = event(1, 1, Half::Top, EventType::Walk, 0, 0);
    walk.base_state_after.first = Some("p1".into());
    let events = vec![walk, strikeout(2, 1, Half::Top)];
    let lineup = lineup(3);
    let ephemeral = EphemeralState {
        opponent_score: 4,
        ..Default::default()
    };

    let first = reduce(&events, &lineup, &away(), &ephemeral);
    let second = reduce(&events, &lineup, &away(), &ephemeral);
    assert_eq!(first, second);
    assert_eq!(first.opponent_score, 4);
}

#[test]
fn test_batting_cursor_wraps() {
    let events: Vec<PlayEvent> = (1..=4)
        .map(|i| event(i, 1, Half::Top, EventType::Walk, 0, 0))
        .collect();
    let state = reduce(&events, &lineup(3), &away(), &EphemeralState::default());
    assert_eq!(state.batting_order_index, 1);
    assert_eq!(state.current_batter, Some(RosterId::from("p1")));
    assert_eq!(state.plate_appearances, 4);
}

#[test]
fn test_empty_lineup_keeps_cursor_at_zero() {
    let events = vec![strikeout(1, 1, Half::Top)];
    let state = reduce(&events, &[], &away(), &EphemeralState::default());
    assert_eq!(state.batting_order_index, 0);
    assert_eq!(state.current_batter, None);
}

#[test]
fn test_unrecognized_event_changes_nothing_but_cursor() {
    let mut walk = event(1, 1, Half::Top, EventType::Walk, 0, 0);
    walk.base_state_after.first = Some("p0".into());
    let mut odd = event(2, 1, Half::Top, EventType::parse("balk"), 1, 2);
    odd.base_state_after = BaseState::new();

    let state = reduce(&[walk, odd], &lineup(9), &away(), &EphemeralState::default());
    assert_eq!(state.runners.first, Some("p0".into()));
    assert_eq!(state.outs, 0);
    assert_eq!(state.score, 0);
    assert_eq!(state.batting_order_index, 2);
}

#[test]
fn test_jumps_to_later_half_inning() {
    let mut walk = event(1, 1, Half::Top, EventType::Walk, 0, 0);
    walk.base_state_after.first = Some("p0".into());
    let later = event(2, 3, Half::Top, EventType::GroundOut, 1, 0);

    let state = reduce(&[walk, later], &lineup(9), &away(), &EphemeralState::default());
    assert_eq!(state.half_inning(), HalfInning::new(3, Half::Top));
    assert_eq!(state.outs, 1);
    assert!(state.runners.is_empty());
}

#[test]
fn test_line_score_by_inning() {
    let events = vec![
        event(1, 1, Half::Top, EventType::HomeRun, 0, 1),
        strikeout(2, 1, Half::Top),
        strikeout(3, 1, Half::Top),
        strikeout(4, 1, Half::Top),
        event(5, 3, Half::Top, EventType::HomeRun, 0, 1),
        event(6, 3, Half::Top, EventType::HomeRun, 0, 1),
    ];
    let state = reduce(&events, &lineup(9), &away(), &EphemeralState::default());
    assert_eq!(state.line_score, vec![1, 0, 2]);
    assert_eq!(state.score, 3);
    assert_eq!(logged_runs(&events), 3);
}

#[test]
fn test_defensive_outs_overlay_and_flip() {
    let setup = GameSetup::new("g".to_string(), TeamSide::Home);
    let mut ephemeral = EphemeralState::default();

    ephemeral.record_defensive_out(HalfInning::OPENING);
    ephemeral.record_defensive_out(HalfInning::OPENING);
    let state = reduce(std::iter::empty::<&PlayEvent>(), &lineup(9), &setup, &ephemeral);
    assert!(!state.offense);
    assert_eq!(state.outs, 2);

    ephemeral.record_defensive_out(HalfInning::OPENING);
    let state = reduce(std::iter::empty::<&PlayEvent>(), &lineup(9), &setup, &ephemeral);
    assert!(state.offense);
    assert_eq!(state.half_inning(), HalfInning::new(1, Half::Bottom));
    assert_eq!(state.outs, 0);
}

#[test]
fn test_stale_defensive_outs_ignored() {
    let setup = GameSetup::new("g".to_string(), TeamSide::Home);
    let mut ephemeral = EphemeralState::default();
    ephemeral.record_defensive_out(HalfInning::OPENING);

    let events: Vec<PlayEvent> = (1..=3).map(|i| strikeout(i, 1, Half::Bottom)).collect();
    let state = reduce(&events, &lineup(9), &setup, &ephemeral);
    assert_eq!(state.half_inning(), HalfInning::new(2, Half::Top));
    assert_eq!(state.outs, 0);
}

#[test]
fn test_score_adjustment_floors_at_zero() {
    let events = vec![event(1, 1, Half::Top, EventType::HomeRun, 0, 1)];
    let mut ephemeral = EphemeralState::default();

    ephemeral.override_score(5, logged_runs(&events));
    assert_eq!(reduce(&events, &[], &away(), &ephemeral).score, 5);

    ephemeral.score_adjustment = -10;
    assert_eq!(reduce(&events, &[], &away(), &ephemeral).score, 0);
}

#[test]
fn test_out_of_range_innings_are_skipped() {
    let mut single = event(1, 1, Half::Top, EventType::Single, 0, 1);
    single.runs = Some(1);
    let clean = vec![single.clone(), strikeout(4, 1, Half::Top)];

    let mut runaway = event(2, u32::MAX, Half::Bottom, EventType::HomeRun, 3, 4);
    runaway.runs = Some(4);
    let zeroth = strikeout(3, 0, Half::Top);
    let tainted = vec![single, runaway, zeroth, strikeout(4, 1, Half::Top)];

    let lineup = lineup(9);
    let expected = reduce(&clean, &lineup, &away(), &EphemeralState::default());
    let state = reduce(&tainted, &lineup, &away(), &EphemeralState::default());
    assert_eq!(state, expected);
    assert_eq!(state.half_inning(), HalfInning::new(1, Half::Top));
    assert_eq!(state.line_score, vec![1]);
    assert!(check_game_state(&state).is_ok());
    assert_eq!(logged_runs(&tainted), 1);
}

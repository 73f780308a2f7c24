//! Convergence of the play log under any arrival order.

use chrono::{TimeZone, Utc};
use scorecard_engine::{
    Analytics, BaseState, ClientKey, EntryStatus, EphemeralState, EventId, EventType, GameSetup,
    Half, PlayEvent, PlayLog, PushMessage, RosterId, TeamSide, UndoError, plan_undo, reduce,
};

fn play(seq: i64, event_type: EventType) -> PlayEvent {
    PlayEvent {
        id: None,
        client_key: ClientKey::generate(),
        game_id: "g".to_string(),
        recorded_at: Utc.timestamp_opt(1_750_000_000 + seq, 0).unwrap(),
        inning: 1,
        half: Half::Top,
        batter_id: RosterId::from("b"),
        event_type,
        rbi: 0,
        runs: None,
        outs_on_play: 0,
        base_state_after: BaseState::new(),
        analytics: Analytics::default(),
        description: String::new(),
    }
}

fn persisted(event: &PlayEvent, id: i64) -> PlayEvent {
    let mut event = event.clone();
    event.id = Some(EventId::from(id));
    event
}

#[derive(Clone)]
enum Op {
    Append(PlayEvent),
    Confirm(PlayEvent),
    Push(PushMessage),
}

fn apply(log: &mut PlayLog, op: &Op) {
    match op {
        Op::Append(event) => {
            log.append_local(event.clone());
        }
        Op::Confirm(event) => {
            log.confirm(event.clone());
        }
        Op::Push(message) => {
            log.apply_push(message.clone());
        }
    }
}

fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            out.push(tail);
        }
    }
    out
}

#[test]
fn test_log_converges_under_any_interleaving() {
    let own = play(1, EventType::Single);
    let other = play(2, EventType::Walk);
    let undone = play(3, EventType::Strikeout);
    let mut edited = persisted(&other, 20);
    edited.event_type = EventType::Double;
    let mut edited_own = persisted(&own, 10);
    edited_own.description = "corrected".to_string();

    let ops = vec![
        Op::Append(own.clone()),
        Op::Confirm(persisted(&own, 10)),
        Op::Push(PushMessage::Created(persisted(&own, 10))),
        Op::Push(PushMessage::Updated(edited_own.clone())),
        Op::Push(PushMessage::Created(persisted(&other, 20))),
        Op::Push(PushMessage::Updated(edited.clone())),
        Op::Push(PushMessage::Created(persisted(&undone, 30))),
        Op::Push(PushMessage::Deleted(EventId::from(30))),
    ];

    // A confirmation arriving after the update must not roll it back.
    let expected = vec![edited_own, edited];
    let indices: Vec<usize> = (0..ops.len()).collect();
    for order in permutations(&indices) {
        let mut log = PlayLog::new("g");
        for i in &order {
            apply(&mut log, &ops[*i]);
        }
        let events: Vec<PlayEvent> = log.events().cloned().collect();
        assert_eq!(events, expected, "order {:?}", order);
        assert!(log.entries().iter().all(|e| *e.status() == EntryStatus::Confirmed));
    }
}

#[test]
fn test_same_log_same_state_regardless_of_arrival() {
    let setup = GameSetup::new("g".to_string(), TeamSide::Away);
    let lineup = vec![RosterId::from("b")];
    let plays: Vec<PlayEvent> = (0..4)
        .map(|i| persisted(&play(i, EventType::Strikeout), i + 1))
        .collect();

    let mut forward = PlayLog::new("g");
    let mut backward = PlayLog::new("g");
    for event in &plays {
        forward.apply_push(PushMessage::Created(event.clone()));
    }
    for event in plays.iter().rev() {
        backward.apply_push(PushMessage::Created(event.clone()));
    }

    let ephemeral = EphemeralState::default();
    assert_eq!(
        reduce(forward.events(), &lineup, &setup, &ephemeral),
        reduce(backward.events(), &lineup, &setup, &ephemeral)
    );
}

#[test]
fn test_undo_converges_with_duplicate_deletes() {
    let first = persisted(&play(1, EventType::Walk), 1);
    let second = persisted(&play(2, EventType::Single), 2);

    let mut scorer = PlayLog::new("g");
    let mut viewer = PlayLog::new("g");
    for log in [&mut scorer, &mut viewer] {
        log.apply_push(PushMessage::Created(first.clone()));
        log.apply_push(PushMessage::Created(second.clone()));
    }

    let request = plan_undo(&scorer).unwrap();
    assert_eq!(*request.event_id(), EventId::from(2));
    scorer.remove(*request.event_id());

    // The delete echoes back to the scorer and reaches the viewer twice.
    assert!(!scorer.apply_push(PushMessage::Deleted(EventId::from(2))));
    assert!(viewer.apply_push(PushMessage::Deleted(EventId::from(2))));
    assert!(!viewer.apply_push(PushMessage::Deleted(EventId::from(2))));
    // A late create cannot resurrect it.
    assert!(!viewer.apply_push(PushMessage::Created(second)));

    let scorer_events: Vec<_> = scorer.events().cloned().collect();
    let viewer_events: Vec<_> = viewer.events().cloned().collect();
    assert_eq!(scorer_events, vec![first.clone()]);
    assert_eq!(viewer_events, vec![first]);
}

#[test]
fn test_undo_blocked_by_pending_play() {
    let mut log = PlayLog::new("g");
    log.apply_push(PushMessage::Created(persisted(&play(1, EventType::Walk), 1)));
    let pending = play(2, EventType::Single);
    let key = pending.client_key;
    log.append_local(pending);

    assert_eq!(plan_undo(&log), Err(UndoError::Unconfirmed(key)));
    assert_eq!(log.len(), 2);
}

#[test]
fn test_confirmation_after_remote_delete_drops_optimistic_copy() {
    let mut log = PlayLog::new("g");
    let local = play(1, EventType::Walk);
    log.append_local(local.clone());
    log.apply_push(PushMessage::Deleted(EventId::from(5)));
    log.confirm(persisted(&local, 5));
    assert!(log.is_empty());
}

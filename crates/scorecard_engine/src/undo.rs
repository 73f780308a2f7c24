//! Retraction of the most recent play.

use crate::event::{ClientKey, EventId};
use crate::reconcile::{EntryStatus, PlayLog};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// The play an undo should delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct UndoRequest {
    event_id: EventId,
    client_key: ClientKey,
    description: String,
}

/// Why nothing can be undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum UndoError {
    /// The log has no plays.
    #[display("Nothing to undo")]
    EmptyLog,
    /// The latest play has not been persisted yet.
    #[display("Latest play {} is not confirmed yet", _0)]
    Unconfirmed(ClientKey),
}

impl std::error::Error for UndoError {}

/// Picks the most recent play for deletion.
///
/// # Errors
///
/// [`UndoError::EmptyLog`] when there is nothing to undo and
/// [`UndoError::Unconfirmed`] when the latest play has no persisted id.
#[instrument(skip(log), fields(game_id = %log.game_id(), entries = log.len()))]
pub fn plan_undo(log: &PlayLog) -> Result<UndoRequest, UndoError> {
    let Some(last) = log.last() else {
        debug!("Undo requested on an empty log");
        return Err(UndoError::EmptyLog);
    };
    let event = last.event();
    match (event.id, last.status()) {
        (Some(event_id), EntryStatus::Confirmed) => Ok(UndoRequest {
            event_id,
            client_key: event.client_key,
            description: event.description.clone(),
        }),
        _ => {
            warn!(client_key = %event.client_key, status = %last.status(), "Latest play is not confirmed");
            Err(UndoError::Unconfirmed(event.client_key))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Analytics, EventType, PlayEvent};
    use crate::reconcile::PushMessage;
    use crate::types::{BaseState, Half};
    use chrono::Utc;

    fn play(id: Option<i64>) -> PlayEvent {
        PlayEvent {
            id: id.map(EventId::from),
            client_key: ClientKey::generate(),
            game_id: "g1".to_string(),
            recorded_at: Utc::now(),
            inning: 1,
            half: Half::Top,
            batter_id: "b".into(),
            event_type: EventType::Walk,
            rbi: 0,
            runs: None,
            outs_on_play: 0,
            base_state_after: BaseState::new(),
            analytics: Analytics::default(),
            description: "b: walk".to_string(),
        }
    }

    #[test]
    fn test_empty_log() {
        assert_eq!(plan_undo(&PlayLog::new("g1")), Err(UndoError::EmptyLog));
    }

    #[test]
    fn test_unconfirmed_last_entry() {
        let mut log = PlayLog::new("g1");
        let local = play(None);
        let key = local.client_key;
        log.append_local(local);
        assert_eq!(plan_undo(&log), Err(UndoError::Unconfirmed(key)));
    }

    #[test]
    fn test_targets_latest_confirmed() {
        let mut log = PlayLog::new("g1");
        log.apply_push(PushMessage::Created(play(Some(4))));
        let request = plan_undo(&log).unwrap();
        assert_eq!(*request.event_id(), EventId::from(4));
    }
}

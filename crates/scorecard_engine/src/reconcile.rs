//! Realtime reconciliation of the play log.
//!
//! Three sources feed one log: optimistic local appends, confirmations from
//! persistence, and change notifications pushed by other clients. Entries are
//! keyed by persisted id with the client key as a secondary key, so the same
//! play arriving from several sources in any order collapses into one entry.
//! Deleted ids are tombstoned so a late "created" cannot bring them back.

use crate::event::{ClientKey, EventId, GameId, PlayEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// State of the push channel.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Subscription requested, not yet live.
    #[display("connecting")]
    Connecting,
    /// Receiving changes.
    #[display("connected")]
    Connected,
    /// The channel failed or dropped; local scoring continues.
    #[display("error")]
    Error,
    /// No subscription.
    #[default]
    #[display("idle")]
    Idle,
}

/// Where an entry stands with persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "kebab-case")]
pub enum EntryStatus {
    /// Appended locally, submission outstanding.
    #[display("pending")]
    Pending,
    /// Persisted, carries an id.
    #[display("confirmed")]
    Confirmed,
    /// Submission failed; kept so the operator can see and retry it.
    #[display("submit-failed")]
    SubmitFailed,
}

/// One entry of the log.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct LogEntry {
    /// The play.
    event: PlayEvent,
    /// Persistence status.
    status: EntryStatus,
}

/// A change notification from the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "lowercase")]
pub enum PushMessage {
    /// Another client (or this one) persisted a play.
    Created(PlayEvent),
    /// A stored play was replaced.
    Updated(PlayEvent),
    /// A play was deleted by undo.
    Deleted(EventId),
}

impl PushMessage {
    /// Game the change belongs to, when the payload carries it.
    pub fn game_id(&self) -> Option<&str> {
        match self {
            PushMessage::Created(event) | PushMessage::Updated(event) => Some(&event.game_id),
            PushMessage::Deleted(_) => None,
        }
    }
}

/// The de-duplicated, ordered play log of one game.
#[derive(Debug, Clone)]
pub struct PlayLog {
    game_id: GameId,
    entries: Vec<LogEntry>,
    tombstones: HashSet<EventId>,
}

impl PlayLog {
    /// Creates an empty log for `game_id`.
    pub fn new(game_id: impl Into<GameId>) -> Self {
        Self {
            game_id: game_id.into(),
            entries: Vec::new(),
            tombstones: HashSet::new(),
        }
    }

    /// Game this log belongs to.
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Entries in log order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Events in log order, the reducer's input.
    pub fn events(&self) -> impl Iterator<Item = &PlayEvent> {
        self.entries.iter().map(|e| &e.event)
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the log has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose submission failed.
    pub fn failed(&self) -> impl Iterator<Item = &PlayEvent> {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::SubmitFailed)
            .map(|e| &e.event)
    }

    /// Whether `id` was deleted.
    pub fn is_tombstoned(&self, id: EventId) -> bool {
        self.tombstones.contains(&id)
    }

    /// Appends a locally recorded play before persistence confirms it.
    ///
    /// Returns false when an entry with the same client key already exists.
    #[instrument(skip(self, event), fields(game_id = %self.game_id, client_key = %event.client_key))]
    pub fn append_local(&mut self, event: PlayEvent) -> bool {
        if !event.half_inning().is_valid() {
            warn!(inning = event.inning, "Play with an out-of-range inning rejected");
            return false;
        }
        if self.position_by_key(event.client_key).is_some() {
            debug!("Optimistic append already present");
            return false;
        }
        self.entries.push(LogEntry {
            event,
            status: EntryStatus::Pending,
        });
        self.sort();
        true
    }

    /// Replaces the optimistic entry with its persisted copy.
    ///
    /// When a push already delivered the same play, the pushed copy is kept,
    /// so a late confirmation never overwrites a newer update. When the id
    /// was deleted in the meantime, the optimistic copy is dropped.
    #[instrument(skip(self, confirmed), fields(game_id = %self.game_id, client_key = %confirmed.client_key))]
    pub fn confirm(&mut self, confirmed: PlayEvent) -> bool {
        let Some(id) = confirmed.id else {
            warn!("Confirmation without a persisted id ignored");
            return false;
        };
        if self.tombstones.contains(&id) {
            debug!(%id, "Confirmed play was already deleted; dropping optimistic copy");
            if let Some(index) = self.position_by_key(confirmed.client_key) {
                self.entries.remove(index);
            }
            return true;
        }
        self.upsert(confirmed, false)
    }

    /// Marks a pending entry as failed. The entry stays in the log.
    #[instrument(skip(self), fields(game_id = %self.game_id))]
    pub fn mark_failed(&mut self, client_key: ClientKey) -> bool {
        match self.position_by_key(client_key) {
            Some(index) if self.entries[index].status == EntryStatus::Pending => {
                self.entries[index].status = EntryStatus::SubmitFailed;
                warn!(%client_key, "Play submission failed; keeping optimistic entry");
                true
            }
            _ => false,
        }
    }

    /// Moves a failed entry back to pending before a retry.
    pub fn mark_pending(&mut self, client_key: ClientKey) -> bool {
        match self.position_by_key(client_key) {
            Some(index) if self.entries[index].status == EntryStatus::SubmitFailed => {
                self.entries[index].status = EntryStatus::Pending;
                true
            }
            _ => false,
        }
    }

    /// Applies a pushed change. Returns true when the log changed.
    #[instrument(skip(self, message), fields(game_id = %self.game_id))]
    pub fn apply_push(&mut self, message: PushMessage) -> bool {
        if let Some(game_id) = message.game_id()
            && game_id != self.game_id
        {
            debug!(other = game_id, "Push for another game ignored");
            return false;
        }
        match message {
            PushMessage::Created(record) => {
                if record.id.is_some_and(|id| self.tombstones.contains(&id)) {
                    debug!("Created push for a deleted play ignored");
                    return false;
                }
                self.upsert(record, false)
            }
            PushMessage::Updated(record) => {
                if record.id.is_some_and(|id| self.tombstones.contains(&id)) {
                    debug!("Updated push for a deleted play ignored");
                    return false;
                }
                self.upsert(record, true)
            }
            PushMessage::Deleted(id) => self.remove(id).is_some(),
        }
    }

    /// Removes the entry with `id` and tombstones the id.
    ///
    /// Removing an id that is already gone is a no-op apart from the tombstone.
    #[instrument(skip(self), fields(game_id = %self.game_id))]
    pub fn remove(&mut self, id: EventId) -> Option<PlayEvent> {
        self.tombstones.insert(id);
        let index = self.entries.iter().position(|e| e.event.id == Some(id))?;
        let entry = self.entries.remove(index);
        info!(%id, "Play removed from log");
        Some(entry.event)
    }

    /// Merges an authoritative listing from persistence.
    ///
    /// Listed plays go through the same keyed merge as pushes. Confirmed
    /// entries missing from the listing were deleted while we were not
    /// listening and are removed; unconfirmed entries are kept.
    #[instrument(skip(self, snapshot), fields(game_id = %self.game_id, listed = snapshot.len()))]
    pub fn resync(&mut self, snapshot: Vec<PlayEvent>) -> bool {
        let listed: HashSet<EventId> = snapshot.iter().filter_map(|e| e.id).collect();
        let stale: Vec<EventId> = self
            .entries
            .iter()
            .filter(|e| e.status == EntryStatus::Confirmed)
            .filter_map(|e| e.event.id)
            .filter(|id| !listed.contains(id))
            .collect();

        let mut changed = false;
        for id in stale {
            changed |= self.remove(id).is_some();
        }
        for record in snapshot {
            if record.id.is_some_and(|id| self.tombstones.contains(&id)) {
                continue;
            }
            changed |= self.upsert(record, true);
        }
        debug!(changed, entries = self.entries.len(), "Resync merged");
        changed
    }

    fn upsert(&mut self, record: PlayEvent, replace_confirmed: bool) -> bool {
        let Some(id) = record.id else {
            warn!(client_key = %record.client_key, "Record without a persisted id ignored");
            return false;
        };
        if !record.half_inning().is_valid() {
            warn!(%id, inning = record.inning, "Record with an out-of-range inning ignored");
            return false;
        }
        let existing = self
            .entries
            .iter()
            .position(|e| e.event.id == Some(id))
            .or_else(|| self.position_by_key(record.client_key));

        match existing {
            Some(index) => {
                let entry = &mut self.entries[index];
                if entry.status == EntryStatus::Confirmed
                    && (!replace_confirmed || entry.event == record)
                {
                    return false;
                }
                entry.event = record;
                entry.status = EntryStatus::Confirmed;
            }
            None => self.entries.push(LogEntry {
                event: record,
                status: EntryStatus::Confirmed,
            }),
        }
        self.sort();
        true
    }

    fn position_by_key(&self, client_key: ClientKey) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.event.client_key == client_key)
    }

    fn sort(&mut self) {
        self.entries.sort_by_key(|e| e.event.sort_key());
    }
}

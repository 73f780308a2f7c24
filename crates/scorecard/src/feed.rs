//! Push channel: change notifications fanned out to every viewer of a game.

use crate::store::{PlayStore, StoreError};
use async_trait::async_trait;
use scorecard_engine::{ConnectionState, EventId, GameId, PlayEvent, PushMessage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, info, instrument, warn};

/// Default number of buffered items per game before slow receivers lag.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// One item delivered by the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    /// A stored play changed.
    Change(PushMessage),
    /// The channel changed state.
    Connection(ConnectionState),
}

/// Source of push subscriptions.
#[async_trait]
pub trait PushFeed: Send + Sync {
    /// Subscribes to changes of one game.
    async fn subscribe(&self, game_id: &str) -> Result<PushSubscription, StoreError>;
}

/// A live subscription to one game's changes.
///
/// The first item is always `Connection(Connected)`. A receiver that falls
/// behind sees `Connection(Error)` followed by `Connection(Connected)`, which
/// tells the live game to resync.
#[derive(Debug)]
pub struct PushSubscription {
    game_id: GameId,
    receiver: broadcast::Receiver<FeedItem>,
    queued: Vec<FeedItem>,
}

impl PushSubscription {
    fn new(game_id: GameId, receiver: broadcast::Receiver<FeedItem>) -> Self {
        Self {
            game_id,
            receiver,
            queued: vec![FeedItem::Connection(ConnectionState::Connected)],
        }
    }

    /// Game this subscription follows.
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Waits for the next item. Returns `None` once the channel is closed.
    #[instrument(skip(self), fields(game_id = %self.game_id))]
    pub async fn recv(&mut self) -> Option<FeedItem> {
        if let Some(item) = self.pop_queued() {
            return Some(item);
        }
        match self.receiver.recv().await {
            Ok(item) => Some(item),
            Err(RecvError::Lagged(missed)) => Some(self.lagged(missed)),
            Err(RecvError::Closed) => {
                debug!("Push channel closed");
                None
            }
        }
    }

    /// Returns the next item if one is ready.
    pub fn try_recv(&mut self) -> Option<FeedItem> {
        if let Some(item) = self.pop_queued() {
            return Some(item);
        }
        match self.receiver.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Lagged(missed)) => Some(self.lagged(missed)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    fn pop_queued(&mut self) -> Option<FeedItem> {
        if self.queued.is_empty() {
            None
        } else {
            Some(self.queued.remove(0))
        }
    }

    fn lagged(&mut self, missed: u64) -> FeedItem {
        warn!(game_id = %self.game_id, missed, "Subscriber lagged behind the push channel");
        self.queued
            .push(FeedItem::Connection(ConnectionState::Connected));
        FeedItem::Connection(ConnectionState::Error)
    }
}

/// In-process push channel with one broadcast sender per game.
#[derive(Debug, Clone)]
pub struct PushHub {
    channels: Arc<Mutex<HashMap<GameId, broadcast::Sender<FeedItem>>>>,
    capacity: usize,
}

impl Default for PushHub {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }
}

impl PushHub {
    /// Creates a hub with the default buffer size.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a hub buffering `capacity` items per game.
    #[instrument]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<GameId, broadcast::Sender<FeedItem>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sender(&self, game_id: &str) -> broadcast::Sender<FeedItem> {
        self.lock()
            .entry(game_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Publishes a change to every subscriber of `game_id`. Returns the
    /// number of subscribers reached.
    #[instrument(skip(self, message))]
    pub fn publish(&self, game_id: &str, message: PushMessage) -> usize {
        let reached = self.sender(game_id).send(FeedItem::Change(message)).unwrap_or(0);
        debug!(reached, "Change published");
        reached
    }

    /// Broadcasts a connection transition to every subscriber of `game_id`.
    #[instrument(skip(self))]
    pub fn set_connection(&self, game_id: &str, state: ConnectionState) -> usize {
        let reached = self
            .sender(game_id)
            .send(FeedItem::Connection(state))
            .unwrap_or(0);
        info!(%state, reached, "Connection state broadcast");
        reached
    }

    /// Number of live subscribers of `game_id`.
    pub fn subscriber_count(&self, game_id: &str) -> usize {
        self.lock()
            .get(game_id)
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }
}

#[async_trait]
impl PushFeed for PushHub {
    #[instrument(skip(self))]
    async fn subscribe(&self, game_id: &str) -> Result<PushSubscription, StoreError> {
        let receiver = self.sender(game_id).subscribe();
        info!("Subscribed to push channel");
        Ok(PushSubscription::new(game_id.to_string(), receiver))
    }
}

/// A store that publishes every successful write to a [`PushHub`].
#[derive(Debug, Clone)]
pub struct Publishing<S> {
    store: S,
    hub: PushHub,
}

impl<S: PlayStore> Publishing<S> {
    /// Wraps `store`, publishing to `hub`.
    pub fn new(store: S, hub: PushHub) -> Self {
        Self { store, hub }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// The hub changes are published to.
    pub fn hub(&self) -> &PushHub {
        &self.hub
    }
}

#[async_trait]
impl<S: PlayStore> PlayStore for Publishing<S> {
    async fn append_event(&self, play: &PlayEvent) -> Result<PlayEvent, StoreError> {
        let stored = self.store.append_event(play).await?;
        self.hub
            .publish(&stored.game_id, PushMessage::Created(stored.clone()));
        Ok(stored)
    }

    async fn delete_event(&self, game_id: &str, id: EventId) -> Result<(), StoreError> {
        self.store.delete_event(game_id, id).await?;
        self.hub.publish(game_id, PushMessage::Deleted(id));
        Ok(())
    }

    async fn list_events(&self, game_id: &str) -> Result<Vec<PlayEvent>, StoreError> {
        self.store.list_events(game_id).await
    }

    async fn set_opponent_score(&self, game_id: &str, score: u32) -> Result<(), StoreError> {
        self.store.set_opponent_score(game_id, score).await
    }

    async fn opponent_score(&self, game_id: &str) -> Result<u32, StoreError> {
        self.store.opponent_score(game_id).await
    }
}

#[async_trait]
impl<S: PlayStore> PushFeed for Publishing<S> {
    async fn subscribe(&self, game_id: &str) -> Result<PushSubscription, StoreError> {
        self.hub.subscribe(game_id).await
    }
}

//! Live game adapter: drives the scoring engine against persistence and the
//! push channel and republishes derived state to observers.
//!
//! Every mutation takes `&mut self`; one task owns the game and awaits the
//! collaborators in turn. Plays are appended to the local log before they
//! are submitted, so the operator never waits on the network to see a play.

use crate::feed::{FeedItem, PushFeed, PushSubscription};
use crate::roster::Roster;
use crate::store::{PlayStore, StoreError};
use chrono::Utc;
use scorecard_engine::{
    Advancement, AdvancementError, Analytics, BattingSide, ConnectionState, Contract,
    ContractError, DerivedGameState, Dispositions, EphemeralState, EventId, EventType, FieldZone,
    GameSetup, HitLocation, PlayContract, PlayEvent, PlayLog, PlayOutcome, RbiPolicy, RosterId,
    UndoError, classify, evaluate, logged_runs, plan_undo, reduce, review_with_override,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Error from a live-game operation.
#[derive(Debug, Clone, derive_more::Display)]
pub enum LiveGameError {
    /// The play request broke a precondition.
    #[display("{}", _0)]
    Contract(ContractError),

    /// The runner dispositions were rejected.
    #[display("{}", _0)]
    Advancement(AdvancementError),

    /// Nothing can be undone.
    #[display("{}", _0)]
    Undo(UndoError),

    /// A collaborator failed.
    #[display("{}", _0)]
    Store(StoreError),

    /// The lineup is empty, so nobody is due up.
    #[display("No batter is due up; the lineup is empty")]
    NoBatter,

    /// The play needs a disposition for every runner.
    #[display("{} needs a disposition for every runner", _0)]
    DispositionsRequired(EventType),

    /// Defensive bookkeeping while the scoring team is batting.
    #[display("The scoring team is batting")]
    NotOnDefense,
}

impl std::error::Error for LiveGameError {}

impl From<ContractError> for LiveGameError {
    fn from(err: ContractError) -> Self {
        Self::Contract(err)
    }
}

impl From<AdvancementError> for LiveGameError {
    fn from(err: AdvancementError) -> Self {
        Self::Advancement(err)
    }
}

impl From<UndoError> for LiveGameError {
    fn from(err: UndoError) -> Self {
        Self::Undo(err)
    }
}

impl From<StoreError> for LiveGameError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Operator input accompanying a play.
#[derive(Debug, Clone, Default, PartialEq, derive_new::new)]
pub struct PlayInput {
    /// One disposition per occupied base. Required for plays that need
    /// review; on a routine batted out it overrides the automatic result.
    pub dispositions: Option<Dispositions>,
    /// Where the ball was put in play.
    pub location: Option<HitLocation>,
    /// Side of the plate the batter hit from.
    pub batting_side: Option<BattingSide>,
}

impl PlayInput {
    /// Input carrying only runner dispositions.
    pub fn with_dispositions(dispositions: Dispositions) -> Self {
        Self {
            dispositions: Some(dispositions),
            ..Self::default()
        }
    }
}

/// One game being scored live.
pub struct LiveGame {
    setup: GameSetup,
    lineup: Vec<RosterId>,
    policy: RbiPolicy,
    store: Arc<dyn PlayStore>,
    log: PlayLog,
    ephemeral: EphemeralState,
    connection: ConnectionState,
    subscription: Option<PushSubscription>,
    state_tx: watch::Sender<DerivedGameState>,
}

impl std::fmt::Debug for LiveGame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveGame")
            .field("setup", &self.setup)
            .field("lineup", &self.lineup)
            .field("entries", &self.log.len())
            .field("connection", &self.connection)
            .finish()
    }
}

impl LiveGame {
    /// Loads a game: lineup from the roster, plays and opponent score from
    /// the store.
    ///
    /// # Errors
    ///
    /// Returns [`LiveGameError::Store`] if a collaborator fails.
    #[instrument(skip(store, roster), fields(game_id = %setup.game_id))]
    pub async fn load(
        setup: GameSetup,
        store: Arc<dyn PlayStore>,
        roster: &dyn Roster,
        policy: RbiPolicy,
    ) -> Result<Self, LiveGameError> {
        let lineup = roster.batting_lineup(&setup.game_id).await?;
        let mut log = PlayLog::new(setup.game_id.clone());
        log.resync(store.list_events(&setup.game_id).await?);
        let ephemeral = EphemeralState {
            opponent_score: store.opponent_score(&setup.game_id).await?,
            ..EphemeralState::default()
        };

        let initial = reduce(log.events(), &lineup, &setup, &ephemeral);
        let (state_tx, _) = watch::channel(initial);
        info!(plays = log.len(), lineup = lineup.len(), "Live game loaded");
        Ok(Self {
            setup,
            lineup,
            policy,
            store,
            log,
            ephemeral,
            connection: ConnectionState::Idle,
            subscription: None,
            state_tx,
        })
    }

    /// Game identity and side.
    pub fn setup(&self) -> &GameSetup {
        &self.setup
    }

    /// The batting order.
    pub fn lineup(&self) -> &[RosterId] {
        &self.lineup
    }

    /// The reconciled play log.
    pub fn log(&self) -> &PlayLog {
        &self.log
    }

    /// The client-local counters.
    pub fn ephemeral(&self) -> &EphemeralState {
        &self.ephemeral
    }

    /// State of the push channel.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Recomputes the derived state from the log and the local counters.
    pub fn current_state(&self) -> DerivedGameState {
        reduce(self.log.events(), &self.lineup, &self.setup, &self.ephemeral)
    }

    /// Observers receive the derived state after every change.
    pub fn watch_state(&self) -> watch::Receiver<DerivedGameState> {
        self.state_tx.subscribe()
    }

    /// Classifies contact at `(x, y)` for a play of `event_type`.
    pub fn classify_contact(&self, x: f64, y: f64, event_type: &EventType) -> FieldZone {
        classify(x, y, event_type)
    }

    /// Shows how a play would settle from the current situation, without
    /// recording anything.
    ///
    /// # Errors
    ///
    /// Returns [`LiveGameError::Contract`] if the play is not legal now and
    /// [`LiveGameError::NoBatter`] if nobody is due up.
    #[instrument(skip(self), fields(game_id = %self.setup.game_id))]
    pub fn preview(&self, event_type: &EventType) -> Result<Advancement, LiveGameError> {
        let state = self.current_state();
        PlayContract::pre(&state, event_type)?;
        let batter = state.current_batter.clone().ok_or(LiveGameError::NoBatter)?;
        Ok(evaluate(event_type, &state.runners, state.outs, &batter, self.policy))
    }

    /// Records a play: checks it, appends it optimistically, then submits it.
    ///
    /// On a store failure the optimistic entry stays in the log, marked as
    /// failed, and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`LiveGameError`] if the play is rejected before submission
    /// or the store fails.
    #[instrument(skip(self, input), fields(game_id = %self.setup.game_id, event_type = %event_type))]
    pub async fn submit_play(
        &mut self,
        event_type: EventType,
        input: PlayInput,
    ) -> Result<PlayEvent, LiveGameError> {
        let before = self.current_state();
        PlayContract::pre(&before, &event_type)?;
        let batter = before.current_batter.clone().ok_or(LiveGameError::NoBatter)?;

        let outcome = self.settle(&before, &event_type, &batter, input.dispositions)?;
        let analytics = Analytics {
            zone: input
                .location
                .and_then(|at| classify(at.x, at.y, &event_type).attribution()),
            location: input.location,
            batting_side: input.batting_side,
        };
        let event = PlayEvent::from_outcome(
            self.setup.game_id.clone(),
            before.half_inning(),
            batter,
            event_type,
            &outcome,
            analytics,
            Utc::now(),
        );

        let after = reduce(
            self.log.events().chain(std::iter::once(&event)),
            &self.lineup,
            &self.setup,
            &self.ephemeral,
        );
        PlayContract::post(&before, &after)?;

        let client_key = event.client_key;
        self.log.append_local(event.clone());
        self.publish();
        debug!(%client_key, "Play appended optimistically");

        self.submit(event).await
    }

    /// Resubmits every play whose submission failed. Returns how many were
    /// confirmed.
    ///
    /// # Errors
    ///
    /// Returns the first store error; plays not yet retried stay failed.
    #[instrument(skip(self), fields(game_id = %self.setup.game_id))]
    pub async fn retry_failed(&mut self) -> Result<usize, LiveGameError> {
        let failed: Vec<PlayEvent> = self.log.failed().cloned().collect();
        let mut confirmed = 0;
        for event in failed {
            self.log.mark_pending(event.client_key);
            self.submit(event).await?;
            confirmed += 1;
        }
        info!(confirmed, "Failed plays resubmitted");
        Ok(confirmed)
    }

    /// Deletes the most recent confirmed play.
    ///
    /// The play leaves the local log only after the store confirms the
    /// delete. A play someone else already deleted is removed locally too.
    ///
    /// # Errors
    ///
    /// Returns [`LiveGameError::Undo`] when nothing can be undone and
    /// [`LiveGameError::Store`] when the delete fails; the log is unchanged.
    #[instrument(skip(self), fields(game_id = %self.setup.game_id))]
    pub async fn request_undo(&mut self) -> Result<EventId, LiveGameError> {
        let request = plan_undo(&self.log)?;
        let id = *request.event_id();
        match self.store.delete_event(&self.setup.game_id, id).await {
            Ok(()) => info!(%id, description = %request.description(), "Play undone"),
            Err(StoreError::NotFound(_)) => {
                info!(%id, "Play was already deleted elsewhere")
            }
            Err(err) => {
                warn!(%id, error = %err, "Undo failed; log unchanged");
                return Err(err.into());
            }
        }
        self.log.remove(id);
        self.publish();
        Ok(id)
    }

    /// Records one out while the opponent bats. Three outs end their half.
    ///
    /// # Errors
    ///
    /// Returns [`LiveGameError::NotOnDefense`] while the scoring team bats.
    #[instrument(skip(self), fields(game_id = %self.setup.game_id))]
    pub fn record_defensive_out(&mut self) -> Result<DerivedGameState, LiveGameError> {
        let state = self.current_state();
        if state.offense {
            warn!("Defensive out recorded while batting");
            return Err(LiveGameError::NotOnDefense);
        }
        self.ephemeral.record_defensive_out(state.half_inning());
        Ok(self.publish())
    }

    /// Adds runs for the opponent and syncs the new total.
    ///
    /// The local total is kept even when the sync fails.
    ///
    /// # Errors
    ///
    /// Returns [`LiveGameError::Store`] if the store rejects the new total.
    #[instrument(skip(self), fields(game_id = %self.setup.game_id))]
    pub async fn record_opponent_runs(&mut self, runs: u32) -> Result<u32, LiveGameError> {
        let total = self.ephemeral.add_opponent_runs(runs);
        self.publish();
        self.sync_opponent_score(total).await?;
        Ok(total)
    }

    /// Sets the opponent's score; the last write wins.
    ///
    /// # Errors
    ///
    /// Returns [`LiveGameError::Store`] if the store rejects the score.
    #[instrument(skip(self), fields(game_id = %self.setup.game_id))]
    pub async fn set_opponent_score(&mut self, score: u32) -> Result<(), LiveGameError> {
        self.ephemeral.opponent_score = score;
        self.publish();
        self.sync_opponent_score(score).await
    }

    /// Overrides the displayed score of the scoring team.
    ///
    /// The log is untouched; the difference is kept as a local adjustment.
    #[instrument(skip(self), fields(game_id = %self.setup.game_id))]
    pub fn update_score(&mut self, score: u32) -> DerivedGameState {
        let logged = logged_runs(self.log.events());
        self.ephemeral.override_score(score, logged);
        info!(score, logged, "Score overridden");
        self.publish()
    }

    /// Subscribes to the push channel, then resyncs from the store.
    ///
    /// The subscription is taken before the listing, so changes made while
    /// no subscription existed are merged and none fall in between.
    ///
    /// # Errors
    ///
    /// Returns [`LiveGameError::Store`] if the subscription or the resync
    /// fails. A failed subscription leaves the connection state at `Error`
    /// and local scoring continues.
    #[instrument(skip(self, feed), fields(game_id = %self.setup.game_id))]
    pub async fn connect(&mut self, feed: &dyn PushFeed) -> Result<(), LiveGameError> {
        self.connection = ConnectionState::Connecting;
        match feed.subscribe(&self.setup.game_id).await {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.resync().await?;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Push subscription failed");
                self.connection = ConnectionState::Error;
                Err(err.into())
            }
        }
    }

    /// Drops the push subscription.
    pub fn disconnect(&mut self) {
        self.subscription = None;
        self.connection = ConnectionState::Idle;
        debug!("Push subscription dropped");
    }

    /// Waits for the next push item and applies it. Returns false once the
    /// channel is closed or no subscription exists.
    ///
    /// # Errors
    ///
    /// Returns [`LiveGameError::Store`] if a resync after reconnecting fails.
    pub async fn next_feed_item(&mut self) -> Result<bool, LiveGameError> {
        let Some(subscription) = self.subscription.as_mut() else {
            return Ok(false);
        };
        match subscription.recv().await {
            Some(item) => {
                self.apply_feed_item(item).await?;
                Ok(true)
            }
            None => {
                warn!("Push channel closed");
                self.subscription = None;
                self.connection = ConnectionState::Error;
                Ok(false)
            }
        }
    }

    /// Applies every push item that is already waiting. Returns how many were
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`LiveGameError::Store`] if a resync after reconnecting fails.
    pub async fn drain_feed(&mut self) -> Result<usize, LiveGameError> {
        let mut applied = 0;
        while let Some(item) = self.subscription.as_mut().and_then(PushSubscription::try_recv) {
            self.apply_feed_item(item).await?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Merges one push item into the log.
    ///
    /// Returning to `Connected` after an error triggers a resync.
    ///
    /// # Errors
    ///
    /// Returns [`LiveGameError::Store`] if that resync fails.
    #[instrument(skip(self, item), fields(game_id = %self.setup.game_id))]
    pub async fn apply_feed_item(&mut self, item: FeedItem) -> Result<(), LiveGameError> {
        match item {
            FeedItem::Change(message) => {
                if self.log.apply_push(message) {
                    self.publish();
                }
            }
            FeedItem::Connection(state) => {
                let previous = self.connection;
                self.connection = state;
                match state {
                    ConnectionState::Error => warn!(%previous, "Push channel error"),
                    ConnectionState::Connected if previous == ConnectionState::Error => {
                        info!("Push channel back; resyncing");
                        self.resync().await?;
                    }
                    _ => debug!(%previous, %state, "Connection state changed"),
                }
            }
        }
        Ok(())
    }

    /// Reloads plays and the opponent's score from the store and merges them.
    ///
    /// # Errors
    ///
    /// Returns [`LiveGameError::Store`] if the store cannot be read.
    #[instrument(skip(self), fields(game_id = %self.setup.game_id))]
    pub async fn resync(&mut self) -> Result<DerivedGameState, LiveGameError> {
        let plays = self.store.list_events(&self.setup.game_id).await?;
        let opponent_score = self.store.opponent_score(&self.setup.game_id).await?;
        self.log.resync(plays);
        self.ephemeral.opponent_score = opponent_score;
        info!(entries = self.log.len(), "Resynced from store");
        Ok(self.publish())
    }

    fn settle(
        &self,
        before: &DerivedGameState,
        event_type: &EventType,
        batter: &RosterId,
        dispositions: Option<Dispositions>,
    ) -> Result<PlayOutcome, LiveGameError> {
        if event_type.is_batted_out()
            && let Some(chosen) = &dispositions
        {
            let review =
                review_with_override(event_type, &before.runners, before.outs, batter, self.policy)?;
            return Ok(review.resolve(chosen)?);
        }
        match evaluate(event_type, &before.runners, before.outs, batter, self.policy) {
            Advancement::Automatic(outcome) => Ok(outcome),
            Advancement::Review(review) => {
                let chosen = match dispositions {
                    Some(chosen) => chosen,
                    None if review.runners().is_empty() => Dispositions::new(),
                    None => return Err(LiveGameError::DispositionsRequired(event_type.clone())),
                };
                Ok(review.resolve(&chosen)?)
            }
        }
    }

    async fn submit(&mut self, event: PlayEvent) -> Result<PlayEvent, LiveGameError> {
        let client_key = event.client_key;
        match self.store.append_event(&event).await {
            Ok(confirmed) => {
                self.log.confirm(confirmed.clone());
                self.publish();
                info!(id = ?confirmed.id, description = %confirmed.description, "Play confirmed");
                Ok(confirmed)
            }
            Err(err) => {
                self.log.mark_failed(client_key);
                self.publish();
                warn!(%client_key, error = %err, "Play submission failed");
                Err(err.into())
            }
        }
    }

    async fn sync_opponent_score(&self, score: u32) -> Result<(), LiveGameError> {
        self.store
            .set_opponent_score(&self.setup.game_id, score)
            .await
            .map_err(|err| {
                warn!(score, error = %err, "Opponent score sync failed");
                LiveGameError::from(err)
            })
    }

    fn publish(&self) -> DerivedGameState {
        let state = self.current_state();
        self.state_tx.send_replace(state.clone());
        state
    }
}

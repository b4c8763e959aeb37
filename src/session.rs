//! Session manager: owns live sessions, routes inbound actions, fires
//! timers, settles and retires finished sessions.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use chrono::{DateTime, Utc};
use strum::IntoEnumIterator;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::GameTypeCatalog;
use crate::config::EngineSettings;
use crate::error::EngineError;
use crate::events::{EngineEvent, EventBus};
use crate::games::ludo::{
    Dice, DiceFactory, Match, MatchSnapshot, MoveDelta, MoveValidator, PlayerId, RakePolicy,
    RandomDiceFactory, Seat, SessionId, SettlementService, TurnPhase,
};
use crate::store::{MemorySessionStore, SessionRecord, SessionStore};
use crate::timers::{TimerArena, TimerKind};

struct SessionSlot {
    game: Match,
    dice: Box<dyn Dice>,
    created_at: DateTime<Utc>,
    retired: bool,
}

struct Inner {
    catalog: GameTypeCatalog,
    settings: EngineSettings,
    sessions: Mutex<HashMap<SessionId, Arc<Mutex<SessionSlot>>>>,
    retired: Mutex<HashSet<SessionId>>,
    settlement: SettlementService,
    events: EventBus,
    timers: TimerArena,
    store: Arc<dyn SessionStore>,
    dice: Arc<dyn DiceFactory>,
}

/// Routes actions to sessions. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("game_types", &self.inner.catalog.len())
            .field("active", &self.active_sessions().len())
            .field("store", &self.inner.store)
            .finish()
    }
}

/// Builder for [`SessionManager`].
pub struct SessionManagerBuilder {
    catalog: GameTypeCatalog,
    settings: EngineSettings,
    store: Option<Arc<dyn SessionStore>>,
    dice: Option<Arc<dyn DiceFactory>>,
}

impl SessionManagerBuilder {
    /// Overrides the default settings.
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Persists records to `store` instead of memory.
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Supplies dice to new sessions.
    pub fn dice(mut self, dice: impl DiceFactory + 'static) -> Self {
        self.dice = Some(Arc::new(dice));
        self
    }

    /// Builds the manager.
    #[instrument(skip(self), fields(game_types = self.catalog.len()))]
    pub fn build(self) -> SessionManager {
        let rake = RakePolicy::new(*self.settings.rake_basis_points());
        info!(rake_bps = rake.basis_points(), "Creating session manager");
        SessionManager {
            inner: Arc::new(Inner {
                events: EventBus::new(*self.settings.event_capacity()),
                settlement: SettlementService::new(rake),
                store: self
                    .store
                    .unwrap_or_else(|| Arc::new(MemorySessionStore::new())),
                dice: self.dice.unwrap_or_else(|| Arc::new(RandomDiceFactory)),
                catalog: self.catalog,
                settings: self.settings,
                sessions: Mutex::new(HashMap::new()),
                retired: Mutex::new(HashSet::new()),
                timers: TimerArena::new(),
            }),
        }
    }
}

impl SessionManager {
    /// Starts building a manager over `catalog`.
    pub fn builder(catalog: GameTypeCatalog) -> SessionManagerBuilder {
        SessionManagerBuilder {
            catalog,
            settings: EngineSettings::default(),
            store: None,
            dice: None,
        }
    }

    /// Loaded game types.
    pub fn catalog(&self) -> &GameTypeCatalog {
        &self.inner.catalog
    }

    /// Subscribes to every session event.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    /// Ids of sessions still running, sorted.
    pub fn active_sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self
            .inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    // ─────────────────────────────────────────────────────────
    //  Inbound operations
    // ─────────────────────────────────────────────────────────

    /// Creates a session waiting for its roster to join.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownGameType`], [`EngineError::InvalidRoster`], or
    /// [`EngineError::Storage`] if the initial record cannot be written.
    #[instrument(skip(self, roster), fields(roster = roster.len()))]
    pub fn create_session(
        &self,
        game_type_id: &str,
        roster: Vec<PlayerId>,
    ) -> Result<MatchSnapshot, EngineError> {
        let game_type = self
            .inner
            .catalog
            .get(game_type_id)
            .ok_or_else(|| EngineError::UnknownGameType(game_type_id.to_string()))?;

        let session_id = Uuid::new_v4().to_string();
        let game = Match::new(
            session_id.clone(),
            game_type,
            roster,
            self.inner.settings.disconnect_timeout(),
        )?;
        let created_at = Utc::now();
        let snapshot = game.snapshot();
        self.inner
            .store
            .save(&SessionRecord::from_snapshot(&snapshot, None, created_at))?;

        let slot = SessionSlot {
            dice: self.inner.dice.dice_for(&session_id),
            game,
            created_at,
            retired: false,
        };
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.clone(), Arc::new(Mutex::new(slot)));

        info!(%session_id, game_type = %game_type_id, "Session created");
        Ok(snapshot)
    }

    /// Confirms a seat's presence.
    #[instrument(skip(self))]
    pub fn join(&self, session_id: &str, seat: Seat) -> Result<(), EngineError> {
        self.act(session_id, |slot, now| slot.game.join(seat, now))
    }

    /// Rolls the die for the seat to act, returning the value.
    #[instrument(skip(self))]
    pub fn submit_roll(&self, session_id: &str, seat: Seat) -> Result<u8, EngineError> {
        self.act(session_id, |slot, now| {
            let SessionSlot { game, dice, .. } = slot;
            game.roll(seat, dice.as_mut(), now)
        })
    }

    /// Moves a piece by the pending roll.
    #[instrument(skip(self))]
    pub fn submit_move(
        &self,
        session_id: &str,
        seat: Seat,
        piece: u8,
    ) -> Result<MoveDelta, EngineError> {
        self.act(session_id, |slot, now| slot.game.move_piece(seat, piece, now))
    }

    /// Reports a seat's transport as gone.
    #[instrument(skip(self))]
    pub fn disconnect(&self, session_id: &str, seat: Seat) -> Result<(), EngineError> {
        self.act(session_id, |slot, now| slot.game.disconnect(seat, now))
    }

    /// Reports a seat's transport as back.
    #[instrument(skip(self))]
    pub fn reconnect(&self, session_id: &str, seat: Seat) -> Result<(), EngineError> {
        self.act(session_id, |slot, now| slot.game.reconnect(seat, now))
    }

    /// Aborts a session and refunds its stakes.
    #[instrument(skip(self))]
    pub fn cancel_session(&self, session_id: &str, reason: &str) -> Result<(), EngineError> {
        self.act(session_id, |slot, now| slot.game.cancel(reason.to_string(), now))
    }

    /// Current state of a live or finished session.
    ///
    /// Finished sessions are read back from the store.
    ///
    /// # Errors
    ///
    /// [`EngineError::SessionNotFound`] for unknown ids, or
    /// [`EngineError::Storage`] if the final record cannot be read.
    #[instrument(skip(self))]
    pub fn snapshot(&self, session_id: &str) -> Result<MatchSnapshot, EngineError> {
        match self.slot(session_id) {
            Ok(slot) => Ok(lock(&slot).game.snapshot()),
            Err(EngineError::SessionTerminal(_)) => {
                Ok(self.record(session_id)?.snapshot().clone())
            }
            Err(err) => Err(err),
        }
    }

    /// Moves the seat to act may make with its pending roll.
    #[instrument(skip(self))]
    pub fn legal_moves(&self, session_id: &str) -> Result<Vec<MoveDelta>, EngineError> {
        let slot = self.slot(session_id)?;
        let guard = lock(&slot);
        let game = &guard.game;
        Ok(match game.phase() {
            TurnPhase::AwaitingMoveChoice { roll } => {
                MoveValidator::legal_moves(game, game.current_seat(), *roll)
            }
            TurnPhase::AwaitingRoll => Vec::new(),
        })
    }

    /// Persisted record of a session.
    ///
    /// # Errors
    ///
    /// [`EngineError::SessionNotFound`] if nothing was stored under the id.
    #[instrument(skip(self))]
    pub fn record(&self, session_id: &str) -> Result<SessionRecord, EngineError> {
        self.inner
            .store
            .load(session_id)?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))
    }

    // ─────────────────────────────────────────────────────────
    //  Internals
    // ─────────────────────────────────────────────────────────

    fn slot(&self, session_id: &str) -> Result<Arc<Mutex<SessionSlot>>, EngineError> {
        if let Some(slot) = self
            .inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
        {
            return Ok(Arc::clone(slot));
        }
        if self
            .inner
            .retired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(session_id)
        {
            return Err(EngineError::SessionTerminal(session_id.to_string()));
        }
        debug!(%session_id, "Session not found");
        Err(EngineError::SessionNotFound(session_id.to_string()))
    }

    fn act<T>(
        &self,
        session_id: &str,
        action: impl FnOnce(&mut SessionSlot, Instant) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let slot = self.slot(session_id)?;
        let mut guard = lock(&slot);
        let result = action(&mut guard, Instant::now());
        if let Err(err) = &result {
            debug!(%session_id, kind = err.kind(), error = %err, "Action rejected");
        }
        self.after_action(&mut guard);
        result
    }

    fn on_timer(&self, session_id: &str) {
        let Ok(slot) = self.slot(session_id) else {
            return;
        };
        let mut guard = lock(&slot);
        if guard.game.tick(Instant::now()) {
            debug!(%session_id, "Deadline applied");
        }
        self.after_action(&mut guard);
    }

    fn after_action(&self, slot: &mut SessionSlot) {
        self.inner.events.publish_all(slot.game.take_events());
        if slot.retired {
            return;
        }
        if slot.game.status().is_terminal() {
            self.finalize(slot);
        } else {
            self.sync_timers(&slot.game);
        }
    }

    fn sync_timers(&self, game: &Match) {
        for kind in TimerKind::iter() {
            let deadline = match kind {
                TimerKind::Turn => game.turn_deadline(),
                TimerKind::Session => game.session_deadline(),
                TimerKind::Disconnect => game.disconnect_deadline(),
            };
            let weak: Weak<Inner> = Arc::downgrade(&self.inner);
            let session_id = game.id().clone();
            self.inner.timers.sync(game.id(), kind, deadline, move || {
                if let Some(inner) = weak.upgrade() {
                    SessionManager { inner }.on_timer(&session_id);
                }
            });
        }
    }

    /// Settles, announces, persists and retires a terminal session. Runs
    /// with the session lock held so no further action can slip in.
    fn finalize(&self, slot: &mut SessionSlot) {
        slot.retired = true;
        let snapshot = slot.game.snapshot();
        let session_id = snapshot.session_id().clone();
        self.inner.timers.cancel_session(&session_id);

        let settlement = match self.inner.settlement.settle(&snapshot) {
            Ok(result) => {
                self.inner.events.publish(EngineEvent::SessionCompleted {
                    session_id: session_id.clone(),
                    result: result.clone(),
                });
                Some(result)
            }
            Err(err) => {
                warn!(%session_id, error = %err, "Session not settled");
                None
            }
        };

        let record = SessionRecord::from_snapshot(&snapshot, settlement, slot.created_at);
        if let Err(err) = self.inner.store.save(&record) {
            error!(%session_id, error = %err, "Failed to persist final session record");
        }

        self.inner
            .retired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.clone());
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session_id);
        info!(%session_id, "Session retired");
    }

    /// Ids of sessions that finished.
    pub fn retired_sessions(&self) -> HashSet<SessionId> {
        self.inner
            .retired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn lock(slot: &Mutex<SessionSlot>) -> std::sync::MutexGuard<'_, SessionSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

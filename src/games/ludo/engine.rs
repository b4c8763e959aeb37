//! Turn state machine for one session.
//!
//! A [`Match`] owns every piece of mutable session state. Callers pass the
//! current [`Instant`] into each operation; expired deadlines are applied
//! before the requested action so timers and player input can never
//! disagree about what happened first.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::error::EngineError;
use crate::events::EngineEvent;

use super::action::{IllegalReason, MoveDelta, MoveError, PlayerAction};
use super::board::BoardTopology;
#[cfg(debug_assertions)]
use super::contracts::{CommitContract, Contract};
use super::dice::Dice;
use super::phases::{EndReason, ForfeitReason, Outcome, SessionStatus, TurnPhase};
use super::rules::{GameType, RuleSet};
use super::scoring::{ScoreDelta, Scoring, ScoringStrategy, rank};
use super::types::{Piece, Player, PlayerId, Seat, SessionId, TrackPosition, Variant};
use super::validator::{MoveValidator, PlayersTurn};

// ─────────────────────────────────────────────────────────────
//  History
// ─────────────────────────────────────────────────────────────

/// What a history step recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnRecord {
    /// A move was committed.
    Moved {
        /// The move.
        delta: MoveDelta,
        /// Its score effect.
        score: ScoreDelta,
    },
    /// The roll allowed no legal move.
    Passed {
        /// Value rolled.
        roll: u8,
    },
    /// The turn was skipped.
    Forfeited {
        /// Why.
        reason: ForfeitReason,
    },
}

/// One append-only history step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Position in the history, starting at 0.
    pub sequence: u32,
    /// Turn number the step belongs to.
    pub turn: u64,
    /// Seat the step concerns.
    pub seat: Seat,
    /// What happened.
    pub record: TurnRecord,
}

#[derive(Debug, Clone, Default)]
struct Deadlines {
    turn: Option<Instant>,
    session: Option<Instant>,
    disconnect: Vec<Option<Instant>>,
}

fn expired(deadline: Option<Instant>, now: Instant) -> bool {
    deadline.is_some_and(|at| at <= now)
}

// ─────────────────────────────────────────────────────────────
//  Match
// ─────────────────────────────────────────────────────────────

/// Authoritative state of one session.
#[derive(Debug, Clone, Getters)]
pub struct Match {
    /// Session identifier.
    id: SessionId,
    /// Shared rules of the game type.
    rules: Arc<RuleSet>,
    /// Shared board of the game type.
    board: Arc<BoardTopology>,
    #[getter(skip)]
    scoring: Scoring,
    /// Players in seat order.
    players: Vec<Player>,
    /// Lifecycle status.
    status: SessionStatus,
    /// Sub-phase of the current turn.
    phase: TurnPhase,
    #[getter(skip)]
    current: Seat,
    /// Turns started so far.
    turn_number: u64,
    /// Moves committed so far.
    moves_made: u32,
    /// Append-only record of every turn.
    history: Vec<HistoryEntry>,
    /// Final result, once terminal.
    outcome: Option<Outcome>,
    #[getter(skip)]
    deadlines: Deadlines,
    #[getter(skip)]
    disconnect_timeout: Duration,
    #[getter(skip)]
    outbox: Vec<EngineEvent>,
}

impl Match {
    /// Creates a session waiting for every roster seat to join.
    ///
    /// Seats are assigned in roster order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRoster`] if the roster size is outside
    /// the game type's bounds, exceeds the board's seats, or contains empty
    /// or duplicate player ids.
    #[instrument(skip(game_type, roster), fields(session_id = %id, game_type = %game_type.id(), roster = roster.len()))]
    pub fn new(
        id: SessionId,
        game_type: &GameType,
        roster: Vec<PlayerId>,
        disconnect_timeout: Duration,
    ) -> Result<Self, EngineError> {
        let rules = Arc::clone(game_type.rules());
        let board = Arc::clone(game_type.board());

        let count = roster.len();
        let (min, max) = (*rules.min_players(), *rules.max_players());
        if count < usize::from(min) || count > usize::from(max) {
            return Err(EngineError::InvalidRoster(format!(
                "{} players, game type {} allows {}..={}",
                count,
                rules.id(),
                min,
                max
            )));
        }
        if count > board.seats() {
            return Err(EngineError::InvalidRoster(format!(
                "{} players but the board seats {}",
                count,
                board.seats()
            )));
        }
        if let Some(seat) = roster.iter().position(|p| p.trim().is_empty()) {
            return Err(EngineError::InvalidRoster(format!(
                "player at seat {} has an empty id",
                seat
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = roster.iter().find(|p| !seen.insert(p.as_str())) {
            return Err(EngineError::InvalidRoster(format!("duplicate player id {}", dup)));
        }

        let players: Vec<Player> = roster
            .into_iter()
            .zip(0u8..)
            .map(|(player, seat)| {
                Player::new(player, Seat(seat), *board.pieces_per_player(), rules.starting_lives())
            })
            .collect();

        info!(variant = %rules.variant(), "Session created");
        Ok(Self {
            id,
            scoring: Scoring::for_rules(&rules),
            deadlines: Deadlines {
                disconnect: vec![None; players.len()],
                ..Deadlines::default()
            },
            players,
            rules,
            board,
            status: SessionStatus::WaitingForPlayers,
            phase: TurnPhase::AwaitingRoll,
            current: Seat(0),
            turn_number: 0,
            moves_made: 0,
            history: Vec::new(),
            outcome: None,
            disconnect_timeout,
            outbox: Vec::new(),
        })
    }

    /// Seat due to act.
    pub fn current_seat(&self) -> Seat {
        self.current
    }

    /// Player seated at `seat`.
    pub fn player(&self, seat: Seat) -> Option<&Player> {
        self.players.get(seat.index())
    }

    /// Deadline of the current turn.
    pub fn turn_deadline(&self) -> Option<Instant> {
        self.deadlines.turn
    }

    /// Deadline of the whole session.
    pub fn session_deadline(&self) -> Option<Instant> {
        self.deadlines.session
    }

    /// Earliest pending disconnect deadline.
    pub fn disconnect_deadline(&self) -> Option<Instant> {
        self.deadlines.disconnect.iter().flatten().min().copied()
    }

    /// Drains events produced since the last call.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Dispatches an action to the matching operation.
    ///
    /// # Errors
    ///
    /// Propagates the error of the dispatched operation.
    pub fn apply(
        &mut self,
        action: PlayerAction,
        dice: &mut dyn Dice,
        now: Instant,
    ) -> Result<(), EngineError> {
        match action {
            PlayerAction::Join { seat } => self.join(seat, now),
            PlayerAction::Roll { seat } => self.roll(seat, dice, now).map(|_| ()),
            PlayerAction::Move { seat, piece } => self.move_piece(seat, piece, now).map(|_| ()),
            PlayerAction::Disconnect { seat } => self.disconnect(seat, now),
            PlayerAction::Reconnect { seat } => self.reconnect(seat, now),
            PlayerAction::Cancel { reason } => self.cancel(reason, now),
        }
    }

    /// Applies every deadline that has passed.
    ///
    /// Returns true if anything changed.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn tick(&mut self, now: Instant) -> bool {
        let before = (self.status, self.turn_number);
        self.enforce_deadlines(now);
        before != (self.status, self.turn_number)
    }

    // ─────────────────────────────────────────────────────────
    //  Inbound operations
    // ─────────────────────────────────────────────────────────

    /// Confirms a seat's presence. The session starts once every seat joined.
    ///
    /// # Errors
    ///
    /// [`EngineError::SessionTerminal`] after the session ended,
    /// [`IllegalReason::CannotJoin`] once started or when joining twice.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn join(&mut self, seat: Seat, now: Instant) -> Result<(), EngineError> {
        self.guard(now)?;
        if self.status != SessionStatus::WaitingForPlayers {
            return Err(MoveError::illegal(IllegalReason::CannotJoin).into());
        }
        let player = self
            .players
            .get_mut(seat.index())
            .ok_or(MoveError::illegal(IllegalReason::UnknownSeat))?;
        if player.joined {
            return Err(MoveError::illegal(IllegalReason::CannotJoin).into());
        }
        player.joined = true;
        debug!(%seat, player = %player.id(), "Seat joined");
        self.emit(|session_id| EngineEvent::PlayerJoined { session_id, seat });

        if self.players.iter().all(|p| p.joined) {
            self.start(now);
        }
        Ok(())
    }

    /// Rolls for the current seat.
    ///
    /// A roll with no legal move passes the turn immediately.
    ///
    /// # Errors
    ///
    /// [`MoveError::IllegalMove`] out of turn or with a move choice pending.
    #[instrument(skip(self, dice), fields(session_id = %self.id))]
    pub fn roll(&mut self, seat: Seat, dice: &mut dyn Dice, now: Instant) -> Result<u8, EngineError> {
        self.guard(now)?;
        PlayersTurn::check(self, seat)?;
        if let TurnPhase::AwaitingMoveChoice { .. } = self.phase {
            return Err(MoveError::illegal(IllegalReason::MoveChoicePending).into());
        }

        let value = dice.roll(*self.rules.dice_faces());
        let legal = MoveValidator::legal_moves(self, seat, value);
        let movable: Vec<u8> = legal.iter().map(|delta| delta.piece).collect();
        debug!(%seat, value, movable = movable.len(), "Rolled");
        self.emit(|session_id| EngineEvent::DiceRolled {
            session_id,
            seat,
            value,
            movable,
        });

        if legal.is_empty() {
            self.record(seat, TurnRecord::Passed { roll: value });
            self.emit(|session_id| EngineEvent::TurnPassed {
                session_id,
                seat,
                roll: value,
            });
            self.advance_turn(now);
        } else {
            self.phase = TurnPhase::AwaitingMoveChoice { roll: value };
        }
        Ok(value)
    }

    /// Moves `piece` by the pending roll and commits the result.
    ///
    /// # Errors
    ///
    /// Any [`MoveError`] from validation; the turn is not consumed.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn move_piece(&mut self, seat: Seat, piece: u8, now: Instant) -> Result<MoveDelta, EngineError> {
        self.guard(now)?;
        PlayersTurn::check(self, seat)?;
        let TurnPhase::AwaitingMoveChoice { roll } = self.phase else {
            return Err(MoveError::illegal(IllegalReason::NoRollPending).into());
        };

        let delta = match MoveValidator::validate(self, seat, piece, roll) {
            Ok(delta) => delta,
            Err(err) => {
                warn!(%seat, piece, roll, error = %err, "Move rejected");
                return Err(err.into());
            }
        };
        self.commit(delta.clone(), now);
        Ok(delta)
    }

    /// Marks a seat disconnected and starts its disconnect clock.
    ///
    /// If it was the seat's turn, the turn is forfeited.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn disconnect(&mut self, seat: Seat, now: Instant) -> Result<(), EngineError> {
        self.guard(now)?;
        let timeout = self.disconnect_timeout;
        let player = self
            .players
            .get_mut(seat.index())
            .ok_or(MoveError::illegal(IllegalReason::UnknownSeat))?;
        if player.disconnected || player.eliminated {
            return Ok(());
        }
        player.disconnected = true;
        if let Some(slot) = self.deadlines.disconnect.get_mut(seat.index()) {
            *slot = now.checked_add(timeout);
        }
        warn!(%seat, timeout_secs = timeout.as_secs(), "Seat disconnected");
        self.emit(|session_id| EngineEvent::PlayerDisconnected { session_id, seat });

        if self.status == SessionStatus::InProgress && self.current == seat && self.has_connected_seat() {
            self.forfeit(seat, ForfeitReason::Disconnected);
            self.advance_turn(now);
        }
        Ok(())
    }

    /// Clears a seat's disconnect flag and deadline.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn reconnect(&mut self, seat: Seat, now: Instant) -> Result<(), EngineError> {
        self.guard(now)?;
        let player = self
            .players
            .get_mut(seat.index())
            .ok_or(MoveError::illegal(IllegalReason::UnknownSeat))?;
        if !player.disconnected {
            return Ok(());
        }
        player.disconnected = false;
        if let Some(slot) = self.deadlines.disconnect.get_mut(seat.index()) {
            *slot = None;
        }
        info!(%seat, "Seat reconnected");
        self.emit(|session_id| EngineEvent::PlayerReconnected { session_id, seat });
        Ok(())
    }

    /// Aborts the session; stakes are refunded at settlement.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn cancel(&mut self, reason: String, now: Instant) -> Result<(), EngineError> {
        self.guard(now)?;
        self.abort(EndReason::Cancelled { message: reason });
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    //  Transitions
    // ─────────────────────────────────────────────────────────

    fn guard(&mut self, now: Instant) -> Result<(), EngineError> {
        self.enforce_deadlines(now);
        if self.status.is_terminal() {
            return Err(EngineError::SessionTerminal(self.id.clone()));
        }
        Ok(())
    }

    fn enforce_deadlines(&mut self, now: Instant) {
        let timed_out = self
            .deadlines
            .disconnect
            .iter()
            .position(|deadline| expired(*deadline, now))
            .and_then(|i| u8::try_from(i).ok())
            .map(Seat);

        match self.status {
            SessionStatus::WaitingForPlayers => {
                if let Some(seat) = timed_out {
                    warn!(%seat, "Seat never returned before start");
                    self.abort(EndReason::DisconnectTimeout { seat });
                }
            }
            SessionStatus::InProgress => {
                if expired(self.deadlines.session, now) {
                    self.complete(EndReason::SessionTimeExpired, None);
                } else if let Some(seat) = timed_out {
                    self.complete(EndReason::DisconnectTimeout { seat }, None);
                } else if expired(self.deadlines.turn, now) {
                    let seat = self.current;
                    warn!(%seat, turn = self.turn_number, "Turn timed out");
                    self.record(seat, TurnRecord::Forfeited {
                        reason: ForfeitReason::TurnTimeout,
                    });
                    self.emit(|session_id| EngineEvent::TurnTimedOut { session_id, seat });
                    self.advance_turn(now);
                }
            }
            SessionStatus::Completed | SessionStatus::Aborted => {}
        }
    }

    fn start(&mut self, now: Instant) {
        self.status = SessionStatus::InProgress;
        self.deadlines.session = self
            .rules
            .session_limit()
            .and_then(|limit| now.checked_add(limit));
        let last = self.players.len().saturating_sub(1);
        self.current = Seat(u8::try_from(last).unwrap_or(u8::MAX));
        info!(session_id = %self.id, players = self.players.len(), "Session started");
        self.emit(|session_id| EngineEvent::SessionStarted { session_id });
        self.advance_turn(now);
    }

    fn commit(&mut self, delta: MoveDelta, now: Instant) {
        #[cfg(debug_assertions)]
        let before = {
            if let Err(err) = CommitContract::pre(self, &delta) {
                error!(session_id = %self.id, error = %err, "Committing an invalid move");
                debug_assert!(false, "{err}");
            }
            self.clone()
        };

        let score = self.scoring.score(&delta);
        let mover = delta.seat;

        if let Some(piece) = self.piece_mut(mover, delta.piece) {
            piece.position = delta.to;
        }
        for capture in &delta.captures {
            if let Some(piece) = self.piece_mut(capture.seat, capture.piece) {
                piece.position = TrackPosition::Yard;
            }
        }
        if let Some(player) = self.players.get_mut(mover.index()) {
            player.score = player.score.saturating_add(score.awarded);
            player.kills += score.kills;
        }
        for &(victim, points) in &score.penalties {
            if let Some(player) = self.players.get_mut(victim.index()) {
                player.score = player.score.saturating_sub(points);
            }
        }
        self.moves_made += 1;

        info!(
            session_id = %self.id,
            %delta,
            awarded = score.awarded,
            captures = delta.captures.len(),
            "Move committed"
        );
        self.record(mover, TurnRecord::Moved {
            delta: delta.clone(),
            score: score.clone(),
        });
        let lives_lost = score.lives_lost.clone();
        self.emit(|session_id| EngineEvent::MoveApplied {
            session_id,
            delta,
            score,
        });
        for victim in lives_lost {
            self.lose_life(victim);
        }

        match self.end_condition(mover) {
            Some((reason, winner)) => self.complete(reason, winner),
            None => self.advance_turn(now),
        }

        #[cfg(debug_assertions)]
        {
            if let Err(err) = CommitContract::post(&before, self) {
                error!(session_id = %self.id, error = %err, "Commit broke an invariant");
                debug_assert!(false, "{err}");
            }
        }
    }

    fn lose_life(&mut self, seat: Seat) {
        let Some(player) = self.players.get_mut(seat.index()) else {
            return;
        };
        let Some(lives) = player.lives.as_mut() else {
            return;
        };
        *lives = lives.saturating_sub(1);
        debug!(%seat, lives = *lives, "Life lost");
        if *lives > 0 || player.eliminated {
            return;
        }
        player.eliminated = true;
        player.disconnected = false;
        for piece in &mut player.pieces {
            piece.position = TrackPosition::Yard;
        }
        if let Some(slot) = self.deadlines.disconnect.get_mut(seat.index()) {
            *slot = None;
        }
        info!(session_id = %self.id, %seat, "Player eliminated");
        self.emit(|session_id| EngineEvent::PlayerEliminated { session_id, seat });
    }

    fn end_condition(&self, mover: Seat) -> Option<(EndReason, Option<Seat>)> {
        let variant = self.scoring.variant();
        if variant == Variant::Kill {
            let mut survivors = self.players.iter().filter(|p| p.is_active());
            if let (Some(last), None) = (survivors.next(), survivors.next()) {
                return Some((EndReason::LastSurvivor, Some(*last.seat())));
            }
        }
        let player = self.players.get(mover.index())?;
        if self.scoring.is_winner(player) {
            let reason = match variant {
                Variant::Quick => EndReason::AllPiecesHome,
                Variant::Classic | Variant::Kill => EndReason::PointsReached,
            };
            return Some((reason, Some(mover)));
        }
        if player.all_home() {
            return Some((EndReason::AllPiecesHome, None));
        }
        if self.rules.move_cap().is_some_and(|cap| self.moves_made >= cap) {
            return Some((EndReason::MoveCapReached, None));
        }
        None
    }

    fn advance_turn(&mut self, now: Instant) {
        let count = self.players.len();
        let connected = self.has_connected_seat();
        let start = self.current.index();

        let mut next = None;
        for step in 1..=count {
            let index = (start + step) % count;
            let Some(player) = self.players.get(index) else {
                continue;
            };
            if !player.is_active() {
                continue;
            }
            let seat = *player.seat();
            if player.disconnected && connected {
                self.forfeit(seat, ForfeitReason::Disconnected);
                continue;
            }
            next = Some(seat);
            break;
        }

        let Some(seat) = next else {
            error!(session_id = %self.id, "No seat can take the next turn");
            return;
        };
        self.current = seat;
        self.phase = TurnPhase::AwaitingRoll;
        self.turn_number += 1;
        self.deadlines.turn = self.rules.turn_limit().and_then(|limit| now.checked_add(limit));
        debug!(session_id = %self.id, %seat, turn = self.turn_number, "Turn started");
    }

    fn forfeit(&mut self, seat: Seat, reason: ForfeitReason) {
        debug!(session_id = %self.id, %seat, %reason, "Turn forfeited");
        self.record(seat, TurnRecord::Forfeited { reason });
        self.emit(|session_id| EngineEvent::TurnForfeited {
            session_id,
            seat,
            reason,
        });
    }

    fn complete(&mut self, reason: EndReason, winner: Option<Seat>) {
        let mut standings = rank(&self.players);
        if let Some(winner) = winner {
            standings.retain(|seat| *seat != winner);
            standings.insert(0, winner);
        }
        let winner = standings.first().copied();
        self.finish(Outcome {
            status: SessionStatus::Completed,
            reason,
            winner,
            standings,
        });
    }

    fn abort(&mut self, reason: EndReason) {
        self.finish(Outcome {
            status: SessionStatus::Aborted,
            reason,
            winner: None,
            standings: rank(&self.players),
        });
    }

    fn finish(&mut self, outcome: Outcome) {
        info!(
            session_id = %self.id,
            status = %outcome.status,
            reason = %outcome.reason,
            moves = self.moves_made,
            "Session ended: {}",
            outcome
        );
        self.status = outcome.status;
        self.deadlines = Deadlines {
            disconnect: vec![None; self.players.len()],
            ..Deadlines::default()
        };
        self.outcome = Some(outcome);
    }

    // ─────────────────────────────────────────────────────────
    //  Helpers
    // ─────────────────────────────────────────────────────────

    fn has_connected_seat(&self) -> bool {
        self.players.iter().any(|p| p.is_active() && !p.disconnected)
    }

    fn piece_mut(&mut self, seat: Seat, piece: u8) -> Option<&mut Piece> {
        self.players
            .get_mut(seat.index())?
            .pieces
            .get_mut(usize::from(piece))
    }

    fn record(&mut self, seat: Seat, record: TurnRecord) {
        let sequence = u32::try_from(self.history.len()).unwrap_or(u32::MAX);
        self.history.push(HistoryEntry {
            sequence,
            turn: self.turn_number,
            seat,
            record,
        });
    }

    fn emit(&mut self, event: impl FnOnce(SessionId) -> EngineEvent) {
        let event = event(self.id.clone());
        self.outbox.push(event);
    }

    /// Copies out the state settlement, persistence and the API need.
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            session_id: self.id.clone(),
            game_type: self.rules.id().clone(),
            variant: *self.rules.variant(),
            entry_fee: *self.rules.entry_fee(),
            points_to_win: *self.rules.points_to_win(),
            kill_mode_bonus: *self.rules.kill_mode_bonus(),
            path_length: self.board.path_length(),
            status: self.status,
            phase: self.phase,
            current_seat: self.current,
            turn_number: self.turn_number,
            moves_made: self.moves_made,
            players: self.players.clone(),
            history: self.history.clone(),
            outcome: self.outcome.clone(),
        }
    }
}

#[cfg(test)]
impl Match {
    /// Teleports a piece, bypassing validation.
    pub(crate) fn place_piece(&mut self, seat: Seat, piece: u8, position: TrackPosition) {
        if let Some(found) = self.piece_mut(seat, piece) {
            found.position = position;
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Snapshot
// ─────────────────────────────────────────────────────────────

/// Owned copy of a session's observable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct MatchSnapshot {
    /// Session identifier.
    session_id: SessionId,
    /// Game-type identifier.
    game_type: String,
    /// Rule variant.
    variant: Variant,
    /// Stake per player.
    entry_fee: u64,
    /// Score that wins CLASSIC and KILL.
    points_to_win: u32,
    /// Side-pot accrual per kill.
    kill_mode_bonus: u32,
    /// Progress value of home.
    path_length: u16,
    /// Lifecycle status.
    status: SessionStatus,
    /// Turn phase.
    phase: TurnPhase,
    /// Seat due to act.
    current_seat: Seat,
    /// Turns started.
    turn_number: u64,
    /// Moves committed.
    moves_made: u32,
    /// Players in seat order.
    players: Vec<Player>,
    /// Full history.
    history: Vec<HistoryEntry>,
    /// Final result, once terminal.
    outcome: Option<Outcome>,
}

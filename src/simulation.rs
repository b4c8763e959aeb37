//! Plays whole sessions through a [`SessionManager`] with bots in every seat.

use derive_getters::Getters;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::bot::Bot;
use crate::error::EngineError;
use crate::games::ludo::{MatchSnapshot, PlayerId, Seat, SettlementResult, TurnPhase};
use crate::session::SessionManager;

/// How a simulated session ended.
#[derive(Debug, Clone, Serialize, Getters)]
pub struct SimulationReport {
    /// Final state.
    snapshot: MatchSnapshot,
    /// Settlement, if the session settled.
    settlement: Option<SettlementResult>,
    /// Inbound actions submitted.
    actions: usize,
}

/// Drives one session from creation to a terminal state.
#[derive(derive_new::new)]
pub struct Simulation {
    manager: SessionManager,
    bots: Vec<Box<dyn Bot>>,
    /// Actions after which the session is cancelled.
    max_actions: usize,
}

impl Simulation {
    /// Creates a session for `roster`, joins every seat and plays until
    /// the session is terminal.
    ///
    /// Needs one bot per roster entry. A bot that declines to move, or a
    /// run that exceeds the action limit, cancels the session.
    ///
    /// # Errors
    ///
    /// Returns the first [`EngineError`] the manager reports.
    #[instrument(skip(self, roster), fields(roster = roster.len()))]
    pub fn run(
        &mut self,
        game_type: &str,
        roster: Vec<PlayerId>,
    ) -> Result<SimulationReport, EngineError> {
        if self.bots.len() < roster.len() {
            return Err(EngineError::InvalidRoster(format!(
                "{} seats but only {} bots",
                roster.len(),
                self.bots.len()
            )));
        }

        let created = self.manager.create_session(game_type, roster)?;
        let session_id = created.session_id().clone();
        for player in created.players() {
            self.manager.join(&session_id, *player.seat())?;
        }

        let mut actions = created.players().len();
        loop {
            let snapshot = self.manager.snapshot(&session_id)?;
            if snapshot.status().is_terminal() {
                break;
            }
            if actions >= self.max_actions {
                warn!(%session_id, actions, "Action limit reached");
                self.manager.cancel_session(&session_id, "simulation action limit")?;
                break;
            }

            let seat = *snapshot.current_seat();
            actions += 1;
            match snapshot.phase() {
                TurnPhase::AwaitingRoll => {
                    let value = self.manager.submit_roll(&session_id, seat)?;
                    debug!(%session_id, %seat, value, "Rolled");
                }
                TurnPhase::AwaitingMoveChoice { .. } => {
                    self.play_move(&session_id, seat)?;
                }
            }
        }

        let snapshot = self.manager.snapshot(&session_id)?;
        let settlement = self.manager.record(&session_id)?.settlement().clone();
        info!(
            %session_id,
            status = %snapshot.status(),
            moves = snapshot.moves_made(),
            actions,
            "Simulation finished"
        );
        Ok(SimulationReport {
            snapshot,
            settlement,
            actions,
        })
    }

    fn play_move(&mut self, session_id: &str, seat: Seat) -> Result<(), EngineError> {
        let moves = self.manager.legal_moves(session_id)?;
        let choice = self
            .bots
            .get_mut(seat.index())
            .and_then(|bot| bot.choose(&moves));
        match choice {
            Some(piece) => {
                self.manager.submit_move(session_id, seat, piece)?;
                Ok(())
            }
            None => {
                warn!(%session_id, %seat, "Bot declined to move");
                self.manager.cancel_session(session_id, "bot declined to move")
            }
        }
    }
}

//! Settlement: turning a terminal session into payouts and leaderboard deltas.
//!
//! Currency amounts are integers in minor units. Every split floors, and the
//! flooring remainder always lands on the winner, so payouts of a completed
//! session sum to exactly `pool - rake`.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::EngineError;

use super::engine::MatchSnapshot;
use super::phases::{Outcome, SessionStatus};
use super::types::{Player, PlayerId, Seat, SessionId, Variant};

/// Share of the pool kept by the host, in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RakePolicy {
    basis_points: u16,
}

impl RakePolicy {
    /// Creates a policy; values above 10 000 are clamped to 100%.
    pub fn new(basis_points: u16) -> Self {
        Self {
            basis_points: basis_points.min(10_000),
        }
    }

    /// Basis points taken.
    pub fn basis_points(&self) -> u16 {
        self.basis_points
    }

    /// Rake taken from `pool`, floored.
    pub fn rake_on(&self, pool: u64) -> u64 {
        let rake = u128::from(pool) * u128::from(self.basis_points) / 10_000;
        u64::try_from(rake).unwrap_or(pool)
    }
}

/// Currency paid to one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Player paid.
    pub player_id: PlayerId,
    /// Their seat.
    pub seat: Seat,
    /// Amount in minor units.
    pub amount: u64,
}

/// Leaderboard change for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardDelta {
    /// Player credited.
    pub player_id: PlayerId,
    /// Their seat.
    pub seat: Seat,
    /// Points to add to the leaderboard.
    pub delta: i64,
}

/// Final accounting for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct SettlementResult {
    /// Session settled.
    session_id: SessionId,
    /// Terminal status that was settled.
    status: SessionStatus,
    /// Sum of stakes.
    pool: u64,
    /// Host's cut.
    rake: u64,
    /// True if stakes were returned instead of paid out.
    refunded: bool,
    /// Payout per player, in seat order.
    payouts: Vec<Payout>,
    /// Leaderboard change per player, in seat order.
    leaderboard_deltas: Vec<LeaderboardDelta>,
}

impl SettlementResult {
    /// Sum of all payouts.
    pub fn paid_out(&self) -> u64 {
        self.payouts.iter().map(|p| p.amount).sum()
    }

    /// Payout of one seat.
    pub fn payout_for(&self, seat: Seat) -> u64 {
        self.payouts
            .iter()
            .find(|p| p.seat == seat)
            .map_or(0, |p| p.amount)
    }
}

/// Computes settlements exactly once per session.
#[derive(Debug)]
pub struct SettlementService {
    rake: RakePolicy,
    settled: Mutex<HashSet<SessionId>>,
}

impl SettlementService {
    /// Creates a service applying `rake` to completed sessions.
    pub fn new(rake: RakePolicy) -> Self {
        Self {
            rake,
            settled: Mutex::new(HashSet::new()),
        }
    }

    /// Rake policy in force.
    pub fn rake(&self) -> RakePolicy {
        self.rake
    }

    /// True if `session_id` was already settled.
    pub fn is_settled(&self, session_id: &str) -> bool {
        self.settled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(session_id)
    }

    /// Settles a terminal session.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotTerminal`] if the session is still running.
    /// - [`EngineError::DuplicateSettlement`] if it was settled before.
    #[instrument(skip(self, snapshot), fields(session_id = %snapshot.session_id()))]
    pub fn settle(&self, snapshot: &MatchSnapshot) -> Result<SettlementResult, EngineError> {
        let session_id = snapshot.session_id();
        let outcome = snapshot
            .outcome()
            .as_ref()
            .filter(|_| snapshot.status().is_terminal())
            .ok_or_else(|| EngineError::NotTerminal(session_id.clone()))?;

        let mut settled = self.settled.lock().unwrap_or_else(PoisonError::into_inner);
        if settled.contains(session_id) {
            error!(%session_id, "Settlement requested twice");
            return Err(EngineError::DuplicateSettlement(session_id.clone()));
        }

        let terms = Terms {
            variant: *snapshot.variant(),
            entry_fee: *snapshot.entry_fee(),
            points_to_win: *snapshot.points_to_win(),
            kill_mode_bonus: *snapshot.kill_mode_bonus(),
        };
        let result = terms.distribute(session_id, snapshot.players(), outcome, self.rake);
        settled.insert(session_id.clone());

        info!(
            pool = result.pool,
            rake = result.rake,
            refunded = result.refunded,
            paid_out = result.paid_out(),
            "Session settled"
        );
        Ok(result)
    }
}

struct Terms {
    variant: Variant,
    entry_fee: u64,
    points_to_win: u32,
    kill_mode_bonus: u32,
}

impl Terms {
    fn distribute(
        &self,
        session_id: &str,
        players: &[Player],
        outcome: &Outcome,
        policy: RakePolicy,
    ) -> SettlementResult {
        let pool = self.entry_fee.saturating_mul(players.len() as u64);

        if outcome.status == SessionStatus::Aborted {
            return SettlementResult {
                session_id: session_id.to_string(),
                status: outcome.status,
                pool,
                rake: 0,
                refunded: true,
                payouts: players
                    .iter()
                    .map(|p| payout(p, self.entry_fee))
                    .collect(),
                leaderboard_deltas: players
                    .iter()
                    .map(|p| LeaderboardDelta {
                        player_id: p.id().clone(),
                        seat: *p.seat(),
                        delta: 0,
                    })
                    .collect(),
            };
        }

        let rake = policy.rake_on(pool);
        let net = pool - rake;
        let winner = outcome.winner.or_else(|| outcome.standings.first().copied());

        let mut amounts = vec![0u64; players.len()];
        if self.variant == Variant::Kill {
            let total_kills: u64 = players.iter().map(|p| u64::from(*p.kills())).sum();
            let side_pot = total_kills
                .saturating_mul(u64::from(self.kill_mode_bonus))
                .min(net);
            if total_kills > 0 {
                for (amount, player) in amounts.iter_mut().zip(players) {
                    let share = u128::from(side_pot) * u128::from(*player.kills())
                        / u128::from(total_kills);
                    *amount = u64::try_from(share).unwrap_or(0);
                }
            }
        }
        let shared: u64 = amounts.iter().sum();
        if let Some(slot) = winner.and_then(|seat| amounts.get_mut(seat.index())) {
            *slot += net - shared;
        }

        SettlementResult {
            session_id: session_id.to_string(),
            status: outcome.status,
            pool,
            rake,
            refunded: false,
            payouts: players
                .iter()
                .zip(&amounts)
                .map(|(p, amount)| payout(p, *amount))
                .collect(),
            leaderboard_deltas: players
                .iter()
                .map(|p| {
                    let bonus = if Some(*p.seat()) == winner {
                        i64::from(self.points_to_win)
                    } else {
                        0
                    };
                    LeaderboardDelta {
                        player_id: p.id().clone(),
                        seat: *p.seat(),
                        delta: i64::from(*p.score()) + bonus,
                    }
                })
                .collect(),
        }
    }
}

fn payout(player: &Player, amount: u64) -> Payout {
    Payout {
        player_id: player.id().clone(),
        seat: *player.seat(),
        amount,
    }
}

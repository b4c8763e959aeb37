//! Contracts around committing a move.
//!
//! A contract pairs a precondition on the state and the proposed action with
//! a postcondition relating the state before and after: {P} commit {Q}.

use super::action::MoveDelta;
use super::engine::{Match, TurnRecord};
use super::invariants::{InvariantSet, LudoInvariants};
use super::validator::MoveValidator;
use tracing::{instrument, warn};

// ─────────────────────────────────────────────────────────────
//  Contract Trait
// ─────────────────────────────────────────────────────────────

/// Broken pre- or postcondition.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{} failed: {}", stage, detail)]
pub struct ContractViolation {
    /// `"precondition"` or `"postcondition"`.
    pub stage: &'static str,
    /// What went wrong.
    pub detail: String,
}

impl std::error::Error for ContractViolation {}

/// Preconditions and postconditions for a state transition.
pub trait Contract<S, A> {
    /// Checks preconditions before applying the action.
    fn pre(state: &S, action: &A) -> Result<(), ContractViolation>;

    /// Checks postconditions after applying the action.
    fn post(before: &S, after: &S) -> Result<(), ContractViolation>;
}

// ─────────────────────────────────────────────────────────────
//  Commit Contract
// ─────────────────────────────────────────────────────────────

/// Contract for committing a [`MoveDelta`].
///
/// Precondition: revalidating the move yields the same delta.
///
/// Postconditions: exactly one move was added, the history only grew, and
/// every session invariant holds.
pub struct CommitContract;

impl Contract<Match, MoveDelta> for CommitContract {
    #[instrument(skip_all)]
    fn pre(game: &Match, delta: &MoveDelta) -> Result<(), ContractViolation> {
        let revalidated = MoveValidator::validate(game, delta.seat, delta.piece, delta.roll)
            .map_err(|err| ContractViolation {
                stage: "precondition",
                detail: err.to_string(),
            })?;
        if revalidated != *delta {
            warn!(%delta, %revalidated, "Delta differs from current state");
            return Err(ContractViolation {
                stage: "precondition",
                detail: "delta is stale".into(),
            });
        }
        Ok(())
    }

    #[instrument(skip_all)]
    fn post(before: &Match, after: &Match) -> Result<(), ContractViolation> {
        if *after.moves_made() != before.moves_made() + 1 {
            return Err(ContractViolation {
                stage: "postcondition",
                detail: format!(
                    "moves went from {} to {}",
                    before.moves_made(),
                    after.moves_made()
                ),
            });
        }
        let prefix_kept = after.history().len() > before.history().len()
            && after.history()[..before.history().len()] == before.history()[..];
        let last_is_move = after
            .history()
            .iter()
            .rev()
            .find(|step| matches!(step.record, TurnRecord::Moved { .. }))
            .is_some_and(|step| step.sequence as usize >= before.history().len());
        if !prefix_kept || !last_is_move {
            return Err(ContractViolation {
                stage: "postcondition",
                detail: "history was rewritten".into(),
            });
        }
        LudoInvariants::check_all(after).map_err(|violations| ContractViolation {
            stage: "postcondition",
            detail: violations
                .iter()
                .map(|v| v.description.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        })
    }
}

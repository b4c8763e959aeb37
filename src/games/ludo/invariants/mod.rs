//! Invariants that hold for every reachable session state.
//!
//! Each invariant is a zero-sized type implementing [`Invariant`]; a tuple
//! of them is an [`InvariantSet`] checked in one pass. The turn state
//! machine runs [`LudoInvariants`] after each commit in debug builds.

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks whether the property holds.
    fn holds(state: &S) -> bool;

    /// Human-readable description.
    fn description() -> &'static str;
}

/// A broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a violation record.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// Several invariants checked together.
pub trait InvariantSet<S> {
    /// Returns every violation, or `Ok` if all hold.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

impl<S, I1, I2> InvariantSet<S> for (I1, I2)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();

        if !I1::holds(state) {
            violations.push(InvariantViolation::new(I1::description()));
        }

        if !I2::holds(state) {
            violations.push(InvariantViolation::new(I2::description()));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

impl<S, I1, I2, I3, I4> InvariantSet<S> for (I1, I2, I3, I4)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
    I4: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();

        if !I1::holds(state) {
            violations.push(InvariantViolation::new(I1::description()));
        }

        if !I2::holds(state) {
            violations.push(InvariantViolation::new(I2::description()));
        }

        if !I3::holds(state) {
            violations.push(InvariantViolation::new(I3::description()));
        }

        if !I4::holds(state) {
            violations.push(InvariantViolation::new(I4::description()));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

mod capture_exclusive;
mod entry_roll;
mod piece_conservation;
mod seat_eligible;

pub use capture_exclusive::CaptureExclusiveInvariant;
pub use entry_roll::EntryRollInvariant;
pub use piece_conservation::PieceConservationInvariant;
pub use seat_eligible::SeatEligibleInvariant;

/// Every session invariant as one set.
pub type LudoInvariants = (
    PieceConservationInvariant,
    CaptureExclusiveInvariant,
    SeatEligibleInvariant,
    EntryRollInvariant,
);

//! Dice sources.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

/// Source of die rolls for one session.
pub trait Dice: Send {
    /// Rolls a die with `faces` faces, returning a value in `1..=faces`.
    fn roll(&mut self, faces: u8) -> u8;
}

/// Fair die backed by a seeded or OS-seeded [`StdRng`].
#[derive(Debug, Clone)]
pub struct RandomDice {
    rng: StdRng,
}

impl RandomDice {
    /// Seeds from the operating system.
    pub fn from_os() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic die for simulations and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Dice for RandomDice {
    fn roll(&mut self, faces: u8) -> u8 {
        self.rng.random_range(1..=faces.max(1))
    }
}

/// Replays a fixed sequence of rolls.
///
/// Values are clamped into `1..=faces`; once the script runs out every roll is 1.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    script: VecDeque<u8>,
}

impl ScriptedDice {
    /// Creates a die that returns `rolls` in order.
    pub fn new(rolls: impl IntoIterator<Item = u8>) -> Self {
        Self {
            script: rolls.into_iter().collect(),
        }
    }

    /// Rolls still queued.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self, faces: u8) -> u8 {
        match self.script.pop_front() {
            Some(value) => value.clamp(1, faces.max(1)),
            None => {
                warn!("Dice script exhausted, rolling 1");
                1
            }
        }
    }
}

/// Creates the die for each new session.
pub trait DiceFactory: Send + Sync {
    /// Returns a fresh die for `session_id`.
    fn dice_for(&self, session_id: &str) -> Box<dyn Dice>;
}

/// Hands every session an OS-seeded fair die.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDiceFactory;

impl DiceFactory for RandomDiceFactory {
    fn dice_for(&self, _session_id: &str) -> Box<dyn Dice> {
        Box::new(RandomDice::from_os())
    }
}

impl<F> DiceFactory for F
where
    F: Fn(&str) -> Box<dyn Dice> + Send + Sync,
{
    fn dice_for(&self, session_id: &str) -> Box<dyn Dice> {
        self(session_id)
    }
}

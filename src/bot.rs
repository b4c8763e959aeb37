//! Computer seats used by the simulator.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::games::ludo::MoveDelta;

/// Picks a piece to move from the legal options.
///
/// Bots are only asked when at least one move exists.
pub trait Bot: Send {
    /// Returns the piece to move, or `None` to let the turn time out.
    fn choose(&mut self, moves: &[MoveDelta]) -> Option<u8>;
}

/// Plays greedily: captures first, then pieces reaching home, then the
/// piece that ends up furthest along. Ties go to the lowest piece index.
#[derive(Debug, Clone, Copy, Default)]
pub struct Greedy;

impl Bot for Greedy {
    fn choose(&mut self, moves: &[MoveDelta]) -> Option<u8> {
        moves
            .iter()
            .max_by_key(|delta| {
                (
                    delta.captures.len(),
                    delta.reaches_home(),
                    delta.square_bonus,
                    delta.to.logical(u16::MAX),
                    std::cmp::Reverse(delta.piece),
                )
            })
            .map(|delta| delta.piece)
    }
}

/// Picks uniformly among legal moves.
#[derive(Debug, Clone)]
pub struct Fish {
    rng: StdRng,
}

impl Fish {
    /// Deterministic fish.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Bot for Fish {
    fn choose(&mut self, moves: &[MoveDelta]) -> Option<u8> {
        moves.choose(&mut self.rng).map(|delta| delta.piece)
    }
}

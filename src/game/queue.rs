use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::game::{Piece, PieceType, QUEUE_CAPACITY};

/// Cumulative thresholds matching [`PieceType::ALL`]: O 15%, I 10%, the rest 15% each.
pub const CUMULATIVE_WEIGHTS: [f64; 7] = [0.15, 0.25, 0.40, 0.55, 0.70, 0.85, 1.0];

// ============================================================================
// Piece Provider Trait
// ============================================================================

pub trait PieceProvider {
    fn next_piece(&mut self) -> PieceType;
}

/// Weighted draw over a seedable RNG.
pub struct WeightedRandomProvider {
    rng: StdRng,
}

impl WeightedRandomProvider {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Maps a draw in `[0, 1)` to the first type whose threshold is at least the draw.
    pub fn pick(draw: f64) -> PieceType {
        PieceType::ALL
            .iter()
            .zip(CUMULATIVE_WEIGHTS)
            .find(|(_, threshold)| draw <= *threshold)
            .map(|(kind, _)| *kind)
            .unwrap_or(PieceType::T)
    }
}

impl PieceProvider for WeightedRandomProvider {
    fn next_piece(&mut self) -> PieceType {
        Self::pick(self.rng.gen::<f64>())
    }
}

/// Cycles through a fixed list of types.
pub struct SequencePieceProvider {
    pieces: Vec<PieceType>,
    index: usize,
}

impl SequencePieceProvider {
    pub fn new(pieces: Vec<PieceType>) -> Self {
        assert!(!pieces.is_empty(), "sequence must not be empty");
        Self { pieces, index: 0 }
    }
}

impl PieceProvider for SequencePieceProvider {
    fn next_piece(&mut self) -> PieceType {
        let piece = self.pieces[self.index % self.pieces.len()];
        self.index += 1;
        piece
    }
}

// ============================================================================
// Piece Queue
// ============================================================================

/// Upcoming pieces; the front is the next to spawn.
#[derive(Clone, Debug, Default)]
pub struct PieceQueue {
    pieces: VecDeque<Piece>,
}

impl PieceQueue {
    /// Draws a full queue, every piece placed at row 0, column `cols / 2 - 1`.
    pub fn generate(provider: &mut dyn PieceProvider, cols: usize) -> Self {
        let spawn_col = (cols / 2) as i32 - 1;
        let pieces = (0..QUEUE_CAPACITY)
            .map(|_| Piece::new(provider.next_piece(), 0, spawn_col))
            .collect();
        Self { pieces }
    }

    pub fn pop(&mut self) -> Option<Piece> {
        self.pieces.pop_front()
    }

    pub fn front(&self) -> Option<&Piece> {
        self.pieces.front()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.iter()
    }
}
